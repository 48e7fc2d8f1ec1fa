/// Check a structural invariant. A violation is a programming error: it
/// panics in debug builds and is logged and skipped in release builds.
/// Evaluates to whether the invariant held.
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {{
        let held: bool = $cond;
        if !held {
            log::error!($($arg)+);
            debug_assert!(held, $($arg)+);
        }
        held
    }};
}

mod arena;
mod folder;
mod node;
mod order;
mod project;
mod trim;
mod visit;

pub use arena::NodeTree;
pub use folder::BuildTreeStats;
pub use node::{
    DEFAULT_FOLDER_ICON, DEFAULT_PRIORITY, FILE_PRIORITY, FOLDER_PRIORITY, FileNode, FileType,
    Node, NodeId, NodeType, PROJECT_FILE_PRIORITY, PROJECT_PRIORITY, SESSION_PATH,
    VIRTUAL_FOLDER_PRIORITY,
};
pub use project::{
    AddNewInformation, DEFAULT_ADD_FILE_FILTER, DefaultProject, ProjectAction,
    ProjectCapabilities,
};
pub use trim::Trimmed;
pub use visit::NodesVisitor;
