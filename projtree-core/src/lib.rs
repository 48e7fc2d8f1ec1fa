pub mod error;
pub mod observer;
pub mod scanner;
pub mod tree;

pub use error::{ProjtreeError, Result};
pub use observer::{EventLog, NodeEvent, TreeObserver};
pub use scanner::{
    CancellationToken, NoVcs, PROGRESS_MAXIMUM, ScanConfig, ScanControl, ScanMessage,
    ScanProgress, Scanner, VcsIgnore, VcsMetadata, scan_for_files,
};
pub use tree::{
    BuildTreeStats, DefaultProject, FileNode, FileType, Node, NodeId, NodeTree, NodeType,
    NodesVisitor, ProjectAction, ProjectCapabilities, Trimmed,
};
