use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use super::project::ProjectCapabilities;

pub const DEFAULT_PRIORITY: i32 = 0;
pub const FILE_PRIORITY: i32 = 100_000;
pub const FOLDER_PRIORITY: i32 = 200_000;
pub const VIRTUAL_FOLDER_PRIORITY: i32 = 300_000;
pub const PROJECT_PRIORITY: i32 = 400_000;
pub const PROJECT_FILE_PRIORITY: i32 = 500_000;

/// Icon reported for folders that never had one assigned
pub const DEFAULT_FOLDER_ICON: &str = "folder";

/// Path of the session root node
pub const SESSION_PATH: &str = "session";

/// Handle to a node stored in a [`NodeTree`](super::NodeTree).
///
/// Ids carry a generation so that a handle to a destroyed node never resolves
/// to whatever node later reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// The session root, present in every tree
    pub const SESSION: NodeId = NodeId {
        index: 0,
        generation: 0,
    };

    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Kind of node in the project tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    File,
    Folder,
    VirtualFolder,
    Project,
    Session,
}

impl NodeType {
    /// Everything except files can hold children
    pub fn is_folder_like(&self) -> bool {
        !matches!(self, NodeType::File)
    }

    pub fn is_project(&self) -> bool {
        matches!(self, NodeType::Project)
    }

    /// Project and session nodes own a `project_nodes` collection
    pub fn holds_projects(&self) -> bool {
        matches!(self, NodeType::Project | NodeType::Session)
    }
}

/// Classification of a file inside a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileType {
    #[default]
    Unknown,
    Header,
    Source,
    Form,
    StateChart,
    Resource,
    Qml,
    Project,
}

impl FileType {
    /// Guess the file type from the file name
    pub fn from_path(path: &Path) -> Self {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if matches!(file_name, "CMakeLists.txt" | "Cargo.toml" | "meson.build") {
            return FileType::Project;
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("h" | "hh" | "hpp" | "hxx" | "h++") => FileType::Header,
            Some("c" | "cc" | "cpp" | "cp" | "cxx" | "c++" | "m" | "mm" | "rs") => FileType::Source,
            Some("ui") => FileType::Form,
            Some("scxml") => FileType::StateChart,
            Some("qrc") => FileType::Resource,
            Some("qml") => FileType::Qml,
            Some("pro" | "pri" | "qbs" | "cmake") => FileType::Project,
            _ => FileType::Unknown,
        }
    }

    fn default_priority(self) -> i32 {
        if self == FileType::Project {
            PROJECT_FILE_PRIORITY
        } else {
            FILE_PRIORITY
        }
    }
}

/// A file that is not attached to any tree yet.
///
/// Scanners and project construction code produce these; handing them to
/// [`NodeTree::add_file_nodes`](super::NodeTree::add_file_nodes) or
/// [`NodeTree::build_tree`](super::NodeTree::build_tree) moves them into the
/// tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    path: PathBuf,
    file_type: FileType,
    generated: bool,
    line: Option<u32>,
}

impl FileNode {
    pub fn new(path: impl Into<PathBuf>, file_type: FileType, generated: bool) -> Self {
        Self {
            path: path.into(),
            file_type,
            generated,
            line: None,
        }
    }

    /// Create a non-generated file node typed by [`FileType::from_path`]
    pub fn classified(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_type = FileType::from_path(&path);
        Self::new(path, file_type, false)
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Whether the file is produced by a build step
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn priority(&self) -> i32 {
        self.file_type.default_priority()
    }
}

/// A node living inside a [`NodeTree`](super::NodeTree)
#[derive(Debug)]
pub struct Node {
    pub(crate) node_type: NodeType,
    pub(crate) path: PathBuf,
    pub(crate) line: Option<u32>,
    pub(crate) priority: i32,
    pub(crate) enabled: bool,
    /// Non-owning back reference; the parent's child lists own this node
    pub(crate) parent: Option<NodeId>,
    pub(crate) data: NodeData,
}

#[derive(Debug)]
pub(crate) enum NodeData {
    File(FileData),
    Folder(FolderData),
}

#[derive(Debug)]
pub(crate) struct FileData {
    pub(crate) file_type: FileType,
    pub(crate) generated: bool,
}

#[derive(Debug, Default)]
pub(crate) struct FolderData {
    pub(crate) display_name: String,
    pub(crate) icon: Option<String>,
    /// Sorted by path
    pub(crate) files: Vec<NodeId>,
    /// Sorted by folder order; includes every entry of `projects`
    pub(crate) folders: Vec<NodeId>,
    /// Project-typed subset of `folders`, same order
    pub(crate) projects: Vec<NodeId>,
    pub(crate) capabilities: Option<Box<dyn ProjectCapabilities>>,
}

impl Node {
    pub(crate) fn from_file(file: FileNode) -> Self {
        let priority = file.priority();
        Self {
            node_type: NodeType::File,
            path: file.path,
            line: file.line,
            priority,
            enabled: true,
            parent: None,
            data: NodeData::File(FileData {
                file_type: file.file_type,
                generated: file.generated,
            }),
        }
    }

    pub(crate) fn plain_folder(path: PathBuf, display_name: Option<String>) -> Self {
        let display_name = display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| path.display().to_string());
        Self::folder_like(NodeType::Folder, path, FOLDER_PRIORITY, display_name)
    }

    pub(crate) fn virtual_folder(path: PathBuf, priority: i32) -> Self {
        let display_name = path.display().to_string();
        Self::folder_like(NodeType::VirtualFolder, path, priority, display_name)
    }

    pub(crate) fn project(path: PathBuf, capabilities: Box<dyn ProjectCapabilities>) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut node = Self::folder_like(NodeType::Project, path, PROJECT_PRIORITY, display_name);
        if let NodeData::Folder(folder) = &mut node.data {
            folder.capabilities = Some(capabilities);
        }
        node
    }

    pub(crate) fn session() -> Self {
        Self::folder_like(
            NodeType::Session,
            PathBuf::from(SESSION_PATH),
            DEFAULT_PRIORITY,
            SESSION_PATH.to_string(),
        )
    }

    fn folder_like(node_type: NodeType, path: PathBuf, priority: i32, display_name: String) -> Self {
        Self {
            node_type,
            path,
            line: None,
            priority,
            enabled: true,
            parent: None,
            data: NodeData::Folder(FolderData {
                display_name,
                ..FolderData::default()
            }),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The node's own enabled flag, ignoring ancestors.
    /// Use [`NodeTree::is_enabled`](super::NodeTree::is_enabled) for the effective state.
    pub fn is_enabled_flag(&self) -> bool {
        self.enabled
    }

    pub fn parent_folder_node(&self) -> Option<NodeId> {
        self.parent
    }

    /// Name shown in views: the file name for files, the folder's display name otherwise
    pub fn display_name(&self) -> Cow<'_, str> {
        match &self.data {
            NodeData::Folder(folder) => Cow::Borrowed(folder.display_name.as_str()),
            NodeData::File(_) => match self.path.file_name() {
                Some(name) => name.to_string_lossy(),
                None => Cow::Owned(self.path.display().to_string()),
            },
        }
    }

    pub fn tooltip(&self) -> String {
        self.path.display().to_string()
    }

    pub fn file_type(&self) -> Option<FileType> {
        match &self.data {
            NodeData::File(file) => Some(file.file_type),
            NodeData::Folder(_) => None,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(&self.data, NodeData::File(file) if file.generated)
    }

    pub fn icon(&self) -> Option<&str> {
        self.folder()
            .map(|folder| folder.icon.as_deref().unwrap_or(DEFAULT_FOLDER_ICON))
    }

    pub(crate) fn folder(&self) -> Option<&FolderData> {
        match &self.data {
            NodeData::Folder(folder) => Some(folder),
            NodeData::File(_) => None,
        }
    }

    pub(crate) fn folder_mut(&mut self) -> Option<&mut FolderData> {
        match &mut self.data {
            NodeData::Folder(folder) => Some(folder),
            NodeData::File(_) => None,
        }
    }
}
