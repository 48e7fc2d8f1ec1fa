use std::fmt;
use std::path::PathBuf;

use super::node::{FolderData, Node, NodeId, NodeType};
use super::project::{DefaultProject, ProjectCapabilities};
use crate::observer::TreeObserver;

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-allocated project tree rooted at a session node.
///
/// The arena owns every node. Parents own their children through their child
/// lists; the `parent` link stored in each node is a plain id and never keeps
/// anything alive. Nodes created with the `new_*_node` constructors start out
/// detached and join the tree through the `add_*` operations.
pub struct NodeTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    observer: Option<Box<dyn TreeObserver>>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: NodeId::SESSION.generation(),
                node: Some(Node::session()),
            }],
            free: Vec::new(),
            observer: None,
        }
    }

    /// Create a tree that reports every change to `observer`
    pub fn with_observer(observer: impl TreeObserver + 'static) -> Self {
        let mut tree = Self::new();
        tree.set_observer(observer);
        tree
    }

    pub fn set_observer(&mut self, observer: impl TreeObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Detach and return the current observer
    pub fn take_observer(&mut self) -> Option<Box<dyn TreeObserver>> {
        self.observer.take()
    }

    /// The root session node
    pub fn session(&self) -> NodeId {
        NodeId::SESSION
    }

    /// Get a reference to a live node
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    pub(crate) fn folder_data(&self, id: NodeId) -> Option<&FolderData> {
        self.get(id).and_then(Node::folder)
    }

    pub(crate) fn folder_data_mut(&mut self, id: NodeId) -> Option<&mut FolderData> {
        self.get_mut(id).and_then(Node::folder_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, attached or not, including the session
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Check if the tree holds nothing but the session
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Iterator over all live nodes
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|node| (NodeId::new(index as u32, slot.generation), node))
        })
    }

    /// Create a detached folder node. Without a display name the native path is shown.
    pub fn new_folder_node(&mut self, path: impl Into<PathBuf>, display_name: Option<&str>) -> NodeId {
        self.alloc(Node::plain_folder(path.into(), display_name.map(str::to_string)))
    }

    /// Create a detached virtual folder, i.e. one with no directory behind it
    pub fn new_virtual_folder_node(&mut self, path: impl Into<PathBuf>, priority: i32) -> NodeId {
        self.alloc(Node::virtual_folder(path.into(), priority))
    }

    /// Create a detached project node with default capabilities
    pub fn new_project_node(&mut self, path: impl Into<PathBuf>) -> NodeId {
        self.new_project_node_with(path, DefaultProject)
    }

    pub fn new_project_node_with(
        &mut self,
        path: impl Into<PathBuf>,
        capabilities: impl ProjectCapabilities + 'static,
    ) -> NodeId {
        self.alloc(Node::project(path.into(), Box::new(capabilities)))
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId::new(index, 0)
        }
    }

    /// Destroy a detached node and everything below it.
    ///
    /// Returns `false` when the node is unknown, still attached, or the session.
    pub fn destroy(&mut self, id: NodeId) -> bool {
        match self.get(id) {
            Some(node) if node.parent.is_none() && node.node_type != NodeType::Session => {
                self.free_subtree(id);
                true
            }
            _ => false,
        }
    }

    /// Free a node and its descendants without touching the parent's lists
    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if current == NodeId::SESSION || self.get(current).is_none() {
                continue;
            }
            let slot = &mut self.slots[current.index()];
            if let Some(node) = slot.node.take()
                && let Some(folder) = node.folder()
            {
                // projects is a subset of folders
                pending.extend(folder.files.iter().copied());
                pending.extend(folder.folders.iter().copied());
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index() as u32);
        }
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get(id).map(Node::node_type)
    }

    pub fn parent_folder_node(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Nearest project among the node's ancestors
    pub fn parent_project_node(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.parent_folder_node(id);
        while let Some(ancestor) = current {
            let node = self.get(ancestor)?;
            if node.node_type.is_project() {
                return Some(ancestor);
            }
            current = node.parent;
        }
        None
    }

    /// The project responsible for a node: its nearest project ancestor, the
    /// node itself for top-level projects, nothing for the session
    pub fn managing_project(&self, id: NodeId) -> Option<NodeId> {
        match self.node_type(id)? {
            NodeType::Session => None,
            NodeType::Project => self.parent_project_node(id).or(Some(id)),
            _ => self.parent_project_node(id),
        }
    }

    /// A node is enabled only if it and every ancestor are enabled
    pub fn is_enabled(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.get(node_id) {
                Some(node) if node.enabled => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        if node.enabled == enabled {
            return;
        }
        node.enabled = enabled;
        if node.parent.is_some() {
            self.notify(|o, tree| o.node_updated(tree, id));
        }
    }

    pub fn set_priority(&mut self, id: NodeId, priority: i32) {
        if self.get(id).is_none_or(|n| n.priority == priority) {
            return;
        }
        self.change_sort_key(id, |node| node.priority = priority);
    }

    pub fn set_absolute_file_path_and_line(
        &mut self,
        id: NodeId,
        path: impl Into<PathBuf>,
        line: Option<u32>,
    ) {
        let path = path.into();
        if self.get(id).is_none_or(|n| n.path == path && n.line == line) {
            return;
        }
        self.change_sort_key(id, move |node| {
            node.path = path;
            node.line = line;
        });
    }

    /// Rename a folder-like node. Files always show their file name.
    pub fn set_display_name(&mut self, id: NodeId, name: &str) {
        if self
            .folder_data(id)
            .is_none_or(|folder| folder.display_name == name)
        {
            return;
        }
        let name = name.to_string();
        self.change_sort_key(id, move |node| {
            if let Some(folder) = node.folder_mut() {
                folder.display_name = name;
            }
        });
    }

    pub fn set_icon(&mut self, id: NodeId, icon: impl Into<String>) {
        if let Some(folder) = self.folder_data_mut(id) {
            folder.icon = Some(icon.into());
        }
    }

    /// Mutate a node's sort key inside an about-to-change/changed bracket and
    /// move it to its new place among its siblings
    fn change_sort_key(&mut self, id: NodeId, mutate: impl FnOnce(&mut Node)) {
        let attached = self.parent_folder_node(id).is_some();
        if attached {
            self.notify(|o, tree| o.node_sort_key_about_to_change(tree, id));
        }
        if let Some(node) = self.get_mut(id) {
            mutate(node);
        }
        if attached {
            self.reposition(id);
            self.notify(|o, tree| o.node_sort_key_changed(tree, id));
            self.notify(|o, tree| o.node_updated(tree, id));
        }
    }

    /// Deliver a notification. The observer gets read access to the tree.
    pub(crate) fn notify(&mut self, deliver: impl FnOnce(&mut dyn TreeObserver, &NodeTree)) {
        if let Some(mut observer) = self.observer.take() {
            deliver(observer.as_mut(), self);
            self.observer = Some(observer);
        }
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTree")
            .field("nodes", &self.len())
            .field("free", &self.free.len())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{EventLog, NodeEvent};
    use crate::tree::FileNode;
    use std::path::Path;

    fn tree_with_project() -> (NodeTree, NodeId) {
        let mut tree = NodeTree::new();
        let project = tree.new_project_node("/p");
        tree.add_project_nodes(NodeId::SESSION, &[project]);
        (tree, project)
    }

    #[test]
    fn test_tree_creation() {
        let tree = NodeTree::new();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
        let session = tree.get(tree.session()).unwrap();
        assert_eq!(session.node_type(), NodeType::Session);
        assert_eq!(session.parent_folder_node(), None);
    }

    #[test]
    fn test_managing_project() {
        let (mut tree, project) = tree_with_project();
        let sub = tree.new_project_node("/p/sub");
        tree.add_project_nodes(project, &[sub]);
        let files = tree.add_file_nodes(sub, vec![FileNode::classified("/p/sub/x.cpp")]);

        assert_eq!(tree.managing_project(NodeId::SESSION), None);
        assert_eq!(tree.managing_project(project), Some(project));
        assert_eq!(tree.parent_project_node(project), None);
        assert_eq!(tree.managing_project(sub), Some(project));
        assert_eq!(tree.managing_project(files[0]), Some(sub));
        assert_eq!(tree.parent_project_node(files[0]), Some(sub));
    }

    #[test]
    fn test_is_enabled_inherits_from_ancestors() {
        let (mut tree, project) = tree_with_project();
        let folder = tree.new_folder_node("/p/src", Some("src"));
        tree.add_folder_nodes(project, &[folder]);
        let file = tree.add_file_nodes(folder, vec![FileNode::classified("/p/src/a.cpp")])[0];

        assert!(tree.is_enabled(file));

        tree.set_enabled(project, false);
        assert!(!tree.is_enabled(file));
        assert!(!tree.is_enabled(folder));
        assert!(tree.get(file).unwrap().is_enabled_flag());

        tree.set_enabled(project, true);
        tree.set_enabled(file, false);
        assert!(!tree.is_enabled(file));
        assert!(tree.is_enabled(folder));
    }

    #[test]
    fn test_destroyed_ids_do_not_resolve() {
        let mut tree = NodeTree::new();
        let folder = tree.new_folder_node("/tmp/x", None);
        assert!(tree.destroy(folder));
        assert!(!tree.contains(folder));

        // slot is reused with a new generation
        let again = tree.new_folder_node("/tmp/y", None);
        assert_eq!(again.index(), folder.index());
        assert_ne!(again, folder);
        assert!(tree.get(folder).is_none());
        assert_eq!(tree.get(again).unwrap().file_path(), Path::new("/tmp/y"));
    }

    #[test]
    fn test_destroy_refuses_attached_nodes() {
        let (mut tree, project) = tree_with_project();
        assert!(!tree.destroy(project));
        assert!(!tree.destroy(NodeId::SESSION));
        assert!(tree.contains(project));
    }

    #[test]
    fn test_set_path_brackets_sort_key_change() {
        let log = EventLog::new();
        let mut tree = NodeTree::with_observer(log.clone());
        let project = tree.new_project_node("/p");
        tree.add_project_nodes(NodeId::SESSION, &[project]);
        let ids = tree.add_file_nodes(
            project,
            vec![
                FileNode::classified("/p/a.cpp"),
                FileNode::classified("/p/b.cpp"),
            ],
        );
        log.take();

        tree.set_absolute_file_path_and_line(ids[0], "/p/z.cpp", Some(7));
        assert_eq!(
            log.take(),
            vec![
                NodeEvent::SortKeyAboutToChange(ids[0]),
                NodeEvent::SortKeyChanged(ids[0]),
                NodeEvent::Updated(ids[0]),
            ]
        );
        // a.cpp became z.cpp and moved behind b.cpp
        assert_eq!(tree.file_nodes(project), &[ids[1], ids[0]]);
        assert_eq!(tree.get(ids[0]).unwrap().line(), Some(7));

        // unchanged values emit nothing
        tree.set_absolute_file_path_and_line(ids[0], "/p/z.cpp", Some(7));
        assert!(log.is_empty());
    }

    #[test]
    fn test_detached_nodes_do_not_notify() {
        let log = EventLog::new();
        let mut tree = NodeTree::with_observer(log.clone());
        let folder = tree.new_folder_node("/p/src", None);
        tree.set_display_name(folder, "src");
        tree.set_enabled(folder, false);
        assert!(log.is_empty());
        assert_eq!(tree.get(folder).unwrap().display_name(), "src");
    }
}
