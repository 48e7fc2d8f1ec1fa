//! Change notifications for tree mutations.
//!
//! Every structural change is announced twice: once right before the child
//! collection is touched and once right after. Between the two calls the tree
//! still looks exactly like it did at the "about to" call.

use std::cell::RefCell;
use std::rc::Rc;

use crate::tree::{NodeId, NodeTree};

/// Receiver of tree change notifications.
///
/// All methods default to doing nothing, so implementors only override what
/// they care about. The tree passed in is read-only; observers cannot mutate
/// the tree from inside a notification.
pub trait TreeObserver {
    fn node_sort_key_about_to_change(&mut self, _tree: &NodeTree, _node: NodeId) {}
    fn node_sort_key_changed(&mut self, _tree: &NodeTree, _node: NodeId) {}
    fn node_updated(&mut self, _tree: &NodeTree, _node: NodeId) {}

    fn files_about_to_be_added(&mut self, _tree: &NodeTree, _folder: NodeId, _files: &[NodeId]) {}
    fn files_added(&mut self, _tree: &NodeTree, _folder: NodeId) {}
    fn files_about_to_be_removed(&mut self, _tree: &NodeTree, _folder: NodeId, _files: &[NodeId]) {
    }
    fn files_removed(&mut self, _tree: &NodeTree, _folder: NodeId) {}

    fn folders_about_to_be_added(&mut self, _tree: &NodeTree, _parent: NodeId, _folders: &[NodeId]) {
    }
    fn folders_added(&mut self, _tree: &NodeTree, _parent: NodeId) {}
    fn folders_about_to_be_removed(
        &mut self,
        _tree: &NodeTree,
        _parent: NodeId,
        _folders: &[NodeId],
    ) {
    }
    fn folders_removed(&mut self, _tree: &NodeTree, _parent: NodeId) {}
}

/// A recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    SortKeyAboutToChange(NodeId),
    SortKeyChanged(NodeId),
    Updated(NodeId),
    FilesAboutToBeAdded { folder: NodeId, files: Vec<NodeId> },
    FilesAdded(NodeId),
    FilesAboutToBeRemoved { folder: NodeId, files: Vec<NodeId> },
    FilesRemoved(NodeId),
    FoldersAboutToBeAdded { parent: NodeId, folders: Vec<NodeId> },
    FoldersAdded(NodeId),
    FoldersAboutToBeRemoved { parent: NodeId, folders: Vec<NodeId> },
    FoldersRemoved(NodeId),
}

impl NodeEvent {
    /// True for the first half of a notification pair
    pub fn is_about_to(&self) -> bool {
        matches!(
            self,
            NodeEvent::SortKeyAboutToChange(_)
                | NodeEvent::FilesAboutToBeAdded { .. }
                | NodeEvent::FilesAboutToBeRemoved { .. }
                | NodeEvent::FoldersAboutToBeAdded { .. }
                | NodeEvent::FoldersAboutToBeRemoved { .. }
        )
    }

    /// Number of nodes an "about to" event announces
    pub fn affected(&self) -> usize {
        match self {
            NodeEvent::FilesAboutToBeAdded { files, .. }
            | NodeEvent::FilesAboutToBeRemoved { files, .. } => files.len(),
            NodeEvent::FoldersAboutToBeAdded { folders, .. }
            | NodeEvent::FoldersAboutToBeRemoved { folders, .. } => folders.len(),
            _ => 0,
        }
    }
}

/// Observer that records every notification.
///
/// Clones share the same log, so keep one clone around after handing the
/// other to [`NodeTree::with_observer`].
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<NodeEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<NodeEvent> {
        self.events.borrow().clone()
    }

    /// Drain the recorded events
    pub fn take(&self) -> Vec<NodeEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    fn push(&self, event: NodeEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl TreeObserver for EventLog {
    fn node_sort_key_about_to_change(&mut self, _tree: &NodeTree, node: NodeId) {
        self.push(NodeEvent::SortKeyAboutToChange(node));
    }

    fn node_sort_key_changed(&mut self, _tree: &NodeTree, node: NodeId) {
        self.push(NodeEvent::SortKeyChanged(node));
    }

    fn node_updated(&mut self, _tree: &NodeTree, node: NodeId) {
        self.push(NodeEvent::Updated(node));
    }

    fn files_about_to_be_added(&mut self, _tree: &NodeTree, folder: NodeId, files: &[NodeId]) {
        self.push(NodeEvent::FilesAboutToBeAdded {
            folder,
            files: files.to_vec(),
        });
    }

    fn files_added(&mut self, _tree: &NodeTree, folder: NodeId) {
        self.push(NodeEvent::FilesAdded(folder));
    }

    fn files_about_to_be_removed(&mut self, _tree: &NodeTree, folder: NodeId, files: &[NodeId]) {
        self.push(NodeEvent::FilesAboutToBeRemoved {
            folder,
            files: files.to_vec(),
        });
    }

    fn files_removed(&mut self, _tree: &NodeTree, folder: NodeId) {
        self.push(NodeEvent::FilesRemoved(folder));
    }

    fn folders_about_to_be_added(&mut self, _tree: &NodeTree, parent: NodeId, folders: &[NodeId]) {
        self.push(NodeEvent::FoldersAboutToBeAdded {
            parent,
            folders: folders.to_vec(),
        });
    }

    fn folders_added(&mut self, _tree: &NodeTree, parent: NodeId) {
        self.push(NodeEvent::FoldersAdded(parent));
    }

    fn folders_about_to_be_removed(
        &mut self,
        _tree: &NodeTree,
        parent: NodeId,
        folders: &[NodeId],
    ) {
        self.push(NodeEvent::FoldersAboutToBeRemoved {
            parent,
            folders: folders.to_vec(),
        });
    }

    fn folders_removed(&mut self, _tree: &NodeTree, parent: NodeId) {
        self.push(NodeEvent::FoldersRemoved(parent));
    }
}
