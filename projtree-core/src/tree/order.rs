use std::cmp::Ordering;

use super::arena::NodeTree;
use super::node::{FolderData, Node, NodeId, NodeType};

/// One of the ordered child collections of a folder-like node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildList {
    Files,
    Folders,
    Projects,
}

impl ChildList {
    fn order(self) -> fn(&Node, &Node) -> Ordering {
        match self {
            ChildList::Files => file_order,
            ChildList::Folders | ChildList::Projects => folder_order,
        }
    }
}

impl FolderData {
    pub(crate) fn list(&self, list: ChildList) -> &Vec<NodeId> {
        match list {
            ChildList::Files => &self.files,
            ChildList::Folders => &self.folders,
            ChildList::Projects => &self.projects,
        }
    }

    pub(crate) fn list_mut(&mut self, list: ChildList) -> &mut Vec<NodeId> {
        match list {
            ChildList::Files => &mut self.files,
            ChildList::Folders => &mut self.folders,
            ChildList::Projects => &mut self.projects,
        }
    }
}

/// Files are ordered by path
pub(crate) fn file_order(a: &Node, b: &Node) -> Ordering {
    a.path.cmp(&b.path)
}

/// Virtual folders first, then higher priority first, then by display name.
/// The path breaks remaining ties so the order is total.
pub(crate) fn folder_order(a: &Node, b: &Node) -> Ordering {
    folder_bucket(a)
        .cmp(&folder_bucket(b))
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.display_name().cmp(&b.display_name()))
        .then_with(|| a.path.cmp(&b.path))
}

fn folder_bucket(node: &Node) -> u8 {
    match node.node_type {
        NodeType::VirtualFolder => 0,
        _ => 1,
    }
}

impl NodeTree {
    pub(crate) fn compare(&self, list: ChildList, a: NodeId, b: NodeId) -> Ordering {
        match (self.get(a), self.get(b)) {
            (Some(x), Some(y)) => (list.order())(x, y),
            _ => a.cmp(&b),
        }
    }

    /// Insert `child` into one of `parent`'s lists at its sorted position
    pub(crate) fn insert_sorted(&mut self, parent: NodeId, list: ChildList, child: NodeId) {
        let Some(folder) = self.folder_data(parent) else {
            return;
        };
        let children = folder.list(list);
        let position = match children.last() {
            None => 0,
            Some(&last) if self.compare(list, last, child) != Ordering::Greater => children.len(),
            Some(_) => {
                children.partition_point(|&c| self.compare(list, c, child) != Ordering::Greater)
            }
        };
        if let Some(folder) = self.folder_data_mut(parent) {
            folder.list_mut(list).insert(position, child);
        }
    }

    pub(crate) fn sort_children(&mut self, parent: NodeId, list: ChildList) {
        let Some(folder) = self.folder_data_mut(parent) else {
            return;
        };
        let mut children = std::mem::take(folder.list_mut(list));
        children.sort_by(|&a, &b| self.compare(list, a, b));
        if let Some(folder) = self.folder_data_mut(parent) {
            *folder.list_mut(list) = children;
        }
    }

    /// Move a node whose sort key changed to its new place among its siblings
    pub(crate) fn reposition(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let Some(parent) = node.parent else {
            return;
        };
        let lists: &[ChildList] = match node.node_type {
            NodeType::File => &[ChildList::Files],
            NodeType::Project => &[ChildList::Folders, ChildList::Projects],
            _ => &[ChildList::Folders],
        };
        for &list in lists {
            let Some(folder) = self.folder_data_mut(parent) else {
                return;
            };
            let children = folder.list_mut(list);
            if let Some(index) = children.iter().position(|&c| c == id) {
                children.remove(index);
                self.insert_sorted(parent, list, id);
            }
        }
    }

    /// Whether a child list is in sorted order
    #[cfg(test)]
    pub(crate) fn is_sorted(&self, parent: NodeId, list: ChildList) -> bool {
        self.folder_data(parent).is_none_or(|folder| {
            folder
                .list(list)
                .windows(2)
                .all(|pair| self.compare(list, pair[0], pair[1]) != Ordering::Greater)
        })
    }
}
