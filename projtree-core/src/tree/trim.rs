use std::collections::HashSet;

use super::arena::NodeTree;
use super::node::{NodeId, NodeType};
use super::order::ChildList;

/// Outcome of [`NodeTree::trim`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trimmed {
    /// The trimmed node if it survives, `None` if the caller should drop it
    pub survivor: Option<NodeId>,
    /// Nodes destroyed below the trimmed node
    pub pruned: usize,
}

impl Trimmed {
    fn dropped() -> Self {
        Self {
            survivor: None,
            pruned: 0,
        }
    }

    pub fn is_kept(&self) -> bool {
        self.survivor.is_some()
    }

    pub fn changed(&self) -> bool {
        self.pruned > 0
    }
}

impl NodeTree {
    /// Prune the subtree below `id` down to the nodes in `keep`.
    ///
    /// A kept node survives with everything beneath it. Files outside the
    /// keep set are dropped. Folder-like nodes trim their children first,
    /// removing and destroying the dropped ones with the usual notifications,
    /// and survive only if a child survived. Projects and the session trim
    /// their sub-projects before their files and plain folders.
    ///
    /// `id` itself is never removed; a `None` survivor tells the caller to do so.
    pub fn trim(&mut self, id: NodeId, keep: &HashSet<NodeId>) -> Trimmed {
        let Some(node_type) = self.node_type(id) else {
            return Trimmed::dropped();
        };
        if keep.contains(&id) {
            return Trimmed {
                survivor: Some(id),
                pruned: 0,
            };
        }
        if node_type == NodeType::File {
            return Trimmed::dropped();
        }

        let mut pruned = 0;
        let mut survived = false;
        if node_type.holds_projects() {
            survived |= self.trim_list(id, ChildList::Projects, keep, &mut pruned);
        }
        survived |= self.trim_list(id, ChildList::Folders, keep, &mut pruned);
        survived |= self.trim_list(id, ChildList::Files, keep, &mut pruned);

        Trimmed {
            survivor: survived.then_some(id),
            pruned,
        }
    }

    /// Trim every child in one list and remove the dropped ones. Returns
    /// whether any child survived.
    fn trim_list(
        &mut self,
        parent: NodeId,
        list: ChildList,
        keep: &HashSet<NodeId>,
        pruned: &mut usize,
    ) -> bool {
        let children: Vec<NodeId> = match self.folder_data(parent) {
            Some(folder) => folder.list(list).clone(),
            None => return false,
        };

        let mut survived = false;
        let mut dropped = Vec::new();
        for child in children {
            // sub-projects were handled by the project pass
            if list == ChildList::Folders && self.node_type(child) == Some(NodeType::Project) {
                survived = true;
                continue;
            }
            let trimmed = self.trim(child, keep);
            *pruned += trimmed.pruned;
            if trimmed.is_kept() {
                survived = true;
            } else {
                dropped.push(child);
            }
        }

        *pruned += dropped.len();
        self.drop_children(parent, list, dropped);
        survived
    }

    fn drop_children(&mut self, parent: NodeId, list: ChildList, dropped: Vec<NodeId>) {
        if dropped.is_empty() {
            return;
        }
        match list {
            ChildList::Files => {
                self.notify(|o, tree| o.files_about_to_be_removed(tree, parent, &dropped))
            }
            ChildList::Folders | ChildList::Projects => {
                self.notify(|o, tree| o.folders_about_to_be_removed(tree, parent, &dropped))
            }
        }

        let doomed: HashSet<NodeId> = dropped.iter().copied().collect();
        if let Some(folder) = self.folder_data_mut(parent) {
            match list {
                ChildList::Files => folder.files.retain(|id| !doomed.contains(id)),
                ChildList::Folders | ChildList::Projects => {
                    folder.folders.retain(|id| !doomed.contains(id));
                    folder.projects.retain(|id| !doomed.contains(id));
                }
            }
        }
        for id in dropped {
            self.free_subtree(id);
        }

        match list {
            ChildList::Files => self.notify(|o, tree| o.files_removed(tree, parent)),
            ChildList::Folders | ChildList::Projects => {
                self.notify(|o, tree| o.folders_removed(tree, parent))
            }
        }
    }
}
