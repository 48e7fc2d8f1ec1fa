use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};

use super::arena::NodeTree;
use super::node::{FileNode, Node, NodeId};
use super::order::ChildList;

/// Outcome of a [`NodeTree::build_tree`] synchronization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildTreeStats {
    /// Files that were new to the tree
    pub added: usize,
    /// Files that vanished from the scan and were removed
    pub removed: usize,
    /// Incoming files dropped because the tree already had them
    pub unchanged: usize,
}

impl BuildTreeStats {
    pub fn changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

impl NodeTree {
    /// Direct file children, sorted by path
    pub fn file_nodes(&self, folder: NodeId) -> &[NodeId] {
        self.folder_data(folder)
            .map(|f| f.files.as_slice())
            .unwrap_or(&[])
    }

    /// Direct folder children (projects included), in folder order
    pub fn folder_nodes(&self, folder: NodeId) -> &[NodeId] {
        self.folder_data(folder)
            .map(|f| f.folders.as_slice())
            .unwrap_or(&[])
    }

    pub fn file_node(&self, folder: NodeId, path: &Path) -> Option<NodeId> {
        self.find_child(self.file_nodes(folder), path)
    }

    pub fn folder_node(&self, folder: NodeId, path: &Path) -> Option<NodeId> {
        self.find_child(self.folder_nodes(folder), path)
    }

    pub(crate) fn find_child(&self, children: &[NodeId], path: &Path) -> Option<NodeId> {
        children
            .iter()
            .copied()
            .find(|&id| self.get(id).is_some_and(|n| n.path == path))
    }

    /// Find a file anywhere below `folder` by walking the folders matching
    /// each directory segment between `folder` and the file
    pub fn recursive_file_node(&self, folder: NodeId, file: &Path) -> Option<NodeId> {
        let dir = file.parent()?;
        let base = self.get(folder)?.file_path();
        let relative = dir.strip_prefix(base).ok()?;

        let mut current = folder;
        let mut path = base.to_path_buf();
        for part in relative.components() {
            path.push(part);
            current = self.folder_node(current, &path)?;
        }
        self.file_node(current, file)
    }

    /// All files below `folder`, depth first
    pub fn recursive_file_nodes(&self, folder: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_files(folder, &mut result);
        result
    }

    fn collect_files(&self, folder: NodeId, result: &mut Vec<NodeId>) {
        result.extend_from_slice(self.file_nodes(folder));
        for &sub in self.folder_nodes(folder) {
            self.collect_files(sub, result);
        }
    }

    pub(crate) fn is_empty_folder(&self, folder: NodeId) -> bool {
        self.folder_data(folder)
            .is_some_and(|f| f.files.is_empty() && f.folders.is_empty())
    }

    /// Mutations below a folder need a project responsible for it
    fn ensure_managed(&self, folder: NodeId, operation: &str) -> bool {
        if self.folder_data(folder).is_some() && self.managing_project(folder).is_some() {
            return true;
        }
        warn!("Cannot {operation} on {folder}: no managing project");
        false
    }

    /// Move detached files into `folder`, keeping the file list sorted.
    /// Returns the ids of the inserted nodes.
    pub fn add_file_nodes(&mut self, folder: NodeId, files: Vec<FileNode>) -> Vec<NodeId> {
        if files.is_empty() || !self.ensure_managed(folder, "add files") {
            return Vec::new();
        }

        let ids: Vec<NodeId> = files
            .into_iter()
            .map(|file| self.alloc(Node::from_file(file)))
            .collect();

        self.notify(|o, tree| o.files_about_to_be_added(tree, folder, &ids));
        for &id in &ids {
            self.attach(folder, id);
            self.insert_sorted(folder, ChildList::Files, id);
        }
        self.notify(|o, tree| o.files_added(tree, folder));

        ids
    }

    /// Remove files from `folder` and destroy them
    pub fn remove_file_nodes(&mut self, folder: NodeId, files: &[NodeId]) -> bool {
        if files.is_empty() || !self.ensure_managed(folder, "remove files") {
            return false;
        }

        let present: HashSet<NodeId> = self.file_nodes(folder).iter().copied().collect();
        let mut to_remove: Vec<NodeId> = files
            .iter()
            .copied()
            .filter(|id| {
                invariant!(
                    present.contains(id),
                    "File {} to remove is not part of folder {}",
                    id,
                    folder
                )
            })
            .collect();
        to_remove.sort_by(|&a, &b| self.compare(ChildList::Files, a, b));
        to_remove.dedup();
        if to_remove.is_empty() {
            return false;
        }

        self.notify(|o, tree| o.files_about_to_be_removed(tree, folder, &to_remove));
        let doomed: HashSet<NodeId> = to_remove.iter().copied().collect();
        if let Some(data) = self.folder_data_mut(folder) {
            data.files.retain(|id| !doomed.contains(id));
        }
        for id in to_remove {
            self.free_subtree(id);
        }
        self.notify(|o, tree| o.files_removed(tree, folder));

        true
    }

    /// Attach detached folders below `folder`. Projects must go through
    /// [`NodeTree::add_project_nodes`].
    pub fn add_folder_nodes(&mut self, folder: NodeId, sub_folders: &[NodeId]) -> bool {
        if sub_folders.is_empty() || !self.ensure_managed(folder, "add folders") {
            return false;
        }

        let accepted: Vec<NodeId> = sub_folders
            .iter()
            .copied()
            .filter(|&id| {
                let Some(node) = self.get(id) else {
                    return invariant!(false, "Folder {} to add does not exist", id);
                };
                invariant!(
                    node.parent.is_none(),
                    "Folder {} already has a parent folder",
                    id
                ) && invariant!(
                    node.node_type.is_folder_like(),
                    "Node {} is not a folder",
                    id
                ) && invariant!(
                    !node.node_type.holds_projects(),
                    "Project nodes have to be added via add_project_nodes ({})",
                    id
                )
            })
            .collect();
        if accepted.is_empty() {
            return false;
        }

        self.notify(|o, tree| o.folders_about_to_be_added(tree, folder, &accepted));
        for &id in &accepted {
            self.attach(folder, id);
            self.insert_sorted(folder, ChildList::Folders, id);
        }
        self.notify(|o, tree| o.folders_added(tree, folder));

        true
    }

    /// Remove sub-folders from `folder` and destroy them along with their
    /// contents. Projects must go through [`NodeTree::remove_project_nodes`].
    pub fn remove_folder_nodes(&mut self, folder: NodeId, sub_folders: &[NodeId]) -> bool {
        if sub_folders.is_empty() || !self.ensure_managed(folder, "remove folders") {
            return false;
        }

        let present: HashSet<NodeId> = self.folder_nodes(folder).iter().copied().collect();
        let mut to_remove: Vec<NodeId> = sub_folders
            .iter()
            .copied()
            .filter(|id| {
                invariant!(
                    present.contains(id),
                    "Folder {} to remove is not part of folder {}",
                    id,
                    folder
                ) && invariant!(
                    !self.get(*id).is_some_and(|n| n.node_type.holds_projects()),
                    "Project nodes have to be removed via remove_project_nodes ({})",
                    id
                )
            })
            .collect();
        to_remove.sort_by(|&a, &b| self.compare(ChildList::Folders, a, b));
        to_remove.dedup();
        if to_remove.is_empty() {
            return false;
        }

        self.notify(|o, tree| o.folders_about_to_be_removed(tree, folder, &to_remove));
        let doomed: HashSet<NodeId> = to_remove.iter().copied().collect();
        if let Some(data) = self.folder_data_mut(folder) {
            data.folders.retain(|id| !doomed.contains(id));
        }
        for id in to_remove {
            self.free_subtree(id);
        }
        self.notify(|o, tree| o.folders_removed(tree, folder));

        true
    }

    /// Return the folder node for `directory`, creating missing folders on
    /// the way down from `folder`.
    ///
    /// Segments are computed relative to `base_override`, or to the folder's
    /// own path when no override is given. A directory outside the base
    /// resolves to `folder` itself.
    pub fn recursive_find_or_create_folder_node(
        &mut self,
        folder: NodeId,
        directory: &Path,
        base_override: Option<&Path>,
    ) -> NodeId {
        let base = match base_override {
            Some(base) if !base.as_os_str().is_empty() => base.to_path_buf(),
            _ => match self.get(folder) {
                Some(node) => node.path.clone(),
                None => return folder,
            },
        };

        // an empty or root base leaves the directory as is
        let relative = if base.parent().is_none() {
            directory.to_path_buf()
        } else {
            match directory.strip_prefix(&base) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => {
                    warn!(
                        "{} is not below {}, using {folder}",
                        directory.display(),
                        base.display()
                    );
                    return folder;
                }
            }
        };

        let mut path = base;
        let mut parent = folder;
        for component in relative.components() {
            let part = match component {
                Component::Normal(part) => part,
                Component::RootDir | Component::Prefix(_) => {
                    path.push(component);
                    continue;
                }
                Component::CurDir | Component::ParentDir => continue,
            };
            path.push(part);

            parent = match self.folder_node(parent, &path) {
                Some(existing) => existing,
                None => {
                    let created =
                        self.new_folder_node(path.clone(), Some(&part.to_string_lossy()));
                    if !self.add_folder_nodes(parent, &[created]) {
                        self.destroy(created);
                        return parent;
                    }
                    created
                }
            };
        }
        parent
    }

    /// Synchronize the files below `folder` with a fresh scan.
    ///
    /// Files present in both the tree and `files` are left alone and the
    /// incoming duplicates are dropped. New files are inserted into folders
    /// created on demand, one batch per folder. Files missing from `files`
    /// are removed, one batch per parent, and any folder chain left empty is
    /// pruned up to (never including) `folder`. Project nodes are never pruned.
    pub fn build_tree(
        &mut self,
        folder: NodeId,
        files: Vec<FileNode>,
        base_override: Option<&Path>,
    ) -> BuildTreeStats {
        let mut existing: Vec<(PathBuf, NodeId)> = self
            .recursive_file_nodes(folder)
            .into_iter()
            .filter_map(|id| self.get(id).map(|n| (n.path.clone(), id)))
            .collect();
        existing.sort_by(|a, b| a.0.cmp(&b.0));

        let mut incoming = files;
        incoming.sort_by(|a, b| a.path().cmp(b.path()));
        let before_dedup = incoming.len();
        incoming.dedup_by(|a, b| a.path() == b.path());

        let diff = compare_sorted(existing, incoming);
        let mut stats = BuildTreeStats {
            unchanged: diff.unchanged + (before_dedup - diff.total_incoming()),
            ..BuildTreeStats::default()
        };

        // group new files by destination folder
        let mut added_groups: Vec<(NodeId, Vec<FileNode>)> = Vec::new();
        let mut added_index: HashMap<NodeId, usize> = HashMap::new();
        for file in diff.added {
            let dir = file.path().parent().map(Path::to_path_buf).unwrap_or_default();
            let target = self.recursive_find_or_create_folder_node(folder, &dir, base_override);
            match added_index.get(&target) {
                Some(&i) => added_groups[i].1.push(file),
                None => {
                    added_index.insert(target, added_groups.len());
                    added_groups.push((target, vec![file]));
                }
            }
        }
        for (target, files) in added_groups {
            stats.added += self.add_file_nodes(target, files).len();
        }

        // group vanished files by their current parent
        let mut deleted_groups: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
        let mut deleted_index: HashMap<NodeId, usize> = HashMap::new();
        for id in diff.deleted {
            let Some(parent) = self.parent_folder_node(id) else {
                continue;
            };
            match deleted_index.get(&parent) {
                Some(&i) => deleted_groups[i].1.push(id),
                None => {
                    deleted_index.insert(parent, deleted_groups.len());
                    deleted_groups.push((parent, vec![id]));
                }
            }
        }
        for (parent, ids) in deleted_groups {
            if self.remove_file_nodes(parent, &ids) {
                stats.removed += ids.len();
            }
            if parent != folder {
                self.prune_empty_ancestors(folder, parent);
            }
        }

        debug!(
            "build_tree below {}: {} added, {} removed, {} unchanged",
            folder, stats.added, stats.removed, stats.unchanged
        );
        stats
    }

    /// Remove `start` and its ancestors while they are empty, stopping at
    /// `root` or at the first project
    fn prune_empty_ancestors(&mut self, root: NodeId, start: NodeId) {
        let mut current = start;
        while current != root && self.is_empty_folder(current) {
            let Some(node) = self.get(current) else {
                break;
            };
            if node.node_type.holds_projects() {
                break;
            }
            let Some(parent) = node.parent else {
                break;
            };
            if !self.remove_folder_nodes(parent, &[current]) {
                break;
            }
            current = parent;
        }
    }
}

/// Three-way partition of two path-sorted file lists
#[derive(Debug, Default)]
struct SortedDiff {
    /// Only in the tree
    deleted: Vec<NodeId>,
    /// Only in the incoming list
    added: Vec<FileNode>,
    /// In both; the incoming copies were dropped
    unchanged: usize,
}

impl SortedDiff {
    fn total_incoming(&self) -> usize {
        self.added.len() + self.unchanged
    }
}

fn compare_sorted(existing: Vec<(PathBuf, NodeId)>, incoming: Vec<FileNode>) -> SortedDiff {
    let mut diff = SortedDiff::default();
    let mut old_iter = existing.into_iter();
    let mut new_iter = incoming.into_iter();
    let mut next_old = old_iter.next();
    let mut next_new = new_iter.next();

    loop {
        match (next_old.take(), next_new.take()) {
            (Some(old), Some(new)) => match old.0.as_path().cmp(new.path()) {
                Ordering::Less => {
                    diff.deleted.push(old.1);
                    next_old = old_iter.next();
                    next_new = Some(new);
                }
                Ordering::Greater => {
                    diff.added.push(new);
                    next_old = Some(old);
                    next_new = new_iter.next();
                }
                Ordering::Equal => {
                    diff.unchanged += 1;
                    next_old = old_iter.next();
                    next_new = new_iter.next();
                }
            },
            (Some(old), None) => {
                diff.deleted.push(old.1);
                diff.deleted.extend(old_iter.by_ref().map(|(_, id)| id));
                break;
            }
            (None, Some(new)) => {
                diff.added.push(new);
                diff.added.extend(new_iter.by_ref());
                break;
            }
            (None, None) => break,
        }
    }

    diff
}
