use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use super::arena::NodeTree;
use super::node::{NodeId, NodeType};
use super::order::ChildList;

/// File patterns offered when the user picks files to add
pub const DEFAULT_ADD_FILE_FILTER: &str =
    "*.c; *.cc; *.cpp; *.cp; *.cxx; *.c++; *.h; *.hh; *.hpp; *.hxx;";

/// Context menu actions a project may allow on its nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectAction {
    /// Marks actions a node reports on behalf of its parent
    InheritedFromParent,
    AddSubProject,
    RemoveSubProject,
    AddNewFile,
    AddExistingFile,
    AddExistingDirectory,
    RemoveFile,
    EraseFile,
    Rename,
    DuplicateFile,
    HidePathActions,
    HideFileActions,
}

/// Where newly created files would land if added through a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddNewInformation {
    pub display_name: String,
    pub priority: i32,
}

/// What a concrete project type can do with its files.
///
/// Build-system integrations implement this and pass it to
/// [`NodeTree::new_project_node_with`]. Every method has a conservative
/// default, so an implementation only overrides what it supports. Folder
/// level operations on [`NodeTree`] are forwarded to the capabilities of the
/// folder's managing project.
pub trait ProjectCapabilities: fmt::Debug {
    /// Returns the files that could not be added on failure
    fn add_files(&mut self, files: &[PathBuf]) -> Result<(), Vec<PathBuf>> {
        Err(files.to_vec())
    }

    /// Returns the files that could not be removed on failure
    fn remove_files(&mut self, files: &[PathBuf]) -> Result<(), Vec<PathBuf>> {
        Err(files.to_vec())
    }

    fn delete_files(&mut self, _files: &[PathBuf]) -> bool {
        false
    }

    fn can_rename_file(&self, _from: &Path, _to: &Path) -> bool {
        true
    }

    fn rename_file(&mut self, _from: &Path, _to: &Path) -> bool {
        false
    }

    fn can_add_sub_project(&self, _project_file: &Path) -> bool {
        false
    }

    fn add_sub_projects(&mut self, _project_files: &[PathBuf]) -> bool {
        false
    }

    fn remove_sub_projects(&mut self, _project_files: &[PathBuf]) -> bool {
        false
    }

    fn deploys_folder(&self, _folder: &Path) -> bool {
        false
    }

    fn supported_actions(&self, _node: NodeId) -> Vec<ProjectAction> {
        Vec::new()
    }

    /// Overrides the file filter inherited from the session
    fn add_file_filter(&self) -> Option<String> {
        None
    }

    fn show_in_simple_tree(&self) -> bool {
        false
    }
}

/// A project that supports nothing beyond the defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProject;

impl ProjectCapabilities for DefaultProject {}

impl NodeTree {
    /// Child projects of a project or of the session
    pub fn project_nodes(&self, parent: NodeId) -> &[NodeId] {
        self.folder_data(parent)
            .map(|f| f.projects.as_slice())
            .unwrap_or(&[])
    }

    pub fn project_node(&self, parent: NodeId, path: &Path) -> Option<NodeId> {
        self.find_child(self.project_nodes(parent), path)
    }

    /// Attach projects to a project or to the session. They join both the
    /// project list and the folder list.
    pub fn add_project_nodes(&mut self, parent: NodeId, projects: &[NodeId]) -> bool {
        if projects.is_empty() || !self.can_hold_projects(parent) {
            return false;
        }
        let is_session = parent == NodeId::SESSION;

        let mut seen: HashSet<NodeId> = self.project_nodes(parent).iter().copied().collect();
        let accepted: Vec<NodeId> = projects
            .iter()
            .copied()
            .filter(|&id| {
                let Some(node) = self.get(id) else {
                    return invariant!(false, "Project {} to add does not exist", id);
                };
                invariant!(node.node_type.is_project(), "Node {} is not a project", id)
                    && invariant!(
                        node.parent.is_none() || (!is_session && node.parent == Some(parent)),
                        "Project node {} already has a parent",
                        id
                    )
                    && seen.insert(id)
            })
            .collect();
        if accepted.is_empty() {
            return false;
        }

        self.notify(|o, tree| o.folders_about_to_be_added(tree, parent, &accepted));
        for &id in &accepted {
            self.attach(parent, id);
            if let Some(folder) = self.folder_data_mut(parent) {
                folder.folders.push(id);
                folder.projects.push(id);
            }
        }
        self.sort_children(parent, ChildList::Folders);
        self.sort_children(parent, ChildList::Projects);
        self.notify(|o, tree| o.folders_added(tree, parent));

        true
    }

    /// Take projects out of a project or the session.
    ///
    /// Sub-projects removed from a project are destroyed. Projects removed
    /// from the session are only detached: they stay alive until they are
    /// added again or handed to [`NodeTree::destroy`].
    pub fn remove_project_nodes(&mut self, parent: NodeId, projects: &[NodeId]) -> bool {
        if projects.is_empty() || !self.can_hold_projects(parent) {
            return false;
        }
        let is_session = parent == NodeId::SESSION;

        let present: HashSet<NodeId> = self.project_nodes(parent).iter().copied().collect();
        let mut to_remove: Vec<NodeId> = projects
            .iter()
            .copied()
            .filter(|id| {
                invariant!(
                    present.contains(id),
                    "Project {} to remove is not part of {}",
                    id,
                    parent
                )
            })
            .collect();
        to_remove.sort_by(|&a, &b| self.compare(ChildList::Projects, a, b));
        to_remove.dedup();
        if to_remove.is_empty() {
            return false;
        }

        self.notify(|o, tree| o.folders_about_to_be_removed(tree, parent, &to_remove));
        let doomed: HashSet<NodeId> = to_remove.iter().copied().collect();
        if let Some(folder) = self.folder_data_mut(parent) {
            folder.projects.retain(|id| !doomed.contains(id));
            folder.folders.retain(|id| !doomed.contains(id));
        }
        for id in to_remove {
            if is_session {
                if let Some(node) = self.get_mut(id) {
                    node.parent = None;
                }
            } else {
                self.free_subtree(id);
            }
        }
        self.notify(|o, tree| o.folders_removed(tree, parent));

        true
    }

    fn can_hold_projects(&self, parent: NodeId) -> bool {
        match self.node_type(parent) {
            Some(node_type) => invariant!(
                node_type.holds_projects(),
                "Node {} cannot hold projects",
                parent
            ),
            None => false,
        }
    }

    /// Re-announce a project whose display name was computed elsewhere
    pub fn project_display_name_changed(&mut self, node: NodeId) {
        if !self.contains(node) {
            return;
        }
        self.notify(|o, tree| o.node_sort_key_about_to_change(tree, node));
        self.reposition(node);
        self.notify(|o, tree| o.node_sort_key_changed(tree, node));
    }

    /// File filter for "add existing files": the nearest project override,
    /// otherwise the session's C/C++ default
    pub fn add_file_filter(&self, node: NodeId) -> String {
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(node) = self.get(id) else {
                break;
            };
            if node.node_type == NodeType::Session {
                break;
            }
            if let Some(filter) = self.capabilities(id).and_then(|c| c.add_file_filter()) {
                return filter;
            }
            current = node.parent;
        }
        DEFAULT_ADD_FILE_FILTER.to_string()
    }

    /// Whether a node shows up in the simplified tree view
    pub fn show_in_simple_tree(&self, node: NodeId) -> bool {
        match self.node_type(node) {
            Some(NodeType::Session) => true,
            Some(NodeType::Project) => self
                .capabilities(node)
                .is_some_and(|c| c.show_in_simple_tree()),
            _ => false,
        }
    }

    /// Actions allowed on `node`. Projects decide for themselves, the
    /// session allows nothing, everything else asks its parent.
    pub fn supported_actions(&self, node: NodeId) -> Vec<ProjectAction> {
        self.actions_offered_by(node, node)
    }

    fn actions_offered_by(&self, holder: NodeId, node: NodeId) -> Vec<ProjectAction> {
        let Some(holder_node) = self.get(holder) else {
            return Vec::new();
        };
        match holder_node.node_type {
            NodeType::Session => Vec::new(),
            NodeType::Project => self
                .capabilities(holder)
                .map(|c| c.supported_actions(node))
                .unwrap_or_default(),
            _ => {
                let mut actions = holder_node
                    .parent
                    .map(|parent| self.actions_offered_by(parent, node))
                    .unwrap_or_default();
                actions.push(ProjectAction::InheritedFromParent);
                actions
            }
        }
    }

    /// Ranks `folder` as a target for new files; the context node wins
    pub fn add_new_information(
        &self,
        folder: NodeId,
        context: Option<NodeId>,
    ) -> Option<AddNewInformation> {
        let node = self.get(folder)?;
        node.folder()?;
        Some(AddNewInformation {
            display_name: node.display_name().into_owned(),
            priority: if context == Some(folder) { 120 } else { 100 },
        })
    }

    pub(crate) fn capabilities(&self, project: NodeId) -> Option<&dyn ProjectCapabilities> {
        self.folder_data(project)?.capabilities.as_deref()
    }

    fn capabilities_mut(
        &mut self,
        project: NodeId,
    ) -> Option<&mut (dyn ProjectCapabilities + 'static)> {
        self.folder_data_mut(project)?.capabilities.as_deref_mut()
    }

    fn managing_capabilities_mut(
        &mut self,
        node: NodeId,
    ) -> Option<&mut (dyn ProjectCapabilities + 'static)> {
        let project = self.managing_project(node)?;
        self.capabilities_mut(project)
    }

    /// Ask the managing project to add files. The tree itself is updated by
    /// the next scan, not here.
    pub fn add_files(&mut self, folder: NodeId, files: &[PathBuf]) -> Result<(), Vec<PathBuf>> {
        match self.managing_capabilities_mut(folder) {
            Some(caps) => caps.add_files(files),
            None => Err(files.to_vec()),
        }
    }

    pub fn remove_files(&mut self, folder: NodeId, files: &[PathBuf]) -> Result<(), Vec<PathBuf>> {
        match self.managing_capabilities_mut(folder) {
            Some(caps) => caps.remove_files(files),
            None => Err(files.to_vec()),
        }
    }

    pub fn delete_files(&mut self, folder: NodeId, files: &[PathBuf]) -> bool {
        self.managing_capabilities_mut(folder)
            .is_some_and(|caps| caps.delete_files(files))
    }

    pub fn can_rename_file(&self, folder: NodeId, from: &Path, to: &Path) -> bool {
        self.managing_project(folder)
            .and_then(|project| self.capabilities(project))
            .is_some_and(|caps| caps.can_rename_file(from, to))
    }

    pub fn rename_file(&mut self, folder: NodeId, from: &Path, to: &Path) -> bool {
        self.managing_capabilities_mut(folder)
            .is_some_and(|caps| caps.rename_file(from, to))
    }

    pub fn can_add_sub_project(&self, project: NodeId, project_file: &Path) -> bool {
        self.capabilities(project)
            .is_some_and(|caps| caps.can_add_sub_project(project_file))
    }

    pub fn add_sub_projects(&mut self, project: NodeId, project_files: &[PathBuf]) -> bool {
        self.capabilities_mut(project)
            .is_some_and(|caps| caps.add_sub_projects(project_files))
    }

    pub fn remove_sub_projects(&mut self, project: NodeId, project_files: &[PathBuf]) -> bool {
        self.capabilities_mut(project)
            .is_some_and(|caps| caps.remove_sub_projects(project_files))
    }

    pub fn deploys_folder(&self, project: NodeId, folder: &Path) -> bool {
        self.capabilities(project)
            .is_some_and(|caps| caps.deploys_folder(folder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{EventLog, NodeEvent};
    use crate::tree::FileNode;

    /// Accepts sources, rejects everything else, and remembers what it saw
    #[derive(Debug, Default)]
    struct SourcesOnly {
        added: Vec<PathBuf>,
    }

    impl ProjectCapabilities for SourcesOnly {
        fn add_files(&mut self, files: &[PathBuf]) -> Result<(), Vec<PathBuf>> {
            let (sources, rejected): (Vec<PathBuf>, Vec<PathBuf>) = files
                .iter()
                .cloned()
                .partition(|f| f.extension().is_some_and(|e| e == "cpp"));
            self.added.extend(sources);
            if rejected.is_empty() { Ok(()) } else { Err(rejected) }
        }

        fn supported_actions(&self, _node: NodeId) -> Vec<ProjectAction> {
            vec![ProjectAction::AddNewFile, ProjectAction::Rename]
        }

        fn add_file_filter(&self) -> Option<String> {
            Some("*.cpp;".to_string())
        }

        fn show_in_simple_tree(&self) -> bool {
            true
        }
    }

    fn projects_mirror_folders(tree: &NodeTree, parent: NodeId) -> bool {
        let from_folders: Vec<NodeId> = tree
            .folder_nodes(parent)
            .iter()
            .copied()
            .filter(|&id| tree.node_type(id) == Some(NodeType::Project))
            .collect();
        from_folders == tree.project_nodes(parent)
    }

    #[test]
    fn test_add_and_remove_sub_projects() {
        let mut tree = NodeTree::new();
        let root = tree.new_project_node("/p/root.pro");
        tree.add_project_nodes(NodeId::SESSION, &[root]);
        let plain = tree.new_folder_node("/p/docs", Some("docs"));
        tree.add_folder_nodes(root, &[plain]);

        let lib = tree.new_project_node("/p/lib/lib.pro");
        let app = tree.new_project_node("/p/app/app.pro");
        assert!(tree.add_project_nodes(root, &[lib, app]));
        assert_eq!(tree.project_nodes(root), &[app, lib]);
        assert_eq!(tree.folder_nodes(root).len(), 3);
        assert!(projects_mirror_folders(&tree, root));
        assert_eq!(tree.project_node(root, Path::new("/p/lib/lib.pro")), Some(lib));

        let lib_file = tree.add_file_nodes(lib, vec![FileNode::classified("/p/lib/a.cpp")])[0];
        assert!(tree.remove_project_nodes(root, &[lib]));
        assert_eq!(tree.project_nodes(root), &[app]);
        assert!(projects_mirror_folders(&tree, root));
        // sub-project removal destroys the whole sub-project
        assert!(!tree.contains(lib));
        assert!(!tree.contains(lib_file));
    }

    #[test]
    fn test_session_removal_detaches_without_destroying() {
        let log = EventLog::new();
        let mut tree = NodeTree::with_observer(log.clone());
        let project = tree.new_project_node("/p");
        tree.add_project_nodes(NodeId::SESSION, &[project]);
        let file = tree.add_file_nodes(project, vec![FileNode::classified("/p/a.cpp")])[0];
        log.take();

        assert!(tree.remove_project_nodes(NodeId::SESSION, &[project]));
        assert_eq!(
            log.take(),
            vec![
                NodeEvent::FoldersAboutToBeRemoved {
                    parent: NodeId::SESSION,
                    folders: vec![project],
                },
                NodeEvent::FoldersRemoved(NodeId::SESSION),
            ]
        );
        assert!(tree.project_nodes(NodeId::SESSION).is_empty());
        assert!(tree.folder_nodes(NodeId::SESSION).is_empty());
        assert!(tree.contains(project));
        assert!(tree.contains(file));
        assert_eq!(tree.parent_folder_node(project), None);

        // the detached project can come back
        assert!(tree.add_project_nodes(NodeId::SESSION, &[project]));
        assert_eq!(tree.file_nodes(project), &[file]);

        assert!(tree.remove_project_nodes(NodeId::SESSION, &[project]));
        assert!(tree.destroy(project));
        assert!(!tree.contains(file));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_adding_twice_is_ignored() {
        let mut tree = NodeTree::new();
        let project = tree.new_project_node("/p");
        assert!(tree.add_project_nodes(NodeId::SESSION, &[project, project]));
        assert_eq!(tree.project_nodes(NodeId::SESSION), &[project]);
        assert_eq!(tree.folder_nodes(NodeId::SESSION), &[project]);
    }

    #[test]
    fn test_add_file_filter() {
        let mut tree = NodeTree::new();
        let plain = tree.new_project_node("/p");
        let custom = tree.new_project_node_with("/q", SourcesOnly::default());
        tree.add_project_nodes(NodeId::SESSION, &[plain, custom]);
        let folder = tree.new_folder_node("/q/src", None);
        tree.add_folder_nodes(custom, &[folder]);

        assert_eq!(tree.add_file_filter(NodeId::SESSION), DEFAULT_ADD_FILE_FILTER);
        assert_eq!(tree.add_file_filter(plain), DEFAULT_ADD_FILE_FILTER);
        assert_eq!(tree.add_file_filter(folder), "*.cpp;");
    }

    #[test]
    fn test_supported_actions_inherit_from_project() {
        let mut tree = NodeTree::new();
        let project = tree.new_project_node_with("/q", SourcesOnly::default());
        tree.add_project_nodes(NodeId::SESSION, &[project]);
        let folder = tree.new_folder_node("/q/src", None);
        tree.add_folder_nodes(project, &[folder]);
        let file = tree.add_file_nodes(folder, vec![FileNode::classified("/q/src/a.cpp")])[0];

        assert!(tree.supported_actions(NodeId::SESSION).is_empty());
        assert_eq!(
            tree.supported_actions(project),
            [ProjectAction::AddNewFile, ProjectAction::Rename]
        );
        assert_eq!(
            tree.supported_actions(file),
            [
                ProjectAction::AddNewFile,
                ProjectAction::Rename,
                ProjectAction::InheritedFromParent,
                ProjectAction::InheritedFromParent,
            ]
        );
    }

    #[test]
    fn test_capability_hooks_delegate_to_managing_project() {
        let mut tree = NodeTree::new();
        let project = tree.new_project_node_with("/q", SourcesOnly::default());
        tree.add_project_nodes(NodeId::SESSION, &[project]);
        let folder = tree.new_folder_node("/q/src", None);
        tree.add_folder_nodes(project, &[folder]);

        let request = vec![PathBuf::from("/q/src/a.cpp"), PathBuf::from("/q/src/a.txt")];
        assert_eq!(
            tree.add_files(folder, &request),
            Err(vec![PathBuf::from("/q/src/a.txt")])
        );
        assert!(tree.can_rename_file(folder, Path::new("/q/a"), Path::new("/q/b")));
        assert!(!tree.rename_file(folder, Path::new("/q/a"), Path::new("/q/b")));
        assert!(!tree.delete_files(folder, &request));
        assert_eq!(tree.remove_files(folder, &request), Err(request.clone()));
        assert!(tree.show_in_simple_tree(project));
        assert!(tree.show_in_simple_tree(NodeId::SESSION));
        assert!(!tree.show_in_simple_tree(folder));
        assert!(!tree.can_add_sub_project(project, Path::new("/q/sub.pro")));
        assert!(!tree.deploys_folder(project, Path::new("/q/src")));

        // without a managing project every hook fails
        let orphan = tree.new_folder_node("/orphan", None);
        assert_eq!(tree.add_files(orphan, &request), Err(request.clone()));
        assert!(!tree.can_rename_file(orphan, Path::new("/a"), Path::new("/b")));
    }

    #[test]
    fn test_add_new_information_prefers_context() {
        let mut tree = NodeTree::new();
        let project = tree.new_project_node("/p/app.pro");
        tree.add_project_nodes(NodeId::SESSION, &[project]);

        let info = tree.add_new_information(project, Some(project)).unwrap();
        assert_eq!(info.display_name, "app.pro");
        assert_eq!(info.priority, 120);
        assert_eq!(tree.add_new_information(project, None).unwrap().priority, 100);
    }

    #[test]
    fn test_project_display_name_changed_notifies() {
        let log = EventLog::new();
        let mut tree = NodeTree::with_observer(log.clone());
        let project = tree.new_project_node("/p");
        tree.add_project_nodes(NodeId::SESSION, &[project]);
        log.take();

        tree.project_display_name_changed(project);
        assert_eq!(
            log.take(),
            vec![
                NodeEvent::SortKeyAboutToChange(project),
                NodeEvent::SortKeyChanged(project),
            ]
        );
    }
}
