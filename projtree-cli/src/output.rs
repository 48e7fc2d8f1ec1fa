use std::fmt;
use std::path::PathBuf;

use projtree_core::{NodeId, NodeTree, NodeType, NodesVisitor};

/// Tree prefix characters
struct TreePrefix;

impl TreePrefix {
    const PIPE: &'static str = "│  ";
    const TEE: &'static str = "├─ ";
    const CORNER: &'static str = "└─ ";
    const BLANK: &'static str = "   ";
}

/// Render the tree below `root` the way a project explorer shows it:
/// sub-folders and sub-projects first, then files
pub fn render_tree(tree: &NodeTree, root: NodeId) -> String {
    let mut out = String::new();
    if tree.contains(root) {
        out.push_str(&label(tree, root));
        out.push('\n');
        render_children(tree, root, "", &mut out);
    }
    out
}

fn render_children(tree: &NodeTree, id: NodeId, prefix: &str, out: &mut String) {
    let children = children(tree, id);
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        let is_last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if is_last {
            TreePrefix::CORNER
        } else {
            TreePrefix::TEE
        });
        out.push_str(&label(tree, child));
        out.push('\n');

        let child_prefix = format!(
            "{prefix}{}",
            if is_last {
                TreePrefix::BLANK
            } else {
                TreePrefix::PIPE
            }
        );
        render_children(tree, child, &child_prefix, out);
    }
}

fn children(tree: &NodeTree, id: NodeId) -> Vec<NodeId> {
    match tree.node_type(id) {
        Some(NodeType::Session) => tree.project_nodes(id).to_vec(),
        Some(NodeType::File) | None => Vec::new(),
        Some(_) => tree
            .folder_nodes(id)
            .iter()
            .chain(tree.file_nodes(id))
            .copied()
            .collect(),
    }
}

fn label(tree: &NodeTree, id: NodeId) -> String {
    let Some(node) = tree.get(id) else {
        return String::new();
    };
    let name = node.display_name();
    match node.node_type() {
        NodeType::Session => name.into_owned(),
        NodeType::Project => format!("{name} [project]"),
        NodeType::VirtualFolder => format!("{name} [virtual]"),
        NodeType::Folder => format!("{name}/"),
        NodeType::File if node.is_generated() => format!("{name} (generated)"),
        NodeType::File => name.into_owned(),
    }
}

/// Every file of a project, sub-projects included, sorted by path
pub fn file_list(tree: &NodeTree, project: NodeId) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = tree
        .recursive_file_nodes(project)
        .into_iter()
        .filter_map(|id| tree.get(id))
        .map(|node| node.file_path().to_path_buf())
        .collect();
    paths.sort();
    paths
}

/// Node counts collected by walking the tree
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub projects: usize,
    pub folders: usize,
    pub files: usize,
}

impl NodesVisitor for Summary {
    fn visit_project_node(&mut self, tree: &NodeTree, project: NodeId) {
        self.projects += 1;
        self.files += tree.file_nodes(project).len();
    }

    fn visit_folder_node(&mut self, tree: &NodeTree, folder: NodeId) {
        self.folders += 1;
        self.files += tree.file_nodes(folder).len();
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} projects, {} folders, {} files",
            format_count(self.projects as u64),
            format_count(self.folders as u64),
            format_count(self.files as u64)
        )
    }
}

/// Format a count with thousand separators
pub fn format_count(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);

    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use projtree_core::FileNode;
    use std::path::Path;

    fn sample_tree() -> (NodeTree, NodeId) {
        let mut tree = NodeTree::new();
        let project = tree.new_project_node("/p/app.pro");
        tree.add_project_nodes(NodeId::SESSION, &[project]);
        tree.build_tree(
            project,
            vec![
                FileNode::classified("/p/src/main.cpp"),
                FileNode::classified("/p/README.md"),
                FileNode::new("/p/src/moc_main.cpp", projtree_core::FileType::Source, true),
            ],
            Some(Path::new("/p")),
        );
        (tree, project)
    }

    #[test]
    fn test_render_tree() {
        let (tree, _) = sample_tree();
        let expected = "\
session
└─ app.pro [project]
   ├─ src/
   │  ├─ main.cpp
   │  └─ moc_main.cpp (generated)
   └─ README.md
";
        assert_eq!(render_tree(&tree, NodeId::SESSION), expected);
    }

    #[test]
    fn test_file_list_and_summary() {
        let (tree, project) = sample_tree();
        assert_eq!(
            file_list(&tree, project),
            [
                PathBuf::from("/p/README.md"),
                PathBuf::from("/p/src/main.cpp"),
                PathBuf::from("/p/src/moc_main.cpp"),
            ]
        );

        let mut summary = Summary::default();
        tree.accept(NodeId::SESSION, &mut summary);
        assert_eq!(
            summary,
            Summary {
                projects: 1,
                folders: 1,
                files: 3,
            }
        );
        assert_eq!(summary.to_string(), "1 projects, 1 folders, 3 files");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
