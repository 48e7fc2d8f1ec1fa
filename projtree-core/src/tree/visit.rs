use super::arena::NodeTree;
use super::node::{NodeId, NodeType};

/// Walks the folder-like nodes of a tree. Files are not visited.
pub trait NodesVisitor {
    fn visit_session_node(&mut self, _tree: &NodeTree, _session: NodeId) {}
    fn visit_project_node(&mut self, _tree: &NodeTree, _project: NodeId) {}
    fn visit_folder_node(&mut self, _tree: &NodeTree, _folder: NodeId) {}
}

impl NodeTree {
    /// Visit `id` and then the folder-like nodes below it, depth first in
    /// child order
    pub fn accept(&self, id: NodeId, visitor: &mut dyn NodesVisitor) {
        let Some(node_type) = self.node_type(id) else {
            return;
        };
        let children = match node_type {
            NodeType::File => return,
            NodeType::Session => {
                visitor.visit_session_node(self, id);
                self.project_nodes(id)
            }
            NodeType::Project => {
                visitor.visit_project_node(self, id);
                self.folder_nodes(id)
            }
            NodeType::Folder | NodeType::VirtualFolder => {
                visitor.visit_folder_node(self, id);
                self.folder_nodes(id)
            }
        };
        for &child in children {
            self.accept(child, visitor);
        }
    }
}
