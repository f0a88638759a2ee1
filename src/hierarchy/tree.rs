use serde::{Deserialize, Serialize};

use super::node::{HierarchyNode, NodeId};

/// One node of a rendered hierarchy, with its children nested below it
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TreeNode<N> {
    #[serde(flatten)]
    pub node: N,
    pub depth: usize,
    pub has_children: bool,
    pub children: Vec<TreeNode<N>>,
}

impl<N: HierarchyNode> TreeNode<N> {
    pub fn from_node(node: &N, depth: usize) -> Self {
        Self {
            node: node.clone(),
            depth,
            has_children: false,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Depth-first, pre-order flattening of this tree
    pub fn flatten(&self) -> Vec<&N> {
        let mut nodes = vec![&self.node];
        for child in &self.children {
            nodes.extend(child.flatten());
        }
        nodes
    }

    /// Deepest level below (and including) this node
    pub fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.max_depth())
            .max()
            .unwrap_or(self.depth)
    }
}

/// Flatten a whole forest, roots in order
pub fn flatten_forest<N: HierarchyNode>(forest: &[TreeNode<N>]) -> Vec<&N> {
    forest.iter().flat_map(|tree| tree.flatten()).collect()
}
