use crate::hierarchy::{HierarchyNode, TreeNode};

pub fn render<N: HierarchyNode>(forest: &[TreeNode<N>]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(forest)?)
}
