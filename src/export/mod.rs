//! Org-chart rendering. Exporters consume a forest built by
//! `HierarchyGraph::subtree` and never walk the hierarchy themselves.

pub mod to_dot;
pub mod to_json;
pub mod to_mermaid;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::hierarchy::{HierarchyNode, TreeNode};

#[derive(clap::ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Mermaid,
    Dot,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Mermaid => "mmd",
            ExportFormat::Dot => "dot",
        }
    }
}

/// Render `forest` in `format`
pub fn render<N: HierarchyNode>(forest: &[TreeNode<N>], format: ExportFormat) -> anyhow::Result<String> {
    match format {
        ExportFormat::Json => to_json::render(forest),
        ExportFormat::Mermaid => to_mermaid::render(forest),
        ExportFormat::Dot => to_dot::render(forest),
    }
}

fn collect<N: HierarchyNode>(tree: &TreeNode<N>, nodes: &mut Vec<Value>, edges: &mut Vec<Value>) {
    let node = &tree.node;
    nodes.push(json!({
        "id": node.id(),
        "label": node.label(),
        "kind": node.kind(),
        "compliance": node.compliance(),
        "depth": tree.depth,
        "has_children": tree.has_children,
    }));
    for child in &tree.children {
        edges.push(json!({"parent": node.id(), "child": child.id()}));
        collect(child, nodes, edges);
    }
}

/// Template context shared by the text exporters: nodes in pre-order and
/// parent/child edges
pub(crate) fn template_context<N: HierarchyNode>(forest: &[TreeNode<N>]) -> Value {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for tree in forest {
        collect(tree, &mut nodes, &mut edges);
    }
    json!({
        "flavor": N::FLAVOR.to_string(),
        "nodes": nodes,
        "edges": edges,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::org_chart;
    use super::*;

    #[test]
    fn test_template_context_is_pre_order() {
        let context = template_context(&org_chart());
        let ids: Vec<i64> = context["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(context["edges"].as_array().unwrap().len(), 3);
        assert_eq!(context["flavor"], "staff");
        assert_eq!(context["nodes"][2]["depth"], 2);
    }

    #[test]
    fn test_format_parses_from_cli_value() {
        use clap::ValueEnum;
        assert_eq!(ExportFormat::from_str("mermaid", true).unwrap(), ExportFormat::Mermaid);
        assert_eq!(ExportFormat::Dot.extension(), "dot");
    }
}
