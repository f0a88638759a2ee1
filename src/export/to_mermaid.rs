use crate::hierarchy::{HierarchyNode, TreeNode};

pub fn render<N: HierarchyNode>(forest: &[TreeNode<N>]) -> anyhow::Result<String> {
    let handlebars = crate::common::get_handlebars();
    let res = handlebars.render_template(&get_template(), &super::template_context(forest))?;
    Ok(res)
}

pub fn get_template() -> String {
    let template = r##"flowchart TB
{{#each nodes as |node|}}
{{indent node.depth}}n{{node.id}}["{{mermaid_quote node.label}}{{#if (exists node.kind)}}<br/><small>{{mermaid_quote node.kind}}</small>{{/if}}"]
{{/each}}
{{#each edges as |edge|}}
  n{{edge.parent}} --> n{{edge.child}}
{{/each}}
"##;

    template.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::org_chart;

    #[test]
    fn test_mermaid_flowchart() {
        let out = render(&org_chart()).unwrap();
        assert!(out.starts_with("flowchart TB\n"));
        assert!(out.contains("  n1[\"Alex Morgan<br/><small>director</small>\"]\n"));
        assert!(out.contains("n2[\"Sam #quot;Ops#quot; Patel"));
        assert!(!out.contains("\\\""));
        assert!(out.contains("      n3[\"Jordan Lee<br/><small>Supervisor</small>\"]"));
        assert!(out.contains("n4[\"Casey Brown\"]"));
        assert!(out.contains("  n1 --> n2\n"));
        assert!(out.contains("  n2 --> n4\n"));
    }
}
