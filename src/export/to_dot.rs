use crate::hierarchy::{HierarchyNode, TreeNode};

pub fn render<N: HierarchyNode>(forest: &[TreeNode<N>]) -> anyhow::Result<String> {
    let handlebars = crate::common::get_handlebars();
    let res = handlebars.render_template(&get_template(), &super::template_context(forest))?;
    Ok(res)
}

pub fn get_template() -> String {
    let template = r##"digraph {{flavor}} {
    rankdir="TB";
    splines=true;
    overlap=false;
    nodesep="0.3";
    ranksep="0.8";
    fontname="Lato";
    node [ shape="box" style="filled, rounded" fillcolor="#dddddd" fontname="Lato" fontsize=12];
    edge [ color="#2B303A" ];

{{#each nodes as |node|}}
    n{{node.id}} [label="{{quote node.label}}{{#if (exists node.kind)}}\n{{quote node.kind}}{{/if}}"];
{{/each}}

{{#each edges as |edge|}}
    n{{edge.parent}} -> n{{edge.child}};
{{/each}}
}
"##;

    template.to_string()
}
