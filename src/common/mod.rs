pub mod db_errors;

use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;
use tracing::info;

use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn create_path_if_not_exists(path: &str) -> anyhow::Result<()> {
    let Some(parent) = Path::new(path).parent() else {
        return Ok(());
    };
    if !parent.as_os_str().is_empty() && !parent.exists() {
        info!("Creating path: {:?}", parent);
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn write_string_to_file(filename: &str, content: &str) -> anyhow::Result<()> {
    create_path_if_not_exists(filename)?;
    let path = Path::new(filename);
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Quote a label for DOT output
fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Mermaid has no backslash escapes in quoted labels, only entity codes
fn escape_mermaid_label(label: &str) -> String {
    label.replace('"', "#quot;")
}

pub fn get_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars_helper!(exists: |v: Value| {
        match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        }
    });
    handlebars.register_helper("exists", Box::new(exists));

    handlebars_helper!(quote: |s: String| escape_label(&s));
    handlebars.register_helper("quote", Box::new(quote));

    handlebars_helper!(mermaid_quote: |s: String| escape_mermaid_label(&s));
    handlebars.register_helper("mermaid_quote", Box::new(mermaid_quote));

    handlebars_helper!(indent: |depth: i64| {
        let depth = if depth < 0 { 0 } else { depth };
        "  ".repeat((depth + 1) as usize)
    });
    handlebars.register_helper("indent", Box::new(indent));

    handlebars
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handlebars_can_iterate_objects() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(
                r#"{{#each people as |person|}}
Hello {{person.name}}
{{/each}}"#,
                &json!({"people": [{"name": "foo"}, {"name": "bar"}]}),
            )
            .expect("This to render");
        assert_eq!(res, "Hello foo\nHello bar\n");
    }

    #[test]
    fn handlebars_helper_quote_escapes_double_quotes() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(r#""{{quote name}}""#, &json!({"name": "The \"Yard\""}))
            .expect("This to render");
        assert_eq!(res, r#""The \"Yard\"""#);
    }

    #[test]
    fn handlebars_helper_mermaid_quote_uses_entity_codes() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(
                r#"["{{mermaid_quote name}}"]"#,
                &json!({"name": "The \"Yard\" \\ Gate"}),
            )
            .expect("This to render");
        assert_eq!(res, r#"["The #quot;Yard#quot; \ Gate"]"#);
    }

    #[test]
    fn handlebars_helper_exists_skips_blank_strings() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(
                "{{#if (exists a)}}a{{/if}}{{#if (exists b)}}b{{/if}}{{#if (exists c)}}c{{/if}}",
                &json!({"a": "x", "b": "  ", "c": null}),
            )
            .expect("This to render");
        assert_eq!(res, "a");
    }

    #[test]
    fn write_string_to_file_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("charts/org.mmd");
        let target = target.to_string_lossy().to_string();

        write_string_to_file(&target, "flowchart TB").expect("write");
        assert_eq!(
            std::fs::read_to_string(&target).expect("read back"),
            "flowchart TB"
        );
    }
}
