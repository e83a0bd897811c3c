//! HTML rendering (spec §4.8): a title, a body fragment, embedded in a
//! shared page template. Bundle search results with `_elements` render
//! as a table; bundles without render as stacked resource summaries;
//! single resources render their narrative text (if present) plus a
//! collapsible JSON source.

use html_escape::encode_text;
use serde_json::Value;

pub fn render_page(resource: &Value, elements: Option<&[String]>) -> String {
    let title = page_title(resource);
    let body = render_body(resource, elements);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n"
    )
}

fn page_title(resource: &Value) -> String {
    let resource_type = resource
        .get("resourceType")
        .and_then(Value::as_str)
        .unwrap_or("Resource");
    match resource.get("id").and_then(Value::as_str) {
        Some(id) => format!("{resource_type}/{id}"),
        None => resource_type.to_string(),
    }
}

fn render_body(resource: &Value, elements: Option<&[String]>) -> String {
    if resource.get("resourceType").and_then(Value::as_str) == Some("Bundle") {
        return render_bundle(resource, elements);
    }
    render_single(resource)
}

fn render_bundle(bundle: &Value, elements: Option<&[String]>) -> String {
    let entries: Vec<&Value> = bundle
        .get("entry")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(|e| e.get("resource")).collect())
        .unwrap_or_default();

    match elements {
        Some(cols) if !cols.is_empty() => render_table(&entries, cols),
        _ => entries
            .iter()
            .map(|r| render_summary(r))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_table(entries: &[&Value], columns: &[String]) -> String {
    let header = columns
        .iter()
        .map(|c| format!("<th>{}</th>", encode_text(c)))
        .collect::<String>();
    let rows = entries
        .iter()
        .map(|entry| {
            let cells = columns
                .iter()
                .map(|c| {
                    let text = entry.get(c).map(value_to_display).unwrap_or_default();
                    format!("<td>{}</td>", encode_text(&text))
                })
                .collect::<String>();
            format!("<tr>{cells}</tr>")
        })
        .collect::<String>();
    format!("<table class=\"results\">\n<thead><tr>{header}</tr></thead>\n<tbody>{rows}</tbody>\n</table>")
}

fn render_summary(resource: &Value) -> String {
    let title = page_title(resource);
    let status = resource
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("");
    let description = resource
        .get("description")
        .or_else(|| resource.get("title"))
        .and_then(Value::as_str)
        .unwrap_or("");
    format!(
        "<div class=\"summary\"><strong>{}</strong> <span class=\"status\">{}</span><p>{}</p></div>",
        encode_text(&title),
        encode_text(status),
        encode_text(description)
    )
}

fn render_single(resource: &Value) -> String {
    let narrative = resource
        .get("text")
        .and_then(|t| t.get("div"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let narrative_html = match narrative {
        Some(div) => format!("<div class=\"narrative\">{div}</div>"),
        None => String::new(),
    };

    let source = serde_json::to_string_pretty(resource).unwrap_or_default();
    format!(
        "{narrative_html}\n<details>\n<summary>JSON source</summary>\n<pre>{}</pre>\n</details>",
        encode_text(&source)
    )
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;}table.results{border-collapse:collapse;width:100%;}table.results th,table.results td{border:1px solid #ccc;padding:0.25rem 0.5rem;text-align:left;}div.summary{border-bottom:1px solid #eee;padding:0.5rem 0;}pre{white-space:pre-wrap;background:#f7f7f7;padding:1rem;}";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_single_resource_with_json_source() {
        let resource = json!({"resourceType": "CodeSystem", "id": "x", "status": "active"});
        let page = render_page(&resource, None);
        assert!(page.contains("CodeSystem/x"));
        assert!(page.contains("JSON source"));
    }

    #[test]
    fn renders_bundle_as_table_with_elements() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "ValueSet", "id": "a", "status": "active"}},
                {"resource": {"resourceType": "ValueSet", "id": "b", "status": "draft"}}
            ]
        });
        let cols = vec!["id".to_string(), "status".to_string()];
        let page = render_page(&bundle, Some(&cols));
        assert!(page.contains("<table"));
        assert!(page.contains("active"));
        assert!(page.contains("draft"));
    }

    #[test]
    fn renders_bundle_without_elements_as_summaries() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "ValueSet", "id": "a", "status": "active", "title": "Demo"}}
            ]
        });
        let page = render_page(&bundle, None);
        assert!(page.contains("class=\"summary\""));
        assert!(page.contains("Demo"));
    }
}
