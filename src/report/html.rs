use serde_json::{Map, Value};

const NO_DATA: &str = "<p>No data</p>";

pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `top_apps_by_rating` -> `Top Apps By Rating`.
pub fn humanize(name: &str) -> String {
    let mut previous_is_word = false;

    name.replace('_', " ")
        .chars()
        .map(|c| {
            let is_word = c.is_ascii_alphanumeric();
            let mapped = if is_word && !previous_is_word {
                c.to_ascii_uppercase()
            } else {
                c
            };
            previous_is_word = is_word;
            mapped
        })
        .collect()
}

pub fn render_analysis(analysis: &Map<String, Value>) -> String {
    let mut html = String::new();
    for (name, value) in analysis {
        render_section(&mut html, name, value);
    }
    html
}

fn render_section(html: &mut String, name: &str, value: &Value) {
    html.push_str(&format!(
        "<div class=\"section\"><h2>{}</h2>",
        escape(&humanize(name))
    ));

    match value {
        Value::String(text) => html.push_str(&format!("<p>{}</p>", escape(text))),
        Value::Object(entries) => entries
            .iter()
            .for_each(|(key, entry)| render_subsection(html, key, entry)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .for_each(|(index, entry)| render_subsection(html, &index.to_string(), entry)),
        _ => {}
    }

    html.push_str("</div>");
}

fn render_subsection(html: &mut String, key: &str, value: &Value) {
    html.push_str(&format!("<h3>{}</h3>", escape(&humanize(key))));

    let table = match value {
        Value::Array(items) if !items.is_empty() => Some(table_from_array(items)),
        Value::Object(entries) if !entries.is_empty() => Some(table_from_object(entries)),
        _ => None,
    };

    match table {
        Some(table) => {
            html.push_str("<div class=\"table-container\">");
            html.push_str(&table);
            html.push_str("</div>");
        }
        None => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            html.push_str(&format!("<pre>{}</pre>", escape(&pretty)));
        }
    }
}

fn table_from_array(items: &[Value]) -> String {
    let Some(first) = items.first() else {
        return NO_DATA.to_string();
    };

    let headers = column_names(first).unwrap_or_else(|| vec!["Value".to_string()]);
    let rows = items.iter().map(row_cells).collect::<Vec<_>>();

    render_table(&headers, &rows)
}

fn table_from_object(entries: &Map<String, Value>) -> String {
    let Some(first) = entries.values().next() else {
        return NO_DATA.to_string();
    };

    let headers = std::iter::once("Key".to_string())
        .chain(column_names(first).unwrap_or_else(|| vec!["Value".to_string()]))
        .collect::<Vec<_>>();
    let rows = entries
        .iter()
        .map(|(key, value)| {
            std::iter::once(key.clone())
                .chain(row_cells(value))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    render_table(&headers, &rows)
}

// Object keys, or positions for nested arrays; `None` for scalars.
fn column_names(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Object(entries) => Some(entries.keys().cloned().collect()),
        Value::Array(items) => Some((0..items.len()).map(|index| index.to_string()).collect()),
        _ => None,
    }
}

fn row_cells(value: &Value) -> Vec<String> {
    match value {
        Value::Object(entries) => entries.values().map(cell_text).collect(),
        Value::Array(items) => items.iter().map(cell_text).collect(),
        scalar => vec![cell_text(scalar)],
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let head = headers
        .iter()
        .map(|header| format!("<th>{}</th>", escape(header)))
        .collect::<String>();
    let body = rows
        .iter()
        .map(|cells| {
            let cells = cells
                .iter()
                .map(|cell| format!("<td>{}</td>", escape(cell)))
                .collect::<String>();
            format!("<tr>{cells}</tr>")
        })
        .collect::<String>();

    format!("<table><thead><tr>{head}</tr></thead><tbody>{body}</tbody></table>")
}

#[cfg(test)]
mod tests {
    use super::{escape, humanize, render_analysis};
    use serde_json::{Value, json};

    fn render(value: Value) -> String {
        match value {
            Value::Object(map) => render_analysis(&map),
            _ => panic!("analysis must be an object"),
        }
    }

    #[test]
    fn humanizes_section_names() {
        assert_eq!(humanize("top_apps_by_rating"), "Top Apps By Rating");
        assert_eq!(humanize("summary"), "Summary");
        assert_eq!(humanize("week-2_stats"), "Week-2 Stats");
    }

    #[test]
    fn string_section_is_a_paragraph() {
        assert_eq!(
            render(json!({"summary": "ok"})),
            "<div class=\"section\"><h2>Summary</h2><p>ok</p></div>"
        );
    }

    #[test]
    fn array_of_objects_becomes_table() {
        let html = render(json!({"stats": {"counts": [{"a": 1, "b": 2}]}}));

        assert_eq!(
            html,
            "<div class=\"section\"><h2>Stats</h2><h3>Counts</h3><div class=\"table-container\">\
             <table><thead><tr><th>a</th><th>b</th></tr></thead>\
             <tbody><tr><td>1</td><td>2</td></tr></tbody></table></div></div>"
        );
    }

    #[test]
    fn scalar_arrays_use_value_column() {
        let html = render(json!({"stats": {"top_words": ["love", "grace"]}}));

        assert!(html.contains("<h3>Top Words</h3>"));
        assert!(html.contains("<th>Value</th>"));
        assert!(html.contains("<tr><td>love</td></tr><tr><td>grace</td></tr>"));
    }

    #[test]
    fn mappings_get_a_key_column() {
        let html = render(json!({"stats": {
            "by_country": {"us": {"count": 3, "avg": 4.5}, "gb": {"count": 1, "avg": 2}},
            "ratings": {"five": 10}
        }}));

        assert!(html.contains("<th>Key</th><th>count</th><th>avg</th>"));
        assert!(html.contains("<tr><td>us</td><td>3</td><td>4.5</td></tr>"));
        assert!(html.contains("<th>Key</th><th>Value</th>"));
        assert!(html.contains("<tr><td>five</td><td>10</td></tr>"));
    }

    #[test]
    fn empty_and_scalar_values_are_preformatted() {
        let html = render(json!({"stats": {"total": 12, "notes": [], "owner": null, "label": "x"}}));

        assert!(html.contains("<h3>Total</h3><pre>12</pre>"));
        assert!(html.contains("<h3>Notes</h3><pre>[]</pre>"));
        assert!(html.contains("<h3>Owner</h3><pre>null</pre>"));
        assert!(html.contains("<h3>Label</h3><pre>&quot;x&quot;</pre>"));
    }

    #[test]
    fn values_are_escaped() {
        let html = render(json!({
            "summary": "<script>alert('x')</script>",
            "stats": {"rows": [{"<b>": "Tom & Jerry"}]}
        }));

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(html.contains("<th>&lt;b&gt;</th>"));
        assert!(html.contains("<td>Tom &amp; Jerry</td>"));
    }

    #[test]
    fn escape_leaves_plain_text_alone() {
        assert_eq!(escape("plain text 123"), "plain text 123");
    }

    #[test]
    fn sections_keep_document_order() {
        let html = render(json!({"zeta": "z", "alpha": "a"}));
        assert!(html.find("Zeta").expect("zeta") < html.find("Alpha").expect("alpha"));
    }
}
