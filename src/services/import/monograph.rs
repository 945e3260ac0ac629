//! Markdown assembly for drug monographs
//!
//! Each structured section becomes a level-1 heading. Sections may arrive
//! as arrays, objects or strings in any of the lenient forms `coerce`
//! understands; empty sections are left out.

use super::quasi_json::coerce;
use serde_json::{Map, Value};

/// Build the article body for a monograph record
pub fn assemble(record: &Map<String, Value>, description: &str) -> String {
    let mut sections: Vec<String> = Vec::new();

    if !description.trim().is_empty() {
        sections.push(description.trim().to_string());
    }

    for (heading, keys) in [
        ("Uses", &["uses"][..]),
        ("Benefits", &["benefits"][..]),
        ("Side Effects", &["side_effects", "sideEffects"][..]),
    ] {
        let items = field_items(record, keys);
        let bullets: Vec<String> = items.iter().filter_map(bullet_text).collect();
        if !bullets.is_empty() {
            sections.push(format!("# {}\n\n{}", heading, bullet_list(&bullets)));
        }
    }

    let faqs = faq_entries(&field_items(record, &["faqs", "faq"]));
    if !faqs.is_empty() {
        let body = faqs
            .iter()
            .map(|(question, answer)| match answer {
                Some(answer) => format!("### {}\n\n{}", question, answer),
                None => format!("### {}", question),
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        sections.push(format!("# Frequently Asked Questions\n\n{}", body));
    }

    let substitutes = field_items(record, &["substitutes"]);
    if let Some(body) = substitutes_block(&substitutes) {
        sections.push(format!("# Substitutes\n\n{}", body));
    }

    let mut markdown = sections.join("\n\n");
    if !markdown.is_empty() {
        markdown.push('\n');
    }
    markdown
}

/// Items of the first present section key, decoding string payloads
fn field_items(record: &Map<String, Value>, keys: &[&str]) -> Vec<Value> {
    let Some(value) = keys.iter().find_map(|key| record.get(*key).filter(|v| !v.is_null())) else {
        return Vec::new();
    };
    match value {
        Value::String(raw) => match coerce(raw) {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        },
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line of text for a list item
fn bullet_text(item: &Value) -> Option<String> {
    let text = match item {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => {
            let name = first_text(map, &["name", "title", "label"]);
            let detail = first_text(map, &["description", "detail", "details", "text", "value"]);
            match (name, detail) {
                (Some(name), Some(detail)) => format!("**{}**: {}", name, detail),
                (Some(only), None) | (None, Some(only)) => only,
                (None, None) => map
                    .iter()
                    .filter_map(|(k, v)| scalar_text(v).map(|v| format!("{}: {}", k, v)))
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        }
        Value::Array(parts) => parts
            .iter()
            .filter_map(scalar_text)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Question and optional answer pairs.
///
/// Accepts `{question, answer}` objects (or `q`/`a`), `[question, answer]`
/// pairs, `{question: answer}` maps and `"Question? Answer"` strings.
fn faq_entries(items: &[Value]) -> Vec<(String, Option<String>)> {
    let mut entries = Vec::new();
    for item in items {
        match item {
            Value::Object(map) => {
                let question = first_text(map, &["question", "q", "title"]);
                let answer = first_text(map, &["answer", "a", "text"]);
                match question {
                    Some(question) => entries.push((question, answer)),
                    None => entries.extend(
                        map.iter()
                            .map(|(q, a)| (q.trim().to_string(), scalar_text(a)))
                            .filter(|(q, _)| !q.is_empty()),
                    ),
                }
            }
            Value::Array(pair) => {
                let mut texts = pair.iter().filter_map(scalar_text);
                if let Some(question) = texts.next() {
                    entries.push((question, texts.next()));
                }
            }
            Value::String(s) => {
                let s = s.trim();
                match s.find('?') {
                    Some(pos) if pos + 1 < s.len() => {
                        let (question, answer) = s.split_at(pos + 1);
                        entries.push((question.trim().to_string(), Some(answer.trim().to_string())));
                    }
                    _ if !s.is_empty() => entries.push((s.to_string(), None)),
                    _ => {}
                }
            }
            _ => {}
        }
    }
    entries
}

/// A table when the substitutes are objects, a bullet list otherwise
fn substitutes_block(items: &[Value]) -> Option<String> {
    // Objects without a single text value carry nothing to show
    let items: Vec<&Value> = items
        .iter()
        .filter(|item| match item {
            Value::Object(map) => map.values().any(|v| scalar_text(v).is_some()),
            _ => true,
        })
        .collect();
    let rows: Vec<&Map<String, Value>> = items.iter().filter_map(|item| item.as_object()).collect();

    if !rows.is_empty() && rows.len() == items.len() {
        let mut columns: Vec<&str> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }

        let mut table = format!(
            "| {} |\n| {} |",
            columns.iter().map(|c| table_cell(&humanize(c))).collect::<Vec<_>>().join(" | "),
            columns.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
        );
        for row in rows {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| row.get(*c).and_then(scalar_text).map(|t| table_cell(&t)).unwrap_or_default())
                .collect();
            table.push_str(&format!("\n| {} |", cells.join(" | ")));
        }
        return Some(table);
    }

    let bullets: Vec<String> = items.iter().copied().filter_map(bullet_text).collect();
    (!bullets.is_empty()).then(|| bullet_list(&bullets))
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| map.get(*key).and_then(scalar_text))
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// `price_pkr` -> `Price pkr`
fn humanize(key: &str) -> String {
    let spaced = key.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_full_monograph_from_python_literals() {
        let rec = record(json!({
            "drug_name": "Disprin",
            "uses": "['Headache', 'Fever']",
            "benefits": "Fast relief; Cheap",
            "side_effects": "- Nausea\n- Heartburn",
            "faqs": "[{'question': 'Is it safe?', 'answer': 'Yes, mostly.'}]",
            "substitutes": "[{'name': 'Loprin', 'price': 45}, {'name': 'Ecotrin', 'price': None}]"
        }));

        let md = assemble(&rec, "Aspirin for pain.");
        let expected = "Aspirin for pain.\n\n\
            # Uses\n\n- Headache\n- Fever\n\n\
            # Benefits\n\n- Fast relief\n- Cheap\n\n\
            # Side Effects\n\n- Nausea\n- Heartburn\n\n\
            # Frequently Asked Questions\n\n### Is it safe?\n\nYes, mostly.\n\n\
            # Substitutes\n\n| Name | Price |\n| --- | --- |\n| Loprin | 45 |\n| Ecotrin |  |\n";
        assert_eq!(md, expected);
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let rec = record(json!({
            "title": "Disprin",
            "uses": [],
            "benefits": "",
            "sideEffects": ["Rash"],
            "faq": null
        }));
        assert_eq!(assemble(&rec, ""), "# Side Effects\n\n- Rash\n");
        assert_eq!(assemble(&record(json!({"title": "x"})), ""), "");
    }

    #[test]
    fn test_faq_forms() {
        let items = vec![
            json!(["Dose?", "Twice daily"]),
            json!({"q": "With food?", "a": "Yes"}),
            json!({"Pregnancy?": "Ask a doctor"}),
            json!("Alcohol? Avoid it."),
            json!("Storage"),
        ];
        let entries = faq_entries(&items);
        assert_eq!(
            entries,
            vec![
                ("Dose?".to_string(), Some("Twice daily".to_string())),
                ("With food?".to_string(), Some("Yes".to_string())),
                ("Pregnancy?".to_string(), Some("Ask a doctor".to_string())),
                ("Alcohol?".to_string(), Some("Avoid it.".to_string())),
                ("Storage".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_substitutes_as_list_and_object_bullets() {
        let rec = record(json!({
            "name": "Disprin",
            "substitutes": ["Loprin", "Ecotrin"],
            "uses": [{"name": "Pain", "description": "mild to moderate"}]
        }));
        let md = assemble(&rec, "");
        assert!(md.contains("# Uses\n\n- **Pain**: mild to moderate"));
        assert!(md.contains("# Substitutes\n\n- Loprin\n- Ecotrin"));
    }

    #[test]
    fn test_blank_substitutes_are_omitted() {
        let rec = record(json!({"name": "Disprin", "substitutes": [{}, {"name": null}]}));
        assert_eq!(assemble(&rec, ""), "");

        let rec = record(json!({"name": "Disprin", "substitutes": [{}, {"name": "Loprin"}]}));
        assert_eq!(
            assemble(&rec, ""),
            "# Substitutes\n\n| Name |\n| --- |\n| Loprin |\n"
        );
    }

    #[test]
    fn test_humanize_and_cells() {
        assert_eq!(humanize("price_pkr"), "Price pkr");
        assert_eq!(table_cell("a|b\nc"), "a\\|b c");
    }
}
