//! Document parsing and record shape detection

use super::quasi_json::python_to_json;
use super::ImportError;
use serde_json::{Map, Value};

/// Keys under which a wrapper object may hold the record list
const WRAPPER_KEYS: [&str; 4] = ["articles", "data", "records", "items"];

/// Keys that link a record to the article it translates
pub const TRANSLATION_OF_KEYS: [&str; 3] = ["translationOf", "translation_of", "baseSlug"];

const MONOGRAPH_SECTIONS: [&str; 7] = [
    "uses",
    "benefits",
    "side_effects",
    "sideEffects",
    "faqs",
    "faq",
    "substitutes",
];

/// The export formats the importer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// Our own editor format: `title`, `slug`, `mdxString`/`content`
    Native,
    /// schema.org style export: `headline`, `articleBody`, `inLanguage`
    SchemaOrg,
    /// Drug monograph with structured sections
    Monograph,
}

/// Split a raw upload into individual records.
///
/// JSON first, then a Python literal, then JSON Lines.
pub fn parse_document(input: &str) -> Result<Vec<Value>, ImportError> {
    let input = input.trim_start_matches('\u{feff}').trim();
    if input.is_empty() {
        return Err(ImportError::Parse("The import file is empty".to_string()));
    }

    let document = serde_json::from_str::<Value>(input)
        .or_else(|_| serde_json::from_str::<Value>(&python_to_json(input)))
        .or_else(|_| parse_json_lines(input))
        .map_err(|e| ImportError::Parse(format!("Unreadable import file: {}", e)))?;

    unwrap_records(document)
}

fn parse_json_lines(input: &str) -> Result<Value, serde_json::Error> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str::<Value>)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn unwrap_records(document: Value) -> Result<Vec<Value>, ImportError> {
    match document {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => {
            for key in WRAPPER_KEYS {
                if matches!(map.get(key), Some(Value::Array(_))) {
                    if let Some(Value::Array(records)) = map.remove(key) {
                        return Ok(records);
                    }
                }
            }
            Ok(vec![Value::Object(map)])
        }
        _ => Err(ImportError::Parse(
            "Expected a list of articles or an article object".to_string(),
        )),
    }
}

/// Decide which export format a record comes from
pub fn classify(record: &Map<String, Value>) -> Option<RecordShape> {
    let has = |key: &str| record.get(key).map_or(false, |v| !v.is_null());

    if has("mdxString") || has("content") {
        return Some(RecordShape::Native);
    }
    if has("headline") || has("articleBody") || has("articleBodyHtml") {
        return Some(RecordShape::SchemaOrg);
    }
    let named = has("title") || has("name") || has("drug_name");
    if named && MONOGRAPH_SECTIONS.iter().any(|key| has(key)) {
        return Some(RecordShape::Monograph);
    }
    None
}

/// Base article reference (slug or title) when the record is a translation
pub fn translation_of(record: &Map<String, Value>) -> Option<String> {
    TRANSLATION_OF_KEYS
        .iter()
        .filter_map(|key| record.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_parse_array_and_wrappers() {
        assert_eq!(parse_document(r#"[{"title": "A"}, {"title": "B"}]"#).unwrap().len(), 2);
        assert_eq!(parse_document(r#"{"articles": [{"title": "A"}]}"#).unwrap().len(), 1);
        assert_eq!(parse_document(r#"{"data": [{"title": "A"}, {}]}"#).unwrap().len(), 2);

        let single = parse_document(r#"{"title": "A", "content": "x"}"#).unwrap();
        assert_eq!(single, vec![json!({"title": "A", "content": "x"})]);
    }

    #[test]
    fn test_parse_python_and_json_lines() {
        let python = "[{'title': 'Aspirin', 'uses': ['Pain'], 'otc': True}]";
        assert_eq!(
            parse_document(python).unwrap(),
            vec![json!({"title": "Aspirin", "uses": ["Pain"], "otc": true})]
        );

        let lines = "{\"title\": \"A\"}\n\n{\"title\": \"B\"}\n";
        assert_eq!(parse_document(lines).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_document(""), Err(ImportError::Parse(_))));
        assert!(matches!(parse_document("not an export"), Err(ImportError::Parse(_))));
        assert!(matches!(parse_document("42"), Err(ImportError::Parse(_))));
    }

    #[test]
    fn test_classify() {
        let native = object(json!({"title": "A", "mdxString": "# A"}));
        assert_eq!(classify(&native), Some(RecordShape::Native));

        let schema = object(json!({"headline": "A", "articleBody": "text"}));
        assert_eq!(classify(&schema), Some(RecordShape::SchemaOrg));

        let monograph = object(json!({"drug_name": "Disprin", "side_effects": "Nausea"}));
        assert_eq!(classify(&monograph), Some(RecordShape::Monograph));

        let nameless = object(json!({"uses": ["Pain"]}));
        assert_eq!(classify(&nameless), None);
        assert_eq!(classify(&object(json!({"title": "Only a title"}))), None);
        assert_eq!(classify(&object(json!({"title": "A", "content": null}))), None);
    }

    #[test]
    fn test_translation_of() {
        let record = object(json!({"title": "A", "translation_of": " aspirin "}));
        assert_eq!(translation_of(&record).as_deref(), Some("aspirin"));
        assert_eq!(translation_of(&object(json!({"baseSlug": ""}))), None);
    }
}
