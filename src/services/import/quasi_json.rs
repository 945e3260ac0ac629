//! Lenient decoding of structured fields that arrive as strings
//!
//! Scraped exports often hold lists and objects as Python `repr` output or
//! as loose bulleted text. `coerce` walks a ladder of interpretations and
//! always produces something usable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Leading list marker: `-`, `*`, `•`, `·` or `1.` / `1)`
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:[-*•·]|\d+[.)])\s+").unwrap());

/// Interpret a string field.
///
/// 1. strict JSON
/// 2. Python literal rewritten as JSON
/// 3. one item per line or bullet
/// 4. one item per `;`
/// 5. the text itself
///
/// Blank input yields `Value::Null`.
pub fn coerce(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return value;
    }
    if let Ok(value) = serde_json::from_str::<Value>(&python_to_json(trimmed)) {
        return value;
    }

    let lines: Vec<&str> = if trimmed.contains('\n') {
        trimmed.lines().collect()
    } else {
        trimmed.split('•').collect()
    };
    let items = clean_items(lines);
    if items.len() > 1 {
        return Value::Array(items.into_iter().map(Value::String).collect());
    }

    let items = clean_items(trimmed.split(';').collect());
    if items.len() > 1 {
        return Value::Array(items.into_iter().map(Value::String).collect());
    }

    Value::String(strip_bullet(trimmed).to_string())
}

fn clean_items(parts: Vec<&str>) -> Vec<String> {
    parts
        .into_iter()
        .map(strip_bullet)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_bullet(item: &str) -> &str {
    match BULLET.find(item) {
        Some(m) => &item[m.end()..],
        None => item,
    }
}

/// Rewrite a Python literal (`repr` of lists, dicts and tuples) as JSON.
///
/// Single-quoted strings become double-quoted, `True`/`False`/`None`
/// become `true`/`false`/`null`, tuples become arrays and trailing commas
/// are dropped. Input that is not a Python literal comes out as invalid
/// JSON rather than as an error.
pub fn python_to_json(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                i = copy_string(&chars, i, &mut out);
                continue;
            }
            '(' => out.push('['),
            ')' => {
                drop_trailing_comma(&mut out);
                out.push(']');
            }
            ']' | '}' => {
                drop_trailing_comma(&mut out);
                out.push(c);
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    other => other,
                });
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}

/// Copy the string literal starting at `start` as a JSON string.
/// Returns the index after the closing quote.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    out.push('"');

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if i + 1 < chars.len() => {
                let next = chars[i + 1];
                if next == '\'' {
                    out.push('\'');
                } else {
                    out.push('\\');
                    out.push(next);
                }
                i += 2;
                continue;
            }
            c if c == quote => {
                out.push('"');
                return i + 1;
            }
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
        i += 1;
    }

    // Unterminated literal
    out.push('"');
    chars.len()
}

fn drop_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.truncate(trimmed_len - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_json_wins() {
        assert_eq!(coerce(r#"["a", "b"]"#), json!(["a", "b"]));
        assert_eq!(coerce(r#"{"name": "Disprin"}"#), json!({"name": "Disprin"}));
        assert_eq!(coerce("   "), Value::Null);
    }

    #[test]
    fn test_python_literals() {
        assert_eq!(
            coerce("['Pain relief', 'Fever', \"Child's dose\"]"),
            json!(["Pain relief", "Fever", "Child's dose"])
        );
        assert_eq!(
            coerce("[{'name': 'Disprin', 'otc': True, 'price': None},]"),
            json!([{"name": "Disprin", "otc": true, "price": null}])
        );
        assert_eq!(
            coerce("[('Is it safe?', 'Yes'), ('Dose?', 'Once daily',)]"),
            json!([["Is it safe?", "Yes"], ["Dose?", "Once daily"]])
        );
        assert_eq!(coerce(r"['It\'s fine']"), json!(["It's fine"]));
    }

    #[test]
    fn test_python_to_json_leaves_string_contents_alone() {
        assert_eq!(python_to_json("['True (None)']"), r#"["True (None)"]"#);
        assert_eq!(python_to_json("{'a': 'say \"hi\"'}"), r#"{"a": "say \"hi\""}"#);
    }

    #[test]
    fn test_line_and_bullet_fallbacks() {
        assert_eq!(coerce("- Nausea\n- Dizziness\n\n"), json!(["Nausea", "Dizziness"]));
        assert_eq!(coerce("1. Nausea\n2) Rash"), json!(["Nausea", "Rash"]));
        assert_eq!(coerce("• Nausea • Rash"), json!(["Nausea", "Rash"]));
    }

    #[test]
    fn test_semicolon_and_paragraph_fallbacks() {
        assert_eq!(coerce("Nausea; Rash;"), json!(["Nausea", "Rash"]));
        assert_eq!(coerce("Relieves mild pain, fast."), json!("Relieves mild pain, fast."));
        assert_eq!(coerce("Don't exceed the dose"), json!("Don't exceed the dose"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// A list of plain strings survives Python repr quoting
            #[test]
            fn python_string_lists_parse(items in prop::collection::vec("[a-zA-Z0-9 ,.:]{1,12}", 0..6)) {
                let repr = format!(
                    "[{}]",
                    items.iter().map(|s| format!("'{}'", s)).collect::<Vec<_>>().join(", ")
                );
                prop_assert_eq!(coerce(&repr), json!(items));
            }

            /// JSON-encoded lists come back unchanged
            #[test]
            fn json_lists_are_untouched(items in prop::collection::vec(".{0,12}", 0..6)) {
                let encoded = serde_json::to_string(&items).unwrap();
                prop_assert_eq!(coerce(&encoded), json!(items));
            }
        }
    }
}
