//! Lenient extraction of JSON objects from model text

use serde_json::{Map, Value};

/// Parse the JSON object in a model reply.
///
/// Accepts a bare object, an object wrapped in code fences, or an object
/// surrounded by prose. Returns `None` when no object can be parsed.
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str(trimmed) {
        return Some(map);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(trimmed.get(start..=end)?) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Render a scalar JSON value as display text; objects and arrays become JSON
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_object() {
        let map = parse_json_object(r#"{"is_math": true}"#).unwrap();
        assert_eq!(map["is_math"], json!(true));
    }

    #[test]
    fn test_fenced_object() {
        let text = "```json\n{\"is_match\": false, \"confidence\": 40}\n```";
        let map = parse_json_object(text).unwrap();
        assert_eq!(map["confidence"], json!(40));
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(parse_json_object("").is_none());
        assert!(parse_json_object("[1, 2]").is_none());
        assert!(parse_json_object("not json at all").is_none());
        assert!(parse_json_object("} backwards {").is_none());
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!("x=3")), "x=3");
        assert_eq!(value_to_text(&json!(3)), "3");
        assert_eq!(value_to_text(&json!(null)), "");
        assert_eq!(value_to_text(&json!(true)), "true");
    }
}
