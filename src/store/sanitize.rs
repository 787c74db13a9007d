use serde_json::Value;

/// Recursively strips control characters the store cannot hold from every
/// string in the tree. Tab, newline, and carriage return survive; everything
/// else below 0x20 is dropped.
pub fn scrub(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(scrub_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(scrub).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (scrub_str(&k), scrub(v)))
                .collect(),
        ),
        other => other,
    }
}

fn scrub_str(s: &str) -> String {
    if s.chars().all(|c| !is_forbidden(c)) {
        return s.to_string();
    }
    s.chars().filter(|c| !is_forbidden(*c)).collect()
}

fn is_forbidden(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_control_chars_keeps_whitespace() {
        let scrubbed = scrub(json!("a\u{0}b\tc\nd\re\u{b}f"));
        assert_eq!(scrubbed, json!("ab\tc\nd\ref"));
    }

    #[test]
    fn test_recurses_into_nested_structures() {
        let scrubbed = scrub(json!({
            "list": ["x\u{1}y", 1, null],
            "inner": {"k\u{0}ey": "v\u{c}"}
        }));
        assert_eq!(
            scrubbed,
            json!({"list": ["xy", 1, null], "inner": {"key": "v"}})
        );
    }

    #[test]
    fn test_primitives_untouched() {
        assert_eq!(scrub(json!(42)), json!(42));
        assert_eq!(scrub(json!(true)), json!(true));
        assert_eq!(scrub(json!(null)), json!(null));
    }
}
