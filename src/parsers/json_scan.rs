//! Locating JSON values inside arbitrary script text.
//!
//! Script blocks rarely hold a bare JSON document. They assign objects to
//! globals, pass them to functions or embed them next to other code. The
//! scanner here finds balanced `{...}`/`[...]` spans (ignoring brackets inside
//! string literals) so that each span can be handed to `serde_json` on its own.

use serde_json::Value;

/// Opening braces looked at when walking outwards from an anchor.
const MAX_OPENINGS_CONSIDERED: usize = 64;

/// Exclusive end of the object or array opening at byte `start`.
///
/// Returns `None` when `start` is not `{`/`[`, or when the brackets never
/// balance (truncated payload, mismatched closer).
pub fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    match bytes.get(start) {
        Some(b'{') | Some(b'[') => {}
        _ => return None,
    }

    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' | b'[' => stack.push(b),
            b'}' | b']' => {
                let opener = if b == b'}' { b'{' } else { b'[' };
                if stack.pop() != Some(opener) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }

    None
}

pub fn balanced_slice(text: &str, start: usize) -> Option<&str> {
    balanced_end(text, start).map(|end| &text[start..end])
}

/// Parses the balanced value opening at `start`.
pub fn parse_at(text: &str, start: usize) -> Option<Value> {
    balanced_slice(text, start).and_then(|slice| serde_json::from_str(slice).ok())
}

/// Parses the whole text as one JSON document, tolerating a trailing `;`.
pub fn parse_whole(text: &str) -> Option<Value> {
    let trimmed = text.trim().trim_end_matches(';').trim_end();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Objects that enclose byte `anchor` and parse as JSON, innermost first.
pub fn enclosing_values(text: &str, anchor: usize) -> impl Iterator<Item = Value> + '_ {
    let anchor = anchor.min(text.len());
    text[..anchor]
        .rmatch_indices('{')
        .take(MAX_OPENINGS_CONSIDERED)
        .filter_map(move |(start, _)| {
            let end = balanced_end(text, start)?;
            if end <= anchor {
                return None;
            }
            serde_json::from_str::<Value>(&text[start..end]).ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_end_of_nested_object() {
        let text = r#"var x = {"a":[1,{"b":2}],"c":"}"} ;"#;
        let start = text.find('{').unwrap();
        let end = balanced_end(text, start).unwrap();
        assert_eq!(&text[start..end], r#"{"a":[1,{"b":2}],"c":"}"}"#);
    }

    #[test]
    fn ignores_escaped_quotes_inside_strings() {
        let text = r#"{"a":"say \"}\" twice"}"#;
        assert_eq!(balanced_end(text, 0), Some(text.len()));
    }

    #[test]
    fn unbalanced_or_mismatched_spans_fail() {
        assert_eq!(balanced_end(r#"{"a":[1,2}"#, 0), None);
        assert_eq!(balanced_end(r#"{"a":1"#, 0), None);
        assert_eq!(balanced_end("abc", 0), None);
    }

    #[test]
    fn parse_whole_accepts_trailing_semicolon() {
        assert_eq!(parse_whole(" {\"a\":1}; "), Some(json!({"a": 1})));
        assert_eq!(parse_whole("window.x = {}"), None);
    }

    #[test]
    fn enclosing_values_walk_outwards() {
        let text = r#"init({"outer":{"inner":{"attributeId":"c_brand"}}}, broken{);"#;
        let anchor = text.find("c_brand").unwrap();
        let values: Vec<Value> = enclosing_values(text, anchor).collect();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], json!({"attributeId": "c_brand"}));
        assert!(values[2].get("outer").is_some());
    }

    #[test]
    fn enclosing_values_skip_closed_siblings() {
        let text = r#"{"x":{"y":1},"z":"c_brand"}"#;
        let anchor = text.find("c_brand").unwrap();
        let values: Vec<Value> = enclosing_values(text, anchor).collect();
        assert_eq!(values, vec![json!({"x": {"y": 1}, "z": "c_brand"})]);
    }
}
