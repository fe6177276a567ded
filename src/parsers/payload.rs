//! Turning string-literal payloads back into JSON text.
//!
//! React Server Components stream their object graph through calls such as
//! `self.__next_f.push([1,"62:[\"$63\",\"$64\"]\n63:{\"hitCount\":5,...}"])`.
//! The data is only reachable after the string literal has been unescaped.
//!
//! Rules, applied in order:
//! 1. the literal is decoded as a JSON string (`\"`, `\\`, `\n`, `\uXXXX`);
//!    when that fails (JS-only escapes), [`UNESCAPE_RULES`] are applied instead;
//! 2. bare `$`-prefixed tokens (`:$L1}`, `[$62,`) are quoted so the result
//!    parses as JSON.

use once_cell::sync::Lazy;
use regex::Regex;

use super::scripts::{ScriptBlock, ScriptSet};

/// Stands in for an escaped backslash while the other rules run.
const BACKSLASH_PLACEHOLDER: &str = "\u{0}";

/// Fallback replacements, applied in order. Escaped backslashes are parked
/// first so `\\n` stays a backslash followed by `n`.
pub const UNESCAPE_RULES: &[(&str, &str)] = &[
    ("\\\\\\\"", "\""),
    ("\\\\", BACKSLASH_PLACEHOLDER),
    ("\\\"", "\""),
    ("\\'", "'"),
    ("\\n", "\n"),
    ("\\/", "/"),
    (BACKSLASH_PLACEHOLDER, "\\"),
];

/// Marks the streamed RSC chunks, which are concatenated before searching.
pub const RSC_PUSH_MARKER: &str = "__next_f.push";

static BARE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([:\[,])\s*(\$[A-Za-z0-9@_]+)(\s*[,\]}])").expect("Invalid bare reference regex")
});

/// True when the text carries escaped quotes, i.e. JSON inside a string literal.
pub fn looks_escaped(text: &str) -> bool {
    text.contains("\\\"")
}

/// Raw (still escaped) contents of the string literals in a script.
///
/// Double-quoted literals are always returned. Single-quoted ones only when
/// they carry escaped JSON (`JSON.parse('{\"a\":1}')`). Template literals are
/// skipped, but still scanned over so their quotes do not desynchronise the scan.
pub fn string_literals(script: &str) -> Vec<&str> {
    let bytes = script.as_bytes();
    let mut literals = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let quote = bytes[i];
        if quote != b'"' && quote != b'\'' && quote != b'`' {
            i += 1;
            continue;
        }

        let start = i + 1;
        let mut j = start;
        let mut closed = false;
        while j < bytes.len() {
            match bytes[j] {
                b'\\' => j += 2,
                b if b == quote => {
                    closed = true;
                    break;
                }
                _ => j += 1,
            }
        }

        if !closed {
            break;
        }
        let literal = &script[start..j];
        if quote == b'"' || (quote == b'\'' && looks_escaped(literal)) {
            literals.push(literal);
        }
        i = j + 1;
    }

    literals
}

/// Decodes one literal, strictly if possible.
pub fn decode_literal(raw: &str) -> String {
    match serde_json::from_str::<String>(&format!("\"{}\"", raw)) {
        Ok(decoded) => decoded,
        Err(_) => apply_unescape_rules(raw),
    }
}

pub fn apply_unescape_rules(raw: &str) -> String {
    UNESCAPE_RULES
        .iter()
        .fold(raw.to_string(), |text, (from, to)| text.replace(from, to))
}

/// Quotes bare `$` tokens: `{"a":$L1}` becomes `{"a":"$L1"}`.
pub fn neutralize_references(text: &str) -> String {
    let mut current = text.to_string();
    // each pass consumes the delimiter after a token, so adjacent tokens need another pass
    for _ in 0..8 {
        let next = BARE_REFERENCE.replace_all(&current, "${1}\"${2}\"${3}");
        if next == current {
            break;
        }
        current = next.into_owned();
    }
    current
}

pub fn normalize_payload(raw_literal: &str) -> String {
    neutralize_references(&decode_literal(raw_literal))
}

/// Decoded payload blocks for every script that embeds escaped JSON.
///
/// RSC push chunks are joined into one block because a single object may be
/// split across consecutive pushes. Returns `None` when nothing is escaped.
pub fn normalize_scripts(scripts: &ScriptSet) -> Option<ScriptSet> {
    let mut stream = String::new();
    let mut stream_index = None;
    let mut blocks = Vec::new();

    for block in scripts.iter() {
        let is_stream = block.text.contains(RSC_PUSH_MARKER);
        if !is_stream && !looks_escaped(&block.text) {
            continue;
        }

        for literal in string_literals(&block.text) {
            if !looks_escaped(literal) && !is_stream {
                continue;
            }
            let decoded = normalize_payload(literal);
            if is_stream {
                stream_index.get_or_insert(block.index);
                stream.push_str(&decoded);
            } else {
                blocks.push(ScriptBlock::synthetic(block.index, decoded));
            }
        }
    }

    if let Some(index) = stream_index {
        blocks.insert(0, ScriptBlock::synthetic(index, stream));
    }

    if blocks.is_empty() {
        None
    } else {
        Some(ScriptSet::new(blocks))
    }
}
