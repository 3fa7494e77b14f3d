//! Best-effort recovery of a JSON array of objects from model output.
//!
//! Models wrap their answer in prose or code fences, leave keys unquoted,
//! add trailing commas, and sometimes number `steps` as separate array
//! elements (`[1, 'Open app', 2, 'Tap login']`). The chain below is tried
//! in order and stops at the first strict parse that succeeds:
//!
//! 1. strict parse of the raw text
//! 2. narrow to the first `[{ … }]` with a balanced closing bracket
//! 3. rebuild `steps` arrays from their quoted segments
//! 4. quote bare keys and drop trailing commas
//! 5. strict parse again, or [`ReqflowError::ParseFailed`]
//!
//! Every pass skips over string literals (single- or double-quoted), so
//! text inside values is never rewritten.

use crate::error::{ReqflowError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::ops::Range;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The raw text was already valid JSON.
    Direct,
    /// The text only parsed after extraction and repair.
    Repaired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub value: Value,
    pub strategy: Strategy,
}

/// Run the repair chain over `raw`.
pub fn recover_json(raw: &str) -> Result<Recovered> {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Ok(Recovered {
            value,
            strategy: Strategy::Direct,
        });
    }

    let narrowed = extract_array_of_objects(raw).unwrap_or(raw);
    let repaired = repair(narrowed);

    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => Ok(Recovered {
            value,
            strategy: Strategy::Repaired,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "model output still unparseable after repair");
            Err(ReqflowError::ParseFailed(e.to_string()))
        }
    }
}

/// Recover `raw` and deserialize it as a list of `T`.
///
/// Anything other than an array whose items all deserialize is a
/// [`ReqflowError::ParseFailed`]; no partial list is returned.
pub fn parse_items<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>> {
    let recovered = recover_json(raw)?;
    if !recovered.value.is_array() {
        return Err(ReqflowError::ParseFailed(format!(
            "expected a JSON array, got {}",
            kind_of(&recovered.value)
        )));
    }
    serde_json::from_value(recovered.value).map_err(|e| ReqflowError::ParseFailed(e.to_string()))
}

/// Locate the first `[` whose next non-whitespace character is `{` and
/// return the slice up to its balanced closing `]`.
pub fn extract_array_of_objects(text: &str) -> Option<&str> {
    text.match_indices('[')
        .filter(|(i, _)| text[i + 1..].trim_start().starts_with('{'))
        .find_map(|(start, _)| matching_bracket(text, start).map(|end| &text[start..=end]))
}

/// Steps 3 and 4 of the chain, without the surrounding parses.
pub fn repair(text: &str) -> String {
    let text = repair_steps_arrays(text);
    let text = quote_bare_keys(&text);
    strip_trailing_commas(&text)
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

static STEPS_KEY_RE: OnceLock<Regex> = OnceLock::new();
static BARE_KEY_RE: OnceLock<Regex> = OnceLock::new();
static TRAILING_COMMA_RE: OnceLock<Regex> = OnceLock::new();

fn steps_key_re() -> &'static Regex {
    STEPS_KEY_RE.get_or_init(|| Regex::new(r#"(?:"steps"|'steps'|\bsteps\b)\s*:\s*\["#).unwrap())
}

fn bare_key_re() -> &'static Regex {
    BARE_KEY_RE.get_or_init(|| Regex::new(r"([{,]\s*)([A-Za-z_$][\w$]*)(\s*:)").unwrap())
}

fn trailing_comma_re() -> &'static Regex {
    TRAILING_COMMA_RE.get_or_init(|| Regex::new(r",(\s*[}\]])").unwrap())
}

/// Rewrite every `steps: [...]` as an array of the quoted segments it
/// contains. Arrays holding nested objects or arrays are left alone.
fn repair_steps_arrays(text: &str) -> String {
    let spans = string_spans(text);
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;

    for m in steps_key_re().find_iter(text) {
        if m.start() < copied || inside_literal(&spans, m.start()) {
            continue;
        }
        let open = m.end() - 1;
        let Some(close) = matching_bracket(text, open) else {
            continue;
        };
        let Some(steps) = quoted_items(&text[open + 1..close]) else {
            continue;
        };
        let items: Vec<String> = steps
            .iter()
            .map(|s| serde_json::Value::String(s.clone()).to_string())
            .collect();

        out.push_str(&text[copied..m.start()]);
        out.push_str("\"steps\": [");
        out.push_str(&items.join(", "));
        out.push(']');
        copied = close + 1;
    }
    out.push_str(&text[copied..]);
    out
}

/// The decoded quoted segments of an array body, or `None` if the body
/// contains nested structure.
fn quoted_items(body: &str) -> Option<Vec<String>> {
    let mut items = Vec::new();
    for segment in segments(body) {
        match segment {
            Segment::Literal(lit) => items.push(decode_literal(lit)),
            Segment::Code(code) => {
                if code.contains(['{', '[']) {
                    return None;
                }
            }
        }
    }
    Some(items)
}

fn quote_bare_keys(text: &str) -> String {
    map_code(text, |code| {
        bare_key_re()
            .replace_all(code, "${1}\"${2}\"${3}")
            .into_owned()
    })
}

fn strip_trailing_commas(text: &str) -> String {
    map_code(text, |code| trailing_comma_re().replace_all(code, "${1}").into_owned())
}

// ---------------------------------------------------------------------------
// Lexical helpers
// ---------------------------------------------------------------------------

enum Segment<'a> {
    /// A quoted literal, quotes included.
    Literal(&'a str),
    /// Everything between literals.
    Code(&'a str),
}

/// Byte ranges of quoted literals, quotes included. An unterminated quote
/// runs to the end of the text.
fn string_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if matches!(bytes[i], b'"' | b'\'') {
            let end = closing_quote(bytes, i).map_or(bytes.len(), |c| c + 1);
            spans.push(i..end);
            i = end;
        } else {
            i += 1;
        }
    }
    spans
}

fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0;
    for span in string_spans(text) {
        if span.start > last {
            out.push(Segment::Code(&text[last..span.start]));
        }
        out.push(Segment::Literal(&text[span.clone()]));
        last = span.end;
    }
    if last < text.len() {
        out.push(Segment::Code(&text[last..]));
    }
    out
}

/// Apply `f` to the code between literals, copying literals verbatim.
fn map_code(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Literal(lit) => out.push_str(lit),
            Segment::Code(code) => out.push_str(&f(code)),
        }
    }
    out
}

fn inside_literal(spans: &[Range<usize>], pos: usize) -> bool {
    spans.iter().any(|s| s.start < pos && pos < s.end)
}

fn closing_quote(bytes: &[u8], open: usize) -> Option<usize> {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Index of the `]` closing the `[` at `open`, skipping quoted literals.
fn matching_bracket(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = closing_quote(bytes, i)?,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn decode_literal(lit: &str) -> String {
    let quote = &lit[..1];
    let inner = lit[1..].strip_suffix(quote).unwrap_or(&lit[1..]);
    if quote == "\"" {
        serde_json::from_str::<String>(lit).unwrap_or_else(|_| inner.to_string())
    } else {
        inner.replace("\\'", "'")
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Requirement, TestCase};
    use serde_json::json;

    #[test]
    fn valid_json_is_returned_directly() {
        let raw = r#"[{"title": "A", "steps": ["x"], "expected_result": "y"}]"#;
        let recovered = recover_json(raw).unwrap();
        assert_eq!(recovered.strategy, Strategy::Direct);
        assert_eq!(recovered.value, serde_json::from_str::<Value>(raw).unwrap());
    }

    #[test]
    fn end_to_end_malformed_test_cases() {
        let raw = "Sure! Here you go:\n[{title: \"T1\", steps: [1, 'Open app', 2, 'Tap login'], expected_result: \"Login succeeds\"},]";
        let recovered = recover_json(raw).unwrap();
        assert_eq!(recovered.strategy, Strategy::Repaired);
        assert_eq!(
            recovered.value,
            json!([{
                "title": "T1",
                "steps": ["Open app", "Tap login"],
                "expected_result": "Login succeeds"
            }])
        );
    }

    #[test]
    fn steps_mixed_array_keeps_only_quoted_strings_in_order() {
        let text = r#"[{"steps": [1, 'First', 2, "Second", 3, 'Third']}]"#;
        let repaired = repair(text);
        let value: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value[0]["steps"], json!(["First", "Second", "Third"]));
    }

    #[test]
    fn steps_with_brackets_inside_strings() {
        let text = r#"[{steps: [1, 'Press [Enter]', 2, "Check ]"]}]"#;
        let value: Value = serde_json::from_str(&repair(text)).unwrap();
        assert_eq!(value[0]["steps"], json!(["Press [Enter]", "Check ]"]));
    }

    #[test]
    fn steps_single_quoted_strings_with_double_quotes_are_escaped() {
        let text = r#"[{"steps": [1, 'Type "hello"']}]"#;
        let value: Value = serde_json::from_str(&repair(text)).unwrap();
        assert_eq!(value[0]["steps"], json!(["Type \"hello\""]));
    }

    #[test]
    fn steps_word_inside_a_value_is_not_rewritten() {
        let text = r#"[{"title": "Follow steps: [a, b]", "steps": ["x"]}]"#;
        let value: Value = serde_json::from_str(&repair(text)).unwrap();
        assert_eq!(value[0]["title"], "Follow steps: [a, b]");
        assert_eq!(value[0]["steps"], json!(["x"]));
    }

    #[test]
    fn steps_with_nested_objects_are_left_alone() {
        let text = r#"[{"steps": [{"n": 1, "do": "x"}]}]"#;
        assert_eq!(repair(text), text);
    }

    #[test]
    fn extraction_strips_markdown_fences() {
        let raw = "```json\n[{\"title\": \"A\"}]\n```";
        assert_eq!(extract_array_of_objects(raw), Some("[{\"title\": \"A\"}]"));
        let recovered = recover_json(raw).unwrap();
        assert_eq!(recovered.value, json!([{"title": "A"}]));
    }

    #[test]
    fn extraction_ignores_leading_prose_and_bracketed_notes() {
        let raw = "Here [see below] are the items:\n[ {\"a\": [1, 2]}, {\"b\": \"]\"} ]\nHope this helps [1].";
        assert_eq!(
            extract_array_of_objects(raw),
            Some("[ {\"a\": [1, 2]}, {\"b\": \"]\"} ]")
        );
    }

    #[test]
    fn extraction_returns_none_without_array_of_objects() {
        assert_eq!(extract_array_of_objects("just [1, 2, 3] numbers"), None);
        assert_eq!(extract_array_of_objects("no brackets at all"), None);
    }

    #[test]
    fn extraction_returns_none_for_truncated_array() {
        assert_eq!(extract_array_of_objects("[{\"a\": 1}, {\"b\":"), None);
    }

    #[test]
    fn trailing_comma_before_brace_is_removed() {
        let text = r#"[{"title": "A", "expected_result": "B",}]"#;
        let value: Value = serde_json::from_str(&repair(text)).unwrap();
        assert_eq!(value, json!([{"title": "A", "expected_result": "B"}]));
    }

    #[test]
    fn trailing_comma_inside_string_is_kept() {
        let text = r#"[{"title": "a,}", "x": 1,}]"#;
        let value: Value = serde_json::from_str(&repair(text)).unwrap();
        assert_eq!(value[0]["title"], "a,}");
    }

    #[test]
    fn bare_keys_are_quoted_but_values_untouched() {
        let text = r#"[{title: "Step 1: open https://example.com", expected_result: "ok"}]"#;
        let value: Value = serde_json::from_str(&repair(text)).unwrap();
        assert_eq!(value[0]["title"], "Step 1: open https://example.com");
        assert_eq!(value[0]["expected_result"], "ok");
    }

    #[test]
    fn bare_keys_across_lines() {
        let text = "[\n  {\n    title: \"A\",\n    acceptance_criteria: [\"x\"]\n  }\n]";
        let value: Value = serde_json::from_str(&repair(text)).unwrap();
        assert_eq!(value[0]["acceptance_criteria"], json!(["x"]));
    }

    #[test]
    fn unrecognizable_text_is_a_parse_failure() {
        let err = recover_json("I'm sorry, I can't help with that.").unwrap_err();
        assert!(matches!(err, ReqflowError::ParseFailed(_)));
    }

    #[test]
    fn empty_text_is_a_parse_failure() {
        assert!(matches!(
            recover_json("").unwrap_err(),
            ReqflowError::ParseFailed(_)
        ));
    }

    #[test]
    fn parse_items_builds_test_cases() {
        let raw = "Sure! Here you go:\n[{title: \"T1\", steps: [1, 'Open app', 2, 'Tap login'], expected_result: \"Login succeeds\"},]";
        let cases: Vec<TestCase> = parse_items(raw).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].steps, vec!["Open app", "Tap login"]);
    }

    #[test]
    fn parse_items_rejects_missing_fields() {
        let raw = r#"[{"title": "A", "description": "B"}]"#;
        let err = parse_items::<Requirement>(raw).unwrap_err();
        assert!(err.to_string().contains("acceptance_criteria"));
    }

    #[test]
    fn parse_items_rejects_non_array() {
        let err = parse_items::<Requirement>(r#"{"title": "A"}"#).unwrap_err();
        assert!(err.to_string().contains("expected a JSON array, got an object"));
    }
}
