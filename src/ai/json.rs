//! Recovering a JSON object from noisy model output.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("valid code fence regex")
});

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\]}])").expect("valid trailing comma regex"));

/// Top-level keys that mark an embedded object as the payload.
const EXPECTED_KEYS: &[&str] = &["suggestions", "ingredients", "name"];

fn parse_object(candidate: &str) -> Option<Value> {
    let candidate = candidate.trim();
    serde_json::from_str::<Value>(candidate)
        .ok()
        .or_else(|| {
            let repaired = TRAILING_COMMA.replace_all(candidate, "$1");
            serde_json::from_str::<Value>(&repaired).ok()
        })
        .filter(Value::is_object)
}

fn has_expected_key(value: &Value) -> bool {
    EXPECTED_KEYS.iter().any(|key| value.get(key).is_some())
}

/// Byte range of the balanced `{...}` starting at `start`, ignoring braces
/// inside string literals.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// First JSON object in `text`.
///
/// Tries the whole text, then markdown code fences, then every balanced
/// `{...}` in order, accepting the first one carrying `suggestions`,
/// `ingredients` or `name`. Trailing commas are repaired along the way.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Some(value) = parse_object(text) {
        return Some(value);
    }

    for captures in CODE_FENCE.captures_iter(text) {
        if let Some(value) = captures.get(1).and_then(|m| parse_object(m.as_str())) {
            return Some(value);
        }
    }

    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .filter_map(|(start, _)| balanced_end(text, start).map(|end| &text[start..end]))
        .filter_map(parse_object)
        .find(has_expected_key)
}
