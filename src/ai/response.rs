//! Getting the generated text out of a model response.

use serde_json::Value;

/// Known response envelopes, in the order they are tried.
#[derive(Debug, PartialEq)]
pub enum ResponseShape<'a> {
    /// The response is the text itself
    Plain(&'a str),
    /// `{"response": ...}`; non-string payloads are re-serialized
    Response(&'a Value),
    /// `{"generated_text": "..."}`
    GeneratedText(&'a str),
    /// Responses API: `{"output": [{"content": [{"text": "..."}]}]}`
    Output(&'a [Value]),
    Unknown,
}

impl<'a> ResponseShape<'a> {
    pub fn of(value: &'a Value) -> Self {
        if let Some(text) = value.as_str() {
            return ResponseShape::Plain(text);
        }
        if let Some(response) = value.get("response").filter(|r| !r.is_null()) {
            return ResponseShape::Response(response);
        }
        if let Some(text) = value.get("generated_text").and_then(Value::as_str) {
            return ResponseShape::GeneratedText(text);
        }
        if let Some(output) = value.get("output").and_then(Value::as_array) {
            return ResponseShape::Output(output);
        }
        ResponseShape::Unknown
    }

    pub fn text(&self) -> String {
        match self {
            ResponseShape::Plain(text) | ResponseShape::GeneratedText(text) => text.to_string(),
            ResponseShape::Response(Value::String(text)) => text.clone(),
            ResponseShape::Response(other) => other.to_string(),
            ResponseShape::Output(items) => items
                .iter()
                .filter_map(|item| item.get("content").and_then(Value::as_array))
                .flatten()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(""),
            ResponseShape::Unknown => String::new(),
        }
    }
}

/// Generated text from any known envelope; unknown shapes give `""`.
pub fn extract_response_text(value: &Value) -> String {
    ResponseShape::of(value).text()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_string() {
        assert_eq!(extract_response_text(&json!("hello")), "hello");
    }

    #[test]
    fn test_response_field() {
        assert_eq!(extract_response_text(&json!({"response": "{}"})), "{}");
        assert_eq!(
            extract_response_text(&json!({"response": {"name": "Tea"}})),
            r#"{"name":"Tea"}"#
        );
    }

    #[test]
    fn test_response_wins_over_generated_text() {
        let value = json!({"response": "a", "generated_text": "b"});
        assert_eq!(extract_response_text(&value), "a");
    }

    #[test]
    fn test_generated_text() {
        assert_eq!(extract_response_text(&json!({"generated_text": "x"})), "x");
    }

    #[test]
    fn test_responses_api_output() {
        let value = json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "{\"name\":"},
                    {"type": "output_text", "text": " \"Tea\"}"}
                ]}
            ]
        });
        assert_eq!(extract_response_text(&value), "{\"name\": \"Tea\"}");
    }

    #[test]
    fn test_unknown_shapes_are_empty() {
        assert_eq!(extract_response_text(&json!({"choices": []})), "");
        assert_eq!(extract_response_text(&json!(42)), "");
        assert_eq!(extract_response_text(&json!({"response": null})), "");
    }
}
