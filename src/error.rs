use thiserror::Error;

use crate::validation::ValidationIssue;

/// Errors surfaced across the parse service boundary.
///
/// Every variant maps to a stable wire code (see [`ParseError::code`]); callers
/// receive them as `{code, message}` pairs inside a [`crate::ParseResponse`].
#[derive(Error, Debug)]
pub enum ParseError {
    /// Image mime type is not one of jpeg/png/webp
    #[error("Unsupported image type: {0}. Use image/jpeg, image/png or image/webp")]
    InvalidMimeType(String),

    /// Decoded image exceeds the size cap
    #[error("Image is too large ({0} bytes). Maximum size is 10 MB")]
    ImageTooLarge(usize),

    /// Image payload is not valid base64
    #[error("Image data is not valid base64: {0}")]
    InvalidBase64(String),

    /// Input failed a local sanity check (too short, bad URL, ...)
    #[error("{0}")]
    InvalidInput(String),

    /// Text input exceeds the character cap
    #[error("Text is too long ({0} characters). Maximum is 10,000 characters")]
    InputTooLong(usize),

    /// Ingredient-based generation was called without ingredients
    #[error("Please provide at least one ingredient")]
    NoIngredients,

    /// Page retrieval failed after retries
    #[error("Failed to fetch URL: {0}")]
    FetchFailed(String),

    /// URL cannot be handled by the requested parse mode
    #[error("{0}")]
    UnsupportedUrl(String),

    /// Not enough extractable text to build a recipe from
    #[error("{0}")]
    NoContent(String),

    /// TikTok retrieval failed through every strategy
    #[error("Failed to parse TikTok video: {0}")]
    TikTokParseFailed(String),

    /// Instagram retrieval failed through every strategy
    #[error("Failed to parse Instagram post: {0}")]
    InstagramParseFailed(String),

    /// Basic import found no usable recipe markup
    #[error("No structured recipe data found on this page. Try the full import instead")]
    NoStructuredData,

    /// Model answered but no recipe could be read from the answer
    #[error("Failed to parse recipe from AI response: {0}")]
    AiParseFailed(String),

    /// Model answered with no text at all
    #[error("AI returned an empty response")]
    AiResponseEmpty,

    /// Model invocation itself failed
    #[error("AI request failed: {0}")]
    AiFailed(String),

    /// Recipe suggestion generation failed
    #[error("Failed to generate recipes: {0}")]
    GenerationError(String),

    /// Conversational generation failed
    #[error("Chat request failed: {0}")]
    ChatError(String),

    /// Suggestion generation returned nothing usable
    #[error("No recipe suggestions could be generated from these ingredients")]
    NoSuggestions,

    /// Assembled recipe failed schema validation
    #[error("Parsed recipe failed validation: {}", format_issues(.0))]
    ValidationFailed(Vec<ValidationIssue>),

    /// Parser could not be constructed from configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ParseError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::InvalidMimeType(_) => "INVALID_MIME_TYPE",
            ParseError::ImageTooLarge(_) => "IMAGE_TOO_LARGE",
            ParseError::InvalidBase64(_) => "INVALID_BASE64",
            ParseError::InvalidInput(_) => "INVALID_INPUT",
            ParseError::InputTooLong(_) => "INPUT_TOO_LONG",
            ParseError::NoIngredients => "NO_INGREDIENTS",
            ParseError::FetchFailed(_) => "FETCH_FAILED",
            ParseError::UnsupportedUrl(_) => "UNSUPPORTED_URL",
            ParseError::NoContent(_) => "NO_CONTENT",
            ParseError::TikTokParseFailed(_) => "TIKTOK_PARSE_FAILED",
            ParseError::InstagramParseFailed(_) => "INSTAGRAM_PARSE_FAILED",
            ParseError::NoStructuredData => "NO_STRUCTURED_DATA",
            ParseError::AiParseFailed(_) => "AI_PARSE_FAILED",
            ParseError::AiResponseEmpty => "AI_RESPONSE_EMPTY",
            ParseError::AiFailed(_) => "AI_FAILED",
            ParseError::GenerationError(_) => "GENERATION_ERROR",
            ParseError::ChatError(_) => "CHAT_ERROR",
            ParseError::NoSuggestions => "NO_SUGGESTIONS",
            ParseError::ValidationFailed(_) => "VALIDATION_FAILED",
            ParseError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<config::ConfigError> for ParseError {
    fn from(err: config::ConfigError) -> Self {
        ParseError::Config(err.to_string())
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ParseError::NoStructuredData.code(), "NO_STRUCTURED_DATA");
        assert_eq!(ParseError::InputTooLong(12_000).code(), "INPUT_TOO_LONG");
        assert_eq!(
            ParseError::TikTokParseFailed("x".into()).code(),
            "TIKTOK_PARSE_FAILED"
        );
        assert_eq!(ParseError::AiResponseEmpty.code(), "AI_RESPONSE_EMPTY");
    }

    #[test]
    fn test_validation_message_lists_issues() {
        let err = ParseError::ValidationFailed(vec![
            ValidationIssue::new("name", "must not be empty"),
            ValidationIssue::new("ingredientSections", "must contain at least one section"),
        ]);
        let message = err.to_string();
        assert!(message.contains("name: must not be empty"));
        assert!(message.contains("ingredientSections"));
    }
}
