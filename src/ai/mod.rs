//! Generative model extraction for each input modality.

pub mod json;
pub mod prompt;
pub mod response;

pub use json::extract_json;
pub use prompt::PagePrompt;
pub use response::{extract_response_text, ResponseShape};

use crate::config::ApiStyle;
use crate::error::ParseError;
use crate::fetchers::SocialContent;
use crate::providers::{ChatMessage, LlmProvider, ModelRequest};
use log::{debug, info};
use serde_json::Value;

/// Runs the model for one parse and returns its JSON payload.
pub struct AiExtractor<'a> {
    provider: &'a dyn LlmProvider,
    api_style: ApiStyle,
}

impl<'a> AiExtractor<'a> {
    pub fn new(provider: &'a dyn LlmProvider, api_style: ApiStyle) -> Self {
        Self {
            provider,
            api_style,
        }
    }

    pub async fn extract_from_text(&self, text: &str) -> Result<Value, ParseError> {
        let user = ChatMessage::user(prompt::text_prompt(text));
        self.extract(user).await
    }

    pub async fn extract_from_page(&self, page: &PagePrompt<'_>) -> Result<Value, ParseError> {
        let user = ChatMessage::user(prompt::page_prompt(page));
        self.extract(user).await
    }

    pub async fn extract_from_social(&self, content: &SocialContent) -> Result<Value, ParseError> {
        let user = ChatMessage::user(prompt::social_prompt(content));
        self.extract(user).await
    }

    /// `base64` is the raw payload without a `data:` prefix.
    pub async fn extract_from_image(
        &self,
        base64: &str,
        mime_type: &str,
    ) -> Result<Value, ParseError> {
        let data_uri = format!("data:{};base64,{}", mime_type, base64);
        let user = ChatMessage::user_with_image(prompt::image_prompt(), data_uri);
        self.extract(user).await
    }

    async fn extract(&self, user: ChatMessage) -> Result<Value, ParseError> {
        let request = prompt::build_request(self.api_style, prompt::RECIPE_SYSTEM_PROMPT, user);
        self.complete_json(&request).await
    }

    /// One model call, reduced to a JSON object.
    ///
    /// Transport failure is `AI_FAILED`, blank output `AI_RESPONSE_EMPTY`,
    /// and output without a usable object (or with a non-empty `error`
    /// field) `AI_PARSE_FAILED`.
    pub async fn complete_json(&self, request: &ModelRequest) -> Result<Value, ParseError> {
        info!("Invoking {} model", self.provider.provider_name());
        let raw = self
            .provider
            .run(request)
            .await
            .map_err(|e| ParseError::AiFailed(e.to_string()))?;

        let text = extract_response_text(&raw);
        if text.trim().is_empty() {
            return Err(ParseError::AiResponseEmpty);
        }

        let value = extract_json(&text).ok_or_else(|| {
            debug!("Model output without JSON: {}", text);
            ParseError::AiParseFailed("no JSON object found in model output".to_string())
        })?;

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            if !error.trim().is_empty() {
                return Err(ParseError::AiParseFailed(error.trim().to_string()));
            }
        }

        Ok(value)
    }
}
