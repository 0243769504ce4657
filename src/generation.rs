//! Recipe generation that starts from ingredients or a conversation rather
//! than an existing source.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ai::prompt::{
    build_request, chat_system_prompt, suggestion_prompt, SUGGESTION_SYSTEM_PROMPT,
};
use crate::assembler::assemble_recipe;
use crate::config::ApiStyle;
use crate::error::ParseError;
use crate::model::{ParsedRecipe, SourceType};
use crate::pipeline::RecipeParser;
use crate::providers::{ChatMessage, ModelRequest};
use crate::validation::validate_recipe;

/// A recipe idea built mostly from ingredients at hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSuggestion {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub used_ingredients: Vec<String>,
    #[serde(default)]
    pub missing_ingredients: Vec<String>,
    #[serde(default)]
    pub total_time: Option<u32>,
}

fn suggestions_from(value: &Value) -> Vec<RecipeSuggestion> {
    value
        .get("suggestions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match serde_json::from_value::<RecipeSuggestion>(item.clone()) {
                    Ok(suggestion) => Some(suggestion),
                    Err(e) => {
                        warn!("Skipping malformed suggestion: {}", e);
                        None
                    }
                })
                .filter(|suggestion| !suggestion.name.trim().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn conversation_request(style: ApiStyle, history: &[ChatMessage]) -> ModelRequest {
    let system = chat_system_prompt();
    match style {
        ApiStyle::Chat => {
            let mut messages = Vec::with_capacity(history.len() + 1);
            messages.push(ChatMessage::system(system));
            messages.extend_from_slice(history);
            ModelRequest::Messages(messages)
        }
        ApiStyle::Responses => ModelRequest::Instructions {
            instructions: system,
            input: history.to_vec(),
        },
    }
}

impl RecipeParser {
    /// Suggests recipes for the given ingredients.
    pub async fn suggest_recipes(
        &self,
        ingredients: &[String],
    ) -> Result<Vec<RecipeSuggestion>, ParseError> {
        let ingredients: Vec<String> = ingredients
            .iter()
            .map(|ingredient| ingredient.trim().to_string())
            .filter(|ingredient| !ingredient.is_empty())
            .collect();
        if ingredients.is_empty() {
            return Err(ParseError::NoIngredients);
        }

        info!("Generating suggestions for {} ingredients", ingredients.len());
        let request = build_request(
            self.config.ai.api_style,
            SUGGESTION_SYSTEM_PROMPT,
            ChatMessage::user(suggestion_prompt(&ingredients)),
        );
        let value = self
            .extractor()
            .complete_json(&request)
            .await
            .map_err(|e| ParseError::GenerationError(e.to_string()))?;

        let suggestions = suggestions_from(&value);
        if suggestions.is_empty() {
            return Err(ParseError::NoSuggestions);
        }
        Ok(suggestions)
    }

    /// Writes the recipe a conversation converges on. The last message is
    /// normally the user's latest request.
    pub async fn chat_generate(&self, history: &[ChatMessage]) -> Result<ParsedRecipe, ParseError> {
        if history.is_empty() {
            return Err(ParseError::ChatError("conversation is empty".to_string()));
        }

        let request = conversation_request(self.config.ai.api_style, history);
        let value = self
            .extractor()
            .complete_json(&request)
            .await
            .map_err(|e| ParseError::ChatError(e.to_string()))?;

        let recipe = assemble_recipe(&value, SourceType::Ai, None);
        validate_recipe(&recipe).map_err(ParseError::ValidationFailed)?;
        Ok(recipe)
    }
}
