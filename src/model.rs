use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Where a parsed recipe came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Url,
    Image,
    Text,
    Ai,
    Manual,
    User,
}

/// Canonical structured recipe produced by every parse path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRecipe {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Minutes
    #[serde(default)]
    pub prep_time: Option<u32>,
    /// Minutes
    #[serde(default)]
    pub cook_time: Option<u32>,
    /// Minutes
    #[serde(default)]
    pub total_time: Option<u32>,
    /// Sign and zero are not constrained; consumers clamp.
    #[serde(default)]
    pub servings: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub source_type: SourceType,
    pub ingredient_sections: Vec<IngredientSection>,
    pub instruction_sections: Vec<InstructionSection>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_tags: Option<Vec<SuggestedTag>>,
}

impl ParsedRecipe {
    pub fn ingredient_count(&self) -> usize {
        self.ingredient_sections
            .iter()
            .map(|section| section.ingredients.len())
            .sum()
    }

    pub fn instruction_count(&self) -> usize {
        self.instruction_sections
            .iter()
            .map(|section| section.instructions.len())
            .sum()
    }
}

/// A group of ingredients. `name: None` is the implicit, heading-less group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientSection {
    pub name: Option<String>,
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// 0-based, local to the owning section
    pub index: usize,
    pub quantity: Option<f64>,
    /// Canonical unit when recognized, otherwise the lowercased original
    pub unit: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionSection {
    pub name: Option<String>,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub index: usize,
    pub instruction: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    Cuisine,
    MealType,
    Occasion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTag {
    #[serde(rename = "type")]
    pub tag_type: TagType,
    pub name: String,
}

/// Kind of input a parse started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Url,
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMethod {
    StructuredData,
    AiEnhanced,
    AiOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Provenance returned alongside a parsed recipe; never cached with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMetadata {
    pub source: InputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_method: Option<ParseMethod>,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

/// Request accepted by [`crate::RecipeParser::parse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParseInput {
    Url {
        data: String,
        #[serde(default, rename = "structuredOnly")]
        structured_only: bool,
    },
    Text {
        data: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ParseInput {
    pub fn url(url: impl Into<String>) -> Self {
        ParseInput::Url {
            data: url.into(),
            structured_only: false,
        }
    }

    pub fn structured_url(url: impl Into<String>) -> Self {
        ParseInput::Url {
            data: url.into(),
            structured_only: true,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ParseInput::Text { data: text.into() }
    }

    pub fn image(base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
        ParseInput::Image {
            data: base64.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// A successful parse before it is wrapped in the response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    pub recipe: ParsedRecipe,
    pub metadata: ParseMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Service envelope: `{success: true, data, metadata}` or
/// `{success: false, error: {code, message}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParseResponse {
    Success {
        success: bool,
        data: ParsedRecipe,
        metadata: ParseMetadata,
    },
    Failure {
        success: bool,
        error: ErrorBody,
    },
}

impl ParseResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ParseResponse::Success { .. })
    }

    pub fn recipe(&self) -> Option<&ParsedRecipe> {
        match self {
            ParseResponse::Success { data, .. } => Some(data),
            ParseResponse::Failure { .. } => None,
        }
    }

    pub fn metadata(&self) -> Option<&ParseMetadata> {
        match self {
            ParseResponse::Success { metadata, .. } => Some(metadata),
            ParseResponse::Failure { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            ParseResponse::Success { .. } => None,
            ParseResponse::Failure { error, .. } => Some(&error.code),
        }
    }
}

impl From<Result<ParseOutput, ParseError>> for ParseResponse {
    fn from(result: Result<ParseOutput, ParseError>) -> Self {
        match result {
            Ok(output) => ParseResponse::Success {
                success: true,
                data: output.recipe,
                metadata: output.metadata,
            },
            Err(err) => ParseResponse::Failure {
                success: false,
                error: ErrorBody {
                    code: err.code().to_string(),
                    message: err.to_string(),
                },
            },
        }
    }
}
