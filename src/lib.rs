//! Turns recipe web pages, social media posts, pasted text and photos into
//! structured, sectioned recipes.
//!
//! ```no_run
//! use recipe_parser::{ParseInput, RecipeParser};
//!
//! # async fn run() -> Result<(), recipe_parser::ParseError> {
//! let parser = RecipeParser::builder().build()?;
//! let response = parser
//!     .parse(ParseInput::url("https://example.com/recipes/soup"))
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod assembler;
pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fetchers;
pub mod generation;
pub mod html;
pub mod images;
pub mod model;
pub mod pipeline;
pub mod providers;
pub mod units;
pub mod validation;

pub use builder::RecipeParserBuilder;
pub use cache::{cache_key, cache_recipe, get_cached_recipe, CacheError, KvStore, MemoryKvStore};
pub use config::{load_config, ParserConfig};
pub use error::ParseError;
pub use extractors::{extract_structured, extract_structured_with_microdata};
pub use generation::RecipeSuggestion;
pub use images::{reupload_images, ImageUploader, UploadOutcome};
pub use model::{
    Confidence, Ingredient, IngredientSection, InputKind, Instruction, InstructionSection,
    ParseInput, ParseMetadata, ParseMethod, ParseOutput, ParseResponse, ParsedRecipe, SourceType,
    SuggestedTag, TagType,
};
pub use pipeline::RecipeParser;
pub use providers::{ChatMessage, LlmProvider, ProviderFactory};
pub use units::normalize_unit;
pub use validation::{validate_recipe, ValidationIssue};
