//! Structured recipe data embedded in pages.
//!
//! [`extract_structured`] reads schema.org JSON-LD only and returns a
//! sectioned [`ParsedRecipe`]. [`extract_structured_with_microdata`] adds the
//! older microdata markup as a fallback and is opt-in.

use crate::model::ParsedRecipe;
use log::debug;
use scraper::Html;

mod json_ld;
mod microdata;
pub mod parsing;

pub use json_ld::JsonLdExtractor;
pub use microdata::MicroDataExtractor;

pub struct ParsingContext {
    pub url: String,
    pub document: Html,
}

impl ParsingContext {
    pub fn new(html: &str, url: &str) -> Self {
        Self {
            url: url.to_string(),
            document: Html::parse_document(html),
        }
    }
}

pub trait Extractor {
    fn name(&self) -> &'static str;
    /// `None` unless the page yields a recipe with a name, at least one
    /// ingredient and at least one instruction.
    fn parse(&self, context: &ParsingContext) -> Option<ParsedRecipe>;
}

/// First JSON-LD `Recipe` node on the page, converted. Absent markup and
/// malformed markup both give `None`.
pub fn extract_structured(html: &str, source_url: &str) -> Option<ParsedRecipe> {
    let context = ParsingContext::new(html, source_url);
    JsonLdExtractor.parse(&context)
}

pub fn extract_structured_with_microdata(html: &str, source_url: &str) -> Option<ParsedRecipe> {
    let context = ParsingContext::new(html, source_url);
    let extractors: [&dyn Extractor; 2] = [&JsonLdExtractor, &MicroDataExtractor];
    extractors.iter().find_map(|extractor| {
        let recipe = extractor.parse(&context);
        if recipe.is_some() {
            debug!("Structured data found by {} extractor", extractor.name());
        }
        recipe
    })
}

pub(crate) use json_ld::{find_recipe, json_ld_blocks};
