//! Parse orchestration: one request in, one recipe or one error out.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info};
use url::Url;

use crate::ai::{AiExtractor, PagePrompt};
use crate::assembler::{assemble_recipe, canonicalize, compute_confidence, merge_structured};
use crate::builder::RecipeParserBuilder;
use crate::cache::{self, KvStore};
use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::extractors::{extract_structured, extract_structured_with_microdata};
use crate::fetchers::{
    fetch_social_content, BrowserLauncher, OEmbedClient, RequestFetcher, SocialPlatform,
};
use crate::html::{clean, extract_image_urls, extract_step_image_context};
use crate::images::{reupload_recipe_images, ImageUploader};
use crate::model::{
    Confidence, InputKind, ParseInput, ParseMetadata, ParseMethod, ParseOutput, ParseResponse,
    ParsedRecipe, SourceType,
};
use crate::providers::LlmProvider;
use crate::validation::validate_recipe;

pub const MIN_TEXT_CHARS: usize = 50;
pub const MAX_TEXT_CHARS: usize = 10_000;
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Entry point for every parse. Cheap to share behind an `Arc`; holds no
/// per-request state.
pub struct RecipeParser {
    pub(crate) config: ParserConfig,
    pub(crate) provider: Arc<dyn LlmProvider>,
    pub(crate) cache: Arc<dyn KvStore>,
    pub(crate) browser: Option<Arc<dyn BrowserLauncher>>,
    pub(crate) uploader: Option<Arc<dyn ImageUploader>>,
    pub(crate) fetcher: RequestFetcher,
    pub(crate) oembed: OEmbedClient,
}

impl RecipeParser {
    pub fn builder() -> RecipeParserBuilder {
        RecipeParserBuilder::default()
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses `input` and wraps the outcome in the service envelope.
    pub async fn parse(&self, input: ParseInput) -> ParseResponse {
        let result = self.parse_result(input).await;
        if let Err(e) = &result {
            info!("Parse failed with {}: {}", e.code(), e);
        }
        ParseResponse::from(result)
    }

    pub async fn parse_result(&self, input: ParseInput) -> Result<ParseOutput, ParseError> {
        match input {
            ParseInput::Url {
                data,
                structured_only,
            } => self.parse_url(&data, structured_only).await,
            ParseInput::Text { data } => self.parse_text(&data).await,
            ParseInput::Image { data, mime_type } => self.parse_image(&data, &mime_type).await,
        }
    }

    pub(crate) fn extractor(&self) -> AiExtractor<'_> {
        AiExtractor::new(self.provider.as_ref(), self.config.ai.api_style)
    }

    async fn parse_url(&self, url: &str, structured_only: bool) -> Result<ParseOutput, ParseError> {
        let url = validate_url(url)?;

        if let Some(recipe) = cache::lookup(self.cache.as_ref(), &url).await {
            return Ok(ParseOutput {
                recipe,
                metadata: ParseMetadata {
                    source: InputKind::Url,
                    parse_method: None,
                    confidence: Confidence::High,
                    cached: Some(true),
                },
            });
        }

        let (recipe, parse_method, confidence) = match SocialPlatform::classify(&url) {
            Some(platform) if structured_only => {
                return Err(ParseError::UnsupportedUrl(format!(
                    "Basic import does not support {} links. Use the full import instead",
                    platform.name()
                )));
            }
            Some(platform) => {
                let recipe = self.parse_social(platform, &url).await?;
                (recipe, ParseMethod::AiOnly, Confidence::Medium)
            }
            None => self.parse_page(&url, structured_only).await?,
        };

        validate_recipe(&recipe).map_err(ParseError::ValidationFailed)?;
        cache::write_through(self.cache.as_ref(), &url, &recipe).await;

        Ok(ParseOutput {
            recipe,
            metadata: ParseMetadata {
                source: InputKind::Url,
                parse_method: Some(parse_method),
                confidence,
                cached: Some(false),
            },
        })
    }

    async fn parse_social(
        &self,
        platform: SocialPlatform,
        url: &str,
    ) -> Result<ParsedRecipe, ParseError> {
        info!("Routing {} to the {} handler", url, platform.name());
        let content = fetch_social_content(
            platform,
            url,
            &self.oembed,
            self.browser.as_deref(),
            &self.config.social,
            &self.config.browser,
        )
        .await?;
        debug!("{} content came from {:?}", platform.name(), content.origin);

        let value = self.extractor().extract_from_social(&content).await?;
        let mut recipe = assemble_recipe(&value, SourceType::Url, Some(url));
        if recipe.images.is_empty() {
            recipe.images = content.images;
        }

        match &self.uploader {
            Some(uploader) => Ok(reupload_recipe_images(uploader.as_ref(), platform, recipe).await),
            None => Ok(recipe),
        }
    }

    async fn parse_page(
        &self,
        url: &str,
        structured_only: bool,
    ) -> Result<(ParsedRecipe, ParseMethod, Confidence), ParseError> {
        let html = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| ParseError::FetchFailed(e.to_string()))?;

        let structured = if self.config.fetch.microdata_fallback {
            extract_structured_with_microdata(&html, url)
        } else {
            extract_structured(&html, url)
        }
        .map(canonicalize);
        info!(
            "Structured data {} on {}",
            if structured.is_some() { "found" } else { "absent" },
            url
        );

        if structured_only {
            return structured
                .map(|recipe| (recipe, ParseMethod::StructuredData, Confidence::High))
                .ok_or(ParseError::NoStructuredData);
        }

        let content = clean(&html);
        let images = extract_image_urls(&html, url);
        let step_context = extract_step_image_context(&html, url);
        let page = PagePrompt {
            url,
            content: &content,
            images: &images,
            step_context: &step_context,
            structured: structured.as_ref(),
        };

        let value = self.extractor().extract_from_page(&page).await?;
        let recipe = assemble_recipe(&value, SourceType::Url, Some(url));
        validate_recipe(&recipe).map_err(ParseError::ValidationFailed)?;

        Ok(match structured {
            Some(structured) => (
                merge_structured(recipe, &structured),
                ParseMethod::AiEnhanced,
                Confidence::High,
            ),
            None => (recipe, ParseMethod::AiOnly, Confidence::Medium),
        })
    }

    async fn parse_text(&self, text: &str) -> Result<ParseOutput, ParseError> {
        let text = text.trim();
        let length = text.chars().count();
        if length < MIN_TEXT_CHARS {
            return Err(ParseError::InvalidInput(format!(
                "Text is too short ({} characters). Provide at least {} characters of recipe text",
                length, MIN_TEXT_CHARS
            )));
        }
        if length > MAX_TEXT_CHARS {
            return Err(ParseError::InputTooLong(length));
        }

        let value = self.extractor().extract_from_text(text).await?;
        let recipe = assemble_recipe(&value, SourceType::Text, None);
        validate_recipe(&recipe).map_err(ParseError::ValidationFailed)?;

        let confidence = compute_confidence(&recipe, InputKind::Text);
        Ok(ParseOutput {
            recipe,
            metadata: ParseMetadata {
                source: InputKind::Text,
                parse_method: Some(ParseMethod::AiOnly),
                confidence,
                cached: None,
            },
        })
    }

    async fn parse_image(&self, data: &str, mime_type: &str) -> Result<ParseOutput, ParseError> {
        let payload = decode_image(data, mime_type)?;

        let value = self.extractor().extract_from_image(&payload, mime_type).await?;
        let recipe = assemble_recipe(&value, SourceType::Image, None);
        validate_recipe(&recipe).map_err(ParseError::ValidationFailed)?;

        let confidence = compute_confidence(&recipe, InputKind::Image);
        Ok(ParseOutput {
            recipe,
            metadata: ParseMetadata {
                source: InputKind::Image,
                parse_method: Some(ParseMethod::AiOnly),
                confidence,
                cached: None,
            },
        })
    }
}

/// Absolute http(s) URL, trimmed.
fn validate_url(raw: &str) -> Result<String, ParseError> {
    let raw = raw.trim();
    let parsed =
        Url::parse(raw).map_err(|e| ParseError::InvalidInput(format!("Invalid URL: {}", e)))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(raw.to_string()),
        scheme => Err(ParseError::InvalidInput(format!(
            "Unsupported URL scheme '{}'. Use http or https",
            scheme
        ))),
    }
}

/// Checks the mime type, strips any `data:` prefix and checks the decoded
/// size. Returns the bare base64 payload.
fn decode_image(data: &str, mime_type: &str) -> Result<String, ParseError> {
    if !SUPPORTED_IMAGE_TYPES.contains(&mime_type) {
        return Err(ParseError::InvalidMimeType(mime_type.to_string()));
    }

    let payload = match data.trim().strip_prefix("data:") {
        Some(uri) => uri
            .split_once(',')
            .map(|(_, payload)| payload)
            .ok_or_else(|| ParseError::InvalidBase64("data URI without payload".to_string()))?,
        None => data.trim(),
    };
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if payload.is_empty() {
        return Err(ParseError::InvalidInput("Image data is empty".to_string()));
    }

    let bytes = STANDARD
        .decode(&payload)
        .map_err(|e| ParseError::InvalidBase64(e.to_string()))?;
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ParseError::ImageTooLarge(bytes.len()));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert_eq!(
            validate_url("  https://example.com/soup ").unwrap(),
            "https://example.com/soup"
        );
        assert_eq!(validate_url("not a url").unwrap_err().code(), "INVALID_INPUT");
        assert_eq!(
            validate_url("ftp://example.com/soup").unwrap_err().code(),
            "INVALID_INPUT"
        );
    }

    #[test]
    fn test_decode_image_checks_in_order() {
        assert_eq!(
            decode_image("!!!", "image/gif").unwrap_err().code(),
            "INVALID_MIME_TYPE"
        );
        assert_eq!(
            decode_image("not*base64", "image/png").unwrap_err().code(),
            "INVALID_BASE64"
        );
        assert_eq!(decode_image("  ", "image/png").unwrap_err().code(), "INVALID_INPUT");
    }

    #[test]
    fn test_decode_image_strips_data_uri() {
        assert_eq!(
            decode_image("data:image/png;base64,aGVs\nbG8=", "image/png").unwrap(),
            "aGVsbG8="
        );
        assert_eq!(decode_image("aGVsbG8=", "image/webp").unwrap(), "aGVsbG8=");
    }

    #[test]
    fn test_decode_image_size_cap() {
        let too_big = STANDARD.encode(vec![0u8; MAX_IMAGE_BYTES + 1]);
        assert_eq!(
            decode_image(&too_big, "image/jpeg").unwrap_err().code(),
            "IMAGE_TOO_LARGE"
        );

        let at_cap = STANDARD.encode(vec![0u8; MAX_IMAGE_BYTES]);
        assert!(decode_image(&at_cap, "image/jpeg").is_ok());
    }
}
