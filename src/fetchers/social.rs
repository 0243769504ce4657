//! Caption retrieval for the supported social platforms: oEmbed first,
//! browser rendering when the oEmbed caption is too thin to cook from.

use super::browser::{render_page, BrowserLauncher};
use super::oembed::{OEmbedClient, SocialCaption};
use crate::config::{BrowserConfig, SocialConfig};
use crate::error::ParseError;
use crate::extractors::parsing::{collapse_whitespace, decode_html_symbols, resolve_url};
use crate::html;
use log::{debug, info, warn};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

static CAPTION_META: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "meta[property='og:description']",
        "meta[name='description']",
        "meta[name='twitter:description']",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid caption meta selector"))
    .collect()
});

static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property='og:image']").expect("valid og:image selector")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialPlatform {
    TikTok,
    Instagram,
}

impl SocialPlatform {
    /// Recognizes TikTok and Instagram URLs, including short-link hosts.
    pub fn classify(url: &str) -> Option<Self> {
        let host = Url::parse(url).ok()?.host_str()?.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        let matches = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

        if matches("tiktok.com") {
            Some(SocialPlatform::TikTok)
        } else if matches("instagram.com") || matches("instagr.am") {
            Some(SocialPlatform::Instagram)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SocialPlatform::TikTok => "tiktok",
            SocialPlatform::Instagram => "instagram",
        }
    }

    fn parse_failed(&self, message: String) -> ParseError {
        match self {
            SocialPlatform::TikTok => ParseError::TikTokParseFailed(message),
            SocialPlatform::Instagram => ParseError::InstagramParseFailed(message),
        }
    }
}

/// Which strategy produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOrigin {
    OEmbed,
    CaptionMeta,
    PageText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SocialContent {
    pub platform: SocialPlatform,
    pub text: String,
    pub author: Option<String>,
    pub images: Vec<String>,
    pub origin: ContentOrigin,
}

impl SocialContent {
    /// Text handed to the model: the caption plus who posted it.
    pub fn prompt_text(&self) -> String {
        match &self.author {
            Some(author) => format!("Posted by {} on {}:\n{}", author, self.platform.name(), self.text),
            None => self.text.clone(),
        }
    }
}

fn long_enough(text: &str, min_chars: usize) -> bool {
    text.chars().count() >= min_chars
}

fn caption_from_meta(document: &Html, min_chars: usize) -> Option<String> {
    CAPTION_META.iter().find_map(|selector| {
        document
            .select(selector)
            .filter_map(|meta| meta.value().attr("content"))
            .map(|content| collapse_whitespace(&decode_html_symbols(content)))
            .find(|caption| long_enough(caption, min_chars))
    })
}

fn page_images(document: &Html, base: Option<&Url>) -> Vec<String> {
    document
        .select(&OG_IMAGE)
        .filter_map(|meta| meta.value().attr("content"))
        .filter_map(|content| resolve_url(base, content))
        .collect()
}

/// Gets enough post text to extract a recipe from.
///
/// oEmbed is accepted when its caption reaches `min_caption_length`
/// characters. Otherwise the page is rendered and the caption meta tags are
/// tried before the cleaned page text. Too little text from every strategy
/// is `NO_CONTENT`; a rendering failure is the platform's parse failure.
pub async fn fetch_social_content(
    platform: SocialPlatform,
    url: &str,
    oembed: &OEmbedClient,
    browser: Option<&dyn BrowserLauncher>,
    social: &SocialConfig,
    browser_config: &BrowserConfig,
) -> Result<SocialContent, ParseError> {
    let min_chars = social.min_caption_length;

    let embedded: Option<SocialCaption> = match oembed.fetch(platform, url).await {
        Ok(caption) => Some(caption),
        Err(e) => {
            warn!("{} oEmbed failed for {}: {}", platform.name(), url, e);
            None
        }
    };

    if let Some(caption) = &embedded {
        if long_enough(&caption.caption, min_chars) {
            info!("Using {} oEmbed caption for {}", platform.name(), url);
            return Ok(SocialContent {
                platform,
                text: caption.caption.clone(),
                author: caption.author_name.clone(),
                images: caption.thumbnail_url.clone().into_iter().collect(),
                origin: ContentOrigin::OEmbed,
            });
        }
        debug!(
            "{} oEmbed caption too short ({} chars), rendering page",
            platform.name(),
            caption.caption.chars().count()
        );
    }

    let Some(launcher) = browser else {
        return Err(match embedded {
            Some(_) => ParseError::NoContent(format!(
                "The {} post does not contain enough text to extract a recipe",
                platform.name()
            )),
            None => platform.parse_failed("oEmbed lookup failed and no browser is configured".to_string()),
        });
    };

    let rendered = render_page(launcher, url, browser_config.navigation_timeout())
        .await
        .map_err(|e| platform.parse_failed(e.to_string()))?;

    // The DOM is not Send; everything below finishes before the next await.
    let document = Html::parse_document(&rendered);
    let base = Url::parse(url).ok();
    let mut images: Vec<String> = embedded
        .as_ref()
        .and_then(|caption| caption.thumbnail_url.clone())
        .into_iter()
        .collect();
    for image in page_images(&document, base.as_ref()) {
        if !images.contains(&image) {
            images.push(image);
        }
    }
    let author = embedded.and_then(|caption| caption.author_name);

    if let Some(text) = caption_from_meta(&document, min_chars) {
        return Ok(SocialContent {
            platform,
            text,
            author,
            images,
            origin: ContentOrigin::CaptionMeta,
        });
    }

    let text = html::clean(&rendered);
    if long_enough(&text, min_chars) {
        return Ok(SocialContent {
            platform,
            text,
            author,
            images,
            origin: ContentOrigin::PageText,
        });
    }

    Err(ParseError::NoContent(format!(
        "Could not find enough text in the {} post to extract a recipe",
        platform.name()
    )))
}
