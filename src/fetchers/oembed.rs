use super::{FetchError, SocialPlatform};
use crate::config::SocialConfig;
use crate::extractors::parsing::{collapse_whitespace, decode_html_symbols};
use log::debug;
use reqwest::Client;
use scraper::Html;
use serde::Deserialize;
use std::time::Duration;

/// Subset of the oEmbed response both platforms return.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OEmbedResponse {
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Embed markup; Instagram puts the caption here when `title` is empty
    pub html: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SocialCaption {
    pub caption: String,
    pub thumbnail_url: Option<String>,
    pub author_name: Option<String>,
}

pub struct OEmbedClient {
    client: Client,
    tiktok_url: String,
    instagram_url: String,
    instagram_access_token: Option<String>,
}

fn markup_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&text.join(" "))
}

impl OEmbedResponse {
    fn into_caption(self) -> SocialCaption {
        let caption = self
            .title
            .map(|title| collapse_whitespace(&decode_html_symbols(&title)))
            .filter(|title| !title.is_empty())
            .or_else(|| self.html.as_deref().map(markup_text))
            .unwrap_or_default();
        SocialCaption {
            caption,
            thumbnail_url: self.thumbnail_url.filter(|url| !url.is_empty()),
            author_name: self.author_name,
        }
    }
}

impl OEmbedClient {
    pub fn new(config: &SocialConfig, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            tiktok_url: config.tiktok_oembed_url.clone(),
            instagram_url: config.instagram_oembed_url.clone(),
            instagram_access_token: config.instagram_access_token.clone(),
        })
    }

    /// Caption and thumbnail for a post, without rendering the page.
    pub async fn fetch(
        &self,
        platform: SocialPlatform,
        url: &str,
    ) -> Result<SocialCaption, FetchError> {
        let mut request = match platform {
            SocialPlatform::TikTok => self.client.get(&self.tiktok_url).query(&[("url", url)]),
            SocialPlatform::Instagram => {
                self.client.get(&self.instagram_url).query(&[("url", url)])
            }
        };
        if let (SocialPlatform::Instagram, Some(token)) =
            (platform, self.instagram_access_token.as_deref())
        {
            request = request.query(&[("access_token", token)]);
        }

        debug!("Requesting {} oEmbed for {}", platform.name(), url);
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body: OEmbedResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        Ok(body.into_caption())
    }
}
