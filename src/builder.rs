use std::sync::Arc;

use log::debug;

use crate::cache::{KvStore, MemoryKvStore};
use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::fetchers::{BrowserLauncher, OEmbedClient, RemoteBrowserLauncher, RequestFetcher};
use crate::images::ImageUploader;
use crate::pipeline::RecipeParser;
use crate::providers::{LlmProvider, ProviderFactory};

/// Wires the collaborators a [`RecipeParser`] needs.
///
/// Anything not set falls back to configuration: the default provider from
/// `[ai]`, an in-memory cache, and the remote browser from `[browser]` (or
/// `PAGE_SCRIBER_URL`). Images are only re-uploaded when an uploader is set.
#[derive(Default)]
pub struct RecipeParserBuilder {
    config: Option<ParserConfig>,
    provider: Option<Arc<dyn LlmProvider>>,
    cache: Option<Arc<dyn KvStore>>,
    browser: Option<Arc<dyn BrowserLauncher>>,
    without_browser: bool,
    uploader: Option<Arc<dyn ImageUploader>>,
}

impl RecipeParserBuilder {
    /// Use this configuration instead of loading `config.toml` and the
    /// environment.
    ///
    /// # Example
    /// ```
    /// use recipe_parser::{ParserConfig, RecipeParser};
    ///
    /// let mut config = ParserConfig::default();
    /// config.fetch.max_attempts = 1;
    /// let builder = RecipeParser::builder().config(config);
    /// ```
    pub fn config(mut self, config: ParserConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the generative model provider
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the key-value store backing the recipe cache
    pub fn cache(mut self, cache: Arc<dyn KvStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the headless browser used for social media pages
    pub fn browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = Some(browser);
        self.without_browser = false;
        self
    }

    /// Never render pages, even when a browser endpoint is configured.
    /// Social imports then rely on oEmbed alone.
    pub fn without_browser(mut self) -> Self {
        self.browser = None;
        self.without_browser = true;
        self
    }

    /// Set the service that copies social media images to permanent storage
    pub fn uploader(mut self, uploader: Arc<dyn ImageUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn build(self) -> Result<RecipeParser, ParseError> {
        let config = match self.config {
            Some(config) => config,
            None => ParserConfig::load()?,
        };

        let provider = match self.provider {
            Some(provider) => provider,
            None => Arc::from(
                ProviderFactory::get_default_provider(&config.ai)
                    .map_err(|e| ParseError::Config(e.to_string()))?,
            ),
        };
        debug!("Using {} provider", provider.provider_name());

        let browser = match (self.browser, self.without_browser) {
            (_, true) => None,
            (Some(browser), false) => Some(browser),
            (None, false) => RemoteBrowserLauncher::from_config(&config.browser)
                .map(|launcher| Arc::new(launcher) as Arc<dyn BrowserLauncher>),
        };
        if browser.is_none() {
            debug!("No browser configured, social imports use oEmbed only");
        }

        let fetcher =
            RequestFetcher::new(&config.fetch).map_err(|e| ParseError::Config(e.to_string()))?;
        let oembed = OEmbedClient::new(&config.social, config.fetch.timeout())
            .map_err(|e| ParseError::Config(e.to_string()))?;

        Ok(RecipeParser {
            provider,
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(MemoryKvStore::new())),
            browser,
            uploader: self.uploader,
            fetcher,
            oembed,
            config,
        })
    }
}
