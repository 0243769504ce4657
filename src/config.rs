use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Top-level parser configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ParserConfig {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub social: SocialConfig,
}

/// Generative model configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    /// Default provider to use when not specified
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Map of provider name to provider configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Wire format for prompts
    #[serde(default)]
    pub api_style: ApiStyle,
}

/// How prompts are shaped on the wire: a chat-messages array or an
/// instructions + input pair.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiStyle {
    #[default]
    Chat,
    Responses,
}

/// Configuration for a specific model provider
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Model identifier (e.g., "gpt-4o-mini", "@cf/meta/llama-3.2-11b-vision-instruct")
    pub model: String,
    /// Temperature for generation (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// API key for authentication (can also be set via environment variable)
    pub api_key: Option<String>,
    /// Base URL for API endpoint (for custom or proxy endpoints)
    pub base_url: Option<String>,
    /// Cloudflare account id (Workers AI specific)
    pub account_id: Option<String>,
}

/// Plain HTTP page retrieval
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay; doubles on every further attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// Also accept schema.org microdata when no JSON-LD recipe is present
    #[serde(default)]
    pub microdata_fallback: bool,
}

/// Remote headless browser used for script-heavy pages
#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    /// Rendering service base URL; falls back to `PAGE_SCRIBER_URL`
    pub endpoint: Option<String>,
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
}

/// oEmbed endpoints for the supported social platforms
#[derive(Debug, Deserialize, Clone)]
pub struct SocialConfig {
    #[serde(default = "default_tiktok_oembed_url")]
    pub tiktok_oembed_url: String,
    #[serde(default = "default_instagram_oembed_url")]
    pub instagram_oembed_url: String,
    pub instagram_access_token: Option<String>,
    /// Shorter oEmbed captions trigger browser rendering
    #[serde(default = "default_min_caption_length")]
    pub min_caption_length: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            providers: HashMap::new(),
            timeout: default_timeout(),
            api_style: ApiStyle::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            timeout_secs: default_fetch_timeout(),
            microdata_fallback: false,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            navigation_timeout_secs: default_navigation_timeout(),
        }
    }
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            tiktok_oembed_url: default_tiktok_oembed_url(),
            instagram_oembed_url: default_instagram_oembed_url(),
            instagram_access_token: None,
            min_caption_length: default_min_caption_length(),
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before retry number `attempt` (0-based): base × 2^attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << attempt.min(16)))
    }
}

impl BrowserConfig {
    pub fn resolved_endpoint(&self) -> Option<String> {
        self.endpoint
            .clone()
            .or_else(|| std::env::var("PAGE_SCRIBER_URL").ok())
            .map(|endpoint| endpoint.trim_end_matches('/').to_string())
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

// Default value functions
fn default_provider() -> String {
    "openai".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_fetch_timeout() -> u64 {
    20
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_tiktok_oembed_url() -> String {
    "https://www.tiktok.com/oembed".to_string()
}

fn default_instagram_oembed_url() -> String {
    "https://graph.facebook.com/v18.0/instagram_oembed".to_string()
}

fn default_min_caption_length() -> usize {
    50
}

impl ParserConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_PARSER__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_PARSER__AI__PROVIDERS__OPENAI__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

pub fn load_config() -> Result<ParserConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: RECIPE_PARSER__FETCH__MAX_ATTEMPTS
        .add_source(
            Environment::with_prefix("RECIPE_PARSER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
