//! Headless browser rendering through a remote rendering service.
//!
//! A session is created per page, driven with a handful of HTTP calls and
//! always deleted afterwards, whatever happened while it was open.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::BrowserConfig;

pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";

pub const MOBILE_VIEWPORT: Viewport = Viewport {
    width: 390,
    height: 844,
    is_mobile: true,
};

/// Bound on every service call other than navigation.
const SERVICE_TIMEOUT: Duration = Duration::from_secs(30);

/// Login walls and consent banners worth one click each.
const OVERLAY_SELECTORS: &[&str] = &[
    "#onetrust-accept-btn-handler",
    "button[data-testid='cookie-policy-manage-dialog-accept-button']",
    "div[role='dialog'] button[aria-label='Close']",
    "button[aria-label='Close']",
    "[data-e2e='modal-close-inner-button']",
];

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("browser service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("browser service answered with HTTP {0}")]
    Status(u16),

    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub is_mobile: bool,
}

/// An open page in a headless browser.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;
    /// Clicks the first element matching `selector`; `Ok(false)` if none.
    async fn click(&self, selector: &str) -> Result<bool, BrowserError>;
    async fn content(&self) -> Result<String, BrowserError>;
    async fn close(&self) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(
        &self,
        viewport: &Viewport,
        user_agent: &str,
    ) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// Renders `url` on a mobile viewport and returns the final DOM as HTML.
///
/// The session is closed on every path out of this function.
pub async fn render_page(
    launcher: &dyn BrowserLauncher,
    url: &str,
    navigation_timeout: Duration,
) -> Result<String, BrowserError> {
    let session = launcher.launch(&MOBILE_VIEWPORT, MOBILE_USER_AGENT).await?;
    let result = drive(session.as_ref(), url, navigation_timeout).await;
    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }
    result
}

async fn drive(
    session: &dyn BrowserSession,
    url: &str,
    navigation_timeout: Duration,
) -> Result<String, BrowserError> {
    tokio::time::timeout(navigation_timeout, session.goto(url, navigation_timeout))
        .await
        .map_err(|_| BrowserError::Timeout(navigation_timeout))??;

    for selector in OVERLAY_SELECTORS {
        match session.click(selector).await {
            Ok(true) => debug!("Dismissed overlay {}", selector),
            Ok(false) => {}
            Err(e) => debug!("Overlay {} not dismissed: {}", selector, e),
        }
    }

    session.content().await
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest<'a> {
    viewport: &'a Viewport,
    user_agent: &'a str,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoRequest<'a> {
    url: &'a str,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct ClickRequest<'a> {
    selector: &'a str,
}

#[derive(Deserialize)]
struct ClickResponse {
    #[serde(default)]
    clicked: bool,
}

#[derive(Deserialize)]
struct ContentResponse {
    html: String,
}

/// Launcher backed by a page-rendering service exposing
/// `/api/sessions` endpoints.
pub struct RemoteBrowserLauncher {
    endpoint: String,
    client: Client,
}

struct RemoteSession {
    base: String,
    client: Client,
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BrowserError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(BrowserError::Status(response.status().as_u16()))
    }
}

impl RemoteBrowserLauncher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &BrowserConfig) -> Option<Self> {
        config.resolved_endpoint().map(Self::new)
    }
}

#[async_trait]
impl BrowserLauncher for RemoteBrowserLauncher {
    async fn launch(
        &self,
        viewport: &Viewport,
        user_agent: &str,
    ) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let response = self
            .client
            .post(format!("{}/api/sessions", self.endpoint))
            .timeout(SERVICE_TIMEOUT)
            .json(&CreateSessionRequest {
                viewport,
                user_agent,
            })
            .send()
            .await?;
        let created: CreateSessionResponse = check_status(response)?.json().await?;
        debug!("Opened browser session {}", created.id);

        Ok(Box::new(RemoteSession {
            base: format!("{}/api/sessions/{}", self.endpoint, created.id),
            client: self.client.clone(),
        }))
    }
}

#[async_trait]
impl BrowserSession for RemoteSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let response = self
            .client
            .post(format!("{}/goto", self.base))
            .timeout(timeout)
            .json(&GotoRequest {
                url,
                timeout_ms: timeout.as_millis() as u64,
            })
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<bool, BrowserError> {
        let response = self
            .client
            .post(format!("{}/click", self.base))
            .timeout(SERVICE_TIMEOUT)
            .json(&ClickRequest { selector })
            .send()
            .await?;
        let clicked: ClickResponse = check_status(response)?.json().await?;
        Ok(clicked.clicked)
    }

    async fn content(&self) -> Result<String, BrowserError> {
        let response = self
            .client
            .get(format!("{}/content", self.base))
            .timeout(SERVICE_TIMEOUT)
            .send()
            .await?;
        let content: ContentResponse = check_status(response)?.json().await?;
        Ok(content.html)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let response = self
            .client
            .delete(&self.base)
            .timeout(SERVICE_TIMEOUT)
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}
