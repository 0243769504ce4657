//! Retrieving raw content for a source.

use thiserror::Error;

pub mod browser;
pub mod oembed;
pub mod request;
pub mod social;

pub use browser::{
    render_page, BrowserError, BrowserLauncher, BrowserSession, RemoteBrowserLauncher, Viewport,
};
pub use oembed::{OEmbedClient, OEmbedResponse, SocialCaption};
pub use request::RequestFetcher;
pub use social::{fetch_social_content, ContentOrigin, SocialContent, SocialPlatform};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with HTTP {status}")]
    Status { status: u16, url: String },

    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("unexpected response: {0}")]
    Malformed(String),
}
