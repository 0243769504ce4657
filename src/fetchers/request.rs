use super::FetchError;
use crate::config::FetchConfig;
use log::{debug, warn};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};

/// Rotated per attempt, so a retry looks like a different browser.
const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

pub struct RequestFetcher {
    client: Client,
    config: FetchConfig,
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::FORBIDDEN
        || status.is_server_error()
}

impl RequestFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// GETs `url` as HTML. Network errors, 429, 403 and 5xx are retried with
    /// exponential backoff; any other non-success status fails immediately.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            let user_agent = USER_AGENTS[attempt as usize % USER_AGENTS.len()];
            debug!("Fetching {} (attempt {}/{})", url, attempt + 1, attempts);

            let outcome = self
                .client
                .get(url)
                .header(USER_AGENT, user_agent)
                .header(ACCEPT, ACCEPT_HTML)
                .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                .send()
                .await;

            match outcome {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(body) => return Ok(body),
                    Err(e) => last_error = e.to_string(),
                },
                Ok(response) => {
                    let status = response.status();
                    if !is_retryable(status) {
                        return Err(FetchError::Status {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                    last_error = format!("HTTP {}", status.as_u16());
                }
                Err(e) => last_error = e.to_string(),
            }

            if attempt + 1 < attempts {
                let delay = self.config.backoff(attempt);
                warn!(
                    "Fetch of {} failed ({}), retrying in {:?}",
                    url, last_error, delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(FetchError::Exhausted {
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(max_attempts: u32) -> RequestFetcher {
        RequestFetcher::new(&FetchConfig {
            max_attempts,
            base_delay_ms: 1,
            timeout_secs: 5,
            microdata_fallback: false,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success_sends_browser_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/recipe")
            .match_header("user-agent", mockito::Matcher::Regex("Mozilla/5.0".into()))
            .match_header("accept", mockito::Matcher::Regex("text/html".into()))
            .with_status(200)
            .with_body("<html>ok</html>")
            .create_async()
            .await;

        let body = fetcher(3)
            .fetch(&format!("{}/recipe", server.url()))
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let err = fetcher(3)
            .fetch(&format!("{}/flaky", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Exhausted { attempts: 3, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let err = fetcher(3)
            .fetch(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        mock.assert_async().await;
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::REQUEST_TIMEOUT));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::FORBIDDEN));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }
}
