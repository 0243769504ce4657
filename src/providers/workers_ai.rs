use crate::config::ProviderConfig;
use crate::providers::{responses_input, LlmProvider, ModelRequest, ProviderError};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Cloudflare Workers AI over its REST API.
pub struct WorkersAiProvider {
    client: Client,
    api_token: String,
    base_url: String,
    account_id: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl WorkersAiProvider {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let api_token = config
            .api_key
            .clone()
            .or_else(|| std::env::var("CLOUDFLARE_API_TOKEN").ok())
            .ok_or_else(|| {
                ProviderError::Config(
                    "CLOUDFLARE_API_TOKEN not found in config or environment".into(),
                )
            })?;
        let account_id = config
            .account_id
            .clone()
            .or_else(|| std::env::var("CLOUDFLARE_ACCOUNT_ID").ok())
            .ok_or_else(|| {
                ProviderError::Config("Workers AI requires an account_id".into())
            })?;

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_token,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            account_id,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(
        api_token: String,
        base_url: String,
        account_id: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let config = ProviderConfig {
            enabled: true,
            model,
            temperature: 0.2,
            max_tokens: 4096,
            api_key: Some(api_token),
            base_url: Some(base_url),
            account_id: Some(account_id),
        };
        Self::new(&config, timeout)
    }
}

#[async_trait]
impl LlmProvider for WorkersAiProvider {
    fn provider_name(&self) -> &str {
        "workers_ai"
    }

    async fn run(&self, request: &ModelRequest) -> Result<Value, ProviderError> {
        let body = match request {
            ModelRequest::Messages(messages) => json!({
                "messages": messages,
                "temperature": self.temperature,
                "max_tokens": self.max_tokens
            }),
            ModelRequest::Instructions {
                instructions,
                input,
            } => json!({
                "instructions": instructions,
                "input": responses_input(input)
            }),
        };

        let response = self
            .client
            .post(format!(
                "{}/accounts/{}/ai/run/{}",
                self.base_url, self.account_id, self.model
            ))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut envelope: Value = response.json().await?;
        debug!("{:?}", envelope);
        match envelope.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(ProviderError::Malformed(
                "Workers AI response has no result".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ChatMessage;
    use mockito::Server;

    #[tokio::test]
    async fn test_result_envelope_is_unwrapped() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts/acc/ai/run/@cf/meta/llama-3.1-8b-instruct")
            .match_header("authorization", "Bearer token")
            .with_body(r#"{"result": {"response": "{\"name\": \"Tea\"}"}, "success": true}"#)
            .create_async()
            .await;

        let provider = WorkersAiProvider::with_base_url(
            "token".to_string(),
            server.url(),
            "acc".to_string(),
            "@cf/meta/llama-3.1-8b-instruct".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        let result = provider
            .run(&ModelRequest::Messages(vec![ChatMessage::user("tea")]))
            .await
            .unwrap();
        assert_eq!(result["response"], r#"{"name": "Tea"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/accounts/acc/ai/run/m")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let provider = WorkersAiProvider::with_base_url(
            "token".to_string(),
            server.url(),
            "acc".to_string(),
            "m".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = provider
            .run(&ModelRequest::Messages(vec![ChatMessage::user("x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 500, .. }));
    }
}
