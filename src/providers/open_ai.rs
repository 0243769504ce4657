use crate::config::ProviderConfig;
use crate::providers::{responses_input, LlmProvider, ModelRequest, ProviderError};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ProviderError::Config("OPENAI_API_KEY not found in config or environment".into())
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(OpenAIProvider {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let config = ProviderConfig {
            enabled: true,
            model,
            temperature: 0.2,
            max_tokens: 4096,
            api_key: Some(api_key),
            base_url: Some(base_url),
            account_id: None,
        };
        Self::new(&config, timeout)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
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

        let response_body: Value = response.json().await?;
        debug!("{:?}", response_body);
        Ok(response_body)
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn run(&self, request: &ModelRequest) -> Result<Value, ProviderError> {
        match request {
            ModelRequest::Messages(messages) => {
                let body = self
                    .post(
                        "/v1/chat/completions",
                        json!({
                            "model": self.model,
                            "messages": messages,
                            "temperature": self.temperature,
                            "max_tokens": self.max_tokens
                        }),
                    )
                    .await?;
                let content = body["choices"][0]["message"]["content"]
                    .as_str()
                    .ok_or_else(|| {
                        ProviderError::Malformed("Failed to extract content from response".into())
                    })?;
                Ok(Value::String(content.to_string()))
            }
            ModelRequest::Instructions {
                instructions,
                input,
            } => {
                self.post(
                    "/v1/responses",
                    json!({
                        "model": self.model,
                        "instructions": instructions,
                        "input": responses_input(input),
                        "temperature": self.temperature,
                        "max_output_tokens": self.max_tokens
                    }),
                )
                .await
            }
        }
    }
}
