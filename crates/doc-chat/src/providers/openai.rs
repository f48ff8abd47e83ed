//! OpenAI-compatible chat completions provider

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// Chat completions client (`POST {base_url}/chat/completions`)
pub struct OpenAiLlm {
    /// HTTP client
    client: Client,
    /// API base URL
    base_url: String,
    /// Bearer token
    api_key: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiLlm {
    /// Create a new client; an API key is required
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

/// Map a failed completion response to a classified error
pub(crate) fn classify_error(status: StatusCode, body: &str) -> Error {
    if body.contains("insufficient_quota") {
        Error::QuotaExceeded(format!("HTTP {}: {}", status, body))
    } else if status == StatusCode::TOO_MANY_REQUESTS || body.contains("rate_limit") {
        Error::RateLimited(format!("HTTP {}: {}", status, body))
    } else {
        Error::generation(format!("HTTP {}: {}", status, body))
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlm {
    async fn chat(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::generation(format!("Chat request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &text));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("Failed to parse response: {}", e)))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::generation("Response contained no choices"))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);

        match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = LlmConfig {
            api_key: None,
            ..LlmConfig::default()
        };
        assert!(matches!(OpenAiLlm::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_error_classification() {
        let quota = r#"{"error":{"code":"insufficient_quota","message":"You exceeded your current quota"}}"#;
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, quota),
            Error::QuotaExceeded(_)
        ));

        let rate = r#"{"error":{"code":"rate_limit_exceeded"}}"#;
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, rate),
            Error::RateLimited(_)
        ));
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, ""),
            Error::RateLimited(_)
        ));

        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, "bad model"),
            Error::Generation(_)
        ));
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = ChatCompletionRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 1000,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 1000);
    }
}
