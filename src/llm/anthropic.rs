//! Anthropic Messages API 客户端（reqwest 直连）
//!
//! - Endpoint: {base}/v1/messages
//! - Headers: x-api-key, anthropic-version
//! 规划阶段默认使用。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::{LlmClient, ProviderError, TextRequest};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Messages API 要求 max_tokens 必填
const DEFAULT_MAX_TOKENS: u32 = 4000;

pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(
        base_url: Option<&str>,
        api_key: &str,
        request_timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey(ANTHROPIC_API_KEY_ENV.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|e| ProviderError::InvalidResponse(format!("invalid API key header: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(request_timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.unwrap_or(ANTHROPIC_BASE_URL).to_string(),
        })
    }

    fn messages_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/messages") {
            return base.to_string();
        }
        format!("{base}/v1/messages")
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.messages_url())
            .json(&build_messages_body(request))
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body: raw,
            });
        }
        parse_messages_response(&raw)
    }
}

fn build_messages_body(request: &TextRequest) -> Value {
    json!({
        "model": request.model,
        "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "temperature": request.temperature,
        "messages": [{ "role": "user", "content": request.prompt }],
    })
}

fn parse_messages_response(raw: &str) -> Result<String, ProviderError> {
    let parsed: MessagesResponse = serde_json::from_str(raw)?;
    let text = parsed
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse("anthropic".to_string()));
    }
    Ok(text)
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<MessagesContentBlock>,
}

#[derive(Debug, Deserialize)]
struct MessagesContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_defaults_max_tokens() {
        let body = build_messages_body(&TextRequest::new("claude-3-sonnet-20240229", "hi"));
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_parse_joins_text_blocks() {
        let raw = r#"{"content":[{"type":"text","text":"Day 1"},{"type":"tool_use","id":"x"},{"type":"text","text":": Tbilisi"}]}"#;
        assert_eq!(parse_messages_response(raw).unwrap(), "Day 1: Tbilisi");
    }

    #[test]
    fn test_parse_empty_content_is_error() {
        let err = parse_messages_response(r#"{"content":[]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse(_)));
    }

    #[test]
    fn test_messages_url() {
        let client = AnthropicClient::new(Some("https://proxy.local/"), "k", 0).unwrap();
        assert_eq!(client.messages_url(), "https://proxy.local/v1/messages");
        assert!(AnthropicClient::new(None, "  ", 0).is_err());
    }
}
