//! Google Gemini generateContent 客户端（reqwest 直连）
//!
//! - Endpoint: {base}/v1beta/models/{model}:generateContent
//! - 鉴权：x-goog-api-key 头
//! 个性化阶段默认使用。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::{LlmClient, ProviderError, TextRequest};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        base_url: Option<&str>,
        api_key: &str,
        request_timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey(GOOGLE_API_KEY_ENV.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|e| ProviderError::InvalidResponse(format!("invalid API key header: {e}")))?,
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(request_timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.unwrap_or(GEMINI_BASE_URL).to_string(),
        })
    }

    fn generate_content_url(&self, model: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.contains(":generateContent") {
            return base.replace("{model}", model);
        }
        format!("{base}/v1beta/models/{model}:generateContent")
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.generate_content_url(&request.model))
            .json(&build_generate_content_body(request))
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
        parse_generate_content_response(&raw)
    }
}

fn build_generate_content_body(request: &TextRequest) -> Value {
    let mut generation_config = json!({ "temperature": request.temperature });
    if let Some(max_tokens) = request.max_tokens {
        generation_config["maxOutputTokens"] = json!(max_tokens);
    }

    json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
        "generationConfig": generation_config,
    })
}

fn parse_generate_content_response(raw: &str) -> Result<String, ProviderError> {
    let parsed: GenerateContentResponse = serde_json::from_str(raw)?;
    let candidate = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| ProviderError::InvalidResponse("response contained no candidates".to_string()))?;

    let text = candidate
        .content
        .and_then(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse("gemini".to_string()));
    }
    Ok(text)
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<GenerateContentCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentCandidate {
    content: Option<GenerateContentContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentContent {
    parts: Option<Vec<GenerateContentPart>>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentPart {
    text: Option<String>,
}
