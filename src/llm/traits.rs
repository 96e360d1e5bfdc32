//! LLM 客户端抽象
//!
//! 所有后端（OpenAI / Anthropic / Gemini / Mock）实现 LlmClient：generate_text 单次文本生成。
//! 流水线中的每个阶段只持有一个 `Arc<dyn LlmClient>`，具体厂商、鉴权与端点对阶段不可见。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 单次生成请求：模型名、Prompt 与采样参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    /// 输出上限；None 时使用后端默认值
    pub max_tokens: Option<u32>,
}

impl TextRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: 0.1,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// 后端调用失败（网络、鉴权、限流、响应格式、超时）
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Missing API key: {0}")]
    MissingApiKey(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::InvalidResponse(e.to_string())
    }
}

/// LLM 客户端 trait：给定模型与 Prompt，返回生成文本
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 后端名称（日志用）
    fn name(&self) -> &str;

    /// 非流式生成
    async fn generate_text(&self, request: &TextRequest) -> Result<String, ProviderError>;
}
