//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 回显 Prompt 的首个非空行；可共享调用日志，并可按开关或 Prompt 关键字模拟失败。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::llm::{LlmClient, ProviderError, TextRequest};

/// 一次调用记录：哪个客户端、什么请求
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub client: String,
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// 多个 Mock 客户端可共享同一份日志，以观察跨阶段的调用顺序
pub type CallLog = Arc<Mutex<Vec<MockCall>>>;

/// Mock 客户端：回显 Prompt 首行，可注入失败
#[derive(Debug, Clone)]
pub struct MockLlmClient {
    name: String,
    log: CallLog,
    fail_all: bool,
    fail_markers: Vec<String>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new("mock")
    }
}

impl MockLlmClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log: CallLog::default(),
            fail_all: false,
            fail_markers: Vec::new(),
        }
    }

    /// 与其它客户端共享调用日志
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// 所有调用均返回 ProviderError
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Prompt 中包含 marker 时返回 ProviderError
    pub fn fail_when(mut self, marker: impl Into<String>) -> Self {
        self.fail_markers.push(marker.into());
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<String, ProviderError> {
        if let Ok(mut log) = self.log.lock() {
            log.push(MockCall {
                client: self.name.clone(),
                model: request.model.clone(),
                prompt: request.prompt.clone(),
                temperature: request.temperature,
                max_tokens: request.max_tokens,
            });
        }

        if self.fail_all || self.fail_markers.iter().any(|m| request.prompt.contains(m.as_str())) {
            return Err(ProviderError::Api(format!("{} is unavailable", self.name)));
        }

        let headline = request
            .prompt
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("(empty prompt)");

        Ok(format!("[{}:{}] {}", self.name, request.model, headline))
    }
}
