//! 后端选择：按阶段配置的 provider 创建 LlmClient
//!
//! API Key 只从环境变量读取；配置为 mock 时不需要 Key。

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::llm::{
    AnthropicClient, GeminiClient, LlmClient, MockLlmClient, OpenAiClient, ProviderError,
    ANTHROPIC_API_KEY_ENV, GOOGLE_API_KEY_ENV, OPENAI_API_KEY_ENV,
};

/// 文本生成后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    #[serde(alias = "claude")]
    Anthropic,
    #[serde(alias = "gemini")]
    Google,
    Mock,
}

impl ProviderKind {
    /// 所需 API Key 的环境变量名；Mock 无需 Key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some(OPENAI_API_KEY_ENV),
            ProviderKind::Anthropic => Some(ANTHROPIC_API_KEY_ENV),
            ProviderKind::Google => Some(GOOGLE_API_KEY_ENV),
            ProviderKind::Mock => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Mock => "mock",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 根据后端类型创建客户端；api_key 缺失或为空时返回 MissingApiKey
pub fn create_client(
    kind: ProviderKind,
    base_url: Option<&str>,
    api_key: Option<&str>,
    request_timeout_secs: u64,
) -> Result<Arc<dyn LlmClient>, ProviderError> {
    let key = || -> Result<&str, ProviderError> {
        api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey(kind.api_key_env().unwrap_or_default().to_string()))
    };

    let client: Arc<dyn LlmClient> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiClient::new(base_url, key()?)),
        ProviderKind::Anthropic => Arc::new(AnthropicClient::new(base_url, key()?, request_timeout_secs)?),
        ProviderKind::Google => Arc::new(GeminiClient::new(base_url, key()?, request_timeout_secs)?),
        ProviderKind::Mock => Arc::new(MockLlmClient::default()),
    };
    tracing::info!("Using {} LLM backend", kind);
    Ok(client)
}

/// 从环境变量读取 Key 后创建客户端
pub fn create_client_from_env(
    kind: ProviderKind,
    base_url: Option<&str>,
    request_timeout_secs: u64,
) -> Result<Arc<dyn LlmClient>, ProviderError> {
    let api_key = kind.api_key_env().and_then(|var| std::env::var(var).ok());
    create_client(kind, base_url, api_key.as_deref(), request_timeout_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names_and_aliases() {
        let parse = |s: &str| serde_json::from_value::<ProviderKind>(serde_json::json!(s));
        assert_eq!(parse("openai").unwrap(), ProviderKind::OpenAi);
        assert_eq!(parse("claude").unwrap(), ProviderKind::Anthropic);
        assert_eq!(parse("gemini").unwrap(), ProviderKind::Google);
        assert!(parse("bard").is_err());
        // 序列化始终使用规范名
        assert_eq!(serde_json::to_value(ProviderKind::Google).unwrap(), "google");
    }

    #[test]
    fn test_mock_needs_no_key() {
        let client = create_client(ProviderKind::Mock, None, None, 0).unwrap();
        assert_eq!(client.name(), "mock");
    }

    #[test]
    fn test_missing_key_names_env_var() {
        let err = create_client(ProviderKind::Anthropic, None, Some(" "), 0).err().unwrap();
        match err {
            ProviderError::MissingApiKey(var) => assert_eq!(var, "ANTHROPIC_API_KEY"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
