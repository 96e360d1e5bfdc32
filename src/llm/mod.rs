//! LLM 层：客户端抽象与实现（OpenAI / Anthropic / Gemini / Mock）

pub mod anthropic;
pub mod gemini;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod traits;

pub use anthropic::{AnthropicClient, ANTHROPIC_API_KEY_ENV, ANTHROPIC_BASE_URL};
pub use gemini::{GeminiClient, GEMINI_BASE_URL, GOOGLE_API_KEY_ENV};
pub use mock::{CallLog, MockCall, MockLlmClient};
pub use openai::{OpenAiClient, OPENAI_API_KEY_ENV};
pub use provider::{create_client, create_client_from_env, ProviderKind};
pub use traits::{LlmClient, ProviderError, TextRequest};
