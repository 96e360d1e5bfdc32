//! 编排器构建器：从配置统一组装三个阶段
//!
//! 未显式注入的阶段按配置的 provider 创建客户端，API Key 取自环境变量。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::Span;

use crate::config::{AppConfig, StageSection};
use crate::core::events::EventSender;
use crate::core::TravelOrchestrator;
use crate::llm::{create_client_from_env, LlmClient, MockLlmClient, ProviderError, ProviderKind};
use crate::stages::{StageKind, StageSettings};

/// 编排器构建器
pub struct OrchestratorBuilder {
    config: AppConfig,
    clients: HashMap<StageKind, Arc<dyn LlmClient>>,
    span: Span,
    events: Option<EventSender>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            clients: HashMap::new(),
            span: Span::none(),
            events: None,
        }
    }

    /// 为某个阶段注入客户端（优先于配置）
    pub fn with_client(mut self, kind: StageKind, client: Arc<dyn LlmClient>) -> Self {
        self.clients.insert(kind, client);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// 某阶段合并默认值后的参数
    pub fn settings(&self, kind: StageKind) -> StageSettings {
        StageSettings::resolve(kind, self.section(kind))
    }

    /// 尚未注入客户端、且所需 API Key 环境变量缺失的列表（去重，按阶段顺序）
    pub fn missing_api_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for kind in StageKind::ALL {
            if self.clients.contains_key(&kind) {
                continue;
            }
            let Some(var) = self.settings(kind).provider.api_key_env() else {
                continue;
            };
            let present = std::env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false);
            if !present && !missing.contains(&var) {
                missing.push(var);
            }
        }
        missing
    }

    /// 构建编排器；任一阶段缺少 API Key 时返回 MissingApiKey（列出全部缺失变量）
    pub fn build(mut self) -> Result<TravelOrchestrator, ProviderError> {
        let missing = self.missing_api_keys();
        if !missing.is_empty() {
            return Err(ProviderError::MissingApiKey(missing.join(", ")));
        }

        let timeout_secs = self.config.llm.timeouts.request;
        let request_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        let research = self.take_client(StageKind::Research, timeout_secs)?;
        let planning = self.take_client(StageKind::Planning, timeout_secs)?;
        let personalization = self.take_client(StageKind::Personalization, timeout_secs)?;

        let mut orchestrator = TravelOrchestrator::new(research, planning, personalization);
        for kind in StageKind::ALL {
            orchestrator = orchestrator.with_settings(kind, self.settings(kind));
        }

        Ok(orchestrator
            .with_request_timeout(request_timeout)
            .with_span(self.span)
            .with_events(self.events))
    }

    fn section(&self, kind: StageKind) -> &StageSection {
        match kind {
            StageKind::Research => &self.config.research,
            StageKind::Planning => &self.config.planning,
            StageKind::Personalization => &self.config.personalization,
        }
    }

    /// 已注入的客户端优先，否则按配置创建
    fn take_client(&mut self, kind: StageKind, timeout_secs: u64) -> Result<Arc<dyn LlmClient>, ProviderError> {
        if let Some(client) = self.clients.remove(&kind) {
            return Ok(client);
        }
        let settings = self.settings(kind);
        tracing::info!(stage = %kind, provider = %settings.provider, model = %settings.model, "Configuring stage backend");
        match settings.provider {
            // 以阶段名区分离线运行时的输出
            ProviderKind::Mock => {
                let client: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new(kind.as_str()));
                Ok(client)
            }
            provider => create_client_from_env(provider, settings.base_url.as_deref(), timeout_secs),
        }
    }
}
