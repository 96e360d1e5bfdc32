//! 阶段层：统一的阶段契约与通用执行器
//!
//! - **StageProcedure**: 各阶段私有的「构造 Prompt + 调用后端」过程（研究 / 规划 / 个性化）
//! - **StageRunner**: 通用外壳，负责计时、日志、事件，对三个阶段一视同仁
//! - **StageContext**: 单次执行的上下文；所有后端调用经由它走超时与失败回退

pub mod personalization;
pub mod planning;
pub mod prompts;
pub mod research;

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, Span};

use crate::config::StageSection;
use crate::core::events::{emit, EventSender, PipelineEvent};
use crate::core::{or_fallback, Fallback, PipelineError};
use crate::llm::{LlmClient, ProviderError, ProviderKind, TextRequest};
use crate::trip::{StageResult, TravelConstraints};

pub use personalization::PersonalizationStage;
pub use planning::PlanningStage;
pub use research::ResearchStage;

/// 流水线中的三个阶段（声明顺序即执行顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Research,
    Planning,
    Personalization,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [
        StageKind::Research,
        StageKind::Planning,
        StageKind::Personalization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Research => "research",
            StageKind::Planning => "planning",
            StageKind::Personalization => "personalization",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 阶段输入：各阶段只读取自己声明需要的字段，缺失即 PipelineError
#[derive(Debug, Clone, Default)]
pub struct StageInput {
    pub destination: Option<String>,
    pub constraints: Option<TravelConstraints>,
    /// 研究阶段的综合结论
    pub research_data: Option<String>,
    /// 规划阶段产出的行程
    pub itinerary: Option<String>,
}

impl StageInput {
    pub fn new(destination: impl Into<String>, constraints: TravelConstraints) -> Self {
        Self {
            destination: Some(destination.into()),
            constraints: Some(constraints),
            ..Default::default()
        }
    }

    pub fn with_research_data(mut self, research_data: impl Into<String>) -> Self {
        self.research_data = Some(research_data.into());
        self
    }

    pub fn with_itinerary(mut self, itinerary: impl Into<String>) -> Self {
        self.itinerary = Some(itinerary.into());
        self
    }

    pub fn destination(&self, stage: StageKind) -> Result<&str, PipelineError> {
        self.destination
            .as_deref()
            .ok_or(PipelineError::MissingInput { stage, key: "destination" })
    }

    pub fn constraints(&self, stage: StageKind) -> Result<&TravelConstraints, PipelineError> {
        self.constraints
            .as_ref()
            .ok_or(PipelineError::MissingInput { stage, key: "constraints" })
    }

    pub fn research_data(&self, stage: StageKind) -> Result<&str, PipelineError> {
        self.research_data
            .as_deref()
            .ok_or(PipelineError::MissingInput { stage, key: "research_data" })
    }

    pub fn itinerary(&self, stage: StageKind) -> Result<&str, PipelineError> {
        self.itinerary
            .as_deref()
            .ok_or(PipelineError::MissingInput { stage, key: "itinerary" })
    }
}

/// 阶段的后端与采样参数（配置段已与阶段默认值合并）
#[derive(Debug, Clone, PartialEq)]
pub struct StageSettings {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub synthesis_temperature: Option<f32>,
    pub cost_max_tokens: Option<u32>,
}

impl StageSettings {
    /// 各阶段默认后端：研究 OpenAI、规划 Anthropic、个性化 Gemini
    pub fn defaults(kind: StageKind) -> Self {
        match kind {
            StageKind::Research => Self {
                provider: ProviderKind::OpenAi,
                model: "gpt-4".to_string(),
                base_url: None,
                temperature: 0.1,
                max_tokens: None,
                synthesis_temperature: Some(0.2),
                cost_max_tokens: None,
            },
            StageKind::Planning => Self {
                provider: ProviderKind::Anthropic,
                model: "claude-3-sonnet-20240229".to_string(),
                base_url: None,
                temperature: 0.1,
                max_tokens: Some(4000),
                synthesis_temperature: None,
                cost_max_tokens: Some(2000),
            },
            StageKind::Personalization => Self {
                provider: ProviderKind::Google,
                model: "gemini-pro".to_string(),
                base_url: None,
                temperature: 0.7,
                max_tokens: None,
                synthesis_temperature: None,
                cost_max_tokens: None,
            },
        }
    }

    /// 配置段中出现的字段覆盖默认值
    pub fn resolve(kind: StageKind, section: &StageSection) -> Self {
        let d = Self::defaults(kind);
        Self {
            provider: section.provider.unwrap_or(d.provider),
            model: section.model.clone().unwrap_or(d.model),
            base_url: section.base_url.clone().or(d.base_url),
            temperature: section.temperature.unwrap_or(d.temperature),
            max_tokens: section.max_tokens.or(d.max_tokens),
            synthesis_temperature: section.synthesis_temperature.or(d.synthesis_temperature),
            cost_max_tokens: section.cost_max_tokens.or(d.cost_max_tokens),
        }
    }
}

/// 单次阶段执行的上下文
pub struct StageContext {
    kind: StageKind,
    client: Arc<dyn LlmClient>,
    settings: StageSettings,
    request_timeout: Option<Duration>,
    events: Option<EventSender>,
    degraded: Mutex<Vec<String>>,
}

impl StageContext {
    pub fn new(
        kind: StageKind,
        client: Arc<dyn LlmClient>,
        settings: StageSettings,
        request_timeout: Option<Duration>,
        events: Option<EventSender>,
    ) -> Self {
        Self {
            kind,
            client,
            settings,
            request_timeout,
            events,
            degraded: Mutex::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    /// 以阶段默认模型、温度与输出上限构造请求
    pub fn request(&self, prompt: impl Into<String>) -> TextRequest {
        TextRequest::new(self.settings.model.clone(), prompt)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
    }

    /// 调用后端；失败或超时则返回 default()，并记录该子调用为降级
    pub async fn generate<D>(&self, label: &str, request: TextRequest, default: D) -> String
    where
        D: FnOnce() -> String,
    {
        let outcome = self.attempt(label, request, default).await;
        self.settle(label, outcome)
    }

    /// 只调用后端并回退，不记录降级；并发调用结束后按声明顺序交给 settle
    pub async fn attempt<D>(&self, label: &str, request: TextRequest, default: D) -> Fallback<String>
    where
        D: FnOnce() -> String,
    {
        let call = async {
            match self.request_timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.client.generate_text(&request)).await {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Timeout(limit)),
                    }
                }
                None => self.client.generate_text(&request).await,
            }
        };
        or_fallback(label, call, default).await
    }

    /// 记录一次调用结果：失败时登记降级并发出事件，返回最终文本
    pub fn settle(&self, label: &str, outcome: Fallback<String>) -> String {
        if let Some(err) = &outcome.error {
            if let Ok(mut degraded) = self.degraded.lock() {
                degraded.push(label.to_string());
            }
            emit(
                self.events.as_ref(),
                PipelineEvent::SubCallDegraded {
                    stage: self.kind,
                    call: label.to_string(),
                    reason: err.to_string(),
                },
            );
        }
        outcome.into_value()
    }

    fn take_degraded(&self) -> Vec<String> {
        self.degraded
            .lock()
            .map(|mut d| std::mem::take(&mut *d))
            .unwrap_or_default()
    }
}

/// 阶段私有过程：读取输入、构造 Prompt、经 StageContext 调用后端、组装产出
///
/// 输入缺失时返回 PipelineError，且不发生任何后端调用。
#[async_trait]
pub trait StageProcedure: Send + Sync {
    type Output: Send;

    fn kind(&self) -> StageKind;

    /// 检查必需输入是否齐全；执行器在发出 StageStarted 之前调用
    fn check_inputs(&self, input: &StageInput) -> Result<(), PipelineError>;

    async fn run(&self, input: &StageInput, ctx: &StageContext) -> Result<Self::Output, PipelineError>;
}

/// 通用阶段执行器：计时 + 日志 + 事件，包裹任意 StageProcedure
pub struct StageRunner<P> {
    procedure: P,
    client: Arc<dyn LlmClient>,
    settings: StageSettings,
    request_timeout: Option<Duration>,
    span: Span,
    events: Option<EventSender>,
}

impl<P: StageProcedure> StageRunner<P> {
    pub fn new(procedure: P, client: Arc<dyn LlmClient>, settings: StageSettings) -> Self {
        Self {
            procedure,
            client,
            settings,
            request_timeout: None,
            span: Span::none(),
            events: None,
        }
    }

    pub fn with_settings(mut self, settings: StageSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// 注入日志 span，阶段日志作为其子 span 输出
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_events(mut self, events: Option<EventSender>) -> Self {
        self.events = events;
        self
    }

    pub fn kind(&self) -> StageKind {
        self.procedure.kind()
    }

    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    /// 运行阶段；后端失败不会导致返回 Err，只有输入缺失会（此时不发出任何事件）
    pub async fn process(&self, input: &StageInput) -> Result<StageResult<P::Output>, PipelineError> {
        let kind = self.kind();
        let span = tracing::info_span!(parent: &self.span, "stage", stage = %kind, model = %self.settings.model);

        async move {
            self.procedure.check_inputs(input)?;
            emit(self.events.as_ref(), PipelineEvent::StageStarted { stage: kind });
            let ctx = StageContext::new(
                kind,
                self.client.clone(),
                self.settings.clone(),
                self.request_timeout,
                self.events.clone(),
            );

            let start = Instant::now();
            let payload = self.procedure.run(input, &ctx).await?;
            let processing_time = start.elapsed().as_secs_f64();
            let degraded_calls = ctx.take_degraded();

            tracing::info!(
                elapsed = processing_time,
                degraded = degraded_calls.len(),
                "{} agent completed in {:.2}s",
                kind,
                processing_time
            );
            emit(
                self.events.as_ref(),
                PipelineEvent::StageCompleted {
                    stage: kind,
                    elapsed: processing_time,
                    degraded: degraded_calls.len(),
                },
            );

            Ok(StageResult {
                payload,
                processing_time,
                degraded_calls,
            })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    struct EchoStage;

    #[async_trait]
    impl StageProcedure for EchoStage {
        type Output = String;

        fn kind(&self) -> StageKind {
            StageKind::Research
        }

        fn check_inputs(&self, input: &StageInput) -> Result<(), PipelineError> {
            input.destination(self.kind()).map(|_| ())
        }

        async fn run(&self, input: &StageInput, ctx: &StageContext) -> Result<String, PipelineError> {
            let destination = input.destination(self.kind())?;
            Ok(ctx
                .generate("echo", ctx.request(destination), || "echo unavailable".to_string())
                .await)
        }
    }

    #[test]
    fn test_stage_kind_order() {
        assert!(StageKind::Research < StageKind::Planning);
        assert!(StageKind::Planning < StageKind::Personalization);
        assert_eq!(StageKind::ALL.map(|k| k.to_string()), ["research", "planning", "personalization"]);
    }

    #[test]
    fn test_settings_resolve_overrides() {
        let section = StageSection {
            model: Some("gpt-4o".to_string()),
            temperature: Some(0.5),
            ..Default::default()
        };
        let s = StageSettings::resolve(StageKind::Research, &section);
        assert_eq!(s.provider, ProviderKind::OpenAi);
        assert_eq!(s.model, "gpt-4o");
        assert_eq!(s.temperature, 0.5);
        assert_eq!(s.synthesis_temperature, Some(0.2));
    }

    #[tokio::test]
    async fn test_runner_records_timing_and_payload() {
        let constraints = TravelConstraints::builder(100.0, 1, 1).build().unwrap();
        let runner = StageRunner::new(
            EchoStage,
            Arc::new(MockLlmClient::new("r")),
            StageSettings::defaults(StageKind::Research),
        );
        let result = runner.process(&StageInput::new("Tbilisi", constraints)).await.unwrap();
        assert_eq!(result.payload, "[r:gpt-4] Tbilisi");
        assert!(result.processing_time >= 0.0);
        assert!(!result.is_degraded());
    }

    #[tokio::test]
    async fn test_runner_degrades_on_failure() {
        let constraints = TravelConstraints::builder(100.0, 1, 1).build().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let runner = StageRunner::new(
            EchoStage,
            Arc::new(MockLlmClient::new("r").failing()),
            StageSettings::defaults(StageKind::Research),
        )
        .with_events(Some(tx));

        let result = runner.process(&StageInput::new("Tbilisi", constraints)).await.unwrap();
        assert_eq!(result.payload, "echo unavailable");
        assert_eq!(result.degraded_calls, vec!["echo"]);

        assert!(matches!(rx.recv().await, Some(PipelineEvent::StageStarted { .. })));
        assert!(matches!(rx.recv().await, Some(PipelineEvent::SubCallDegraded { .. })));
        assert!(matches!(
            rx.recv().await,
            Some(PipelineEvent::StageCompleted { degraded: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_runner_missing_input_is_error() {
        let mock = MockLlmClient::new("r");
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let runner = StageRunner::new(
            EchoStage,
            Arc::new(mock.clone()),
            StageSettings::defaults(StageKind::Research),
        )
        .with_events(Some(tx));
        let err = runner.process(&StageInput::default()).await.unwrap_err();
        // 输入缺失时不应留下没有结束事件的 StageStarted
        assert!(rx.try_recv().is_err());
        assert_eq!(
            err,
            PipelineError::MissingInput {
                stage: StageKind::Research,
                key: "destination"
            }
        );
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_provider_failure() {
        struct SlowClient;

        #[async_trait]
        impl LlmClient for SlowClient {
            fn name(&self) -> &str {
                "slow"
            }

            async fn generate_text(&self, _request: &TextRequest) -> Result<String, ProviderError> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok("late".to_string())
            }
        }

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let ctx = StageContext::new(
            StageKind::Planning,
            Arc::new(SlowClient),
            StageSettings::defaults(StageKind::Planning),
            Some(Duration::from_millis(20)),
            Some(tx),
        );
        let out = ctx
            .generate("itinerary", ctx.request("plan"), || "Itinerary generation failed".to_string())
            .await;
        assert_eq!(out, "Itinerary generation failed");
        assert_eq!(ctx.take_degraded(), vec!["itinerary"]);

        // 亚秒级超时在原因中保留毫秒
        match rx.try_recv() {
            Ok(PipelineEvent::SubCallDegraded { reason, .. }) => {
                assert_eq!(reason, "Request timed out after 20ms")
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
