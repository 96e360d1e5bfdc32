//! 旅行规划编排器：研究 → 规划 → 个性化，严格顺序执行
//!
//! 编排器只持有三个阶段执行器（各自的 `Arc<dyn LlmClient>` 与参数），不保存任何请求间状态，
//! 因此可在多个并发请求间共享。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Instrument, Span};

use crate::core::events::{emit, EventSender, PipelineEvent};
use crate::core::{ConstraintError, PlannerError};
use crate::llm::LlmClient;
use crate::stages::{
    PersonalizationStage, PlanningStage, ResearchStage, StageInput, StageKind, StageRunner,
    StageSettings,
};
use crate::trip::{TravelConstraints, TripPlan};

/// 三阶段旅行规划编排器
pub struct TravelOrchestrator {
    research: StageRunner<ResearchStage>,
    planning: StageRunner<PlanningStage>,
    personalization: StageRunner<PersonalizationStage>,
    span: Span,
    events: Option<EventSender>,
}

impl TravelOrchestrator {
    /// 使用各阶段默认参数，后端由调用方注入
    pub fn new(
        research: Arc<dyn LlmClient>,
        planning: Arc<dyn LlmClient>,
        personalization: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            research: StageRunner::new(
                ResearchStage,
                research,
                StageSettings::defaults(StageKind::Research),
            ),
            planning: StageRunner::new(
                PlanningStage,
                planning,
                StageSettings::defaults(StageKind::Planning),
            ),
            personalization: StageRunner::new(
                PersonalizationStage,
                personalization,
                StageSettings::defaults(StageKind::Personalization),
            ),
            span: Span::none(),
            events: None,
        }
    }

    /// 覆盖某个阶段的模型与采样参数
    pub fn with_settings(mut self, kind: StageKind, settings: StageSettings) -> Self {
        match kind {
            StageKind::Research => self.research = self.research.with_settings(settings),
            StageKind::Planning => self.planning = self.planning.with_settings(settings),
            StageKind::Personalization => {
                self.personalization = self.personalization.with_settings(settings)
            }
        }
        self
    }

    /// 单次后端调用的超时；None 表示不限制
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.research = self.research.with_request_timeout(timeout);
        self.planning = self.planning.with_request_timeout(timeout);
        self.personalization = self.personalization.with_request_timeout(timeout);
        self
    }

    /// 注入日志 span；各阶段日志挂在其下
    pub fn with_span(mut self, span: Span) -> Self {
        self.research = self.research.with_span(span.clone());
        self.planning = self.planning.with_span(span.clone());
        self.personalization = self.personalization.with_span(span.clone());
        self.span = span;
        self
    }

    pub fn with_events(mut self, events: Option<EventSender>) -> Self {
        self.research = self.research.with_events(events.clone());
        self.planning = self.planning.with_events(events.clone());
        self.personalization = self.personalization.with_events(events.clone());
        self.events = events;
        self
    }

    /// 运行完整规划
    ///
    /// 约束非法或目的地为空时在任何后端调用之前返回 `PlannerError::Constraint`；
    /// 后端失败只会使对应字段降级为占位文本，不会导致返回 Err。
    pub async fn plan_trip(
        &self,
        destination: &str,
        constraints: TravelConstraints,
    ) -> Result<TripPlan, PlannerError> {
        if destination.trim().is_empty() {
            return Err(ConstraintError::EmptyDestination.into());
        }
        constraints.validate()?;

        let span = tracing::info_span!(parent: &self.span, "plan_trip", destination = %destination);
        async move {
            let start = Instant::now();
            tracing::info!("Starting trip planning for {}", destination);

            tracing::info!("Phase 1: Conducting research...");
            let research_input = StageInput::new(destination, constraints.clone());
            let research = self.research.process(&research_input).await?;

            tracing::info!("Phase 2: Creating optimized itinerary...");
            let planning_input = StageInput::new(destination, constraints.clone())
                .with_research_data(research.payload.research_data.synthesis.clone());
            let planning = self.planning.process(&planning_input).await?;

            tracing::info!("Phase 3: Personalizing experience...");
            let personalization_input = StageInput {
                constraints: Some(constraints.clone()),
                research_data: Some(research.payload.research_data.synthesis.clone()),
                itinerary: Some(planning.payload.itinerary.clone()),
                ..Default::default()
            };
            let personalization = self.personalization.process(&personalization_input).await?;

            let plan = TripPlan::new(
                destination.to_string(),
                constraints,
                research,
                planning,
                personalization,
            );

            let wall = start.elapsed().as_secs_f64();
            tracing::info!(
                total = plan.total_processing_time,
                wall,
                degraded = plan.degraded_calls().len(),
                "Trip planning completed in {:.2} seconds",
                plan.total_processing_time
            );
            emit(
                self.events.as_ref(),
                PipelineEvent::PlanCompleted {
                    destination: destination.to_string(),
                    total: plan.total_processing_time,
                },
            );

            Ok(plan)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn orchestrator(mock: &MockLlmClient) -> TravelOrchestrator {
        let client: Arc<dyn LlmClient> = Arc::new(mock.clone());
        TravelOrchestrator::new(client.clone(), client.clone(), client)
    }

    #[tokio::test]
    async fn test_empty_destination_rejected_before_any_call() {
        let mock = MockLlmClient::new("all");
        let constraints = TravelConstraints::builder(1500.0, 7, 2).build().unwrap();
        let err = orchestrator(&mock).plan_trip("   ", constraints).await.unwrap_err();
        assert_eq!(err, PlannerError::Constraint(ConstraintError::EmptyDestination));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_with_settings_overrides_stage_model() {
        let mock = MockLlmClient::new("all");
        let mut settings = StageSettings::defaults(StageKind::Personalization);
        settings.model = "gemini-1.5-flash".to_string();
        let orch = orchestrator(&mock).with_settings(StageKind::Personalization, settings);

        let constraints = TravelConstraints::builder(800.0, 3, 1).build().unwrap();
        let plan = orch.plan_trip("Lisbon", constraints).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 11);
        assert!(calls[..9].iter().all(|c| c.model != "gemini-1.5-flash"));
        assert!(calls[9..].iter().all(|c| c.model == "gemini-1.5-flash"));
        assert!(plan
            .personalization_output
            .payload
            .personalized_itinerary
            .starts_with("[all:gemini-1.5-flash]"));
    }

    #[tokio::test]
    async fn test_personalization_receives_planned_itinerary() {
        let mock = MockLlmClient::new("all");
        let constraints = TravelConstraints::builder(800.0, 3, 1).build().unwrap();
        let plan = orchestrator(&mock).plan_trip("Lisbon", constraints).await.unwrap();

        let personalize_call = &mock.calls()[9];
        assert!(personalize_call
            .prompt
            .starts_with("Personalize this travel itinerary"));
        assert!(personalize_call.prompt.contains(&plan.planning_output.payload.itinerary));
        assert!(personalize_call
            .prompt
            .contains(&plan.research_output.payload.research_data.synthesis));
    }
}
