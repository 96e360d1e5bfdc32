//! 个性化阶段：按偏好改写行程 → 补充情境建议，外加本地生成的说明
//!
//! 两次调用失败时都沿用上一步的行程文本，因此最终产出总是一份可读的行程。

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::PipelineError;
use crate::stages::planning::wrap_json;
use crate::stages::prompts;
use crate::stages::{StageContext, StageInput, StageKind, StageProcedure};
use crate::trip::{PersonalizationOutput, TravelConstraints};

#[derive(Debug, Clone, Copy, Default)]
pub struct PersonalizationStage;

#[async_trait]
impl StageProcedure for PersonalizationStage {
    type Output = PersonalizationOutput;

    fn kind(&self) -> StageKind {
        StageKind::Personalization
    }

    fn check_inputs(&self, input: &StageInput) -> Result<(), PipelineError> {
        input.itinerary(self.kind())?;
        input.constraints(self.kind())?;
        Ok(())
    }

    async fn run(
        &self,
        input: &StageInput,
        ctx: &StageContext,
    ) -> Result<PersonalizationOutput, PipelineError> {
        let itinerary = input.itinerary(self.kind())?;
        let constraints = input.constraints(self.kind())?;
        let research_json = input
            .research_data
            .as_deref()
            .map(|r| wrap_json("synthesis", r))
            .unwrap_or_else(|| "{}".to_string());

        let personalized = ctx
            .generate(
                "personalize",
                ctx.request(prompts::personalize_prompt(
                    &wrap_json("itinerary", itinerary),
                    constraints,
                    &research_json,
                )),
                || itinerary.to_string(),
            )
            .await;

        let enhanced = ctx
            .generate(
                "context",
                ctx.request(prompts::context_prompt(&wrap_json("personalized", &personalized))),
                || personalized.clone(),
            )
            .await;

        let mut raw = Map::new();
        if personalized != enhanced {
            raw.insert("personalized".to_string(), Value::String(personalized));
        }

        Ok(PersonalizationOutput {
            personalized_itinerary: enhanced,
            personalization_notes: personalization_notes(constraints),
            raw,
        })
    }
}

/// 本地生成的个性化说明（不调用后端）
pub fn personalization_notes(c: &TravelConstraints) -> Vec<String> {
    let focus = c
        .preferences()
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        format!("Itinerary personalized for {} travel style", c.travel_style()),
        format!("Optimized for {} travelers", c.traveler_count()),
        format!("Focused on preferences: {focus}"),
        "Alternative options provided for weather contingencies".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::MockLlmClient;
    use crate::stages::{StageRunner, StageSettings};
    use crate::trip::TravelStyle;

    fn constraints() -> TravelConstraints {
        TravelConstraints::builder(3000.0, 5, 4)
            .preferences(["wine", "hiking", "food", "photography"])
            .style(TravelStyle::Luxury)
            .build()
            .unwrap()
    }

    fn runner(mock: MockLlmClient) -> StageRunner<PersonalizationStage> {
        StageRunner::new(
            PersonalizationStage,
            Arc::new(mock),
            StageSettings::defaults(StageKind::Personalization),
        )
    }

    #[test]
    fn test_notes_take_first_three_preferences() {
        let notes = personalization_notes(&constraints());
        assert_eq!(notes.len(), 4);
        assert_eq!(notes[0], "Itinerary personalized for luxury travel style");
        assert_eq!(notes[1], "Optimized for 4 travelers");
        assert_eq!(notes[2], "Focused on preferences: wine, hiking, food");
    }

    #[tokio::test]
    async fn test_research_context_is_optional() {
        let mock = MockLlmClient::new("personalization");
        let input = StageInput {
            constraints: Some(constraints()),
            itinerary: Some("Day 1: Sighnaghi".to_string()),
            ..Default::default()
        };
        let result = runner(mock.clone()).process(&input).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].prompt.contains("Day 1: Sighnaghi"));
        assert!(calls[0].prompt.contains("RESEARCH CONTEXT:\n{}"));
        assert!(calls[1].prompt.starts_with("Enhance this personalized itinerary"));
        assert!(result.payload.personalized_itinerary.contains("Enhance this personalized itinerary"));
        assert!(result.payload.raw.contains_key("personalized"));
    }

    #[tokio::test]
    async fn test_failures_fall_back_to_incoming_itinerary() {
        let mock = MockLlmClient::new("personalization").failing();
        let input = StageInput {
            constraints: Some(constraints()),
            itinerary: Some("Day 1: Sighnaghi".to_string()),
            research_data: Some("Kakheti wine region".to_string()),
            ..Default::default()
        };
        let result = runner(mock).process(&input).await.unwrap();

        assert_eq!(result.payload.personalized_itinerary, "Day 1: Sighnaghi");
        assert_eq!(result.degraded_calls, vec!["personalize", "context"]);
        assert_eq!(result.payload.personalization_notes.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_itinerary() {
        let mock = MockLlmClient::new("personalization");
        let input = StageInput {
            constraints: Some(constraints()),
            ..Default::default()
        };
        let err = runner(mock.clone()).process(&input).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput { key: "itinerary", .. }));
        assert!(mock.calls().is_empty());
    }
}
