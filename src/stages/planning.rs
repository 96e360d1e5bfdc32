//! 规划阶段：生成行程 → 优化物流 → 成本分析，外加本地占位指标
//!
//! 三次调用依次依赖上一步结果；优化失败时沿用未优化的行程。

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::PipelineError;
use crate::stages::prompts;
use crate::stages::{StageContext, StageInput, StageKind, StageProcedure};
use crate::trip::{OptimizationMetrics, PlanningOutput};

pub const ITINERARY_FAILED: &str = "Itinerary generation failed";
pub const COST_ANALYSIS_UNAVAILABLE: &str = "Cost analysis unavailable";

#[derive(Debug, Clone, Copy, Default)]
pub struct PlanningStage;

/// 把自由文本包成单键 JSON 放进 Prompt
pub(crate) fn wrap_json(key: &str, text: &str) -> String {
    let mut map = Map::new();
    map.insert(key.to_string(), Value::String(text.to_string()));
    serde_json::to_string_pretty(&Value::Object(map)).unwrap_or_else(|_| text.to_string())
}

#[async_trait]
impl StageProcedure for PlanningStage {
    type Output = PlanningOutput;

    fn kind(&self) -> StageKind {
        StageKind::Planning
    }

    fn check_inputs(&self, input: &StageInput) -> Result<(), PipelineError> {
        input.destination(self.kind())?;
        input.constraints(self.kind())?;
        input.research_data(self.kind())?;
        Ok(())
    }

    async fn run(&self, input: &StageInput, ctx: &StageContext) -> Result<PlanningOutput, PipelineError> {
        let destination = input.destination(self.kind())?;
        let constraints = input.constraints(self.kind())?;
        let research_data = input.research_data(self.kind())?;

        let generated = ctx
            .generate(
                "itinerary",
                ctx.request(prompts::itinerary_prompt(
                    destination,
                    &wrap_json("synthesis", research_data),
                    constraints,
                )),
                || ITINERARY_FAILED.to_string(),
            )
            .await;

        let optimized = ctx
            .generate(
                "logistics",
                ctx.request(prompts::logistics_prompt(&wrap_json("itinerary", &generated))),
                || generated.clone(),
            )
            .await;

        let cost_analysis = ctx
            .generate(
                "cost_analysis",
                ctx.request(prompts::cost_prompt(
                    &wrap_json("optimized_itinerary", &optimized),
                    constraints,
                ))
                .with_max_tokens(ctx.settings().cost_max_tokens.or(ctx.settings().max_tokens)),
                || COST_ANALYSIS_UNAVAILABLE.to_string(),
            )
            .await;

        let mut raw = Map::new();
        if generated != optimized {
            raw.insert("generated_itinerary".to_string(), Value::String(generated));
        }

        Ok(PlanningOutput {
            destination: destination.to_string(),
            itinerary: optimized,
            cost_analysis,
            optimization_metrics: OptimizationMetrics::placeholder(),
            raw,
        })
    }
}
