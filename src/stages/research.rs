//! 研究阶段：五项独立检索 + 一次综合
//!
//! 天气、活动、景点、住宿、交通五项互不依赖，并发执行后按固定顺序汇总，再交给后端综合。
//! 任一项失败只替换该项为占位文本，综合照常进行。

use async_trait::async_trait;
use serde_json::Map;

use crate::core::PipelineError;
use crate::stages::prompts::{self, ResearchDigest};
use crate::stages::{StageContext, StageInput, StageKind, StageProcedure};
use crate::trip::{RawResearch, ResearchData, ResearchOutput};

pub const WEATHER_UNAVAILABLE: &str = "Weather information unavailable";
pub const EVENTS_UNAVAILABLE: &str = "Events information unavailable";
pub const ATTRACTIONS_UNAVAILABLE: &str = "Attractions information unavailable";
pub const ACCOMMODATION_UNAVAILABLE: &str = "Accommodation information unavailable";
pub const TRANSPORT_UNAVAILABLE: &str = "Transport information unavailable";
pub const SYNTHESIS_UNAVAILABLE: &str = "Synthesis unavailable";

#[derive(Debug, Clone, Copy, Default)]
pub struct ResearchStage;

#[async_trait]
impl StageProcedure for ResearchStage {
    type Output = ResearchOutput;

    fn kind(&self) -> StageKind {
        StageKind::Research
    }

    fn check_inputs(&self, input: &StageInput) -> Result<(), PipelineError> {
        input.destination(self.kind())?;
        input.constraints(self.kind())?;
        Ok(())
    }

    async fn run(&self, input: &StageInput, ctx: &StageContext) -> Result<ResearchOutput, PipelineError> {
        let destination = input.destination(self.kind())?;
        let constraints = input.constraints(self.kind())?;

        let (weather, events, attractions, accommodation, transport) = tokio::join!(
            ctx.attempt(
                "weather",
                ctx.request(prompts::weather_prompt(destination, constraints.duration_days())),
                || WEATHER_UNAVAILABLE.to_string(),
            ),
            ctx.attempt(
                "events",
                ctx.request(prompts::events_prompt(destination)),
                || EVENTS_UNAVAILABLE.to_string(),
            ),
            ctx.attempt(
                "attractions",
                ctx.request(prompts::attractions_prompt(destination)),
                || ATTRACTIONS_UNAVAILABLE.to_string(),
            ),
            ctx.attempt(
                "accommodation",
                ctx.request(prompts::accommodation_prompt(destination, constraints)),
                || ACCOMMODATION_UNAVAILABLE.to_string(),
            ),
            ctx.attempt(
                "transport",
                ctx.request(prompts::transport_prompt(destination, constraints)),
                || TRANSPORT_UNAVAILABLE.to_string(),
            ),
        );

        // 按声明顺序登记，降级列表与事件不随后端响应快慢变化
        let raw_data = RawResearch {
            weather: ctx.settle("weather", weather),
            events: ctx.settle("events", events),
            attractions: ctx.settle("attractions", attractions),
            accommodation: ctx.settle("accommodation", accommodation),
            transport: ctx.settle("transport", transport),
        };

        let digest = ResearchDigest {
            weather: &raw_data.weather,
            events: &raw_data.events,
            attractions: &raw_data.attractions,
            accommodation: &raw_data.accommodation,
            transport: &raw_data.transport,
        };
        // 约束只含数字、字符串与单元枚举，序列化不会失败
        let constraints_json = serde_json::to_string(constraints).unwrap_or_default();
        let temperature = ctx
            .settings()
            .synthesis_temperature
            .unwrap_or(ctx.settings().temperature);
        let synthesis = ctx
            .generate(
                "synthesis",
                ctx.request(prompts::synthesis_prompt(destination, &digest, &constraints_json))
                    .with_temperature(temperature),
                || SYNTHESIS_UNAVAILABLE.to_string(),
            )
            .await;

        Ok(ResearchOutput {
            destination: destination.to_string(),
            research_data: ResearchData { synthesis },
            raw_data,
            raw: Map::new(),
        })
    }
}
