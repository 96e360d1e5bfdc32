//! 行程数据：约束（输入）与阶段产出 / 最终行程（输出）

pub mod constraints;
pub mod plan;

pub use constraints::{TravelConstraints, TravelConstraintsBuilder, TravelStyle};
pub use plan::{
    MetricsSource, OptimizationMetrics, PersonalizationOutput, PlanningOutput, RawResearch,
    ResearchData, ResearchOutput, StageResult, TripPlan,
};
