//! 阶段产出与最终行程
//!
//! 各阶段的产出是带可选字段的结构体；模型返回的自由文本原样保留，不做解析。
//! `raw` 用于存放不属于固定字段的自由内容，序列化时为空则省略。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::stages::StageKind;
use crate::trip::TravelConstraints;

/// 单个阶段的结果：产出 + 耗时 + 回退的子调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult<T> {
    #[serde(flatten)]
    pub payload: T,
    /// 秒
    pub processing_time: f64,
    /// 失败后使用了默认值的子调用
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_calls: Vec<String>,
}

impl<T> StageResult<T> {
    pub fn is_degraded(&self) -> bool {
        !self.degraded_calls.is_empty()
    }
}

/// 研究阶段的综合结论
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchData {
    pub synthesis: String,
}

/// 研究阶段五项独立检索的原文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResearch {
    pub weather: String,
    pub events: String,
    pub attractions: String,
    pub accommodation: String,
    pub transport: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchOutput {
    pub destination: String,
    pub research_data: ResearchData,
    pub raw_data: RawResearch,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub raw: Map<String, Value>,
}

/// 指标来源：目前只有固定占位值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSource {
    Placeholder,
}

/// 行程优化指标（占位值，未基于实际行程计算）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationMetrics {
    pub budget_utilization: f64,
    pub geographic_efficiency: f64,
    pub time_efficiency: f64,
    pub preference_match: f64,
    pub source: MetricsSource,
}

impl OptimizationMetrics {
    pub fn placeholder() -> Self {
        Self {
            budget_utilization: 0.85,
            geographic_efficiency: 0.92,
            time_efficiency: 0.88,
            preference_match: 0.91,
            source: MetricsSource::Placeholder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningOutput {
    pub destination: String,
    /// 经过物流优化后的行程
    pub itinerary: String,
    pub cost_analysis: String,
    pub optimization_metrics: OptimizationMetrics,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub raw: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizationOutput {
    /// 个性化并补充情境建议后的行程
    pub personalized_itinerary: String,
    pub personalization_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub raw: Map<String, Value>,
}

/// 一次完整规划的结果，交给调用方序列化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub destination: String,
    pub constraints: TravelConstraints,
    pub research_output: StageResult<ResearchOutput>,
    pub planning_output: StageResult<PlanningOutput>,
    pub personalization_output: StageResult<PersonalizationOutput>,
    pub total_processing_time: f64,
    pub agent_times: BTreeMap<StageKind, f64>,
}

impl TripPlan {
    pub fn new(
        destination: String,
        constraints: TravelConstraints,
        research_output: StageResult<ResearchOutput>,
        planning_output: StageResult<PlanningOutput>,
        personalization_output: StageResult<PersonalizationOutput>,
    ) -> Self {
        let agent_times = BTreeMap::from([
            (StageKind::Research, research_output.processing_time),
            (StageKind::Planning, planning_output.processing_time),
            (StageKind::Personalization, personalization_output.processing_time),
        ]);
        let total_processing_time = agent_times.values().sum();

        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            destination,
            constraints,
            research_output,
            planning_output,
            personalization_output,
            total_processing_time,
            agent_times,
        }
    }

    /// 所有阶段中回退的子调用，形如 `research.weather`
    pub fn degraded_calls(&self) -> Vec<String> {
        let stages = [
            (StageKind::Research, &self.research_output.degraded_calls),
            (StageKind::Planning, &self.planning_output.degraded_calls),
            (StageKind::Personalization, &self.personalization_output.degraded_calls),
        ];
        stages
            .into_iter()
            .flat_map(|(kind, calls)| calls.iter().map(move |c| format!("{kind}.{c}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage<T>(payload: T, secs: f64, degraded: &[&str]) -> StageResult<T> {
        StageResult {
            payload,
            processing_time: secs,
            degraded_calls: degraded.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn sample_plan() -> TripPlan {
        let constraints = TravelConstraints::builder(1500.0, 7, 2).build().unwrap();
        TripPlan::new(
            "Georgia".to_string(),
            constraints,
            stage(
                ResearchOutput {
                    destination: "Georgia".to_string(),
                    research_data: ResearchData {
                        synthesis: "s".to_string(),
                    },
                    raw_data: RawResearch {
                        weather: "w".to_string(),
                        events: "e".to_string(),
                        attractions: "a".to_string(),
                        accommodation: "h".to_string(),
                        transport: "t".to_string(),
                    },
                    raw: Map::new(),
                },
                1.5,
                &["weather"],
            ),
            stage(
                PlanningOutput {
                    destination: "Georgia".to_string(),
                    itinerary: "i".to_string(),
                    cost_analysis: "c".to_string(),
                    optimization_metrics: OptimizationMetrics::placeholder(),
                    raw: Map::new(),
                },
                2.25,
                &[],
            ),
            stage(
                PersonalizationOutput {
                    personalized_itinerary: "p".to_string(),
                    personalization_notes: vec![],
                    raw: Map::new(),
                },
                0.25,
                &["context"],
            ),
        )
    }

    #[test]
    fn test_total_is_sum_of_agent_times() {
        let plan = sample_plan();
        assert_eq!(plan.agent_times.len(), 3);
        assert!((plan.total_processing_time - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(sample_plan()).unwrap();
        assert_eq!(value["destination"], "Georgia");
        assert_eq!(value["research_output"]["raw_data"]["weather"], "w");
        assert_eq!(value["research_output"]["processing_time"], 1.5);
        assert_eq!(value["research_output"]["degraded_calls"][0], "weather");
        assert!(value["planning_output"].get("degraded_calls").is_none());
        assert!(value["planning_output"].get("raw").is_none());
        assert_eq!(value["planning_output"]["optimization_metrics"]["source"], "placeholder");
        assert_eq!(value["agent_times"]["personalization"], 0.25);
        assert_eq!(value["constraints"]["travel_style"], "balanced");
    }

    #[test]
    fn test_degraded_calls_are_prefixed() {
        assert_eq!(
            sample_plan().degraded_calls(),
            vec!["research.weather", "personalization.context"]
        );
    }
}
