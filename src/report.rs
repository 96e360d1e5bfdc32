//! 规划结果输出：写入 JSON 文件与终端摘要

use std::fmt::Write as _;
use std::path::Path;

use tokio::fs;

use crate::trip::TripPlan;

/// 以缩进 JSON 写出行程，必要时创建父目录
pub async fn write_plan(path: &Path, plan: &TripPlan) -> std::io::Result<()> {
    if let Some(p) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(p).await?;
    }
    let json = serde_json::to_string_pretty(plan)?;
    fs::write(path, json).await
}

/// 终端摘要：目的地、天数、预算、风格、各阶段耗时、总耗时、降级的子调用
pub fn summary(plan: &TripPlan) -> String {
    let c = &plan.constraints;
    let mut out = String::new();
    let _ = writeln!(out, "=== PLANNING SUMMARY ===");
    let _ = writeln!(out, "Destination: {}", plan.destination);
    let _ = writeln!(out, "Duration: {} days", c.duration_days());
    let _ = writeln!(out, "Budget: ${}", c.total_budget_usd());
    let _ = writeln!(out, "Style: {}", c.travel_style());
    let _ = writeln!(out, "Agent Processing Times:");
    for (stage, secs) in &plan.agent_times {
        let _ = writeln!(out, "  {}: {:.2}s", title_case(stage.as_str()), secs);
    }
    let _ = writeln!(out, "Total time: {:.2} seconds", plan.total_processing_time);

    let degraded = plan.degraded_calls();
    if degraded.is_empty() {
        let _ = write!(out, "Degraded calls: none");
    } else {
        let _ = write!(out, "Degraded calls: {}", degraded.join(", "));
    }
    out
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::Map;
    use tempfile::TempDir;

    use super::*;
    use crate::stages::StageKind;
    use crate::trip::{
        OptimizationMetrics, PersonalizationOutput, PlanningOutput, RawResearch, ResearchData,
        ResearchOutput, StageResult, TravelConstraints,
    };

    fn plan() -> TripPlan {
        let constraints = TravelConstraints::builder(1500.0, 7, 2).build().unwrap();
        let research = StageResult {
            payload: ResearchOutput {
                destination: "Georgia".to_string(),
                research_data: ResearchData {
                    synthesis: "summary".to_string(),
                },
                raw_data: RawResearch {
                    weather: "Weather information unavailable".to_string(),
                    events: "e".to_string(),
                    attractions: "a".to_string(),
                    accommodation: "h".to_string(),
                    transport: "t".to_string(),
                },
                raw: Map::new(),
            },
            processing_time: 1.25,
            degraded_calls: vec!["weather".to_string()],
        };
        let planning = StageResult {
            payload: PlanningOutput {
                destination: "Georgia".to_string(),
                itinerary: "Day 1".to_string(),
                cost_analysis: "cheap".to_string(),
                optimization_metrics: OptimizationMetrics::placeholder(),
                raw: Map::new(),
            },
            processing_time: 2.0,
            degraded_calls: Vec::new(),
        };
        let personalization = StageResult {
            payload: PersonalizationOutput {
                personalized_itinerary: "Day 1, with wine".to_string(),
                personalization_notes: vec!["note".to_string()],
                raw: Map::new(),
            },
            processing_time: 0.5,
            degraded_calls: Vec::new(),
        };
        TripPlan::new("Georgia".to_string(), constraints, research, planning, personalization)
    }

    #[test]
    fn test_summary_lists_stage_times_and_degraded_calls() {
        let text = summary(&plan());
        assert!(text.contains("Destination: Georgia"));
        assert!(text.contains("Duration: 7 days"));
        assert!(text.contains("Budget: $1500"));
        assert!(text.contains("Style: balanced"));
        assert!(text.contains("  Research: 1.25s"));
        assert!(text.contains("  Personalization: 0.50s"));
        assert!(text.contains("Total time: 3.75 seconds"));
        assert!(text.ends_with("Degraded calls: research.weather"));
    }

    #[tokio::test]
    async fn test_write_plan_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("georgia.json");
        let original = plan();

        write_plan(&path, &original).await.unwrap();

        let text = fs::read_to_string(&path).await.unwrap();
        let restored: TripPlan = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, original);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let times: BTreeMap<String, f64> =
            serde_json::from_value(value["agent_times"].clone()).unwrap();
        assert_eq!(times.len(), 3);
        assert!(times.contains_key(StageKind::Planning.as_str()));
        assert_eq!(
            value["planning_output"]["optimization_metrics"]["source"],
            "placeholder"
        );
    }
}
