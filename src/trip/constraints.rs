//! 旅行约束：预算、天数、人数、偏好、风格
//!
//! 一次规划请求创建一次，之后只读；字段私有，通过 Builder 构造并校验。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::ConstraintError;

/// 住宿预算占总预算的比例
const ACCOMMODATION_SHARE: f64 = 0.3;

/// 旅行风格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelStyle {
    Budget,
    #[default]
    Balanced,
    Luxury,
}

impl TravelStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelStyle::Budget => "budget",
            TravelStyle::Balanced => "balanced",
            TravelStyle::Luxury => "luxury",
        }
    }
}

impl fmt::Display for TravelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "budget" => Ok(TravelStyle::Budget),
            "balanced" => Ok(TravelStyle::Balanced),
            "luxury" => Ok(TravelStyle::Luxury),
            other => Err(format!(
                "unknown travel style '{other}' (expected budget, balanced or luxury)"
            )),
        }
    }
}

/// 旅行约束（调用方提供的行程参数）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelConstraints {
    total_budget_usd: f64,
    duration_days: u32,
    traveler_count: u32,
    #[serde(default)]
    preferences: Vec<String>,
    #[serde(default)]
    must_visit: Option<Vec<String>>,
    #[serde(default)]
    avoid: Option<Vec<String>>,
    #[serde(default)]
    travel_style: TravelStyle,
}

impl TravelConstraints {
    pub fn builder(
        total_budget_usd: f64,
        duration_days: u32,
        traveler_count: u32,
    ) -> TravelConstraintsBuilder {
        TravelConstraintsBuilder {
            inner: TravelConstraints {
                total_budget_usd,
                duration_days,
                traveler_count,
                preferences: Vec::new(),
                must_visit: None,
                avoid: None,
                travel_style: TravelStyle::default(),
            },
        }
    }

    /// 所有金额 / 天数 / 人数字段必须 > 0
    pub fn validate(&self) -> Result<(), ConstraintError> {
        if !self.total_budget_usd.is_finite() || self.total_budget_usd <= 0.0 {
            return Err(ConstraintError::NonPositiveBudget(self.total_budget_usd));
        }
        if self.duration_days == 0 {
            return Err(ConstraintError::ZeroDuration);
        }
        if self.traveler_count == 0 {
            return Err(ConstraintError::ZeroTravelers);
        }
        Ok(())
    }

    pub fn total_budget_usd(&self) -> f64 {
        self.total_budget_usd
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }

    pub fn traveler_count(&self) -> u32 {
        self.traveler_count
    }

    pub fn preferences(&self) -> &[String] {
        &self.preferences
    }

    pub fn must_visit(&self) -> Option<&[String]> {
        self.must_visit.as_deref()
    }

    pub fn avoid(&self) -> Option<&[String]> {
        self.avoid.as_deref()
    }

    pub fn travel_style(&self) -> TravelStyle {
        self.travel_style
    }

    /// 每晚住宿预算：总预算的 30% 均摊到每天
    pub fn nightly_accommodation_budget(&self) -> f64 {
        self.total_budget_usd * ACCOMMODATION_SHARE / self.duration_days.max(1) as f64
    }

    pub fn preferences_joined(&self) -> String {
        self.preferences.join(", ")
    }
}

/// TravelConstraints 构建器；build 时校验
#[derive(Debug, Clone)]
pub struct TravelConstraintsBuilder {
    inner: TravelConstraints,
}

impl TravelConstraintsBuilder {
    pub fn preferences<I, S>(mut self, preferences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.preferences = preferences.into_iter().map(Into::into).collect();
        self
    }

    pub fn must_visit<I, S>(mut self, places: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.must_visit = non_empty(places);
        self
    }

    pub fn avoid<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.avoid = non_empty(items);
        self
    }

    pub fn style(mut self, style: TravelStyle) -> Self {
        self.inner.travel_style = style;
        self
    }

    pub fn build(self) -> Result<TravelConstraints, ConstraintError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

fn non_empty<I, S>(items: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let items: Vec<String> = items.into_iter().map(Into::into).collect();
    (!items.is_empty()).then_some(items)
}
