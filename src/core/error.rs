//! 规划错误类型
//!
//! 后端失败（ProviderError）在阶段内部降级处理，不会出现在这里；
//! 这里只有调用方需要处理的两类：约束非法、阶段输入缺失。

use thiserror::Error;

use crate::stages::StageKind;

/// 调用方传入的约束不满足数据模型要求，在任何阶段运行前返回
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("total budget must be a positive amount, got {0}")]
    NonPositiveBudget(f64),

    #[error("trip duration must be at least one day")]
    ZeroDuration,

    #[error("traveler count must be at least one")]
    ZeroTravelers,

    #[error("destination must not be empty")]
    EmptyDestination,
}

/// 阶段契约被破坏（缺少必需输入），属于接线错误，立即返回
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{stage} stage is missing required input '{key}'")]
    MissingInput { stage: StageKind, key: &'static str },
}

/// plan_trip 对外暴露的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    #[error("Invalid constraints: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}
