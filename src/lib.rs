//! Atlas - 三阶段旅行规划流水线
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排器、构建器、错误类型、失败回退、过程事件
//! - **llm**: LLM 客户端抽象与实现（OpenAI / Anthropic / Gemini / Mock）
//! - **observability**: 日志订阅器初始化
//! - **report**: 规划结果写出与摘要
//! - **stages**: 研究 / 规划 / 个性化三个阶段与通用执行器
//! - **trip**: 旅行约束与规划结果数据模型

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod report;
pub mod stages;
pub mod trip;

pub use crate::core::{OrchestratorBuilder, PlannerError, TravelOrchestrator};
pub use crate::trip::{TravelConstraints, TravelStyle, TripPlan};
