//! 核心编排层：错误类型、失败回退、过程事件、编排器与构建器

pub mod builder;
pub mod error;
pub mod events;
pub mod fallback;
pub mod orchestrator;

pub use builder::OrchestratorBuilder;
pub use error::{ConstraintError, PipelineError, PlannerError};
pub use events::{EventSender, PipelineEvent};
pub use fallback::{or_fallback, Fallback};
pub use orchestrator::TravelOrchestrator;
