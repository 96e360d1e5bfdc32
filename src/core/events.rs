//! 流水线过程事件：用于前端展示或测试中观察阶段顺序与降级情况

use serde::Serialize;
use tokio::sync::mpsc;

use crate::stages::StageKind;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// 阶段开始
    StageStarted { stage: StageKind },
    /// 子调用失败，已使用默认值
    SubCallDegraded {
        stage: StageKind,
        call: String,
        reason: String,
    },
    /// 阶段结束（秒）
    StageCompleted {
        stage: StageKind,
        elapsed: f64,
        degraded: usize,
    },
    /// 整个规划结束（秒）
    PlanCompleted { destination: String, total: f64 },
}

pub type EventSender = mpsc::UnboundedSender<PipelineEvent>;

/// 发送事件；接收端已关闭时静默丢弃
pub(crate) fn emit(events: Option<&EventSender>, event: PipelineEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
