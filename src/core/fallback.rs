//! 失败回退组合子
//!
//! 运行一个可能失败的后端调用；失败时记录日志并返回声明的默认值，流程继续。

use std::future::Future;

use crate::llm::ProviderError;

/// 回退结果：最终值 + 失败时的原始错误
#[derive(Debug)]
pub struct Fallback<T> {
    pub value: T,
    pub error: Option<ProviderError>,
}

impl<T> Fallback<T> {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// 执行 fut；Err 时以 default() 代替。default 惰性求值，便于把上一步结果作为默认值传入
pub async fn or_fallback<T, F, D>(label: &str, fut: F, default: D) -> Fallback<T>
where
    F: Future<Output = Result<T, ProviderError>>,
    D: FnOnce() -> T,
{
    match fut.await {
        Ok(value) => Fallback { value, error: None },
        Err(e) => {
            tracing::warn!(call = label, error = %e, "Provider call failed, using fallback");
            Fallback {
                value: default(),
                error: Some(e),
            }
        }
    }
}
