//! 空闲等待策略 - 读帧失败后休眠多久再重试

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 读帧失败后的等待策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdleBackoff {
    /// 固定间隔
    Fixed { delay_ms: u64 },
    /// 指数增长，封顶 `max_ms`
    Exponential { initial_ms: u64, max_ms: u64 },
}

impl Default for IdleBackoff {
    fn default() -> Self {
        IdleBackoff::Fixed { delay_ms: 20 }
    }
}

impl IdleBackoff {
    /// 第 `failures` 次连续失败后的等待时间（从 1 开始计数）
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            IdleBackoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            IdleBackoff::Exponential { initial_ms, max_ms } => {
                let shift = failures.saturating_sub(1).min(32);
                let ms = initial_ms.saturating_mul(1u64 << shift);
                Duration::from_millis(ms.min(max_ms.max(initial_ms)))
            }
        }
    }
}
