//! 卡顿检测 - 记录最后一次成功读帧的时间，超过阈值周期性告警

use std::time::{Duration, Instant};

/// 一次读帧的结果（不含帧数据）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// 读到了帧
    Frame,
    /// 读取失败或没有帧
    Empty,
}

/// 监控循环本轮要做的事
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// 显示这一帧
    Display,
    /// 超过阈值没有帧，告警后休眠
    WarnStalled { silent_for: Duration },
    /// 休眠后重试
    Idle,
}

/// 卡顿计时器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallTimer {
    last_ok: Instant,
    threshold: Duration,
}

impl StallTimer {
    pub fn new(now: Instant, threshold: Duration) -> Self {
        Self { last_ok: now, threshold }
    }

    /// 最后一次成功读帧（或上次告警）的时间
    pub fn last_ok(&self) -> Instant {
        self.last_ok
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// 距离 `last_ok` 的时间
    pub fn silent_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_ok)
    }
}

/// 根据当前状态和读帧结果计算新状态与动作。
///
/// 成功读帧时 `last_ok` 更新为 `now`；失败时只有静默时间严格超过阈值才告警，
/// 告警后 `last_ok` 重置为 `now`，持续卡顿时每个阈值周期告警一次。
pub fn decide(timer: StallTimer, poll: Poll, now: Instant) -> (StallTimer, Action) {
    match poll {
        Poll::Frame => (StallTimer { last_ok: now, ..timer }, Action::Display),
        Poll::Empty => {
            let silent_for = timer.silent_for(now);
            if silent_for > timer.threshold {
                (
                    StallTimer { last_ok: now, ..timer },
                    Action::WarnStalled { silent_for },
                )
            } else {
                (timer, Action::Idle)
            }
        }
    }
}
