//! 无界面显示 - 只计数和记录日志，用于没有交互终端的机器

use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info};

use crate::display::{Display, Key};
use crate::frame::Frame;

/// 每隔多少帧记录一次
const DEFAULT_LOG_EVERY: u64 = 300;

pub struct HeadlessDisplay {
    frames: u64,
    log_every: u64,
    closed: bool,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::with_log_every(DEFAULT_LOG_EVERY)
    }

    pub fn with_log_every(log_every: u64) -> Self {
        Self {
            frames: 0,
            log_every: log_every.max(1),
            closed: false,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for HeadlessDisplay {
    fn show(&mut self, window: &str, frame: Frame) -> Result<()> {
        self.frames += 1;
        if self.frames == 1 || self.frames % self.log_every == 0 {
            info!(
                "[{}] frame {} ({}x{})",
                window,
                self.frames,
                frame.width(),
                frame.height()
            );
        }
        Ok(())
    }

    /// 没有键盘输入，立即返回；退出靠外部信号（SIGINT 未被 raw mode 屏蔽）。
    /// 循环中的等待都由监控器的 `Clock` 负责。
    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<Key>> {
        Ok(None)
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        debug!("notice: {}", message);
        Ok(())
    }

    fn close_all(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            info!("Headless display closed after {} frames", self.frames);
        }
        Ok(())
    }
}
