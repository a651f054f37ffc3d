//! 流监控 - 读帧、显示、卡顿告警、按键退出
//!
//! 单线程循环：
//! 1. 读帧
//! 2. 失败：超过阈值则告警并重置计时，检查 Ctrl-C，休眠后重试
//! 3. 成功：重置计时，显示，轮询按键，Esc 退出

use anyhow::Result;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::backoff::IdleBackoff;
use crate::clock::{Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::display::{Display, Key};
use crate::source::{SourceOpener, VideoSource};
use crate::stall::{decide, Action, Poll, StallTimer};

/// 监控循环参数
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub window_name: String,
    pub stall_timeout: Duration,
    pub key_poll: Duration,
    pub idle_backoff: IdleBackoff,
}

impl MonitorSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            window_name: config.window_name.clone(),
            stall_timeout: config.stall_timeout(),
            key_poll: config.key_poll(),
            idle_backoff: config.idle_backoff,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from_config(&MonitorConfig::default())
    }
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub frames_shown: u64,
    pub failed_reads: u64,
    pub stall_warnings: u64,
}

/// 循环结束后的汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: MonitorStats,
    pub elapsed: Duration,
}

/// 单步结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Exit,
}

/// 启动失败
#[derive(Debug)]
pub enum StartupError {
    /// 无法打开流（致命，不重试）
    Open(anyhow::Error),
    /// 流已打开但无法创建显示
    Display(anyhow::Error),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Open(e) => write!(f, "failed to open stream: {:#}", e),
            StartupError::Display(e) => write!(f, "failed to create display: {:#}", e),
        }
    }
}

impl std::error::Error for StartupError {}

/// 卡顿告警文本
pub fn stall_message(threshold: Duration) -> String {
    let secs = if threshold.subsec_millis() == 0 {
        format!("{}s", threshold.as_secs())
    } else {
        format!("{:.1}s", threshold.as_secs_f64())
    };
    format!("No frames for {}. Stream stalled or URL wrong.", secs)
}

/// HLS 流监控器
pub struct StreamMonitor<S: VideoSource, D: Display, C: Clock = SystemClock> {
    source: S,
    display: D,
    clock: C,
    settings: MonitorSettings,
    timer: StallTimer,
    /// 连续读帧失败次数，决定空闲等待时长
    failure_streak: u32,
    stats: MonitorStats,
    started: Instant,
}

impl<S: VideoSource, D: Display, C: Clock> StreamMonitor<S, D, C> {
    /// 打开 `url`，成功后才创建显示
    pub fn initialize<O, F>(
        opener: &O,
        url: &str,
        make_display: F,
        settings: MonitorSettings,
        clock: C,
    ) -> Result<Self, StartupError>
    where
        O: SourceOpener<Source = S>,
        F: FnOnce() -> Result<D>,
    {
        info!("Opening {}", url);
        let mut source = opener.open(url).map_err(StartupError::Open)?;
        if !source.is_open() {
            return Err(StartupError::Open(anyhow::anyhow!("source reported closed after open")));
        }

        let display = match make_display() {
            Ok(display) => display,
            Err(e) => {
                source.release();
                return Err(StartupError::Display(e));
            }
        };

        Ok(Self::new(source, display, settings, clock))
    }

    /// 用已打开的源和显示构建监控器
    pub fn new(source: S, display: D, settings: MonitorSettings, clock: C) -> Self {
        let now = clock.now();
        Self {
            timer: StallTimer::new(now, settings.stall_timeout),
            source,
            display,
            clock,
            settings,
            failure_streak: 0,
            stats: MonitorStats::default(),
            started: now,
        }
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// 最后一次成功读帧（或上次告警）的时间
    pub fn last_ok(&self) -> Instant {
        self.timer.last_ok()
    }

    /// 执行一轮循环
    pub fn step(&mut self) -> Result<Step> {
        let frame = self.source.read();
        let poll = if frame.is_some() { Poll::Frame } else { Poll::Empty };
        let (timer, action) = decide(self.timer, poll, self.clock.now());
        self.timer = timer;

        let Some(frame) = frame else {
            self.stats.failed_reads += 1;
            self.failure_streak = self.failure_streak.saturating_add(1);

            if let Action::WarnStalled { silent_for } = action {
                self.stats.stall_warnings += 1;
                let message = stall_message(self.settings.stall_timeout);
                warn!("{} (silent for {:.1}s)", message, silent_for.as_secs_f64());
                self.display.notice(&message)?;
            }

            // raw mode 下 Ctrl-C 只以按键形式到达；卡顿期间只响应 Ctrl-C，Esc 仍要等到出帧
            if let Some(Key::Interrupt) = self.display.poll_key(Duration::ZERO)? {
                info!("Interrupted while waiting for frames");
                return Ok(Step::Exit);
            }

            self.clock
                .sleep(self.settings.idle_backoff.delay(self.failure_streak));
            return Ok(Step::Continue);
        };

        if self.failure_streak > 0 {
            debug!("Frames resumed after {} failed reads", self.failure_streak);
            self.failure_streak = 0;
        }
        self.stats.frames_shown += 1;
        self.display.show(&self.settings.window_name, frame)?;

        match self.display.poll_key(self.settings.key_poll)? {
            Some(key) if key.is_exit() => {
                info!("Exit key pressed ({:?})", key);
                Ok(Step::Exit)
            }
            _ => Ok(Step::Continue),
        }
    }

    /// 循环直到退出键，然后释放源并关闭显示
    pub fn run(mut self) -> Result<RunSummary> {
        let result = loop {
            match self.step() {
                Ok(Step::Continue) => {}
                Ok(Step::Exit) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.source.release();
        let closed = self.display.close_all();

        let summary = RunSummary {
            stats: self.stats,
            elapsed: self.clock.now().saturating_duration_since(self.started),
        };
        info!(
            "Stopped after {:.1}s: {} frames, {} failed reads, {} stall warnings",
            summary.elapsed.as_secs_f64(),
            summary.stats.frames_shown,
            summary.stats.failed_reads,
            summary.stats.stall_warnings
        );

        result?;
        closed?;
        Ok(summary)
    }
}
