//! HLS Monitor - 在终端中观看 HLS 视频流并报告卡顿

pub mod app;
pub mod backoff;
pub mod clock;
pub mod config;
pub mod display;
pub mod frame;
pub mod monitor;
pub mod source;
pub mod stall;

pub use app::{run_app, EXIT_FAILURE, EXIT_OK, EXIT_OPEN_FAILED};
pub use backoff::IdleBackoff;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MonitorConfig;
pub use display::{Display, HeadlessDisplay, Key, TerminalDisplay};
pub use frame::Frame;
pub use monitor::{MonitorSettings, MonitorStats, RunSummary, StartupError, Step, StreamMonitor};
pub use source::{FfmpegOpener, FfmpegSource, SourceOpener, VideoSource};
pub use stall::{decide, Action, Poll, StallTimer};
