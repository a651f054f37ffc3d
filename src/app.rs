//! 应用入口 - 打开流、创建显示、运行监控，返回进程退出码

use anyhow::Result;
use std::io::Write;
use tracing::error;

use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::display::Display;
use crate::monitor::{MonitorSettings, StartupError, StreamMonitor};
use crate::source::SourceOpener;

/// 正常退出
pub const EXIT_OK: i32 = 0;
/// 无法打开流
pub const EXIT_OPEN_FAILED: i32 = 1;
/// 配置、显示或运行时错误
pub const EXIT_FAILURE: i32 = 2;

pub const OPEN_FAILED_MESSAGE: &str = "Failed to open HLS stream.";
pub const OPEN_FAILED_HINT: &str =
    "Tip: check that ffmpeg/ffprobe are installed and the URL plays with `ffprobe <url>`.";

/// 运行一次监控会话。
///
/// 致命错误的提示写到 `console`，日志走 tracing。
pub fn run_app<O, D, F, C>(
    config: &MonitorConfig,
    opener: &O,
    make_display: F,
    clock: C,
    console: &mut dyn Write,
) -> i32
where
    O: SourceOpener,
    D: Display,
    F: FnOnce() -> Result<D>,
    C: Clock,
{
    let settings = MonitorSettings::from_config(config);
    let monitor = match StreamMonitor::initialize(opener, &config.url, make_display, settings, clock) {
        Ok(monitor) => monitor,
        Err(StartupError::Open(e)) => {
            error!("Cannot open {}: {:#}", config.url, e);
            let _ = writeln!(console, "{}", OPEN_FAILED_MESSAGE);
            let _ = writeln!(console, "{}", OPEN_FAILED_HINT);
            return EXIT_OPEN_FAILED;
        }
        Err(e @ StartupError::Display(_)) => {
            let _ = writeln!(console, "❌ {}", e);
            return EXIT_FAILURE;
        }
    };

    match monitor.run() {
        Ok(_) => EXIT_OK,
        Err(e) => {
            let _ = writeln!(console, "❌ Monitor stopped: {:#}", e);
            EXIT_FAILURE
        }
    }
}
