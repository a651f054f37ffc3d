//! HLS Monitor CLI
//!
//! 打开配置的 HLS 流并在终端中显示，Esc 退出

use anyhow::Context;
use clap::Parser;
use hls_monitor::{
    run_app, FfmpegOpener, HeadlessDisplay, MonitorConfig, SystemClock, TerminalDisplay,
    EXIT_FAILURE,
};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "hlsmon")]
#[command(about = "HLS Monitor - 在终端中观看 HLS 视频流，无帧超时告警")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/hls-monitor/config.json）
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// 不打开终端画面，只记录日志（用 Ctrl-C 结束）
    #[arg(long)]
    headless: bool,
    /// 输出调试日志
    #[arg(long, short)]
    verbose: bool,
    /// 日志文件（终端画面模式默认 <cache_dir>/hls-monitor/hlsmon.log，--headless 默认 stderr）
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // 初始化 tracing 日志系统
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("hls_monitor={0},hlsmon={0}", default_level))
    });

    let log_file = MonitorConfig::resolve_log_file(cli.log_file.as_deref(), cli.headless);
    match log_file.as_deref().map(open_log_file) {
        Some(Ok(file)) => fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .init(),
        Some(Err(e)) => {
            eprintln!("❌ 无法创建日志文件: {:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
        None => fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .init(),
    }

    let config = match MonitorConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ 加载配置失败: {:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    let opener = FfmpegOpener::from_config(&config);
    let mut stderr = std::io::stderr();
    let code = if cli.headless {
        run_app(&config, &opener, || Ok(HeadlessDisplay::new()), SystemClock, &mut stderr)
    } else {
        let window = config.window_name.clone();
        run_app(
            &config,
            &opener,
            move || TerminalDisplay::new(&window),
            SystemClock,
            &mut stderr,
        )
    };

    std::process::exit(code);
}

/// 打开（追加）日志文件，必要时创建目录
fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open {}", path.display()))
}
