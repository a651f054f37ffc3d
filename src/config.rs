//! 配置模块 - 流地址、计时参数和 ffmpeg 选项
//!
//! 配置文件为 JSON，所有字段都可省略：
//! 1. `--config <path>` 指定的文件（必须存在）
//! 2. `<config_dir>/hls-monitor/config.json`（存在时读取）
//! 3. 内置默认值

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::backoff::IdleBackoff;

/// 默认 HLS 地址（需要时修改配置文件中的 `url`）
pub const DEFAULT_URL: &str = "http://10.172.11.100:8080/live/dji.m3u8";
/// 默认窗口名
pub const DEFAULT_WINDOW_NAME: &str = "HLS Stream";
/// 无帧多久算卡顿（毫秒）
pub const DEFAULT_STALL_TIMEOUT_MS: u64 = 5000;
/// 按键轮询等待（毫秒）
pub const DEFAULT_KEY_POLL_MS: u64 = 1;
/// 单次读帧最长等待（毫秒）
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;
/// 解码输出宽度，高度按比例计算
pub const DEFAULT_SCALE_WIDTH: u32 = 640;

/// 监控配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// HLS 播放列表地址
    pub url: String,
    /// 显示窗口名
    pub window_name: String,
    pub stall_timeout_ms: u64,
    pub key_poll_ms: u64,
    /// 读帧失败后的等待策略
    pub idle_backoff: IdleBackoff,
    pub read_timeout_ms: u64,
    /// `None` 保持原始分辨率
    pub scale_width: Option<u32>,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            window_name: DEFAULT_WINDOW_NAME.to_string(),
            stall_timeout_ms: DEFAULT_STALL_TIMEOUT_MS,
            key_poll_ms: DEFAULT_KEY_POLL_MS,
            idle_backoff: IdleBackoff::default(),
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            scale_width: Some(DEFAULT_SCALE_WIDTH),
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

impl MonitorConfig {
    /// 加载配置：显式路径 > 默认路径 > 内置默认值
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// 从 JSON 文件读取
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        let config = Self::from_json(&content)
            .with_context(|| format!("Cannot parse config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 默认配置文件路径 `<config_dir>/hls-monitor/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hls-monitor").join("config.json"))
    }

    /// 默认日志文件 `<cache_dir>/hls-monitor/hlsmon.log`
    pub fn default_log_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|d| d.join("hls-monitor").join("hlsmon.log"))
    }

    /// 日志去向：显式路径优先；终端画面模式默认写日志文件，无界面模式返回 `None`（写 stderr）
    pub fn resolve_log_file(explicit: Option<&Path>, headless: bool) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None if headless => None,
            None => Self::default_log_path(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            anyhow::bail!("url must not be empty");
        }
        if self.stall_timeout_ms == 0 {
            anyhow::bail!("stall_timeout_ms must be greater than 0");
        }
        if self.scale_width == Some(0) {
            anyhow::bail!("scale_width must be greater than 0");
        }
        Ok(())
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    pub fn key_poll(&self) -> Duration {
        Duration::from_millis(self.key_poll_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
