//! ffmpeg 视频源 - ffprobe 探测流，ffmpeg 解码为 rgb24 写到 stdout 管道

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::frame::Frame;
use crate::source::{SourceOpener, VideoSource};

/// 解码帧队列深度
const FRAME_QUEUE_DEPTH: usize = 2;
/// ffprobe 网络读写超时（微秒）
const FFPROBE_RW_TIMEOUT_US: u64 = 10_000_000;

/// 视频尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

impl VideoSize {
    /// 按目标宽度等比缩放，只缩小不放大，结果宽高为偶数
    pub fn scaled_to(self, target_width: Option<u32>) -> VideoSize {
        let Some(target) = target_width else {
            return self;
        };
        if target >= self.width {
            return self;
        }
        let height = (self.height as u64 * target as u64 + self.width as u64 / 2) / self.width as u64;
        VideoSize {
            width: even(target),
            height: even(height as u32),
        }
    }
}

fn even(n: u32) -> u32 {
    (n & !1).max(2)
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// 解析 `ffprobe -of json -show_entries stream=width,height` 的输出
pub fn parse_ffprobe_output(json: &str) -> Result<VideoSize> {
    let output: FfprobeOutput = serde_json::from_str(json).context("Invalid ffprobe output")?;
    output
        .streams
        .iter()
        .find_map(|s| match (s.width, s.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(VideoSize { width: w, height: h }),
            _ => None,
        })
        .ok_or_else(|| anyhow!("No video stream found"))
}

/// 基于 ffmpeg 命令行的打开器
#[derive(Debug, Clone)]
pub struct FfmpegOpener {
    ffmpeg_path: Option<PathBuf>,
    ffprobe_path: Option<PathBuf>,
    scale_width: Option<u32>,
    read_timeout: Duration,
}

impl FfmpegOpener {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            scale_width: config.scale_width,
            read_timeout: config.read_timeout(),
        }
    }

    fn probe(&self, ffprobe: &Path, url: &str) -> Result<VideoSize> {
        let rw_timeout = FFPROBE_RW_TIMEOUT_US.to_string();
        let output = Command::new(ffprobe)
            .args([
                "-v",
                "error",
                "-rw_timeout",
                &rw_timeout,
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "json",
                url,
            ])
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {}", ffprobe.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffprobe could not open {}: {}", url, stderr.trim());
        }

        parse_ffprobe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

impl SourceOpener for FfmpegOpener {
    type Source = FfmpegSource;

    fn open(&self, url: &str) -> Result<FfmpegSource> {
        let ffprobe = resolve_tool(self.ffprobe_path.as_deref(), "ffprobe")?;
        let ffmpeg = resolve_tool(self.ffmpeg_path.as_deref(), "ffmpeg")?;

        let native = self.probe(&ffprobe, url)?;
        let size = native.scaled_to(self.scale_width);
        info!(
            "Stream {} is {}x{}, decoding at {}x{}",
            url, native.width, native.height, size.width, size.height
        );

        FfmpegSource::spawn(&ffmpeg, url, size, self.read_timeout)
    }
}

/// 显式路径优先，否则在 PATH 中查找
fn resolve_tool(explicit: Option<&Path>, name: &str) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => bail!("{} not found at {}", name, path.display()),
        None => which::which(name).with_context(|| format!("{} not found in PATH", name)),
    }
}

/// ffmpeg 子进程视频源
pub struct FfmpegSource {
    child: Child,
    frames: Option<Receiver<Frame>>,
    reader: Option<JoinHandle<()>>,
    stderr_drain: Option<JoinHandle<()>>,
    size: VideoSize,
    read_timeout: Duration,
    exhausted: bool,
    released: bool,
}

impl FfmpegSource {
    fn spawn(ffmpeg: &Path, url: &str, size: VideoSize, read_timeout: Duration) -> Result<Self> {
        let scale = format!("scale={}:{}", size.width, size.height);
        let mut command = Command::new(ffmpeg);
        command.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-i",
            url,
            "-an",
            "-sn",
            "-vf",
            &scale,
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "pipe:1",
        ]);
        Self::from_command(command, size, read_timeout)
            .with_context(|| format!("Failed to start {}", ffmpeg.display()))
    }

    /// 启动任意按 `size` 输出 rgb24 帧到 stdout 的命令
    fn from_command(mut command: Command, size: VideoSize, read_timeout: Duration) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("ffmpeg stdout not captured"))?;
        let (tx, rx) = mpsc::sync_channel(FRAME_QUEUE_DEPTH);
        let reader = thread::Builder::new()
            .name("ffmpeg-reader".to_string())
            .spawn(move || read_frames(stdout, size, tx))
            .context("Failed to start frame reader")?;

        let stderr_drain = match child.stderr.take() {
            Some(stderr) => Some(
                thread::Builder::new()
                    .name("ffmpeg-stderr".to_string())
                    .spawn(move || {
                        for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                            debug!("ffmpeg: {}", line);
                        }
                    })
                    .context("Failed to start ffmpeg log drain")?,
            ),
            None => None,
        };

        debug!("ffmpeg started (pid {})", child.id());

        Ok(Self {
            child,
            frames: Some(rx),
            reader: Some(reader),
            stderr_drain,
            size,
            read_timeout,
            exhausted: false,
            released: false,
        })
    }

    pub fn size(&self) -> VideoSize {
        self.size
    }
}

/// 从管道读取定长帧，直到 EOF 或接收端关闭
fn read_frames(mut stdout: ChildStdout, size: VideoSize, tx: SyncSender<Frame>) {
    let len = Frame::byte_len(size.width, size.height);
    loop {
        let mut buf = vec![0u8; len];
        if let Err(e) = stdout.read_exact(&mut buf) {
            debug!("ffmpeg output closed: {}", e);
            return;
        }
        let frame = match Frame::new(size.width, size.height, buf) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                continue;
            }
        };
        if tx.send(frame).is_err() {
            return;
        }
    }
}

impl VideoSource for FfmpegSource {
    fn read(&mut self) -> Option<Frame> {
        let frames = self.frames.as_ref()?;
        match frames.recv_timeout(self.read_timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                if !self.exhausted {
                    self.exhausted = true;
                    warn!("ffmpeg stopped producing frames");
                }
                None
            }
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        // 先关闭接收端，阻塞在 send 上的 reader 才能退出
        self.frames = None;
        let _ = self.child.kill();
        match self.child.wait() {
            Ok(status) => debug!("ffmpeg exited: {}", status),
            Err(e) => warn!("Failed to wait for ffmpeg: {}", e),
        }
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }

    fn is_open(&self) -> bool {
        !self.released
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.release();
    }
}
