//! 视频源模块 - 打开流、逐帧读取、释放

pub mod ffmpeg;

use anyhow::Result;

use crate::frame::Frame;

pub use ffmpeg::{FfmpegOpener, FfmpegSource, VideoSize};

/// 已打开的视频源
pub trait VideoSource {
    /// 读下一帧。失败或暂时没有帧时返回 `None`，不视为错误。
    fn read(&mut self) -> Option<Frame>;

    /// 释放底层连接，重复调用无副作用
    fn release(&mut self);

    fn is_open(&self) -> bool;
}

/// 按 URL 打开视频源
pub trait SourceOpener {
    type Source: VideoSource;

    fn open(&self, url: &str) -> Result<Self::Source>;
}
