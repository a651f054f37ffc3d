//! 显示模块 - 展示帧、轮询按键、关闭窗口

mod headless;
mod terminal;
mod ui;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

use crate::frame::Frame;

pub use headless::HeadlessDisplay;
pub use terminal::TerminalDisplay;
pub use ui::{render, FrameWidget, StatusLine, SurfaceView};

/// 按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    /// Ctrl-C（raw mode 下不会产生 SIGINT）
    Interrupt,
    Char(char),
    Other,
}

impl Key {
    /// 是否为退出键
    pub fn is_exit(&self) -> bool {
        matches!(self, Key::Escape | Key::Interrupt)
    }
}

impl From<KeyEvent> for Key {
    fn from(key: KeyEvent) -> Self {
        match key.code {
            KeyCode::Esc => Key::Escape,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Key::Interrupt,
            KeyCode::Char(c) => Key::Char(c),
            _ => Key::Other,
        }
    }
}

/// 显示表面
pub trait Display {
    /// 在名为 `window` 的表面上显示一帧，帧的所有权交给显示端
    fn show(&mut self, window: &str, frame: Frame) -> Result<()>;

    /// 最多等待 `timeout`，返回期间按下的键
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>>;

    /// 显示一条提示（如卡顿告警）
    fn notice(&mut self, message: &str) -> Result<()>;

    /// 关闭所有表面，重复调用无副作用
    fn close_all(&mut self) -> Result<()>;
}
