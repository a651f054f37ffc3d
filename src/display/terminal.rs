//! 终端显示 - ratatui + crossterm，备用屏幕 + raw mode

use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tracing::{debug, warn};

use crate::display::ui::{render, StatusLine, SurfaceView};
use crate::display::{Display, Key};
use crate::frame::Frame;

/// 在当前终端中显示视频
pub struct TerminalDisplay {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    window: String,
    /// 最近一帧，仅用于重绘
    last_frame: Option<Frame>,
    status: StatusLine,
    closed: bool,
}

impl TerminalDisplay {
    /// 进入 raw mode 和备用屏幕
    pub fn new(window: &str) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        debug!("Terminal display opened");

        Ok(Self {
            terminal,
            window: window.to_string(),
            last_frame: None,
            status: StatusLine::default(),
            closed: false,
        })
    }

    fn draw(&mut self) -> Result<()> {
        let Self { terminal, window, last_frame, status, .. } = self;
        let view = SurfaceView {
            window: window.as_str(),
            frame: last_frame.as_ref(),
            status: &*status,
        };
        terminal.draw(|f| render(f, &view))?;
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Display for TerminalDisplay {
    fn show(&mut self, window: &str, frame: Frame) -> Result<()> {
        if self.window != window {
            self.window = window.to_string();
        }
        self.last_frame = Some(frame);
        self.status.frames += 1;
        self.status.last_frame_at = Some(Local::now());
        self.status.notice = None;
        self.draw()
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(Key::from(key)));
                }
            }
        }
        Ok(None)
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.status.notice = Some(message.to_string());
        self.draw()
    }

    fn close_all(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.last_frame = None;
        self.restore()?;
        debug!("Terminal display closed after {} frames", self.status.frames);
        Ok(())
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.restore() {
                warn!("Failed to restore terminal: {}", e);
            }
        }
    }
}
