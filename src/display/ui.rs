//! 终端渲染 - 半块字符画帧，底部状态栏

use chrono::{DateTime, Local};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use crate::frame::Frame as VideoFrame;

/// 上半块字符：前景色为上方像素，背景色为下方像素
const UPPER_HALF_BLOCK: &str = "▀";

/// 状态栏内容
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    pub frames: u64,
    pub last_frame_at: Option<DateTime<Local>>,
    pub notice: Option<String>,
}

/// 一次渲染需要的全部数据
pub struct SurfaceView<'a> {
    pub window: &'a str,
    pub frame: Option<&'a VideoFrame>,
    pub status: &'a StatusLine,
}

/// 渲染整个表面
pub fn render(f: &mut Frame, view: &SurfaceView<'_>) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // 画面
            Constraint::Length(1), // 状态栏
        ])
        .split(f.area());

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", view.window));
    let inner = block.inner(vertical[0]);
    f.render_widget(block, vertical[0]);

    match view.frame {
        Some(frame) => f.render_widget(FrameWidget::new(frame), inner),
        None => {
            let waiting = Paragraph::new("Waiting for frames...")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            f.render_widget(waiting, inner);
        }
    }

    f.render_widget(status_bar(view.status), vertical[1]);
}

fn status_bar(status: &StatusLine) -> Paragraph<'static> {
    let last = status
        .last_frame_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut spans = vec![Span::raw(format!(
        " Frames: {} │ Last frame: {} │ Esc 退出",
        status.frames, last
    ))];
    if let Some(ref notice) = status.notice {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }
    Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Blue).fg(Color::White))
}

/// 把视频帧按比例缩放进区域，每个字符格表示上下两个像素
pub struct FrameWidget<'a> {
    frame: &'a VideoFrame,
}

impl<'a> FrameWidget<'a> {
    pub fn new(frame: &'a VideoFrame) -> Self {
        Self { frame }
    }

    /// 区域内保持宽高比的像素尺寸 (宽, 高)
    fn fit(&self, area: Rect) -> (u32, u32) {
        let fw = self.frame.width() as u64;
        let fh = self.frame.height() as u64;
        let cols = area.width as u64;
        let rows = area.height as u64 * 2;
        if fw == 0 || fh == 0 || cols == 0 || rows == 0 {
            return (0, 0);
        }
        if fw * rows <= fh * cols {
            ((fw * rows / fh) as u32, rows as u32)
        } else {
            (cols as u32, (fh * cols / fw) as u32)
        }
    }
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (tw, th) = self.fit(area);
        if tw == 0 || th == 0 {
            return;
        }
        let x0 = area.x + (area.width - tw as u16) / 2;
        let y0 = area.y + ((area.height * 2 - th as u16) / 2) / 2;

        for row in 0..th.div_ceil(2) {
            for col in 0..tw {
                let top = self.frame.sample(col, row * 2, tw, th);
                let bottom = self.frame.sample(col, row * 2 + 1, tw, th);
                if let Some(cell) = buf.cell_mut((x0 + col as u16, y0 + row as u16)) {
                    cell.set_symbol(UPPER_HALF_BLOCK)
                        .set_fg(to_color(top))
                        .set_bg(to_color(bottom));
                }
            }
        }
    }
}

fn to_color(rgb: Option<[u8; 3]>) -> Color {
    match rgb {
        Some([r, g, b]) => Color::Rgb(r, g, b),
        None => Color::Reset,
    }
}
