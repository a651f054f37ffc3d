//! 监控循环测试 - 用脚本化的视频源、记录型显示和手动时钟驱动

use anyhow::{anyhow, Result};
use hls_monitor::{
    run_app, Clock, Display, Frame, IdleBackoff, Key, ManualClock, MonitorConfig, MonitorSettings,
    SourceOpener, Step, StreamMonitor, VideoSource, EXIT_FAILURE, EXIT_OK, EXIT_OPEN_FAILED,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// 所有假对象共享的调用记录
#[derive(Debug, Default)]
struct Calls {
    reads: usize,
    shows: usize,
    key_polls: usize,
    notices: Vec<String>,
    releases: usize,
    closes: usize,
    displays_created: usize,
}

type Shared<T> = Rc<RefCell<T>>;

/// 按脚本返回帧，脚本耗尽后一直读失败
struct ScriptedSource {
    script: Shared<VecDeque<Option<Frame>>>,
    calls: Shared<Calls>,
    clock: ManualClock,
    read_cost: Duration,
    released: bool,
}

impl VideoSource for ScriptedSource {
    fn read(&mut self) -> Option<Frame> {
        self.calls.borrow_mut().reads += 1;
        self.clock.advance(self.read_cost);
        self.script.borrow_mut().pop_front().flatten()
    }

    fn release(&mut self) {
        self.released = true;
        self.calls.borrow_mut().releases += 1;
    }

    fn is_open(&self) -> bool {
        !self.released
    }
}

struct ScriptedOpener {
    source: RefCell<Option<ScriptedSource>>,
}

impl SourceOpener for ScriptedOpener {
    type Source = ScriptedSource;

    fn open(&self, _url: &str) -> Result<ScriptedSource> {
        self.source
            .borrow_mut()
            .take()
            .ok_or_else(|| anyhow!("connection refused"))
    }
}

/// 记录调用，第 `exit_on_frame` 帧时返回 Esc
struct RecordingDisplay {
    calls: Shared<Calls>,
    exit_on_frame: Option<usize>,
    other_key_on_frame: Option<usize>,
    fail_on_frame: Option<usize>,
    /// 每次轮询都返回的按键
    held_key: Option<Key>,
}

impl Display for RecordingDisplay {
    fn show(&mut self, _window: &str, _frame: Frame) -> Result<()> {
        let shows = {
            let mut calls = self.calls.borrow_mut();
            calls.shows += 1;
            calls.shows
        };
        if self.fail_on_frame == Some(shows) {
            return Err(anyhow!("terminal gone"));
        }
        Ok(())
    }

    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<Key>> {
        let shows = {
            let mut calls = self.calls.borrow_mut();
            calls.key_polls += 1;
            calls.shows
        };
        if self.held_key.is_some() {
            return Ok(self.held_key);
        }
        if self.exit_on_frame == Some(shows) {
            return Ok(Some(Key::Escape));
        }
        if self.other_key_on_frame == Some(shows) {
            return Ok(Some(Key::Char('q')));
        }
        Ok(None)
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        self.calls.borrow_mut().notices.push(message.to_string());
        Ok(())
    }

    fn close_all(&mut self) -> Result<()> {
        self.calls.borrow_mut().closes += 1;
        Ok(())
    }
}

struct Harness {
    clock: ManualClock,
    calls: Shared<Calls>,
    script: Shared<VecDeque<Option<Frame>>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            clock: ManualClock::new(),
            calls: Rc::new(RefCell::new(Calls::default())),
            script: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    fn push_frames(&self, n: usize) {
        let mut script = self.script.borrow_mut();
        for _ in 0..n {
            script.push_back(Some(Frame::filled(4, 2, [10, 20, 30])));
        }
    }

    fn source(&self, read_cost: Duration) -> ScriptedSource {
        ScriptedSource {
            script: self.script.clone(),
            calls: self.calls.clone(),
            clock: self.clock.clone(),
            read_cost,
            released: false,
        }
    }

    fn display(&self) -> RecordingDisplay {
        self.calls.borrow_mut().displays_created += 1;
        RecordingDisplay {
            calls: self.calls.clone(),
            exit_on_frame: None,
            other_key_on_frame: None,
            fail_on_frame: None,
            held_key: None,
        }
    }

    fn monitor(&self) -> StreamMonitor<ScriptedSource, RecordingDisplay, ManualClock> {
        self.monitor_with(MonitorSettings::default(), Duration::ZERO)
    }

    fn monitor_with(
        &self,
        settings: MonitorSettings,
        read_cost: Duration,
    ) -> StreamMonitor<ScriptedSource, RecordingDisplay, ManualClock> {
        StreamMonitor::new(self.source(read_cost), self.display(), settings, self.clock.clone())
    }

    /// 一直单步直到虚拟时间达到 `total`
    fn step_until(
        &self,
        monitor: &mut StreamMonitor<ScriptedSource, RecordingDisplay, ManualClock>,
        total: Duration,
    ) {
        while self.clock.elapsed() < total {
            assert_eq!(monitor.step().unwrap(), Step::Continue);
        }
    }
}

#[test]
fn test_short_failure_streak_does_not_warn() {
    // 10 次失败读取，总计约 2 秒
    let h = Harness::new();
    let mut monitor = h.monitor_with(MonitorSettings::default(), Duration::from_millis(180));

    for _ in 0..10 {
        monitor.step().unwrap();
    }

    assert!(h.clock.elapsed() <= Duration::from_secs(2));
    assert_eq!(monitor.stats().failed_reads, 10);
    assert_eq!(monitor.stats().stall_warnings, 0);
    assert!(h.calls.borrow().notices.is_empty());
}

#[test]
fn test_twelve_second_stall_warns_twice() {
    let h = Harness::new();
    let mut monitor = h.monitor();

    h.step_until(&mut monitor, Duration::from_secs(12));

    assert_eq!(monitor.stats().stall_warnings, 2);
    let calls = h.calls.borrow();
    assert_eq!(calls.notices.len(), 2);
    assert_eq!(calls.notices[0], "No frames for 5s. Stream stalled or URL wrong.");
    assert_eq!(calls.shows, 0);
}

#[test]
fn test_warnings_are_periodic_not_continuous() {
    for (secs, expected) in [(3u64, 0u64), (7, 1), (12, 2), (26, 5)] {
        let h = Harness::new();
        let mut monitor = h.monitor();

        h.step_until(&mut monitor, Duration::from_secs(secs));

        assert_eq!(
            monitor.stats().stall_warnings,
            expected,
            "stall of {}s should warn {} times",
            secs,
            expected
        );
    }
}

#[test]
fn test_frame_after_stall_restarts_window() {
    let h = Harness::new();
    let mut monitor = h.monitor();

    h.step_until(&mut monitor, Duration::from_secs(7));
    assert_eq!(monitor.stats().stall_warnings, 1);

    // 恢复出帧
    h.push_frames(1);
    let resumed_at = h.clock.now();
    assert_eq!(monitor.step().unwrap(), Step::Continue);
    assert_eq!(monitor.last_ok(), resumed_at);
    assert_eq!(h.calls.borrow().shows, 1);

    // 再失败 5 秒内不告警
    while h.clock.now() - resumed_at < Duration::from_secs(5) {
        monitor.step().unwrap();
    }
    monitor.step().unwrap(); // 恰好 5 秒，不算超过
    assert_eq!(monitor.stats().stall_warnings, 1);

    monitor.step().unwrap();
    assert_eq!(monitor.stats().stall_warnings, 2);
}

#[test]
fn test_escape_on_fiftieth_frame_stops_and_cleans_up_once() {
    let h = Harness::new();
    h.push_frames(60);
    let mut display = h.display();
    display.exit_on_frame = Some(50);
    let monitor = StreamMonitor::new(
        h.source(Duration::ZERO),
        display,
        MonitorSettings::default(),
        h.clock.clone(),
    );

    let summary = monitor.run().unwrap();

    assert_eq!(summary.stats.frames_shown, 50);
    let calls = h.calls.borrow();
    assert_eq!(calls.shows, 50);
    // 按 Esc 后不再读下一帧
    assert_eq!(calls.reads, 50);
    assert_eq!(calls.releases, 1);
    assert_eq!(calls.closes, 1);
}

#[test]
fn test_non_exit_key_keeps_running() {
    let h = Harness::new();
    h.push_frames(3);
    let mut display = h.display();
    display.other_key_on_frame = Some(1);
    display.exit_on_frame = Some(3);
    let monitor = StreamMonitor::new(
        h.source(Duration::ZERO),
        display,
        MonitorSettings::default(),
        h.clock.clone(),
    );

    let summary = monitor.run().unwrap();
    assert_eq!(summary.stats.frames_shown, 3);
}

#[test]
fn test_exponential_idle_backoff_grows_and_resets() {
    let h = Harness::new();
    let settings = MonitorSettings {
        idle_backoff: IdleBackoff::Exponential { initial_ms: 20, max_ms: 100 },
        ..MonitorSettings::default()
    };
    let mut monitor = h.monitor_with(settings, Duration::ZERO);

    for _ in 0..4 {
        monitor.step().unwrap();
    }
    assert_eq!(h.clock.elapsed(), Duration::from_millis(20 + 40 + 80 + 100));

    // 成功读帧后回到初始间隔
    h.push_frames(1);
    monitor.step().unwrap();
    let before = h.clock.elapsed();
    monitor.step().unwrap();
    assert_eq!(h.clock.elapsed() - before, Duration::from_millis(20));
}

#[test]
fn test_open_failure_exits_with_one_and_never_loops() {
    let h = Harness::new();
    let opener = ScriptedOpener { source: RefCell::new(None) };
    let mut console = Vec::new();

    let code = run_app(
        &MonitorConfig::default(),
        &opener,
        || Ok(h.display()),
        h.clock.clone(),
        &mut console,
    );

    assert_eq!(code, EXIT_OPEN_FAILED);
    let output = String::from_utf8(console).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Failed to open HLS stream.");
    assert!(lines[1].starts_with("Tip:"));

    let calls = h.calls.borrow();
    assert_eq!(calls.displays_created, 0);
    assert_eq!(calls.reads, 0);
    assert_eq!(calls.closes, 0);
}

#[test]
fn test_run_app_exits_zero_on_escape() {
    let h = Harness::new();
    h.push_frames(5);
    let opener = ScriptedOpener {
        source: RefCell::new(Some(h.source(Duration::ZERO))),
    };
    let mut console = Vec::new();

    let code = run_app(
        &MonitorConfig::default(),
        &opener,
        || {
            let mut display = h.display();
            display.exit_on_frame = Some(2);
            Ok(display)
        },
        h.clock.clone(),
        &mut console,
    );

    assert_eq!(code, EXIT_OK);
    assert!(console.is_empty());
    let calls = h.calls.borrow();
    assert_eq!(calls.shows, 2);
    assert_eq!(calls.releases, 1);
    assert_eq!(calls.closes, 1);
}

#[test]
fn test_display_creation_failure_releases_source() {
    let h = Harness::new();
    let opener = ScriptedOpener {
        source: RefCell::new(Some(h.source(Duration::ZERO))),
    };
    let mut console = Vec::new();

    let code = run_app(
        &MonitorConfig::default(),
        &opener,
        || -> Result<RecordingDisplay> { Err(anyhow!("not a terminal")) },
        h.clock.clone(),
        &mut console,
    );

    assert_eq!(code, EXIT_FAILURE);
    assert!(String::from_utf8(console).unwrap().contains("not a terminal"));
    let calls = h.calls.borrow();
    assert_eq!(calls.releases, 1);
    assert_eq!(calls.reads, 0);
}

#[test]
fn test_display_error_still_cleans_up() {
    let h = Harness::new();
    h.push_frames(5);
    let mut display = h.display();
    display.fail_on_frame = Some(3);
    let monitor = StreamMonitor::new(
        h.source(Duration::ZERO),
        display,
        MonitorSettings::default(),
        h.clock.clone(),
    );

    assert!(monitor.run().is_err());
    let calls = h.calls.borrow();
    assert_eq!(calls.shows, 3);
    assert_eq!(calls.releases, 1);
    assert_eq!(calls.closes, 1);
}

#[test]
fn test_ctrl_c_exits_during_endless_stall() {
    let h = Harness::new();
    let mut display = h.display();
    display.held_key = Some(Key::Interrupt);
    let monitor = StreamMonitor::new(
        h.source(Duration::ZERO),
        display,
        MonitorSettings::default(),
        h.clock.clone(),
    );

    // 源永远读不到帧，Ctrl-C 仍然能结束循环
    let summary = monitor.run().unwrap();

    assert_eq!(summary.stats.frames_shown, 0);
    assert_eq!(summary.stats.failed_reads, 1);
    let calls = h.calls.borrow();
    assert_eq!(calls.key_polls, 1);
    assert_eq!(calls.releases, 1);
    assert_eq!(calls.closes, 1);
}

#[test]
fn test_escape_is_ignored_while_stalled() {
    let h = Harness::new();
    let mut display = h.display();
    display.held_key = Some(Key::Escape);
    let mut monitor = StreamMonitor::new(
        h.source(Duration::ZERO),
        display,
        MonitorSettings::default(),
        h.clock.clone(),
    );

    h.step_until(&mut monitor, Duration::from_secs(6));
    assert_eq!(monitor.stats().stall_warnings, 1);
    assert!(h.calls.borrow().key_polls > 0);

    // 出帧后 Esc 生效
    h.push_frames(1);
    assert_eq!(monitor.step().unwrap(), Step::Exit);
}
