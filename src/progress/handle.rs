//! Bar handles: the four acquisition-time variants and their mode selection.
//!
//! A handle owns one topic for its lifetime. The Active and Spinner variants
//! drive a background poller thread that feeds the shared [`Tracker`]; the
//! Debug variant logs one line per assignment; the Null variant does nothing.
//! The variant is chosen once, at acquisition, and never changes.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::ProgressSettings;
use crate::progress::render::fmt_value;
use crate::progress::tracker::Tracker;

/// Poller wake interval: the live display refreshes at least this often.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const POLL_SECS: f64 = 0.1;

/// Which handle variant the mode selector picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarMode {
    Active,
    Debug,
    Null,
}

impl BarMode {
    /// Pure selection from configuration flags and stream eligibility.
    pub fn select(settings: &ProgressSettings, live_eligible: bool) -> Self {
        if settings.debug {
            Self::Debug
        } else if settings.quiet || settings.verbose_debug || settings.disable || !live_eligible {
            Self::Null
        } else {
            Self::Active
        }
    }
}

/// A scoped progress reporter for one topic.
///
/// ```no_run
/// use progline::{Bar, ProgressSettings, Tracker};
///
/// let tracker = Tracker::stderr(ProgressSettings::default());
/// let mut bar = Bar::new(&tracker, "scanning", "files", Some(1200));
/// for n in 0..1200u64 {
///     bar.set_value(n as f64);
/// }
/// drop(bar); // joins the poller, nothing prints after this
/// ```
pub enum Bar {
    Active(LiveBar),
    Spinner(LiveBar),
    Debug(DebugBar),
    Null(NullBar),
}

impl Bar {
    /// Acquire a handle for one topic. The variant is fixed here.
    pub fn new(
        tracker: &Arc<Tracker>,
        topic: impl Into<String>,
        unit: impl Into<String>,
        total: Option<u64>,
    ) -> Self {
        let topic = topic.into();
        let unit = unit.into();
        match BarMode::select(tracker.settings(), tracker.should_print()) {
            BarMode::Debug => Self::Debug(DebugBar::new(tracker.clone(), topic, unit, total)),
            BarMode::Null => Self::Null(NullBar::new(topic, unit, total)),
            BarMode::Active => Self::Active(LiveBar::start(
                tracker.clone(),
                topic,
                unit,
                total,
                LiveKind::Counter,
            )),
        }
    }

    /// Acquire a spinner: elapsed seconds stand in for the counter, for
    /// operations with nothing to count through.
    pub fn spinner(tracker: &Arc<Tracker>, topic: impl Into<String>) -> Self {
        let topic = topic.into();
        match BarMode::select(tracker.settings(), tracker.should_print()) {
            BarMode::Debug => {
                Self::Debug(DebugBar::new(tracker.clone(), topic, String::new(), None))
            }
            BarMode::Null => Self::Null(NullBar::new(topic, String::new(), None)),
            BarMode::Active => Self::Spinner(LiveBar::start(
                tracker.clone(),
                topic,
                "s".to_string(),
                None,
                LiveKind::Clock,
            )),
        }
    }

    /// Record the current position.
    pub fn set_value(&mut self, pos: f64) {
        match self {
            Self::Active(bar) | Self::Spinner(bar) => bar.set_value(pos, String::new()),
            Self::Debug(bar) => bar.set_value(pos, ""),
            Self::Null(_) => {}
        }
    }

    /// Record the current position together with the item being processed.
    pub fn set_value_with_item(&mut self, pos: f64, item: impl Into<String>) {
        let item = item.into();
        match self {
            Self::Active(bar) | Self::Spinner(bar) => bar.set_value(pos, item),
            Self::Debug(bar) => bar.set_value(pos, &item),
            Self::Null(_) => {}
        }
    }

    /// Reuse the handle for a new topic without a fresh acquisition. The old
    /// topic is deactivated first.
    pub fn reset(
        &mut self,
        topic: impl Into<String>,
        unit: impl Into<String>,
        total: Option<u64>,
    ) {
        let topic = topic.into();
        let unit = unit.into();
        match self {
            Self::Active(bar) | Self::Spinner(bar) => bar.reset(topic, unit, total),
            Self::Debug(bar) => bar.reset(topic, unit, total),
            Self::Null(bar) => bar.reset(topic, unit, total),
        }
    }

    /// Release the handle. Idempotent; dropping the handle does the same.
    /// For the live variants this deactivates the topic and joins the
    /// poller, so no output happens on the handle's behalf afterwards.
    pub fn close(&mut self) {
        match self {
            Self::Active(bar) | Self::Spinner(bar) => bar.close(),
            Self::Debug(bar) => bar.close(),
            Self::Null(_) => {}
        }
    }

    /// Topic currently owned by this handle.
    pub fn topic(&self) -> String {
        match self {
            Self::Active(bar) | Self::Spinner(bar) => bar.topic(),
            Self::Debug(bar) => bar.topic.clone(),
            Self::Null(bar) => bar.topic.clone(),
        }
    }

    pub fn unit(&self) -> String {
        match self {
            Self::Active(bar) | Self::Spinner(bar) => {
                bar.shared.state.lock().expect("bar state mutex poisoned").unit.clone()
            }
            Self::Debug(bar) => bar.unit.clone(),
            Self::Null(bar) => bar.unit.clone(),
        }
    }

    pub fn total(&self) -> Option<u64> {
        match self {
            Self::Active(bar) | Self::Spinner(bar) => {
                bar.shared.state.lock().expect("bar state mutex poisoned").total
            }
            Self::Debug(bar) => bar.total,
            Self::Null(bar) => bar.total,
        }
    }
}

/// Whether a live poller forwards the caller's counter or its own clock.
#[derive(Debug, Clone, Copy)]
enum LiveKind {
    Counter,
    Clock,
}

struct LiveState {
    topic: String,
    unit: String,
    total: Option<u64>,
    value: (f64, String),
    pushed: Option<(f64, String)>,
    clock: f64,
    running: bool,
}

struct LiveShared {
    tracker: Arc<Tracker>,
    state: Mutex<LiveState>,
    cond: Condvar,
}

/// Live display over a background poller thread.
pub struct LiveBar {
    shared: Arc<LiveShared>,
    poller: Option<thread::JoinHandle<()>>,
}

impl LiveBar {
    fn start(
        tracker: Arc<Tracker>,
        topic: String,
        unit: String,
        total: Option<u64>,
        kind: LiveKind,
    ) -> Self {
        let shared = Arc::new(LiveShared {
            tracker,
            state: Mutex::new(LiveState {
                topic,
                unit,
                total,
                value: (0.0, String::new()),
                pushed: None,
                clock: 0.0,
                running: true,
            }),
            cond: Condvar::new(),
        });
        let worker = shared.clone();
        let poller = thread::spawn(move || poll_loop(&worker, kind));
        Self {
            shared,
            poller: Some(poller),
        }
    }

    fn set_value(&self, pos: f64, item: String) {
        let mut state = self.shared.state.lock().expect("bar state mutex poisoned");
        state.value = (pos, item);
        self.shared.cond.notify_all();
    }

    fn reset(&self, topic: String, unit: String, total: Option<u64>) {
        let mut state = self.shared.state.lock().expect("bar state mutex poisoned");
        let old = state.topic.clone();
        if let Err(e) = self.shared.tracker.update(&old, None, "", "", None) {
            tracing::warn!(target: "progress", "failed to deactivate topic {old}: {e}");
        }
        state.topic = topic;
        state.unit = unit;
        state.total = total;
        state.value = (0.0, String::new());
        state.pushed = None;
        state.clock = 0.0;
    }

    fn topic(&self) -> String {
        self.shared
            .state
            .lock()
            .expect("bar state mutex poisoned")
            .topic
            .clone()
    }

    /// Stop the poller and wait for it. The running-flag transition happens
    /// under the condition variable's mutex, so the poller observes it on
    /// its next wake and the join cannot hang.
    fn close(&mut self) {
        let Some(poller) = self.poller.take() else {
            return;
        };
        {
            let mut state = self.shared.state.lock().expect("bar state mutex poisoned");
            state.running = false;
            self.shared.cond.notify_all();
        }
        let _ = poller.join();
    }
}

impl Drop for LiveBar {
    fn drop(&mut self) {
        self.close();
    }
}

fn poll_loop(shared: &LiveShared, kind: LiveKind) {
    let mut state = shared.state.lock().expect("bar state mutex poisoned");
    while state.running {
        let (next, _timeout) = shared
            .cond
            .wait_timeout(state, POLL_INTERVAL)
            .expect("bar state mutex poisoned");
        state = next;
        if !state.running {
            break;
        }
        let push = match kind {
            LiveKind::Counter => {
                if state.pushed.as_ref() != Some(&state.value) {
                    let value = state.value.clone();
                    state.pushed = Some(value.clone());
                    Some((value.0, value.1, state.unit.clone(), state.total))
                } else {
                    None
                }
            }
            LiveKind::Clock => {
                // time itself is the counter
                state.clock += POLL_SECS;
                Some((state.clock, String::new(), state.unit.clone(), None))
            }
        };
        if let Some((pos, item, unit, total)) = push {
            let topic = state.topic.clone();
            if let Err(e) = shared.tracker.update(&topic, Some(pos), &item, &unit, total) {
                tracing::warn!(target: "progress", "progress render failed, stopping poller: {e}");
                break;
            }
        }
    }
    // final deactivation while still holding the lock, mirroring the
    // caller-visible guarantee that close() leaves nothing behind
    let topic = state.topic.clone();
    if let Err(e) = shared.tracker.update(&topic, None, "", "", None) {
        tracing::warn!(target: "progress", "failed to deactivate topic {topic}: {e}");
    }
}

/// Synchronous line-per-assignment variant for debug runs.
pub struct DebugBar {
    tracker: Arc<Tracker>,
    topic: String,
    unit: String,
    total: Option<u64>,
    started: bool,
}

impl DebugBar {
    fn new(tracker: Arc<Tracker>, topic: String, unit: String, total: Option<u64>) -> Self {
        Self {
            tracker,
            topic,
            unit,
            total,
            started: false,
        }
    }

    fn set_value(&mut self, pos: f64, item: &str) {
        if !self.started {
            self.started = true;
            self.log_line(&format!("progress: {} (start)\n", self.topic));
        }
        let item = if item.is_empty() {
            String::new()
        } else {
            format!(" {item}")
        };
        let unit = if self.unit.is_empty() {
            String::new()
        } else {
            format!(" {}", self.unit)
        };
        let line = match self.total {
            Some(total) if total > 0 => {
                let pct = 100.0 * pos / total as f64;
                format!(
                    "progress: {}:{item} {}/{total}{unit} ({pct:4.2}%)\n",
                    self.topic,
                    fmt_value(pos)
                )
            }
            _ => format!("progress: {}:{item} {}{unit}\n", self.topic, fmt_value(pos)),
        };
        self.log_line(&line);
    }

    fn reset(&mut self, topic: String, unit: String, total: Option<u64>) {
        if self.started {
            self.log_line(&format!("progress: {} (reset)\n", self.topic));
        }
        self.topic = topic;
        self.unit = unit;
        self.total = total;
        self.started = false;
    }

    fn close(&mut self) {
        if self.started {
            self.started = false;
            self.log_line(&format!("progress: {} (end)\n", self.topic));
        }
    }

    fn log_line(&self, line: &str) {
        if let Err(e) = self.tracker.write_line(line) {
            tracing::warn!(target: "progress", "failed to write debug progress line: {e}");
        }
    }
}

impl Drop for DebugBar {
    fn drop(&mut self) {
        self.close();
    }
}

/// Inert variant for suppressed output.
pub struct NullBar {
    topic: String,
    unit: String,
    total: Option<u64>,
}

impl NullBar {
    fn new(topic: String, unit: String, total: Option<u64>) -> Self {
        Self { topic, unit, total }
    }

    fn reset(&mut self, topic: String, unit: String, total: Option<u64>) {
        self.topic = topic;
        self.unit = unit;
        self.total = total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ProgressSettings {
        ProgressSettings::default()
    }

    #[test]
    fn test_mode_selection_prefers_debug() {
        let config = ProgressSettings {
            debug: true,
            quiet: true,
            ..settings()
        };
        assert_eq!(BarMode::select(&config, true), BarMode::Debug);
        assert_eq!(BarMode::select(&config, false), BarMode::Debug);
    }

    #[test]
    fn test_mode_selection_null_cases() {
        for config in [
            ProgressSettings {
                quiet: true,
                ..settings()
            },
            ProgressSettings {
                verbose_debug: true,
                ..settings()
            },
            ProgressSettings {
                disable: true,
                ..settings()
            },
        ] {
            assert_eq!(BarMode::select(&config, true), BarMode::Null);
        }
        // ineligible stream without any override
        assert_eq!(BarMode::select(&settings(), false), BarMode::Null);
    }

    #[test]
    fn test_mode_selection_active_default() {
        assert_eq!(BarMode::select(&settings(), true), BarMode::Active);
    }
}
