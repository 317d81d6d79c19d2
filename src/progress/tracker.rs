//! Shared topic state machine: throttling, stickiness, render dispatch.
//!
//! One [`Tracker`] serves every bar handle of a command invocation. A single
//! mutex covers state mutation, the render decision and the render itself, so
//! concurrent updates can never interleave partial lines on the stream.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::ProgressSettings;
use crate::error::ProgressError;
use crate::progress::estimate;
use crate::progress::render::{self, Field, FieldValues};
use crate::progress::term::Console;

/// Last reported values for one active topic.
#[derive(Debug, Clone)]
struct TopicState {
    pos: f64,
    item: String,
    unit: String,
    total: Option<u64>,
}

struct TrackerState {
    /// Active topics, outermost first.
    topics: Vec<String>,
    states: HashMap<String, TopicState>,
    start_times: HashMap<String, Instant>,
    start_vals: HashMap<String, f64>,
    printed: bool,
    last_print: Instant,
    /// Set after a clear so the next update repaints immediately.
    force_repaint: bool,
    cur_topic: Option<String>,
    last_topic: Option<String>,
    indet_count: u64,
}

impl TrackerState {
    fn fresh(delay: f64) -> Self {
        let now = Instant::now();
        let last_print = if delay > 0.0 {
            now + Duration::from_secs_f64(delay)
        } else {
            now
        };
        Self {
            topics: Vec::new(),
            states: HashMap::new(),
            start_times: HashMap::new(),
            start_vals: HashMap::new(),
            printed: false,
            last_print,
            force_repaint: false,
            cur_topic: None,
            last_topic: None,
            indet_count: 0,
        }
    }
}

/// Mutex-guarded aggregator tracking the stack of nested progress topics.
///
/// Owned by the hosting application as an `Arc` and passed to every handle
/// constructor; there is no hidden process-wide singleton.
pub struct Tracker {
    settings: ProgressSettings,
    fields: Vec<Field>,
    console: Console,
    state: Mutex<TrackerState>,
}

impl Tracker {
    pub fn new(settings: ProgressSettings, console: Console) -> Arc<Self> {
        let fields = Field::parse_order(&settings.format);
        let state = TrackerState::fresh(settings.delay);
        Arc::new(Self {
            settings,
            fields,
            console,
            state: Mutex::new(state),
        })
    }

    /// Tracker over the process stderr.
    pub fn stderr(settings: ProgressSettings) -> Arc<Self> {
        let console = Console::stderr();
        Self::new(settings, console)
    }

    pub fn settings(&self) -> &ProgressSettings {
        &self.settings
    }

    /// Whether the stream is eligible for live display at all.
    pub(crate) fn should_print(&self) -> bool {
        !self.settings.quiet && (self.console.is_tty() || self.settings.assume_tty)
    }

    /// Report progress for `topic`. `pos` of `None` deactivates the topic
    /// (and everything nested inside it); otherwise the latest values are
    /// always recorded and a render happens when the refresh throttle and
    /// the stickiness rule both allow it.
    pub fn update(
        &self,
        topic: &str,
        pos: Option<f64>,
        item: &str,
        unit: &str,
        total: Option<u64>,
    ) -> Result<(), ProgressError> {
        let now = Instant::now();
        let mut state = self.state.lock().expect("progress state mutex poisoned");
        match pos {
            Some(pos) => self.record(&mut state, now, topic, pos, item, unit, total),
            None => self.deactivate(&mut state, topic),
        }
    }

    /// Drop all tracked topics and timing anchors. The first-print delay
    /// re-arms, as for a brand-new invocation.
    pub fn reset_state(&self) {
        let mut state = self.state.lock().expect("progress state mutex poisoned");
        *state = TrackerState::fresh(self.settings.delay);
    }

    /// Erase the printed line. The next update bypasses the refresh
    /// throttle so the bar reappears immediately.
    pub fn clear(&self) -> Result<(), ProgressError> {
        let mut state = self.state.lock().expect("progress state mutex poisoned");
        self.clear_locked(&mut state)
    }

    /// Finish the printed line: clear it or leave it behind on a newline,
    /// per the `clear_complete` setting.
    pub fn complete(&self) -> Result<(), ProgressError> {
        let mut state = self.state.lock().expect("progress state mutex poisoned");
        self.complete_locked(&mut state)
    }

    /// Clear the line so the host can write other output to the stream; the
    /// bar repaints on the next rendered update after the guard is gone.
    pub fn suspend(&self) -> Suspended<'_> {
        if let Err(e) = self.clear() {
            tracing::warn!(target: "progress", "failed to clear line for suspend: {e}");
        }
        Suspended { _tracker: self }
    }

    /// Debug-variant output shares the stream and its retry semantics.
    pub(crate) fn write_line(&self, line: &str) -> Result<(), ProgressError> {
        self.console.write_err(line)?;
        self.console.flush_err()?;
        Ok(())
    }

    fn record(
        &self,
        state: &mut TrackerState,
        now: Instant,
        topic: &str,
        pos: f64,
        item: &str,
        unit: &str,
        total: Option<u64>,
    ) -> Result<(), ProgressError> {
        if !state.topics.iter().any(|t| t == topic) {
            tracing::debug!(target: "progress", topic, "topic activated");
            state.start_times.insert(topic.to_string(), now);
            state.start_vals.insert(topic.to_string(), pos);
            state.topics.push(topic.to_string());
        }
        state.states.insert(
            topic.to_string(),
            TopicState {
                pos,
                item: item.to_string(),
                unit: unit.to_string(),
                total,
            },
        );
        state.cur_topic = Some(topic.to_string());
        self.calibrate(state, now, topic, pos);

        let refresh_due =
            state.force_repaint || signed_secs(state.last_print, now) >= self.settings.refresh;
        if refresh_due && !state.topics.is_empty() && self.ok_to_print(state, now) {
            state.last_print = now;
            state.force_repaint = false;
            self.show(state, now, topic)?;
        }
        Ok(())
    }

    fn deactivate(&self, state: &mut TrackerState, topic: &str) -> Result<(), ProgressError> {
        tracing::debug!(target: "progress", topic, "topic closed");
        state.start_times.remove(topic);
        state.start_vals.remove(topic);
        state.states.remove(topic);
        // reset the whole display if this was the outermost topic
        if state.topics.first().map(String::as_str) == Some(topic) && state.printed {
            self.complete_locked(state)?;
            *state = TrackerState::fresh(self.settings.delay);
        }
        // everything nested inside the closed topic is closed with it
        if let Some(idx) = state.topics.iter().position(|t| t == topic) {
            state.topics.truncate(idx);
            // rewind stickiness to the topic we unwound to, so outer topics
            // are stickier than inner ones
            state.last_topic = state.topics.last().cloned();
        }
        Ok(())
    }

    /// Stickiness: a topic other than the last-printed one only takes over
    /// the line once the change delay has elapsed. An inner topic that keeps
    /// refreshing can therefore starve an outer one; callers depend on this
    /// cadence.
    fn ok_to_print(&self, state: &TrackerState, now: Instant) -> bool {
        if state.last_topic.is_none() {
            return true;
        }
        if state.cur_topic == state.last_topic {
            return true;
        }
        signed_secs(state.last_print, now) >= self.settings.change_delay()
    }

    fn calibrate(&self, state: &mut TrackerState, now: Instant, topic: &str, pos: f64) {
        let interval = self.settings.estimateinterval;
        let Some(&start) = state.start_times.get(topic) else {
            return;
        };
        let Some(&start_val) = state.start_vals.get(topic) else {
            return;
        };
        let elapsed = now.saturating_duration_since(start).as_secs_f64();
        if let Some(new_val) = estimate::calibrate(start_val, pos, elapsed, interval) {
            state.start_vals.insert(topic.to_string(), new_val);
            let anchored = now
                .checked_sub(Duration::from_secs_f64(interval))
                .unwrap_or(start);
            state.start_times.insert(topic.to_string(), anchored);
        }
    }

    fn show(&self, state: &mut TrackerState, now: Instant, topic: &str) -> Result<(), ProgressError> {
        if !self.should_print() {
            return Ok(());
        }
        let Some(topic_state) = state.states.get(topic).cloned() else {
            return Ok(());
        };
        let width = self.width();
        state.printed = true;

        let start_val = state
            .start_vals
            .get(topic)
            .copied()
            .unwrap_or(topic_state.pos);
        let elapsed = state
            .start_times
            .get(topic)
            .map(|start| now.saturating_duration_since(*start).as_secs_f64())
            .unwrap_or(0.0);
        let eta = estimate::estimate(start_val, topic_state.pos, topic_state.total, elapsed);
        let rate = estimate::speed(start_val, topic_state.pos, &topic_state.unit, elapsed);

        let values = FieldValues {
            topic,
            pos: topic_state.pos,
            item: &topic_state.item,
            unit: &topic_state.unit,
            total: topic_state.total,
            estimate: &eta,
            speed: &rate,
        };
        let line = render::render_line(&self.fields, width, &values, &mut state.indet_count);
        tracing::trace!(target: "progress", topic, "render");
        self.console.write_err(&format!("\r{line}"))?;
        state.last_topic = Some(topic.to_string());
        self.console.flush_err()?;
        Ok(())
    }

    fn clear_locked(&self, state: &mut TrackerState) -> Result<(), ProgressError> {
        if !state.printed || state.force_repaint || !self.should_print() {
            return Ok(());
        }
        self.console
            .write_err(&format!("\r{}\r", " ".repeat(self.width())))?;
        state.force_repaint = true;
        Ok(())
    }

    fn complete_locked(&self, state: &mut TrackerState) -> Result<(), ProgressError> {
        if !self.should_print() {
            return Ok(());
        }
        if self.settings.clear_complete {
            self.clear_locked(state)?;
        } else {
            self.console.write_err("\n")?;
        }
        self.console.flush_err()?;
        Ok(())
    }

    fn width(&self) -> usize {
        let terminal = self.console.width();
        match self.settings.width {
            Some(cap) => cap.min(terminal),
            None => terminal,
        }
    }
}

/// Keeps the line clear while the host writes other output.
pub struct Suspended<'a> {
    _tracker: &'a Tracker,
}

/// `to - from` in seconds, negative when `to` precedes `from` (the first
/// print is deliberately anchored in the future by the `delay` setting).
fn signed_secs(from: Instant, to: Instant) -> f64 {
    if to >= from {
        to.duration_since(from).as_secs_f64()
    } else {
        -from.duration_since(to).as_secs_f64()
    }
}
