//! Hierarchical terminal progress reporting.
//!
//! This module provides:
//! - A shared, mutex-guarded [`Tracker`] for nested progress topics
//! - Scoped [`Bar`] handles in four variants (active, spinner, debug, null)
//! - Throttled carriage-return rendering with ETA/speed estimation
//!
//! # Usage
//!
//! ```no_run
//! use progline::{Bar, ProgressSettings, Tracker};
//!
//! let tracker = Tracker::stderr(ProgressSettings::load().unwrap_or_default());
//! let mut bar = Bar::new(&tracker, "cloning", "revs", Some(4096));
//! for rev in 0..4096u64 {
//!     bar.set_value_with_item(rev as f64, format!("rev {rev}"));
//! }
//! ```
//!
//! Handles are scoped: dropping (or explicitly closing) a live bar signals
//! its poller thread, issues the final deactivation update and joins the
//! thread, so no output ever trails the handle's lifetime.

pub mod estimate;
pub mod handle;
pub mod render;
pub mod term;
pub mod tracker;

pub use estimate::fmt_remaining;
pub use handle::{Bar, BarMode, DebugBar, LiveBar, NullBar};
pub use render::{DEFAULT_ITEM_WIDTH, Field, FieldValues, ItemSlice};
pub use term::Console;
pub use tracker::{Suspended, Tracker};
