pub mod config;
pub mod error;
pub mod logging;
pub mod progress;

pub use config::ProgressSettings;
pub use error::ProgressError;
pub use progress::{Bar, BarMode, Console, Tracker, fmt_remaining};
