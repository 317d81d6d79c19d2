//! Configuration for the progress engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`progline.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `PROGLINE_`:
//! - `PROGLINE_REFRESH=0.05` sets `refresh`
//! - `PROGLINE_DEBUG=true` sets `debug`
//! - `PROGLINE_FORMAT='["topic","bar","number"]'` sets `format`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ProgressError;

/// Config file consulted by [`ProgressSettings::load`].
pub const CONFIG_FILE: &str = "progline.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProgressSettings {
    /// Seconds to wait before the first line is printed
    #[serde(default = "default_delay")]
    pub delay: f64,

    /// Minimum seconds between two renders
    #[serde(default = "default_refresh")]
    pub refresh: f64,

    /// Minimum seconds before the displayed topic may switch. The effective
    /// value never drops below three refresh intervals, see
    /// [`ProgressSettings::change_delay`].
    #[serde(default = "default_changedelay")]
    pub changedelay: f64,

    /// Ordered display fields: `topic|number|item[±N]|bar|unit|estimate|speed`
    #[serde(default = "default_format")]
    pub format: Vec<String>,

    /// Cap on the terminal width used for rendering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,

    /// Trailing window in seconds used to re-anchor ETA/speed estimation
    /// (0 disables calibration)
    #[serde(default = "default_estimateinterval")]
    pub estimateinterval: f64,

    /// Log every update as one line instead of drawing a live bar
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Disable progress output entirely
    #[serde(default = "default_false")]
    pub disable: bool,

    /// Clear the bar on completion instead of leaving the final line behind
    #[serde(default = "default_true")]
    pub clear_complete: bool,

    /// Treat a non-terminal error stream as a live display anyway
    #[serde(default = "default_false")]
    pub assume_tty: bool,

    /// Host quiet flag: suppress all progress output
    #[serde(default = "default_false")]
    pub quiet: bool,

    /// Host verbose-debug flag: live output would interleave with debug logs
    #[serde(default = "default_false")]
    pub verbose_debug: bool,
}

// Default value functions
fn default_delay() -> f64 {
    3.0
}
fn default_refresh() -> f64 {
    0.1
}
fn default_changedelay() -> f64 {
    1.0
}
fn default_format() -> Vec<String> {
    ["topic", "bar", "number", "estimate"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_estimateinterval() -> f64 {
    60.0
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            delay: default_delay(),
            refresh: default_refresh(),
            changedelay: default_changedelay(),
            format: default_format(),
            width: None,
            estimateinterval: default_estimateinterval(),
            debug: false,
            disable: false,
            clear_complete: default_true(),
            assume_tty: false,
            quiet: false,
            verbose_debug: false,
        }
    }
}

impl ProgressSettings {
    /// Load settings from `progline.toml` in the current directory plus
    /// `PROGLINE_` environment overrides.
    pub fn load() -> Result<Self, ProgressError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load settings from an explicit TOML file plus environment overrides.
    /// A missing file is not an error; defaults apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ProgressError> {
        let settings = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("PROGLINE_"))
            .extract()?;
        Ok(settings)
    }

    /// Effective topic-switch delay: never below three refresh intervals.
    pub fn change_delay(&self) -> f64 {
        self.changedelay.max(3.0 * self.refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ProgressSettings::default();
        assert_eq!(settings.delay, 3.0);
        assert_eq!(settings.refresh, 0.1);
        assert_eq!(settings.changedelay, 1.0);
        assert_eq!(settings.format, vec!["topic", "bar", "number", "estimate"]);
        assert_eq!(settings.width, None);
        assert_eq!(settings.estimateinterval, 60.0);
        assert!(!settings.debug);
        assert!(!settings.disable);
        assert!(settings.clear_complete);
        assert!(!settings.assume_tty);
    }

    #[test]
    fn test_change_delay_floor() {
        let settings = ProgressSettings {
            refresh: 1.0,
            changedelay: 0.5,
            ..Default::default()
        };
        // floored at 3x refresh
        assert_eq!(settings.change_delay(), 3.0);

        let settings = ProgressSettings {
            refresh: 0.1,
            changedelay: 5.0,
            ..Default::default()
        };
        assert_eq!(settings.change_delay(), 5.0);
    }
}
