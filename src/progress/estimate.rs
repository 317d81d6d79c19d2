//! Remaining-time and throughput estimation.

/// Format a number of remaining seconds in a human readable way.
///
/// Displays the two most significant units: seconds, minutes, hours, days,
/// weeks, years. Once a unit stops being shown the remainder rounds up into
/// the smallest displayed unit, and a unit overflowing its threshold carries
/// one step up (30 hours and beyond round into days, and so on).
pub fn fmt_remaining(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds:02}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m{:02}s", seconds % 60);
    }
    // seconds are no longer shown, round them up
    let minutes = seconds.div_ceil(60);
    let hours = minutes / 60;
    if hours < 30 {
        return format!("{hours}h{:02}m", minutes % 60);
    }
    let hours = minutes.div_ceil(60);
    let days = hours / 24;
    if days < 15 {
        return format!("{days}d{:02}h", hours % 24);
    }
    let days = hours.div_ceil(24);
    let weeks = days / 7;
    if weeks < 55 {
        return format!("{weeks}w{:02}d", days % 7);
    }
    let weeks = days.div_ceil(7);
    // treat a year as 52 weeks
    let years = weeks / 52;
    format!("{years}y{:02}w", weeks % 52)
}

/// ETA string for `pos` out of `total`, anchored at `start_val`, after
/// `elapsed` seconds. Empty when the total is unknown (or zero) or nothing
/// has moved past the anchor yet.
pub(crate) fn estimate(start_val: f64, pos: f64, total: Option<u64>, elapsed: f64) -> String {
    let Some(total) = total.filter(|t| *t > 0) else {
        return String::new();
    };
    let target = total as f64 - start_val;
    let delta = pos - start_val;
    if delta > 0.0 {
        let seconds = (elapsed * (target - delta) / delta).floor() + 1.0;
        if seconds >= 0.0 {
            return fmt_remaining(seconds as u64);
        }
    }
    String::new()
}

/// Throughput string, `"N unit/sec"`. Empty before any time has passed.
pub(crate) fn speed(start_val: f64, pos: f64, unit: &str, elapsed: f64) -> String {
    if elapsed > 0.0 {
        let delta = pos - start_val;
        return format!("{} {unit}/sec", (delta / elapsed) as i64);
    }
    String::new()
}

/// New start-value anchor re-scoping estimation to the trailing `interval`
/// seconds, or `None` when the window has not elapsed yet or the rescaled
/// delta would be negligible (avoids ETA thrashing across stalls). The
/// caller moves the matching start time to `now - interval`.
pub(crate) fn calibrate(start_val: f64, pos: f64, elapsed: f64, interval: f64) -> Option<f64> {
    if interval <= 0.0 || elapsed <= interval {
        return None;
    }
    let delta = pos - start_val;
    let new_delta = delta * interval / elapsed;
    if new_delta < 0.1 {
        return None;
    }
    Some(pos - new_delta)
}
