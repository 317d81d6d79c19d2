//! End-to-end tests for the public handle API against an injected sink.

use progline::progress::Console;
use progline::{Bar, ProgressSettings, Tracker};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Cloneable sink capturing everything progress writes.
#[derive(Clone, Default)]
struct Sink(Arc<Mutex<Vec<u8>>>);

impl Sink {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn live_settings() -> ProgressSettings {
    ProgressSettings {
        delay: 0.0,
        refresh: 0.0,
        changedelay: 0.0,
        estimateinterval: 0.0,
        assume_tty: true,
        width: Some(60),
        ..Default::default()
    }
}

fn tracker_with_sink(settings: ProgressSettings) -> (Arc<Tracker>, Sink) {
    let sink = Sink::default();
    let console = Console::with_writer(Box::new(sink.clone()), false, Some(60));
    (Tracker::new(settings, console), sink)
}

#[test]
fn test_active_bar_renders_and_stops_after_close() {
    let (tracker, sink) = tracker_with_sink(live_settings());
    let mut bar = Bar::new(&tracker, "files", "files", Some(10));
    assert!(matches!(bar, Bar::Active(_)));

    bar.set_value(5.0);
    thread::sleep(Duration::from_millis(300));
    bar.close();

    let after_close = sink.contents();
    assert!(after_close.contains(" 5/10"), "missing value: {after_close:?}");
    assert!(after_close.contains("files"));

    // the poller is joined: nothing may be written after close() returns
    let frozen = sink.len();
    thread::sleep(Duration::from_millis(250));
    assert_eq!(sink.len(), frozen);
}

#[test]
fn test_dropping_bar_is_equivalent_to_close() {
    let (tracker, sink) = tracker_with_sink(live_settings());
    {
        let mut bar = Bar::new(&tracker, "files", "files", Some(10));
        bar.set_value(3.0);
        thread::sleep(Duration::from_millis(250));
    }
    let frozen = sink.len();
    thread::sleep(Duration::from_millis(250));
    assert_eq!(sink.len(), frozen);
}

#[test]
fn test_spinner_shows_indeterminate_marker() {
    let (tracker, sink) = tracker_with_sink(live_settings());
    let mut bar = Bar::spinner(&tracker, "waiting");
    assert!(matches!(bar, Bar::Spinner(_)));

    thread::sleep(Duration::from_millis(350));
    bar.close();

    let contents = sink.contents();
    assert!(contents.contains("waiting"), "no spinner output: {contents:?}");
    assert!(contents.contains("<=>"));
}

#[test]
fn test_reset_reuses_handle_for_new_topic() {
    let (tracker, sink) = tracker_with_sink(live_settings());
    let mut bar = Bar::new(&tracker, "pull", "revs", Some(4));
    bar.set_value(2.0);
    thread::sleep(Duration::from_millis(250));

    bar.reset("unpack", "chunks", Some(8));
    assert_eq!(bar.topic(), "unpack");
    assert_eq!(bar.total(), Some(8));
    bar.set_value(4.0);
    thread::sleep(Duration::from_millis(250));
    bar.close();

    let contents = sink.contents();
    assert!(contents.contains("pull"));
    assert!(contents.contains("unpack"));
}

#[test]
fn test_null_bar_never_writes() {
    let settings = ProgressSettings {
        quiet: true,
        ..live_settings()
    };
    let (tracker, sink) = tracker_with_sink(settings);
    let mut bar = Bar::new(&tracker, "files", "files", Some(10));
    assert!(matches!(bar, Bar::Null(_)));

    for n in 0..100 {
        bar.set_value(n as f64);
    }
    bar.reset("other", "", None);
    bar.close();
    thread::sleep(Duration::from_millis(150));
    assert_eq!(sink.contents(), "");
}

#[test]
fn test_non_tty_stream_selects_null() {
    // not a terminal and no assume_tty override
    let settings = ProgressSettings {
        assume_tty: false,
        ..live_settings()
    };
    let (tracker, _sink) = tracker_with_sink(settings);
    let bar = Bar::new(&tracker, "files", "files", Some(10));
    assert!(matches!(bar, Bar::Null(_)));
}

#[test]
fn test_debug_bar_logs_lines() {
    let settings = ProgressSettings {
        debug: true,
        ..live_settings()
    };
    let (tracker, sink) = tracker_with_sink(settings);
    let mut bar = Bar::new(&tracker, "files", "files", Some(10));
    assert!(matches!(bar, Bar::Debug(_)));

    bar.set_value_with_item(3.0, "a.txt");
    bar.set_value(10.0);
    bar.close();

    let contents = sink.contents();
    assert!(contents.contains("progress: files (start)\n"));
    assert!(contents.contains("progress: files: a.txt 3/10 files (30.00%)\n"));
    assert!(contents.contains("progress: files: 10/10 files (100.00%)\n"));
    assert!(contents.contains("progress: files (end)\n"));
}

#[test]
fn test_debug_bar_without_total() {
    let settings = ProgressSettings {
        debug: true,
        ..live_settings()
    };
    let (tracker, sink) = tracker_with_sink(settings);
    let mut bar = Bar::new(&tracker, "scan", "dirs", None);
    bar.set_value(7.0);
    bar.reset("walk", "", None);
    drop(bar);

    let contents = sink.contents();
    assert!(contents.contains("progress: scan: 7 dirs\n"));
    assert!(contents.contains("progress: scan (reset)\n"));
    // the reset bar never started, so no end marker for "walk"
    assert!(!contents.contains("progress: walk (end)\n"));
}

#[test]
fn test_concurrent_bars_share_one_tracker() {
    let (tracker, sink) = tracker_with_sink(live_settings());
    let mut workers = Vec::new();
    for t in 0..3 {
        let tracker = tracker.clone();
        workers.push(thread::spawn(move || {
            let mut bar = Bar::new(&tracker, format!("topic{t}"), "items", Some(20));
            for pos in 0..20 {
                bar.set_value(pos as f64);
                thread::sleep(Duration::from_millis(10));
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    // renders are serialized: every carriage-return chunk fits the width
    let contents = sink.contents();
    for chunk in contents.split('\r').filter(|c| !c.is_empty() && *c != "\n") {
        assert!(
            console::measure_text_width(chunk.trim_end_matches('\n')) <= 60,
            "torn or overlong write: {chunk:?}"
        );
    }
}
