//! Error-stream plumbing: interrupted-write retry, width discovery, TTY
//! detection, and writer injection for embedding hosts and tests.

use std::io::{self, Write};
use std::sync::Mutex;

/// Width reported when the sink has no real terminal behind it.
const FALLBACK_WIDTH: usize = 80;

/// The stream progress output is written to.
///
/// Defaults to the process stderr; embedding hosts (and tests) can supply
/// their own writer together with a fixed width and TTY flag.
pub struct Console {
    out: Mutex<Box<dyn Write + Send>>,
    tty: bool,
    fixed_width: Option<usize>,
}

impl Console {
    /// Console over the process stderr. Width and TTY state come from the
    /// real terminal.
    pub fn stderr() -> Self {
        let tty = is_terminal::is_terminal(std::io::stderr());
        Self {
            out: Mutex::new(Box::new(io::stderr())),
            tty,
            fixed_width: None,
        }
    }

    /// Console over a caller-supplied writer.
    pub fn with_writer(out: Box<dyn Write + Send>, tty: bool, width: Option<usize>) -> Self {
        Self {
            out: Mutex::new(out),
            tty,
            fixed_width: width,
        }
    }

    pub fn is_tty(&self) -> bool {
        self.tty
    }

    /// Current width of the sink in display columns.
    pub fn width(&self) -> usize {
        if let Some(width) = self.fixed_width {
            return width;
        }
        let (_, cols) = console::Term::stderr().size();
        if cols > 0 { cols as usize } else { FALLBACK_WIDTH }
    }

    /// Write the payload, re-issuing it whole while the write keeps failing
    /// with an interrupted system call. Progress lines are short enough to go
    /// out in a single write, so re-issuing cannot duplicate bytes.
    pub fn write_err(&self, msg: &str) -> io::Result<()> {
        let mut out = self.out.lock().expect("console writer mutex poisoned");
        retry_interrupted(|| out.write_all(msg.as_bytes()))
    }

    /// Flush the sink, retrying on interrupted system calls.
    pub fn flush_err(&self) -> io::Result<()> {
        let mut out = self.out.lock().expect("console writer mutex poisoned");
        retry_interrupted(|| out.flush())
    }
}

fn retry_interrupted<T>(mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match op() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
