//! Output sinks for trackers: a width query and a raw write.
//!
//! [`StdoutConsole`] talks to the real terminal through `crossterm`. [`BufferConsole`]
//! collects output in memory with a fixed width, for tests and for embedding the
//! rendered text elsewhere.

use std::{
    env,
    io::{self, IsTerminal, Write},
    sync::Arc,
};

use parking_lot::Mutex;

/// Somewhere a tracker can draw.
pub trait Console: Send + Sync {
    /// Usable width in cells, or `0` when unknown.
    fn width(&self) -> usize;

    /// Writes `text` as-is and flushes it.
    fn write(&self, text: &str) -> io::Result<()>;
}

/// The process's standard output.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    /// One less than the terminal's column count, so a full-width line never wraps.
    fn width(&self) -> usize {
        crossterm::terminal::size().map_or(0, |(columns, _)| usize::from(columns).saturating_sub(1))
    }

    fn write(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }
}

/// An in-memory console with a fixed width.
///
/// Clones share the same buffer.
///
/// ```
/// use stacked_progress::console::{BufferConsole, Console};
///
/// let console = BufferConsole::new(40);
/// console.write("hello\n").unwrap();
/// assert_eq!(console.take(), "hello\n");
/// assert!(console.contents().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct BufferConsole {
    width: usize,
    buffer: Arc<Mutex<String>>,
}

impl BufferConsole {
    /// Creates an empty buffer reporting `width` cells.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            width,
            buffer: Arc::default(),
        }
    }

    /// Everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Returns everything written so far and empties the buffer.
    #[must_use]
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock())
    }
}

impl Console for BufferConsole {
    fn width(&self) -> usize {
        self.width
    }

    fn write(&self, text: &str) -> io::Result<()> {
        self.buffer.lock().push_str(text);
        Ok(())
    }
}

/// Returns whether stdout is a terminal that understands cursor movement.
#[must_use]
pub fn ansi_supported() -> bool {
    io::stdout().is_terminal() && env::var("TERM").map_or(cfg!(windows), |term| term != "dumb")
}
