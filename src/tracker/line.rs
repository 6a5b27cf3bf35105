//! Trackers for sinks without cursor control.

use std::{fmt, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    Progress, ProgressStack,
    console::{Console, StdoutConsole},
    tracker::ProgressTracker,
};

/// Prints every active bar on its own line at each update, never erasing.
///
/// Meant for pipes, CI logs and terminals without ANSI support.
pub struct LineTracker {
    stack: ProgressStack,
    console: Arc<dyn Console>,
}

impl fmt::Debug for LineTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineTracker")
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

impl Default for LineTracker {
    fn default() -> Self {
        Self::with_console(StdoutConsole)
    }
}

impl LineTracker {
    /// A tracker printing to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker printing to `console`.
    #[must_use]
    pub fn with_console(console: impl Console + 'static) -> Self {
        Self {
            stack: ProgressStack::new(),
            console: Arc::new(console),
        }
    }
}

impl ProgressTracker for LineTracker {
    fn active_stack(&self) -> &ProgressStack {
        &self.stack
    }

    fn update_progress(&self, _caller: &Progress) {
        let width = self.console.width();
        let mut out = String::new();
        for (depth, bar) in self.stack.items().iter().enumerate() {
            match bar.format(width) {
                Ok(line) => {
                    out.push_str(&line);
                    out.push('\n');
                }
                Err(err) => debug!(depth, %err, "skipping progress bar"),
            }
        }

        if let Err(err) = self.console.write(&out) {
            warn!(%err, "failed to write progress lines");
        }
    }
}

/// Emits every active bar as an `info` event on the `stacked_progress` target.
#[derive(Debug, Default)]
pub struct LogTracker {
    stack: ProgressStack,
    width: usize,
}

impl LogTracker {
    /// A tracker rendering at each bar's fallback width.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker rendering into `width` cells.
    #[must_use]
    pub fn with_width(width: usize) -> Self {
        Self {
            stack: ProgressStack::new(),
            width,
        }
    }
}

impl ProgressTracker for LogTracker {
    fn active_stack(&self) -> &ProgressStack {
        &self.stack
    }

    fn update_progress(&self, _caller: &Progress) {
        for (depth, bar) in self.stack.items().iter().enumerate() {
            match bar.format(self.width) {
                Ok(line) => info!(target: "stacked_progress", depth, "{line}"),
                Err(err) => debug!(depth, %err, "skipping progress bar"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{LineTracker, LogTracker};
    use crate::{Progress, ProgressTracker, console::BufferConsole};

    /// Plain Output
    /// One line per active bar per update, nothing erased.
    #[test]
    fn test_line_tracker_appends() {
        let console = BufferConsole::new(20);
        let tracker: Arc<dyn ProgressTracker> = Arc::new(LineTracker::with_console(console.clone()));

        let bar = Progress::builder(2u64).tracker(tracker).build();
        bar.inc(1);
        bar.inc(1);

        assert_eq!(
            console.contents(),
            concat!(
                " [            ] 0/2 \n",
                " [=======     ] 1/2 \n",
                " [============] 2/2 \n",
            )
        );
    }

    /// Nested Plain Output
    #[test]
    fn test_line_tracker_prints_stack() {
        let console = BufferConsole::new(20);
        let tracker: Arc<dyn ProgressTracker> = Arc::new(LineTracker::with_console(console.clone()));

        let _outer = Progress::builder(2u64).tracker(tracker.clone()).build();
        let _ = console.take();
        let _inner = Progress::builder(1u64).tracker(tracker).build();

        assert_eq!(console.take(), " [            ] 0/2 \n [            ] 0/1 \n");
    }

    /// Log Sink
    /// Without a subscriber the events are dropped; the bar still completes and pops.
    #[test]
    fn test_log_tracker() {
        let tracker: Arc<dyn ProgressTracker> = Arc::new(LogTracker::with_width(30));
        let bar = Progress::builder(3u64).tracker(tracker.clone()).build();
        bar.inc(3);
        assert!(tracker.active_stack().is_empty());
    }
}
