//! In-place redraw of the whole active stack using ANSI cursor control.
//!
//! Each redraw moves the cursor up over the lines written last time, clears to the end
//! of the screen and prints every active bar, outermost first. Redraws are throttled:
//!
//! * A redraw runs immediately when the stack's root bar has just completed (forced),
//!   or when at least [`min_interval`](AnsiTrackerBuilder::min_interval) has passed
//!   since the previous one.
//! * Otherwise the request is parked. Later requests replace it, and it runs on the
//!   next update or [`poll`](AnsiTracker::poll) that finds the interval elapsed.
//!
//! A forced redraw leaves the completed root's line out of the erase count, so the
//! finished bar stays on screen when the next one starts drawing. It happens once per
//! completion: later updates of a root that stays complete are throttled as usual.

use std::{fmt, sync::Arc, time::Duration};

use crossterm::{
    Command,
    cursor::MoveUp,
    terminal::{Clear, ClearType},
};
use parking_lot::Mutex;
use tracing::{debug, warn};
use web_time::Instant;

use crate::{
    Progress, ProgressStack,
    console::{Console, StdoutConsole},
    tracker::ProgressTracker,
};

/// Monotonic time source used for throttling.
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

/// The shortest time between two unforced redraws.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(10);

/// A tracker that redraws its stack in place, at most once per interval.
pub struct AnsiTracker {
    stack: ProgressStack,
    console: Arc<dyn Console>,
    clock: Clock,
    min_interval: Duration,
    schedule: Mutex<Schedule>,
}

#[derive(Debug, Default)]
struct Schedule {
    pending: Option<PendingRedraw>,
    lines_written: usize,
    next_redraw: Option<Instant>,
    forced_root: Option<Progress>,
}

#[derive(Clone, Copy, Debug)]
struct PendingRedraw {
    root_completed: bool,
}

impl Schedule {
    fn is_due(&self, now: Instant) -> bool {
        self.next_redraw.is_none_or(|next| now >= next)
    }

    /// Returns true for the first update that sees `root` complete.
    fn root_just_completed(&mut self, root: Option<&Progress>, caller: &Progress) -> bool {
        let Some(root) = root.filter(|root| root.ptr_eq(caller)) else {
            return false;
        };
        let forced = self
            .forced_root
            .as_ref()
            .is_some_and(|forced| forced.ptr_eq(root));

        if !caller.is_complete() {
            if forced {
                self.forced_root = None;
            }
            return false;
        }
        if forced {
            return false;
        }
        self.forced_root = Some(root.clone());
        true
    }
}

impl fmt::Debug for AnsiTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnsiTracker")
            .field("stack", &self.stack)
            .field("min_interval", &self.min_interval)
            .field("schedule", &*self.schedule.lock())
            .finish_non_exhaustive()
    }
}

impl Default for AnsiTracker {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AnsiTracker {
    /// A tracker drawing to stdout with the default interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an [`AnsiTrackerBuilder`].
    #[must_use]
    pub fn builder() -> AnsiTrackerBuilder {
        AnsiTrackerBuilder::default()
    }

    /// Number of lines the next redraw will move up over.
    #[must_use]
    pub fn lines_written(&self) -> usize {
        self.schedule.lock().lines_written
    }

    /// Returns whether a throttled redraw is waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.schedule.lock().pending.is_some()
    }

    /// Runs the parked redraw if its interval has elapsed.
    pub fn poll(&self) {
        let now = (self.clock)();
        let mut schedule = self.schedule.lock();
        if schedule.pending.is_some() && schedule.is_due(now) {
            self.run_pending(&mut schedule, now);
        }
    }

    /// Runs the parked redraw now, ignoring the interval.
    pub fn flush(&self) {
        let now = (self.clock)();
        let mut schedule = self.schedule.lock();
        if schedule.pending.is_some() {
            self.run_pending(&mut schedule, now);
        }
    }

    fn run_pending(&self, schedule: &mut Schedule, now: Instant) {
        let Some(pending) = schedule.pending.take() else {
            return;
        };
        schedule.next_redraw = Some(now + self.min_interval);
        self.redraw(schedule, pending);
    }

    fn redraw(&self, schedule: &mut Schedule, pending: PendingRedraw) {
        let width = self.console.width();
        let (frame, lines) = match self.compose(schedule.lines_written, width) {
            Ok(composed) => composed,
            Err(err) => {
                warn!(%err, "failed to compose progress frame");
                return;
            }
        };

        if let Err(err) = self.console.write(&frame) {
            warn!(%err, "failed to write progress frame");
        }

        // A completed root keeps its final line.
        schedule.lines_written = if pending.root_completed {
            lines.saturating_sub(1)
        } else {
            lines
        };
    }

    /// Builds the escape sequences and bar lines for one frame.
    fn compose(&self, erase: usize, width: usize) -> Result<(String, usize), fmt::Error> {
        let mut frame = String::new();
        if erase > 0 {
            // MoveUp(0) still moves one line on most terminals.
            MoveUp(u16::try_from(erase).unwrap_or(u16::MAX)).write_ansi(&mut frame)?;
        }
        Clear(ClearType::FromCursorDown).write_ansi(&mut frame)?;

        let mut lines = 0;
        for (depth, bar) in self.stack.items().iter().enumerate() {
            match bar.format(width) {
                Ok(line) => {
                    frame.push_str(&line);
                    frame.push('\n');
                    lines += 1;
                }
                Err(err) => debug!(depth, %err, "skipping progress bar"),
            }
        }
        Ok((frame, lines))
    }
}

impl ProgressTracker for AnsiTracker {
    fn active_stack(&self) -> &ProgressStack {
        &self.stack
    }

    fn update_progress(&self, caller: &Progress) {
        let root = self.stack.root();
        let now = (self.clock)();
        let mut schedule = self.schedule.lock();
        let root_completed = schedule.root_just_completed(root.as_ref(), caller);
        schedule.pending = Some(PendingRedraw { root_completed });
        if root_completed || schedule.is_due(now) {
            self.run_pending(&mut schedule, now);
        }
    }
}

/// Configuration for an [`AnsiTracker`].
pub struct AnsiTrackerBuilder {
    console: Arc<dyn Console>,
    clock: Clock,
    min_interval: Duration,
}

impl fmt::Debug for AnsiTrackerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnsiTrackerBuilder")
            .field("min_interval", &self.min_interval)
            .finish_non_exhaustive()
    }
}

impl Default for AnsiTrackerBuilder {
    fn default() -> Self {
        Self {
            console: Arc::new(StdoutConsole),
            clock: Arc::new(Instant::now),
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

impl AnsiTrackerBuilder {
    /// Draws to `console` instead of stdout.
    #[must_use]
    pub fn console(mut self, console: impl Console + 'static) -> Self {
        self.console = Arc::new(console);
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the shortest time between two unforced redraws.
    #[must_use]
    pub const fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Builds the tracker with an empty stack.
    #[must_use]
    pub fn build(self) -> AnsiTracker {
        AnsiTracker {
            stack: ProgressStack::new(),
            console: self.console,
            clock: self.clock,
            min_interval: self.min_interval,
            schedule: Mutex::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    };

    use web_time::Instant;

    use super::{AnsiTracker, Clock};
    use crate::{BarFormat, Progress, ProgressTracker, console::BufferConsole};

    const UP_1: &str = "\x1b[1A";
    const UP_2: &str = "\x1b[2A";
    const CLEAR: &str = "\x1b[J";

    /// A clock that only moves when told to.
    fn manual_clock() -> (Clock, Arc<AtomicU64>) {
        let base = Instant::now();
        let millis = Arc::new(AtomicU64::new(0));
        let source = millis.clone();
        let clock: Clock =
            Arc::new(move || base + Duration::from_millis(source.load(Ordering::SeqCst)));
        (clock, millis)
    }

    fn tracker(width: usize) -> (Arc<AnsiTracker>, BufferConsole, Arc<AtomicU64>) {
        let console = BufferConsole::new(width);
        let (clock, millis) = manual_clock();
        let tracker = AnsiTracker::builder()
            .console(console.clone())
            .clock(clock)
            .build();
        (Arc::new(tracker), console, millis)
    }

    fn bar_on(tracker: &Arc<AnsiTracker>, total: u64) -> Progress {
        let tracker: Arc<dyn ProgressTracker> = tracker.clone();
        Progress::builder(total).tracker(tracker).build()
    }

    /// First Frame
    /// The first redraw has nothing to erase.
    #[test]
    fn test_first_frame() {
        let (tracker, console, _) = tracker(20);
        let _bar = bar_on(&tracker, 4);

        assert_eq!(console.take(), format!("{CLEAR} [            ] 0/4 \n"));
        assert_eq!(tracker.lines_written(), 1);
    }

    /// Throttling
    /// Requests inside the interval are coalesced into the latest one.
    #[test]
    fn test_throttle_and_poll() {
        let (tracker, console, millis) = tracker(20);
        let bar = bar_on(&tracker, 4);
        let _ = console.take();

        bar.inc(1);
        bar.inc(1);
        assert!(console.contents().is_empty());
        assert!(tracker.has_pending());

        tracker.poll();
        assert!(console.contents().is_empty(), "interval not elapsed yet");

        millis.store(10, Ordering::SeqCst);
        tracker.poll();
        assert_eq!(console.take(), format!("{UP_1}{CLEAR} [=======     ] 2/4 \n"));
        assert!(!tracker.has_pending());
    }

    /// Elapsed Interval
    #[test]
    fn test_update_after_interval_draws() {
        let (tracker, console, millis) = tracker(20);
        let bar = bar_on(&tracker, 4);
        let _ = console.take();

        millis.store(25, Ordering::SeqCst);
        bar.inc(1);
        assert_eq!(console.take(), format!("{UP_1}{CLEAR} [====        ] 1/4 \n"));
    }

    /// Forced Redraw
    /// Completing the root bypasses the throttle and keeps its line.
    #[test]
    fn test_root_completion_forces_redraw() {
        let (tracker, console, millis) = tracker(20);
        let bar = bar_on(&tracker, 2);
        let _ = console.take();

        bar.inc(1);
        assert!(console.contents().is_empty());

        bar.inc(1);
        assert_eq!(console.take(), format!("{UP_1}{CLEAR} [============] 2/2 \n"));
        assert_eq!(tracker.lines_written(), 0);
        assert!(tracker.active_stack().is_empty());

        // The next bar draws below the finished one.
        millis.store(10, Ordering::SeqCst);
        let _next = bar_on(&tracker, 2);
        assert_eq!(console.take(), format!("{CLEAR} [            ] 0/2 \n"));
    }

    /// Nested Redraw
    /// Both bars are drawn outermost first, then the inner one is erased once it is done.
    #[test]
    fn test_nested_frames() {
        let (tracker, console, millis) = tracker(20);
        let outer = bar_on(&tracker, 2);
        millis.store(10, Ordering::SeqCst);
        let inner = bar_on(&tracker, 1);

        let frames = console.take();
        assert!(frames.ends_with(&format!(
            "{UP_1}{CLEAR} [            ] 0/2 \n [            ] 0/1 \n"
        )));
        assert_eq!(tracker.lines_written(), 2);

        millis.store(20, Ordering::SeqCst);
        inner.inc(1);
        assert_eq!(
            console.take(),
            format!("{UP_2}{CLEAR} [            ] 0/2 \n [============] 1/1 \n")
        );
        assert_eq!(tracker.active_stack().len(), 1);

        millis.store(30, Ordering::SeqCst);
        outer.inc(1);
        assert_eq!(console.take(), format!("{UP_2}{CLEAR} [=======     ] 1/2 \n"));
        assert_eq!(tracker.lines_written(), 1);
    }

    /// Narrow Terminal
    /// Bars that do not fit are skipped, the rest still draw.
    #[test]
    fn test_unrenderable_bar_is_skipped() {
        let (tracker, console, millis) = tracker(18);
        let _outer = bar_on(&tracker, 2);
        millis.store(10, Ordering::SeqCst);

        let tracker_dyn: Arc<dyn ProgressTracker> = tracker.clone();
        let titled = BarFormat::builder().title("a long title").build().unwrap();
        let _inner = Progress::builder(2u64)
            .tracker(tracker_dyn)
            .format(titled)
            .build();

        assert!(console.take().ends_with(&format!("{UP_1}{CLEAR} [          ] 0/2 \n")));
        assert_eq!(tracker.lines_written(), 1);
    }

    /// Completed Root Kept Active
    /// A finished root that stays on the stack forces one redraw, then redraws in place.
    #[test]
    fn test_completed_root_forces_once() {
        let (tracker, console, millis) = tracker(20);
        let tracker_dyn: Arc<dyn ProgressTracker> = tracker.clone();
        let bar = Progress::builder(2u64)
            .tracker(tracker_dyn)
            .auto_enter(false)
            .active(true)
            .build();
        let _ = console.take();

        bar.inc(2);
        assert_eq!(console.take(), format!("{UP_1}{CLEAR} [============] 2/2 \n"));
        assert_eq!(tracker.lines_written(), 0);
        assert_eq!(tracker.active_stack().len(), 1);

        millis.store(10, Ordering::SeqCst);
        bar.update(false);
        assert_eq!(console.take(), format!("{CLEAR} [============] 2/2 \n"));
        assert_eq!(tracker.lines_written(), 1);

        millis.store(20, Ordering::SeqCst);
        bar.update(false);
        assert_eq!(console.take(), format!("{UP_1}{CLEAR} [============] 2/2 \n"));
        assert_eq!(tracker.lines_written(), 1);

        bar.update(false);
        assert!(console.contents().is_empty(), "no longer forced");
        assert!(tracker.has_pending());
    }

    /// Flush
    #[test]
    fn test_flush_ignores_interval() {
        let (tracker, console, _) = tracker(20);
        let bar = bar_on(&tracker, 4);
        let _ = console.take();

        bar.inc(3);
        tracker.flush();
        assert_eq!(console.take(), format!("{UP_1}{CLEAR} [==========  ] 3/4 \n"));

        tracker.flush();
        assert!(console.contents().is_empty());
    }
}
