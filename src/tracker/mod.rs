//! Trackers: where progress bars are drawn.
//!
//! A [`ProgressTracker`] owns an active [`ProgressStack`] and receives a call every time
//! one of its bars needs redrawing. The crate ships four:
//!
//! * [`CallbackTracker`]: hands each update to a closure. Handy for tests and custom sinks.
//! * [`AnsiTracker`]: redraws the whole stack in place with cursor movement, throttled.
//! * [`LineTracker`]: prints the stack line by line, for outputs without cursor control.
//! * [`LogTracker`]: emits each bar as a `tracing` event.
//!
//! Bars built without an explicit tracker share the process-wide [`default_tracker`].

mod ansi;
mod line;

use std::{
    env, fmt,
    str::FromStr,
    sync::{Arc, LazyLock},
};

use tracing::debug;

pub use ansi::{AnsiTracker, AnsiTrackerBuilder, Clock, DEFAULT_MIN_INTERVAL};
pub use line::{LineTracker, LogTracker};

use crate::{Progress, ProgressStack, console, error::ParseTrackerKindError};

/// Environment variable consulted by [`default_tracker`].
pub const TRACKER_ENV: &str = "STACKED_PROGRESS_TRACKER";

/// Receives redraw requests for a stack of nested bars.
pub trait ProgressTracker: Send + Sync {
    /// The stack of bars currently shown by this tracker.
    fn active_stack(&self) -> &ProgressStack;

    /// Called whenever `caller`, an active bar of this tracker, has changed.
    fn update_progress(&self, caller: &Progress);

    /// The innermost active bar.
    fn last_active(&self) -> Option<Progress> {
        self.active_stack().top()
    }
}

type Callback = Box<dyn Fn(&Progress, &[Progress]) + Send + Sync>;

/// A tracker that hands every update to a closure along with the current stack.
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use stacked_progress::{ProgressBuilder, ProgressIteratorExt as _};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// let builder = ProgressBuilder::new(4u64)
///     .callback(move |bar, _stack| sink.lock().unwrap().push(bar.position()));
///
/// for _ in (0..4).progress_with(builder) {}
/// assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
/// ```
pub struct CallbackTracker {
    stack: ProgressStack,
    callback: Callback,
}

impl fmt::Debug for CallbackTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTracker")
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

impl CallbackTracker {
    /// Creates a tracker with its own empty stack.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Progress, &[Progress]) + Send + Sync + 'static,
    {
        Self {
            stack: ProgressStack::new(),
            callback: Box::new(callback),
        }
    }
}

impl ProgressTracker for CallbackTracker {
    fn active_stack(&self) -> &ProgressStack {
        &self.stack
    }

    fn update_progress(&self, caller: &Progress) {
        // Detached copy: the callback may enter or exit bars.
        let items = self.stack.items();
        (self.callback)(caller, &items);
    }
}

/// Which tracker [`default_tracker`] builds.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TrackerKind {
    /// [`Ansi`](Self::Ansi) when stdout is a capable terminal, [`Line`](Self::Line) otherwise.
    #[default]
    Auto,
    /// An [`AnsiTracker`] on stdout.
    Ansi,
    /// A [`LineTracker`] on stdout.
    Line,
    /// A [`LogTracker`].
    Log,
}

impl FromStr for TrackerKind {
    type Err = ParseTrackerKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "ansi" => Ok(Self::Ansi),
            "line" | "plain" => Ok(Self::Line),
            "log" => Ok(Self::Log),
            _ => Err(ParseTrackerKindError {
                value: s.to_owned(),
            }),
        }
    }
}

impl TrackerKind {
    /// Reads [`TRACKER_ENV`], falling back to [`Auto`](Self::Auto) when unset or invalid.
    #[must_use]
    pub fn from_env() -> Self {
        match env::var(TRACKER_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|err| {
                debug!(%err, var = TRACKER_ENV, "ignoring invalid tracker kind");
                Self::Auto
            }),
            Err(_) => Self::Auto,
        }
    }

    /// Resolves [`Auto`](Self::Auto) against the current stdout.
    #[must_use]
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto if console::ansi_supported() => Self::Ansi,
            Self::Auto => Self::Line,
            other => other,
        }
    }

    /// Builds the tracker this kind names.
    #[must_use]
    pub fn build(self) -> Arc<dyn ProgressTracker> {
        match self.resolve() {
            Self::Ansi => Arc::new(AnsiTracker::new()),
            Self::Log => Arc::new(LogTracker::new()),
            Self::Line | Self::Auto => Arc::new(LineTracker::new()),
        }
    }
}

static DEFAULT_TRACKER: LazyLock<Arc<dyn ProgressTracker>> = LazyLock::new(|| {
    let kind = TrackerKind::from_env().resolve();
    debug!(?kind, "initialising default progress tracker");
    kind.build()
});

/// The process-wide tracker shared by bars built without one.
///
/// Created on first use from [`TRACKER_ENV`] and the capabilities of stdout.
#[must_use]
pub fn default_tracker() -> Arc<dyn ProgressTracker> {
    DEFAULT_TRACKER.clone()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{CallbackTracker, ProgressTracker, TrackerKind};
    use crate::Progress;

    /// Kind Parsing
    #[test]
    fn test_tracker_kind_from_str() {
        assert_eq!("ANSI".parse::<TrackerKind>(), Ok(TrackerKind::Ansi));
        assert_eq!(" line ".parse::<TrackerKind>(), Ok(TrackerKind::Line));
        assert_eq!("plain".parse::<TrackerKind>(), Ok(TrackerKind::Line));
        assert_eq!("log".parse::<TrackerKind>(), Ok(TrackerKind::Log));
        assert_eq!("".parse::<TrackerKind>(), Ok(TrackerKind::Auto));
        assert!("fancy".parse::<TrackerKind>().is_err());
    }

    /// Explicit kinds are never re-resolved.
    #[test]
    fn test_resolve_keeps_explicit_kinds() {
        assert_eq!(TrackerKind::Log.resolve(), TrackerKind::Log);
        assert_ne!(TrackerKind::Auto.resolve(), TrackerKind::Auto);
    }

    /// Last Active
    #[test]
    fn test_last_active() {
        let tracker: Arc<dyn ProgressTracker> = Arc::new(CallbackTracker::new(|_, _| {}));
        assert!(tracker.last_active().is_none());

        let bar = Progress::builder(3u64).tracker(tracker.clone()).build();
        assert!(tracker.last_active().is_some_and(|top| top.ptr_eq(&bar)));
    }
}
