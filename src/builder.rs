//! Fluent interface for constructing [`Progress`] instances.
//!
//! Every option of a bar is set here: where it starts, whether it redraws by itself,
//! whether it enters and exits by itself, what it looks like and which tracker draws it.
//!
//! # Defaults
//!
//! * **Start:** position `0`.
//! * **Auto-update:** on. Every step is handed to the tracker immediately.
//! * **Auto-enter:** on. The bar is active from construction and exits once complete.
//! * **Active:** follows auto-enter unless set explicitly.
//! * **Format:** [`BarFormat::default`].
//! * **Tracker:** the process-wide [`default_tracker`](crate::tracker::default_tracker).

use std::{fmt, ops::Range, sync::Arc};

use crate::{
    BarFormat, CallbackTracker, Progress, ProgressIter, ProgressTracker,
    progress::Parts,
    tracker::default_tracker,
};

/// A builder for [`Progress`] bars and the iterators they wrap.
///
/// ```
/// use stacked_progress::ProgressBuilder;
///
/// let mut steps = 0;
/// let bar = ProgressBuilder::new(4u64)
///     .callback(|_, _| {})
///     .wrap(0..4);
/// for _ in bar {
///     steps += 1;
/// }
/// assert_eq!(steps, 4);
/// ```
#[derive(Clone)]
pub struct ProgressBuilder {
    total: u64,
    start: u64,
    auto_update: bool,
    auto_enter: bool,
    active: Option<bool>,
    format: Arc<BarFormat>,
    tracker: Option<Arc<dyn ProgressTracker>>,
}

impl fmt::Debug for ProgressBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBuilder")
            .field("total", &self.total)
            .field("start", &self.start)
            .field("auto_update", &self.auto_update)
            .field("auto_enter", &self.auto_enter)
            .field("active", &self.active)
            .field("format", &self.format)
            .field("custom_tracker", &self.tracker.is_some())
            .finish()
    }
}

impl ProgressBuilder {
    /// Starts building a bar of `total` steps.
    #[must_use]
    pub fn new(total: impl Into<u64>) -> Self {
        Self {
            total: total.into(),
            start: 0,
            auto_update: true,
            auto_enter: true,
            active: None,
            format: Arc::default(),
            tracker: None,
        }
    }

    /// Sets the starting position.
    #[must_use]
    pub const fn start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    /// Sets whether each change is handed to the tracker right away.
    #[must_use]
    pub const fn auto_update(mut self, auto_update: bool) -> Self {
        self.auto_update = auto_update;
        self
    }

    /// Sets whether the bar exits by itself once complete.
    #[must_use]
    pub const fn auto_enter(mut self, auto_enter: bool) -> Self {
        self.auto_enter = auto_enter;
        self
    }

    /// Sets whether the bar starts on the active stack. Defaults to the auto-enter setting.
    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Sets the bar's format.
    #[must_use]
    pub fn format(self, format: BarFormat) -> Self {
        self.shared_format(Arc::new(format))
    }

    /// Sets a format shared with other bars, including its end info.
    #[must_use]
    pub fn shared_format(mut self, format: Arc<BarFormat>) -> Self {
        self.format = format;
        self
    }

    /// Draws the bar through `tracker` instead of the default one.
    ///
    /// Bars nest only with other bars on the same tracker.
    #[must_use]
    pub fn tracker(mut self, tracker: Arc<dyn ProgressTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Draws the bar through a private [`CallbackTracker`] running `callback`.
    #[must_use]
    pub fn callback<F>(self, callback: F) -> Self
    where
        F: Fn(&Progress, &[Progress]) + Send + Sync + 'static,
    {
        self.tracker(Arc::new(CallbackTracker::new(callback)))
    }

    /// Builds a standalone handle, advanced through [`Progress::inc`].
    #[must_use]
    pub fn build(self) -> Progress {
        let active = self.active.unwrap_or(self.auto_enter);
        Progress::from_parts(Parts {
            total: self.total,
            start: self.start,
            auto_update: self.auto_update,
            auto_enter: self.auto_enter,
            active,
            format: self.format,
            tracker: self.tracker.unwrap_or_else(default_tracker),
        })
    }

    /// Builds the bar and wraps `iter` with it.
    #[must_use]
    pub fn wrap<I: IntoIterator>(self, iter: I) -> ProgressIter<I::IntoIter> {
        ProgressIter::new(iter.into_iter(), self.build())
    }

    /// Wraps `range`, starting at its start and completing at its end.
    #[must_use]
    pub fn range(mut self, range: Range<u64>) -> ProgressIter<Range<u64>> {
        self.start = range.start;
        self.total = range.end;
        self.wrap(range)
    }
}
