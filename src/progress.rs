//! The progress handle: position, activation and redraw triggering.
//!
//! A [`Progress`] is the bookkeeping half of a progress bar. The iteration half is
//! [`ProgressIter`](crate::ProgressIter), which owns the wrapped iterator and advances
//! the handle on every item. Keeping the two apart lets the tracker's active stack hold
//! plain handles while the caller owns the iterator.
//!
//! Like the rest of the crate, the state is split into "hot" atomics (position, flags)
//! touched on every step and "cold" data (format, depth) behind a
//! [`RwLock`](parking_lot::RwLock).
//!
//! # Lifecycle
//!
//! 1. Built through [`ProgressBuilder`](crate::ProgressBuilder). If initially active the
//!    bar pushes itself onto its tracker's stack, then it is marked dirty so an
//!    auto-updating bar renders once at its starting position.
//! 2. Each [`inc`](Progress::inc) or [`set_position`](Progress::set_position) marks the
//!    bar dirty, which redraws through the tracker while auto-update is on.
//! 3. Reaching the total exits an auto-enter bar, popping it off the stack.

use std::{
    fmt,
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{
    BarFormat, ProgressBuilder, ProgressIter, ProgressStack, ProgressTracker,
    error::RenderError,
};

/// A cloneable handle to one progress bar.
///
/// Clones share state: advancing one advances all of them, and they compare as the same
/// entry on the active stack.
#[derive(Clone)]
pub struct Progress {
    shared: Arc<Shared>,
}

struct Shared {
    total: u64,
    auto_enter: bool,
    tracker: Arc<dyn ProgressTracker>,

    position: AtomicU64,
    active: AtomicBool,
    dirty: AtomicBool,
    auto_update: AtomicBool,

    cold: RwLock<Cold>,
}

struct Cold {
    format: Arc<BarFormat>,
    depth: Option<usize>,
}

/// Everything a handle needs at construction, collected by the builder.
pub(crate) struct Parts {
    pub(crate) total: u64,
    pub(crate) start: u64,
    pub(crate) auto_update: bool,
    pub(crate) auto_enter: bool,
    pub(crate) active: bool,
    pub(crate) format: Arc<BarFormat>,
    pub(crate) tracker: Arc<dyn ProgressTracker>,
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("position", &self.position())
            .field("total", &self.total())
            .field("active", &self.is_active())
            .field("dirty", &self.is_dirty())
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}

impl Progress {
    /// Starts a [`ProgressBuilder`] for a bar of `total` steps.
    #[must_use]
    pub fn builder(total: impl Into<u64>) -> ProgressBuilder {
        ProgressBuilder::new(total)
    }

    /// A bar over `0..end` on the default tracker.
    ///
    /// ```no_run
    /// use stacked_progress::Progress;
    ///
    /// for _ in Progress::to(200) {
    ///     // work
    /// }
    /// ```
    #[must_use]
    pub fn to(end: u64) -> ProgressIter<std::ops::Range<u64>> {
        ProgressBuilder::new(end).range(0..end)
    }

    /// Creates the handle and runs the construction protocol.
    pub(crate) fn from_parts(parts: Parts) -> Self {
        let Parts {
            total,
            start,
            auto_update,
            auto_enter,
            active,
            format,
            tracker,
        } = parts;

        let progress = Self {
            shared: Arc::new(Shared {
                total,
                auto_enter,
                tracker,
                position: AtomicU64::new(start),
                active: AtomicBool::new(active),
                dirty: AtomicBool::new(false),
                auto_update: AtomicBool::new(auto_update),
                cold: RwLock::new(Cold { format, depth: None }),
            }),
        };

        if active {
            // The flag is already set, so the guard must be bypassed.
            progress.enter(true);
        }
        progress.mark_dirty();
        progress
    }

    /// Returns `true` if both handles refer to the same bar.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // ========================================================================
    // State
    // ========================================================================

    /// The number of steps that makes the bar complete.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.shared.total
    }

    /// The current step.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.shared.position.load(Ordering::Acquire)
    }

    /// `position / total`. A bar with a total of zero reports `1.0`.
    ///
    /// The value is not clamped; rendering clamps it into `[0, 1]`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn progress_fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 1.0;
        }
        self.position() as f64 / total as f64
    }

    /// Returns `true` once the position has reached the total.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.position() >= self.total()
    }

    /// Returns whether the bar is currently entered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Returns whether the displayed state is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.shared.dirty.load(Ordering::Acquire)
    }

    /// Returns whether becoming dirty redraws immediately.
    #[must_use]
    pub fn auto_update(&self) -> bool {
        self.shared.auto_update.load(Ordering::Acquire)
    }

    /// Returns whether the bar exits by itself once complete.
    #[must_use]
    pub fn auto_enter(&self) -> bool {
        self.shared.auto_enter
    }

    /// The stack index recorded when the bar was last pushed.
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        self.shared.cold.read().depth
    }

    /// The format this bar renders with.
    #[must_use]
    pub fn bar_format(&self) -> Arc<BarFormat> {
        self.shared.cold.read().format.clone()
    }

    /// The tracker receiving this bar's redraws.
    #[must_use]
    pub fn tracker(&self) -> &Arc<dyn ProgressTracker> {
        &self.shared.tracker
    }

    /// The active stack shared with every bar on the same tracker.
    #[must_use]
    pub fn active_stack(&self) -> &ProgressStack {
        self.shared.tracker.active_stack()
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Advances the position by `amount` steps, saturating at `u64::MAX`.
    pub fn inc(&self, amount: u64) {
        let step = |position: u64| Some(position.saturating_add(amount));
        let previous = self
            .shared
            .position
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, step)
            .unwrap_or_else(|position| position);
        self.position_changed(previous.saturating_add(amount));
    }

    /// Moves to an absolute position.
    ///
    /// Positions normally only grow; moving backwards is allowed but makes a completed
    /// bar incomplete again.
    pub fn set_position(&self, position: u64) {
        self.shared.position.store(position, Ordering::Release);
        self.position_changed(position);
    }

    fn position_changed(&self, position: u64) {
        // Redraw first so the final state reaches the tracker before the bar leaves the stack.
        self.mark_dirty();
        if position >= self.total() && self.auto_enter() {
            self.exit(false);
        }
    }

    /// Marks the bar stale, redrawing right away while auto-update is on.
    pub fn mark_dirty(&self) {
        self.shared.dirty.store(true, Ordering::Release);
        if self.auto_update() {
            self.update(false);
        }
    }

    /// Hands the bar to its tracker for a redraw and clears the dirty flag.
    ///
    /// Inactive bars are skipped unless `ignore_active` is set.
    pub fn update(&self, ignore_active: bool) {
        if !self.is_active() && !ignore_active {
            return;
        }
        self.shared.tracker.update_progress(self);
        self.shared.dirty.store(false, Ordering::Release);
    }

    /// Turns auto-update on or off. Enabling it on a dirty bar redraws immediately.
    pub fn set_auto_update(&self, auto_update: bool) {
        if auto_update && self.is_dirty() {
            self.update(false);
        }
        self.shared.auto_update.store(auto_update, Ordering::Release);
    }

    /// Swaps the bar's format and marks it dirty.
    pub fn set_format(&self, format: impl Into<Arc<BarFormat>>) {
        self.shared.cold.write().format = format.into();
        self.mark_dirty();
    }

    /// Renders the bar into `width` cells, see [`BarFormat::render`].
    pub fn format(&self, width: usize) -> Result<String, RenderError> {
        self.bar_format().render(self, width)
    }

    // ========================================================================
    // Activation
    // ========================================================================

    /// Activates the bar and pushes it onto the active stack.
    ///
    /// Does nothing if the bar is already active, unless `ignore_active` is set. The
    /// recorded [`depth`](Self::depth) is the index the bar landed at.
    pub fn enter(&self, ignore_active: bool) {
        if self.is_active() && !ignore_active {
            return;
        }
        self.shared.active.store(true, Ordering::Release);
        self.shared.dirty.store(true, Ordering::Release);

        if let Some(depth) = self.active_stack().push_unique(self) {
            trace!(depth, total = self.total(), "progress entered");
            self.shared.cold.write().depth = Some(depth);
        }
    }

    /// Deactivates the bar and pops it if it is the top of the active stack.
    ///
    /// Does nothing if the bar is already inactive, unless `ignore_active` is set. A bar
    /// with active bars nested above it is deactivated but stays on the stack.
    pub fn exit(&self, ignore_active: bool) {
        if !self.is_active() && !ignore_active {
            return;
        }
        self.shared.active.store(false, Ordering::Release);

        let stack = self.active_stack();
        if stack.pop_if_top(self) {
            trace!(depth = ?self.depth(), "progress exited");
        } else if stack.contains(self) {
            debug!(
                depth = ?self.depth(),
                stack_len = stack.len(),
                "progress exited below the top of the stack, entry kept"
            );
        }
    }

    /// Sets the active flag, entering or exiting on a change.
    ///
    /// The flag is stored first and the stack is updated from the new value. Activating
    /// also marks the bar dirty so it renders in its new place.
    pub fn set_active(&self, active: bool) {
        let was_active = self.shared.active.swap(active, Ordering::AcqRel);
        match (was_active, active) {
            (false, true) => {
                self.enter(true);
                self.mark_dirty();
            }
            (true, false) => self.exit(true),
            _ => {}
        }
    }

    /// Enters the bar and returns a guard that exits it when dropped.
    ///
    /// The guard derefs to the bar, so it can be used in its place.
    #[must_use = "the bar exits as soon as the guard is dropped"]
    pub fn enter_scoped(&self) -> ActiveGuard {
        self.enter(false);
        ActiveGuard {
            progress: self.clone(),
        }
    }

    /// Runs `block` with the bar entered, exiting afterwards.
    ///
    /// The exit also runs if `block` panics.
    ///
    /// ```
    /// use stacked_progress::Progress;
    ///
    /// let bar = Progress::builder(3u64)
    ///     .active(false)
    ///     .callback(|_, _| {})
    ///     .build();
    /// let depth = bar.with_enter(|bar| bar.depth());
    /// assert_eq!(depth, Some(0));
    /// assert!(!bar.is_active());
    /// ```
    pub fn with_enter<R>(&self, block: impl FnOnce(&Self) -> R) -> R {
        let guard = self.enter_scoped();
        block(&guard)
    }
}

/// Keeps a [`Progress`] entered until dropped. See [`Progress::enter_scoped`].
#[derive(Debug)]
pub struct ActiveGuard {
    progress: Progress,
}

impl Deref for ActiveGuard {
    type Target = Progress;

    fn deref(&self) -> &Progress {
        &self.progress
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.progress.exit(false);
    }
}
