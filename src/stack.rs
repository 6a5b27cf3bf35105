//! The stack of currently displayed progress bars.
//!
//! Every [`ProgressTracker`](crate::ProgressTracker) owns one [`ProgressStack`]. Bars push
//! themselves when they are entered and pop themselves when they exit, so the stack
//! mirrors the nesting of loops: the bottom entry is the outermost bar, the top entry the
//! innermost one.
//!
//! # Synchronization Strategy
//!
//! The stack uses a coarse-grained [`RwLock`](parking_lot::RwLock) around the list of
//! handles. Renderers take the read lock once per frame to clone the handles and then
//! format them without holding it, so a bar's own callbacks can touch the stack freely.

use std::{fmt, sync::Arc};

use parking_lot::RwLock;

use crate::Progress;

/// A LIFO collection of active [`Progress`] handles.
///
/// Cloning is cheap and every clone sees the same entries. A handle appears at most once.
#[derive(Clone, Default)]
pub struct ProgressStack {
    inner: Arc<RwLock<Vec<Progress>>>,
}

impl fmt::Debug for ProgressStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only the count, formatting entries would lock each bar.
        f.debug_struct("ProgressStack")
            .field("depth", &self.len())
            .finish()
    }
}

impl ProgressStack {
    /// Creates an empty stack.
    ///
    /// ```
    /// use stacked_progress::ProgressStack;
    ///
    /// let stack = ProgressStack::new();
    /// assert!(stack.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `progress` unless it is already on the stack.
    ///
    /// Returns the index it landed at, or `None` when it was already present.
    pub(crate) fn push_unique(&self, progress: &Progress) -> Option<usize> {
        let mut items = self.inner.write();
        if items.iter().any(|item| item.ptr_eq(progress)) {
            return None;
        }
        items.push(progress.clone());
        Some(items.len() - 1)
    }

    /// Pops `progress` only if it is the top entry. Returns whether it was removed.
    pub(crate) fn pop_if_top(&self, progress: &Progress) -> bool {
        let mut items = self.inner.write();
        if items.last().is_some_and(|top| top.ptr_eq(progress)) {
            drop(items.pop());
            true
        } else {
            false
        }
    }

    /// Returns whether `progress` is on the stack.
    #[must_use]
    pub fn contains(&self, progress: &Progress) -> bool {
        self.index_of(progress).is_some()
    }

    /// Returns the position of `progress`, counting from the bottom.
    #[must_use]
    pub fn index_of(&self, progress: &Progress) -> Option<usize> {
        self.inner.read().iter().position(|item| item.ptr_eq(progress))
    }

    /// The outermost entry.
    #[must_use]
    pub fn root(&self) -> Option<Progress> {
        self.inner.read().first().cloned()
    }

    /// The innermost entry.
    #[must_use]
    pub fn top(&self) -> Option<Progress> {
        self.inner.read().last().cloned()
    }

    /// Clones the handles, bottom to top.
    ///
    /// The returned list is detached from the stack: later pushes and pops do not
    /// affect it.
    #[must_use]
    pub fn items(&self) -> Vec<Progress> {
        self.inner.read().clone()
    }

    /// Removes every entry without touching the bars' own active flags.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// The number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if nothing is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
