//! Iterator adapters for automatic progress tracking.
//!
//! [`ProgressIter`] composes an iterator with a [`Progress`] handle: every item pulled
//! through it advances the bar by one step. [`ProgressIteratorExt`] attaches one to any
//! iterator with a single method call.
//!
//! # Totals
//!
//! [`progress`](ProgressIteratorExt::progress) takes the total from
//! [`Iterator::size_hint`]. Iterators without an exact size report their lower bound,
//! so prefer [`progress_with_total`](ProgressIteratorExt::progress_with_total) for those.
//!
//! ```
//! use stacked_progress::ProgressIteratorExt as _;
//!
//! let mut seen = 0;
//! for _ in vec![1, 2, 3].into_iter().progress_with_callback(|_, _| {}) {
//!     seen += 1;
//! }
//! assert_eq!(seen, 3);
//! ```

use std::iter::FusedIterator;

use tracing::warn;

use crate::{Progress, ProgressBuilder};

/// An iterator adapter that advances a [`Progress`] on every item.
///
/// Exhaustion of the inner iterator is passed through unchanged. Dropping the adapter
/// while its auto-enter bar is still active (an early `break`) exits the bar.
#[derive(Debug)]
pub struct ProgressIter<I> {
    iter: I,
    progress: Progress,
}

impl<I> ProgressIter<I> {
    /// Wraps `iter`, advancing `progress` per item.
    ///
    /// Usually constructed via [`ProgressBuilder::wrap`] or [`ProgressIteratorExt`].
    pub const fn new(iter: I, progress: Progress) -> Self {
        Self { iter, progress }
    }

    /// The handle this iterator advances.
    pub const fn handle(&self) -> &Progress {
        &self.progress
    }
}

impl<I: Iterator> Iterator for ProgressIter<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.iter.next()?;
        self.progress.inc(1);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<I: ExactSizeIterator> ExactSizeIterator for ProgressIter<I> {}

impl<I: FusedIterator> FusedIterator for ProgressIter<I> {}

impl<I> Drop for ProgressIter<I> {
    fn drop(&mut self) {
        if self.progress.auto_enter() {
            self.progress.exit(false);
        }
    }
}

/// Extension trait to attach progress tracking to any iterator.
pub trait ProgressIteratorExt: Iterator + Sized {
    /// Wraps the iterator in a bar on the default tracker, sized from `size_hint`.
    fn progress(self) -> ProgressIter<Self>;

    /// Wraps the iterator in a bar of `total` steps on the default tracker.
    fn progress_with_total(self, total: u64) -> ProgressIter<Self>;

    /// Wraps the iterator in a bar built from `builder`.
    fn progress_with(self, builder: ProgressBuilder) -> ProgressIter<Self>;

    /// Wraps the iterator in a bar sized from `size_hint` that reports to `callback`.
    fn progress_with_callback<F>(self, callback: F) -> ProgressIter<Self>
    where
        F: Fn(&Progress, &[Progress]) + Send + Sync + 'static;

    /// The total inferred from `size_hint`.
    fn total_from_size_hint(&self) -> u64;
}

impl<I: Iterator> ProgressIteratorExt for I {
    fn progress(self) -> ProgressIter<Self> {
        let total = self.total_from_size_hint();
        self.progress_with_total(total)
    }

    fn progress_with_total(self, total: u64) -> ProgressIter<Self> {
        ProgressBuilder::new(total).wrap(self)
    }

    fn progress_with(self, builder: ProgressBuilder) -> ProgressIter<Self> {
        builder.wrap(self)
    }

    fn progress_with_callback<F>(self, callback: F) -> ProgressIter<Self>
    where
        F: Fn(&Progress, &[Progress]) + Send + Sync + 'static,
    {
        let total = self.total_from_size_hint();
        ProgressBuilder::new(total).callback(callback).wrap(self)
    }

    fn total_from_size_hint(&self) -> u64 {
        match self.size_hint() {
            (lower, Some(upper)) if lower == upper => upper as u64,
            (lower, _) => {
                warn!(lower, "iterator size is not exact, using its lower bound as the total");
                lower as u64
            }
        }
    }
}
