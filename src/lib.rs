//! # `stacked_progress`
//!
//! Iterator-wrapping progress bars that nest and redraw in place.
//!
//! Wrap any iterator and a bar advances with every item. Bars started inside other bars'
//! loops stack below them, and the whole stack is redrawn as one block:
//!
//! ```text
//! Epochs [=======               ] 3/10
//! Batch  [==============>       ] 68/100
//! ```
//!
//! * **Composable**: [`ProgressIter`] wraps an iterator by composition, items pass through
//!   untouched.
//! * **Nested**: each [`ProgressTracker`] owns a LIFO [`ProgressStack`] of active bars.
//! * **Smooth**: [`BarFormat`] renders sub-character progress with a sequence of fill glyphs.
//! * **Quiet on the wire**: the ANSI tracker throttles redraws and only erases its own block.
//!
//! ```
//! use stacked_progress::{ProgressBuilder, ProgressIteratorExt as _};
//!
//! let mut total = 0;
//! for n in (1..=4).progress_with(ProgressBuilder::new(4u64).callback(|_, _| {})) {
//!     total += n;
//! }
//! assert_eq!(total, 10);
//! ```
//!
//! ## Modules
//!
//! * [`builder`]: Fluent construction of [`Progress`] bars.
//! * [`console`]: Width and output adapters for trackers.
//! * [`error`]: Construction and rendering errors.
//! * [`format`]: [`BarFormat`] and the rendering algorithm.
//! * [`iter`]: Iterator adapters.
//! * [`progress`]: The [`Progress`] handle and its activation rules.
//! * [`stack`]: The active stack.
//! * [`tracker`]: Redraw sinks and the process-wide default.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod builder;
pub mod console;
pub mod error;
pub mod format;
pub mod iter;
pub mod progress;
pub mod stack;
pub mod tracker;

pub use builder::ProgressBuilder;
pub use error::{BarFormatError, RenderError};
pub use format::{BarFormat, BarFormatBuilder};
pub use iter::{ProgressIter, ProgressIteratorExt};
pub use progress::{ActiveGuard, Progress};
pub use stack::ProgressStack;
pub use tracker::{
    AnsiTracker, CallbackTracker, LineTracker, LogTracker, ProgressTracker, TrackerKind,
    default_tracker,
};
