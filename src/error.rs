//! Error types for bar construction and rendering.

use compact_str::CompactString;
use thiserror::Error;

/// Errors raised while building a [`BarFormat`](crate::BarFormat).
///
/// These are construction-time failures: a format that fails validation is never
/// handed out, so every rendered bar can assume single-cell glyphs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BarFormatError {
    /// No fill glyphs were supplied.
    #[error("an empty sequence was specified for the fill glyphs")]
    EmptyFillGlyphs,

    /// A fill glyph spans more than one cell.
    #[error("fill glyph {glyph:?} is not exactly one column wide")]
    WideGlyph {
        /// The offending glyph.
        glyph: CompactString,
    },
}

/// Errors returned by [`Progress::format`](crate::Progress::format).
///
/// Rendering failures are recoverable. Trackers skip the affected bar and keep going.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The requested width cannot hold the title, brackets, progress text and a body.
    #[error("not enough space to fit the progress bar: width {width}, need at least {required}")]
    InsufficientWidth {
        /// The resolved width that was rendered into.
        width: usize,
        /// The smallest width that would have fit.
        required: usize,
    },
}

/// Returned when a tracker name does not match any [`TrackerKind`](crate::tracker::TrackerKind).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown tracker kind {value:?}, expected one of auto, ansi, line, log")]
pub struct ParseTrackerKindError {
    /// The rejected input.
    pub value: String,
}
