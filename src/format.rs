//! Bar styling and the text rendering algorithm.
//!
//! A [`BarFormat`] describes how a bar looks: the glyphs used for the filled and empty
//! parts, the brackets around the body, an optional title and a pluggable function that
//! renders the numeric text after the bar.
//!
//! ```text
//! Title [======>        ] 18/40 copying
//! ^^^^^ ^               ^ ^^^^^ ^^^^^^^
//! title prefix   suffix-' text  end info
//! ```
//!
//! # Sub-character resolution
//!
//! The fill glyph sequence is ordered from "barely started" to "full". The last glyph
//! fills whole cells; the leading edge of the bar picks an in-between glyph based on the
//! fractional part of the filled width, so `["▏", "▎", "▍", "▌", "▋", "▊", "▉", "█"]`
//! animates smoothly even in narrow terminals.

use std::{fmt, sync::Arc};

use compact_str::{CompactString, ToCompactString};
use parking_lot::RwLock;
use unicode_width::UnicodeWidthStr;

use crate::{
    Progress,
    error::{BarFormatError, RenderError},
};

/// Renders the text placed after the bar, e.g. `18/40`.
pub type ProgressText = Arc<dyn Fn(&Progress, &BarFormat) -> String + Send + Sync>;

/// Width used when the console cannot report one.
pub const DEFAULT_FALLBACK_WIDTH: usize = 100;

/// An immutable description of how a progress bar is drawn.
///
/// The only mutable part is the end info string, which is shared by every bar holding
/// the same `Arc<BarFormat>`. Writes are last-writer-wins; callers that update it from
/// several threads must coordinate themselves.
pub struct BarFormat {
    fill: Vec<CompactString>,
    empty: CompactString,
    prefix: CompactString,
    suffix: CompactString,
    trail: Option<CompactString>,
    title: CompactString,
    progress_text: ProgressText,
    fallback_width: usize,
    max_width: Option<usize>,
    end_info: RwLock<CompactString>,
}

impl fmt::Debug for BarFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarFormat")
            .field("fill", &self.fill)
            .field("empty", &self.empty)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("trail", &self.trail)
            .field("title", &self.title)
            .field("fallback_width", &self.fallback_width)
            .field("max_width", &self.max_width)
            .field("end_info", &*self.end_info.read())
            .finish_non_exhaustive()
    }
}

impl Default for BarFormat {
    fn default() -> Self {
        Self {
            fill: vec![CompactString::const_new("=")],
            empty: CompactString::const_new(" "),
            prefix: CompactString::const_new("["),
            suffix: CompactString::const_new("]"),
            trail: None,
            title: CompactString::default(),
            progress_text: default_progress_text(),
            fallback_width: DEFAULT_FALLBACK_WIDTH,
            max_width: None,
            end_info: RwLock::default(),
        }
    }
}

fn default_progress_text() -> ProgressText {
    Arc::new(|progress, format| format.padded_progress(progress, "/"))
}

/// Terminal columns taken by `text`.
fn cells(text: &str) -> usize {
    text.width()
}

impl BarFormat {
    /// Starts a [`BarFormatBuilder`] seeded with the default look: `[====    ] 4/8`.
    #[must_use]
    pub fn builder() -> BarFormatBuilder {
        BarFormatBuilder::default()
    }

    /// The fill glyph sequence, from least to most filled.
    #[must_use]
    pub fn fill_glyphs(&self) -> &[CompactString] {
        &self.fill
    }

    /// The glyph that fills whole cells: the last in the sequence.
    #[must_use]
    pub fn full_glyph(&self) -> &str {
        self.fill.last().map_or("", CompactString::as_str)
    }

    /// The glyph used for unfilled cells.
    #[must_use]
    pub fn empty_glyph(&self) -> &str {
        &self.empty
    }

    /// The optional glyph drawn right after the leading edge.
    #[must_use]
    pub fn trail_glyph(&self) -> Option<&str> {
        self.trail.as_deref()
    }

    /// The title placed before the bar.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The width rendered into when the console reports none.
    #[must_use]
    pub const fn fallback_width(&self) -> usize {
        self.fallback_width
    }

    /// The upper bound on the rendered width, if any.
    #[must_use]
    pub const fn max_width(&self) -> Option<usize> {
        self.max_width
    }

    /// Returns the text appended after the progress numbers.
    #[must_use]
    pub fn end_info(&self) -> CompactString {
        self.end_info.read().clone()
    }

    /// Replaces the end info for every bar sharing this format.
    ///
    /// The new text shows up on the next redraw.
    pub fn set_end_info(&self, info: impl Into<CompactString>) {
        *self.end_info.write() = info.into();
    }

    /// Renders `current<separator>total`, left-padded so the text keeps the width of
    /// the total as the position gains digits.
    ///
    /// ```
    /// use stacked_progress::{BarFormat, Progress};
    ///
    /// let bar = Progress::builder(120u64)
    ///     .start(7)
    ///     .active(false)
    ///     .callback(|_, _| {})
    ///     .build();
    /// assert_eq!(BarFormat::default().padded_progress(&bar, "/"), "  7/120");
    /// ```
    #[must_use]
    pub fn padded_progress(&self, progress: &Progress, separator: &str) -> String {
        let current = progress.position().to_compact_string();
        let total = progress.total().to_compact_string();
        let padding = total.len().saturating_sub(current.len());
        format!("{}{current}{separator}{total}", " ".repeat(padding))
    }

    /// Picks the leading-edge glyph for the fractional part of a cell.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn in_between_glyph(&self, partial: f64) -> &str {
        let last = self.fill.len().saturating_sub(1);
        let index = ((partial * last as f64) as usize).min(last);
        self.fill.get(index).map_or("", CompactString::as_str)
    }

    /// Renders `progress` into a line of at most `width` cells.
    ///
    /// A `width` of zero means "unknown" and falls back to
    /// [`fallback_width`](Self::fallback_width). The result is clamped to
    /// [`max_width`](Self::max_width) when one is set.
    ///
    /// # Panics
    ///
    /// Panics if the body arithmetic does not add up to the available width, which
    /// indicates a bug in this function rather than bad input.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn render(&self, progress: &Progress, width: usize) -> Result<String, RenderError> {
        let width = if width == 0 { self.fallback_width } else { width };
        let width = self.max_width.map_or(width, |max| width.min(max));

        let prefix = format!("{} {}", self.title, self.prefix);
        let suffix = format!(
            "{} {} {}",
            self.suffix,
            (self.progress_text)(progress, self),
            self.end_info.read()
        );
        let trail = self.trail.as_deref().unwrap_or("");
        let trail_cells = cells(trail);

        let fixed = cells(&prefix) + cells(&suffix);
        let required = fixed + 1 + trail_cells;
        if width < required {
            return Err(RenderError::InsufficientWidth { width, required });
        }

        // Cells between the brackets, and what remains once the trail glyph has its slot.
        let available = width - fixed;
        let body = available - trail_cells;
        let full = self.full_glyph();

        if progress.is_complete() {
            return Ok(format!("{prefix}{}{suffix}", full.repeat(available)));
        }

        let fraction = progress.progress_fraction().clamp(0.0, 1.0);
        if fraction <= 0.0 {
            return Ok(format!("{prefix}{trail}{}{suffix}", self.empty.repeat(body)));
        }

        let raw = body as f64 * fraction;
        let left = (raw.floor() as usize).min(body - 1);
        let right = body - left - 1;
        let partial = (raw - left as f64) % 1.0;
        let middle = self.in_between_glyph(partial);

        assert_eq!(
            available,
            left + right + 1 + trail_cells,
            "{left} + {right} + 1 + {trail_cells} != {available}"
        );

        Ok(format!(
            "{prefix}{}{middle}{trail}{}{suffix}",
            full.repeat(left),
            self.empty.repeat(right)
        ))
    }
}

/// Fluent construction of a validated [`BarFormat`].
///
/// ```
/// use stacked_progress::BarFormat;
///
/// let format = BarFormat::builder()
///     .title("Copying")
///     .fill_glyphs(["-", "="])
///     .trail_glyph(">")
///     .max_width(60)
///     .build()
///     .unwrap();
/// assert_eq!(format.full_glyph(), "=");
/// ```
pub struct BarFormatBuilder {
    fill: Vec<CompactString>,
    empty: CompactString,
    prefix: CompactString,
    suffix: CompactString,
    trail: Option<CompactString>,
    title: CompactString,
    progress_text: ProgressText,
    fallback_width: usize,
    max_width: Option<usize>,
    end_info: CompactString,
}

impl fmt::Debug for BarFormatBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarFormatBuilder")
            .field("fill", &self.fill)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl Default for BarFormatBuilder {
    fn default() -> Self {
        let BarFormat {
            fill,
            empty,
            prefix,
            suffix,
            trail,
            title,
            progress_text,
            fallback_width,
            max_width,
            end_info,
        } = BarFormat::default();

        Self {
            fill,
            empty,
            prefix,
            suffix,
            trail,
            title,
            progress_text,
            fallback_width,
            max_width,
            end_info: end_info.into_inner(),
        }
    }
}

impl BarFormatBuilder {
    /// Sets the fill glyph sequence, ordered from least to most filled.
    #[must_use]
    pub fn fill_glyphs<S>(mut self, glyphs: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<CompactString>,
    {
        self.fill = glyphs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the glyph for unfilled cells.
    #[must_use]
    pub fn empty_glyph(mut self, glyph: impl Into<CompactString>) -> Self {
        self.empty = glyph.into();
        self
    }

    /// Sets the opening bracket.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<CompactString>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the closing bracket.
    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<CompactString>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Sets a glyph drawn right after the leading edge, e.g. `>` for `[===>   ]`.
    #[must_use]
    pub fn trail_glyph(mut self, glyph: impl Into<CompactString>) -> Self {
        self.trail = Some(glyph.into());
        self
    }

    /// Sets the title placed before the bar.
    #[must_use]
    pub fn title(mut self, title: impl Into<CompactString>) -> Self {
        self.title = title.into();
        self
    }

    /// Replaces the function rendering the text after the bar.
    ///
    /// An [`AnsiTracker`](crate::AnsiTracker) calls `render` while holding its redraw
    /// lock, so `render` must not advance or redraw bars on that same tracker.
    #[must_use]
    pub fn progress_text<F>(mut self, render: F) -> Self
    where
        F: Fn(&Progress, &BarFormat) -> String + Send + Sync + 'static,
    {
        self.progress_text = Arc::new(render);
        self
    }

    /// Sets the width used when the console reports none.
    #[must_use]
    pub const fn fallback_width(mut self, width: usize) -> Self {
        self.fallback_width = width;
        self
    }

    /// Caps the rendered width.
    #[must_use]
    pub const fn max_width(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }

    /// Sets the initial end info text.
    #[must_use]
    pub fn end_info(mut self, info: impl Into<CompactString>) -> Self {
        self.end_info = info.into();
        self
    }

    /// Validates the glyphs and produces the format.
    ///
    /// Fails when the fill sequence is empty or any fill glyph does not take exactly one
    /// terminal column.
    pub fn build(self) -> Result<BarFormat, BarFormatError> {
        if self.fill.is_empty() {
            return Err(BarFormatError::EmptyFillGlyphs);
        }
        if let Some(glyph) = self.fill.iter().find(|glyph| cells(glyph) != 1) {
            return Err(BarFormatError::WideGlyph {
                glyph: glyph.clone(),
            });
        }

        Ok(BarFormat {
            fill: self.fill,
            empty: self.empty,
            prefix: self.prefix,
            suffix: self.suffix,
            trail: self.trail,
            title: self.title,
            progress_text: self.progress_text,
            fallback_width: self.fallback_width,
            max_width: self.max_width,
            end_info: RwLock::new(self.end_info),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use unicode_width::UnicodeWidthStr;

    use super::BarFormat;
    use crate::{
        Progress,
        error::{BarFormatError, RenderError},
    };

    fn bar(total: u64, position: u64, format: BarFormat) -> Progress {
        Progress::builder(total)
            .start(position)
            .active(false)
            .format(format)
            .callback(|_, _| {})
            .build()
    }

    /// Glyph Validation
    #[test]
    fn test_rejects_bad_fill_glyphs() {
        let empty: [&str; 0] = [];
        assert_eq!(
            BarFormat::builder().fill_glyphs(empty).build().unwrap_err(),
            BarFormatError::EmptyFillGlyphs
        );
        assert_eq!(
            BarFormat::builder().fill_glyphs(["=", "=="]).build().unwrap_err(),
            BarFormatError::WideGlyph { glyph: "==".into() }
        );
        assert!(BarFormat::builder().fill_glyphs(["░", "▒", "▓", "█"]).build().is_ok());
    }

    /// Display Width
    /// Glyphs are measured in terminal columns, not chars.
    #[test]
    fn test_glyph_width_in_columns() {
        assert_eq!(
            BarFormat::builder().fill_glyphs(["全"]).build().unwrap_err(),
            BarFormatError::WideGlyph { glyph: "全".into() }
        );
        assert!(BarFormat::builder().fill_glyphs(["e\u{301}"]).build().is_ok());

        let titled = BarFormat::builder().title("全部").build().unwrap();
        let line = bar(10, 5, titled).format(20).unwrap();
        assert_eq!(line.width(), 20);
        assert!(line.starts_with("全部 ["));
    }

    /// Padded Numbers
    /// The text keeps the width of the total as digits grow.
    #[test]
    fn test_padded_progress() {
        let format = BarFormat::default();
        assert_eq!(format.padded_progress(&bar(200, 5, BarFormat::default()), "/"), "  5/200");
        assert_eq!(format.padded_progress(&bar(200, 50, BarFormat::default()), "/"), " 50/200");
        assert_eq!(format.padded_progress(&bar(200, 200, BarFormat::default()), " of "), "200 of 200");
    }

    /// Half Way
    /// 20 cells: " [" and "] 100/200 " leave 8 for the body.
    #[test]
    fn test_half_bar_default_format() {
        let line = bar(200, 100, BarFormat::default()).format(20).unwrap();
        assert_eq!(line, " [=====   ] 100/200 ");
        assert_eq!(line.chars().count(), 20);

        let two_step = BarFormat::builder().fill_glyphs(["-", "="]).build().unwrap();
        let line = bar(200, 100, two_step).format(20).unwrap();
        assert_eq!(line, " [====-   ] 100/200 ");
    }

    /// Empty and Full
    #[test]
    fn test_zero_and_complete() {
        let format = || BarFormat::builder().trail_glyph(">").build().unwrap();

        let line = bar(10, 0, format()).format(20).unwrap();
        assert_eq!(line, " [>         ]  0/10 ");

        // The trail slot is filled too once complete.
        let line = bar(10, 10, format()).format(20).unwrap();
        assert_eq!(line, " [==========] 10/10 ");
    }

    /// Trailing Glyph
    #[test]
    fn test_trail_glyph_follows_edge() {
        let format = BarFormat::builder().trail_glyph(">").build().unwrap();
        // " [" + "]  5/10 " = 10 cells, 10 left, 9 once the trail is reserved.
        let line = bar(10, 5, format).format(20).unwrap();
        assert_eq!(line, " [=====>    ]  5/10 ");
    }

    /// Sub-character Edge
    #[test]
    fn test_in_between_glyph() {
        let format = BarFormat::builder()
            .fill_glyphs(["0", "1", "2", "3", "4"])
            .empty_glyph(".")
            .build()
            .unwrap();
        // " [" + "] 3/8 " = 8 cells, body = 4. raw = 4 * 3/8 = 1.5, partial 0.5 -> index 2.
        let line = bar(8, 3, format).format(12).unwrap();
        assert_eq!(line, " [42..] 3/8 ");
    }

    /// Width Resolution
    #[test]
    fn test_fallback_and_max_width() {
        let format = BarFormat::builder().fallback_width(30).build().unwrap();
        assert_eq!(bar(4, 2, format).format(0).unwrap().chars().count(), 30);

        let format = BarFormat::builder().max_width(25).build().unwrap();
        assert_eq!(bar(4, 2, format).format(80).unwrap().chars().count(), 25);
    }

    /// Insufficient Width
    #[test]
    fn test_insufficient_width() {
        let progress = bar(10, 5, BarFormat::default());
        // " [" + "]  5/10 " = 10 cells, the body needs one more.
        assert!(progress.format(11).is_ok());
        assert_eq!(
            progress.format(10).unwrap_err(),
            RenderError::InsufficientWidth { width: 10, required: 11 }
        );

        let progress = bar(10, 5, BarFormat::builder().trail_glyph(">").build().unwrap());
        assert!(progress.format(11).is_err());
        assert!(progress.format(12).is_ok());
    }

    /// Width Invariant
    /// Every width and position renders to exactly the resolved width.
    #[test]
    fn test_rendered_width_is_exact() {
        let format = Arc::new(
            BarFormat::builder()
                .fill_glyphs(["a", "b", "c"])
                .trail_glyph(">")
                .title("t")
                .build()
                .unwrap(),
        );
        for width in 14..60 {
            for position in 0..=37 {
                let progress = Progress::builder(37u64)
                    .start(position)
                    .active(false)
                    .shared_format(format.clone())
                    .callback(|_, _| {})
                    .build();
                let line = progress.format(width).unwrap();
                assert_eq!(line.chars().count(), width, "width {width}, position {position}");
            }
        }
    }

    /// End Info
    /// Shared formats see the latest end info.
    #[test]
    fn test_end_info_is_shared() {
        let format = Arc::new(BarFormat::builder().end_info("start").build().unwrap());
        let build = || {
            Progress::builder(4u64)
                .active(false)
                .shared_format(format.clone())
                .callback(|_, _| {})
                .build()
        };
        let (a, b) = (build(), build());

        format.set_end_info("done");
        assert!(a.format(40).unwrap().ends_with(" done"));
        assert!(b.format(40).unwrap().ends_with(" done"));
    }
}
