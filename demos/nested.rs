//! Two nested bars on the default tracker.
//!
//! Run with `cargo run --example nested`. Set `STACKED_PROGRESS_TRACKER=line` to see the
//! plain fallback.

use std::{thread, time::Duration};

use stacked_progress::{BarFormat, ProgressBuilder, ProgressIteratorExt as _};

fn main() -> Result<(), stacked_progress::BarFormatError> {
    let outer = BarFormat::builder().title("Epochs").build()?;
    let inner = BarFormat::builder()
        .title("Batch ")
        .fill_glyphs(["▏", "▎", "▍", "▌", "▋", "▊", "▉", "█"])
        .empty_glyph("·")
        .max_width(60)
        .build()?;
    let inner = std::sync::Arc::new(inner);

    for epoch in (0..5).progress_with(ProgressBuilder::new(5u64).format(outer)) {
        inner.set_end_info(format!("epoch {epoch}"));
        for _ in (0..40).progress_with(ProgressBuilder::new(40u64).shared_format(inner.clone())) {
            thread::sleep(Duration::from_millis(15));
        }
    }
    Ok(())
}
