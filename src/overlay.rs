use chrono::NaiveDate;
use tracing::{debug, info, info_span, warn};

use crate::config::{WriteInstruction, DATE_TOKEN};
use crate::draw::{DrawOptions, DrawStyle};
use crate::error::{Result, TextNotFound};
use crate::logging::{STAMP_DRAW, STAMP_MATCH};
use crate::matcher::find_run;
use crate::parse::TextFragment;

/// Source of positioned text fragments for a page.
pub trait TextExtractor {
    /// Text fragments of a 1-based page, in reading order.
    fn page_fragments(&self, page_number: u32) -> Result<Vec<TextFragment>>;
}

/// A document that text can be drawn onto and serialized.
pub trait PageCanvas {
    fn draw_text(&mut self, page_index: usize, text: &str, options: &DrawOptions) -> Result<()>;

    fn save(&mut self) -> Result<Vec<u8>>;
}

/// Receives per-instruction outcomes of an overlay run.
pub trait Reporter {
    fn text_drawn(&mut self, _write: &WriteInstruction, _options: &DrawOptions) {}

    fn text_not_found(&mut self, _write: &WriteInstruction, _error: &TextNotFound) {}
}

/// Reports outcomes as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn text_drawn(&mut self, write: &WriteInstruction, options: &DrawOptions) {
        info!(
            target: STAMP_DRAW,
            search = write.search(),
            x = options.x,
            y = options.y,
            "drew {:?}",
            write.draw()
        );
    }

    fn text_not_found(&mut self, _write: &WriteInstruction, error: &TextNotFound) {
        warn!(target: STAMP_MATCH, "{}", error);
    }
}

/// Draws every instruction's text next to its search string and returns the
/// serialized document.
///
/// Instructions run in order. For each one the page's fragments are
/// extracted, the search string is located, and the draw text is placed at
/// the anchor of the last matched fragment plus the instruction's offsets.
/// A search string that is not found is reported and skipped; every other
/// error aborts the run.
pub fn apply<E, C, R>(
    extractor: &E,
    canvas: &mut C,
    style: &DrawStyle,
    page_number: u32,
    writes: &[WriteInstruction],
    reporter: &mut R,
) -> Result<Vec<u8>>
where
    E: TextExtractor + ?Sized,
    C: PageCanvas + ?Sized,
    R: Reporter + ?Sized,
{
    let _span = info_span!("apply", page = page_number, writes = writes.len()).entered();
    let page_index = page_number.saturating_sub(1) as usize;

    for write in writes {
        let fragments = extractor.page_fragments(page_number)?;
        let run = find_run(write.search(), &fragments);

        let Some(last) = run.last() else {
            let error = TextNotFound {
                search: write.search().to_string(),
            };
            reporter.text_not_found(write, &error);
            continue;
        };

        let (x, y) = last.anchor();
        let (x_offset, y_offset) = write.offset();
        debug!(
            target: STAMP_MATCH,
            search = write.search(),
            fragment = %last,
            "located search text"
        );

        let options = DrawOptions::at(x + x_offset, y + y_offset, style);
        canvas.draw_text(page_index, write.draw(), &options)?;
        reporter.text_drawn(write, &options);
    }

    canvas.save()
}

/// Formats a date like `Jan 5, 2024`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Replaces the first `{DATE}` token in `dest` with `date`.
pub fn resolve_dest(dest: &str, date: NaiveDate) -> String {
    dest.replacen(DATE_TOKEN, &format_date(date), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_has_no_day_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(format_date(date), "Jan 5, 2024");
    }

    #[test]
    fn only_the_first_token_is_replaced() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 12).unwrap();
        assert_eq!(
            resolve_dest("out/{DATE} - {DATE}.pdf", date),
            "out/Dec 12, 2023 - {DATE}.pdf"
        );
        assert_eq!(resolve_dest("plain.pdf", date), "plain.pdf");
    }
}
