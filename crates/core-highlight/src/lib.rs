//! Incremental spell-check highlighting.
//!
//! `Highlighter::recheck` walks a char range word by word and underlines the words the
//! speller rejects. Edits are funnelled through `schedule` so a keystroke only re-checks the
//! word(s) it touched (`affected_range`), not the whole document.
//!
//! Formatting passes run with buffer notifications blocked: underline changes are not content
//! edits and must never reach undo recording or schedule another pass.

use core_spell::Speller;
use core_text::{CharFormat, EditDelta, MoveMode, TextBuffer, WordCursor, WordSpan, is_word_char};
use std::ops::Range;
use tracing::{debug, trace};

pub mod metrics;
pub mod scheduler;

pub use metrics::{CheckMetrics, CheckMetricsSnapshot};
pub use scheduler::{CheckScheduler, Scheduled};

/// Outcome of one formatting pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckStats {
    pub words_checked: usize,
    pub misspelled: usize,
    pub no_spell_skipped: usize,
}

impl CheckStats {
    fn absorb(&mut self, other: CheckStats) {
        self.words_checked += other.words_checked;
        self.misspelled += other.misspelled;
        self.no_spell_skipped += other.no_spell_skipped;
    }
}

/// Minimal re-check window for an edit: from the word start at or before `delta.pos` to the
/// word end at or after `delta.pos + delta.added`.
pub fn affected_range<B: TextBuffer + ?Sized>(buffer: &B, delta: EditDelta) -> (usize, usize) {
    let span = affected_span(buffer, delta.pos, delta.pos + delta.added);
    (span.start, span.end)
}

pub(crate) fn affected_span<B: TextBuffer + ?Sized>(
    buffer: &B,
    start: usize,
    end: usize,
) -> Range<usize> {
    let len = buffer.len_chars();
    let start = start.min(len);
    let end = end.min(len).max(start);

    let mut cursor = WordCursor::new(buffer, start);
    cursor.move_word_start(MoveMode::MoveAnchor);
    let from = cursor.position().min(start);

    // Text inserted in front of a word (a split, or a new separator) re-checks that word.
    let mut cursor = WordCursor::new(buffer, end);
    cursor.move_word_end(MoveMode::MoveAnchor);
    from..cursor.position().max(end)
}

#[derive(Debug)]
pub struct Highlighter {
    misspelled: CharFormat,
    scheduler: CheckScheduler,
    metrics: CheckMetrics,
}

impl Highlighter {
    pub fn new(misspelled: CharFormat) -> Self {
        Self {
            misspelled,
            scheduler: CheckScheduler::new(),
            metrics: CheckMetrics::default(),
        }
    }

    pub fn misspelled_format(&self) -> CharFormat {
        self.misspelled
    }

    /// Applies to later passes; existing underlines keep their old format until re-checked.
    pub fn set_misspelled_format(&mut self, format: CharFormat) {
        self.misspelled = format;
    }

    pub fn metrics(&self) -> &CheckMetrics {
        &self.metrics
    }

    /// Check `[start, end)` (`end = None`: to the end of the document). The last word is
    /// checked whole even if it extends past `end`.
    pub fn recheck<B: TextBuffer>(
        &self,
        buffer: &mut B,
        speller: &Speller,
        start: usize,
        end: Option<usize>,
    ) -> CheckStats {
        let mut buffer = buffer.block_notifications();
        let len = buffer.len_chars();
        let end = end.unwrap_or(len).min(len);
        let mut stats = CheckStats::default();
        let mut pos = skip_non_word(&*buffer, start.min(len), end);

        while pos < end {
            let span = {
                let mut cursor = WordCursor::new(&*buffer, pos);
                cursor.move_word_end(MoveMode::KeepAnchor);
                cursor.selected_span()
            };
            if !span.is_empty() {
                let correct = if buffer.is_no_spell(span.start, span.end) {
                    stats.no_spell_skipped += 1;
                    true
                } else {
                    stats.words_checked += 1;
                    speller.check_word(&span.text)
                };
                trace!(target: "highlight.check", word = span.text.as_str(), start = span.start, correct, "word");
                let format = if correct {
                    CharFormat::default()
                } else {
                    stats.misspelled += 1;
                    self.misspelled
                };
                buffer.apply_format(span.start, span.end, format);
            }
            let next = skip_non_word(&*buffer, span.end.max(pos), end);
            pos = if next > pos { next } else { pos + 1 };
        }

        self.metrics.record_pass(&stats);
        debug!(target: "highlight.check", start, end, words = stats.words_checked, misspelled = stats.misspelled, "recheck");
        stats
    }

    /// Queue the text touched by an edit for the next `flush`.
    pub fn schedule(&mut self, delta: EditDelta) {
        self.scheduler.mark(delta);
    }

    pub fn has_pending(&self) -> bool {
        !self.scheduler.is_empty()
    }

    /// Drop queued work (the buffer is going away or will be fully re-checked).
    pub fn discard_pending(&mut self) {
        self.scheduler.clear();
    }

    /// Re-check every scheduled range. Each range is reset to the default format first so
    /// text typed into an underlined word does not inherit the underline.
    pub fn flush<B: TextBuffer>(&mut self, buffer: &mut B, speller: &Speller) -> CheckStats {
        let Scheduled { ranges, coalesced } = self.scheduler.take(&*buffer);
        self.metrics.record_schedule(ranges.len() + coalesced, coalesced);
        let mut total = CheckStats::default();
        for range in ranges {
            self.reset_format(buffer, range.start, range.end);
            total.absorb(self.recheck(buffer, speller, range.start, Some(range.end)));
        }
        total
    }

    /// Set the default format over `[start, end)` without notifying.
    pub fn reset_format<B: TextBuffer>(&self, buffer: &mut B, start: usize, end: usize) {
        let mut buffer = buffer.block_notifications();
        buffer.apply_format(start, end, CharFormat::default());
    }

    /// Underlined words, in document order.
    pub fn misspellings<B: TextBuffer + ?Sized>(&self, buffer: &B) -> Vec<WordSpan> {
        let len = buffer.len_chars();
        let mut out = Vec::new();
        let mut pos = skip_non_word(buffer, 0, len);
        while pos < len {
            let mut cursor = WordCursor::new(buffer, pos);
            cursor.move_word_end(MoveMode::KeepAnchor);
            let span = cursor.selected_span();
            if !span.is_empty() && buffer.format_at(span.start) == self.misspelled {
                out.push(span.clone());
            }
            let next = skip_non_word(buffer, span.end.max(pos), len);
            pos = if next > pos { next } else { pos + 1 };
        }
        out
    }
}

fn skip_non_word<B: TextBuffer + ?Sized>(buffer: &B, mut pos: usize, end: usize) -> usize {
    while pos < end && !buffer.char_at(pos).is_some_and(is_word_char) {
        pos += 1;
    }
    pos
}
