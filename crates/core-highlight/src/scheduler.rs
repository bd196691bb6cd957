//! Re-check scheduling.
//!
//! Producers report each content edit via `mark`. Pending spans are kept in current-document
//! coordinates: every later edit shifts or widens the spans queued before it. On `take` the
//! spans are widened to word boundaries, sorted, and overlapping or touching ranges are
//! merged, so each affected word is checked once per flush.
//!
//! Invariants:
//! * Returned ranges are sorted ascending, non-overlapping and non-touching.
//! * After `take`, the queue is empty (one-shot consumption).
//! * A single edit yields exactly `affected_range` of that edit.

use crate::affected_span;
use core_text::{EditDelta, TextBuffer};
use std::ops::Range;

#[derive(Debug, Default)]
pub struct CheckScheduler {
    pending: Vec<Range<usize>>,
}

/// Ranges ready for checking plus how many raw spans were folded together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scheduled {
    pub ranges: Vec<Range<usize>>,
    pub coalesced: usize,
}

impl CheckScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the text touched by `delta`. Formatting-only deltas are ignored.
    pub fn mark(&mut self, delta: EditDelta) {
        if delta.is_format_only() {
            return;
        }
        for span in &mut self.pending {
            *span = shift_through(span.clone(), delta);
        }
        self.pending.push(delta.pos..delta.pos + delta.added);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn take<B: TextBuffer + ?Sized>(&mut self, buffer: &B) -> Scheduled {
        let mut spans: Vec<Range<usize>> = self
            .pending
            .drain(..)
            .map(|span| affected_span(buffer, span.start, span.end))
            .collect();
        spans.sort_by_key(|r| r.start);

        let mut out: Vec<Range<usize>> = Vec::with_capacity(spans.len());
        let mut coalesced = 0;
        for span in spans {
            match out.last_mut() {
                Some(last) if span.start <= last.end => {
                    last.end = last.end.max(span.end);
                    coalesced += 1;
                }
                _ => out.push(span),
            }
        }
        Scheduled {
            ranges: out,
            coalesced,
        }
    }
}

/// Map a queued span through a later edit.
fn shift_through(span: Range<usize>, d: EditDelta) -> Range<usize> {
    let removed_end = d.pos + d.removed;
    if d.pos >= span.end {
        span
    } else if removed_end <= span.start {
        let start = span.start - d.removed + d.added;
        start..start + span.len()
    } else {
        let end = if span.end >= removed_end {
            span.end - d.removed + d.added
        } else {
            d.pos + d.added
        };
        span.start.min(d.pos)..end.max(d.pos + d.added)
    }
}
