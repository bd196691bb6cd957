//! Rope-based text buffer abstraction.
//!
//! Positions are char offsets (Unicode scalar values) into the whole document. Every content
//! mutation goes through `replace_range`, which:
//! * journals the removed and inserted text plus the pre-edit selection (the transient edit
//!   history that undo recording reads back),
//! * shifts format spans and no-spell regions through the edit,
//! * publishes an `EditDelta` to the subscriber unless notifications are blocked.
//!
//! Formatting changes never alter content; when notifications are live they publish a
//! `(pos, 0, 0)` delta which consumers treat as formatting-only.

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use ropey::Rope;
use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut, Range};
use tracing::trace;

pub mod word;

pub use word::{MoveMode, WordCursor, WordSpan, is_word_char, word_at};

/// A single buffer mutation: at `pos`, `removed` chars were replaced by `added` chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditDelta {
    pub pos: usize,
    pub removed: usize,
    pub added: usize,
}

impl EditDelta {
    pub fn new(pos: usize, removed: usize, added: usize) -> Self {
        Self {
            pos,
            removed,
            added,
        }
    }

    /// True for formatting-only notifications.
    pub fn is_format_only(&self) -> bool {
        self.removed == 0 && self.added == 0
    }
}

/// Cursor selection: `anchor` is where the selection started, `position` where the caret is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub anchor: usize,
    pub position: usize,
}

impl Selection {
    pub fn new(anchor: usize, position: usize) -> Self {
        Self { anchor, position }
    }
    pub fn collapsed(pos: usize) -> Self {
        Self {
            anchor: pos,
            position: pos,
        }
    }
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.position
    }
    pub fn start(&self) -> usize {
        self.anchor.min(self.position)
    }
    pub fn end(&self) -> usize {
        self.anchor.max(self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    /// Wavy underline conventionally used for spelling errors.
    SpellCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const RED: Rgb = Rgb(0xff, 0x00, 0x00);
}

/// Character format applied to a range. `CharFormat::default()` is "no formatting".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharFormat {
    pub underline: UnderlineStyle,
    pub underline_color: Option<Rgb>,
}

impl CharFormat {
    pub fn spell_error(color: Rgb) -> Self {
        Self {
            underline: UnderlineStyle::SpellCheck,
            underline_color: Some(color),
        }
    }
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// A non-default format over the half-open char range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpan {
    pub start: usize,
    pub end: usize,
    pub format: CharFormat,
}

/// Journal entry describing one content mutation, captured before the removed text is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientEdit {
    pub delta: EditDelta,
    pub removed_text: String,
    pub inserted_text: String,
    pub selection_before: Selection,
}

/// Capability interface the spelling core needs from a host buffer.
pub trait TextBuffer {
    /// Document length in chars.
    fn len_chars(&self) -> usize;
    fn char_at(&self, pos: usize) -> Option<char>;
    /// Text in `[start, end)`, clamped to the document.
    fn text_in_range(&self, start: usize, end: usize) -> String;
    fn replace_range(&mut self, start: usize, end: usize, text: &str);
    fn apply_format(&mut self, start: usize, end: usize, format: CharFormat);
    fn format_at(&self, pos: usize) -> CharFormat;
    fn selection(&self) -> Selection;
    fn set_selection(&mut self, selection: Selection);
    /// Start publishing edit notifications. Replaces any previous subscriber.
    fn subscribe(&mut self) -> Receiver<EditDelta>;
    fn unsubscribe(&mut self);
    /// Block or unblock notifications, returning the previous state.
    fn set_notifications_blocked(&mut self, blocked: bool) -> bool;
    /// True when any part of `[start, end)` (or the point `start` for empty ranges) is tagged
    /// as excluded from spell checking.
    fn is_no_spell(&self, start: usize, end: usize) -> bool;
    /// Pop the oldest journaled content mutation.
    fn take_transient_edit(&mut self) -> Option<TransientEdit>;
    fn clear_transient_history(&mut self);

    /// Block notifications until the returned guard is dropped.
    fn block_notifications(&mut self) -> NotificationBlocker<'_, Self>
    where
        Self: Sized,
    {
        let previous = self.set_notifications_blocked(true);
        NotificationBlocker {
            buffer: self,
            previous,
        }
    }
}

/// Scoped notification suppression; restores the previous state on drop, including early
/// returns and unwinding.
pub struct NotificationBlocker<'a, B: TextBuffer + ?Sized> {
    buffer: &'a mut B,
    previous: bool,
}

impl<B: TextBuffer + ?Sized> Deref for NotificationBlocker<'_, B> {
    type Target = B;
    fn deref(&self) -> &B {
        self.buffer
    }
}

impl<B: TextBuffer + ?Sized> DerefMut for NotificationBlocker<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.buffer
    }
}

impl<B: TextBuffer + ?Sized> Drop for NotificationBlocker<'_, B> {
    fn drop(&mut self) {
        self.buffer.set_notifications_blocked(self.previous);
    }
}

/// A text buffer backed by a `ropey::Rope`.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
    formats: Vec<FormatSpan>,
    no_spell: Vec<Range<usize>>,
    selection: Selection,
    subscriber: Option<Sender<EditDelta>>,
    notifications_blocked: bool,
    journal: VecDeque<TransientEdit>,
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("len_chars", &self.rope.len_chars())
            .field("formats", &self.formats.len())
            .field("subscribed", &self.subscriber.is_some())
            .finish()
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.rope.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice.
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self> {
        Ok(Self {
            rope: Rope::from_str(content),
            name: name.into(),
            formats: Vec::new(),
            no_spell: Vec::new(),
            selection: Selection::default(),
            subscriber: None,
            notifications_blocked: false,
            journal: VecDeque::new(),
        })
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Insert `text` at `pos`.
    pub fn insert(&mut self, pos: usize, text: &str) {
        self.replace_range(pos, pos, text);
    }

    /// Delete `[start, end)` and return the removed text.
    pub fn remove(&mut self, start: usize, end: usize) -> String {
        let removed = self.text_in_range(start, end);
        self.replace_range(start, end, "");
        removed
    }

    /// Non-default format spans, sorted and non-overlapping.
    pub fn format_spans(&self) -> &[FormatSpan] {
        &self.formats
    }

    /// Tag `[start, end)` as excluded from spell checking.
    pub fn mark_no_spell(&mut self, start: usize, end: usize) {
        let (s, e) = self.clamp(start, end);
        if s < e {
            self.no_spell.push(s..e);
        }
    }

    pub fn clear_no_spell(&mut self) {
        self.no_spell.clear();
    }

    fn clamp(&self, start: usize, end: usize) -> (usize, usize) {
        let total = self.rope.len_chars();
        let s = start.min(total);
        let e = end.min(total).max(s);
        (s, e)
    }

    fn publish(&mut self, delta: EditDelta) {
        if self.notifications_blocked {
            return;
        }
        if let Some(tx) = &self.subscriber
            && tx.send(delta).is_err()
        {
            trace!(target: "text.buffer", "subscriber_gone");
            self.subscriber = None;
        }
    }

    fn shift_ranges(&mut self, delta: EditDelta) {
        let shift = |r: Range<usize>| -> Range<usize> {
            shift_start(r.start, delta)..shift_end(r.end, delta)
        };
        self.formats = self
            .formats
            .iter()
            .filter_map(|span| {
                let r = shift(span.start..span.end);
                (r.start < r.end).then_some(FormatSpan {
                    start: r.start,
                    end: r.end,
                    format: span.format,
                })
            })
            .collect();
        self.no_spell = self
            .no_spell
            .iter()
            .cloned()
            .map(shift)
            .filter(|r| r.start < r.end)
            .collect();
    }
}

// Span start at the edit point moves behind inserted text.
fn shift_start(x: usize, d: EditDelta) -> usize {
    if x < d.pos {
        x
    } else if x >= d.pos + d.removed {
        x - d.removed + d.added
    } else {
        d.pos + d.added
    }
}

// Span end at the edit point stays in front of inserted text.
fn shift_end(x: usize, d: EditDelta) -> usize {
    if x <= d.pos {
        x
    } else if x >= d.pos + d.removed {
        x - d.removed + d.added
    } else {
        d.pos
    }
}

impl TextBuffer for Buffer {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        (pos < self.rope.len_chars()).then(|| self.rope.char(pos))
    }

    fn text_in_range(&self, start: usize, end: usize) -> String {
        let (s, e) = self.clamp(start, end);
        if s >= e {
            return String::new();
        }
        self.rope.slice(s..e).to_string()
    }

    fn replace_range(&mut self, start: usize, end: usize, text: &str) {
        let (s, e) = self.clamp(start, end);
        if s == e && text.is_empty() {
            return;
        }
        let removed_text = self.text_in_range(s, e);
        let selection_before = self.selection;
        if s < e {
            self.rope.remove(s..e);
        }
        if !text.is_empty() {
            self.rope.insert(s, text);
        }
        let delta = EditDelta::new(s, e - s, text.chars().count());
        self.shift_ranges(delta);
        self.selection = Selection::collapsed(s + delta.added);
        trace!(target: "text.buffer", pos = s, removed = delta.removed, added = delta.added, "replace_range");
        // Journal only what the subscriber will see.
        if self.subscriber.is_some() && !self.notifications_blocked {
            self.journal.push_back(TransientEdit {
                delta,
                removed_text,
                inserted_text: text.to_string(),
                selection_before,
            });
        }
        self.publish(delta);
    }

    fn apply_format(&mut self, start: usize, end: usize, format: CharFormat) {
        let (s, e) = self.clamp(start, end);
        if s >= e {
            return;
        }
        let mut next = Vec::with_capacity(self.formats.len() + 2);
        for span in self.formats.drain(..) {
            if span.end <= s || span.start >= e {
                next.push(span);
                continue;
            }
            if span.start < s {
                next.push(FormatSpan {
                    start: span.start,
                    end: s,
                    format: span.format,
                });
            }
            if span.end > e {
                next.push(FormatSpan {
                    start: e,
                    end: span.end,
                    format: span.format,
                });
            }
        }
        if !format.is_default() {
            next.push(FormatSpan {
                start: s,
                end: e,
                format,
            });
        }
        next.sort_by_key(|span| span.start);
        self.formats = next;
        self.publish(EditDelta::new(s, 0, 0));
    }

    fn format_at(&self, pos: usize) -> CharFormat {
        self.formats
            .iter()
            .find(|span| span.start <= pos && pos < span.end)
            .map(|span| span.format)
            .unwrap_or_default()
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) {
        let total = self.rope.len_chars();
        self.selection = Selection::new(selection.anchor.min(total), selection.position.min(total));
    }

    fn subscribe(&mut self) -> Receiver<EditDelta> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscriber = Some(tx);
        self.journal.clear();
        trace!(target: "text.buffer", buffer = self.name.as_str(), "subscribe");
        rx
    }

    fn unsubscribe(&mut self) {
        self.subscriber = None;
        self.journal.clear();
        trace!(target: "text.buffer", buffer = self.name.as_str(), "unsubscribe");
    }

    fn set_notifications_blocked(&mut self, blocked: bool) -> bool {
        std::mem::replace(&mut self.notifications_blocked, blocked)
    }

    fn is_no_spell(&self, start: usize, end: usize) -> bool {
        self.no_spell.iter().any(|r| {
            if start == end {
                r.start <= start && start < r.end
            } else {
                r.start < end && start < r.end
            }
        })
    }

    fn take_transient_edit(&mut self) -> Option<TransientEdit> {
        self.journal.pop_front()
    }

    fn clear_transient_history(&mut self) {
        self.journal.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn create_buffer_and_read_text() {
        let b = Buffer::from_str("test", "hello\nworld").unwrap();
        assert_eq!(b.line_count(), 2);
        assert_eq!(b.len_chars(), 11);
        assert_eq!(b.text_in_range(6, 11), "world");
        assert_eq!(b.to_string(), "hello\nworld");
    }

    #[test]
    fn char_offsets_are_scalar_values() {
        let b = Buffer::from_str("t", "café au lait").unwrap();
        assert_eq!(b.char_at(3), Some('é'));
        assert_eq!(b.text_in_range(0, 4), "café");
        assert_eq!(b.char_at(100), None);
    }

    #[test]
    fn replace_publishes_delta_and_journals_removed_text() {
        let mut b = Buffer::from_str("t", "the cat sat").unwrap();
        let rx = b.subscribe();
        b.set_selection(Selection::new(4, 7));
        b.replace_range(4, 7, "dogs");
        assert_eq!(b.to_string(), "the dogs sat");
        assert_eq!(rx.try_recv().unwrap(), EditDelta::new(4, 3, 4));
        let edit = b.take_transient_edit().unwrap();
        assert_eq!(edit.removed_text, "cat");
        assert_eq!(edit.inserted_text, "dogs");
        assert_eq!(edit.selection_before, Selection::new(4, 7));
        assert_eq!(b.selection(), Selection::collapsed(8));
        assert!(b.take_transient_edit().is_none());
    }

    #[test]
    fn blocked_notifications_are_not_published() {
        let mut b = Buffer::from_str("t", "abc").unwrap();
        let rx = b.subscribe();
        {
            let mut guard = b.block_notifications();
            guard.apply_format(0, 3, CharFormat::spell_error(Rgb::RED));
        }
        assert!(rx.try_recv().is_err());
        b.apply_format(0, 1, CharFormat::default());
        assert_eq!(rx.try_recv().unwrap(), EditDelta::new(0, 0, 0));
    }

    #[test]
    fn blocked_content_edit_is_not_journaled() {
        let mut b = Buffer::from_str("t", "xyz").unwrap();
        let rx = b.subscribe();
        {
            let mut guard = b.block_notifications();
            guard.replace_range(0, 0, "a");
        }
        assert!(b.take_transient_edit().is_none());
        b.replace_range(0, 0, "b");
        assert_eq!(b.to_string(), "baxyz");
        assert_eq!(rx.try_recv().unwrap(), EditDelta::new(0, 0, 1));
        let edit = b.take_transient_edit().unwrap();
        assert_eq!(edit.inserted_text, "b");
        assert!(b.take_transient_edit().is_none());
    }

    #[test]
    fn blocker_restores_previous_state() {
        let mut b = Buffer::from_str("t", "abc").unwrap();
        b.set_notifications_blocked(true);
        {
            let _guard = b.block_notifications();
        }
        assert!(b.set_notifications_blocked(false));
    }

    #[test]
    fn format_spans_split_and_shift() {
        let mut b = Buffer::from_str("t", "aaaa bbbb cccc").unwrap();
        let err = CharFormat::spell_error(Rgb::RED);
        b.apply_format(0, 14, err);
        b.apply_format(5, 9, CharFormat::default());
        assert_eq!(b.format_spans().len(), 2);
        assert_eq!(b.format_at(6), CharFormat::default());
        assert_eq!(b.format_at(10), err);
        b.insert(0, "xx");
        assert_eq!(b.format_spans()[0].start, 2);
        assert_eq!(b.format_at(12), err);
        b.remove(2, 8);
        assert_eq!(b.format_spans()[0].start, 5);
    }

    #[test]
    fn no_spell_regions_follow_edits() {
        let mut b = Buffer::from_str("t", "see http://x.io now").unwrap();
        b.mark_no_spell(4, 15);
        assert!(b.is_no_spell(4, 8));
        assert!(!b.is_no_spell(0, 3));
        b.insert(0, "please ");
        assert!(b.is_no_spell(11, 15));
        assert!(!b.is_no_spell(4, 8));
    }

    #[test]
    fn dropped_receiver_unsubscribes() {
        let mut b = Buffer::from_str("t", "abc").unwrap();
        drop(b.subscribe());
        b.insert(3, "d");
        b.insert(4, "e");
        assert_eq!(b.to_string(), "abcde");
    }

    #[test]
    fn empty_replace_is_ignored() {
        let mut b = Buffer::from_str("t", "abc").unwrap();
        let rx = b.subscribe();
        b.replace_range(1, 1, "");
        assert!(rx.try_recv().is_err());
        assert!(b.take_transient_edit().is_none());
    }
}
