//! Word-boundary cursor.
//!
//! Operates on any `TextBuffer` + position pair and is free of checker state. The base moves
//! treat only word characters (`_` or alphanumeric) as part of a word. Apostrophes are then
//! resolved with a one-character lookahead/lookback on the inward side:
//!
//! * `don't`, `O'Brien`: the apostrophe sits between word characters and is word-internal.
//! * `'tis`, `dogs'`: the apostrophe has no word character on its inward side and is
//!   treated as surrounding punctuation.

use crate::TextBuffer;

const APOSTROPHE: char = '\'';

/// Word character classification (`\w`).
pub fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn is_word(c: Option<char>) -> bool {
    c.is_some_and(is_word_char)
}

/// Whether a move drags the anchor along or extends the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveMode {
    #[default]
    MoveAnchor,
    KeepAnchor,
}

/// Half-open char range `[start, end)` and the text it denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl WordSpan {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Transient positional cursor over a buffer.
pub struct WordCursor<'a, B: TextBuffer + ?Sized> {
    buf: &'a B,
    anchor: usize,
    pos: usize,
}

impl<'a, B: TextBuffer + ?Sized> WordCursor<'a, B> {
    pub fn new(buf: &'a B, pos: usize) -> Self {
        let pos = pos.min(buf.len_chars());
        Self {
            buf,
            anchor: pos,
            pos,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn set_position(&mut self, pos: usize, mode: MoveMode) {
        self.pos = pos.min(self.buf.len_chars());
        if mode == MoveMode::MoveAnchor {
            self.anchor = self.pos;
        }
    }

    /// The `num`-th char after the cursor (1 = immediately after).
    pub fn next_char(&self, num: usize) -> Option<char> {
        next_char_at(self.buf, self.pos, num)
    }

    /// The `num`-th char before the cursor (1 = immediately before).
    pub fn prev_char(&self, num: usize) -> Option<char> {
        prev_char_at(self.buf, self.pos, num)
    }

    pub fn move_next_char(&mut self, mode: MoveMode) {
        if self.pos < self.buf.len_chars() {
            self.set_position(self.pos + 1, mode);
        }
    }

    /// True if the char immediately before or after the cursor is a word char.
    pub fn is_inside_word(&self) -> bool {
        is_word(self.next_char(1)) || is_word(self.prev_char(1))
    }

    pub fn is_word_char(&self, c: Option<char>) -> bool {
        is_word(c)
    }

    /// Move to the start of the word containing (or adjacent to) the cursor.
    pub fn move_word_start(&mut self, mode: MoveMode) {
        let mut p = self.base_word_start(self.pos);
        if next_char_at(self.buf, p, 1) == Some(APOSTROPHE) {
            if is_word(prev_char_at(self.buf, p, 1)) {
                p = self.word_left(p);
            } else {
                p = (p + 1).min(self.buf.len_chars());
            }
        } else if prev_char_at(self.buf, p, 1) == Some(APOSTROPHE)
            && is_word(prev_char_at(self.buf, p, 2))
        {
            // Skips the apostrophe and the word in front of it.
            p = self.word_left(p);
        }
        self.set_position(p, mode);
    }

    /// Move to the end of the word containing (or adjacent to) the cursor.
    pub fn move_word_end(&mut self, mode: MoveMode) {
        let mut p = self.base_word_end(self.pos);
        if prev_char_at(self.buf, p, 1) == Some(APOSTROPHE) {
            if is_word(next_char_at(self.buf, p, 1)) {
                p = self.word_right(p);
            } else {
                p = p.saturating_sub(1);
            }
        } else if next_char_at(self.buf, p, 1) == Some(APOSTROPHE)
            && is_word(next_char_at(self.buf, p, 2))
        {
            p = self.word_right(p);
        }
        self.set_position(p, mode);
    }

    /// Span between anchor and position, normalized so `start <= end`.
    pub fn selected_span(&self) -> WordSpan {
        let start = self.anchor.min(self.pos);
        let end = self.anchor.max(self.pos);
        WordSpan {
            start,
            end,
            text: self.buf.text_in_range(start, end),
        }
    }

    fn base_word_start(&self, mut p: usize) -> usize {
        while p > 0 && is_word(self.buf.char_at(p - 1)) {
            p -= 1;
        }
        p
    }

    fn base_word_end(&self, mut p: usize) -> usize {
        let len = self.buf.len_chars();
        while p < len && is_word(self.buf.char_at(p)) {
            p += 1;
        }
        p
    }

    // Boundary chars first, then the word in front of them.
    fn word_left(&self, mut p: usize) -> usize {
        while p > 0 && !is_word(self.buf.char_at(p - 1)) {
            p -= 1;
        }
        self.base_word_start(p)
    }

    fn word_right(&self, mut p: usize) -> usize {
        let len = self.buf.len_chars();
        while p < len && !is_word(self.buf.char_at(p)) {
            p += 1;
        }
        self.base_word_end(p)
    }
}

fn next_char_at<B: TextBuffer + ?Sized>(buf: &B, pos: usize, num: usize) -> Option<char> {
    if num == 0 {
        return None;
    }
    buf.char_at(pos + num - 1)
}

fn prev_char_at<B: TextBuffer + ?Sized>(buf: &B, pos: usize, num: usize) -> Option<char> {
    if num == 0 || pos < num {
        return None;
    }
    buf.char_at(pos - num)
}

/// The word containing (or adjacent to) `pos`.
pub fn word_at<B: TextBuffer + ?Sized>(buf: &B, pos: usize) -> WordSpan {
    let mut cursor = WordCursor::new(buf, pos);
    cursor.move_word_start(MoveMode::MoveAnchor);
    cursor.move_word_end(MoveMode::KeepAnchor);
    cursor.selected_span()
}
