use core_text::{EditDelta, Selection, TextBuffer, TransientEdit};
use tracing::{trace, warn};

/// Text inserted at `pos`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertAction {
    pub pos: usize,
    pub text: String,
    pub whitespace: bool,
    /// Fixed at creation: only single-char inserts start a mergeable run.
    pub mergeable: bool,
}

/// Text removed from `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAction {
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Delete-key direction: the caret stayed at `start`. False for backspace and for
    /// deletions of a selection.
    pub deleted_forward: bool,
    pub whitespace: bool,
    pub mergeable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Insert(InsertAction),
    Delete(DeleteAction),
}

fn single_char_class(text: &str) -> (bool, bool) {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => (c.is_whitespace(), true),
        _ => (false, false),
    }
}

impl InsertAction {
    pub fn new(pos: usize, text: String) -> Self {
        let (whitespace, mergeable) = single_char_class(&text);
        Self {
            pos,
            text,
            whitespace,
            mergeable,
        }
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn merges_with(&self, cur: &InsertAction) -> bool {
        cur.pos == self.pos + self.len()
            && cur.whitespace == self.whitespace
            && cur.mergeable
            && self.mergeable
    }
}

impl DeleteAction {
    pub fn new(start: usize, end: usize, text: String, deleted_forward: bool) -> Self {
        let (whitespace, mergeable) = single_char_class(&text);
        Self {
            start,
            end,
            text,
            deleted_forward,
            whitespace,
            mergeable,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn merges_with(&self, cur: &DeleteAction) -> bool {
        self.deleted_forward == cur.deleted_forward
            && cur.whitespace == self.whitespace
            && cur.mergeable
            && self.mergeable
            && (self.start == cur.start || self.start == cur.end)
    }

    fn absorb(&mut self, cur: DeleteAction) {
        if self.start == cur.start {
            // Delete key: the next char slid into the same position.
            self.end += cur.len();
            self.text.push_str(&cur.text);
        } else {
            self.start = cur.start;
            self.text.insert_str(0, &cur.text);
        }
    }
}

/// Undo/redo availability after a history change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Availability {
    pub undo: bool,
    pub redo: bool,
}

/// Two stacks of logical edits built from raw buffer notifications.
#[derive(Debug, Default)]
pub struct UndoRedoLog {
    undo_stack: Vec<Action>,
    redo_stack: Vec<Action>,
    action_in_progress: bool,
}

impl UndoRedoLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
    pub fn peek_undo(&self) -> Option<&Action> {
        self.undo_stack.last()
    }
    pub fn peek_redo(&self) -> Option<&Action> {
        self.redo_stack.last()
    }
    /// True while `undo`/`redo` is mutating the buffer.
    pub fn action_in_progress(&self) -> bool {
        self.action_in_progress
    }

    pub fn availability(&self) -> Availability {
        Availability {
            undo: self.can_undo(),
            redo: self.can_redo(),
        }
    }

    /// Record one buffer mutation. The removed and inserted text come from the buffer's
    /// transient journal, which must still hold the entry for `delta`.
    ///
    /// Returns `None` when nothing was recorded (formatting-only delta, or a replay is
    /// running).
    pub fn record<B>(&mut self, delta: EditDelta, buffer: &mut B) -> Option<Availability>
    where
        B: TextBuffer + ?Sized,
    {
        if self.action_in_progress || delta.is_format_only() {
            return None;
        }
        self.redo_stack.clear();

        let Some(edit) = take_journaled(buffer, delta) else {
            // Without the removed text this edit cannot be reverted, and neither can
            // anything before it.
            warn!(target: "state.undo", pos = delta.pos, removed = delta.removed, added = delta.added, "journal_entry_missing_history_dropped");
            self.undo_stack.clear();
            return Some(self.availability());
        };

        if delta.removed > 0 {
            let deleted_forward = deleted_forward(edit.selection_before, delta.pos);
            let action = DeleteAction::new(
                delta.pos,
                delta.pos + delta.removed,
                edit.removed_text,
                deleted_forward,
            );
            self.push_delete(action);
        }
        if delta.added > 0 {
            self.push_insert(InsertAction::new(delta.pos, edit.inserted_text));
        }
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), "record");
        Some(Availability {
            undo: true,
            redo: false,
        })
    }

    fn push_insert(&mut self, action: InsertAction) {
        if let Some(Action::Insert(prev)) = self.undo_stack.last_mut()
            && prev.merges_with(&action)
        {
            prev.text.push_str(&action.text);
            trace!(target: "state.undo", pos = prev.pos, len = prev.len(), "insert_merged");
            return;
        }
        self.undo_stack.push(Action::Insert(action));
    }

    fn push_delete(&mut self, action: DeleteAction) {
        if let Some(Action::Delete(prev)) = self.undo_stack.last_mut()
            && prev.merges_with(&action)
        {
            prev.absorb(action);
            trace!(target: "state.undo", start = prev.start, end = prev.end, "delete_merged");
            return;
        }
        self.undo_stack.push(Action::Delete(action));
    }

    /// Revert the most recent logical edit. A replace (delete then insert at the same
    /// position) is reverted as one step. No-op on an empty stack.
    pub fn undo<B>(&mut self, buffer: &mut B) -> Option<Availability>
    where
        B: TextBuffer + ?Sized,
    {
        let action = self.undo_stack.pop()?;
        self.action_in_progress = true;
        match &action {
            Action::Insert(ins) => {
                buffer.replace_range(ins.pos, ins.pos + ins.len(), "");
                buffer.set_selection(Selection::collapsed(ins.pos));
            }
            Action::Delete(del) => {
                buffer.replace_range(del.start, del.start, &del.text);
                let caret = if del.deleted_forward {
                    del.start
                } else {
                    del.start + del.len()
                };
                buffer.set_selection(Selection::collapsed(caret));
            }
        }
        let compound = match (&action, self.undo_stack.last()) {
            (Action::Insert(ins), Some(Action::Delete(del))) => is_replace(del, ins),
            _ => false,
        };
        self.redo_stack.push(action);
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), compound, "undo");
        if compound {
            self.undo(buffer);
        }
        self.action_in_progress = false;
        Some(self.availability())
    }

    /// Re-apply the most recently undone logical edit. No-op on an empty stack.
    pub fn redo<B>(&mut self, buffer: &mut B) -> Option<Availability>
    where
        B: TextBuffer + ?Sized,
    {
        let action = self.redo_stack.pop()?;
        self.action_in_progress = true;
        match &action {
            Action::Insert(ins) => {
                buffer.replace_range(ins.pos, ins.pos, &ins.text);
                buffer.set_selection(Selection::collapsed(ins.pos + ins.len()));
            }
            Action::Delete(del) => {
                buffer.replace_range(del.start, del.end, "");
                buffer.set_selection(Selection::collapsed(del.start));
            }
        }
        let compound = match (&action, self.redo_stack.last()) {
            (Action::Delete(del), Some(Action::Insert(ins))) => is_replace(del, ins),
            _ => false,
        };
        self.undo_stack.push(action);
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), compound, "redo");
        if compound {
            self.redo(buffer);
        }
        self.action_in_progress = false;
        Some(self.availability())
    }

    pub fn clear(&mut self) -> Availability {
        self.undo_stack.clear();
        self.redo_stack.clear();
        trace!(target: "state.undo", "history_cleared");
        Availability::default()
    }
}

fn is_replace(del: &DeleteAction, ins: &InsertAction) -> bool {
    del.start == ins.pos
}

fn deleted_forward(before: Selection, pos: usize) -> bool {
    before.is_collapsed() && before.position == pos
}

// Entries journaled while nobody recorded them (e.g. during replay) are stale.
fn take_journaled<B: TextBuffer + ?Sized>(buffer: &mut B, delta: EditDelta) -> Option<TransientEdit> {
    while let Some(edit) = buffer.take_transient_edit() {
        if edit.delta == delta {
            return Some(edit);
        }
        trace!(target: "state.undo", pos = edit.delta.pos, "stale_journal_entry_skipped");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buffer;
    use crossbeam_channel::Receiver;
    use pretty_assertions::assert_eq;

    struct Fixture {
        buf: Buffer,
        rx: Receiver<EditDelta>,
        log: UndoRedoLog,
    }

    impl Fixture {
        fn new(text: &str) -> Self {
            let mut buf = Buffer::from_str("t", text).unwrap();
            let rx = buf.subscribe();
            Self {
                buf,
                rx,
                log: UndoRedoLog::new(),
            }
        }

        fn edit(&mut self, start: usize, end: usize, text: &str) {
            self.buf.replace_range(start, end, text);
            self.pump();
        }

        fn pump(&mut self) {
            while let Ok(delta) = self.rx.try_recv() {
                self.log.record(delta, &mut self.buf);
            }
            self.buf.clear_transient_history();
        }

        // Replay mutations are observed but never recorded.
        fn discard(&mut self) {
            while self.rx.try_recv().is_ok() {}
            self.buf.clear_transient_history();
        }

        fn type_str(&mut self, at: usize, s: &str) {
            for (i, c) in s.chars().enumerate() {
                self.edit(at + i, at + i, &c.to_string());
            }
        }

        fn undo(&mut self) -> Option<Availability> {
            let r = self.log.undo(&mut self.buf);
            self.discard();
            r
        }

        fn redo(&mut self) -> Option<Availability> {
            let r = self.log.redo(&mut self.buf);
            self.discard();
            r
        }

        fn text(&self) -> String {
            self.buf.to_string()
        }
    }

    #[test]
    fn typed_word_is_one_action() {
        let mut f = Fixture::new("");
        f.type_str(0, "cat");
        assert_eq!(f.log.undo_depth(), 1);
        assert_eq!(
            f.log.peek_undo(),
            Some(&Action::Insert(InsertAction {
                pos: 0,
                text: "cat".into(),
                whitespace: false,
                mergeable: true,
            }))
        );
        assert_eq!(
            f.undo(),
            Some(Availability {
                undo: false,
                redo: true
            })
        );
        assert_eq!(f.text(), "");
        assert_eq!(f.buf.selection(), Selection::collapsed(0));
    }

    #[test]
    fn whitespace_breaks_insert_runs() {
        let mut f = Fixture::new("");
        f.type_str(0, "ab cd");
        assert_eq!(f.log.undo_depth(), 3);
        f.undo();
        assert_eq!(f.text(), "ab ");
        f.undo();
        assert_eq!(f.text(), "ab");
    }

    #[test]
    fn pasted_text_does_not_merge() {
        let mut f = Fixture::new("");
        f.edit(0, 0, "x");
        f.edit(1, 1, "yz");
        f.edit(3, 3, "w");
        assert_eq!(f.log.undo_depth(), 3);
    }

    #[test]
    fn backspaces_merge_and_restore_caret_after_text() {
        let mut f = Fixture::new("hello");
        f.buf.set_selection(Selection::collapsed(5));
        f.edit(4, 5, "");
        f.edit(3, 4, "");
        assert_eq!(f.text(), "hel");
        assert_eq!(f.log.undo_depth(), 1);
        match f.log.peek_undo() {
            Some(Action::Delete(d)) => {
                assert_eq!((d.start, d.end, d.text.as_str()), (3, 5, "lo"));
                assert!(!d.deleted_forward);
            }
            other => panic!("expected delete, got {other:?}"),
        }
        f.undo();
        assert_eq!(f.text(), "hello");
        assert_eq!(f.buf.selection(), Selection::collapsed(5));
    }

    #[test]
    fn delete_key_merges_and_keeps_caret_in_place() {
        let mut f = Fixture::new("hello");
        f.buf.set_selection(Selection::collapsed(0));
        f.edit(0, 1, "");
        f.edit(0, 1, "");
        assert_eq!(f.text(), "llo");
        assert_eq!(f.log.undo_depth(), 1);
        f.undo();
        assert_eq!(f.text(), "hello");
        assert_eq!(f.buf.selection(), Selection::collapsed(0));
        f.redo();
        assert_eq!(f.text(), "llo");
    }

    #[test]
    fn backspace_and_delete_key_do_not_merge() {
        let mut f = Fixture::new("abcd");
        f.buf.set_selection(Selection::collapsed(2));
        f.edit(1, 2, "");
        f.edit(1, 2, "");
        assert_eq!(f.text(), "ad");
        assert_eq!(f.log.undo_depth(), 2);
    }

    #[test]
    fn replace_undoes_and_redoes_atomically() {
        let mut f = Fixture::new("the cat sat");
        f.buf.set_selection(Selection::new(4, 7));
        f.edit(4, 7, "");
        f.type_str(4, "dog");
        assert_eq!(f.text(), "the dog sat");
        assert_eq!(f.log.undo_depth(), 2);

        f.undo();
        assert_eq!(f.text(), "the cat sat");
        assert!(!f.log.can_undo());
        assert_eq!(f.buf.selection(), Selection::collapsed(7));

        f.redo();
        assert_eq!(f.text(), "the dog sat");
        assert!(!f.log.can_redo());
        assert_eq!(f.buf.selection(), Selection::collapsed(7));
    }

    #[test]
    fn single_replace_delta_records_delete_then_insert() {
        let mut f = Fixture::new("cat");
        f.buf.set_selection(Selection::new(0, 3));
        f.edit(0, 3, "dog");
        assert_eq!(f.log.undo_depth(), 2);
        assert!(matches!(f.log.peek_undo(), Some(Action::Insert(_))));
        f.undo();
        assert_eq!(f.text(), "cat");
    }

    #[test]
    fn replace_of_replace_unwinds_one_pair_per_undo() {
        let mut f = Fixture::new("cat");
        f.buf.set_selection(Selection::new(0, 3));
        f.edit(0, 3, "dog");
        f.buf.set_selection(Selection::new(0, 3));
        f.edit(0, 3, "emu");
        assert_eq!(f.log.undo_depth(), 4);

        f.undo();
        assert_eq!(f.text(), "dog");
        assert_eq!(f.log.undo_depth(), 2);
        f.undo();
        assert_eq!(f.text(), "cat");
        assert!(!f.log.can_undo());

        f.redo();
        assert_eq!(f.text(), "dog");
        f.redo();
        assert_eq!(f.text(), "emu");
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut f = Fixture::new("");
        f.type_str(0, "ab");
        f.undo();
        assert!(f.log.can_redo());
        f.edit(0, 0, "z");
        assert!(!f.log.can_redo());
        assert_eq!(f.redo(), None);
    }

    #[test]
    fn empty_stacks_are_silent() {
        let mut f = Fixture::new("abc");
        assert_eq!(f.undo(), None);
        assert_eq!(f.redo(), None);
        assert_eq!(f.text(), "abc");
    }

    #[test]
    fn format_only_deltas_are_ignored() {
        let mut f = Fixture::new("abc");
        assert_eq!(f.log.record(EditDelta::new(1, 0, 0), &mut f.buf), None);
        assert_eq!(f.log.undo_depth(), 0);
    }

    #[test]
    fn replay_edits_are_not_recorded() {
        let mut f = Fixture::new("");
        f.type_str(0, "word");
        f.undo();
        f.redo();
        assert_eq!(f.log.undo_depth(), 1);
        assert_eq!(f.log.redo_depth(), 0);
        assert!(!f.log.action_in_progress());
    }

    #[test]
    fn missing_journal_entry_drops_history() {
        let mut f = Fixture::new("abc");
        f.type_str(3, "d");
        f.buf.replace_range(0, 1, "");
        f.buf.clear_transient_history();
        let delta = f.rx.try_recv().unwrap();
        let av = f.log.record(delta, &mut f.buf).unwrap();
        assert_eq!(av, Availability::default());
        assert_eq!(f.log.undo_depth(), 0);
    }

    #[test]
    fn clear_empties_both_stacks() {
        let mut f = Fixture::new("");
        f.type_str(0, "ab cd");
        f.undo();
        assert_eq!(f.log.clear(), Availability::default());
        assert_eq!((f.log.undo_depth(), f.log.redo_depth()), (0, 0));
    }

    #[test]
    fn unpublished_edit_does_not_shadow_next_one() {
        let mut f = Fixture::new("xyz");
        {
            let mut guard = f.buf.block_notifications();
            guard.replace_range(0, 0, "a");
        }
        f.edit(0, 0, "b");
        assert_eq!(f.text(), "baxyz");
        assert!(matches!(f.log.peek_undo(), Some(Action::Insert(ins)) if ins.text == "b"));
        f.undo();
        assert_eq!(f.text(), "axyz");
        f.redo();
        assert_eq!(f.text(), "baxyz");
    }
}
