use crate::CheckerSettings;
use core_events::{CheckerEvent, EventBus, EventMask, ListenerId};
use core_highlight::{CheckMetricsSnapshot, CheckStats, Highlighter};
use core_spell::{DictionaryRegistry, SpellError, Speller};
use core_state::{Availability, UndoRedoLog};
use core_text::{Buffer, EditDelta, Selection, TextBuffer, WordSpan, word_at};
use crossbeam_channel::{Receiver, Sender};
use std::fmt;
use tracing::{debug, info};

/// A misspelled word and what to offer in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub word: WordSpan,
    /// Up to `max_suggestions` candidates, best first.
    pub suggestions: Vec<String>,
    /// Candidates beyond the first `max_suggestions`.
    pub more: Vec<String>,
}

/// Live spell checking and logical undo/redo for one attached buffer.
pub struct TextEditChecker<B: TextBuffer = Buffer> {
    speller: Speller,
    highlighter: Highlighter,
    /// `None` while undo/redo is disabled.
    log: Option<UndoRedoLog>,
    events: EventBus,
    buffer: Option<B>,
    deltas: Option<Receiver<EditDelta>>,
    replay_in_progress: bool,
    max_suggestions: usize,
}

impl<B: TextBuffer> fmt::Debug for TextEditChecker<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextEditChecker")
            .field("speller", &self.speller)
            .field("attached", &self.buffer.is_some())
            .field("undo_redo_enabled", &self.log.is_some())
            .field("listeners", &self.events.len())
            .finish()
    }
}

impl<B: TextBuffer> TextEditChecker<B> {
    pub fn new(registry: Box<dyn DictionaryRegistry>, settings: CheckerSettings) -> Self {
        Self::with_speller(Speller::new(registry), settings)
    }

    /// Build around a prepared speller. `settings.language` is applied to it (an empty
    /// language means the speller's system locale).
    pub fn with_speller(mut speller: Speller, settings: CheckerSettings) -> Self {
        speller.set_spelling_enabled(settings.spelling_enabled);
        speller.set_language(&settings.language);
        Self {
            speller,
            highlighter: Highlighter::new(settings.misspelled_format),
            log: settings.undo_redo_enabled.then(UndoRedoLog::new),
            events: EventBus::new(),
            buffer: None,
            deltas: None,
            replay_in_progress: false,
            max_suggestions: settings.max_suggestions,
        }
    }

    // ---------------------------------------------------------------------------------------
    // Buffer lifecycle
    // ---------------------------------------------------------------------------------------

    /// Take ownership of `buffer`, check it fully and start following its edits. Any buffer
    /// attached before is detached and returned.
    pub fn attach(&mut self, mut buffer: B) -> Option<B> {
        let previous = self.detach();
        self.deltas = Some(buffer.subscribe());
        info!(target: "model.checker", chars = buffer.len_chars(), language = self.speller.language(), "attach");
        self.buffer = Some(buffer);
        self.check_spelling(0, None);
        previous
    }

    /// Stop following the buffer, strip spelling underlines and drop the edit history.
    pub fn detach(&mut self) -> Option<B> {
        let mut buffer = self.buffer.take()?;
        buffer.unsubscribe();
        self.deltas = None;
        self.highlighter.discard_pending();
        let len = buffer.len_chars();
        self.highlighter.reset_format(&mut buffer, 0, len);
        if let Some(log) = self.log.as_mut() {
            let availability = log.clear();
            self.emit_availability(availability);
        }
        info!(target: "model.checker", "detach");
        Some(buffer)
    }

    pub fn is_attached(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&B> {
        self.buffer.as_ref()
    }

    /// Direct access to the buffer. Edits made through it take effect in checking and
    /// history on the next `process_pending` (also run by `undo` and `redo`).
    pub fn buffer_mut(&mut self) -> Option<&mut B> {
        self.buffer.as_mut()
    }

    /// Mutate the attached buffer and process the resulting notifications.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut B) -> R) -> Option<R> {
        let out = f(self.buffer.as_mut()?);
        self.process_pending();
        Some(out)
    }

    /// Drain edit notifications: record them (unless replaying), then re-check the words
    /// they touched.
    pub fn process_pending(&mut self) -> CheckStats {
        let (Some(buffer), Some(deltas)) = (self.buffer.as_mut(), self.deltas.as_ref()) else {
            return CheckStats::default();
        };
        let mut history = None;
        while let Ok(delta) = deltas.try_recv() {
            if delta.is_format_only() {
                continue;
            }
            if !self.replay_in_progress
                && let Some(log) = self.log.as_mut()
                && let Some(availability) = log.record(delta, buffer)
            {
                history = Some(availability);
            }
            self.highlighter.schedule(delta);
        }
        buffer.clear_transient_history();
        let stats = self.highlighter.flush(buffer, &self.speller);
        if let Some(availability) = history {
            self.emit_availability(availability);
        }
        stats
    }

    /// Re-check `[start, end)`; `end = None` checks to the end of the document.
    pub fn check_spelling(&mut self, start: usize, end: Option<usize>) -> CheckStats {
        match self.buffer.as_mut() {
            Some(buffer) => self.highlighter.recheck(buffer, &self.speller, start, end),
            None => CheckStats::default(),
        }
    }

    /// Underlined words of the attached buffer, in document order.
    pub fn misspellings(&self) -> Vec<WordSpan> {
        self.buffer
            .as_ref()
            .map(|buffer| self.highlighter.misspellings(buffer))
            .unwrap_or_default()
    }

    pub fn metrics(&self) -> CheckMetricsSnapshot {
        self.highlighter.metrics().snapshot()
    }

    // ---------------------------------------------------------------------------------------
    // Language
    // ---------------------------------------------------------------------------------------

    /// Switch dictionaries and re-check the attached buffer. Listeners receive the new
    /// language, or `""` when the switch failed.
    pub fn set_language(&mut self, tag: &str) -> bool {
        let ok = self.speller.set_language(tag);
        info!(target: "model.checker", requested = tag, language = self.speller.language(), ok, "set_language");
        self.check_spelling(0, None);
        self.events
            .emit(CheckerEvent::LanguageChanged(self.speller.language().to_string()));
        ok
    }

    pub fn language(&self) -> &str {
        self.speller.language()
    }

    pub fn list_languages(&self) -> Vec<String> {
        self.speller.list_languages()
    }

    pub fn language_installed(&self, tag: &str) -> bool {
        self.speller.language_installed(tag)
    }

    // ---------------------------------------------------------------------------------------
    // Words
    // ---------------------------------------------------------------------------------------

    pub fn check_word(&self, word: &str) -> bool {
        self.speller.check_word(word)
    }

    pub fn suggestions(&self, word: &str) -> Result<Vec<String>, SpellError> {
        self.speller.suggestions(word)
    }

    pub fn add_word(&mut self, word: &str) -> Result<(), SpellError> {
        self.speller.add_word(word)
    }

    pub fn ignore_word(&mut self, word: &str) -> Result<(), SpellError> {
        self.speller.ignore_word(word)
    }

    /// The word containing or adjacent to `pos` in the attached buffer.
    pub fn word_at(&self, pos: usize) -> Option<WordSpan> {
        let buffer = self.buffer.as_ref()?;
        Some(word_at(buffer, pos)).filter(|word| !word.is_empty())
    }

    /// Suggestions for the word at `pos` if checking is active and that word is misspelled.
    pub fn correction_at(&self, pos: usize) -> Result<Option<Correction>, SpellError> {
        if !self.speller.is_loaded() || !self.speller.spelling_enabled() {
            return Ok(None);
        }
        let Some(word) = self.word_at(pos) else {
            return Ok(None);
        };
        if self.speller.check_word(&word.text) {
            return Ok(None);
        }
        let mut suggestions = self.speller.suggestions(&word.text)?;
        let more = suggestions.split_off(suggestions.len().min(self.max_suggestions));
        Ok(Some(Correction {
            word,
            suggestions,
            more,
        }))
    }

    /// Add the word at `pos` to the personal dictionary and re-check it.
    pub fn add_word_at(&mut self, pos: usize) -> Result<Option<WordSpan>, SpellError> {
        let Some(word) = self.word_at(pos) else {
            return Ok(None);
        };
        self.speller.add_word(&word.text)?;
        self.check_spelling(word.start, Some(word.end));
        Ok(Some(word))
    }

    /// Accept the word at `pos` for this session and re-check it.
    pub fn ignore_word_at(&mut self, pos: usize) -> Result<Option<WordSpan>, SpellError> {
        let Some(word) = self.word_at(pos) else {
            return Ok(None);
        };
        self.speller.ignore_word(&word.text)?;
        self.check_spelling(word.start, Some(word.end));
        Ok(Some(word))
    }

    /// Replace the word at `pos` as if it were selected and overtyped; the change is
    /// recorded and undone as one replace.
    pub fn replace_word_at(&mut self, pos: usize, replacement: &str) -> Option<WordSpan> {
        let word = self.word_at(pos)?;
        debug!(target: "model.checker", start = word.start, end = word.end, "replace_word");
        self.edit(|buffer| {
            buffer.set_selection(Selection::new(word.start, word.end));
            buffer.replace_range(word.start, word.end, replacement);
        })?;
        Some(word)
    }

    // ---------------------------------------------------------------------------------------
    // Toggles
    // ---------------------------------------------------------------------------------------

    pub fn set_spelling_enabled(&mut self, enabled: bool) {
        self.speller.set_spelling_enabled(enabled);
        self.check_spelling(0, None);
    }

    pub fn spelling_enabled(&self) -> bool {
        self.speller.spelling_enabled()
    }

    /// Disabling drops the history; re-enabling starts an empty one.
    pub fn set_undo_redo_enabled(&mut self, enabled: bool) {
        if enabled == self.log.is_some() {
            return;
        }
        if enabled {
            self.log = Some(UndoRedoLog::new());
        } else {
            self.log = None;
            self.emit_availability(Availability::default());
        }
        debug!(target: "model.checker", enabled, "undo_redo_toggled");
    }

    pub fn undo_redo_enabled(&self) -> bool {
        self.log.is_some()
    }

    // ---------------------------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------------------------

    /// Undo the last logical edit. Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        // Direct buffer edits must be recorded before the log replays over them.
        self.process_pending();
        let (Some(buffer), Some(log)) = (self.buffer.as_mut(), self.log.as_mut()) else {
            return false;
        };
        let Some(availability) = log.undo(buffer) else {
            return false;
        };
        self.replay_finished(availability);
        true
    }

    /// Redo the last undone edit. Returns false when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        // Direct buffer edits must be recorded before the log replays over them.
        self.process_pending();
        let (Some(buffer), Some(log)) = (self.buffer.as_mut(), self.log.as_mut()) else {
            return false;
        };
        let Some(availability) = log.redo(buffer) else {
            return false;
        };
        self.replay_finished(availability);
        true
    }

    pub fn clear_history(&mut self) {
        if let Some(log) = self.log.as_mut() {
            let availability = log.clear();
            self.emit_availability(availability);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.log.as_ref().is_some_and(UndoRedoLog::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.log.as_ref().is_some_and(UndoRedoLog::can_redo)
    }

    // Replay edits are re-checked like any other edit but never recorded.
    fn replay_finished(&mut self, availability: Availability) {
        self.replay_in_progress = true;
        self.process_pending();
        self.replay_in_progress = false;
        debug!(target: "model.checker", undo = availability.undo, redo = availability.redo, "replay");
        self.emit_availability(availability);
    }

    // ---------------------------------------------------------------------------------------
    // Notifications
    // ---------------------------------------------------------------------------------------

    pub fn subscribe<F>(&mut self, mask: EventMask, listener: F) -> ListenerId
    where
        F: FnMut(&CheckerEvent) + 'static,
    {
        self.events.subscribe(mask, listener)
    }

    pub fn forward_to(&mut self, mask: EventMask, tx: Sender<CheckerEvent>) -> ListenerId {
        self.events.forward_to(mask, tx)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    fn emit_availability(&mut self, availability: Availability) {
        self.events
            .emit(CheckerEvent::UndoAvailable(availability.undo));
        self.events
            .emit(CheckerEvent::RedoAvailable(availability.redo));
    }
}
