//! Spell-checking orchestration for one text buffer.
//!
//! `TextEditChecker` owns the pieces that make live checking work together: the `Speller`
//! (dictionary and language), the `Highlighter` (incremental underline passes), the optional
//! `UndoRedoLog` and the `EventBus` its host listens on. A buffer is attached by value; the
//! checker subscribes to its edit notifications and pumps them in `process_pending` (or
//! implicitly after `edit`, `undo`, `redo`).
//!
//! Core invariants (must hold after every public call):
//! * While attached, every content edit has been re-checked over its affected word range.
//! * Edits replayed by undo/redo are re-checked but never recorded.
//! * Underline passes never produce edit notifications.
//! * `UndoAvailable`/`RedoAvailable` are emitted after every history change, undo first.
//! * Detaching leaves no underlines behind and empties the history.
//!
//! Notifications are delivered synchronously, in emission order, to every listener whose
//! `EventMask` matches.

pub mod checker;

pub use checker::{Correction, TextEditChecker};

use core_config::ConfigFile;
use core_text::{CharFormat, Rgb};

/// Initial state for a `TextEditChecker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerSettings {
    /// Dictionary tag to load; empty means the system locale.
    pub language: String,
    pub spelling_enabled: bool,
    pub undo_redo_enabled: bool,
    /// Suggestions offered first by `correction_at`; the rest go to `Correction::more`.
    pub max_suggestions: usize,
    pub misspelled_format: CharFormat,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        Self {
            language: String::new(),
            spelling_enabled: true,
            undo_redo_enabled: true,
            max_suggestions: 10,
            misspelled_format: CharFormat::spell_error(Rgb::RED),
        }
    }
}

impl From<&ConfigFile> for CheckerSettings {
    fn from(file: &ConfigFile) -> Self {
        Self {
            language: file.spell.language.clone(),
            spelling_enabled: file.spell.enabled,
            undo_redo_enabled: file.history.enabled,
            max_suggestions: file.spell.max_suggestions,
            misspelled_format: file.highlight.misspelled_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_default_config() {
        assert_eq!(CheckerSettings::from(&ConfigFile::default()), CheckerSettings::default());
    }

    #[test]
    fn config_values_carry_over() {
        let mut file = ConfigFile::default();
        file.spell.language = "de_DE".into();
        file.spell.enabled = false;
        file.spell.max_suggestions = 3;
        file.history.enabled = false;
        let settings = CheckerSettings::from(&file);
        assert_eq!(settings.language, "de_DE");
        assert!(!settings.spelling_enabled);
        assert!(!settings.undo_redo_enabled);
        assert_eq!(settings.max_suggestions, 3);
    }
}
