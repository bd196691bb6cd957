//! Language-aware spelling adapter.
//!
//! Holds at most one open dictionary. Checking is fail-open: with no dictionary, spelling
//! disabled, a too-short word, or a backend failure, `check_word` answers "correct".

use crate::locale::{self, is_usable_locale};
use crate::{DictionaryRegistry, SpellBackend, SpellError};
use std::fmt;
use tracing::{debug, info, warn};
use unicode_segmentation::UnicodeSegmentation;

type LocaleSource = Box<dyn Fn() -> Option<String>>;

pub struct Speller {
    registry: Box<dyn DictionaryRegistry>,
    backend: Option<Box<dyn SpellBackend>>,
    language: String,
    enabled: bool,
    locale_source: LocaleSource,
}

impl fmt::Debug for Speller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Speller")
            .field("language", &self.language)
            .field("loaded", &self.backend.is_some())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Speller {
    /// A speller with no language loaded. Call `set_language` to open a dictionary.
    pub fn new(registry: Box<dyn DictionaryRegistry>) -> Self {
        Self {
            registry,
            backend: None,
            language: String::new(),
            enabled: true,
            locale_source: Box::new(locale::system_locale),
        }
    }

    /// Replace the source consulted when `set_language("")` asks for the system locale.
    pub fn with_locale_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> Option<String> + 'static,
    {
        self.locale_source = Box::new(source);
        self
    }

    /// Switch dictionaries. An empty tag selects the system locale. On failure the previous
    /// dictionary is released, the language becomes `""` and `false` is returned.
    pub fn set_language(&mut self, tag: &str) -> bool {
        self.backend = None;
        self.language.clear();

        let requested = if tag.is_empty() {
            match (self.locale_source)() {
                Some(sys) if is_usable_locale(&sys) => sys,
                other => {
                    warn!(target: "spell.adapter", locale = ?other, "system_locale_unusable");
                    return false;
                }
            }
        } else {
            tag.to_string()
        };

        match self.registry.request_dictionary(&requested) {
            Ok(backend) => {
                info!(target: "spell.adapter", language = requested.as_str(), "dictionary_loaded");
                self.backend = Some(backend);
                self.language = requested;
                true
            }
            Err(e) => {
                warn!(target: "spell.adapter", language = requested.as_str(), error = %e, "dictionary_load_failed");
                false
            }
        }
    }

    /// Current language tag, `""` when no dictionary is loaded.
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.is_some()
    }

    pub fn set_spelling_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn spelling_enabled(&self) -> bool {
        self.enabled
    }

    pub fn check_word(&self, word: &str) -> bool {
        let Some(backend) = self.backend.as_deref() else {
            return true;
        };
        if !self.enabled || word.graphemes(true).nth(1).is_none() {
            return true;
        }
        match backend.check(word) {
            Ok(correct) => correct,
            Err(e) => {
                debug!(target: "spell.adapter", word, error = %e, "check_failed_assuming_correct");
                true
            }
        }
    }

    /// Backend suggestions in backend order; empty without a dictionary.
    pub fn suggestions(&self, word: &str) -> Result<Vec<String>, SpellError> {
        match self.backend.as_deref() {
            Some(backend) => Ok(backend.suggest(word)?),
            None => Ok(Vec::new()),
        }
    }

    /// Add to the personal word list. A no-op without a dictionary.
    pub fn add_word(&mut self, word: &str) -> Result<(), SpellError> {
        if let Some(backend) = self.backend.as_deref_mut() {
            backend.add(word)?;
            debug!(target: "spell.adapter", word, "word_added");
        }
        Ok(())
    }

    /// Accept the word for the lifetime of the current dictionary handle.
    pub fn ignore_word(&mut self, word: &str) -> Result<(), SpellError> {
        let backend = self.backend.as_deref_mut().ok_or(SpellError::NoDictionary)?;
        backend.add_to_session(word)?;
        debug!(target: "spell.adapter", word, "word_ignored");
        Ok(())
    }

    /// Sorted, de-duplicated tags of every installed dictionary.
    pub fn list_languages(&self) -> Vec<String> {
        let mut tags = self.registry.list_dictionaries();
        tags.sort();
        tags.dedup();
        tags
    }

    pub fn language_installed(&self, tag: &str) -> bool {
        self.registry.dictionary_exists(tag)
    }
}
