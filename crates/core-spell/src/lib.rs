//! Spelling backend seam and the language-aware adapter consulted by the checker.
//!
//! The core never talks to a dictionary directly. A host injects a `DictionaryRegistry`
//! (which enumerates and opens dictionaries) into `Speller`; `Speller` owns the current
//! language and the live `SpellBackend` handle, and applies the fail-open policy: any
//! failure to check a word reports the word as correct so editing is never blocked.

use std::path::PathBuf;

pub mod adapter;
pub mod locale;
pub mod wordlist;

pub use adapter::Speller;
pub use wordlist::{MemoryRegistry, WordListDictionary, WordListRegistry};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("no dictionary available for language {0:?}")]
    DictionaryNotFound(String),
    #[error("spell check failed: {0}")]
    Check(String),
    #[error("failed to read dictionary {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SpellError {
    /// The operation needs a loaded dictionary and none is.
    #[error("no dictionary is loaded")]
    NoDictionary,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A loaded dictionary for one language.
pub trait SpellBackend {
    fn check(&self, word: &str) -> Result<bool, BackendError>;
    fn suggest(&self, word: &str) -> Result<Vec<String>, BackendError>;
    /// Add to the user's personal word list.
    fn add(&mut self, word: &str) -> Result<(), BackendError>;
    /// Accept the word until this backend is dropped.
    fn add_to_session(&mut self, word: &str) -> Result<(), BackendError>;
}

/// Enumerates and opens dictionaries.
pub trait DictionaryRegistry {
    /// Language tags of every available dictionary (any order, may repeat).
    fn list_dictionaries(&self) -> Vec<String>;
    /// Fails with `BackendError::DictionaryNotFound` when no dictionary matches `tag`.
    fn request_dictionary(&self, tag: &str) -> Result<Box<dyn SpellBackend>, BackendError>;
    fn dictionary_exists(&self, tag: &str) -> bool {
        self.list_dictionaries().iter().any(|t| t == tag)
    }
}
