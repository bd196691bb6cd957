//! Plain word-list dictionaries.
//!
//! `WordListRegistry` serves dictionaries from directories of `<tag>.dic` files (hunspell
//! layout: optional count line, `word/FLAGS` entries; affix flags are ignored) or `<tag>.txt`
//! files (one word per line). `MemoryRegistry` serves in-memory lists for embedding hosts
//! and tests.
//!
//! Words are compared in NFC. A word is known if it is listed as-is or, when the input has
//! capitals, in lower case (so sentence-initial `Hello` and shouted `HELLO` match `hello`).

use crate::{BackendError, DictionaryRegistry, SpellBackend};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use unicode_normalization::UnicodeNormalization;

/// Upper bound on suggestions returned per query.
pub const MAX_SUGGESTIONS: usize = 32;
/// Suggestions are within this many edits of the input.
const MAX_EDIT_DISTANCE: usize = 2;

fn nfc(word: &str) -> String {
    word.nfc().collect()
}

#[derive(Debug, Clone, Default)]
pub struct WordListDictionary {
    tag: String,
    words: HashSet<String>,
    personal: HashSet<String>,
    session: HashSet<String>,
}

impl WordListDictionary {
    pub fn from_words<I, S>(tag: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tag: tag.into(),
            words: words
                .into_iter()
                .map(|w| nfc(w.as_ref().trim()))
                .filter(|w| !w.is_empty())
                .collect(),
            ..Self::default()
        }
    }

    /// Parse a `.dic` or `.txt` word list.
    pub fn parse(tag: impl Into<String>, content: &str) -> Self {
        let mut lines = content.lines().peekable();
        if lines
            .peek()
            .is_some_and(|first| first.trim().parse::<usize>().is_ok())
        {
            lines.next();
        }
        let words = lines
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.split('/').next().unwrap_or(line));
        Self::from_words(tag, words)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn contains(&self, word: &str) -> bool {
        self.words.contains(word) || self.personal.contains(word) || self.session.contains(word)
    }

    pub fn knows(&self, word: &str) -> bool {
        let word = nfc(word);
        if self.contains(&word) {
            return true;
        }
        let lower = word.to_lowercase();
        lower != word && self.contains(&lower)
    }

    /// Known words within two edits (insert, delete, substitute, transpose) of `word`,
    /// closest first, then alphabetical. Capitalization of the input is carried over.
    pub fn suggest(&self, word: &str) -> Vec<String> {
        let word = nfc(word);
        let target: Vec<char> = word.to_lowercase().chars().collect();
        let capitalized = word.chars().next().is_some_and(char::is_uppercase);

        let mut ranked: Vec<(usize, String)> = self
            .words
            .iter()
            .chain(&self.personal)
            .chain(&self.session)
            .filter_map(|candidate| {
                let cand: Vec<char> = candidate.to_lowercase().chars().collect();
                if cand.len().abs_diff(target.len()) > MAX_EDIT_DISTANCE {
                    return None;
                }
                let d = edit_distance(&target, &cand);
                (d > 0 && d <= MAX_EDIT_DISTANCE).then(|| {
                    let shown = if capitalized {
                        capitalize(candidate)
                    } else {
                        candidate.clone()
                    };
                    (d, shown)
                })
            })
            .collect();
        ranked.sort();
        ranked.dedup_by(|a, b| a.1 == b.1);
        ranked.truncate(MAX_SUGGESTIONS);
        trace!(target: "spell.wordlist", word = word.as_str(), count = ranked.len(), "suggest");
        ranked.into_iter().map(|(_, w)| w).collect()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Optimal string alignment distance (Levenshtein plus adjacent transposition).
fn edit_distance(a: &[char], b: &[char]) -> usize {
    let width = b.len() + 1;
    let mut rows = vec![0usize; (a.len() + 1) * width];
    let at = |i: usize, j: usize| i * width + j;
    for i in 0..=a.len() {
        rows[at(i, 0)] = i;
    }
    for j in 0..=b.len() {
        rows[at(0, j)] = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (rows[at(i - 1, j)] + 1)
                .min(rows[at(i, j - 1)] + 1)
                .min(rows[at(i - 1, j - 1)] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(rows[at(i - 2, j - 2)] + 1);
            }
            rows[at(i, j)] = best;
        }
    }
    rows[at(a.len(), b.len())]
}

impl SpellBackend for WordListDictionary {
    fn check(&self, word: &str) -> Result<bool, BackendError> {
        Ok(self.knows(word))
    }

    fn suggest(&self, word: &str) -> Result<Vec<String>, BackendError> {
        Ok(WordListDictionary::suggest(self, word))
    }

    fn add(&mut self, word: &str) -> Result<(), BackendError> {
        self.personal.insert(nfc(word));
        Ok(())
    }

    fn add_to_session(&mut self, word: &str) -> Result<(), BackendError> {
        self.session.insert(nfc(word));
        Ok(())
    }
}

/// Dictionaries found on disk.
#[derive(Debug, Clone, Default)]
pub struct WordListRegistry {
    dirs: Vec<PathBuf>,
}

impl WordListRegistry {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn find(&self, tag: &str) -> Option<PathBuf> {
        self.dirs.iter().find_map(|dir| {
            ["dic", "txt"]
                .iter()
                .map(|ext| dir.join(format!("{tag}.{ext}")))
                .find(|path| path.is_file())
        })
    }

    fn load(&self, tag: &str, path: &Path) -> Result<WordListDictionary, BackendError> {
        let content = fs::read_to_string(path).map_err(|source| BackendError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dict = WordListDictionary::parse(tag, &content);
        debug!(target: "spell.wordlist", tag, path = %path.display(), words = dict.len(), "dictionary_read");
        Ok(dict)
    }
}

fn valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl DictionaryRegistry for WordListRegistry {
    fn list_dictionaries(&self) -> Vec<String> {
        let mut tags = BTreeSet::new();
        for dir in &self.dirs {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    trace!(target: "spell.wordlist", dir = %dir.display(), error = %e, "dir_unreadable");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path
                    .extension()
                    .is_some_and(|ext| ext == "dic" || ext == "txt")
                {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                    && valid_tag(stem)
                {
                    tags.insert(stem.to_string());
                }
            }
        }
        tags.into_iter().collect()
    }

    /// Falls back from a regional tag (`en_US`) to its language (`en`).
    fn request_dictionary(&self, tag: &str) -> Result<Box<dyn SpellBackend>, BackendError> {
        if !valid_tag(tag) {
            return Err(BackendError::DictionaryNotFound(tag.to_string()));
        }
        if let Some(path) = self.find(tag) {
            return Ok(Box::new(self.load(tag, &path)?));
        }
        if let Some((lang, _)) = tag.split_once(['_', '-'])
            && let Some(path) = self.find(lang)
        {
            return Ok(Box::new(self.load(tag, &path)?));
        }
        Err(BackendError::DictionaryNotFound(tag.to_string()))
    }

    fn dictionary_exists(&self, tag: &str) -> bool {
        valid_tag(tag) && self.find(tag).is_some()
    }
}

/// Dictionaries held in memory, keyed by tag.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    dictionaries: BTreeMap<String, Vec<String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dictionary<I, S>(mut self, tag: &str, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dictionaries
            .insert(tag.to_string(), words.into_iter().map(Into::into).collect());
        self
    }
}

impl DictionaryRegistry for MemoryRegistry {
    fn list_dictionaries(&self) -> Vec<String> {
        self.dictionaries.keys().cloned().collect()
    }

    fn request_dictionary(&self, tag: &str) -> Result<Box<dyn SpellBackend>, BackendError> {
        let words = self
            .dictionaries
            .get(tag)
            .ok_or_else(|| BackendError::DictionaryNotFound(tag.to_string()))?;
        Ok(Box::new(WordListDictionary::from_words(tag, words)))
    }

    fn dictionary_exists(&self, tag: &str) -> bool {
        self.dictionaries.contains_key(tag)
    }
}
