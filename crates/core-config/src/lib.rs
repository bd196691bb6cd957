//! Configuration loading and parsing.
//!
//! Parses `spellweave.toml` (or an override path provided by the binary). Sections:
//!
//! ```toml
//! [spell]
//! language = "en_US"          # empty / absent: system locale
//! enabled = true
//! dictionary_dirs = ["/usr/share/hunspell"]
//! max_suggestions = 10
//!
//! [history]
//! enabled = true
//!
//! [highlight]
//! underline = "spellcheck"    # "spellcheck" | "single"
//! color = "#ff0000"
//! ```
//!
//! Unknown fields are ignored (TOML deserialization tolerance). A file that fails to parse
//! falls back to defaults rather than aborting startup.

use anyhow::Result;
use core_text::{CharFormat, Rgb, UnderlineStyle};
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "spellweave.toml";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SpellConfig {
    #[serde(default)]
    pub language: String,
    #[serde(default = "SpellConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "SpellConfig::default_dictionary_dirs")]
    pub dictionary_dirs: Vec<PathBuf>,
    #[serde(default = "SpellConfig::default_max_suggestions")]
    pub max_suggestions: usize,
}

impl Default for SpellConfig {
    fn default() -> Self {
        Self {
            language: String::new(),
            enabled: Self::default_enabled(),
            dictionary_dirs: Self::default_dictionary_dirs(),
            max_suggestions: Self::default_max_suggestions(),
        }
    }
}

impl SpellConfig {
    const fn default_enabled() -> bool {
        true
    }
    const fn default_max_suggestions() -> usize {
        10
    }
    fn default_dictionary_dirs() -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(dir) = dirs::data_dir() {
            dirs.push(dir.join("spellweave").join("dicts"));
        }
        dirs.push(PathBuf::from("/usr/share/hunspell"));
        dirs.push(PathBuf::from("/usr/share/myspell/dicts"));
        dirs
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    #[serde(default = "HistoryConfig::default_enabled")]
    pub enabled: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
        }
    }
}

impl HistoryConfig {
    const fn default_enabled() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnderlineKind {
    #[default]
    Spellcheck,
    Single,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HighlightConfig {
    #[serde(default)]
    pub underline: UnderlineKind,
    #[serde(default = "HighlightConfig::default_color")]
    pub color: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            underline: UnderlineKind::default(),
            color: Self::default_color(),
        }
    }
}

impl HighlightConfig {
    fn default_color() -> String {
        "#ff0000".to_string()
    }

    /// Format applied to misspelled words. An unparsable color falls back to red.
    pub fn misspelled_format(&self) -> CharFormat {
        let color = parse_hex_color(&self.color).unwrap_or_else(|| {
            warn!(target: "config", color = self.color.as_str(), "highlight_color_invalid");
            Rgb::RED
        });
        let underline = match self.underline {
            UnderlineKind::Spellcheck => UnderlineStyle::SpellCheck,
            UnderlineKind::Single => UnderlineStyle::Single,
        };
        CharFormat {
            underline,
            underline_color: Some(color),
        }
    }
}

fn parse_hex_color(s: &str) -> Option<Rgb> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub spell: SpellConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,    // original file string (optional)
    pub path: Option<PathBuf>,  // file the values came from
    pub file: ConfigFile,       // parsed (or default) data
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("spellweave").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                info!(target: "config", path = %path.display(), "config_loaded");
                Ok(Config {
                    raw: Some(content),
                    path: Some(path),
                    file,
                })
            }
            Err(e) => {
                warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
                Ok(Config::default())
            }
        }
    } else {
        Ok(Config::default())
    }
}

impl Config {
    /// Language override from the command line wins over the file value.
    pub fn with_language_override(mut self, lang: Option<String>) -> Self {
        if let Some(lang) = lang {
            info!(target: "config", from = self.file.spell.language.as_str(), to = lang.as_str(), "language_override");
            self.file.spell.language = lang;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert!(cfg.raw.is_none());
        assert!(cfg.file.spell.enabled);
        assert!(cfg.file.history.enabled);
        assert_eq!(cfg.file.spell.max_suggestions, 10);
        assert!(cfg.file.spell.language.is_empty());
    }

    #[test]
    fn parses_all_sections() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[spell]\nlanguage = \"de_DE\"\nenabled = false\ndictionary_dirs = [\"/opt/dicts\"]\nmax_suggestions = 4\n\
             [history]\nenabled = false\n[highlight]\nunderline = \"single\"\ncolor = \"#00ff80\"\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.spell.language, "de_DE");
        assert!(!cfg.file.spell.enabled);
        assert_eq!(cfg.file.spell.dictionary_dirs, vec![PathBuf::from("/opt/dicts")]);
        assert_eq!(cfg.file.spell.max_suggestions, 4);
        assert!(!cfg.file.history.enabled);
        let fmt = cfg.file.highlight.misspelled_format();
        assert_eq!(fmt.underline, UnderlineStyle::Single);
        assert_eq!(fmt.underline_color, Some(Rgb(0x00, 0xff, 0x80)));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[spell]\nlanguage = \"fr_FR\"\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.spell.language, "fr_FR");
        assert!(cfg.file.spell.enabled);
        assert!(!cfg.file.spell.dictionary_dirs.is_empty());
        assert_eq!(
            cfg.file.highlight.misspelled_format(),
            CharFormat::spell_error(Rgb::RED)
        );
    }

    #[test]
    fn parse_error_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[spell\nlanguage = ").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(cfg.raw.is_none());
        assert!(cfg.file.spell.enabled);
    }

    #[test]
    fn language_override_wins() {
        let cfg = Config::default().with_language_override(Some("nl_NL".into()));
        assert_eq!(cfg.file.spell.language, "nl_NL");
        let cfg = cfg.with_language_override(None);
        assert_eq!(cfg.file.spell.language, "nl_NL");
    }

    #[test]
    fn invalid_color_logs_and_falls_back() {
        let highlight = HighlightConfig {
            underline: UnderlineKind::Spellcheck,
            color: "crimson".into(),
        };
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::WARN)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let fmt = with_default(subscriber, || highlight.misspelled_format());

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("WARN config:"));
        assert!(log_output.contains("highlight_color_invalid"));
        assert_eq!(fmt.underline_color, Some(Rgb::RED));
    }
}
