//! Spellweave entrypoint: check a text file and report misspelled words.
use anyhow::{Context, Result, bail};
use clap::Parser;
use core_config::load_from;
use core_model::{CheckerSettings, Correction, TextEditChecker};
use core_spell::WordListRegistry;
use core_text::Buffer;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Once;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "spellweave", version, about = "Spell check a text file")]
struct Args {
    /// File to check (UTF-8 text). Reads standard input when omitted.
    pub path: Option<PathBuf>,
    /// Optional configuration file path (overrides discovery of `spellweave.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Dictionary language, e.g. `en_US`. Overrides the configured language.
    #[arg(long = "lang")]
    pub lang: Option<String>,
    /// Print installed dictionaries and exit.
    #[arg(long = "list-languages")]
    pub list_languages: bool,
    /// Print suggestions next to each misspelled word.
    #[arg(long = "suggest")]
    pub suggest: bool,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("spellweave.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "spellweave.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so writer shuts down.
            }
        }

        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

fn read_input(path: Option<&Path>) -> Result<(String, String)> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let name = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("file")
                .to_string();
            tracing::debug!(target: "io", file = %path.display(), size_bytes = content.len(), "file_read_ok");
            Ok((name, content))
        }
        None => {
            let mut content = String::new();
            io::stdin().read_to_string(&mut content)?;
            Ok(("stdin".to_string(), content))
        }
    }
}

/// 1-based line and column for a char offset.
fn line_col(text: &str, pos: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for c in text.chars().take(pos) {
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn format_finding(name: &str, text: &str, correction: &Correction, suggest: bool) -> String {
    let (line, col) = line_col(text, correction.word.start);
    let mut out = format!("{name}:{line}:{col}: {}", correction.word.text);
    if suggest && !correction.suggestions.is_empty() {
        out.push_str(" -> ");
        out.push_str(&correction.suggestions.join(", "));
    }
    out
}

fn run(args: Args) -> Result<ExitCode> {
    let config = load_from(args.config.clone())?.with_language_override(args.lang.clone());
    let spell = &config.file.spell;
    let registry = WordListRegistry::new(spell.dictionary_dirs.clone());
    let mut checker: TextEditChecker =
        TextEditChecker::new(Box::new(registry), CheckerSettings::from(&config.file));

    let mut stdout = io::stdout().lock();
    if args.list_languages {
        for tag in checker.list_languages() {
            writeln!(stdout, "{tag}")?;
        }
        return Ok(ExitCode::SUCCESS);
    }
    if checker.language().is_empty() {
        bail!(
            "no dictionary for {:?} in {:?}",
            spell.language,
            spell.dictionary_dirs
        );
    }

    let (name, content) = read_input(args.path.as_deref())?;
    checker.attach(Buffer::from_str(name.as_str(), &content)?);
    let words = checker.misspellings();
    info!(target: "runtime", file = name.as_str(), language = checker.language(), misspelled = words.len(), "checked");

    for word in &words {
        let Some(correction) = checker.correction_at(word.start)? else {
            continue;
        };
        writeln!(stdout, "{}", format_finding(&name, &content, &correction, args.suggest))?;
    }
    Ok(if words.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn main() -> Result<ExitCode> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let result = run(Args::parse());
    if let Err(e) = &result {
        error!(target: "runtime", error = %e, "run_failed");
    }
    info!(target: "runtime", "shutdown");
    result
}
