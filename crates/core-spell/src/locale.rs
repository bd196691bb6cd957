//! System locale lookup for the "use the default language" case.

use std::env;

const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// The locale name from the environment, reduced to a dictionary tag
/// (`de_DE.UTF-8@euro` becomes `de_DE`).
pub fn system_locale() -> Option<String> {
    LOCALE_VARS
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|value| !value.is_empty())
        .map(|value| normalize_locale(&value))
}

/// Strip codeset and modifier, and use `_` as the region separator.
pub fn normalize_locale(raw: &str) -> String {
    let base = raw.split(['.', '@']).next().unwrap_or_default();
    base.trim().replace('-', "_")
}

/// `C`, `POSIX` and empty names carry no language.
pub fn is_usable_locale(tag: &str) -> bool {
    !(tag.is_empty() || tag.eq_ignore_ascii_case("c") || tag.eq_ignore_ascii_case("posix"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_codeset_and_modifier() {
        assert_eq!(normalize_locale("de_DE.UTF-8@euro"), "de_DE");
        assert_eq!(normalize_locale("en_GB.utf8"), "en_GB");
        assert_eq!(normalize_locale("pt-BR"), "pt_BR");
        assert_eq!(normalize_locale("sr_RS@latin"), "sr_RS");
    }

    #[test]
    fn c_and_posix_are_unusable() {
        assert!(!is_usable_locale("C"));
        assert!(!is_usable_locale("POSIX"));
        assert!(!is_usable_locale(""));
        assert!(is_usable_locale("fi"));
    }
}
