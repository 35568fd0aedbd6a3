pub mod generate;
pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use parse::{load_config, parse_config, parse_timezone, validate_config, ConfigError};
pub use types::{Config, ImportConfig, ReportConfig, StorageConfig};

/// Matches `$env{VAR_NAME}`
pub(crate) fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    })
}

/// Expands `$env{VAR_NAME}` references in a string.
/// Unset variables are left as written so the caller can report them.
pub fn expand_env_vars(text: &str) -> String {
    env_var_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Replaces a leading `~` with the home directory, if one is known.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    }

    path.to_path_buf()
}

/// Where `config init` writes by default
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/nem12-import/config.yml"))
}

pub const SYSTEM_CONFIG_PATH: &str = "/etc/nem12-import/config.yml";

/// Picks the config file to load:
/// 1. the explicit path, if given
/// 2. ~/.config/nem12-import/config.yml
/// 3. /etc/nem12-import/config.yml
///
/// Returns None when no file exists, in which case built-in defaults apply.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from(SYSTEM_CONFIG_PATH);
    if system_config.exists() {
        return Some(system_config);
    }

    None
}
