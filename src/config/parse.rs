use super::types::*;
use crate::config::{env_var_pattern, expand_env_vars, expand_tilde};
use chrono_tz::Tz;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("cannot read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parse and validate config text
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(yaml);

    check_unexpanded_vars(&yaml_string)?;

    // An empty document means "all defaults"
    let mut config: Config = if yaml_string.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&yaml_string)?
    };

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error.
/// Comment lines are not checked.
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<String> = yaml_string
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(|line| env_var_pattern().captures_iter(line))
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        unexpanded_vars.join(", ")
    )))
}

/// Expands tilde (~) in all path fields in the config.
fn expand_paths(config: &mut Config) {
    config.storage.path = expand_tilde(&config.storage.path);
    if let Some(path) = &config.report.failures_path {
        config.report.failures_path = Some(expand_tilde(path));
    }
}

/// Collects every problem in the config rather than stopping at the first
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if let Err(e) = parse_timezone(&config.import.timezone) {
        errors.push(e);
    }

    if config.import.dispatch_on.is_empty() {
        errors.push("import.dispatch_on must list at least one record indicator".to_string());
    }

    for indicator in &config.import.dispatch_on {
        if *indicator <= 0 {
            errors.push(format!(
                "import.dispatch_on: '{}' is not a record indicator",
                indicator
            ));
        }
    }

    if config.storage.path.as_os_str().is_empty() {
        errors.push("storage.path must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

/// Look up an IANA time zone by name
pub fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>()
        .map_err(|_| format!("unknown time zone '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.import.timezone, "Australia/Sydney");
        assert_eq!(config.import.dispatch_on, vec![200]);
        assert!(config.report.failures_path.is_none());
    }

    #[test]
    fn test_partial_config() {
        let config = parse_config(
            r#"
import:
  timezone: Australia/Brisbane
storage:
  path: /tmp/meter.duckdb
"#,
        )
        .unwrap();
        assert_eq!(config.import.timezone, "Australia/Brisbane");
        assert_eq!(config.import.dispatch_on, vec![200]);
        assert_eq!(config.storage.path, Path::new("/tmp/meter.duckdb"));
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let err = parse_config("import:\n  timezone: Mars/Olympus_Mons\n").unwrap_err();
        match err {
            ConfigError::ValidationList(errors) => {
                assert_eq!(errors, vec!["unknown time zone 'Mars/Olympus_Mons'"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_collects_all_validation_errors() {
        let err = parse_config(
            r#"
import:
  timezone: Nowhere
  dispatch_on: []
"#,
        )
        .unwrap_err();
        match err {
            ConfigError::ValidationList(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_negative_indicator_rejected() {
        let err = parse_config("import:\n  dispatch_on: [200, -1]\n").unwrap_err();
        assert!(err.to_string().contains("'-1' is not a record indicator"));
    }

    #[test]
    fn test_unset_env_var_rejected() {
        let err = parse_config("storage:\n  path: $env{NEM12_IMPORT_UNSET_TEST_VAR}/db\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("NEM12_IMPORT_UNSET_TEST_VAR"));
    }

    #[test]
    fn test_unset_env_var_in_comment_ignored() {
        let config = parse_config(
            "# storage path may use $env{NEM12_IMPORT_UNSET_TEST_VAR}\nimport:\n  timezone: Australia/Perth\n",
        )
        .unwrap();
        assert_eq!(config.import.timezone, "Australia/Perth");
    }

    #[test]
    fn test_invalid_yaml() {
        let err = parse_config("import: [not, a, map").unwrap_err();
        assert!(matches!(err, ConfigError::YamlParse(_)));
    }
}
