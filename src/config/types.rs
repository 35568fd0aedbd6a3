use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// IANA time zone used to interpret every date field in the file
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Record indicators whose line closes the current batch
    #[serde(default = "default_dispatch_on")]
    pub dispatch_on: Vec<i64>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            dispatch_on: default_dispatch_on(),
        }
    }
}

pub const DEFAULT_TIMEZONE: &str = "Australia/Sydney";

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_dispatch_on() -> Vec<i64> {
    vec![200]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("~/.local/share/nem12-import/meter_data.duckdb")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Write failures as JSON lines to this file
    #[serde(default)]
    pub failures_path: Option<PathBuf>,
}
