use crate::config::{
    expand_tilde, load_config, parse_config, parse_timezone, resolve_config_path, validate_config,
    Config, ConfigError,
};
use crate::nem12::{dispatch_on, Nem12Processor};
use crate::pipeline::{read_and_process_file, FailureDescriptor, PipelineError, RunReport};
use crate::storage::duckdb::DuckDbStorage;
use crate::storage::traits::{Storage, StorageError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("failed to write failure report '{path}': {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Command-line settings for one import; each `Some` overrides the config file
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub file: PathBuf,
    pub timezone: Option<String>,
    pub database: Option<PathBuf>,
    pub failures: Option<PathBuf>,
}

/// Entry point for `nem12-import import`
pub async fn run(config_path: Option<&Path>, options: ImportOptions) -> Result<RunReport, RunError> {
    let config = resolve_config(config_path, &options)?;

    info!(path = %config.storage.path.display(), "Initializing storage");
    let storage = Arc::new(DuckDbStorage::new(&config.storage.path)?);
    storage.init_schema().await?;

    let report = import_file(&options.file, &config, storage).await?;

    if let Some(path) = &config.report.failures_path {
        write_failure_report(path, &report.failures)?;
        if !report.failures.is_empty() {
            info!(path = %path.display(), "Wrote failure report");
        }
    }

    Ok(report)
}

/// Load the config file (or built-in defaults) and apply command-line overrides
pub fn resolve_config(config_path: Option<&Path>, options: &ImportOptions) -> Result<Config, RunError> {
    let mut config = match resolve_config_path(config_path) {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            load_config(&path)?
        }
        None => {
            info!("No config file found, using defaults");
            parse_config("")?
        }
    };

    if let Some(timezone) = &options.timezone {
        config.import.timezone = timezone.clone();
    }
    if let Some(database) = &options.database {
        config.storage.path = expand_tilde(database);
    }
    if let Some(failures) = &options.failures {
        config.report.failures_path = Some(expand_tilde(failures));
    }

    validate_config(&config)?;
    Ok(config)
}

/// Import one NEM12 file into `storage` using the settings in `config`.
///
/// Failed batches are logged and returned in the report; only errors that stop
/// the file from being read are returned as `Err`.
pub async fn import_file(
    path: &Path,
    config: &Config,
    storage: Arc<dyn Storage>,
) -> Result<RunReport, RunError> {
    let tz = parse_timezone(&config.import.timezone).map_err(ConfigError::Validation)?;
    let mut processor = Nem12Processor::new(tz, storage);

    info!(
        file = %path.display(),
        timezone = %tz,
        dispatch_on = ?config.import.dispatch_on,
        "Starting import"
    );

    let report = read_and_process_file(path, dispatch_on(&config.import.dispatch_on), &mut processor).await?;

    if report.failures.is_empty() {
        info!(lines = report.lines, batches = report.batches, "Import complete");
    } else {
        warn!(
            lines = report.lines,
            batches = report.batches,
            failures = report.failures.len(),
            "Import complete with failures"
        );
        for failure in &report.failures {
            error!("{}", failure);
        }
    }

    Ok(report)
}

/// Write failures to `path` as JSON lines, replacing any existing file
pub fn write_failure_report(path: &Path, failures: &[FailureDescriptor]) -> Result<(), RunError> {
    let report_error = |source: std::io::Error| RunError::Report {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::io::BufWriter::new(std::fs::File::create(path).map_err(report_error)?);
    for failure in failures {
        serde_json::to_writer(&mut file, failure).map_err(|e| report_error(e.into()))?;
        file.write_all(b"\n").map_err(report_error)?;
    }
    file.flush().map_err(report_error)?;

    Ok(())
}
