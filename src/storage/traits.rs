use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One consumption value for one interval of one meter.
///
/// `timestamp` is the end of the interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalReading {
    pub nmi: String,
    pub timestamp: DateTime<Utc>,
    pub consumption: f64,
}

/// Acknowledgement of a committed bulk write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    pub rows_written: usize,
}

/// Sink for interval readings.
///
/// Each `write_intervals` call is one atomic bulk insert: either every row is
/// committed or none is. Implementations must not retry internally.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn init_schema(&self) -> Result<(), StorageError>;

    async fn write_intervals(&self, rows: &[IntervalReading]) -> Result<WriteAck, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("storage task failed: {0}")]
    Task(String),
}
