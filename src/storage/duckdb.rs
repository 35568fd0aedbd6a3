use super::traits::{IntervalReading, Storage, StorageError, WriteAck};
use async_trait::async_trait;
use chrono::DateTime;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// DuckDB implementation of the Storage trait
pub struct DuckDbStorage {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStorage {
    /// Open (or create) a database file, creating its parent directory if needed
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Task(format!(
                    "failed to create database directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "Opened database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory DuckDB storage instance (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// All readings stored for one NMI, ordered by timestamp
    pub async fn intervals_for_nmi(&self, nmi: &str) -> Result<Vec<IntervalReading>, StorageError> {
        let conn = self.conn.clone();
        let nmi = nmi.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare(
                "SELECT nmi, epoch_us(timestamp), consumption
                 FROM meter_data WHERE nmi = ? ORDER BY timestamp",
            )?;

            let rows = stmt.query_map(duckdb::params![nmi], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })?;

            let mut readings = Vec::new();
            for row in rows {
                let (nmi, micros, consumption) = row?;
                let timestamp = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                    StorageError::Task(format!("timestamp out of range: {} us", micros))
                })?;
                readings.push(IntervalReading {
                    nmi,
                    timestamp,
                    consumption,
                });
            }

            Ok::<_, StorageError>(readings)
        })
        .await
        .map_err(|e| StorageError::Task(format!("Task join error: {}", e)))?
    }

    /// Total number of stored readings
    pub async fn count_intervals(&self) -> Result<usize, StorageError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM meter_data", [], |row| row.get(0))?;
            Ok::<_, StorageError>(usize::try_from(count).unwrap_or_default())
        })
        .await
        .map_err(|e| StorageError::Task(format!("Task join error: {}", e)))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StorageError> {
    conn.lock()
        .map_err(|_| StorageError::Task("database connection mutex poisoned".to_string()))
}

#[async_trait]
impl Storage for DuckDbStorage {
    async fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;

            conn.execute(
                "CREATE TABLE IF NOT EXISTS meter_data (
                    nmi VARCHAR NOT NULL,
                    timestamp TIMESTAMPTZ NOT NULL,
                    consumption DOUBLE NOT NULL
                )",
                [],
            )?;

            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_meter_data_nmi_timestamp ON meter_data(nmi, timestamp)",
                [],
            )?;

            Ok::<(), StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Task(format!("Task join error: {}", e)))?
    }

    async fn write_intervals(&self, rows: &[IntervalReading]) -> Result<WriteAck, StorageError> {
        if rows.is_empty() {
            return Ok(WriteAck { rows_written: 0 });
        }

        let conn = self.conn.clone();
        let rows = rows.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO meter_data (nmi, timestamp, consumption)
                     VALUES (?, to_timestamp(? / 1000000.0), ?)",
                )?;

                for row in &rows {
                    stmt.execute(duckdb::params![
                        row.nmi,
                        row.timestamp.timestamp_micros(),
                        row.consumption,
                    ])?;
                }
            }
            tx.commit()?;

            Ok::<_, StorageError>(WriteAck {
                rows_written: rows.len(),
            })
        })
        .await
        .map_err(|e| StorageError::Task(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading(nmi: &str, minute: u32, consumption: f64) -> IntervalReading {
        IntervalReading {
            nmi: nmi.to_string(),
            timestamp: Utc.with_ymd_and_hms(2005, 3, 3, 13, minute, 0).unwrap(),
            consumption,
        }
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let storage = DuckDbStorage::in_memory().unwrap();
        storage.init_schema().await.unwrap();

        let rows = vec![
            reading("NEM1201009", 30, 0.5),
            reading("NEM1201009", 0, 0.25),
            reading("NEM1201010", 0, 1.0),
        ];
        let ack = storage.write_intervals(&rows).await.unwrap();
        assert_eq!(ack.rows_written, 3);

        let stored = storage.intervals_for_nmi("NEM1201009").await.unwrap();
        assert_eq!(stored, vec![rows[1].clone(), rows[0].clone()]);
        assert_eq!(storage.count_intervals().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_empty_write_is_noop() {
        let storage = DuckDbStorage::in_memory().unwrap();
        storage.init_schema().await.unwrap();

        let ack = storage.write_intervals(&[]).await.unwrap();
        assert_eq!(ack.rows_written, 0);
        assert_eq!(storage.count_intervals().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_without_schema_fails() {
        let storage = DuckDbStorage::in_memory().unwrap();
        let result = storage.write_intervals(&[reading("NEM1201009", 0, 0.1)]).await;
        assert!(matches!(result, Err(StorageError::Database(_))));
    }

    #[tokio::test]
    async fn test_init_schema_idempotent() {
        let storage = DuckDbStorage::in_memory().unwrap();
        storage.init_schema().await.unwrap();
        storage.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_new_creates_parent_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("meter_data.duckdb");

        let storage = DuckDbStorage::new(&path).unwrap();
        storage.init_schema().await.unwrap();
        assert!(path.exists());
    }
}
