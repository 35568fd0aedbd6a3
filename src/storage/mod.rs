pub mod duckdb;
pub mod traits;

pub use traits::{IntervalReading, Storage, StorageError, WriteAck};
