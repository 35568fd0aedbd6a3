pub mod processor;
pub mod record;
pub mod timestamp;

pub use processor::{dispatch_on, expand_intervals, MeterContext, Nem12Processor, ProcessError};
pub use record::{Record, RecordError};
pub use timestamp::{DateLayout, TimestampError};
