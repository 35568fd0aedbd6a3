pub mod batch;
pub mod reader;

pub use batch::{Batch, BatchBuilder};
pub use reader::{LineReader, NumberedLine, ReaderError};
