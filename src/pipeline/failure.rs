use crate::source::Batch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A line that could not be committed, with the error and the range of the
/// batch it belonged to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDescriptor {
    pub line: String,
    pub error: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl FailureDescriptor {
    /// One descriptor per line of `batch`, all citing the same error
    pub fn for_batch(batch: &Batch, error: &dyn fmt::Display) -> Vec<Self> {
        let error = error.to_string();
        batch
            .lines()
            .iter()
            .map(|line| Self {
                line: line.clone(),
                error: error.clone(),
                start_line: batch.start_line(),
                end_line: batch.end_line(),
            })
            .collect()
    }
}

impl fmt::Display for FailureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},lines {}-{}",
            self.line, self.error, self.start_line, self.end_line
        )
    }
}
