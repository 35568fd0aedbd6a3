use crate::nem12::record::{parse_indicator, split_line, IntervalDataRecord, MeterConfigRecord, Record, RecordError};
use crate::pipeline::{BatchHandler, FailureDescriptor};
use crate::source::Batch;
use crate::storage::{IntervalReading, Storage, StorageError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Errors that fail a whole batch
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{0}")]
    Record(#[from] RecordError),

    #[error("interval data on line {line} has no preceding 200 record")]
    MissingMeterContext { line: usize },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// The meter that subsequent 300 records belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterContext {
    pub nmi: String,
    pub interval_length: u32,
}

impl From<&MeterConfigRecord> for MeterContext {
    fn from(record: &MeterConfigRecord) -> Self {
        Self {
            nmi: record.nmi.clone(),
            interval_length: record.interval_length,
        }
    }
}

/// Build a dispatch predicate that closes a batch after any line whose
/// record indicator is in `indicators`.
pub fn dispatch_on(indicators: &[i64]) -> impl Fn(&str) -> bool + Send + Sync + 'static {
    let indicators: HashSet<i64> = indicators.iter().copied().collect();
    move |line: &str| {
        let first = line.split(',').next().unwrap_or_default();
        first
            .trim()
            .parse::<i64>()
            .is_ok_and(|indicator| indicators.contains(&indicator))
    }
}

/// Expand one day of interval data into readings.
///
/// Slot `k` is the interval ending `interval_length * (k + 1)` minutes after
/// the start of the day.
pub fn expand_intervals(context: &MeterContext, data: &IntervalDataRecord) -> Vec<IntervalReading> {
    let length = i64::from(context.interval_length);
    data.interval_values
        .iter()
        .zip(1i64..)
        .map(|(&consumption, slot_end)| IntervalReading {
            nmi: context.nmi.clone(),
            timestamp: (data.day_start + Duration::minutes(length * slot_end)).with_timezone(&Utc),
            consumption,
        })
        .collect()
}

/// Turns batches of NEM12 lines into interval readings and writes them.
///
/// The meter context set by a 200 record carries over into later batches
/// handled by the same processor.
pub struct Nem12Processor {
    tz: Tz,
    storage: Arc<dyn Storage>,
    context: Option<MeterContext>,
}

impl Nem12Processor {
    pub fn new(tz: Tz, storage: Arc<dyn Storage>) -> Self {
        Self {
            tz,
            storage,
            context: None,
        }
    }

    /// Start from an existing meter context
    pub fn with_context(mut self, context: MeterContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn context(&self) -> Option<&MeterContext> {
        self.context.as_ref()
    }

    /// Parse and write one batch. On error nothing from this batch is written
    /// unless the error came from the storage itself.
    pub async fn process_batch(&mut self, batch: &Batch) -> Result<usize, ProcessError> {
        let groups = match self.group_readings(batch) {
            Ok(groups) => groups,
            Err(e) => {
                self.recover_context(batch);
                return Err(e);
            }
        };

        let mut written = 0;
        for group in &groups {
            let ack = self.storage.write_intervals(group).await?;
            debug!(
                nmi = %group[0].nmi,
                rows = ack.rows_written,
                "Wrote interval readings"
            );
            written += ack.rows_written;
        }

        Ok(written)
    }

    /// Parse every line and collect the readings to write, one group per
    /// meter context. Advances the meter context.
    fn group_readings(&mut self, batch: &Batch) -> Result<Vec<Vec<IntervalReading>>, ProcessError> {
        let mut groups = Vec::new();
        let mut pending: Vec<IntervalReading> = Vec::new();

        for (line_number, fields) in (batch.start_line()..).zip(batch.raw_lines()) {
            match Record::parse(&fields, self.tz)? {
                Record::MeterConfig(config) => {
                    if !pending.is_empty() {
                        groups.push(std::mem::take(&mut pending));
                    }
                    debug!(nmi = %config.nmi, interval_length = config.interval_length, "Meter context");
                    self.context = Some(MeterContext::from(&config));
                }
                Record::IntervalData(data) => {
                    let context = self
                        .context
                        .as_ref()
                        .ok_or(ProcessError::MissingMeterContext { line: line_number })?;
                    pending.extend(expand_intervals(context, &data));
                }
                other => {
                    trace!(line = line_number, indicator = other.indicator(), "Skipping record");
                }
            }
        }

        if !pending.is_empty() {
            groups.push(pending);
        }

        Ok(groups)
    }

    /// After a failed batch, adopt the last valid 200 record in it so that
    /// later batches are still attributed to the right meter.
    fn recover_context(&mut self, batch: &Batch) {
        let last_config = batch
            .lines()
            .iter()
            .rev()
            .map(|line| split_line(line))
            .filter(|fields| parse_indicator(fields) == Ok(200))
            .find_map(|fields| match Record::parse(&fields, self.tz) {
                Ok(Record::MeterConfig(config)) => Some(config),
                _ => None,
            });

        if let Some(config) = last_config {
            self.context = Some(MeterContext::from(&config));
        }
    }
}

#[async_trait]
impl BatchHandler for Nem12Processor {
    async fn process(&mut self, batch: Batch) -> Vec<FailureDescriptor> {
        debug!(records = batch.len(), "Processing batch");

        match self.process_batch(&batch).await {
            Ok(rows) => {
                debug!(records = batch.len(), rows, "Processed batch");
                Vec::new()
            }
            Err(e) => {
                warn!(
                    start_line = batch.start_line(),
                    end_line = batch.end_line(),
                    error = %e,
                    "Failed to process batch"
                );
                FailureDescriptor::for_batch(&batch, &e)
            }
        }
    }
}
