use crate::pipeline::backpressure::{create_handoff, HandoffSender};
use crate::pipeline::failure::FailureDescriptor;
use crate::source::reader::{LineReader, ReaderError};
use crate::source::{Batch, BatchBuilder};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tracing::{debug, info, warn};

/// Errors that abort a whole run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source reader error: {0}")]
    Read(#[from] ReaderError),

    #[error("line reader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Consumer of completed batches.
///
/// Returns one failure descriptor per line that could not be committed; an
/// empty result means the whole batch succeeded.
#[async_trait]
pub trait BatchHandler: Send {
    async fn process(&mut self, batch: Batch) -> Vec<FailureDescriptor>;
}

/// Outcome of a run that read the whole source
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Failures from every batch, in file order
    pub failures: Vec<FailureDescriptor>,
    pub batches: usize,
    pub lines: usize,
}

/// Open `path` and run it through [`read_and_process`].
pub async fn read_and_process_file<D, H>(
    path: &Path,
    should_dispatch: D,
    handler: &mut H,
) -> Result<RunReport, PipelineError>
where
    D: FnMut(&str) -> bool + Send + 'static,
    H: BatchHandler + ?Sized,
{
    info!(path = %path.display(), "Reading file");
    let reader = LineReader::open(path).await?;
    read_and_process(reader, should_dispatch, handler).await
}

/// Read `reader` line by line, cut it into batches and feed them to `handler`.
///
/// A batch ends at every line for which `should_dispatch` returns true (that
/// line included); leftover lines at end of input form a final batch. Lines
/// are read on a separate task that stops after each dispatched batch until
/// `handler` has finished with it, so only one batch is held at a time and
/// batches are handled strictly in file order.
///
/// A read error aborts the run. Batch failures are collected and returned.
pub async fn read_and_process<R, D, H>(
    reader: LineReader<R>,
    should_dispatch: D,
    handler: &mut H,
) -> Result<RunReport, PipelineError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    D: FnMut(&str) -> bool + Send + 'static,
    H: BatchHandler + ?Sized,
{
    let (batch_tx, mut batch_rx) = create_handoff::<Batch>();
    let producer = tokio::spawn(run_line_reader(reader, should_dispatch, batch_tx));

    let mut report = RunReport::default();

    while let Some(handoff) = batch_rx.recv().await {
        let (batch, done) = handoff.into_parts();
        let (start_line, end_line) = (batch.start_line(), batch.end_line());

        debug!(start_line, end_line, records = batch.len(), "Dispatching batch");
        let failures = handler.process(batch).await;
        if !failures.is_empty() {
            warn!(
                start_line,
                end_line,
                failed = failures.len(),
                "Batch failed"
            );
        }

        report.failures.extend(failures);
        report.batches += 1;
        done.complete();
    }

    // The receiver only closes once the reader task has returned.
    report.lines = producer.await??;

    info!(
        lines = report.lines,
        batches = report.batches,
        failures = report.failures.len(),
        "Finished reading"
    );

    Ok(report)
}

/// Producer side: returns the number of lines read.
async fn run_line_reader<R, D>(
    mut reader: LineReader<R>,
    mut should_dispatch: D,
    output: HandoffSender<Batch>,
) -> Result<usize, ReaderError>
where
    R: AsyncBufRead + Unpin,
    D: FnMut(&str) -> bool,
{
    let mut builder = BatchBuilder::new();

    while let Some(line) = reader.next_line().await? {
        let dispatch = should_dispatch(&line.text);
        builder.push(line.number, line.text);

        if dispatch {
            if let Some(batch) = builder.take() {
                if output.dispatch(batch).await.is_err() {
                    warn!("Batch consumer closed, stopping reader");
                    return Ok(reader.lines_read());
                }
            }
        }
    }

    if let Some(batch) = builder.take() {
        debug!(start_line = batch.start_line(), "Dispatching final batch");
        if output.dispatch(batch).await.is_err() {
            warn!("Batch consumer closed before final batch");
        }
    }

    Ok(reader.lines_read())
}
