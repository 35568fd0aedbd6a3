pub mod backpressure;
pub mod failure;
pub mod runner;

pub use backpressure::{create_handoff, Completion, Handoff, HandoffClosed, HandoffReceiver, HandoffSender};
pub use failure::FailureDescriptor;
pub use runner::{read_and_process, read_and_process_file, BatchHandler, PipelineError, RunReport};
