//! Single-slot handoff between the line reader and the batch consumer.
//!
//! The producer blocks in [`HandoffSender::dispatch`] until the consumer has
//! finished with the item it sent, so at most one item is ever in flight.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("handoff consumer has gone away")]
pub struct HandoffClosed;

/// An item in flight plus the signal that releases the producer.
#[derive(Debug)]
pub struct Handoff<T> {
    item: T,
    done: Completion,
}

impl<T> Handoff<T> {
    pub fn into_parts(self) -> (T, Completion) {
        (self.item, self.done)
    }
}

/// Dropping a Completion without calling [`Completion::complete`] makes the
/// producer's pending dispatch fail with [`HandoffClosed`].
#[derive(Debug)]
pub struct Completion(oneshot::Sender<()>);

impl Completion {
    pub fn complete(self) {
        let _ = self.0.send(());
    }
}

pub struct HandoffSender<T> {
    tx: mpsc::Sender<Handoff<T>>,
}

impl<T> HandoffSender<T> {
    /// Send an item and wait until the consumer completes it
    pub async fn dispatch(&self, item: T) -> Result<(), HandoffClosed> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(Handoff {
                item,
                done: Completion(done_tx),
            })
            .await
            .map_err(|_| HandoffClosed)?;
        done_rx.await.map_err(|_| HandoffClosed)
    }
}

pub struct HandoffReceiver<T> {
    rx: mpsc::Receiver<Handoff<T>>,
}

impl<T> HandoffReceiver<T> {
    /// Next item, or None once the sender is dropped
    pub async fn recv(&mut self) -> Option<Handoff<T>> {
        self.rx.recv().await
    }
}

/// Create a handoff backed by a bounded channel of capacity one
pub fn create_handoff<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}
