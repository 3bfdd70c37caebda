//! Single-worker deferred write queue
//!
//! Callers that must not block (LED setters) enqueue a closure and return.
//! One worker runs jobs in submission order.

use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::KeyboardError;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    /// Acknowledged once every earlier job has finished
    Barrier(oneshot::Sender<()>),
}

pub struct WorkQueue {
    name: String,
    tx: Option<mpsc::UnboundedSender<Message>>,
    handle: Option<JoinHandle<()>>,
}

impl WorkQueue {
    pub fn new(name: &str) -> Result<Self, KeyboardError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Some(msg) = rx.blocking_recv() {
                    match msg {
                        Message::Run(job) => job(),
                        Message::Barrier(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            })
            .map_err(|e| KeyboardError::Internal(format!("failed to spawn {name}: {e}")))?;
        debug!("work queue {name} started");

        Ok(Self {
            name: name.to_string(),
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Queue `job` behind everything already submitted
    pub fn enqueue(&self, job: impl FnOnce() + Send + 'static) -> Result<(), KeyboardError> {
        self.send(Message::Run(Box::new(job)))
    }

    /// Block until every job submitted so far has run
    pub fn flush(&self) -> Result<(), KeyboardError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(Message::Barrier(done_tx))?;
        done_rx
            .blocking_recv()
            .map_err(|_| KeyboardError::Internal(format!("{} worker exited", self.name)))
    }

    fn send(&self, msg: Message) -> Result<(), KeyboardError> {
        self.tx
            .as_ref()
            .ok_or_else(|| KeyboardError::Internal(format!("{} is shut down", self.name)))?
            .send(msg)
            .map_err(|_| KeyboardError::Internal(format!("{} worker exited", self.name)))
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        // closing the channel lets the worker drain and exit
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("work queue {} panicked", self.name);
            }
        }
    }
}
