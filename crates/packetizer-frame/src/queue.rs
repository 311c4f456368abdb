//! Bounded queue in front of a handler running on its own thread.
//!
//! Dispatch is synchronous by default, so a slow handler stalls decoding.
//! Wrapping it in a [`QueuedHandler`] moves the work to a worker thread at
//! the cost of dropping messages when the queue is full.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::codec::Message;
use crate::registry::Handler;

/// Handler that forwards messages to a worker thread through a bounded queue.
pub struct QueuedHandler {
    tx: Option<SyncSender<Message>>,
    worker: Option<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl QueuedHandler {
    /// Spawn a worker running `handler`, fed by a queue holding up to `capacity` messages.
    pub fn spawn(capacity: usize, mut handler: impl Handler + 'static) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<Message>(capacity);
        let worker = std::thread::Builder::new()
            .name("packetizer-handler".to_string())
            .spawn(move || {
                for message in rx {
                    handler.handle(message);
                }
                debug!("handler queue closed");
            })?;

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Messages dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared view of the drop counter, usable after the handler moves into a registry.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }

    /// Close the queue and wait for the worker to drain it.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("handler worker panicked");
            }
        }
    }
}

impl Handler for QueuedHandler {
    fn handle(&mut self, message: Message) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        match tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(index = message.index, "handler queue full, dropping message");
            }
            Err(TrySendError::Disconnected(message)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(index = message.index, "handler worker gone, dropping message");
            }
        }
    }
}

impl Drop for QueuedHandler {
    fn drop(&mut self) {
        self.close();
    }
}
