use std::collections::HashMap;

use tracing::{debug, warn};

use crate::codec::Message;

/// Receives decoded messages.
///
/// Handlers run synchronously on the thread that feeds bytes in. Any
/// `FnMut(Message) + Send` closure is a handler.
pub trait Handler: Send {
    /// Handle one decoded message.
    fn handle(&mut self, message: Message);
}

impl<F> Handler for F
where
    F: FnMut(Message) + Send,
{
    fn handle(&mut self, message: Message) {
        self(message)
    }
}

/// Outcome of dispatching one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A handler for the message index received it.
    Delivered,
    /// No handler is registered for the message index.
    Unrouted,
}

/// Index-keyed table of message handlers.
///
/// At most one handler per index. An optional monitor sees every message
/// in addition to the per-index handler.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<u8, Box<dyn Handler>>,
    monitor: Option<Box<dyn Handler>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `index`, returning the handler it replaces.
    pub fn subscribe(
        &mut self,
        index: u8,
        handler: impl Handler + 'static,
    ) -> Option<Box<dyn Handler>> {
        let previous = self.handlers.insert(index, Box::new(handler));
        if previous.is_some() {
            debug!(index, "replaced handler");
        }
        previous
    }

    /// Remove the handler for `index`. Returns whether one was registered.
    pub fn unsubscribe(&mut self, index: u8) -> bool {
        self.handlers.remove(&index).is_some()
    }

    /// Register a handler that observes every message regardless of index.
    pub fn subscribe_all(&mut self, handler: impl Handler + 'static) {
        self.monitor = Some(Box::new(handler));
    }

    /// Remove the monitor handler. Returns whether one was registered.
    pub fn unsubscribe_all(&mut self) -> bool {
        self.monitor.take().is_some()
    }

    /// Deliver `message` to the monitor and to the handler for its index.
    pub fn dispatch(&mut self, message: Message) -> Delivery {
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.handle(message.clone());
        }

        match self.handlers.get_mut(&message.index) {
            Some(handler) => {
                handler.handle(message);
                Delivery::Delivered
            }
            None => {
                warn!(
                    index = message.index,
                    size = message.payload.len(),
                    "no handler for index, dropping message"
                );
                Delivery::Unrouted
            }
        }
    }

    /// Check if `index` has a registered handler.
    pub fn is_subscribed(&self, index: u8) -> bool {
        self.handlers.contains_key(&index)
    }

    /// Check if a monitor handler is registered.
    pub fn has_monitor(&self) -> bool {
        self.monitor.is_some()
    }

    /// Indices that have registered handlers, sorted.
    pub fn indices(&self) -> Vec<u8> {
        let mut indices: Vec<u8> = self.handlers.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Number of per-index handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no per-index handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("indices", &self.indices())
            .field("monitor", &self.has_monitor())
            .finish()
    }
}
