//! Sending and receiving halves of a bridge direction.

use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::{HeapCons, HeapProd};

use super::BridgeState;
use crate::message::Message;
use crate::BridgeError;

/// Sending half of one bridge direction.
///
/// `send` never blocks and never allocates, so it can be called from the
/// audio callback.
pub struct BridgeSender {
    producer: HeapProd<Message>,
    state: Arc<BridgeState>,
}

impl BridgeSender {
    pub(super) fn new(producer: HeapProd<Message>, state: Arc<BridgeState>) -> Self {
        Self { producer, state }
    }

    /// Queues a message for the other side.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Closed`] if the bridge has been closed. The message
    ///   is not queued.
    /// - [`BridgeError::Full`] if the other side is not draining fast enough.
    ///   The message is dropped and counted.
    pub fn send(&mut self, message: Message) -> Result<(), BridgeError> {
        if self.state.is_closed() {
            return Err(BridgeError::Closed);
        }
        self.producer.try_push(message).map_err(|_| {
            self.state.record_drop();
            BridgeError::Full
        })
    }

    /// Returns `true` once the bridge has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

/// Receiving half of one bridge direction.
pub struct BridgeReceiver {
    consumer: HeapCons<Message>,
    state: Arc<BridgeState>,
}

impl BridgeReceiver {
    pub(super) fn new(consumer: HeapCons<Message>, state: Arc<BridgeState>) -> Self {
        Self { consumer, state }
    }

    /// Takes the oldest queued message, if any.
    ///
    /// Returns `None` once the bridge has been closed, even if messages were
    /// still queued.
    pub fn try_recv(&mut self) -> Option<Message> {
        if self.state.is_closed() {
            return None;
        }
        self.consumer.try_pop()
    }

    /// Number of messages waiting.
    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Returns `true` once the bridge has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}
