//! Transport bridge between the controller and the processing thread.
//!
//! The bridge is two lock-free SPSC ring buffers, one per direction, plus a
//! shared closed flag:
//!
//! ```text
//!             ControllerPort                      ProcessorPort
//! controller ── sender ──▶ [ ring: to processor ] ──▶ receiver ── audio thread
//! controller ◀── receiver ── [ ring: to controller ] ◀── sender ── audio thread
//! ```
//!
//! - Delivery is FIFO per direction and at most once.
//! - There is no ordering between the two directions.
//! - Nothing on the send path blocks or allocates, so the processor side is
//!   safe to use from the audio callback.
//! - After [`BridgeHandle::close`], sends fail with [`BridgeError::Closed`]
//!   and receivers stop yielding messages.
//!
//! [`BridgeError::Closed`]: crate::BridgeError::Closed

mod port;

pub use port::{BridgeReceiver, BridgeSender};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::traits::Split;
use ringbuf::HeapRb;

use crate::message::Message;

/// State shared by every endpoint of one bridge.
#[derive(Debug, Default)]
pub(crate) struct BridgeState {
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl BridgeState {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Controller-side endpoints.
pub struct ControllerPort {
    /// Sends requests and control events to the processor.
    pub sender: BridgeSender,
    /// Receives responses and events from the processor.
    pub receiver: BridgeReceiver,
    /// Closes the bridge.
    pub handle: BridgeHandle,
}

/// Processor-side endpoints, owned by the processing node.
pub struct ProcessorPort {
    /// Sends responses and events to the controller.
    pub sender: BridgeSender,
    /// Receives requests and control events from the controller.
    pub receiver: BridgeReceiver,
}

/// Handle used to close a bridge and inspect its health.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    state: Arc<BridgeState>,
}

impl BridgeHandle {
    /// Closes both directions. Further sends fail; receivers go quiet.
    ///
    /// Ring storage is freed once every endpoint has been dropped.
    pub fn close(&self) {
        if !self.state.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Bridge closed");
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Number of messages dropped because a queue was full.
    pub fn dropped_messages(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }
}

/// Creates a bridge whose queues each hold `capacity` messages.
///
/// # Example
///
/// ```
/// use volume_meter::bridge;
/// use volume_meter::message::Message;
///
/// let (mut controller, mut processor) = bridge::channel(8);
///
/// processor.sender.send(Message::volume(0.25)).unwrap();
/// assert_eq!(controller.receiver.try_recv(), Some(Message::volume(0.25)));
///
/// controller.handle.close();
/// assert!(processor.sender.send(Message::volume(0.5)).is_err());
/// ```
pub fn channel(capacity: usize) -> (ControllerPort, ProcessorPort) {
    let capacity = capacity.max(1);
    let state = Arc::new(BridgeState::default());

    let (to_processor_tx, to_processor_rx) = HeapRb::<Message>::new(capacity).split();
    let (to_controller_tx, to_controller_rx) = HeapRb::<Message>::new(capacity).split();

    let controller = ControllerPort {
        sender: BridgeSender::new(to_processor_tx, Arc::clone(&state)),
        receiver: BridgeReceiver::new(to_controller_rx, Arc::clone(&state)),
        handle: BridgeHandle {
            state: Arc::clone(&state),
        },
    };
    let processor = ProcessorPort {
        sender: BridgeSender::new(to_controller_tx, Arc::clone(&state)),
        receiver: BridgeReceiver::new(to_processor_rx, state),
    };

    (controller, processor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageKind, Payload};
    use crate::BridgeError;

    #[test]
    fn test_fifo_per_direction() {
        let (mut controller, mut processor) = channel(8);

        for i in 0..5 {
            processor.sender.send(Message::volume(i as f32)).unwrap();
        }

        let received: Vec<_> = std::iter::from_fn(|| controller.receiver.try_recv())
            .map(|m| m.payload)
            .collect();
        let expected: Vec<_> = (0..5).map(|i| Payload::Volume(i as f32)).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn test_directions_are_independent() {
        let (mut controller, mut processor) = channel(4);

        controller
            .sender
            .send(Message::event(MessageKind::Configure, Payload::Empty))
            .unwrap();
        processor.sender.send(Message::volume(0.1)).unwrap();

        assert_eq!(
            processor.receiver.try_recv().map(|m| m.kind),
            Some(MessageKind::Configure)
        );
        assert_eq!(
            controller.receiver.try_recv().map(|m| m.kind),
            Some(MessageKind::Volume)
        );
        assert!(processor.receiver.try_recv().is_none());
    }

    #[test]
    fn test_full_queue_drops_and_counts() {
        let (controller, mut processor) = channel(2);

        processor.sender.send(Message::volume(0.1)).unwrap();
        processor.sender.send(Message::volume(0.2)).unwrap();
        let result = processor.sender.send(Message::volume(0.3));

        assert_eq!(result, Err(BridgeError::Full));
        assert_eq!(controller.handle.dropped_messages(), 1);
    }

    #[test]
    fn test_close_rejects_sends_and_silences_receivers() {
        let (mut controller, mut processor) = channel(4);
        processor.sender.send(Message::volume(0.1)).unwrap();

        controller.handle.close();

        assert!(controller.handle.is_closed());
        assert!(processor.sender.is_closed());
        assert_eq!(
            processor.sender.send(Message::volume(0.2)),
            Err(BridgeError::Closed)
        );
        assert_eq!(
            controller.sender.send(Message::volume(0.2)),
            Err(BridgeError::Closed)
        );
        assert!(controller.receiver.try_recv().is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (controller, _processor) = channel(1);
        controller.handle.close();
        controller.handle.close();
        assert!(controller.handle.is_closed());
    }

    #[test]
    fn test_zero_capacity_is_rounded_up() {
        let (mut controller, mut processor) = channel(0);
        processor.sender.send(Message::volume(1.0)).unwrap();
        assert!(controller.receiver.try_recv().is_some());
    }
}
