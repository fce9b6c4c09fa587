//! Processing node: the part of the meter that runs on the audio thread.
//!
//! The node owns the processor side of the bridge and a [`VolumeProcessor`].
//! Each call to [`ProcessorNode::process`]:
//! - drains control messages from the controller and answers requests
//! - feeds the block to the volume processor
//! - posts a VOLUME event when an update is due
//!
//! Nothing here blocks or allocates. Messages that cannot be queued are
//! dropped and counted by the bridge.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::volume::VolumeProcessor;
use crate::block::AudioBlock;
use crate::bridge::ProcessorPort;
use crate::logger::LogLevel;
use crate::message::{Message, MessageKind, Payload};

/// Shared handle to a processing node.
///
/// Audio callbacks only ever `try_lock` it. A block that finds the node busy
/// is skipped.
pub type ProcessorHandle = Arc<Mutex<ProcessorNode>>;

/// Counters updated by the node and read by the controller.
#[derive(Debug, Default)]
pub struct ProcessorStats {
    blocks_processed: AtomicU64,
    volume_events: AtomicU64,
    latest_volume: AtomicU32,
}

impl ProcessorStats {
    /// Blocks fed to the volume processor.
    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed.load(Ordering::Relaxed)
    }

    /// VOLUME events handed to the bridge.
    pub fn volume_events(&self) -> u64 {
        self.volume_events.load(Ordering::Relaxed)
    }

    /// Volume at the most recent update.
    pub fn latest_volume(&self) -> f32 {
        f32::from_bits(self.latest_volume.load(Ordering::Relaxed))
    }

    fn record_block(&self) {
        self.blocks_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_update(&self, volume: f32, posted: bool) {
        self.latest_volume.store(volume.to_bits(), Ordering::Relaxed);
        if posted {
            self.volume_events.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Real-time side of the meter.
pub struct ProcessorNode {
    processor: VolumeProcessor,
    port: ProcessorPort,
    destroyed: bool,
    stats: Arc<ProcessorStats>,
}

impl ProcessorNode {
    /// Creates a node and announces it with a LOG event.
    pub fn new(processor: VolumeProcessor, port: ProcessorPort) -> Self {
        let mut node = Self {
            processor,
            port,
            destroyed: false,
            stats: Arc::new(ProcessorStats::default()),
        };
        node.post(Message::log(LogLevel::Debug, "volume processor initialized"));
        node
    }

    /// Wraps the node in a [`ProcessorHandle`].
    pub fn into_handle(self) -> ProcessorHandle {
        Arc::new(Mutex::new(self))
    }

    /// Counters shared with the controller.
    pub fn stats(&self) -> Arc<ProcessorStats> {
        Arc::clone(&self.stats)
    }

    /// The volume processor driven by this node.
    pub fn processor(&self) -> &VolumeProcessor {
        &self.processor
    }

    /// Retunes the countdown for a source with a different sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if self.processor.sample_rate() != sample_rate {
            tracing::debug!(sample_rate, "Retuning processor");
            self.processor.set_sample_rate(sample_rate);
        }
    }

    /// Processes one block. Always returns `true`: the node never asks to be
    /// detached.
    pub fn process(&mut self, block: AudioBlock<'_>) -> bool {
        while let Some(message) = self.port.receiver.try_recv() {
            self.handle(message);
        }

        if block.is_disconnected() {
            return true;
        }
        self.stats.record_block();

        if let Some(volume) = self.processor.process(block) {
            let posted = !self.destroyed && self.post(Message::volume(volume));
            self.stats.record_update(volume, posted);
        }
        true
    }

    fn handle(&mut self, message: Message) {
        let Message { kind, id, payload } = message;

        let Some(id) = id else {
            if let (MessageKind::Configure, Payload::Configure { update_interval_ms }) =
                (kind, payload)
            {
                self.processor.set_update_interval(update_interval_ms);
            }
            return;
        };

        let reply = match kind {
            MessageKind::Initialize if !self.destroyed => Message::result(id, Payload::Empty),
            MessageKind::Reset if !self.destroyed => {
                self.processor.reset();
                Message::result(id, Payload::Empty)
            }
            MessageKind::Destroy => {
                self.destroyed = true;
                Message::result(id, Payload::Empty)
            }
            MessageKind::Initialize | MessageKind::Reset => {
                Message::error(id, "processor destroyed")
            }
            _ => Message::error(id, "unsupported request"),
        };
        self.post(reply);
    }

    /// Queues a message for the controller. Returns `false` if it was
    /// dropped.
    fn post(&mut self, message: Message) -> bool {
        self.port.sender.send(message).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{self, ControllerPort};
    use crate::protocol::CorrelationId;

    const RATE: u32 = 48000;

    fn node() -> (ControllerPort, ProcessorNode) {
        let (controller, processor) = bridge::channel(64);
        let node = ProcessorNode::new(VolumeProcessor::with_defaults(RATE), processor);
        (controller, node)
    }

    fn drain(controller: &mut ControllerPort) -> Vec<Message> {
        std::iter::from_fn(|| controller.receiver.try_recv()).collect()
    }

    fn volumes(messages: &[Message]) -> Vec<f32> {
        messages
            .iter()
            .filter_map(|m| match m.payload {
                Payload::Volume(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_construction_posts_log() {
        let (mut controller, _node) = node();
        let messages = drain(&mut controller);
        assert_eq!(
            messages,
            vec![Message::log(LogLevel::Debug, "volume processor initialized")]
        );
    }

    #[test]
    fn test_emits_volume_per_interval() {
        let (mut controller, mut node) = node();
        drain(&mut controller);

        let samples = [0.5f32; 128];
        for _ in 0..94 {
            assert!(node.process(AudioBlock::mono(&samples)));
        }

        let updates = volumes(&drain(&mut controller));
        assert_eq!(updates.len(), 10);
        assert!(updates.iter().all(|v| (v - 0.5).abs() < 1e-6));

        let stats = node.stats();
        assert_eq!(stats.blocks_processed(), 94);
        assert_eq!(stats.volume_events(), 10);
        assert!((stats.latest_volume() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_disconnected_blocks_still_drain_control() {
        let (mut controller, mut node) = node();
        drain(&mut controller);

        let id = CorrelationId::new("req-000001");
        controller
            .sender
            .send(Message::request(
                MessageKind::Initialize,
                id.clone(),
                Payload::Empty,
            ))
            .unwrap();

        assert!(node.process(AudioBlock::disconnected()));
        assert_eq!(
            drain(&mut controller),
            vec![Message::result(id, Payload::Empty)]
        );
        assert_eq!(node.stats().blocks_processed(), 0);
    }

    #[test]
    fn test_reset_request_clears_volume() {
        let (mut controller, mut node) = node();
        node.process(AudioBlock::mono(&[0.9; 128]));
        drain(&mut controller);

        let id = CorrelationId::new("req-000002");
        controller
            .sender
            .send(Message::request(MessageKind::Reset, id.clone(), Payload::Empty))
            .unwrap();
        node.process(AudioBlock::disconnected());

        assert_eq!(node.processor().volume(), 0.0);
        assert_eq!(
            drain(&mut controller),
            vec![Message::result(id, Payload::Empty)]
        );
    }

    #[test]
    fn test_destroy_request_stops_volume_events() {
        let (mut controller, mut node) = node();
        drain(&mut controller);

        let id = CorrelationId::new("req-000003");
        controller
            .sender
            .send(Message::request(MessageKind::Destroy, id.clone(), Payload::Empty))
            .unwrap();

        let samples = [0.5f32; 128];
        for _ in 0..20 {
            node.process(AudioBlock::mono(&samples));
        }

        let messages = drain(&mut controller);
        assert_eq!(messages, vec![Message::result(id, Payload::Empty)]);
        assert_eq!(node.stats().volume_events(), 0);
    }

    #[test]
    fn test_unknown_request_gets_error_response() {
        let (mut controller, mut node) = node();
        drain(&mut controller);

        let id = CorrelationId::new("req-000004");
        controller
            .sender
            .send(Message::request(MessageKind::Volume, id.clone(), Payload::Empty))
            .unwrap();
        node.process(AudioBlock::disconnected());

        assert_eq!(
            drain(&mut controller),
            vec![Message::error(id, "unsupported request")]
        );
    }

    #[test]
    fn test_configure_shortens_interval() {
        let (mut controller, mut node) = node();
        drain(&mut controller);

        controller
            .sender
            .send(Message::event(
                MessageKind::Configure,
                Payload::Configure {
                    update_interval_ms: 5,
                },
            ))
            .unwrap();

        // 5ms at 48kHz = 240 frames, so two blocks of 128 complete one interval
        let samples = [0.1f32; 128];
        node.process(AudioBlock::mono(&samples));
        node.process(AudioBlock::mono(&samples));

        assert_eq!(volumes(&drain(&mut controller)).len(), 1);
        assert_eq!(node.processor().update_interval_ms(), 5);
    }

    #[test]
    fn test_uncorrelated_non_control_messages_are_ignored() {
        let (mut controller, mut node) = node();
        drain(&mut controller);

        controller.sender.send(Message::volume(0.7)).unwrap();
        node.process(AudioBlock::disconnected());

        assert!(drain(&mut controller).is_empty());
        assert_eq!(node.processor().volume(), 0.0);
    }

    #[test]
    fn test_closed_bridge_keeps_processing() {
        let (controller, mut node) = node();
        controller.handle.close();

        let samples = [0.5f32; 128];
        for _ in 0..20 {
            assert!(node.process(AudioBlock::mono(&samples)));
        }
        assert_eq!(node.stats().blocks_processed(), 20);
        assert_eq!(node.stats().volume_events(), 0);
    }

    #[test]
    fn test_set_sample_rate_retunes_countdown() {
        let (_controller, mut node) = node();
        node.set_sample_rate(16000);
        assert_eq!(node.processor().interval_in_frames(), 400.0);
    }
}
