//! Volume meter lifecycle management.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::bridge::{self, BridgeHandle};
use crate::event::{Emitter, SubscriptionId, VolumeCallback};
use crate::logger::SharedLogger;
use crate::message::{Message, MessageKind, Payload};
use crate::processor::{ProcessorHandle, ProcessorNode, ProcessorStats, VolumeProcessor};
use crate::protocol::{spawn_dispatcher, MessageCorrelator};
use crate::source::{AudioSource, SourceConnection};
use crate::{LifecycleError, MeterBuilder, MeterConfig, RequestError, VolumeMeterError};

/// Lifecycle state of a [`VolumeMeter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterState {
    /// Built, never started.
    Uninitialized,
    /// The source is feeding the processor.
    Active,
    /// The source is disconnected; the processor and bridge are kept.
    Stopped,
    /// Torn down. Terminal.
    Destroyed,
}

/// Statistics about a meter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterStats {
    /// Blocks the processor has consumed.
    pub blocks_processed: u64,
    /// VOLUME events the processor has posted.
    pub volume_events: u64,
    /// Messages dropped because a bridge queue was full.
    pub dropped_messages: u64,
    /// Volume at the most recent update.
    pub latest_volume: f32,
}

/// Everything created on the first `start()`.
struct Pipeline {
    node: ProcessorHandle,
    bridge: BridgeHandle,
    dispatcher: JoinHandle<()>,
    stats: Arc<ProcessorStats>,
}

/// Real-time microphone volume meter.
///
/// The meter binds an [`AudioSource`] to a processing node that computes a
/// smoothed RMS level on the audio thread. Updates come back over a
/// lock-free bridge and are emitted to [`on_volume`](Self::on_volume)
/// subscribers.
///
/// # Lifecycle
///
/// ```text
/// Uninitialized ──start──▶ Active ◀──start── Stopped
///                            └──────stop──────▶┘
/// any state ──destroy──▶ Destroyed
/// ```
///
/// 1. Created by [`VolumeMeter::builder()`] or [`VolumeMeter::new()`]
/// 2. [`start()`](Self::start) wires the pipeline and connects the source
/// 3. [`stop()`](Self::stop) disconnects the source and keeps the rest
/// 4. [`destroy()`](Self::destroy) tears everything down. Dropping the
///    meter also destroys it.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use volume_meter::{source::DeviceSource, VolumeMeter};
///
/// # async fn run() -> Result<(), volume_meter::VolumeMeterError> {
/// let mut meter = VolumeMeter::builder()
///     .source(Arc::new(DeviceSource::open_default()?))
///     .on_volume(|volume| println!("{volume:.3}"))
///     .build()?;
///
/// meter.start().await?;
/// tokio::time::sleep(std::time::Duration::from_secs(5)).await;
/// meter.destroy();
/// # Ok(())
/// # }
/// ```
pub struct VolumeMeter {
    config: MeterConfig,
    state: MeterState,
    source: Option<Arc<dyn AudioSource>>,
    connection: Option<SourceConnection>,
    pipeline: Option<Pipeline>,
    correlator: MessageCorrelator,
    emitter: Emitter<f32>,
}

impl VolumeMeter {
    /// Creates a builder for configuring a meter.
    pub fn builder() -> MeterBuilder {
        MeterBuilder::new()
    }

    /// Creates a meter with default settings, optionally bound to `source`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeMeterError::Unsupported`] if no audio host is
    /// available.
    pub fn new(source: Option<Arc<dyn AudioSource>>) -> Result<Self, VolumeMeterError> {
        let mut builder = Self::builder();
        if let Some(source) = source {
            builder = builder.source(source);
        }
        builder.build()
    }

    pub(crate) fn from_parts(
        config: MeterConfig,
        source: Option<Arc<dyn AudioSource>>,
        logger: SharedLogger,
        callbacks: Vec<VolumeCallback>,
    ) -> Self {
        let correlator = MessageCorrelator::new(logger, config.request_timeout);
        let emitter = Emitter::new();
        for callback in callbacks {
            emitter.subscribe_arc(callback);
        }

        Self {
            config,
            state: MeterState::Uninitialized,
            source,
            connection: None,
            pipeline: None,
            correlator,
            emitter,
        }
    }

    /// Returns `true` if the default capability probe passes.
    pub fn is_supported() -> bool {
        crate::platform::is_supported()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> MeterState {
        self.state
    }

    /// Returns the configuration in effect.
    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Returns the bound source, if any.
    pub fn source(&self) -> Option<&Arc<dyn AudioSource>> {
        self.source.as_ref()
    }

    /// Starts metering.
    ///
    /// Creates the bridge, processing node and dispatcher on first use,
    /// connects the source, then sends INITIALIZE to the processor and waits
    /// for its answer.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Destroyed`] after [`destroy()`](Self::destroy)
    /// - [`LifecycleError::NoSource`] if no source is bound
    /// - source errors from connecting
    /// - [`RequestError`] if INITIALIZE fails
    pub async fn start(&mut self) -> Result<(), VolumeMeterError> {
        self.ensure_alive()?;
        let source = self.source.clone().ok_or(LifecycleError::NoSource)?;

        let created = if self.pipeline.is_none() {
            self.pipeline = Some(self.create_pipeline(source.sample_rate()?));
            true
        } else {
            false
        };

        if self.connection.is_none() {
            self.connect_source()?;
        }
        self.state = MeterState::Active;
        tracing::info!(source = source.name(), "Volume meter started");

        if created || self.config.reinitialize_on_start {
            self.correlator
                .send_request(MessageKind::Initialize, Payload::Empty)
                .await?;
            tracing::debug!("Processor initialized");
        }
        Ok(())
    }

    /// Stops metering by disconnecting the source.
    ///
    /// The processor keeps its state, so a later `start()` resumes where it
    /// left off. Stopping a stopped meter is a no-op.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Destroyed`] after [`destroy()`](Self::destroy).
    pub fn stop(&mut self) -> Result<(), VolumeMeterError> {
        self.ensure_alive()?;
        self.disconnect_source();
        if self.state == MeterState::Active {
            self.state = MeterState::Stopped;
            tracing::info!("Volume meter stopped");
        }
        Ok(())
    }

    /// Binds a different source.
    ///
    /// If the meter is running, the old source is disconnected and the new
    /// one connected in its place. Passing the source that is already bound
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Destroyed`] after [`destroy()`](Self::destroy), or
    /// an error connecting the new source.
    pub fn update_source(&mut self, source: Arc<dyn AudioSource>) -> Result<(), VolumeMeterError> {
        self.ensure_alive()?;
        if let Some(current) = &self.source {
            if Arc::ptr_eq(current, &source) {
                return Ok(());
            }
        }

        let was_connected = self.connection.is_some();
        self.disconnect_source();
        tracing::debug!(source = source.name(), "Source updated");
        self.source = Some(source);

        if was_connected {
            self.connect_source()?;
        }
        Ok(())
    }

    /// Changes how often volume updates are reported.
    ///
    /// Applied to a running processor without re-initializing it, and kept
    /// for any processor created later.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Destroyed`] after [`destroy()`](Self::destroy), or
    /// [`RequestError::Bridge`] if the change could not be queued.
    pub fn set_update_interval(&mut self, interval: Duration) -> Result<(), VolumeMeterError> {
        self.ensure_alive()?;
        self.config.update_interval = interval;

        if self.pipeline.is_some() {
            let update_interval_ms = self.config.update_interval_ms();
            self.correlator
                .post(Message::event(
                    MessageKind::Configure,
                    Payload::Configure { update_interval_ms },
                ))
                .map_err(RequestError::from)?;
        }
        Ok(())
    }

    /// Subscribes to volume updates.
    pub fn on_volume<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        self.emitter.subscribe(callback)
    }

    /// Removes a volume subscription. Returns `false` if it was not found.
    pub fn off_volume(&self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    /// Returns current meter statistics.
    pub fn stats(&self) -> MeterStats {
        match &self.pipeline {
            Some(pipeline) => MeterStats {
                blocks_processed: pipeline.stats.blocks_processed(),
                volume_events: pipeline.stats.volume_events(),
                dropped_messages: pipeline.bridge.dropped_messages(),
                latest_volume: pipeline.stats.latest_volume(),
            },
            None => MeterStats::default(),
        }
    }

    /// Tears the meter down.
    ///
    /// Disconnects and releases the source, abandons pending requests,
    /// closes the bridge, stops the dispatcher and drops every subscriber.
    /// Calling it again is a no-op.
    pub fn destroy(&mut self) {
        if self.state == MeterState::Destroyed {
            return;
        }

        self.disconnect_source();
        self.correlator.teardown();
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.bridge.close();
            pipeline.dispatcher.abort();
        }
        self.source = None;
        self.emitter.clear();

        self.state = MeterState::Destroyed;
        tracing::info!("Volume meter destroyed");
    }

    fn ensure_alive(&self) -> Result<(), LifecycleError> {
        if self.state == MeterState::Destroyed {
            return Err(LifecycleError::Destroyed);
        }
        Ok(())
    }

    fn create_pipeline(&self, sample_rate: u32) -> Pipeline {
        let (controller, port) = bridge::channel(self.config.bridge_capacity);
        let processor = VolumeProcessor::new(
            sample_rate,
            self.config.update_interval_ms(),
            self.config.smoothing_factor,
        );
        let node = ProcessorNode::new(processor, port);
        let stats = node.stats();

        self.correlator.attach(controller.sender);
        let emitter = self.emitter.clone();
        self.correlator
            .register_listener(MessageKind::Volume, move |message| {
                if let Payload::Volume(volume) = message.payload {
                    emitter.emit(volume);
                }
            });
        let dispatcher = spawn_dispatcher(
            self.correlator.clone(),
            controller.receiver,
            self.config.poll_interval,
        );

        tracing::debug!(
            sample_rate,
            update_interval_ms = self.config.update_interval_ms(),
            "Processing pipeline created"
        );

        Pipeline {
            node: node.into_handle(),
            bridge: controller.handle,
            dispatcher,
            stats,
        }
    }

    fn connect_source(&mut self) -> Result<(), VolumeMeterError> {
        let (Some(source), Some(pipeline)) = (&self.source, &self.pipeline) else {
            return Ok(());
        };

        // Nothing is feeding the node yet, so this lock is uncontended
        let sample_rate = source.sample_rate()?;
        pipeline.node.lock().set_sample_rate(sample_rate);

        self.connection = Some(source.connect(Arc::clone(&pipeline.node))?);
        tracing::debug!(source = source.name(), sample_rate, "Source connected");
        Ok(())
    }

    fn disconnect_source(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.disconnect();
            tracing::debug!("Source disconnected");
        }
    }
}

impl Drop for VolumeMeter {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for VolumeMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeMeter")
            .field("state", &self.state)
            .field("source", &self.source.as_ref().map(|s| s.name().to_string()))
            .field("connected", &self.connection.is_some())
            .field("config", &self.config)
            .finish()
    }
}
