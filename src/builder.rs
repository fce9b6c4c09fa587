//! Builder pattern for `VolumeMeter`.

use std::sync::Arc;

use crate::event::{volume_callback, VolumeCallback};
use crate::logger::{Logger, SharedLogger, TracingLogger};
use crate::meter::VolumeMeter;
use crate::source::AudioSource;
use crate::{MeterConfig, VolumeMeterError};

type CapabilityProbe = Box<dyn Fn() -> bool>;

/// Builder for configuring a [`VolumeMeter`].
///
/// Use [`VolumeMeter::builder()`] to create a new builder.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use volume_meter::source::MockSource;
/// use volume_meter::{MeterConfig, MeterState, VolumeMeter};
///
/// let meter = VolumeMeter::builder()
///     .source(Arc::new(MockSource::silence(48000)))
///     .with_config(MeterConfig {
///         update_interval: Duration::from_millis(50),
///         ..Default::default()
///     })
///     .capability_probe(|| true)
///     .on_volume(|volume| println!("{volume:.3}"))
///     .build()
///     .unwrap();
///
/// assert_eq!(meter.state(), MeterState::Uninitialized);
/// ```
#[must_use]
pub struct MeterBuilder {
    /// Source bound at construction.
    source: Option<Arc<dyn AudioSource>>,
    /// Meter configuration.
    config: MeterConfig,
    /// Receives LOG messages from the processor.
    logger: Option<SharedLogger>,
    /// Decides whether the environment can run the meter.
    probe: Option<CapabilityProbe>,
    /// Subscribers registered before the meter exists.
    callbacks: Vec<VolumeCallback>,
}

impl Default for MeterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MeterBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            source: None,
            config: MeterConfig::default(),
            logger: None,
            probe: None,
            callbacks: Vec::new(),
        }
    }

    /// Binds the audio source the meter will listen to.
    pub fn source(mut self, source: Arc<dyn AudioSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set custom meter configuration.
    pub fn with_config(mut self, config: MeterConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the logger that receives the processor's LOG messages.
    ///
    /// Default: [`TracingLogger`] with every level enabled.
    pub fn logger<L: Logger + 'static>(mut self, logger: L) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Replaces the capability check consulted by [`build()`](Self::build).
    ///
    /// Default: [`platform::is_supported`](crate::platform::is_supported).
    pub fn capability_probe<F>(mut self, probe: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Subscribes a callback to volume updates.
    pub fn on_volume<F>(mut self, callback: F) -> Self
    where
        F: Fn(f32) + Send + Sync + 'static,
    {
        self.callbacks.push(volume_callback(callback));
        self
    }

    /// Builds the meter.
    ///
    /// The capability probe is consulted exactly once, here.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeMeterError::Unsupported`] if the probe fails.
    pub fn build(self) -> Result<VolumeMeter, VolumeMeterError> {
        let supported = match &self.probe {
            Some(probe) => probe(),
            None => crate::platform::is_supported(),
        };
        if !supported {
            tracing::warn!("Volume metering is not supported in this environment");
            return Err(VolumeMeterError::Unsupported);
        }

        let logger = self
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger::new()));

        Ok(VolumeMeter::from_parts(
            self.config,
            self.source,
            logger,
            self.callbacks,
        ))
    }
}
