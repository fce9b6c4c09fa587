//! Configuration types for the volume meter.

use std::time::Duration;

/// Default cadence of VOLUME updates.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(25);

/// Default decay applied to the smoothed volume on every block.
pub const DEFAULT_SMOOTHING_FACTOR: f32 = 0.8;

/// Configuration for meter behavior.
///
/// Use [`MeterConfig::default()`] for sensible defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use volume_meter::MeterConfig;
/// use std::time::Duration;
///
/// let config = MeterConfig {
///     update_interval: Duration::from_millis(50),
///     request_timeout: Some(Duration::from_secs(1)),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// How often the processor reports the smoothed volume.
    ///
    /// Default: 25ms
    pub update_interval: Duration,

    /// Per-block decay of the smoothed volume, in `(0, 1)`.
    ///
    /// Higher values fall back more slowly after a loud block.
    /// Default: 0.8
    pub smoothing_factor: f32,

    /// Capacity of each direction of the bridge, in messages.
    ///
    /// At the default interval the processor emits 40 messages per second,
    /// so the default leaves several seconds of slack for a stalled
    /// controller before messages are dropped.
    /// Default: 256
    pub bridge_capacity: usize,

    /// How often the dispatcher drains messages coming from the processor.
    ///
    /// Default: 5ms
    pub poll_interval: Duration,

    /// Upper bound on how long a request waits for its response.
    ///
    /// `None` waits indefinitely.
    /// Default: `None`
    pub request_timeout: Option<Duration>,

    /// Whether every `start()` re-sends INITIALIZE to the processor.
    ///
    /// When `false`, INITIALIZE is only sent when the processor is created;
    /// a stop/start cycle just rewires the source.
    /// Default: `true`
    pub reinitialize_on_start: bool,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            bridge_capacity: 256,
            poll_interval: Duration::from_millis(5),
            request_timeout: None,
            reinitialize_on_start: true,
        }
    }
}

impl MeterConfig {
    /// Update interval in whole milliseconds, as carried on the wire.
    pub(crate) fn update_interval_ms(&self) -> u32 {
        duration_to_ms(self.update_interval)
    }
}

/// Converts a duration to whole milliseconds, saturating and never zero.
pub(crate) fn duration_to_ms(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis())
        .unwrap_or(u32::MAX)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_config_defaults() {
        let config = MeterConfig::default();
        assert_eq!(config.update_interval, Duration::from_millis(25));
        assert!((config.smoothing_factor - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.bridge_capacity, 256);
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.request_timeout, None);
        assert!(config.reinitialize_on_start);
    }

    #[test]
    fn test_update_interval_ms() {
        let config = MeterConfig {
            update_interval: Duration::from_millis(40),
            ..Default::default()
        };
        assert_eq!(config.update_interval_ms(), 40);
    }

    #[test]
    fn test_duration_to_ms_never_zero() {
        assert_eq!(duration_to_ms(Duration::from_micros(10)), 1);
        assert_eq!(duration_to_ms(Duration::from_secs(u64::MAX)), u32::MAX);
    }
}
