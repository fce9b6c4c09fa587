//! Volume smoothing algorithm.

use crate::block::AudioBlock;
use crate::config::{DEFAULT_SMOOTHING_FACTOR, DEFAULT_UPDATE_INTERVAL};

/// Level below which a smoothed volume can be displayed as silence.
///
/// Only a display hint: the decay itself is never cut off at this value.
pub const MINIMUM_VALUE: f32 = 0.00001;

/// Returns `true` if `volume` is below [`MINIMUM_VALUE`].
pub fn is_silent(volume: f32) -> bool {
    volume < MINIMUM_VALUE
}

/// Computes a smoothed volume from successive audio blocks.
///
/// Per block:
///
/// 1. `rms = sqrt(sum(sample²) / N)`
/// 2. `volume = max(rms, volume * smoothing_factor)`: rises instantly,
///    decays gradually
/// 3. a frame countdown decides whether an update is due
///
/// `process` does no allocation and no locking. It is meant to be called
/// from the audio callback.
#[derive(Debug, Clone)]
pub struct VolumeProcessor {
    volume: f32,
    smoothing_factor: f32,
    sample_rate: u32,
    update_interval_ms: u32,
    next_update_frame: f64,
}

impl VolumeProcessor {
    /// Creates a processor for a stream at `sample_rate`.
    pub fn new(sample_rate: u32, update_interval_ms: u32, smoothing_factor: f32) -> Self {
        let mut processor = Self {
            volume: 0.0,
            smoothing_factor: smoothing_factor.clamp(0.0, 1.0),
            sample_rate,
            update_interval_ms,
            next_update_frame: 0.0,
        };
        processor.next_update_frame = processor.interval_in_frames();
        processor
    }

    /// Creates a processor with the default interval and smoothing.
    pub fn with_defaults(sample_rate: u32) -> Self {
        Self::new(
            sample_rate,
            DEFAULT_UPDATE_INTERVAL.as_millis() as u32,
            DEFAULT_SMOOTHING_FACTOR,
        )
    }

    /// Current smoothed volume.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Per-block decay factor.
    pub fn smoothing_factor(&self) -> f32 {
        self.smoothing_factor
    }

    /// Sample rate the countdown is based on.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interval between updates, in milliseconds.
    pub fn update_interval_ms(&self) -> u32 {
        self.update_interval_ms
    }

    /// Interval between updates, in frames.
    pub fn interval_in_frames(&self) -> f64 {
        f64::from(self.update_interval_ms) * f64::from(self.sample_rate) / 1000.0
    }

    /// Changes the update interval without touching the volume.
    ///
    /// A pending countdown longer than the new interval is shortened to it.
    pub fn set_update_interval(&mut self, update_interval_ms: u32) {
        self.update_interval_ms = update_interval_ms;
        self.next_update_frame = self.next_update_frame.min(self.interval_in_frames());
    }

    /// Changes the sample rate and restarts the countdown.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.next_update_frame = self.interval_in_frames();
    }

    /// Zeroes the volume and restarts the countdown.
    pub fn reset(&mut self) {
        self.volume = 0.0;
        self.next_update_frame = self.interval_in_frames();
    }

    /// Feeds one block and returns the volume if an update is due.
    ///
    /// Blocks with no channels are skipped entirely.
    pub fn process(&mut self, block: AudioBlock<'_>) -> Option<f32> {
        let samples = block.first_channel()?;

        let rms = crate::block::rms(samples);
        self.volume = rms.max(self.volume * self.smoothing_factor);

        self.next_update_frame -= samples.len() as f64;
        if self.next_update_frame <= 0.0 {
            self.next_update_frame += self.interval_in_frames();
            return Some(self.volume);
        }
        None
    }
}
