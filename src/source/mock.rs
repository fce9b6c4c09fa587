//! Mock audio source for testing without hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{AudioSource, SourceConnection};
use crate::block::AudioBlock;
use crate::format::RENDER_QUANTUM;
use crate::processor::ProcessorHandle;
use crate::VolumeMeterError;

/// Synthetic signal generated by a [`MockSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// All zeros.
    Silence,
    /// Every sample has the same value.
    Constant(f32),
    /// A sine wave.
    Sine {
        /// Frequency in Hz.
        frequency: f32,
        /// Peak amplitude.
        amplitude: f32,
    },
    /// The given samples, looped.
    Samples(Arc<[f32]>),
}

impl Signal {
    /// Fills `out` starting at absolute frame `position`.
    fn fill(&self, out: &mut [f32], position: u64, sample_rate: u32) {
        match self {
            Self::Silence => out.fill(0.0),
            Self::Constant(value) => out.fill(*value),
            Self::Sine {
                frequency,
                amplitude,
            } => {
                let rate = f64::from(sample_rate.max(1));
                for (i, slot) in out.iter_mut().enumerate() {
                    let t = (position + i as u64) as f64 / rate;
                    let phase = 2.0 * std::f64::consts::PI * f64::from(*frequency) * t;
                    *slot = (phase.sin() as f32) * amplitude;
                }
            }
            Self::Samples(samples) if samples.is_empty() => out.fill(0.0),
            Self::Samples(samples) => {
                let len = samples.len() as u64;
                for (i, slot) in out.iter_mut().enumerate() {
                    *slot = samples[((position + i as u64) % len) as usize];
                }
            }
        }
    }
}

/// A mock audio source that generates synthetic audio for testing.
///
/// Connecting starts a thread that feeds the node one block at a time,
/// paced at the real-time block rate. This allows testing the full pipeline
/// without requiring actual audio hardware, making it suitable for CI
/// environments.
///
/// # Example
///
/// ```
/// use volume_meter::source::{AudioSource, MockSource, Signal};
///
/// let source = MockSource::new(48000, Signal::Constant(0.5));
/// assert_eq!(source.sample_rate().unwrap(), 48000);
/// assert_eq!(source.name(), "mock");
/// ```
#[derive(Debug, Clone)]
pub struct MockSource {
    name: String,
    sample_rate: u32,
    block_size: usize,
    signal: Signal,
}

impl MockSource {
    /// Creates a mock source generating `signal` at `sample_rate`.
    pub fn new(sample_rate: u32, signal: Signal) -> Self {
        Self {
            name: "mock".to_string(),
            sample_rate,
            block_size: RENDER_QUANTUM,
            signal,
        }
    }

    /// Creates a silent mock source.
    pub fn silence(sample_rate: u32) -> Self {
        Self::new(sample_rate, Signal::Silence)
    }

    /// Creates a mock source with a constant level.
    pub fn constant(sample_rate: u32, value: f32) -> Self {
        Self::new(sample_rate, Signal::Constant(value))
    }

    /// Creates a mock source playing a sine wave.
    pub fn sine(sample_rate: u32, frequency: f32, amplitude: f32) -> Self {
        Self::new(
            sample_rate,
            Signal::Sine {
                frequency,
                amplitude,
            },
        )
    }

    /// Sets the name reported by [`AudioSource::name`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the number of frames per block.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Returns the generated signal.
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Real-time duration of one block.
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / f64::from(self.sample_rate.max(1)))
    }
}

impl AudioSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> Result<u32, VolumeMeterError> {
        Ok(self.sample_rate)
    }

    fn connect(&self, node: ProcessorHandle) -> Result<SourceConnection, VolumeMeterError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let source = self.clone();

        let thread = std::thread::Builder::new()
            .name(format!("{}-source", self.name))
            .spawn(move || source.run(&node, &flag))
            .map_err(|e| VolumeMeterError::BackendError(e.to_string()))?;

        tracing::debug!(source = %self.name, "Mock source connected");

        Ok(SourceConnection::new(move || {
            running.store(false, Ordering::Release);
            if thread.join().is_err() {
                tracing::error!("Mock source thread panicked");
            }
        }))
    }
}

impl MockSource {
    fn run(&self, node: &ProcessorHandle, running: &AtomicBool) {
        let mut block = vec![0.0f32; self.block_size];
        let period = self.block_duration();
        let mut position = 0u64;
        let mut deadline = Instant::now();

        while running.load(Ordering::Acquire) {
            self.signal.fill(&mut block, position, self.sample_rate);
            position += block.len() as u64;

            if let Some(mut node) = node.try_lock() {
                node.process(AudioBlock::mono(&block));
            }

            deadline += period;
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            } else {
                // Fell behind; don't try to catch up in a burst
                deadline = now;
            }
        }
    }
}
