//! One render quantum of input audio.

/// A borrowed view over the channels of one render quantum.
///
/// Source adapters downmix to mono before handing blocks to the processor,
/// so in practice a block has either one channel or none. A block with no
/// channels means nothing is connected to the processor's input.
///
/// # Example
///
/// ```
/// use volume_meter::AudioBlock;
///
/// let samples = [0.5f32; 128];
/// let block = AudioBlock::mono(&samples);
/// assert_eq!(block.frame_count(), 128);
/// assert!((block.rms() - 0.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AudioBlock<'a> {
    channels: Channels<'a>,
}

#[derive(Debug, Clone, Copy)]
enum Channels<'a> {
    Mono(&'a [f32]),
    Planar(&'a [&'a [f32]]),
}

impl<'a> AudioBlock<'a> {
    /// Creates a block from per-channel sample slices.
    pub fn new(channels: &'a [&'a [f32]]) -> Self {
        Self {
            channels: Channels::Planar(channels),
        }
    }

    /// Creates a single-channel block.
    pub fn mono(samples: &'a [f32]) -> Self {
        Self {
            channels: Channels::Mono(samples),
        }
    }

    /// Creates a block with no channels (no connected input).
    pub fn disconnected() -> Self {
        Self::new(&[])
    }

    /// Number of channels in the block.
    pub fn channel_count(&self) -> usize {
        match self.channels {
            Channels::Mono(_) => 1,
            Channels::Planar(channels) => channels.len(),
        }
    }

    /// Returns `true` if nothing is connected.
    pub fn is_disconnected(&self) -> bool {
        self.channel_count() == 0
    }

    /// The first channel, which carries the downmixed signal.
    pub fn first_channel(&self) -> Option<&'a [f32]> {
        match self.channels {
            Channels::Mono(samples) => Some(samples),
            Channels::Planar(channels) => channels.first().copied(),
        }
    }

    /// Number of frames in the block.
    pub fn frame_count(&self) -> usize {
        self.first_channel().map_or(0, <[f32]>::len)
    }

    /// Root-mean-square level of the first channel.
    ///
    /// An empty or missing channel counts as silence.
    pub fn rms(&self) -> f32 {
        self.first_channel().map_or(0.0, rms)
    }
}

/// Root-mean-square of `samples`, `0.0` for an empty slice.
pub(crate) fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}
