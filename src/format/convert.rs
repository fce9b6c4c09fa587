//! Sample format and channel conversion.

use cpal::{FromSample, Sample};

/// Frames per block handed to the processor.
pub const RENDER_QUANTUM: usize = 128;

/// Downmixes interleaved samples of any cpal sample type into mono `f32`.
///
/// Each output frame is the average of its channels. Writes at most
/// `out.len()` frames and returns how many were written. A trailing partial
/// frame is ignored. Never allocates.
///
/// # Example
///
/// ```
/// use volume_meter::format::downmix_into;
///
/// let stereo: [i16; 4] = [i16::MAX, 0, 0, 0];
/// let mut mono = [0.0f32; 8];
/// let frames = downmix_into(&stereo, 2, &mut mono);
///
/// assert_eq!(frames, 2);
/// assert!((mono[0] - 0.5).abs() < 1e-3);
/// assert_eq!(mono[1], 0.0);
/// ```
pub fn downmix_into<T>(interleaved: &[T], channels: usize, out: &mut [f32]) -> usize
where
    T: Sample,
    f32: FromSample<T>,
{
    if channels == 0 {
        return 0;
    }

    let mut frames = 0;
    for (frame, slot) in interleaved.chunks_exact(channels).zip(out.iter_mut()) {
        *slot = if channels == 1 {
            frame[0].to_sample::<f32>()
        } else {
            let sum: f32 = frame.iter().map(|s| s.to_sample::<f32>()).sum();
            sum / channels as f32
        };
        frames += 1;
    }
    frames
}
