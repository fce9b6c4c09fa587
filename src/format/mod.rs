//! Audio format conversion utilities.
//!
//! Source adapters use these to turn whatever the backend delivers
//! (f32, i16 or u16, any channel count) into mono `f32` blocks.

mod convert;

pub use convert::{downmix_into, RENDER_QUANTUM};
