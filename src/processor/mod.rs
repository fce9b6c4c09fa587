//! Real-time volume processing.

mod node;
mod volume;

pub use node::{ProcessorHandle, ProcessorNode, ProcessorStats};
pub use volume::{is_silent, VolumeProcessor, MINIMUM_VALUE};
