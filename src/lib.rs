//! # volume-meter
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Real-time microphone volume metering.
//!
//! `volume-meter` computes a smoothed RMS level of a live audio input on the
//! audio thread and delivers it to your code at a fixed cadence (every
//! 25ms by default). The level rises instantly on loud input and decays
//! gradually afterwards, which is what a level meter in a UI wants.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use volume_meter::{source::DeviceSource, VolumeMeter};
//!
//! # async fn run() -> Result<(), volume_meter::VolumeMeterError> {
//! let mut meter = VolumeMeter::builder()
//!     .source(Arc::new(DeviceSource::open_default()?))
//!     .on_volume(|volume| println!("level: {volume:.3}"))
//!     .build()?;
//!
//! meter.start().await?;
//! // ... volume updates arrive on the callback ...
//! meter.stop()?;
//! meter.destroy();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **Audio thread**: the source's real-time callback runs the
//!   [`ProcessorNode`](processor::ProcessorNode). It never blocks and never
//!   allocates.
//! - **Bridge**: two lock-free SPSC queues carry messages in each direction.
//! - **Tokio runtime**: a dispatcher task drains the bridge, resolves
//!   correlated requests and emits volume updates to subscribers.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod block;
pub mod bridge;
mod builder;
mod config;
mod error;
mod event;
pub mod format;
mod logger;
pub mod message;
mod meter;
pub mod platform;
pub mod processor;
pub mod protocol;
pub mod source;

pub use block::AudioBlock;
pub use builder::MeterBuilder;
pub use config::{MeterConfig, DEFAULT_SMOOTHING_FACTOR, DEFAULT_UPDATE_INTERVAL};
pub use error::{
    BridgeError, LifecycleError, ProcessingError, ProtocolError, RequestError, VolumeMeterError,
};
pub use event::{volume_callback, Emitter, SubscriptionId, VolumeCallback};
pub use logger::{LogLevel, Logger, SharedLogger, TracingLogger};
pub use meter::{MeterState, MeterStats, VolumeMeter};
pub use source::{
    default_input_device_name, list_input_devices, AudioSource, DeviceSource, MockSource, Signal,
    SourceConnection,
};
