//! Error types for volume-meter.
//!
//! Errors are split into two categories:
//! - **Synchronous errors** ([`VolumeMeterError`]): returned straight from the
//!   controller when the environment or the call order is wrong
//! - **Protocol errors** ([`ProtocolError`]): problems with messages arriving
//!   over the bridge. These are logged by the dispatcher and never reach the
//!   caller.

use std::borrow::Cow;
use std::time::Duration;

use crate::protocol::CorrelationId;

/// Errors returned by the meter facade and the audio source adapters.
#[derive(Debug, thiserror::Error)]
pub enum VolumeMeterError {
    /// The environment cannot run the processing pipeline.
    ///
    /// Raised once, at construction. Never retried.
    #[error("the current environment does not support volume metering")]
    Unsupported,

    /// An operation was invoked in a state that does not allow it.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A correlated request to the processor failed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// No default input device is configured on this system.
    #[error("no default input device configured")]
    NoDefaultDevice,

    /// The requested audio device was not found.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// Name of the device that wasn't found.
        name: String,
    },

    /// The device delivers a sample format the meter cannot read.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    BackendError(String),
}

/// Lifecycle call made in the wrong order.
///
/// The caller has to fix the call order; nothing is retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// The meter has been destroyed and cannot be used again.
    #[error("cannot use volume-meter because it's been destroyed")]
    Destroyed,

    /// `start()` was called without an audio source bound.
    #[error("cannot use volume-meter because no audio source is bound")]
    NoSource,
}

/// Failure of a single correlated request.
///
/// A request error only ever affects the request it belongs to; the bridge
/// and the other pending requests keep working.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    /// The request could not be handed to the bridge.
    #[error("bridge rejected request: {0}")]
    Bridge(#[from] BridgeError),

    /// The processor answered with an ERROR response.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// No response arrived within the configured timeout.
    #[error("request {id} timed out after {timeout:?}")]
    Timeout {
        /// Correlation id of the request.
        id: CorrelationId,
        /// The timeout that elapsed.
        timeout: Duration,
    },
}

/// Error raised inside the processing loop while handling a request.
///
/// Sent back as an ERROR response keyed to the originating request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("processor error: {message}")]
pub struct ProcessingError {
    /// What went wrong, as reported by the processor.
    pub message: Cow<'static, str>,
}

impl ProcessingError {
    /// Creates a processing error with the given message.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A message that could not be matched against the protocol state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A response referenced an id that is not pending, either unknown or
    /// already resolved.
    #[error("response for unknown or already resolved request {0}")]
    UnknownCorrelationId(CorrelationId),
}

/// Transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The bridge has been closed; the message was not queued.
    #[error("bridge closed")]
    Closed,

    /// The receiving side is not keeping up; the message was dropped.
    #[error("bridge queue full")]
    Full,
}
