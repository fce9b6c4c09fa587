//! Messages exchanged between the controller and the processor.
//!
//! Every message has the same shape in both directions:
//!
//! ```text
//! { kind: MessageKind, id: Option<CorrelationId>, payload: Payload }
//! ```
//!
//! Messages with an id are requests (controller → processor) or responses
//! (processor → controller). Messages without one are events.

use std::borrow::Cow;

use crate::logger::LogLevel;
use crate::protocol::CorrelationId;

/// Kind of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Prepare the processor. Request.
    Initialize,
    /// Clear the processor's volume state. Request.
    Reset,
    /// Stop the processor from reporting. Request.
    Destroy,
    /// Log line from the processor. Event.
    Log,
    /// Smoothed volume snapshot. Event.
    Volume,
    /// Successful response to a request.
    Result,
    /// Failed response to a request.
    Error,
    /// Out-of-band settings change. Event.
    Configure,
}

impl MessageKind {
    /// Upper-case wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Initialize => "INITIALIZE",
            Self::Reset => "RESET",
            Self::Destroy => "DESTROY",
            Self::Log => "LOG",
            Self::Volume => "VOLUME",
            Self::Result => "RESULT",
            Self::Error => "ERROR",
            Self::Configure => "CONFIGURE",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Data carried by a message.
///
/// Variants that the processor sends from the audio thread only hold
/// `Copy` data or `Cow::Borrowed` strings, so building them never allocates.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No data.
    Empty,
    /// Smoothed volume, nominally in `[0, 1]`.
    Volume(f32),
    /// A log line.
    Log {
        /// Severity of the line.
        level: LogLevel,
        /// Text of the line.
        message: Cow<'static, str>,
    },
    /// New settings for the processing loop.
    Configure {
        /// Interval between VOLUME events, in milliseconds.
        update_interval_ms: u32,
    },
    /// Why a request failed.
    Error(Cow<'static, str>),
}

/// One message on the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// What the message is about.
    pub kind: MessageKind,
    /// Present on requests and their responses.
    pub id: Option<CorrelationId>,
    /// Message data.
    pub payload: Payload,
}

impl Message {
    /// Creates an uncorrelated event.
    pub fn event(kind: MessageKind, payload: Payload) -> Self {
        Self {
            kind,
            id: None,
            payload,
        }
    }

    /// Creates a request that expects exactly one response with `id`.
    pub fn request(kind: MessageKind, id: CorrelationId, payload: Payload) -> Self {
        Self {
            kind,
            id: Some(id),
            payload,
        }
    }

    /// Creates a RESULT response to the request identified by `id`.
    pub fn result(id: CorrelationId, payload: Payload) -> Self {
        Self::request(MessageKind::Result, id, payload)
    }

    /// Creates an ERROR response to the request identified by `id`.
    pub fn error(id: CorrelationId, reason: impl Into<Cow<'static, str>>) -> Self {
        Self::request(MessageKind::Error, id, Payload::Error(reason.into()))
    }

    /// Creates a VOLUME event.
    pub fn volume(volume: f32) -> Self {
        Self::event(MessageKind::Volume, Payload::Volume(volume))
    }

    /// Creates a LOG event.
    pub fn log(level: LogLevel, message: impl Into<Cow<'static, str>>) -> Self {
        Self::event(
            MessageKind::Log,
            Payload::Log {
                level,
                message: message.into(),
            },
        )
    }

    /// Returns `true` if the message carries a correlation id.
    pub fn is_correlated(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_has_no_id() {
        let message = Message::volume(0.5);
        assert!(!message.is_correlated());
        assert_eq!(message.kind, MessageKind::Volume);
        assert_eq!(message.payload, Payload::Volume(0.5));
    }

    #[test]
    fn test_error_response_keeps_id() {
        let id = CorrelationId::new("req-000007");
        let message = Message::error(id.clone(), "boom");
        assert_eq!(message.id, Some(id));
        assert_eq!(message.kind, MessageKind::Error);
        assert_eq!(message.payload, Payload::Error(Cow::Borrowed("boom")));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(MessageKind::Initialize.to_string(), "INITIALIZE");
        assert_eq!(MessageKind::Volume.to_string(), "VOLUME");
    }

    #[test]
    fn test_log_message_borrowed() {
        let message = Message::log(LogLevel::Info, "ready");
        match message.payload {
            Payload::Log { level, message } => {
                assert_eq!(level, LogLevel::Info);
                assert!(matches!(message, Cow::Borrowed("ready")));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
