//! Controller side of the message protocol.
//!
//! - [`MessageCorrelator`] turns fire-and-forget messages into
//!   request/response pairs and routes events to listeners.
//! - The dispatcher task drains the processor's outbound queue into the
//!   correlator.

mod correlation_id;
mod correlator;
mod dispatcher;

pub use correlation_id::CorrelationId;
pub use correlator::{Listener, MessageCorrelator};
pub use dispatcher::{dispatch_pending, spawn_dispatcher};
