//! Correlation identifier type.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque ticket pairing a request with its response.
///
/// `CorrelationId` uses `Arc<str>` internally, so the processor can echo an
/// id back in its response by moving it, without touching the heap on the
/// audio thread.
///
/// # Example
///
/// ```
/// use volume_meter::protocol::CorrelationId;
///
/// let a = CorrelationId::new("req-000001");
/// assert_eq!(a, CorrelationId::new("req-000001"));
/// assert_ne!(a, CorrelationId::new("req-000002"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Creates a correlation id from a string.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hands out ids that never repeat for the lifetime of the generator.
#[derive(Debug, Default)]
pub(crate) struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> CorrelationId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        CorrelationId::new(format!("req-{n:06x}"))
    }
}
