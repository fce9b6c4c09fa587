//! Platform capability checks.

/// Returns `true` if at least one audio host is compiled in and available.
///
/// This is the default capability probe used by
/// [`MeterBuilder`](crate::MeterBuilder).
pub fn is_supported() -> bool {
    let hosts = cpal::available_hosts();
    if hosts.is_empty() {
        tracing::debug!("No audio hosts available");
        return false;
    }
    true
}
