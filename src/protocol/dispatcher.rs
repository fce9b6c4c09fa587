//! Dispatcher task that drains the processor's outbound queue.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::MessageCorrelator;
use crate::bridge::BridgeReceiver;

/// Hands every queued message to the correlator. Returns how many were
/// handled.
///
/// Protocol errors are logged and the offending message is dropped.
pub fn dispatch_pending(correlator: &MessageCorrelator, receiver: &mut BridgeReceiver) -> usize {
    let mut handled = 0;
    while let Some(message) = receiver.try_recv() {
        let kind = message.kind;
        if let Err(e) = correlator.dispatch_incoming(message) {
            tracing::warn!(%kind, error = %e, "Dropping message from processor");
        }
        handled += 1;
    }
    handled
}

/// Spawns the dispatcher task.
///
/// The task wakes every `poll_interval`, drains the receiver and exits once
/// the bridge has been closed. Must be called from within a Tokio runtime.
pub fn spawn_dispatcher(
    correlator: MessageCorrelator,
    mut receiver: BridgeReceiver,
    poll_interval: Duration,
) -> JoinHandle<()> {
    let period = poll_interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        tracing::debug!(?period, "Dispatcher started");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if receiver.is_closed() {
                break;
            }
            dispatch_pending(&correlator, &mut receiver);
        }

        tracing::debug!("Dispatcher stopped");
    })
}
