//! Publish/subscribe for meter updates.
//!
//! The meter composes an [`Emitter<f32>`] and emits the smoothed volume on
//! every VOLUME event. Subscribers run on the dispatcher task, so they should
//! return quickly.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Callback type for receiving volume updates.
///
/// The value is the raw smoothed volume, nominally in `[0, 1]`.
///
/// # Example
///
/// ```
/// use volume_meter::volume_callback;
///
/// let callback = volume_callback(|volume| {
///     println!("volume: {volume:.3}");
/// });
/// callback(0.25);
/// ```
pub type VolumeCallback = Arc<dyn Fn(f32) + Send + Sync>;

/// Creates a [`VolumeCallback`] from a closure.
pub fn volume_callback<F>(f: F) -> VolumeCallback
where
    F: Fn(f32) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Identifies one subscription on an [`Emitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A list of subscribers that all receive every emitted value.
///
/// Cloning is cheap and every clone shares the same subscribers.
/// Subscribers are called in subscription order, outside the internal lock,
/// so a subscriber may subscribe or unsubscribe without deadlocking.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use volume_meter::Emitter;
///
/// let emitter = Emitter::<u32>::new();
/// let total = Arc::new(AtomicU32::new(0));
///
/// let sum = Arc::clone(&total);
/// let id = emitter.subscribe(move |v| {
///     sum.fetch_add(v, Ordering::SeqCst);
/// });
///
/// emitter.emit(2);
/// emitter.emit(3);
/// assert!(emitter.unsubscribe(id));
/// emitter.emit(100);
///
/// assert_eq!(total.load(Ordering::SeqCst), 5);
/// ```
pub struct Emitter<T> {
    inner: Arc<EmitterInner<T>>,
}

struct EmitterInner<T> {
    subscribers: Mutex<BTreeMap<SubscriptionId, Subscriber<T>>>,
    next_id: AtomicU64,
}

impl<T: Clone> Emitter<T> {
    /// Creates an emitter with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                subscribers: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Adds a subscriber and returns its id.
    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe_arc(Arc::new(subscriber))
    }

    /// Adds an already shared subscriber and returns its id.
    pub fn subscribe_arc(&self, subscriber: Arc<dyn Fn(T) + Send + Sync>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.lock().insert(id, subscriber);
        id
    }

    /// Removes a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.lock().remove(&id).is_some()
    }

    /// Calls every subscriber with `value`.
    pub fn emit(&self, value: T) {
        let subscribers: Vec<Subscriber<T>> =
            self.inner.subscribers.lock().values().cloned().collect();
        for subscriber in subscribers {
            subscriber(value.clone());
        }
    }

    /// Removes every subscriber.
    pub fn clear(&self) {
        self.inner.subscribers.lock().clear();
    }

    /// Number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl<T: Clone> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("subscribers", &self.inner.subscribers.lock().len())
            .finish()
    }
}
