//! Request/response correlation over the bridge.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::correlation_id::IdGenerator;
use super::CorrelationId;
use crate::bridge::BridgeSender;
use crate::logger::SharedLogger;
use crate::message::{Message, MessageKind, Payload};
use crate::{BridgeError, ProcessingError, ProtocolError, RequestError};

type Responder = oneshot::Sender<Result<Payload, ProcessingError>>;

/// Callback invoked for every incoming message of one kind.
pub type Listener = Arc<dyn Fn(&Message) + Send + Sync>;

struct Inner {
    sender: Mutex<Option<BridgeSender>>,
    pending: Mutex<HashMap<CorrelationId, Responder>>,
    listeners: Mutex<HashMap<MessageKind, Listener>>,
    logger: SharedLogger,
    ids: IdGenerator,
    request_timeout: Option<Duration>,
}

/// Pairs requests with their responses and routes events to listeners.
///
/// Cloning is cheap and every clone shares the same tables.
///
/// Each request gets a fresh [`CorrelationId`] and a table entry holding a
/// one-shot sender. The entry is removed exactly once:
/// - when the matching RESULT or ERROR arrives
/// - when the configured request timeout elapses
/// - on [`teardown`](Self::teardown), which discards it without resolving.
///   The request then never settles (unless a timeout is configured).
#[derive(Clone)]
pub struct MessageCorrelator {
    inner: Arc<Inner>,
}

impl MessageCorrelator {
    /// Creates a correlator with no bridge attached.
    pub fn new(logger: SharedLogger, request_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sender: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                listeners: Mutex::new(HashMap::new()),
                logger,
                ids: IdGenerator::new(),
                request_timeout,
            }),
        }
    }

    /// Attaches the controller's sending half of a bridge.
    pub fn attach(&self, sender: BridgeSender) {
        *self.inner.sender.lock() = Some(sender);
    }

    /// Returns `true` while a bridge is attached.
    pub fn is_attached(&self) -> bool {
        self.inner.sender.lock().is_some()
    }

    /// Sends a request and waits for its response.
    ///
    /// With no bridge attached yet, the payload is echoed back immediately.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Bridge`] if the request could not be queued
    /// - [`RequestError::Processing`] if the processor answered with ERROR
    /// - [`RequestError::Timeout`] if a timeout is configured and elapsed
    pub async fn send_request(
        &self,
        kind: MessageKind,
        payload: Payload,
    ) -> Result<Payload, RequestError> {
        let (tx, rx) = oneshot::channel();

        let id = {
            let mut guard = self.inner.sender.lock();
            let Some(sender) = guard.as_mut() else {
                return Ok(payload);
            };

            let id = self.inner.ids.next_id();
            self.inner.pending.lock().insert(id.clone(), tx);

            if let Err(e) = sender.send(Message::request(kind, id.clone(), payload)) {
                self.inner.pending.lock().remove(&id);
                return Err(e.into());
            }
            id
        };
        tracing::trace!(%id, %kind, "Request sent");

        let response = async {
            match rx.await {
                Ok(result) => result.map_err(RequestError::from),
                // Abandoned by teardown
                Err(_) => std::future::pending().await,
            }
        };

        match self.inner.request_timeout {
            None => response.await,
            Some(timeout) => match tokio::time::timeout(timeout, response).await {
                Ok(result) => result,
                Err(_) => {
                    self.inner.pending.lock().remove(&id);
                    Err(RequestError::Timeout { id, timeout })
                }
            },
        }
    }

    /// Sends an uncorrelated event.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Closed`] if no bridge is attached or it has been
    /// closed, [`BridgeError::Full`] if the queue is full.
    pub fn post(&self, message: Message) -> Result<(), BridgeError> {
        match self.inner.sender.lock().as_mut() {
            Some(sender) => sender.send(message),
            None => Err(BridgeError::Closed),
        }
    }

    /// Registers the listener for `kind`, replacing any previous one.
    pub fn register_listener<F>(&self, kind: MessageKind, listener: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().insert(kind, Arc::new(listener));
    }

    /// Removes the listener for `kind`, if any.
    pub fn remove_listener(&self, kind: MessageKind) {
        self.inner.listeners.lock().remove(&kind);
    }

    /// Handles one message from the processor.
    ///
    /// - LOG messages are forwarded to the logger.
    /// - A message with an id resolves the matching pending request. ERROR
    ///   responses resolve it with a [`ProcessingError`].
    /// - The listener registered for the message's kind, if any, is called.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownCorrelationId`] if the message carries an id
    /// that is not pending. The listener is still called.
    pub fn dispatch_incoming(&self, message: Message) -> Result<(), ProtocolError> {
        if let Payload::Log { level, message } = &message.payload {
            self.inner.logger.log(*level, message);
        }

        let outcome = match &message.id {
            Some(id) => self.resolve(id, &message),
            None => Ok(()),
        };

        let listener = self.inner.listeners.lock().get(&message.kind).cloned();
        if let Some(listener) = listener {
            listener(&message);
        }

        outcome
    }

    fn resolve(&self, id: &CorrelationId, message: &Message) -> Result<(), ProtocolError> {
        let responder = self
            .inner
            .pending
            .lock()
            .remove(id)
            .ok_or_else(|| ProtocolError::UnknownCorrelationId(id.clone()))?;

        let result = match (&message.kind, &message.payload) {
            (MessageKind::Error, Payload::Error(reason)) => {
                Err(ProcessingError::new(reason.clone()))
            }
            (MessageKind::Error, _) => Err(ProcessingError::new("request failed")),
            (_, payload) => Ok(payload.clone()),
        };

        // The caller may have stopped waiting.
        let _ = responder.send(result);
        Ok(())
    }

    /// Number of requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Detaches the bridge, abandons pending requests and clears listeners.
    pub fn teardown(&self) {
        self.inner.sender.lock().take();
        let abandoned = std::mem::take(&mut *self.inner.pending.lock());
        self.inner.listeners.lock().clear();

        if !abandoned.is_empty() {
            tracing::debug!(count = abandoned.len(), "Abandoning pending requests");
        }
    }
}

impl std::fmt::Debug for MessageCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCorrelator")
            .field("attached", &self.is_attached())
            .field("pending", &self.pending_count())
            .field("request_timeout", &self.inner.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{self, ControllerPort, ProcessorPort};
    use crate::logger::{LogLevel, Logger};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingLogger {
        lines: Mutex<Vec<(LogLevel, String)>>,
    }

    impl Logger for RecordingLogger {
        fn log(&self, level: LogLevel, message: &str) {
            self.lines.lock().push((level, message.to_string()));
        }
    }

    fn setup(timeout: Option<Duration>) -> (MessageCorrelator, ControllerPort, ProcessorPort) {
        let correlator = MessageCorrelator::new(Arc::new(RecordingLogger::default()), timeout);
        let (controller, processor) = bridge::channel(16);
        (correlator, controller, processor)
    }

    /// Polls a future once so it can register its request.
    async fn poll_once<F: std::future::Future + Unpin>(fut: &mut F) -> Option<F::Output> {
        tokio::time::timeout(Duration::from_millis(1), fut).await.ok()
    }

    #[tokio::test]
    async fn test_unattached_request_echoes_payload() {
        let (correlator, _controller, _processor) = setup(None);
        let payload = Payload::Volume(0.25);
        let result = correlator
            .send_request(MessageKind::Initialize, payload.clone())
            .await;
        assert_eq!(result, Ok(payload));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_result_resolves_request() {
        let (correlator, controller, mut processor) = setup(None);
        correlator.attach(controller.sender);

        let fut = correlator.send_request(MessageKind::Initialize, Payload::Empty);
        tokio::pin!(fut);
        assert!(poll_once(&mut fut).await.is_none());
        assert_eq!(correlator.pending_count(), 1);

        let request = processor.receiver.try_recv().unwrap();
        assert_eq!(request.kind, MessageKind::Initialize);
        let id = request.id.unwrap();
        assert_eq!(id.as_str(), "req-000001");

        correlator
            .dispatch_incoming(Message::result(id, Payload::Empty))
            .unwrap();

        assert_eq!(fut.await, Ok(Payload::Empty));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_error_response_rejects_only_its_request() {
        let (correlator, controller, mut processor) = setup(None);
        correlator.attach(controller.sender);

        let first = correlator.send_request(MessageKind::Reset, Payload::Empty);
        let second = correlator.send_request(MessageKind::Initialize, Payload::Empty);
        tokio::pin!(first, second);
        assert!(poll_once(&mut first).await.is_none());
        assert!(poll_once(&mut second).await.is_none());

        let first_id = processor.receiver.try_recv().unwrap().id.unwrap();
        let second_id = processor.receiver.try_recv().unwrap().id.unwrap();
        assert_ne!(first_id, second_id);

        correlator
            .dispatch_incoming(Message::error(first_id, "boom"))
            .unwrap();
        correlator
            .dispatch_incoming(Message::result(second_id, Payload::Empty))
            .unwrap();

        assert_eq!(
            first.await,
            Err(RequestError::Processing(ProcessingError::new("boom")))
        );
        assert_eq!(second.await, Ok(Payload::Empty));
    }

    #[tokio::test]
    async fn test_duplicate_response_is_protocol_error() {
        let (correlator, controller, mut processor) = setup(None);
        correlator.attach(controller.sender);

        let fut = correlator.send_request(MessageKind::Initialize, Payload::Empty);
        tokio::pin!(fut);
        poll_once(&mut fut).await;
        let id = processor.receiver.try_recv().unwrap().id.unwrap();

        correlator
            .dispatch_incoming(Message::result(id.clone(), Payload::Empty))
            .unwrap();
        let duplicate = correlator.dispatch_incoming(Message::result(id.clone(), Payload::Empty));

        assert_eq!(duplicate, Err(ProtocolError::UnknownCorrelationId(id)));
        assert_eq!(fut.await, Ok(Payload::Empty));
    }

    #[tokio::test]
    async fn test_unknown_id_still_reaches_listener() {
        let (correlator, _controller, _processor) = setup(None);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        correlator.register_listener(MessageKind::Result, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let result =
            correlator.dispatch_incoming(Message::result("req-ffffff".into(), Payload::Empty));

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_receives_events() {
        let (correlator, _controller, _processor) = setup(None);
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        correlator.register_listener(MessageKind::Volume, move |message| {
            if let Payload::Volume(v) = message.payload {
                sink.lock().push(v);
            }
        });

        correlator.dispatch_incoming(Message::volume(0.1)).unwrap();
        correlator.dispatch_incoming(Message::volume(0.2)).unwrap();
        correlator
            .dispatch_incoming(Message::log(LogLevel::Info, "ignored by volume listener"))
            .unwrap();

        assert_eq!(*received.lock(), vec![0.1, 0.2]);
    }

    #[test]
    fn test_log_messages_reach_logger() {
        let logger = Arc::new(RecordingLogger::default());
        let correlator = MessageCorrelator::new(logger.clone(), None);

        correlator
            .dispatch_incoming(Message::log(LogLevel::Warning, "careful"))
            .unwrap();

        assert_eq!(
            *logger.lines.lock(),
            vec![(LogLevel::Warning, "careful".to_string())]
        );
    }

    #[test]
    fn test_post_requires_attached_bridge() {
        let (correlator, controller, mut processor) = setup(None);
        assert_eq!(
            correlator.post(Message::volume(0.0)),
            Err(BridgeError::Closed)
        );

        correlator.attach(controller.sender);
        correlator.post(Message::volume(0.0)).unwrap();
        assert!(processor.receiver.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_closed_bridge_rejects_request() {
        let (correlator, controller, _processor) = setup(None);
        correlator.attach(controller.sender);
        controller.handle.close();

        let result = correlator
            .send_request(MessageKind::Initialize, Payload::Empty)
            .await;

        assert_eq!(result, Err(RequestError::Bridge(BridgeError::Closed)));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_abandons_pending_request() {
        let (correlator, controller, _processor) = setup(None);
        correlator.attach(controller.sender);

        let fut = correlator.send_request(MessageKind::Initialize, Payload::Empty);
        tokio::pin!(fut);
        assert!(poll_once(&mut fut).await.is_none());

        correlator.teardown();
        assert_eq!(correlator.pending_count(), 0);
        assert!(!correlator.is_attached());

        let settled = tokio::time::timeout(Duration::from_secs(5), &mut fut).await;
        assert!(settled.is_err(), "abandoned request must not settle");
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout() {
        let timeout = Duration::from_millis(200);
        let (correlator, controller, _processor) = setup(Some(timeout));
        correlator.attach(controller.sender);

        let result = correlator
            .send_request(MessageKind::Initialize, Payload::Empty)
            .await;

        assert_eq!(
            result,
            Err(RequestError::Timeout {
                id: CorrelationId::new("req-000001"),
                timeout
            })
        );
        assert_eq!(correlator.pending_count(), 0);
    }

    #[test]
    fn test_teardown_clears_listeners() {
        let (correlator, _controller, _processor) = setup(None);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        correlator.register_listener(MessageKind::Volume, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        correlator.teardown();
        correlator.dispatch_incoming(Message::volume(0.5)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
