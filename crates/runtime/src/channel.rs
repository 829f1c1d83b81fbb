//! Service channel - one-shot request/response correlation.
//!
//! Service modules send tagged envelopes (`{headers: {service, method},
//! payload}`) and get exactly one response each. The wire carries no request
//! id, so correlation is a FIFO queue per `(service, method)` pair:
//! responses resolve outstanding calls in issue order. Concurrent calls to
//! the same method are therefore safe - the second caller waits for the
//! second response.
//!
//! # Message Flow
//!
//! 1. Caller invokes [`ServiceChannel::call`] with service, method, payload
//! 2. A oneshot resolver is queued under the `(service, method)` key and the
//!    envelope is handed to the writer task - both under one lock, so a
//!    response can never outrun its queue entry
//! 3. Caller awaits the oneshot receiver
//! 4. The run loop parses inbound envelopes and pops the matching queue
//! 5. Teardown resolves every still-queued caller with its method's failure
//!    sentinel - callers are never left unresolved

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde_json::Value;
use stealth_protocol::Envelope;
use tokio::sync::{Notify, mpsc, oneshot};

use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Sentinel class of a service method.
///
/// Read-like methods resolve to `null` when they cannot produce a result;
/// mutation-like methods resolve to `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Read-like method returning a payload; empty/failure sentinel is `null`.
    Payload,
    /// Mutation-like method returning a confirmation; empty/failure sentinel
    /// is `false`.
    Confirmation,
}

impl ResponseKind {
    /// The value a caller receives when no real response can be delivered.
    pub fn sentinel(&self) -> Value {
        match self {
            ResponseKind::Payload => Value::Null,
            ResponseKind::Confirmation => Value::Bool(false),
        }
    }
}

/// A caller waiting for the next response to its method.
struct PendingRequest {
    kind: ResponseKind,
    resolver: oneshot::Sender<Value>,
}

type PendingKey = (String, String);
type PendingMap = HashMap<PendingKey, VecDeque<PendingRequest>>;

/// Parts owned by the run loop, taken exactly once.
struct RunParts {
    sender: Box<dyn Transport>,
    receiver: Box<dyn TransportReceiver>,
    message_rx: mpsc::UnboundedReceiver<Value>,
    outbound_rx: mpsc::UnboundedReceiver<Value>,
}

/// Request/response dispatcher over an established transport.
pub struct ServiceChannel {
    /// Waiting callers, FIFO per `(service, method)`.
    pending: Mutex<PendingMap>,
    /// Feed to the writer task; `None` once the channel is closed.
    outbound_tx: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    /// Transport halves held for the run loop.
    run_parts: Mutex<Option<RunParts>>,
    /// Signals the run loop to wind down.
    closed: Notify,
}

impl ServiceChannel {
    /// Creates a channel over an established transport.
    pub fn new(parts: TransportParts) -> Self {
        let TransportParts {
            sender,
            receiver,
            message_rx,
        } = parts;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Self {
            pending: Mutex::new(HashMap::new()),
            outbound_tx: Mutex::new(Some(outbound_tx)),
            run_parts: Mutex::new(Some(RunParts {
                sender,
                receiver,
                message_rx,
                outbound_rx,
            })),
            closed: Notify::new(),
        }
    }

    /// Sends a service call and resolves with the first matching response.
    ///
    /// A call without a payload resolves immediately with the method's empty
    /// sentinel and sends nothing. A call on a closed channel resolves with
    /// the failure sentinel. The caller is never blocked behind the wire:
    /// delivery is deferred until the peer answers or teardown flushes the
    /// queue.
    pub async fn call(
        &self,
        service: &str,
        method: &str,
        payload: Option<Value>,
        kind: ResponseKind,
    ) -> Value {
        let Some(payload) = payload else {
            return kind.sentinel();
        };

        let envelope = Envelope::request(service, method, payload);
        let message = match serde_json::to_value(&envelope) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!("Failed to serialize envelope: {}", e);
                return kind.sentinel();
            }
        };

        let (resolver, response_rx) = oneshot::channel();
        let key = (service.to_string(), method.to_string());

        // Queue and send under one lock so the response cannot arrive
        // before its queue entry exists.
        let queued = {
            let mut pending = self.pending.lock();
            let sent = match self.outbound_tx.lock().as_ref() {
                Some(outbound) => outbound.send(message).is_ok(),
                None => false,
            };
            if sent {
                pending
                    .entry(key)
                    .or_default()
                    .push_back(PendingRequest { kind, resolver });
            }
            sent
        };

        if !queued {
            tracing::debug!(service, method, "Call on closed channel");
            return kind.sentinel();
        }

        match response_rx.await {
            Ok(response) => response,
            Err(_) => kind.sentinel(),
        }
    }

    /// Resolves every pending caller with its method's failure sentinel.
    pub fn fail_pending(&self) {
        let drained: Vec<PendingRequest> = {
            let mut pending = self.pending.lock();
            pending.drain().flat_map(|(_, queue)| queue).collect()
        };

        for request in drained {
            let _ = request.resolver.send(request.kind.sentinel());
        }
    }

    /// Closes the channel: stops accepting calls and winds down the run loop.
    ///
    /// Pending callers are not resolved here; pair with
    /// [`fail_pending`](Self::fail_pending) during teardown.
    pub fn close(&self) {
        self.outbound_tx.lock().take();
        self.closed.notify_one();
    }

    /// Returns true while the channel accepts calls.
    pub fn is_open(&self) -> bool {
        self.outbound_tx.lock().is_some()
    }

    /// Number of callers currently awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().values().map(VecDeque::len).sum()
    }

    /// Runs the dispatch loop until the transport ends or the channel is
    /// closed. Call exactly once.
    pub async fn run(self: &std::sync::Arc<Self>) {
        let Some(parts) = self.run_parts.lock().take() else {
            tracing::error!("ServiceChannel::run called twice");
            return;
        };

        let RunParts {
            mut sender,
            mut receiver,
            mut message_rx,
            mut outbound_rx,
        } = parts;

        let reader = tokio::spawn(async move {
            if let Err(e) = receiver.run().await {
                tracing::error!("Transport read error: {}", e);
            }
        });

        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = sender.send(message).await {
                    tracing::error!("Transport write error: {}", e);
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = self.closed.notified() => break,
                inbound = message_rx.recv() => match inbound {
                    Some(message) => self.dispatch(message),
                    // Transport ended (peer closed or read fault).
                    None => break,
                },
            }
        }

        self.outbound_tx.lock().take();
        reader.abort();
        let _ = writer.await;
    }

    /// Routes one inbound message to the caller at the head of its queue.
    fn dispatch(&self, message: Value) {
        let envelope = match serde_json::from_value::<Envelope>(message) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("Ignoring unparseable message: {}", e);
                return;
            }
        };

        let key = (envelope.headers.service, envelope.headers.method);
        let request = {
            let mut pending = self.pending.lock();
            let request = pending.get_mut(&key).and_then(VecDeque::pop_front);
            if pending.get(&key).is_some_and(VecDeque::is_empty) {
                pending.remove(&key);
            }
            request
        };

        match request {
            Some(request) => {
                // Caller may have gone away; the response is then discarded
                // rather than delivered to the wrong caller.
                let _ = request.resolver.send(envelope.payload);
            }
            None => {
                tracing::debug!(
                    service = %key.0,
                    method = %key.1,
                    "Response with no pending call (ignored)"
                );
            }
        }
    }
}
