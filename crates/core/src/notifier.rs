//! Lifecycle notification primitive.
//!
//! Components compose a [`Notifier`] field instead of inheriting emitter
//! behavior. Three consumption patterns are supported:
//!
//! 1. **Streams**: Subscribe via [`Notifier::subscribe`] and poll for events
//! 2. **One-shots**: Register via [`Notifier::once`] for the next matching
//!    event
//! 3. **Callbacks**: Register via [`Notifier::on`], which spawns a
//!    background task managed by the returned [`Subscription`]
//!
//! Waiters are checked before the broadcast during [`Notifier::emit`], so
//! `once` registrations have guaranteed delivery even when stream
//! subscribers are lagging.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};

use stealth_runtime::{Error, Result};

/// Default timeout applied by [`EventWaiter::wait`].
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

struct WaiterEntry<E> {
    predicate: Box<dyn Fn(&E) -> bool + Send + Sync>,
    complete_tx: oneshot::Sender<E>,
}

/// Explicit event emission point with `on`/`once`/`emit` semantics.
pub struct Notifier<E: Clone + Send + 'static> {
    tx: broadcast::Sender<E>,
    waiters: Mutex<Vec<WaiterEntry<E>>>,
}

impl<E: Clone + Send + 'static> Notifier<E> {
    /// Creates a notifier with the given broadcast capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Emits an event to all subscribers and matching one-shot waiters.
    ///
    /// Matching waiters receive the event first and are removed; the event
    /// is then broadcast to stream subscribers.
    pub fn emit(&self, event: E) {
        {
            let mut waiters = self.waiters.lock();
            let mut i = 0;
            while i < waiters.len() {
                if (waiters[i].predicate)(&event) {
                    let entry = waiters.swap_remove(i);
                    let _ = entry.complete_tx.send(event.clone());
                } else {
                    i += 1;
                }
            }
        }
        let _ = self.tx.send(event);
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> EventStream<E> {
        EventStream::new(self.tx.subscribe())
    }

    /// Registers a one-shot waiter for the next event matching `predicate`.
    pub fn once<F>(&self, predicate: F) -> EventWaiter<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let (complete_tx, complete_rx) = oneshot::channel();
        self.waiters.lock().push(WaiterEntry {
            predicate: Box::new(predicate),
            complete_tx,
        });
        EventWaiter::new(complete_rx, DEFAULT_WAIT_TIMEOUT)
    }

    /// Registers a callback invoked on every event until the returned
    /// [`Subscription`] is dropped.
    pub fn on<F>(&self, callback: F) -> Subscription
    where
        F: Fn(E) + Send + 'static,
    {
        let mut stream = self.subscribe();
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    event = stream.recv() => match event {
                        Some(event) => callback(event),
                        None => break,
                    },
                }
            }
        });

        Subscription::new(cancel_tx)
    }

    /// Number of registered one-shot waiters.
    #[allow(dead_code)]
    pub(crate) fn waiter_count(&self) -> usize {
        self.waiters.lock().len()
    }
}

impl<E: Clone + Send + 'static> Default for Notifier<E> {
    fn default() -> Self {
        Self::new(64)
    }
}

/// RAII handle that cancels a callback registration when dropped.
pub struct Subscription {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl Subscription {
    fn new(cancel_tx: oneshot::Sender<()>) -> Self {
        Self {
            cancel_tx: Some(cancel_tx),
        }
    }

    /// Explicitly cancels the subscription, equivalent to dropping it.
    pub fn unsubscribe(mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel_tx.is_some())
            .finish()
    }
}

/// Wrapper around a broadcast receiver with automatic lag handling.
///
/// Lagged receivers log a warning and keep receiving instead of surfacing
/// an error into event loops.
pub struct EventStream<E: Clone + Send + 'static> {
    rx: broadcast::Receiver<E>,
}

impl<E: Clone + Send + 'static> EventStream<E> {
    fn new(rx: broadcast::Receiver<E>) -> Self {
        Self { rx }
    }

    /// Receives the next event; `None` when the notifier is gone.
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(dropped = n, "Event stream lagged, dropped events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receives an event if one is immediately available.
    pub fn try_recv(&mut self) -> Option<E> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(dropped = n, "Event stream lagged, dropped events");
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

/// One-shot event waiter.
///
/// Use [`wait`](Self::wait) for timeout support or `.await` directly for an
/// unbounded wait.
pub struct EventWaiter<E> {
    rx: oneshot::Receiver<E>,
    timeout: Duration,
}

impl<E: Send + 'static> EventWaiter<E> {
    fn new(rx: oneshot::Receiver<E>, timeout: Duration) -> Self {
        Self { rx, timeout }
    }

    /// Overrides the timeout used by [`wait`](Self::wait).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Waits for the event.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no matching event arrives in time
    /// - [`Error::ChannelClosed`] if the notifier is dropped first
    pub async fn wait(self) -> Result<E> {
        tokio::time::timeout(self.timeout, self.rx)
            .await
            .map_err(|_| Error::Timeout("Timeout waiting for event".to_string()))?
            .map_err(|_| Error::ChannelClosed)
    }
}

impl<E: Send + 'static> Future for EventWaiter<E> {
    type Output = Result<E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(event)) => Poll::Ready(Ok(event)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::ChannelClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}
