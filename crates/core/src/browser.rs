//! The browser session controller.
//!
//! A [`Browser`] is the client-side representation of a remote Stealth
//! peer: it tracks open tabs, per-domain content policies, the connection
//! lifecycle, and hands out service modules that talk to the peer over the
//! established channel.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use stealth_protocol::{self as protocol, ModeConfig};
use stealth_runtime::{ConnectionState, ServiceChannel, TransportParts, WebSocketTransport};

use crate::modes::Modes;
use crate::notifier::{EventStream, EventWaiter, Notifier, Subscription};
use crate::services::ModeService;
use crate::tab::{Tab, TabId, TabRegistry};

/// Well-known port of the Stealth service peer.
pub const SERVICE_PORT: u16 = 65432;

/// Connection settings for the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Host the service peer listens on.
    pub host: String,
    /// Verbose diagnostics toggle, carried in serialized profiles.
    pub debug: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            debug: false,
        }
    }
}

/// Lifecycle notifications, emitted at most once per transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connect,
    Disconnect,
}

/// Client-side controller for a remote Stealth peer.
///
/// Tab and policy operations are synchronous and atomic with respect to one
/// another; only connection I/O suspends, and its outcomes arrive as
/// lifecycle notifications rather than return values. Methods that start
/// background work take `self: &Arc<Self>`.
pub struct Browser {
    settings: BrowserSettings,
    state: Mutex<ConnectionState>,
    tabs: Mutex<TabRegistry>,
    modes: Modes,
    notifier: Notifier<LifecycleEvent>,
    channel: Mutex<Option<Arc<ServiceChannel>>>,
}

impl Browser {
    /// Creates a disconnected controller with the given settings.
    pub fn new(settings: BrowserSettings) -> Arc<Self> {
        Arc::new(Self {
            settings,
            state: Mutex::new(ConnectionState::Disconnected),
            tabs: Mutex::new(TabRegistry::new()),
            modes: Modes::new(),
            notifier: Notifier::default(),
            channel: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Reports whether the lifecycle state matches a named predicate
    /// (`"connected"`, `"connecting"`, `"disconnected"`, `"disconnecting"`).
    pub fn is(&self, predicate: &str) -> bool {
        self.state().matches(predicate)
    }

    // --- lifecycle ------------------------------------------------------

    /// Starts connecting to the peer.
    ///
    /// Returns false when the controller is not disconnected; otherwise the
    /// attempt is accepted and true is returned immediately. The outcome
    /// arrives as a notification: [`LifecycleEvent::Connect`] on success,
    /// [`LifecycleEvent::Disconnect`] when the handshake fails.
    pub fn connect(self: &Arc<Self>) -> bool {
        if !self.begin_connecting() {
            return false;
        }

        let url = format!("ws://{}:{}/", self.settings.host, SERVICE_PORT);
        let browser = Arc::clone(self);

        tokio::spawn(async move {
            match WebSocketTransport::connect(&url).await {
                Ok(parts) => browser.finish_connect(parts),
                Err(e) => {
                    tracing::error!(host = %browser.settings.host, "Handshake failed: {}", e);
                    browser.fail_connect();
                }
            }
        });

        true
    }

    /// Connects over an already-established transport (tunnels, tests).
    ///
    /// Same contract as [`connect`](Self::connect); the handshake is the
    /// transport establishment the caller already performed.
    pub fn connect_with(self: &Arc<Self>, parts: TransportParts) -> bool {
        if !self.begin_connecting() {
            return false;
        }
        self.finish_connect(parts);
        true
    }

    /// Disconnects from the peer.
    ///
    /// Returns false unless connected. Pending service calls are resolved
    /// with their failure sentinels, then a single
    /// [`LifecycleEvent::Disconnect`] fires.
    pub fn disconnect(&self) -> bool {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Connected {
                return false;
            }
            *state = ConnectionState::Disconnecting;
        }

        self.teardown_channel();
        *self.state.lock() = ConnectionState::Disconnected;
        self.notifier.emit(LifecycleEvent::Disconnect);
        true
    }

    /// Tears everything down regardless of state. Always returns true.
    ///
    /// Pending service calls are resolved with their failure sentinels. A
    /// controller that was connected still gets its single
    /// [`LifecycleEvent::Disconnect`] before teardown completes; a dial
    /// that is still in flight finds the state changed and discards its
    /// transport.
    pub fn destroy(&self) -> bool {
        let was_connected = {
            let mut state = self.state.lock();
            let connected = *state == ConnectionState::Connected;
            *state = ConnectionState::Disconnected;
            connected
        };

        self.teardown_channel();

        if was_connected {
            self.notifier.emit(LifecycleEvent::Disconnect);
        }
        true
    }

    fn begin_connecting(&self) -> bool {
        let mut state = self.state.lock();
        if *state != ConnectionState::Disconnected {
            return false;
        }
        *state = ConnectionState::Connecting;
        true
    }

    fn finish_connect(self: &Arc<Self>, parts: TransportParts) {
        let channel = Arc::new(ServiceChannel::new(parts));

        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Connecting {
                // Destroyed while the dial was in flight.
                return;
            }
            *state = ConnectionState::Connected;
            *self.channel.lock() = Some(Arc::clone(&channel));
        }

        let browser = Arc::clone(self);
        let runner = Arc::clone(&channel);
        tokio::spawn(async move {
            runner.run().await;
            browser.on_channel_closed(&runner);
        });

        self.notifier.emit(LifecycleEvent::Connect);
    }

    fn fail_connect(&self) {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Connecting {
                return;
            }
            *state = ConnectionState::Disconnected;
        }
        self.notifier.emit(LifecycleEvent::Disconnect);
    }

    fn teardown_channel(&self) {
        if let Some(channel) = self.channel.lock().take() {
            channel.fail_pending();
            channel.close();
        }
    }

    /// Reacts to the channel run loop ending (peer closed, read fault).
    fn on_channel_closed(&self, channel: &Arc<ServiceChannel>) {
        let installed = {
            let mut guard = self.channel.lock();
            if guard.as_ref().is_some_and(|c| Arc::ptr_eq(c, channel)) {
                guard.take()
            } else {
                // A local teardown already claimed it.
                None
            }
        };

        let Some(channel) = installed else {
            return;
        };

        tracing::debug!("Transport closed by peer");
        channel.fail_pending();
        channel.close();

        let was_connected = {
            let mut state = self.state.lock();
            let connected = *state == ConnectionState::Connected;
            *state = ConnectionState::Disconnected;
            connected
        };

        if was_connected {
            self.notifier.emit(LifecycleEvent::Disconnect);
        }
    }

    // --- notifications --------------------------------------------------

    /// Subscribes to all future lifecycle events.
    pub fn subscribe(&self) -> EventStream<LifecycleEvent> {
        self.notifier.subscribe()
    }

    /// Waits for the next occurrence of one lifecycle event.
    pub fn once(&self, event: LifecycleEvent) -> EventWaiter<LifecycleEvent> {
        self.notifier.once(move |e| *e == event)
    }

    /// Registers a callback for every lifecycle event.
    pub fn on<F>(&self, callback: F) -> Subscription
    where
        F: Fn(LifecycleEvent) + Send + 'static,
    {
        self.notifier.on(callback)
    }

    // --- tabs -----------------------------------------------------------

    /// Opens a tab without showing it.
    pub fn open(&self, url: &str) -> TabId {
        self.tabs.lock().open(url)
    }

    /// Makes a tab current.
    pub fn show(&self, id: TabId) -> bool {
        self.tabs.lock().show(id)
    }

    /// Closes a tab. See [`TabRegistry::close`] for the promotion and
    /// sole-tab recycling rules.
    pub fn close(&self, id: TabId) -> bool {
        self.tabs.lock().close(id)
    }

    /// Navigates the current tab.
    pub fn navigate(&self, url: &str) -> bool {
        self.tabs.lock().navigate(url)
    }

    /// Steps the current tab back one history entry.
    pub fn back(&self) -> bool {
        self.tabs.lock().back()
    }

    /// Snapshot of a tab.
    pub fn tab(&self, id: TabId) -> Option<Tab> {
        self.tabs.lock().get(id).cloned()
    }

    /// Snapshot of the current tab.
    pub fn current_tab(&self) -> Option<Tab> {
        self.tabs.lock().current().cloned()
    }

    pub fn current_tab_id(&self) -> Option<TabId> {
        self.tabs.lock().current_id()
    }

    /// URL of the current tab.
    pub fn current_url(&self) -> Option<String> {
        self.tabs.lock().current().map(|tab| tab.url().to_string())
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.lock().len()
    }

    /// Stores a service's ephemeral state on a tab.
    pub fn remember(&self, id: TabId, service: &str, state: Value) -> bool {
        match self.tabs.lock().get_mut(id) {
            Some(tab) => {
                tab.remember(service, state);
                true
            }
            None => false,
        }
    }

    /// Drops a service's ephemeral state from a tab.
    pub fn forget(&self, id: TabId, service: &str) -> bool {
        match self.tabs.lock().get_mut(id) {
            Some(tab) => tab.forget(service),
            None => false,
        }
    }

    // --- mode configs ---------------------------------------------------

    /// Policy for a domain; a transient default when none is stored.
    pub fn get(&self, domain: &str) -> Arc<ModeConfig> {
        self.modes.get(domain)
    }

    /// Upserts a policy entry by domain.
    pub fn set(&self, config: Arc<ModeConfig>) -> bool {
        self.modes.set(config)
    }

    /// Validating upsert for untyped values; false on shape mismatch.
    pub fn set_value(&self, value: &Value) -> bool {
        self.modes.set_value(value)
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    // --- services -------------------------------------------------------

    /// Client for the peer's mode service; `None` while disconnected.
    pub fn mode_service(&self) -> Option<ModeService> {
        self.channel
            .lock()
            .as_ref()
            .map(|channel| ModeService::new(Arc::clone(channel)))
    }

    // --- serialization --------------------------------------------------

    /// Serializes the controller in the tagged `{type, data}` form.
    pub fn to_value(&self) -> Value {
        let tabs: Vec<Tab> = self.tabs.lock().iter().cloned().collect();
        protocol::tagged(
            "Browser",
            json!({
                "settings": self.settings,
                "state": self.state().as_str(),
                "tabs": tabs,
            }),
        )
    }

    /// Returns true iff `value` is a serialized browser controller.
    pub fn is_browser(value: &Value) -> bool {
        protocol::is_browser(value)
    }

    /// Returns true iff `value` has the exact mode-config shape.
    pub fn is_config(value: &Value) -> bool {
        protocol::is_config(value)
    }
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("host", &self.settings.host)
            .field("state", &self.state())
            .field("tabs", &self.tab_count())
            .finish()
    }
}
