//! stealth: client-side session controller for a Stealth service peer.
//!
//! This crate provides the public controller API: a [`Browser`] tracking
//! open tabs, per-domain content policies, and the lifecycle of the
//! connection to the remote peer, plus the service modules that talk to
//! that peer over the established channel.
//!
//! # Example
//!
//! ```ignore
//! use stealth::{Browser, BrowserSettings, LifecycleEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let browser = Browser::new(BrowserSettings {
//!         host: "127.0.0.1".to_string(),
//!         ..BrowserSettings::default()
//!     });
//!
//!     let connected = browser.once(LifecycleEvent::Connect);
//!     assert!(browser.connect());
//!     connected.wait().await.expect("peer did not answer");
//!
//!     let tab = browser.open("https://example.com/");
//!     browser.show(tab);
//!     browser.navigate("https://example.com/page.html");
//!     assert!(browser.back());
//!
//!     browser.destroy();
//! }
//! ```

pub mod browser;
pub mod modes;
pub mod notifier;
pub mod services;
pub mod tab;

pub use browser::{Browser, BrowserSettings, LifecycleEvent, SERVICE_PORT};
pub use modes::Modes;
pub use notifier::{EventStream, EventWaiter, Notifier, Subscription};
pub use services::ModeService;
pub use tab::{Tab, TabId, TabRegistry, WELCOME_URL};

// Wire-level types and the validation predicates, re-exported so the
// namespaced (`Browser::is_browser`) and free-function forms agree.
pub use stealth_protocol::{ContentPolicy, ModeConfig, is_browser, is_config};
pub use stealth_runtime::ConnectionState;
