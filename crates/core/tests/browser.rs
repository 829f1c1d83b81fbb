//! End-to-end controller exercises over an in-memory transport.
//!
//! The peer side of each test reads framed envelopes off a duplex pipe and
//! answers like a Stealth service would.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use stealth::{
    Browser, BrowserSettings, ConnectionState, ContentPolicy, LifecycleEvent, ModeConfig,
    WELCOME_URL, is_browser, is_config,
};
use stealth_runtime::PipeTransport;

struct Peer {
    read: DuplexStream,
    write: DuplexStream,
}

impl Peer {
    async fn recv(&mut self) -> Value {
        let mut length_buf = [0u8; 4];
        self.read.read_exact(&mut length_buf).await.unwrap();
        let mut body = vec![0u8; u32::from_le_bytes(length_buf) as usize];
        self.read.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn send(&mut self, message: Value) {
        let body = serde_json::to_vec(&message).unwrap();
        self.write
            .write_all(&(body.len() as u32).to_le_bytes())
            .await
            .unwrap();
        self.write.write_all(&body).await.unwrap();
    }
}

/// Connects a fresh controller to an in-memory peer.
async fn connected_browser() -> (Arc<Browser>, Peer) {
    let (peer_read, our_write) = tokio::io::duplex(4096);
    let (our_read, peer_write) = tokio::io::duplex(4096);

    let browser = Browser::new(BrowserSettings {
        host: "127.0.0.1".to_string(),
        ..BrowserSettings::default()
    });

    let connected = browser.once(LifecycleEvent::Connect);
    let (transport, message_rx) = PipeTransport::new(our_write, our_read);
    assert!(browser.connect_with(transport.into_transport_parts(message_rx)));
    connected.wait().await.unwrap();

    (
        browser,
        Peer {
            read: peer_read,
            write: peer_write,
        },
    )
}

fn text_config(domain: &str) -> Arc<ModeConfig> {
    Arc::new(ModeConfig {
        domain: Some(domain.to_string()),
        mode: ContentPolicy {
            text: true,
            ..ContentPolicy::default()
        },
    })
}

#[tokio::test]
async fn connect_reaches_connected_state() {
    let (browser, _peer) = connected_browser().await;

    assert!(browser.is("connected"));
    assert_eq!(browser.state(), ConnectionState::Connected);

    let config = text_config("example.com");
    assert!(browser.set(Arc::clone(&config)));
    assert!(Arc::ptr_eq(&browser.get("example.com"), &config));
    assert!(browser.modes().contains(&config));

    let tab = browser.open("https://example.com");
    assert!(browser.tab(tab).is_some());
}

#[tokio::test]
async fn second_connect_attempt_is_rejected() {
    let (browser, _peer) = connected_browser().await;

    assert!(!browser.connect());
    assert!(browser.is("connected"));
}

#[tokio::test]
async fn stored_and_transient_configs_behave_like_the_original() {
    let (browser, _peer) = connected_browser().await;

    browser.set(text_config("example.com"));

    let cfg1 = browser.get("cookie.engineer");
    let cfg2 = browser.get("tholian.network");
    let cfg3 = browser.get("example.com");

    assert_eq!(cfg1.domain.as_deref(), Some("cookie.engineer"));
    assert_eq!(cfg1.mode, ContentPolicy::default());
    assert_eq!(cfg2.domain.as_deref(), Some("tholian.network"));
    assert_eq!(cfg2.mode, ContentPolicy::default());
    assert!(cfg3.mode.text);

    // Transient defaults were not inserted; the stored entry was.
    assert_eq!(browser.modes().len(), 1);
    assert!(browser.modes().contains(&cfg3));

    // Storing the transient handles makes get return those exact handles.
    assert!(browser.set(Arc::clone(&cfg1)));
    assert!(browser.set(Arc::clone(&cfg2)));
    assert!(Arc::ptr_eq(&browser.get("cookie.engineer"), &cfg1));
    assert!(Arc::ptr_eq(&browser.get("tholian.network"), &cfg2));
    assert_eq!(browser.modes().len(), 3);
}

#[tokio::test]
async fn navigate_and_back_walk_the_scenario() {
    let (browser, _peer) = connected_browser().await;

    let tab = browser.open("https://example.com/");
    assert!(browser.show(tab));
    assert!(browser.navigate("https://two.example.com/"));
    assert!(browser.navigate("https://three.example.com/"));

    assert!(browser.back());
    assert_eq!(
        browser.current_url().as_deref(),
        Some("https://two.example.com/")
    );

    assert!(browser.back());
    assert_eq!(browser.current_url().as_deref(), Some("https://example.com/"));

    assert!(!browser.back());
    assert_eq!(browser.current_url().as_deref(), Some("https://example.com/"));

    assert!(browser.forget(tab, "stealth"));
}

#[tokio::test]
async fn close_recycles_the_sole_tab_and_promotes_deterministically() {
    let (browser, _peer) = connected_browser().await;

    let tab = browser.open("https://example.com/");
    browser.show(tab);

    assert_eq!(browser.tab_count(), 1);
    assert!(browser.close(tab));
    assert_eq!(browser.tab_count(), 1);
    assert_eq!(browser.current_url().as_deref(), Some(WELCOME_URL));

    let tab1 = browser.open("https://example.com/one.html");
    assert!(browser.show(tab1));
    assert_eq!(browser.tab_count(), 2);

    assert!(browser.navigate("https://example.com/two.html"));
    assert!(browser.close(tab1));

    // The recycled welcome tab is the one that remains and is current.
    let survivor = browser.current_tab_id().unwrap();
    assert_eq!(browser.tab_count(), 1);
    assert_eq!(browser.current_url().as_deref(), Some(WELCOME_URL));

    // Closing the survivor keeps the registry non-empty.
    assert!(browser.close(survivor));
    assert_eq!(browser.tab_count(), 1);
}

#[tokio::test]
async fn mode_service_round_trips_through_the_peer() {
    let (browser, mut peer) = connected_browser().await;

    let service = browser.mode_service().unwrap();

    let responder = tokio::spawn(async move {
        let request = peer.recv().await;
        assert_eq!(request["headers"]["service"], "mode");
        assert_eq!(request["headers"]["method"], "read");
        assert_eq!(request["payload"]["domain"], "example.com");

        peer.send(json!({
            "headers": {"service": "mode", "method": "read"},
            "payload": {
                "domain": "example.com",
                "mode": {"text": true, "image": false, "audio": false, "video": false, "other": false}
            }
        }))
        .await;

        let request = peer.recv().await;
        assert_eq!(request["headers"]["method"], "save");
        peer.send(json!({
            "headers": {"service": "mode", "method": "save"},
            "payload": true
        }))
        .await;

        peer
    });

    let config = service.read_domain("example.com").await.unwrap();
    assert_eq!(config.domain.as_deref(), Some("example.com"));
    assert!(config.mode.text);

    assert!(service.save_config(&config).await);

    let _ = responder.await.unwrap();
}

#[tokio::test]
async fn mode_service_without_payload_short_circuits() {
    let (browser, _peer) = connected_browser().await;
    let service = browser.mode_service().unwrap();

    assert_eq!(service.read(None).await, None);
    assert!(!service.remove(None).await);
    assert!(!service.save(None).await);
}

#[tokio::test]
async fn destroy_flushes_pending_calls_and_notifies_once() {
    let (browser, mut peer) = connected_browser().await;
    let mut events = browser.subscribe();

    let service = browser.mode_service().unwrap();
    let pending = tokio::spawn(async move { service.read_domain("example.com").await });

    // The request is on the wire before teardown.
    let request = peer.recv().await;
    assert_eq!(request["headers"]["method"], "read");

    assert!(browser.destroy());

    // The pending caller got its failure sentinel, not silence.
    assert_eq!(pending.await.unwrap(), None);

    assert_eq!(events.recv().await, Some(LifecycleEvent::Disconnect));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(events.try_recv(), None);

    assert!(browser.is("disconnected"));
    assert!(browser.mode_service().is_none());
}

#[tokio::test]
async fn disconnect_notifies_once_and_only_when_connected() {
    let (browser, _peer) = connected_browser().await;
    let mut events = browser.subscribe();

    assert!(browser.disconnect());
    assert_eq!(events.recv().await, Some(LifecycleEvent::Disconnect));

    assert!(!browser.disconnect());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(events.try_recv(), None);
    assert!(browser.is("disconnected"));
}

#[tokio::test]
async fn peer_going_away_is_a_disconnect() {
    let (browser, peer) = connected_browser().await;
    let mut events = browser.subscribe();

    drop(peer);

    assert_eq!(events.recv().await, Some(LifecycleEvent::Disconnect));
    assert!(browser.is("disconnected"));
    assert!(browser.mode_service().is_none());
}

#[tokio::test]
async fn reconnect_after_disconnect_is_accepted() {
    let (browser, _peer) = connected_browser().await;

    assert!(browser.disconnect());

    let (_peer_read, our_write) = tokio::io::duplex(4096);
    let (our_read, _peer_write) = tokio::io::duplex(4096);
    let connected = browser.once(LifecycleEvent::Connect);
    let (transport, message_rx) = PipeTransport::new(our_write, our_read);
    assert!(browser.connect_with(transport.into_transport_parts(message_rx)));
    connected.wait().await.unwrap();
    assert!(browser.is("connected"));
}

#[tokio::test]
async fn validation_predicates_agree() {
    let browser = Browser::new(BrowserSettings::default());

    let value = browser.to_value();
    assert!(Browser::is_browser(&value));
    assert!(is_browser(&value));
    assert!(!is_browser(&json!({"type": "Tab", "data": {}})));

    let config = json!({
        "domain": null,
        "mode": {"text": true, "image": false, "audio": false, "video": false, "other": false}
    });
    assert!(Browser::is_config(&config));
    assert!(is_config(&config));
    assert!(!is_config(&json!({"domain": null})));
}
