//! Client module for the peer's "mode" service.

use std::sync::Arc;

use serde_json::{Value, json};

use stealth_protocol::ModeConfig;
use stealth_runtime::{ResponseKind, ServiceChannel};

const SERVICE: &str = "mode";

/// Client for the peer's per-domain content-policy service.
///
/// Calls follow the channel's sentinel rules: read-like methods resolve to
/// `None` and mutation-like methods to `false` when no payload is given,
/// when the channel is down, or when teardown flushes the call.
#[derive(Clone)]
pub struct ModeService {
    channel: Arc<ServiceChannel>,
}

impl ModeService {
    pub(crate) fn new(channel: Arc<ServiceChannel>) -> Self {
        Self { channel }
    }

    /// Reads the stored policy for the queried domain.
    pub async fn read(&self, payload: Option<Value>) -> Option<ModeConfig> {
        let response = self
            .channel
            .call(SERVICE, "read", payload, ResponseKind::Payload)
            .await;
        ModeConfig::from_value(&response)
    }

    /// Reads the stored policy for a domain.
    pub async fn read_domain(&self, domain: &str) -> Option<ModeConfig> {
        self.read(Some(json!({"domain": domain}))).await
    }

    /// Removes the stored policy for the queried domain.
    pub async fn remove(&self, payload: Option<Value>) -> bool {
        self.channel
            .call(SERVICE, "remove", payload, ResponseKind::Confirmation)
            .await
            .as_bool()
            .unwrap_or(false)
    }

    /// Removes the stored policy for a domain.
    pub async fn remove_domain(&self, domain: &str) -> bool {
        self.remove(Some(json!({"domain": domain}))).await
    }

    /// Saves a policy on the peer.
    pub async fn save(&self, payload: Option<Value>) -> bool {
        self.channel
            .call(SERVICE, "save", payload, ResponseKind::Confirmation)
            .await
            .as_bool()
            .unwrap_or(false)
    }

    /// Saves a typed policy on the peer.
    pub async fn save_config(&self, config: &ModeConfig) -> bool {
        match serde_json::to_value(config) {
            Ok(payload) => self.save(Some(payload)).await,
            Err(e) => {
                tracing::error!("Failed to serialize config: {}", e);
                false
            }
        }
    }
}
