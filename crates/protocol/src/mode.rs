//! Per-domain content-policy configuration.
//!
//! A mode config decides which content categories the peer is allowed to
//! serve for a domain. A config with no domain is the fallback policy.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The five content categories a policy can permit.
///
/// The wire shape is exactly these five boolean keys; anything else is
/// rejected by [`is_config`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPolicy {
    pub text: bool,
    pub image: bool,
    pub audio: bool,
    pub video: bool,
    pub other: bool,
}

const POLICY_KEYS: [&str; 5] = ["text", "image", "audio", "video", "other"];

/// Content policy for a single domain, or the fallback policy when
/// `domain` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub domain: Option<String>,
    pub mode: ContentPolicy,
}

impl ModeConfig {
    /// The transient deny-everything entry handed out for unknown domains.
    pub fn default_for(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            mode: ContentPolicy::default(),
        }
    }

    /// Checked deserialization from an untrusted wire value.
    ///
    /// Returns `None` for anything [`is_config`] rejects, so a malformed
    /// peer payload can never become a typed config.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !is_config(value) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Shape predicate for untyped config values. See [`is_config`].
    pub fn is_config(value: &Value) -> bool {
        is_config(value)
    }
}

/// Returns `true` iff `value` has the exact shape of a mode config:
/// a `domain` key holding a string or null, and a `mode` object holding
/// exactly the five content categories, each boolean-typed.
pub fn is_config(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    let domain_ok = matches!(object.get("domain"), Some(Value::String(_)) | Some(Value::Null));
    let Some(Value::Object(mode)) = object.get("mode") else {
        return false;
    };

    domain_ok
        && mode.len() == POLICY_KEYS.len()
        && POLICY_KEYS
            .iter()
            .all(|key| matches!(mode.get(*key), Some(Value::Bool(_))))
}
