//! Ordered store of per-domain content policies.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use stealth_protocol::ModeConfig;

/// Ordered collection of per-domain policy entries.
///
/// Entries are shared handles: [`get`](Self::get) hands back the stored
/// entry itself for a known domain, so a caller can hold on to it and later
/// check membership by handle identity (`Arc::ptr_eq`). Unknown domains get
/// a transient deny-everything entry that is not inserted.
#[derive(Default)]
pub struct Modes {
    entries: Mutex<Vec<Arc<ModeConfig>>>,
}

impl Modes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the policy for a domain.
    ///
    /// The match is exact and case-sensitive; no suffix or wildcard rules.
    /// A miss returns a fresh default entry without storing it.
    pub fn get(&self, domain: &str) -> Arc<ModeConfig> {
        self.entries
            .lock()
            .iter()
            .find(|entry| entry.domain.as_deref() == Some(domain))
            .cloned()
            .unwrap_or_else(|| Arc::new(ModeConfig::default_for(domain)))
    }

    /// Upserts an entry by domain: the new handle replaces the stored entry
    /// for that domain, or is appended when none exists.
    pub fn set(&self, config: Arc<ModeConfig>) -> bool {
        let mut entries = self.entries.lock();
        match entries
            .iter()
            .position(|entry| entry.domain == config.domain)
        {
            Some(index) => entries[index] = config,
            None => entries.push(config),
        }
        true
    }

    /// Validating upsert for untyped wire values.
    ///
    /// Returns false, with no mutation, when the value does not have the
    /// exact config shape.
    pub fn set_value(&self, value: &Value) -> bool {
        match ModeConfig::from_value(value) {
            Some(config) => self.set(Arc::new(config)),
            None => false,
        }
    }

    /// Membership check by handle identity.
    pub fn contains(&self, config: &Arc<ModeConfig>) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|entry| Arc::ptr_eq(entry, config))
    }

    /// Snapshot of the stored entries in insertion order.
    pub fn entries(&self) -> Vec<Arc<ModeConfig>> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stealth_protocol::ContentPolicy;

    fn config(domain: &str, text: bool) -> Arc<ModeConfig> {
        Arc::new(ModeConfig {
            domain: Some(domain.to_string()),
            mode: ContentPolicy {
                text,
                ..ContentPolicy::default()
            },
        })
    }

    #[test]
    fn get_returns_the_stored_handle() {
        let modes = Modes::new();
        let stored = config("example.com", true);

        assert!(modes.set(Arc::clone(&stored)));

        let found = modes.get("example.com");
        assert!(Arc::ptr_eq(&found, &stored));
        assert!(modes.contains(&stored));
    }

    #[test]
    fn get_miss_returns_transient_default() {
        let modes = Modes::new();

        let transient = modes.get("cookie.engineer");
        assert_eq!(transient.domain.as_deref(), Some("cookie.engineer"));
        assert_eq!(transient.mode, ContentPolicy::default());

        // The miss did not grow the store, and a second miss is a new handle.
        assert!(modes.is_empty());
        let again = modes.get("cookie.engineer");
        assert!(!Arc::ptr_eq(&transient, &again));
    }

    #[test]
    fn set_replaces_entries_by_domain() {
        let modes = Modes::new();
        let old = config("example.com", false);
        let new = config("example.com", true);

        modes.set(Arc::clone(&old));
        modes.set(Arc::clone(&new));

        assert_eq!(modes.len(), 1);
        assert!(Arc::ptr_eq(&modes.get("example.com"), &new));
        assert!(!modes.contains(&old));
    }

    #[test]
    fn set_keeps_insertion_order() {
        let modes = Modes::new();
        modes.set(config("one.example.com", false));
        modes.set(config("two.example.com", false));
        modes.set(config("three.example.com", false));

        let domains: Vec<_> = modes
            .entries()
            .iter()
            .map(|entry| entry.domain.clone().unwrap())
            .collect();
        assert_eq!(
            domains,
            ["one.example.com", "two.example.com", "three.example.com"]
        );
    }

    #[test]
    fn fallback_entry_is_storable() {
        let modes = Modes::new();
        let fallback = Arc::new(ModeConfig {
            domain: None,
            mode: ContentPolicy::default(),
        });

        assert!(modes.set(Arc::clone(&fallback)));
        assert!(modes.contains(&fallback));

        // Exact domain lookup never falls through to the fallback entry.
        let miss = modes.get("example.com");
        assert!(!Arc::ptr_eq(&miss, &fallback));
    }

    #[test]
    fn set_value_validates_shape() {
        let modes = Modes::new();

        assert!(!modes.set_value(&json!({"domain": null})));
        assert!(!modes.set_value(&json!({"domain": "example.com", "mode": {"text": true}})));
        assert!(modes.is_empty());

        assert!(modes.set_value(&json!({
            "domain": "example.com",
            "mode": {"text": true, "image": false, "audio": false, "video": false, "other": false}
        })));
        assert_eq!(modes.len(), 1);
        assert!(modes.get("example.com").mode.text);
    }
}
