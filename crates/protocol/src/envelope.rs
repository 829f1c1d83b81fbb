//! Tagged request/response envelope exchanged with the Stealth peer.
//!
//! Every service call travels as `{headers: {service, method}, payload}`.
//! Responses reuse the same shape: the peer echoes the service and method
//! names and replaces the payload with the result. There is no request id on
//! the wire; correlation is the runtime's job.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Routing headers naming the target service module and method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    pub service: String,
    pub method: String,
}

impl Headers {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
        }
    }
}

/// A single protocol message: routing headers plus an opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub headers: Headers,
    pub payload: Value,
}

impl Envelope {
    /// Builds a request envelope for a service call.
    pub fn request(service: &str, method: &str, payload: Value) -> Self {
        Self {
            headers: Headers::new(service, method),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_wire_shape() {
        let envelope = Envelope::request("mode", "read", json!({"domain": "example.com"}));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["headers"]["service"], "mode");
        assert_eq!(value["headers"]["method"], "read");
        assert_eq!(value["payload"]["domain"], "example.com");
    }

    #[test]
    fn envelope_round_trip() {
        let json = r#"{"headers":{"service":"mode","method":"save"},"payload":true}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();

        assert_eq!(envelope.headers, Headers::new("mode", "save"));
        assert_eq!(envelope.payload, Value::Bool(true));
    }

    #[test]
    fn envelope_rejects_missing_headers() {
        let json = r#"{"payload":{"domain":"example.com"}}"#;
        assert!(serde_json::from_str::<Envelope>(json).is_err());
    }
}
