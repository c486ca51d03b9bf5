//! Events carried through the broker.

use serde::{Deserialize, Serialize};

/// Emitted by the backend after a successful signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupEvent {
    pub email: String,
    pub name: String,
}

impl SignupEvent {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }

    /// Decode a broker payload.
    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_producer_payload() {
        // the backend formats its payload with a space after the comma
        let event = SignupEvent::decode(r#"{"email":"a@x.com", "name":"A"}"#).unwrap();
        assert_eq!(event, SignupEvent::new("a@x.com", "A"));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let event = SignupEvent::decode(r#"{"email":"a@x.com","name":"A","phone":"1"}"#).unwrap();
        assert_eq!(event.name, "A");
    }

    #[test]
    fn missing_or_mistyped_fields_fail() {
        assert!(SignupEvent::decode(r#"{"email":"a@x.com"}"#).is_err());
        assert!(SignupEvent::decode(r#"{"email":1,"name":"A"}"#).is_err());
        assert!(SignupEvent::decode("not json").is_err());
        assert!(SignupEvent::decode("").is_err());
    }
}
