//! Dispatcher Actions
//!
//! Updates flowing down a chain are plain JSON values. A common convention
//! is to send `{ "type": ..., "payload": ... }` actions and let each layer's
//! setter handle the action types it owns, aborting the cascade for those
//! and forwarding everything else.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reactive::AtomError;

/// A typed `{ type, payload }` update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherAction<P = Value> {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<P>,
}

impl<P> DispatcherAction<P> {
    /// An action without payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
        }
    }

    pub fn with_payload(kind: impl Into<String>, payload: P) -> Self {
        Self {
            kind: kind.into(),
            payload: Some(payload),
        }
    }

    /// Check the action type.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl<P: Serialize> DispatcherAction<P> {
    /// Encode as an update value.
    pub fn to_update(&self) -> Result<Value, AtomError> {
        Ok(serde_json::to_value(self)?)
    }
}

impl<P: DeserializeOwned> DispatcherAction<P> {
    /// Decode an update value.
    pub fn from_update(update: &Value) -> Result<Self, AtomError> {
        Ok(Self::deserialize(update)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct AddItem {
        name: String,
        quantity: u32,
    }

    #[test]
    fn encodes_type_and_payload() {
        let action = DispatcherAction::with_payload(
            "cart/add",
            AddItem {
                name: "tea".into(),
                quantity: 2,
            },
        );
        assert_eq!(
            action.to_update().unwrap(),
            json!({"type": "cart/add", "payload": {"name": "tea", "quantity": 2}})
        );
    }

    #[test]
    fn payload_is_optional() {
        let update = json!({"type": "cart/clear"});
        let action = DispatcherAction::<Value>::from_update(&update).unwrap();
        assert!(action.is("cart/clear"));
        assert!(action.payload.is_none());
        assert_eq!(action.to_update().unwrap(), update);
    }

    #[test]
    fn typed_payload_decodes() {
        let update = json!({"type": "cart/add", "payload": {"name": "tea", "quantity": 1}});
        let action = DispatcherAction::<AddItem>::from_update(&update).unwrap();
        assert_eq!(action.payload.unwrap().quantity, 1);
    }

    #[test]
    fn typed_payload_may_be_missing() {
        let update = json!({"type": "cart/add"});
        let action = DispatcherAction::<AddItem>::from_update(&update).unwrap();
        assert!(action.is("cart/add"));
        assert!(action.payload.is_none());
    }

    #[test]
    fn non_actions_are_errors() {
        let err = DispatcherAction::<Value>::from_update(&json!({"n": 1})).unwrap_err();
        assert!(matches!(err, AtomError::Action(_)));
    }
}
