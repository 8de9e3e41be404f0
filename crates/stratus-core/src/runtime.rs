//! Runtime property bag
//!
//! The orchestrator persists one flat JSON map per node instance between
//! invocations. It is the only state that survives a retry, so every
//! lifecycle decision is reconstructed from it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider-assigned identifier of the managed resource
pub const EXTERNAL_RESOURCE_ID: &str = "aws_resource_id";
/// Secondary identity (ARN or equivalent)
pub const EXTERNAL_RESOURCE_ARN: &str = "aws_resource_arn";
/// SDK call arguments assembled for create/attach
pub const RESOURCE_CONFIG: &str = "resource_config";
/// Last describe response recorded when the resource became ready
pub const CREATE_RESPONSE: &str = "create_response";
/// Terminal marker: the node instance is gone
pub const DELETED: &str = "__deleted";
/// The create call of the current logical attempt has succeeded
pub const CREATE_CALLED: &str = "__create_called";
/// The delete call of the current logical attempt has been issued
pub const DELETE_CALLED: &str = "__delete_called";

/// Keys describing the physical resource, cleared once it is deleted
const IDENTITY_KEYS: &[&str] = &[
    EXTERNAL_RESOURCE_ID,
    EXTERNAL_RESOURCE_ARN,
    RESOURCE_CONFIG,
    CREATE_RESPONSE,
    CREATE_CALLED,
    DELETE_CALLED,
];

/// Flat key/value state attached to a node instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeProperties(serde_json::Map<String, Value>);

impl RuntimeProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of a key; empty strings count as absent
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.get_str(EXTERNAL_RESOURCE_ID)
    }

    pub fn set_resource_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        if let Some(existing) = self.resource_id() {
            if existing != id {
                tracing::warn!(
                    existing = existing,
                    replacement = id.as_str(),
                    "Overwriting recorded resource identity"
                );
            }
        }
        self.set(EXTERNAL_RESOURCE_ID, id);
    }

    pub fn arn(&self) -> Option<&str> {
        self.get_str(EXTERNAL_RESOURCE_ARN)
    }

    pub fn set_arn(&mut self, arn: impl Into<String>) {
        self.set(EXTERNAL_RESOURCE_ARN, arn.into());
    }

    /// Resource configuration stored by a previous attempt
    pub fn resource_config(&self) -> Option<&serde_json::Map<String, Value>> {
        self.0.get(RESOURCE_CONFIG).and_then(Value::as_object)
    }

    pub fn set_resource_config(&mut self, config: serde_json::Map<String, Value>) {
        self.set(RESOURCE_CONFIG, Value::Object(config));
    }

    pub fn clear_resource_config(&mut self) {
        self.set(RESOURCE_CONFIG, Value::Object(Default::default()));
    }

    pub fn is_deleted(&self) -> bool {
        self.0.get(DELETED).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Clear identity fields and set the terminal marker
    pub fn mark_deleted(&mut self) {
        for key in IDENTITY_KEYS {
            self.0.remove(*key);
        }
        self.set(DELETED, true);
    }

    pub fn into_inner(self) -> serde_json::Map<String, Value> {
        self.0
    }
}

impl From<serde_json::Map<String, Value>> for RuntimeProperties {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self(map)
    }
}
