use super::recovery::apply_schema;
use super::DocumentStore;
use crate::error::Result;
use crate::schema::Schema;
use serde_json::Value;
use std::sync::{PoisonError, RwLock};

/// In-memory [`DocumentStore`] for testing consumers without a filesystem.
///
/// Applies the same schema semantics as [`FileStore`](super::fs::FileStore)
/// so consumer tests exercise the repair-or-default policy, but nothing is
/// persisted and there is no locking or backup.
#[derive(Default)]
pub struct MemoryStore {
    value: RwLock<Option<Value>>,
    schema: Schema,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Pre-seed the stored value, e.g. to simulate a prior run.
    pub fn with_value(self, value: Value) -> Self {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
        self
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, default: Value) -> Value {
        let stored = self
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match stored {
            Some(value) => apply_schema(value, &self.schema, default),
            None => default,
        }
    }

    fn save(&self, value: &Value) -> Result<()> {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_round_trip() {
        let store = MemoryStore::new();
        store.save(&json!({ "n": 1 })).unwrap();
        assert_eq!(store.load(json!({})), json!({ "n": 1 }));
    }

    #[test]
    fn test_memory_applies_schema() {
        let store = MemoryStore::new()
            .with_schema(Schema::new(["status"]))
            .with_value(json!({ "balance": 3.0 }));

        let default = json!({ "status": "stopped" });
        assert_eq!(store.load(default.clone()), default);
    }

    #[test]
    fn test_memory_empty_returns_default() {
        let store = MemoryStore::new();
        assert_eq!(store.load(json!(null)), json!(null));
    }
}
