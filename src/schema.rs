//! Document schemas: a required-key set plus an optional repair policy.
//!
//! The store itself enforces no schema. Callers that need one attach a
//! [`Schema`] to their handle: a set of keys every returned document must
//! contain, and optionally a repair function that fills absent keys with
//! safe defaults instead of forcing the whole document back to the
//! caller-supplied fallback.
//!
//! A repair policy must be idempotent and must not remove keys it was not
//! asked to fill. It runs on the already-parsed document, so it never sees
//! I/O or parse failures — those are handled earlier in the recovery chain.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Fills missing required keys of a partially valid document.
///
/// Receives the document's object map and returns the repaired map. If
/// required keys are still missing afterwards, the loader discards the
/// result and returns the caller-supplied default instead.
pub type RepairFn = Box<dyn Fn(Map<String, Value>) -> Map<String, Value> + Send + Sync>;

/// Validation contract for one document kind.
pub struct Schema {
    required: BTreeSet<String>,
    repair: Option<RepairFn>,
}

impl Schema {
    /// Schema requiring the given keys, with no repair policy.
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            repair: None,
        }
    }

    /// Schema that accepts any document as-is.
    pub fn empty() -> Self {
        Self {
            required: BTreeSet::new(),
            repair: None,
        }
    }

    /// Attach a repair policy for documents missing required keys.
    pub fn with_repair<F>(mut self, repair: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.repair = Some(Box::new(repair));
        self
    }

    pub fn required_keys(&self) -> &BTreeSet<String> {
        &self.required
    }

    pub fn has_repair(&self) -> bool {
        self.repair.is_some()
    }

    /// Keys from the required set that `value` does not contain.
    ///
    /// A non-object value has no keys at all, so it is missing every
    /// required key.
    pub fn missing_keys(&self, value: &Value) -> Vec<String> {
        match value.as_object() {
            Some(map) => self
                .required
                .iter()
                .filter(|k| !map.contains_key(*k))
                .cloned()
                .collect(),
            None => self.required.iter().cloned().collect(),
        }
    }

    /// Run the repair policy over `map`, if one is attached.
    pub fn repair(&self, map: Map<String, Value>) -> Map<String, Value> {
        match &self.repair {
            Some(f) => f(map),
            None => map,
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("required", &self.required)
            .field("repair", &self.repair.is_some())
            .finish()
    }
}
