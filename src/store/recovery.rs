//! Fallback-chain document loading.
//!
//! Loading never fails: a missing primary falls through silently, a
//! corrupted primary falls back to the backup copy, an incomplete document
//! is repaired or replaced by the caller-supplied default. Callers (a
//! dashboard, a control loop) must keep functioning on stale or default
//! data rather than erroring out, so every read-path failure terminates
//! here, visible only in logs.

use crate::schema::Schema;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, warn};

/// Read and parse one candidate file.
///
/// `None` for both "does not exist" (silent) and "exists but unreadable or
/// unparsable" (logged at error severity). The two are distinguished only
/// in logs; both continue the fallback chain.
fn read_candidate(path: &Path) -> Option<Value> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return None,
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to read document");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to parse document");
            None
        }
    }
}

/// Apply the schema's required-key contract to an already-loaded value.
///
/// Returns the value as-is when complete, the repaired value when the
/// repair policy fills every gap, and `default` otherwise. A document with
/// missing required keys is never returned as-is.
pub(crate) fn apply_schema(value: Value, schema: &Schema, default: Value) -> Value {
    let missing = schema.missing_keys(&value);
    if missing.is_empty() {
        return value;
    }

    if !schema.has_repair() {
        warn!(?missing, "document incomplete and no repair policy; using default");
        return default;
    }

    // Repair only makes sense on an object; anything else can't keep the
    // caller's existing keys anyway.
    let map = match value {
        Value::Object(map) => map,
        _ => {
            warn!("document is not an object; using default");
            return default;
        }
    };

    let repaired = Value::Object(schema.repair(map));
    let still_missing = schema.missing_keys(&repaired);
    if still_missing.is_empty() {
        warn!(filled = ?missing, "document repaired with default values");
        repaired
    } else {
        warn!(?still_missing, "repair left document incomplete; using default");
        default
    }
}

/// Load the document at `path`, falling back to `backup`, then `default`.
///
/// Never fails. See the module doc for the policy.
pub fn load_with_fallback(
    path: &Path,
    default: Value,
    schema: &Schema,
    backup: Option<&Path>,
) -> Value {
    let mut value = read_candidate(path);

    if value.is_none() {
        if let Some(backup_path) = backup {
            if backup_path != path && backup_path.exists() {
                warn!(
                    path = %path.display(),
                    backup = %backup_path.display(),
                    "primary unavailable; reading backup"
                );
                value = read_candidate(backup_path);
            }
        }
    }

    match value {
        Some(value) => apply_schema(value, schema, default),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn default_doc() -> Value {
        json!({ "status": "stopped", "balance": 0.0 })
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");

        let loaded = load_with_fallback(&path, default_doc(), &Schema::empty(), None);
        assert_eq!(loaded, default_doc());
    }

    #[test]
    fn test_corrupt_primary_falls_back_to_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let backup = dir.path().join("state.json.backup");

        fs::write(&path, "{ not json !!").unwrap();
        fs::write(&backup, r#"{"status": "running"}"#).unwrap();

        let loaded = load_with_fallback(&path, default_doc(), &Schema::empty(), Some(&backup));
        assert_eq!(loaded, json!({ "status": "running" }));
    }

    #[test]
    fn test_corrupt_primary_and_backup_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let backup = dir.path().join("state.json.backup");

        fs::write(&path, "nope").unwrap();
        fs::write(&backup, "also nope").unwrap();

        let loaded = load_with_fallback(&path, default_doc(), &Schema::empty(), Some(&backup));
        assert_eq!(loaded, default_doc());
    }

    #[test]
    fn test_backup_identical_to_primary_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "corrupt").unwrap();

        let loaded = load_with_fallback(&path, default_doc(), &Schema::empty(), Some(&path));
        assert_eq!(loaded, default_doc());
    }

    #[test]
    fn test_incomplete_without_repair_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"balance": 5.0}"#).unwrap();

        let schema = Schema::new(["status", "balance"]);
        let loaded = load_with_fallback(&path, default_doc(), &schema, None);
        assert_eq!(loaded, default_doc());
    }

    #[test]
    fn test_repair_fills_missing_and_keeps_present_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"balance": 5.0, "note": "kept"}"#).unwrap();

        let schema = Schema::new(["status", "balance"]).with_repair(|mut map| {
            map.entry("status").or_insert(json!("stopped"));
            map
        });

        let loaded = load_with_fallback(&path, default_doc(), &schema, None);
        assert_eq!(
            loaded,
            json!({ "balance": 5.0, "note": "kept", "status": "stopped" })
        );
    }

    #[test]
    fn test_insufficient_repair_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{}").unwrap();

        // Repairs status but not balance.
        let schema = Schema::new(["status", "balance"]).with_repair(|mut map| {
            map.entry("status").or_insert(json!("stopped"));
            map
        });

        let loaded = load_with_fallback(&path, default_doc(), &schema, None);
        assert_eq!(loaded, default_doc());
    }

    #[test]
    fn test_complete_document_returned_as_is() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"status": "running", "balance": 1.0, "extra": true}"#).unwrap();

        let schema = Schema::new(["status", "balance"]);
        let loaded = load_with_fallback(&path, default_doc(), &schema, None);
        assert_eq!(
            loaded,
            json!({ "status": "running", "balance": 1.0, "extra": true })
        );
    }

    #[test]
    fn test_non_object_with_required_keys_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let schema = Schema::new(["status"]);
        let loaded = load_with_fallback(&path, default_doc(), &schema, None);
        assert_eq!(loaded, default_doc());
    }
}
