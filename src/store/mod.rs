//! # Storage Layer
//!
//! One document = one JSON file at a stable path. This module provides the
//! [`DocumentStore`] trait and its two implementations, built from three
//! pieces composed outermost-in:
//!
//! 1. **Lock Coordinator** ([`lock`]): shared/exclusive advisory locks on a
//!    companion `.lock` file, with bounded wait and an unlocked fallback.
//! 2. **Recovery Loader** ([`recovery`]): primary → backup → default
//!    fallback chain plus repair-or-default schema enforcement. Reads never
//!    fail.
//! 3. **Atomic Writer** ([`atomic`]): staged temp file, fsync, one-generation
//!    backup rotation, atomic rename. The rename is the only point at which
//!    a document's value changes for readers.
//!
//! ## Philosophy
//!
//! - **Reads degrade, writes fail loudly.** A consumer (dashboard, control
//!   loop) must keep functioning on stale or default data, so every
//!   read-path failure ends in a valid returned value. A write failure
//!   means the new state did not land and the caller must know.
//! - **Availability over strict exclusion.** Lock acquisition that times
//!   out degrades to unlocked operation rather than hanging or erroring;
//!   the degradation is logged and counted, never silent.
//! - **Lock files carry no data.** Their content is never read; losing one
//!   can never corrupt a document.
//!
//! ## Storage Layout
//!
//! ```text
//! state/
//! ├── bot.json           # the document
//! ├── bot.json.backup    # value before the most recent successful write
//! └── bot.json.lock      # zero-content advisory lock target
//! ```
//!
//! ## Implementations
//!
//! - [`fs::FileStore`]: production store, one handle per (path, schema).
//! - [`memory::MemoryStore`]: for testing consumers without a filesystem.

use crate::error::Result;
use serde_json::Value;

pub mod atomic;
pub mod fs;
pub mod lock;
pub mod memory;
pub mod recovery;

/// Abstract interface for one persisted document.
///
/// `load` never fails: it resolves to the stored value, a repaired value,
/// or the caller-supplied default. `save` must surface failure, since a
/// failed save leaves the previous value authoritative.
pub trait DocumentStore {
    /// Load the document, falling back to `default` when it is missing,
    /// unreadable, or unrepairably incomplete.
    fn load(&self, default: Value) -> Value;

    /// Durably replace the document.
    fn save(&self, value: &Value) -> Result<()>;
}
