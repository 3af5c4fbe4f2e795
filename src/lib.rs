//! # statefile
//!
//! Crash-safe persistence for small JSON state documents — process status,
//! position lists, counters — with three guarantees:
//!
//! 1. **Atomicity**: a reader never observes a partially-written file. Every
//!    write stages to a temp sibling, fsyncs, and atomically renames.
//! 2. **Recovery**: a corrupted or missing primary falls back to a
//!    one-generation backup copy, then to a repair policy for missing
//!    required keys, then to a caller-supplied default. Loading never fails.
//! 3. **Coordination**: readers and writers — including separate processes —
//!    coordinate through advisory locks on a companion lock file, with
//!    bounded wait and a logged unlocked fallback on timeout.
//!
//! ```no_run
//! use serde_json::json;
//! use statefile::{DocumentStore, FileStore, Schema};
//!
//! let store = FileStore::new("state/bot.json").with_schema(
//!     Schema::new(["status", "balance", "positions"]).with_repair(|mut map| {
//!         map.entry("status").or_insert(json!("stopped"));
//!         map.entry("balance").or_insert(json!(0.0));
//!         map.entry("positions").or_insert(json!([]));
//!         map
//!     }),
//! );
//!
//! store.save(&json!({ "status": "running", "balance": 10.0, "positions": [] }))?;
//! let state = store.load(json!({ "status": "stopped", "balance": 0.0, "positions": [] }));
//! # Ok::<(), statefile::StoreError>(())
//! ```
//!
//! This is a single-document store: one independent JSON value per path,
//! no cross-document transactions, no replication, no queries.
//!
//! ## Module Overview
//!
//! - [`store`]: the [`DocumentStore`] trait, [`FileStore`], [`MemoryStore`],
//!   and the atomic/recovery/locking internals
//! - [`schema`]: required-key sets and injectable repair policies
//! - [`error`]: error types (only write-path failures ever surface)
//!
//! Logging goes through [`tracing`]; the crate installs no subscriber.

pub mod error;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use schema::{RepairFn, Schema};
pub use store::fs::FileStore;
pub use store::memory::MemoryStore;
pub use store::DocumentStore;
