//! # warden-audit
//!
//! Append-only, SHA-256 hash-chained audit log for the WARDEN trust core.
//!
//! ## Overview
//!
//! Every event the runtime records becomes an `AuditEntry` that commits to
//! its predecessor's hash.  Editing any field of any entry breaks the chain
//! and is detected by `AuditLog::verify`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_audit::AuditLog;
//! use warden_contracts::audit::{AuditFilter, EventType};
//!
//! let log = AuditLog::in_memory();
//! log.append(EventType::RouteResolved, "matched_by=peer", "agent-a", "s1", "req-1")?;
//!
//! assert!(log.verify());
//! let denied = log.query(AuditFilter { event_type: Some(EventType::ToolDenied), ..Default::default() });
//! ```

pub mod chain;
pub mod log;
pub mod memory;
pub mod query;

pub use chain::{canonical_bytes, hash_entry, verify_chain, CANONICAL_VERSION};
pub use log::AuditLog;
pub use memory::InMemoryAuditStore;
pub use query::AuditQuery;

// ── Tests ─────────────────────────────────────────────────────────────────────
