//! # warden-policy
//!
//! Deny-by-default tool authorization for the WARDEN trust core.
//!
//! ## Overview
//!
//! This crate provides [`ToolAuthorizationEngine`], which implements the
//! [`ToolAuthorizer`](warden_core::traits::ToolAuthorizer) trait.  Each tool
//! is assigned an `AuthLevel` in a TOML file; tools that are not listed are
//! denied.  Tools at `requires-grant` are allowed only while the agent holds
//! a grant whose validity window contains the current instant.
//!
//! Two grant stores are included: [`InMemoryGrantStore`] and the
//! read-through [`CachedGrantStore`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use warden_policy::{InMemoryGrantStore, ToolAuthorizationEngine};
//!
//! let engine = ToolAuthorizationEngine::from_toml_str(r#"
//!     [tools]
//!     web_search = "always-allowed"
//!     exec_command = "requires-grant"
//! "#)?;
//! let decision = engine.authorize("exec_command", "agent-a", &InMemoryGrantStore::new());
//! assert!(!decision.is_authorized());
//! ```

pub mod engine;
pub mod grants;
pub mod rule;

pub use engine::ToolAuthorizationEngine;
pub use grants::{check_grant, CachedGrantStore, InMemoryGrantStore, DEFAULT_CACHE_CAPACITY};
pub use rule::ToolPolicy;

// ── Tests ─────────────────────────────────────────────────────────────────────
