//! # warden-routing
//!
//! Fixed-precedence route resolution for the WARDEN trust core.
//!
//! ## Overview
//!
//! [`RouteResolver`] implements the [`Router`](warden_core::traits::Router)
//! trait over a TOML-loaded [`RuleTable`].  Each inbound message context is
//! mapped to exactly one agent and session.  Tiers are tried in a fixed
//! order and the first exact-key match wins:
//!
//! peer > parent-peer > guild > team > account > channel-wildcard > default
//!
//! Keyed rules may be scoped to one channel (`[peer.telegram]`); a scoped
//! rule never fires on another channel.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use warden_routing::RouteResolver;
//!
//! let resolver = RouteResolver::from_toml_str(r#"
//!     default_agent = "main"
//!     [peer]
//!     "user-42" = "assistant"
//! "#)?;
//! ```

pub mod resolver;
pub mod rule;

pub use resolver::{resolve, session_keys, RouteResolver};
pub use rule::{RuleEntry, RuleTable, TierRules};

// ── Tests ─────────────────────────────────────────────────────────────────────
