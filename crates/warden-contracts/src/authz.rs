//! Tool authorization types.
//!
//! WARDEN is deny-by-default: a tool with no configured `AuthLevel` is
//! treated as `AlwaysDenied`, and a denial is an ordinary `AuthDecision`,
//! never an error.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a tool is gated.
///
/// Expressed in TOML as kebab-case strings:
/// ```toml
/// [tools]
/// web_search = "always-allowed"
/// exec_command = "requires-grant"
/// delete_file = "always-denied"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthLevel {
    AlwaysAllowed,
    RequiresGrant,
    AlwaysDenied,
}

/// Why a tool call was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenyReason {
    /// The tool is configured `always-denied`.
    AlwaysDenied,
    /// The tool has no configured level and falls back to always-denied.
    UnknownTool,
    /// The tool requires a grant and the agent holds none.
    NoGrant,
    /// The agent's grant has passed its `expires_at`.
    GrantExpired,
    /// The agent's grant starts in the future.
    GrantNotYetValid,
    /// The grant store could not be read; the call fails closed.
    GrantStoreUnavailable,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::AlwaysDenied => "tool is always denied",
            DenyReason::UnknownTool => "tool is not configured and is always denied",
            DenyReason::NoGrant => "no grant for agent and tool",
            DenyReason::GrantExpired => "grant expired",
            DenyReason::GrantNotYetValid => "grant not yet valid",
            DenyReason::GrantStoreUnavailable => "grant store unavailable",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one authorization check.
///
/// `reason` is present if and only if the call was denied; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthDecision {
    authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<DenyReason>,
}

impl AuthDecision {
    pub fn allow() -> Self {
        Self {
            authorized: true,
            reason: None,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            authorized: false,
            reason: Some(reason),
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// The denial reason, `None` when authorized.
    pub fn reason(&self) -> Option<DenyReason> {
        self.reason
    }
}

/// A time-bounded permission for one agent to invoke one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub agent_id: String,
    pub tool_name: String,

    /// First instant the grant is usable (inclusive).
    pub valid_from: DateTime<Utc>,

    /// Instant the grant stops being usable (exclusive).  `None` never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Where `now` falls relative to a grant's validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantStatus {
    Active,
    NotYetValid,
    Expired,
}

impl Grant {
    pub fn status_at(&self, now: DateTime<Utc>) -> GrantStatus {
        if now < self.valid_from {
            return GrantStatus::NotYetValid;
        }
        match self.expires_at {
            Some(expires_at) if now >= expires_at => GrantStatus::Expired,
            _ => GrantStatus::Active,
        }
    }
}
