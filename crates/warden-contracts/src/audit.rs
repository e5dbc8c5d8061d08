//! Audit entry, event type, and query filter types.
//!
//! `AuditEntry` is the unit of the tamper-evident log.  Entries are created
//! only by the audit log's `append` and are never modified afterwards; the
//! types here carry no chain logic of their own.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The sentinel `prev_hash` of the first entry in every chain.
///
/// 64 hex zeros, the width of a hex-encoded SHA-256 digest.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Everything the runtime records in the audit log.
///
/// The set is closed: adding a variant is a format change because the
/// stable name returned by [`EventType::as_str`] is part of each entry's
/// canonical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A message was mapped to an agent and session.
    RouteResolved,
    /// A tool call passed authorization.
    ToolAuthorized,
    /// A tool call was denied.
    ToolDenied,
    /// An authorized tool call ran (successfully or not).
    ToolExecuted,
    LlmCallStarted,
    LlmCallCompleted,
    SessionCreated,
    MessageProcessed,
    /// Usage/cost metering reported by an upstream gateway.
    MeteringEvent,
    /// A decision returned by an external policy decision point.
    ExternalPolicyDecision,
}

impl EventType {
    /// Every variant, in declaration order.
    pub const ALL: [EventType; 10] = [
        EventType::RouteResolved,
        EventType::ToolAuthorized,
        EventType::ToolDenied,
        EventType::ToolExecuted,
        EventType::LlmCallStarted,
        EventType::LlmCallCompleted,
        EventType::SessionCreated,
        EventType::MessageProcessed,
        EventType::MeteringEvent,
        EventType::ExternalPolicyDecision,
    ];

    /// Events only the dispatcher records, as part of handling a tool call.
    ///
    /// External callers may not append these.
    pub fn is_dispatcher_owned(&self) -> bool {
        matches!(
            self,
            EventType::RouteResolved
                | EventType::ToolAuthorized
                | EventType::ToolDenied
                | EventType::ToolExecuted
        )
    }

    /// Stable name used in the canonical encoding and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::RouteResolved => "route_resolved",
            EventType::ToolAuthorized => "tool_authorized",
            EventType::ToolDenied => "tool_denied",
            EventType::ToolExecuted => "tool_executed",
            EventType::LlmCallStarted => "llm_call_started",
            EventType::LlmCallCompleted => "llm_call_completed",
            EventType::SessionCreated => "session_created",
            EventType::MessageProcessed => "message_processed",
            EventType::MeteringEvent => "metering_event",
            EventType::ExternalPolicyDecision => "external_policy_decision",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single committed entry in the hash chain.
///
/// `hash` commits to every other field, including `prev_hash`, so editing
/// any field of any entry is detectable by recomputing the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the chain, starting at 0, without gaps.
    pub sequence: u64,

    /// Wall-clock commit time (UTC).  Never earlier than the previous entry's.
    pub timestamp: DateTime<Utc>,

    pub event_type: EventType,

    /// Free-form description.  Opaque to the core.
    pub event_detail: String,

    pub agent_id: String,
    pub session_key: String,
    pub request_id: String,

    /// Hash of the preceding entry, or [`GENESIS_HASH`] for sequence 0.
    pub prev_hash: String,

    /// SHA-256 (lowercase hex) of this entry's canonical encoding.
    pub hash: String,
}

/// Selection criteria for reading the audit log.
///
/// Every populated field must match; an empty filter selects everything.
/// `since` is inclusive and `until` is exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Return true if `entry` satisfies every populated criterion.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(agent_id) = &self.agent_id {
            if &entry.agent_id != agent_id {
                return false;
            }
        }
        if let Some(session_key) = &self.session_key {
            if &entry.session_key != session_key {
                return false;
            }
        }
        if let Some(event_type) = self.event_type {
            if entry.event_type != event_type {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp >= until {
                return false;
            }
        }
        true
    }
}
