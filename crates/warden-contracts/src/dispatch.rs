//! Per-request dispatch types.
//!
//! `ToolCallRequest` is what the orchestrator asks the core to do;
//! `ToolCallOutcome` is what it gets back.  A denied call is an outcome,
//! not an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{authz::DenyReason, routing::{ResolvedRoute, RouteContext}};

/// Generate a fresh request id (UUID v4, hyphenated).
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A request to run one tool on behalf of an inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation id written to every audit entry for this request.
    /// Generated by the dispatcher when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Identifying attributes of the message that triggered the call.
    pub context: RouteContext,

    pub tool_name: String,

    /// Tool arguments, passed through to the tool runner untouched.
    #[serde(default)]
    pub arguments: Value,
}

/// The result of dispatching a `ToolCallRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolCallOutcome {
    /// Authorized and run.  `output` is whatever the tool runner returned.
    Executed {
        request_id: String,
        route: ResolvedRoute,
        output: Value,
    },

    /// Authorization denied the call.  The tool was never run.
    Denied {
        request_id: String,
        route: ResolvedRoute,
        reason: DenyReason,
    },
}

impl ToolCallOutcome {
    pub fn request_id(&self) -> &str {
        match self {
            ToolCallOutcome::Executed { request_id, .. }
            | ToolCallOutcome::Denied { request_id, .. } => request_id,
        }
    }

    pub fn route(&self) -> &ResolvedRoute {
        match self {
            ToolCallOutcome::Executed { route, .. } | ToolCallOutcome::Denied { route, .. } => route,
        }
    }
}
