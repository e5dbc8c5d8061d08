//! Test doubles for the trait seams, shared by the dispatcher and runtime
//! tests.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{json, Value};

use warden_contracts::{
    audit::{AuditEntry, AuditFilter, EventType, GENESIS_HASH},
    authz::{AuthDecision, Grant},
    error::{WardenError, WardenResult},
    routing::{MatchReason, ResolvedRoute, RouteContext},
};

use crate::traits::{AuditTrail, GrantStore, Router, ToolAuthorizer, ToolRunner};

/// Routes everything to one agent, or fails when `agent` is None.
pub(crate) struct MockRouter {
    pub(crate) agent: Option<String>,
}

impl Router for MockRouter {
    fn resolve(&self, ctx: &RouteContext) -> WardenResult<ResolvedRoute> {
        let agent = self.agent.clone().ok_or_else(|| WardenError::UnresolvedRoute {
            channel: ctx.channel.clone(),
        })?;
        let key = format!("agent:{}:channel:{}", agent, ctx.channel);
        Ok(ResolvedRoute {
            agent_id: agent,
            channel: ctx.channel.clone(),
            account_id: None,
            session_key: key.clone(),
            main_session_key: key,
            matched_by: MatchReason::Default,
        })
    }
}

/// Returns a fixed decision for every tool.
pub(crate) struct MockAuthorizer {
    pub(crate) decision: AuthDecision,
}

impl ToolAuthorizer for MockAuthorizer {
    fn authorize(&self, _tool: &str, _agent: &str, _grants: &dyn GrantStore) -> AuthDecision {
        self.decision
    }
}

pub(crate) struct NoGrants;

impl GrantStore for NoGrants {
    fn lookup(&self, _agent_id: &str, _tool_name: &str) -> WardenResult<Option<Grant>> {
        Ok(None)
    }
}

/// Records every append without hashing.
///
/// Appends fail once `fail_after` entries exist; `verify_detailed` reports
/// a violation when `broken` is set.
pub(crate) struct MockAudit {
    entries: Mutex<Vec<AuditEntry>>,
    fail_after: Option<usize>,
    pub(crate) broken: bool,
}

impl MockAudit {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(vec![]),
            fail_after: None,
            broken: false,
        }
    }

    pub(crate) fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::new()
        }
    }

    pub(crate) fn events(&self) -> Vec<EventType> {
        self.entries.lock().unwrap().iter().map(|e| e.event_type).collect()
    }
}

impl AuditTrail for MockAudit {
    fn append(
        &self,
        event_type: EventType,
        detail: &str,
        agent_id: &str,
        session_key: &str,
        request_id: &str,
    ) -> WardenResult<AuditEntry> {
        let mut entries = self.entries.lock().unwrap();
        if self.fail_after.is_some_and(|n| entries.len() >= n) {
            return Err(WardenError::PersistenceFailure {
                reason: "disk full".to_string(),
            });
        }
        let entry = AuditEntry {
            sequence: entries.len() as u64,
            timestamp: Utc::now(),
            event_type,
            event_detail: detail.to_string(),
            agent_id: agent_id.to_string(),
            session_key: session_key.to_string(),
            request_id: request_id.to_string(),
            prev_hash: GENESIS_HASH.to_string(),
            hash: format!("{:064x}", entries.len() + 1),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    fn verify_detailed(&self) -> WardenResult<()> {
        if self.broken {
            return Err(WardenError::IntegrityViolation {
                sequence: 0,
                reason: "hash mismatch".to_string(),
            });
        }
        Ok(())
    }

    fn entries(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn head_hash(&self) -> String {
        self.entries
            .lock()
            .unwrap()
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string())
    }
}

/// Counts calls; fails when `fail` is set.
pub(crate) struct MockRunner {
    pub(crate) calls: Arc<Mutex<u32>>,
    pub(crate) fail: bool,
}

impl MockRunner {
    pub(crate) fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(0)),
            fail: false,
        }
    }
}

impl ToolRunner for MockRunner {
    fn run(&self, tool_name: &str, arguments: &Value, _route: &ResolvedRoute) -> WardenResult<Value> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(WardenError::ToolFailed {
                tool: tool_name.to_string(),
                reason: "exit status 1".to_string(),
            });
        }
        Ok(json!({ "tool": tool_name, "echo": arguments }))
    }
}
