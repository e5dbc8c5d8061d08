//! Tool authorization engine.
//!
//! `ToolAuthorizationEngine` holds an immutable `ToolPolicy` and implements
//! the `ToolAuthorizer` trait from warden-core.
//!
//! Evaluation algorithm:
//!
//! 1. Look up the tool's `AuthLevel`.  No level → deny (`UnknownTool`).
//! 2. `always-allowed` → allow.  `always-denied` → deny (`AlwaysDenied`).
//! 3. `requires-grant` → look up the (agent, tool) grant:
//!    a. store error → deny (`GrantStoreUnavailable`)
//!    b. no grant    → deny (`NoGrant`)
//!    c. grant outside its window → deny (`GrantNotYetValid` / `GrantExpired`)
//!    d. otherwise   → allow

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use warden_contracts::{
    authz::{AuthDecision, AuthLevel, DenyReason, GrantStatus},
    error::WardenResult,
};
use warden_core::traits::{GrantStore, ToolAuthorizer};

use crate::rule::ToolPolicy;

/// A `ToolAuthorizer` driven by a TOML tool policy.
///
/// ```rust,ignore
/// use warden_policy::ToolAuthorizationEngine;
///
/// let engine = ToolAuthorizationEngine::from_file(Path::new("tools.toml"))?;
/// let decision = engine.authorize("exec_command", "agent-a", &grants);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ToolAuthorizationEngine {
    policy: ToolPolicy,
}

impl ToolAuthorizationEngine {
    pub fn new(policy: ToolPolicy) -> Self {
        Self { policy }
    }

    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        ToolPolicy::from_toml_str(s).map(Self::new)
    }

    pub fn from_file(path: &Path) -> WardenResult<Self> {
        ToolPolicy::from_file(path).map(Self::new)
    }

    pub fn policy(&self) -> &ToolPolicy {
        &self.policy
    }

    /// Authorize against an explicit clock.
    ///
    /// Reads `grants` at most once and never writes to it.
    pub fn authorize_at(
        &self,
        tool_name: &str,
        agent_id: &str,
        grants: &dyn GrantStore,
        now: DateTime<Utc>,
    ) -> AuthDecision {
        let decision = match self.policy.level(tool_name) {
            None => AuthDecision::deny(DenyReason::UnknownTool),
            Some(AuthLevel::AlwaysAllowed) => AuthDecision::allow(),
            Some(AuthLevel::AlwaysDenied) => AuthDecision::deny(DenyReason::AlwaysDenied),
            Some(AuthLevel::RequiresGrant) => check_grant(tool_name, agent_id, grants, now),
        };

        debug!(
            tool = %tool_name,
            agent_id = %agent_id,
            authorized = decision.is_authorized(),
            reason = ?decision.reason(),
            "tool authorization decided"
        );

        decision
    }
}

fn check_grant(
    tool_name: &str,
    agent_id: &str,
    grants: &dyn GrantStore,
    now: DateTime<Utc>,
) -> AuthDecision {
    let grant = match grants.lookup(agent_id, tool_name) {
        Ok(grant) => grant,
        Err(e) => {
            warn!(
                tool = %tool_name,
                agent_id = %agent_id,
                error = %e,
                "grant store lookup failed; denying"
            );
            return AuthDecision::deny(DenyReason::GrantStoreUnavailable);
        }
    };

    let Some(grant) = grant else {
        return AuthDecision::deny(DenyReason::NoGrant);
    };

    match grant.status_at(now) {
        GrantStatus::Active => AuthDecision::allow(),
        GrantStatus::NotYetValid => AuthDecision::deny(DenyReason::GrantNotYetValid),
        GrantStatus::Expired => AuthDecision::deny(DenyReason::GrantExpired),
    }
}

impl ToolAuthorizer for ToolAuthorizationEngine {
    fn authorize(&self, tool_name: &str, agent_id: &str, grants: &dyn GrantStore) -> AuthDecision {
        self.authorize_at(tool_name, agent_id, grants, Utc::now())
    }
}
