//! The WARDEN dispatcher: the per-request trust pipeline.
//!
//! The dispatcher enforces the request flow:
//!
//!   Route → Audit(route_resolved) → Authorize → Audit(tool_authorized |
//!   tool_denied) → [ToolRunner::run] → Audit(tool_executed)
//!
//! `ToolRunner::run()` is only reachable after the authorizer returned an
//! authorized decision and that decision was committed to the audit log.

use std::sync::Arc;

use tracing::{debug, info, warn};

use warden_contracts::{
    audit::EventType,
    dispatch::{new_request_id, ToolCallOutcome, ToolCallRequest},
    error::WardenResult,
};

use crate::traits::{AuditTrail, GrantStore, Router, ToolAuthorizer, ToolRunner};

/// Drives tool-call requests through routing, authorization, and audit.
///
/// The dispatcher owns the trusted components and is shared by every
/// request; all of its state lives behind the trait objects.
pub struct Dispatcher {
    router: Box<dyn Router>,
    authorizer: Box<dyn ToolAuthorizer>,
    grants: Arc<dyn GrantStore>,
    audit: Arc<dyn AuditTrail>,
    runner: Box<dyn ToolRunner>,
}

impl Dispatcher {
    pub fn new(
        router: Box<dyn Router>,
        authorizer: Box<dyn ToolAuthorizer>,
        grants: Arc<dyn GrantStore>,
        audit: Arc<dyn AuditTrail>,
        runner: Box<dyn ToolRunner>,
    ) -> Self {
        Self {
            router,
            authorizer,
            grants,
            audit,
            runner,
        }
    }

    /// The audit log every request is recorded in.
    pub fn audit(&self) -> &Arc<dyn AuditTrail> {
        &self.audit
    }

    /// Handle one tool-call request.
    ///
    /// # Pipeline
    ///
    /// 1. Resolve the route; `UnresolvedRoute` is returned without auditing
    ///    because there is no agent to attribute the entry to.
    /// 2. Append `route_resolved`.
    /// 3. Authorize the tool for the resolved agent.
    ///    - denied → append `tool_denied`, return `ToolCallOutcome::Denied`
    /// 4. Append `tool_authorized`.
    /// 5. Run the tool.  The result, success or failure, is recorded as
    ///    `tool_executed` before it is returned.
    ///
    /// # Errors
    ///
    /// `UnresolvedRoute`, `PersistenceFailure` from any append, and
    /// `ToolFailed` from the runner.  A denial is NOT an error.
    pub fn handle(&self, request: ToolCallRequest) -> WardenResult<ToolCallOutcome> {
        let request_id = request
            .request_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(new_request_id);
        let tool_name = request.tool_name;

        debug!(
            request_id = %request_id,
            channel = %request.context.channel,
            tool = %tool_name,
            "dispatching tool call"
        );

        // ── Step 1: Route ────────────────────────────────────────────────────
        let route = match self.router.resolve(&request.context) {
            Ok(route) => route,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "route resolution failed");
                return Err(e);
            }
        };

        // ── Step 2: Audit the route ──────────────────────────────────────────
        self.audit.append(
            EventType::RouteResolved,
            &format!(
                "matched_by={} channel={}",
                route.matched_by, route.channel
            ),
            &route.agent_id,
            &route.session_key,
            &request_id,
        )?;

        // ── Step 3: Authorize ────────────────────────────────────────────────
        let decision = self
            .authorizer
            .authorize(&tool_name, &route.agent_id, self.grants.as_ref());

        if let Some(reason) = decision.reason() {
            warn!(
                request_id = %request_id,
                agent_id = %route.agent_id,
                tool = %tool_name,
                reason = %reason,
                "tool call denied"
            );
            self.audit.append(
                EventType::ToolDenied,
                &format!("tool={} reason={}", tool_name, reason),
                &route.agent_id,
                &route.session_key,
                &request_id,
            )?;
            return Ok(ToolCallOutcome::Denied {
                request_id,
                route,
                reason,
            });
        }

        // ── Step 4: Audit the authorization ──────────────────────────────────
        //
        // The runner is only reachable once this entry is committed.
        self.audit.append(
            EventType::ToolAuthorized,
            &format!("tool={}", tool_name),
            &route.agent_id,
            &route.session_key,
            &request_id,
        )?;

        // ── Step 5: Run and audit the execution ──────────────────────────────
        match self.runner.run(&tool_name, &request.arguments, &route) {
            Ok(output) => {
                self.audit.append(
                    EventType::ToolExecuted,
                    &format!("tool={} status=ok", tool_name),
                    &route.agent_id,
                    &route.session_key,
                    &request_id,
                )?;
                info!(
                    request_id = %request_id,
                    agent_id = %route.agent_id,
                    tool = %tool_name,
                    "tool executed"
                );
                Ok(ToolCallOutcome::Executed {
                    request_id,
                    route,
                    output,
                })
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    tool = %tool_name,
                    error = %e,
                    "tool execution failed"
                );
                self.audit.append(
                    EventType::ToolExecuted,
                    &format!("tool={} status=failed error={}", tool_name, e),
                    &route.agent_id,
                    &route.session_key,
                    &request_id,
                )?;
                Err(e)
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use warden_contracts::{
        audit::{AuditFilter, EventType},
        authz::{AuthDecision, DenyReason},
        dispatch::{ToolCallOutcome, ToolCallRequest},
        error::WardenError,
        routing::RouteContext,
    };

    use crate::{
        mocks::{MockAudit, MockAuthorizer, MockRouter, MockRunner, NoGrants},
        traits::AuditTrail,
    };

    use super::Dispatcher;

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn dispatcher(
        agent: Option<&str>,
        decision: AuthDecision,
        audit: Arc<MockAudit>,
        runner: MockRunner,
    ) -> Dispatcher {
        Dispatcher::new(
            Box::new(MockRouter {
                agent: agent.map(str::to_string),
            }),
            Box::new(MockAuthorizer { decision }),
            Arc::new(NoGrants),
            audit,
            Box::new(runner),
        )
    }

    fn request(tool: &str) -> ToolCallRequest {
        ToolCallRequest {
            request_id: Some("req-42".to_string()),
            context: RouteContext::for_channel("cli"),
            tool_name: tool.to_string(),
            arguments: json!({ "q": "rust" }),
        }
    }

    // ── Test cases ───────────────────────────────────────────────────────────

    /// Core security test: a denial must prevent the runner from being called.
    #[test]
    fn test_denial_blocks_runner() {
        let runner = MockRunner::new();
        let calls = runner.calls.clone();
        let audit = Arc::new(MockAudit::new());

        let d = dispatcher(
            Some("agent-a"),
            AuthDecision::deny(DenyReason::NoGrant),
            audit.clone(),
            runner,
        );
        let outcome = d.handle(request("exec_command")).unwrap();

        assert_eq!(*calls.lock().unwrap(), 0, "runner must not be called on denial");
        match outcome {
            ToolCallOutcome::Denied { reason, route, .. } => {
                assert_eq!(reason, DenyReason::NoGrant);
                assert_eq!(route.agent_id, "agent-a");
            }
            other => panic!("expected Denied, got {:?}", other),
        }
        assert_eq!(audit.events(), vec![EventType::RouteResolved, EventType::ToolDenied]);
    }

    /// An authorized call runs the tool and leaves three entries in order.
    #[test]
    fn test_authorized_call_is_fully_audited() {
        let runner = MockRunner::new();
        let calls = runner.calls.clone();
        let audit = Arc::new(MockAudit::new());

        let d = dispatcher(Some("agent-a"), AuthDecision::allow(), audit.clone(), runner);
        let outcome = d.handle(request("web_search")).unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
        match &outcome {
            ToolCallOutcome::Executed { output, request_id, .. } => {
                assert_eq!(output["tool"], "web_search");
                assert_eq!(request_id, "req-42");
            }
            other => panic!("expected Executed, got {:?}", other),
        }
        assert_eq!(
            audit.events(),
            vec![
                EventType::RouteResolved,
                EventType::ToolAuthorized,
                EventType::ToolExecuted
            ]
        );

        // Every entry carries the same correlation id and session.
        let entries = audit.entries(&AuditFilter::default());
        assert!(entries.iter().all(|e| e.request_id == "req-42"));
        assert!(entries.iter().all(|e| e.session_key == "agent:agent-a:channel:cli"));
    }

    /// An unresolved route is returned as an error and nothing is audited.
    #[test]
    fn test_unresolved_route_is_not_fabricated() {
        let audit = Arc::new(MockAudit::new());
        let d = dispatcher(None, AuthDecision::allow(), audit.clone(), MockRunner::new());

        match d.handle(request("web_search")) {
            Err(WardenError::UnresolvedRoute { channel }) => assert_eq!(channel, "cli"),
            other => panic!("expected UnresolvedRoute, got {:?}", other),
        }
        assert!(audit.is_empty());
    }

    /// A persistence failure on the authorization entry stops the pipeline
    /// before the tool runs.
    #[test]
    fn test_persistence_failure_blocks_runner() {
        let runner = MockRunner::new();
        let calls = runner.calls.clone();
        let audit = Arc::new(MockAudit::failing_after(1));

        let d = dispatcher(Some("agent-a"), AuthDecision::allow(), audit.clone(), runner);
        let result = d.handle(request("web_search"));

        assert!(matches!(result, Err(WardenError::PersistenceFailure { .. })));
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(audit.events(), vec![EventType::RouteResolved]);
    }

    /// A failing tool is still recorded as executed, with the failure.
    #[test]
    fn test_tool_failure_is_audited() {
        let mut runner = MockRunner::new();
        runner.fail = true;
        let audit = Arc::new(MockAudit::new());

        let d = dispatcher(Some("agent-a"), AuthDecision::allow(), audit.clone(), runner);
        let result = d.handle(request("exec_command"));

        assert!(matches!(result, Err(WardenError::ToolFailed { .. })));
        let last = audit.entries(&AuditFilter::default()).pop().unwrap();
        assert_eq!(last.event_type, EventType::ToolExecuted);
        assert!(last.event_detail.contains("status=failed"));
    }

    /// A missing request id is replaced by a generated one.
    #[test]
    fn test_missing_request_id_is_generated() {
        let audit = Arc::new(MockAudit::new());
        let d = dispatcher(Some("agent-a"), AuthDecision::allow(), audit.clone(), MockRunner::new());

        let mut req = request("web_search");
        req.request_id = None;
        let outcome = d.handle(req).unwrap();

        assert!(!outcome.request_id().is_empty());
        let entries = audit.entries(&AuditFilter::default());
        assert!(entries.iter().all(|e| e.request_id == outcome.request_id()));
    }
}
