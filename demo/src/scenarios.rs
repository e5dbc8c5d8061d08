//! Demo scenarios.
//!
//! Each scenario drives the real components through the same JSON-RPC
//! surface `serve` exposes, using the bundled example configuration.

use std::sync::Arc;

use serde_json::{json, Value};

use warden_audit::{AuditLog, InMemoryAuditStore};
use warden_contracts::{
    audit::{AuditFilter, EventType},
    dispatch::ToolCallOutcome,
    error::{WardenError, WardenResult},
    rpc::{RpcRequest, RpcResponse},
};
use warden_core::Runtime;

use crate::config::WardenConfig;

/// Configuration used by every scenario.
pub const EXAMPLE_CONFIG: &str = include_str!("../config/warden.toml");

fn example_runtime() -> WardenResult<Runtime> {
    let runtime = WardenConfig::from_toml_str(EXAMPLE_CONFIG)?.build_in_memory()?;
    runtime.initialize()?;
    Ok(runtime)
}

fn call(runtime: &Runtime, method: &str, params: Value) -> WardenResult<Value> {
    let RpcResponse { result, error, .. } = runtime.handle_request(RpcRequest::new(1, method, params));
    match (result, error) {
        (Some(value), _) => Ok(value),
        (None, Some(e)) => Err(WardenError::InvalidRequest {
            reason: format!("{} (code {})", e.message, e.code),
        }),
        (None, None) => Ok(Value::Null),
    }
}

fn outcome(value: Value) -> WardenResult<ToolCallOutcome> {
    serde_json::from_value(value).map_err(|e| WardenError::InvalidRequest {
        reason: format!("unexpected outcome shape: {}", e),
    })
}

// ── Scenario 1: routing ───────────────────────────────────────────────────────

pub fn run_routing() -> WardenResult<()> {
    println!("=== Scenario 1: Route Resolution ===");
    println!();

    let runtime = example_runtime()?;
    let cases = [
        ("peer beats guild", json!({"channel": "discord", "peer_id": "user-42", "guild_id": "guild-7"})),
        ("guild", json!({"channel": "discord", "guild_id": "guild-7"})),
        ("telegram-only peer", json!({"channel": "telegram", "peer_id": "123456"})),
        ("same peer, discord", json!({"channel": "discord", "peer_id": "123456"})),
        ("account sub-session", json!({"channel": "telegram", "account_id": "acct-ops"})),
        ("channel wildcard", json!({"channel": "slack", "peer_id": "stranger"})),
        ("default", json!({"channel": "irc"})),
    ];

    for (label, context) in cases {
        let result = call(
            &runtime,
            "process_tool_call",
            json!({"context": context, "tool_name": "echo", "arguments": {}}),
        )?;
        let route = outcome(result)?.route().clone();
        println!("  {:<20} → {:<20} matched_by={}", label, route.agent_id, route.matched_by);
        println!("  {:<20}   session={}", "", route.session_key);
        if route.is_sub_session() {
            println!("  {:<20}   main   ={}", "", route.main_session_key);
        }
    }

    println!();
    println!("  Scenario 1 complete.");
    println!();
    Ok(())
}

// ── Scenario 2: authorization ─────────────────────────────────────────────────

pub fn run_authorization() -> WardenResult<()> {
    println!("=== Scenario 2: Tool Authorization ===");
    println!();

    let runtime = example_runtime()?;
    let cases = [
        ("echo", json!({"channel": "irc"})),
        ("delete_file", json!({"channel": "irc"})),
        ("not_configured", json!({"channel": "irc"})),
        ("exec_command", json!({"channel": "irc"})),
        ("exec_command", json!({"channel": "slack"})),
        ("exec_command", json!({"channel": "cli", "account_id": "acct-ops"})),
    ];

    for (tool, context) in cases {
        let params = json!({"context": context, "tool_name": tool});
        match call(&runtime, "process_tool_call", params) {
            Ok(result) => match outcome(result)? {
                ToolCallOutcome::Executed { route, .. } => {
                    println!("  {:<16} agent={:<18} EXECUTED", tool, route.agent_id)
                }
                ToolCallOutcome::Denied { route, reason, .. } => {
                    println!("  {:<16} agent={:<18} DENIED ({})", tool, route.agent_id, reason)
                }
            },
            // Authorized, but the bundled runner has no such tool.
            Err(e) => println!("  {:<16} {:<24} AUTHORIZED, then failed: {}", tool, "", e),
        }
    }

    let denied = call(
        &runtime,
        "query_audit",
        serde_json::to_value(AuditFilter {
            event_type: Some(EventType::ToolDenied),
            ..AuditFilter::default()
        })
        .map_err(|e| WardenError::InvalidRequest { reason: e.to_string() })?,
    )?;
    let status = call(&runtime, "status", Value::Null)?;

    println!();
    println!(
        "  Audit: {} entries, {} denials recorded",
        status["entries"],
        denied.as_array().map_or(0, Vec::len)
    );
    println!();
    println!("  Scenario 2 complete.");
    println!();
    Ok(())
}

// ── Scenario 3: tamper evidence ───────────────────────────────────────────────

pub fn run_tamper() -> WardenResult<()> {
    println!("=== Scenario 3: Audit Chain Tamper Evidence ===");
    println!();

    let log = AuditLog::in_memory();
    let events = [
        (EventType::SessionCreated, "channel=cli"),
        (EventType::RouteResolved, "matched_by=default channel=cli"),
        (EventType::ToolAuthorized, "tool=echo"),
        (EventType::ToolExecuted, "tool=echo status=ok"),
        (EventType::MeteringEvent, "tokens=128"),
    ];
    for (event_type, detail) in events {
        log.append(event_type, detail, "main", "agent:main:channel:cli", "req-demo")?;
    }

    println!("  Appended {} entries, head {}", log.len(), &log.head_hash()[..16]);
    println!("  Verify (untouched):  {}", if log.verify() { "INTACT" } else { "BROKEN" });

    let mut exported = log.snapshot().to_vec();
    exported[2].event_detail = "tool=delete_file".to_string();
    let reopened = AuditLog::open(Arc::new(InMemoryAuditStore::with_entries(exported)))?;

    match reopened.verify_detailed() {
        Ok(()) => println!("  Verify (edited):     INTACT (unexpected)"),
        Err(e) => println!("  Verify (edited):     BROKEN: {}", e),
    }

    println!();
    println!("  Scenario 3 complete.");
    println!();
    Ok(())
}

pub fn run_all() -> WardenResult<()> {
    run_routing()?;
    run_authorization()?;
    run_tamper()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use warden_contracts::{
        authz::DenyReason,
        dispatch::ToolCallOutcome,
        routing::MatchReason,
    };

    use super::{call, example_runtime, outcome, run_all};

    #[test]
    fn scenarios_run_to_completion() {
        run_all().unwrap();
    }

    #[test]
    fn guild_context_with_peer_routes_to_peer() {
        let runtime = example_runtime().unwrap();
        let result = call(
            &runtime,
            "process_tool_call",
            json!({
                "context": {"channel": "discord", "peer_id": "user-42", "guild_id": "guild-7"},
                "tool_name": "echo",
            }),
        )
        .unwrap();
        let route = outcome(result).unwrap().route().clone();
        assert_eq!(route.agent_id, "personal-assistant");
        assert_eq!(route.matched_by, MatchReason::Peer);
    }

    #[test]
    fn channel_scoped_peer_only_fires_on_its_channel() {
        let runtime = example_runtime().unwrap();
        let agent_on = |channel: &str| {
            let result = call(
                &runtime,
                "process_tool_call",
                json!({"context": {"channel": channel, "peer_id": "123456"}, "tool_name": "echo"}),
            )
            .unwrap();
            outcome(result).unwrap().route().agent_id.clone()
        };
        assert_eq!(agent_on("telegram"), "telegram-assistant");
        assert_eq!(agent_on("discord"), "main");
    }

    #[test]
    fn expired_grant_is_denied() {
        let runtime = example_runtime().unwrap();
        let result = call(
            &runtime,
            "process_tool_call",
            json!({"context": {"channel": "slack"}, "tool_name": "exec_command"}),
        )
        .unwrap();
        match outcome(result).unwrap() {
            ToolCallOutcome::Denied { reason, .. } => assert_eq!(reason, DenyReason::GrantExpired),
            other => panic!("expected denial, got {:?}", other),
        }
    }

    /// Every call leaves a verifiable trail.
    #[test]
    fn audit_stays_intact_across_calls() {
        let runtime = example_runtime().unwrap();
        for tool in ["echo", "delete_file", "exec_command"] {
            let _ = call(
                &runtime,
                "process_tool_call",
                json!({"context": {"channel": "cli", "account_id": "acct-ops"}, "tool_name": tool}),
            );
        }
        let report = call(&runtime, "verify_audit", Value::Null).unwrap();
        assert_eq!(report["intact"], json!(true));
        // echo: 3 entries, delete_file: 2, exec_command (authorized, runner fails): 3
        assert_eq!(report["entries"], json!(8));
    }
}
