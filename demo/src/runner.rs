//! Built-in tools the binary can run once a call is authorized.
//!
//! Real deployments plug in their own `ToolRunner`; these exist so the
//! runtime is usable end to end without one.

use serde_json::{json, Value};

use warden_contracts::{
    error::{WardenError, WardenResult},
    routing::ResolvedRoute,
};
use warden_core::traits::ToolRunner;

pub struct BuiltinRunner;

impl ToolRunner for BuiltinRunner {
    fn run(&self, tool_name: &str, arguments: &Value, route: &ResolvedRoute) -> WardenResult<Value> {
        match tool_name {
            "echo" => Ok(json!({
                "agent_id": route.agent_id,
                "session_key": route.session_key,
                "arguments": arguments,
            })),
            "clock" => Ok(json!({ "now": chrono::Utc::now().to_rfc3339() })),
            other => Err(WardenError::ToolFailed {
                tool: other.to_string(),
                reason: "no built-in implementation".to_string(),
            }),
        }
    }
}
