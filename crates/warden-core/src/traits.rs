//! Trait seams of the WARDEN trust core.
//!
//! Trusted components:
//!
//! - `AuditTrail`: the hash-chained log (append, verify, read)
//! - `Router`: maps an inbound message to an agent and session
//! - `ToolAuthorizer`: decides whether an agent may run a tool
//!
//! Collaborators the core consumes but does not implement:
//!
//! - `AuditStore`: crash-atomic persistence of committed entries
//! - `GrantStore`: read access to time-bounded tool grants
//! - `ToolRunner`: actually runs an authorized tool
//! - `Transport`: framed request/response exchange
//!
//! The dispatcher wires them together in trust order.  A `ToolRunner` is
//! never called unless the authorizer returned an authorized decision.

use std::sync::Arc;

use serde_json::Value;

use warden_contracts::{
    audit::{AuditEntry, AuditFilter, EventType},
    authz::{AuthDecision, Grant},
    error::WardenResult,
    routing::{ResolvedRoute, RouteContext},
    rpc::{RpcRequest, RpcResponse},
};

/// Persistence collaborator for committed audit entries.
///
/// `append` must be crash-atomic per entry: after a crash either the whole
/// entry is stored or none of it is.  Retry policy, if any, lives here.
pub trait AuditStore: Send + Sync {
    /// Durably store one entry.  Called with entries in sequence order.
    fn append(&self, entry: &AuditEntry) -> WardenResult<()>;

    /// Return every stored entry in sequence order.
    fn iterate(&self) -> WardenResult<Vec<AuditEntry>>;
}

/// The tamper-evident audit log.
///
/// `append` is the only mutating operation and is serialized by the
/// implementation.  Reads observe a consistent snapshot.
pub trait AuditTrail: Send + Sync {
    /// Commit one entry and return it.
    ///
    /// Fails only with `PersistenceFailure`, in which case nothing was
    /// committed and the sequence counter did not advance.
    fn append(
        &self,
        event_type: EventType,
        detail: &str,
        agent_id: &str,
        session_key: &str,
        request_id: &str,
    ) -> WardenResult<AuditEntry>;

    /// Recompute the chain from genesis.
    ///
    /// Returns `IntegrityViolation` naming the first broken entry.
    fn verify_detailed(&self) -> WardenResult<()>;

    /// Committed entries matching `filter`, in sequence order.
    fn entries(&self, filter: &AuditFilter) -> Vec<AuditEntry>;

    /// Number of committed entries.
    fn len(&self) -> usize;

    /// True if nothing has been committed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hash of the last committed entry, or the genesis hash when empty.
    fn head_hash(&self) -> String;
}

/// Route resolution over an immutable rule table.
pub trait Router: Send + Sync {
    /// Pick exactly one route for `ctx`.
    ///
    /// Fails with `UnresolvedRoute` only when no tier matches and no default
    /// agent is configured.
    fn resolve(&self, ctx: &RouteContext) -> WardenResult<ResolvedRoute>;
}

/// Read access to the external grant store.
pub trait GrantStore: Send + Sync {
    /// The grant held by `agent_id` for `tool_name`, if any.  The returned
    /// grant may be expired; checking the window is the caller's job.
    fn lookup(&self, agent_id: &str, tool_name: &str) -> WardenResult<Option<Grant>>;
}

impl<T: GrantStore + ?Sized> GrantStore for Arc<T> {
    fn lookup(&self, agent_id: &str, tool_name: &str) -> WardenResult<Option<Grant>> {
        (**self).lookup(agent_id, tool_name)
    }
}

/// The tool authorization gate.
///
/// Implementations must be deterministic over their configuration and the
/// grant store, must never mutate grants, and must never write audit
/// entries.  A denial is a value, not an error.
pub trait ToolAuthorizer: Send + Sync {
    fn authorize(&self, tool_name: &str, agent_id: &str, grants: &dyn GrantStore) -> AuthDecision;
}

/// Runs a tool after it has been authorized.
pub trait ToolRunner: Send + Sync {
    fn run(&self, tool_name: &str, arguments: &Value, route: &ResolvedRoute) -> WardenResult<Value>;
}

/// Framed request/response transport.
///
/// Framing details belong to the implementation; the runtime only needs to
/// decode one request and encode one response at a time.
pub trait Transport {
    /// Read the next request.
    ///
    /// Returns `Ok(None)` on a clean end of stream, `ParseError` when a frame
    /// body was not JSON, `MalformedRequest` when it was JSON but not a
    /// JSON-RPC request, and `Transport` for framing or I/O failures.
    fn read_request(&mut self) -> WardenResult<Option<RpcRequest>>;

    fn write_response(&mut self, response: &RpcResponse) -> WardenResult<()>;
}
