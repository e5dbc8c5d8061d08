//! Process lifecycle: `initialize`, `run_dispatch_loop`, `shutdown`.
//!
//! The runtime owns a `Dispatcher` and serves JSON-RPC requests read from a
//! `Transport` until the stream ends, a `shutdown` request arrives, or the
//! transport fails.
//!
//! Integrity status is tracked separately from the lifecycle: a broken
//! audit chain is reported, never repaired, and the runtime keeps serving.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, PoisonError,
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use warden_contracts::{
    audit::AuditFilter,
    dispatch::ToolCallRequest,
    error::{WardenError, WardenResult},
    rpc::{
        AppendEventParams, RpcRequest, RpcResponse, StatusReport, VerifyReport, METHOD_NOT_FOUND,
    },
};

use crate::{dispatcher::Dispatcher, traits::Transport};

/// Exit code: the stream ended cleanly or a shutdown was requested.
pub const EXIT_OK: i32 = 0;
/// Exit code: the transport failed to read or write a frame.
pub const EXIT_TRANSPORT_FAILURE: i32 = 1;
/// Exit code: `run_dispatch_loop` was called before `initialize`.
pub const EXIT_NOT_INITIALIZED: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Ready,
    Running,
    Stopped,
}

/// The served trust core.
pub struct Runtime {
    dispatcher: Dispatcher,
    lifecycle: Mutex<Lifecycle>,
    integrity_ok: AtomicBool,
}

impl Runtime {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            lifecycle: Mutex::new(Lifecycle::Created),
            integrity_ok: AtomicBool::new(true),
        }
    }

    /// Verify the audit chain and mark the runtime ready to serve.
    ///
    /// An integrity violation does not fail initialization; it is logged
    /// and reflected in [`Runtime::integrity_ok`].
    ///
    /// # Errors
    ///
    /// `Lifecycle` if called twice or after shutdown.
    pub fn initialize(&self) -> WardenResult<()> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if *lifecycle != Lifecycle::Created {
            return Err(WardenError::Lifecycle {
                reason: format!("initialize called in state {:?}", *lifecycle),
            });
        }

        self.check_integrity();
        *lifecycle = Lifecycle::Ready;

        info!(
            entries = self.dispatcher.audit().len(),
            integrity_ok = self.integrity_ok(),
            "trust core initialized"
        );
        Ok(())
    }

    /// True when the last chain verification passed.
    pub fn integrity_ok(&self) -> bool {
        self.integrity_ok.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(
            *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner),
            Lifecycle::Ready | Lifecycle::Running
        )
    }

    /// Serve requests until end of stream, `shutdown`, or transport failure.
    ///
    /// Returns [`EXIT_OK`], [`EXIT_TRANSPORT_FAILURE`], or
    /// [`EXIT_NOT_INITIALIZED`].
    pub fn run_dispatch_loop(&self, transport: &mut dyn Transport) -> i32 {
        {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            if *lifecycle != Lifecycle::Ready {
                warn!(state = ?*lifecycle, "dispatch loop started before initialize");
                return EXIT_NOT_INITIALIZED;
            }
            *lifecycle = Lifecycle::Running;
        }

        let code = self.serve(transport);

        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if *lifecycle == Lifecycle::Running {
            *lifecycle = Lifecycle::Ready;
        }
        code
    }

    /// Stop serving.  Safe to call any number of times, before or after a
    /// run, including after a failed one.
    pub fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if *lifecycle == Lifecycle::Stopped {
            return;
        }
        *lifecycle = Lifecycle::Stopped;
        info!(
            entries = self.dispatcher.audit().len(),
            head_hash = %self.dispatcher.audit().head_hash(),
            "trust core shut down"
        );
    }

    fn stopped(&self) -> bool {
        *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner) == Lifecycle::Stopped
    }

    fn serve(&self, transport: &mut dyn Transport) -> i32 {
        loop {
            if self.stopped() {
                return EXIT_OK;
            }

            let request = match transport.read_request() {
                Ok(Some(request)) => request,
                Ok(None) => {
                    debug!("transport closed");
                    return EXIT_OK;
                }
                Err(e @ (WardenError::ParseError { .. } | WardenError::MalformedRequest { .. })) => {
                    warn!(error = %e, "unusable request frame");
                    let response = RpcResponse::failure(Value::Null, e.rpc_code(), e.to_string());
                    if let Err(e) = transport.write_response(&response) {
                        error!(error = %e, "failed to write response");
                        return EXIT_TRANSPORT_FAILURE;
                    }
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "failed to read request");
                    return EXIT_TRANSPORT_FAILURE;
                }
            };

            let stop = request.method == "shutdown";
            let response = self.handle_request(request);
            if let Err(e) = transport.write_response(&response) {
                error!(error = %e, "failed to write response");
                return EXIT_TRANSPORT_FAILURE;
            }
            if stop {
                self.shutdown();
                return EXIT_OK;
            }
        }
    }

    /// Answer one JSON-RPC request.
    pub fn handle_request(&self, request: RpcRequest) -> RpcResponse {
        debug!(method = %request.method, "handling request");
        let RpcRequest { id, method, params, .. } = request;

        let result = match method.as_str() {
            "process_tool_call" => parse_params::<ToolCallRequest>(params)
                .and_then(|req| self.dispatcher.handle(req))
                .and_then(encode),
            "append_event" => parse_params::<AppendEventParams>(params)
                .and_then(external_event)
                .and_then(|p| {
                    self.dispatcher.audit().append(
                        p.event_type,
                        &p.detail,
                        &p.agent_id,
                        &p.session_key,
                        &p.request_id,
                    )
                })
                .and_then(encode),
            "query_audit" => {
                let filter = if params.is_null() {
                    Ok(AuditFilter::default())
                } else {
                    parse_params::<AuditFilter>(params)
                };
                filter
                    .map(|f| self.dispatcher.audit().entries(&f))
                    .and_then(encode)
            }
            "verify_audit" => {
                let intact = self.check_integrity();
                let audit = self.dispatcher.audit();
                encode(VerifyReport {
                    intact,
                    entries: audit.len(),
                    head_hash: audit.head_hash(),
                })
            }
            "status" => encode(StatusReport {
                initialized: self.is_initialized(),
                integrity_ok: self.integrity_ok(),
                entries: self.dispatcher.audit().len(),
            }),
            "shutdown" => Ok(Value::Null),
            other => {
                warn!(method = %other, "unknown method");
                return RpcResponse::failure(id, METHOD_NOT_FOUND, format!("unknown method '{}'", other));
            }
        };

        match result {
            Ok(value) => RpcResponse::success(id, value),
            Err(e) => RpcResponse::failure(id, e.rpc_code(), e.to_string()),
        }
    }

    /// Re-verify the chain and record the result.
    fn check_integrity(&self) -> bool {
        let intact = match self.dispatcher.audit().verify_detailed() {
            Ok(()) => true,
            Err(e) => {
                error!(
                    target: "warden::integrity",
                    error = %e,
                    "audit chain integrity violation"
                );
                false
            }
        };
        self.integrity_ok.store(intact, Ordering::SeqCst);
        intact
    }
}

/// `append_event` may not forge entries the dispatcher writes for tool calls.
fn external_event(params: AppendEventParams) -> WardenResult<AppendEventParams> {
    if params.event_type.is_dispatcher_owned() {
        warn!(event_type = %params.event_type, "rejected append of dispatcher-owned event");
        return Err(WardenError::InvalidRequest {
            reason: format!(
                "event type '{}' is recorded by the dispatcher only",
                params.event_type
            ),
        });
    }
    Ok(params)
}

fn parse_params<T: DeserializeOwned>(params: Value) -> WardenResult<T> {
    serde_json::from_value(params).map_err(|e| WardenError::InvalidRequest {
        reason: e.to_string(),
    })
}

fn encode<T: Serialize>(value: T) -> WardenResult<Value> {
    serde_json::to_value(value).map_err(|e| WardenError::Transport {
        reason: format!("failed to encode result: {}", e),
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────
