//! # warden-core
//!
//! The request pipeline and process lifecycle of the WARDEN trust core.
//!
//! This crate provides:
//! - The trait seams (`AuditTrail`, `Router`, `ToolAuthorizer`) and the
//!   collaborator interfaces (`AuditStore`, `GrantStore`, `ToolRunner`,
//!   `Transport`)
//! - The `Dispatcher` that wires them together in trust order
//! - The `Runtime` that serves JSON-RPC requests over a `Transport`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_core::{Dispatcher, Runtime};
//!
//! let runtime = Runtime::new(Dispatcher::new(router, authorizer, grants, audit, runner));
//! runtime.initialize()?;
//! let code = runtime.run_dispatch_loop(&mut transport);
//! runtime.shutdown();
//! ```

pub mod dispatcher;
pub mod runtime;
pub mod traits;

#[cfg(test)]
pub(crate) mod mocks;

pub use dispatcher::Dispatcher;
pub use runtime::Runtime;
