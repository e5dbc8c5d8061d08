//! # warden-contracts
//!
//! Shared types, the error taxonomy, and JSON-RPC wire contracts for the
//! WARDEN trust core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod audit;
pub mod authz;
pub mod dispatch;
pub mod error;
pub mod routing;
pub mod rpc;
