//! Wire protocol for switchboard sessions.
//!
//! Implements the JSON-RPC 2.0 framing used between a local process and the
//! remote code-execution service, plus the typed parameter and result shapes
//! for every method either side sends.
//!
//! # Architecture
//!
//! - **frame**: envelope types ([`Request`], [`Response`], [`ErrorResponse`],
//!   [`Notification`]), the [`RpcId`] correlation id, standard error codes,
//!   and [`Frame::parse`] which classifies a raw message by envelope shape
//! - **types**: method-specific params and results (`register_tool`,
//!   `register_mcp`, `execute`, `execute_tool`, `list_functions`,
//!   `get_function_details`, `session_created`)
//!
//! This crate is pure data: no I/O, no async.

pub mod frame;
pub mod types;

pub use frame::{
    error_codes, DecodeError, ErrorResponse, Frame, Notification, Request, Response, RpcError,
    RpcId,
};
pub use types::*;
