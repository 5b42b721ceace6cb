//! Local tools a switchboard session exposes to its peer.
//!
//! The remote execution service can call back into the local process while
//! code runs. This crate holds the pieces that make those callbacks safe to
//! dispatch: [`ToolDescriptor`] wraps an application callback (sync or async)
//! together with optional input/output JSON Schemas compiled once at
//! registration, and [`ToolRegistry`] keys descriptors by
//! `(namespace, name)` with duplicate registration rejected.
//!
//! Tools are supplied by the embedding application and live for the life of
//! the session; there is no removal operation in the protocol.

pub mod descriptor;
pub mod registry;

pub use descriptor::{add_tool, AsyncTool, ToolCallback, ToolDescriptor};
pub use registry::{RegistryError, ToolRegistry};
