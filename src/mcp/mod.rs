//! MCP server integration.
//!
//! - [`registry`]: tool descriptors, typed inputs and their schemas, handler lookup
//! - [`dispatcher`]: runs one call at a time under a deadline
//! - [`service`]: the rmcp `ServerHandler` exposing the registry

pub mod dispatcher;
pub mod registry;
pub mod service;

pub use dispatcher::{Dispatcher, ErrorDetail, ResponseStatus, ToolRequest, ToolResponse};
pub use registry::{
    JsonObject, RegistryError, ToolDescriptor, ToolHandler, ToolInput, ToolRegistry,
    is_identifier, parse_arguments, require_non_empty,
};
pub use service::SqlToolService;
