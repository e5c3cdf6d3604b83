//! Tool implementations.
//!
//! - `run_query`: execute one SQL statement and return its rows
//! - `export_table`: write a whole table to a CSV file
//! - `sql_validator`: read-only statement guard used by `run_query`

pub mod export;
pub mod query;
pub mod sql_validator;

pub use export::{ExportInput, ExportToolHandler};
pub use query::{QueryInput, QueryToolHandler};

use crate::db::DatabaseGateway;
use crate::mcp::registry::{RegistryError, ToolRegistry};
use std::sync::Arc;

/// Registry holding every tool, all sharing one gateway.
pub fn build_registry(gateway: Arc<DatabaseGateway>) -> Result<ToolRegistry, RegistryError> {
    ToolRegistry::builder()
        .register(
            QueryToolHandler::descriptor(),
            Arc::new(QueryToolHandler::new(Arc::clone(&gateway))),
        )
        .register(
            ExportToolHandler::descriptor(),
            Arc::new(ExportToolHandler::new(gateway)),
        )
        .build()
}
