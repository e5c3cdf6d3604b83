//! `run_query` tool.
//!
//! Runs one SQL statement verbatim on a fresh connection and returns every
//! row. Statements that would write are refused unless the database URL
//! carries `?writable=true`.

use crate::db::DatabaseGateway;
use crate::encoder::{self, OutputFormat};
use crate::error::DbResult;
use crate::mcp::registry::{
    JsonObject, ToolDescriptor, ToolHandler, ToolInput, parse_arguments, require_non_empty,
};
use crate::tools::sql_validator;
use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub const TOOL_NAME: &str = "run_query";

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL statement to execute
    pub sql: String,
    /// Output format: json (default) returns an array of rows, table and markdown return text
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

impl ToolInput for QueryInput {
    fn check(&self) -> Result<(), String> {
        require_non_empty("sql", &self.sql)
    }
}

/// Handler for the query tool.
pub struct QueryToolHandler {
    gateway: Arc<DatabaseGateway>,
}

impl QueryToolHandler {
    pub fn new(gateway: Arc<DatabaseGateway>) -> Self {
        Self { gateway }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new::<QueryInput>(
            TOOL_NAME,
            "Execute a SQL statement and return every resulting row as a JSON array of arrays, \
             in projection order. Only SELECT, SHOW and EXPLAIN are accepted unless the database \
             was configured writable.",
        )
    }

    /// Execute the statement and encode its rows.
    pub async fn query(&self, input: QueryInput) -> DbResult<JsonValue> {
        let config = self.gateway.config();
        if !config.writable {
            sql_validator::validate_readonly(&input.sql, config.db_type)?;
        }

        let start = Instant::now();
        let result = self.gateway.execute(&input.sql).await?;

        info!(
            rows = result.row_count(),
            columns = result.columns.len(),
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Query executed"
        );

        encoder::render(&result, input.format.unwrap_or_default())
    }
}

impl ToolHandler for QueryToolHandler {
    fn call(&self, arguments: JsonObject) -> Result<BoxFuture<'_, DbResult<JsonValue>>, String> {
        let input: QueryInput = parse_arguments(arguments)?;
        Ok(Box::pin(self.query(input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(v: JsonValue) -> JsonObject {
        match v {
            JsonValue::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_query_input_defaults() {
        let input: QueryInput = parse_arguments(args(json!({"sql": "SELECT 1"}))).unwrap();
        assert_eq!(input.format.unwrap_or_default(), OutputFormat::Json);

        let input: QueryInput =
            parse_arguments(args(json!({"sql": "SELECT 1", "format": null}))).unwrap();
        assert!(input.format.is_none());
    }

    #[test]
    fn test_query_input_format() {
        let input: QueryInput =
            parse_arguments(args(json!({"sql": "SELECT 1", "format": "markdown"}))).unwrap();
        assert_eq!(input.format, Some(OutputFormat::Markdown));
    }

    #[test]
    fn test_query_input_rejections() {
        let err = parse_arguments::<QueryInput>(args(json!({"sql": "SELECT 1", "format": "xml"})))
            .unwrap_err();
        assert!(err.contains("unknown variant"), "{err}");

        let err = parse_arguments::<QueryInput>(args(json!({"sql": ""}))).unwrap_err();
        assert!(err.contains("must not be empty"), "{err}");
    }

    #[test]
    fn test_descriptor_schema() {
        let schema = QueryToolHandler::descriptor().input_schema;
        assert_eq!(schema["required"], json!(["sql"]));
        assert_eq!(schema["properties"]["sql"]["type"], "string");
        let rendered = serde_json::to_string(&*schema).unwrap();
        for name in ["json", "table", "markdown"] {
            assert!(rendered.contains(&format!("\"{}\"", name)), "{rendered}");
        }
    }
}
