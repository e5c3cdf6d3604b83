//! Shared helpers for integration tests.
#![allow(dead_code)]

use serde_json::Value as JsonValue;
use sql_mcp_server::db::DatabaseGateway;
use sql_mcp_server::mcp::{Dispatcher, JsonObject, ToolRequest, ToolResponse};
use sql_mcp_server::models::ConnectionConfig;
use sql_mcp_server::tools::build_registry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A SQLite database file in its own temporary directory.
pub struct TestDb {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TestDb {
    /// Create the database and run each setup statement on a writable connection.
    pub async fn with_statements(statements: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let db = Self { dir, path };

        let gateway = db.gateway(true);
        // Touch the file even when there are no statements
        gateway.execute("SELECT 1").await.unwrap();
        for sql in statements {
            gateway.execute(sql).await.unwrap();
        }
        db
    }

    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    pub fn gateway(&self, writable: bool) -> Arc<DatabaseGateway> {
        let config = ConnectionConfig::new(self.url(), writable).unwrap();
        Arc::new(DatabaseGateway::new(Arc::new(config)))
    }

    /// Gateway plus a dispatcher serving every tool through it.
    pub fn dispatcher(&self, writable: bool, call_timeout: Duration) -> (Arc<DatabaseGateway>, Dispatcher) {
        let gateway = self.gateway(writable);
        let registry = build_registry(Arc::clone(&gateway)).unwrap();
        (gateway, Dispatcher::new(Arc::new(registry), call_timeout))
    }

    pub fn out_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Files in the database directory other than the database itself.
    pub fn stray_files(&self) -> Vec<String> {
        std::fs::read_dir(self.dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with("test.db"))
            .collect()
    }
}

pub fn args(value: JsonValue) -> JsonObject {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub async fn call(dispatcher: &Dispatcher, tool: &str, arguments: JsonValue) -> ToolResponse {
    dispatcher.dispatch(ToolRequest::new(tool, args(arguments))).await
}

pub fn payload(response: &ToolResponse) -> &JsonValue {
    assert!(response.is_success(), "expected success, got {:?}", response.error);
    response.payload.as_ref().unwrap()
}

/// Minimal CSV reader: quoted fields with doubled quotes, `\n` record ends.
pub fn parse_csv(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => record.push(std::mem::take(&mut field)),
                '\n' => {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                _ => field.push(c),
            }
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}
