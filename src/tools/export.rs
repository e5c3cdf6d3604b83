//! `export_table` tool.
//!
//! Reads a whole table and writes it as CSV to a path on the server's file
//! system. The file is written to a temporary sibling and renamed into place,
//! so the destination either holds the complete export or is left untouched.
//! A call abandoned at its deadline stops the writer before the rename.

use crate::db::DatabaseGateway;
use crate::encoder::csv::encode_csv;
use crate::error::{DbError, DbResult};
use crate::mcp::registry::{
    JsonObject, ToolDescriptor, ToolHandler, ToolInput, is_identifier, parse_arguments,
    require_non_empty,
};
use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

pub const TOOL_NAME: &str = "export_table";

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExportInput {
    /// Table name, optionally qualified as schema.table
    pub table: String,
    /// File to write; it is created or overwritten
    #[serde(alias = "outputPath")]
    pub output_path: PathBuf,
}

impl ToolInput for ExportInput {
    fn check(&self) -> Result<(), String> {
        require_non_empty("table", &self.table)?;
        if !is_identifier(&self.table) {
            return Err(format!(
                "parameter 'table' must be a plain identifier, got '{}'",
                self.table
            ));
        }
        require_non_empty("output_path", &self.output_path.to_string_lossy())
    }
}

/// Raises the flag when the owning future is dropped.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct ExportToolHandler {
    gateway: Arc<DatabaseGateway>,
}

impl ExportToolHandler {
    pub fn new(gateway: Arc<DatabaseGateway>) -> Self {
        Self { gateway }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new::<ExportInput>(
            TOOL_NAME,
            "Export every row of a table to a CSV file on the server. The first line holds the \
             column names; NULL is written as an empty field.",
        )
    }

    /// Export the table and return a confirmation message.
    pub async fn export(&self, input: ExportInput) -> DbResult<JsonValue> {
        let result = self.gateway.scan_table(&input.table).await?;

        // Encode fully before touching the file system
        let encoded = encode_csv(&result)?;
        let bytes = encoded.len() as u64;

        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel_on_drop = CancelOnDrop(Arc::clone(&cancelled));
        let path = input.output_path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, encoded.as_bytes(), &cancelled))
            .await
            .map_err(|e| DbError::internal(format!("Export writer task failed: {}", e)))??;

        info!(
            table = %input.table,
            rows = result.row_count(),
            bytes,
            path = %input.output_path.display(),
            "Table exported"
        );

        Ok(JsonValue::String(format!(
            "Exported {} {} from table '{}' to {} ({})",
            result.row_count(),
            if result.row_count() == 1 { "row" } else { "rows" },
            input.table,
            input.output_path.display(),
            humansize::format_size(bytes, humansize::WINDOWS)
        )))
    }
}

/// Write `contents` to `path`, replacing it only once the data is on disk.
///
/// Nothing is renamed into place once `cancelled` is set; the temporary
/// file is removed instead.
fn write_atomically(path: &Path, contents: &[u8], cancelled: &AtomicBool) -> DbResult<()> {
    let io_err = |e: std::io::Error| DbError::io(path.display(), e);

    if path.is_dir() {
        return Err(DbError::io(path.display(), "path is a directory"));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::Builder::new()
        .prefix(".export-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    debug!(temp = %file.path().display(), "Writing export");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(io_err)?;
    }

    file.write_all(contents).map_err(io_err)?;
    file.as_file().sync_all().map_err(io_err)?;
    if cancelled.load(Ordering::SeqCst) {
        return Err(DbError::io(path.display(), "export cancelled before completion"));
    }
    file.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

impl ToolHandler for ExportToolHandler {
    fn call(&self, arguments: JsonObject) -> Result<BoxFuture<'_, DbResult<JsonValue>>, String> {
        let input: ExportInput = parse_arguments(arguments)?;
        Ok(Box::pin(self.export(input)))
    }
}
