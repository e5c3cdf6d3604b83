//! Tool dispatch.
//!
//! A [`ToolRequest`] is resolved against the registry, its arguments are
//! validated, and the handler runs under the call deadline. Every request
//! produces exactly one [`ToolResponse`]: failures of any kind (including a
//! handler panic) come back as an error response and never escape.
//!
//! Calls are handled one at a time. The gate is held for the whole call, so a
//! second request waits until the first has released its connection.

use crate::error::{DbError, DbResult, DispatchError, ErrorCategory, ErrorKind};
use crate::mcp::registry::{JsonObject, ToolRegistry};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// One tool invocation as received from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
    #[serde(default)]
    pub arguments: JsonObject,
}

impl ToolRequest {
    pub fn new(tool: impl Into<String>, arguments: JsonObject) -> Self {
        Self {
            tool: tool.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl From<&DispatchError> for ErrorDetail {
    fn from(err: &DispatchError) -> Self {
        Self {
            kind: err.kind(),
            category: err.category(),
            message: err.to_string(),
            suggestion: err.suggestion().map(str::to_string),
        }
    }
}

/// Outcome of one dispatched request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl ToolResponse {
    pub fn success(payload: JsonValue) -> Self {
        Self {
            status: ResponseStatus::Success,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(err: &DispatchError) -> Self {
        Self {
            status: ResponseStatus::Error,
            payload: None,
            error: Some(err.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Error kind, if this is an error response.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    call_timeout: Duration,
    gate: Mutex<()>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, call_timeout: Duration) -> Self {
        Self {
            registry,
            call_timeout,
            gate: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Handle one request to completion.
    pub async fn dispatch(&self, request: ToolRequest) -> ToolResponse {
        let _guard = self.gate.lock().await;

        let call_id = Uuid::new_v4();
        let span = info_span!("tool_call", %call_id, tool = %request.tool);

        async {
            let start = Instant::now();
            match self.invoke(request).await {
                Ok(payload) => {
                    info!(
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Tool call succeeded"
                    );
                    ToolResponse::success(payload)
                }
                Err(err) => {
                    warn!(
                        kind = ?err.kind(),
                        category = ?err.category(),
                        error = %err,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Tool call failed"
                    );
                    ToolResponse::failure(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn invoke(&self, request: ToolRequest) -> Result<JsonValue, DispatchError> {
        let ToolRequest { tool, arguments } = request;

        let registered = self
            .registry
            .get(&tool)
            .ok_or_else(|| DispatchError::unknown_tool(&tool))?;

        let handler = Arc::clone(&registered.handler);
        let work = handler
            .call(arguments)
            .map_err(|message| DispatchError::invalid_arguments(&tool, message))?;
        debug!("Arguments validated");

        self.run_guarded(work)
            .await
            .map_err(|source| DispatchError::handler_failure(&tool, source))
    }

    /// Run a handler future under the call deadline, converting a panic
    /// into an internal error.
    async fn run_guarded<F>(&self, fut: F) -> DbResult<JsonValue>
    where
        F: Future<Output = DbResult<JsonValue>>,
    {
        let guarded = AssertUnwindSafe(fut).catch_unwind();
        match tokio::time::timeout(self.call_timeout, guarded).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(DbError::internal(format!(
                "Tool handler panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Err(_) => Err(DbError::timeout(
                "tool call",
                self.call_timeout.as_secs().max(1),
            )),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
