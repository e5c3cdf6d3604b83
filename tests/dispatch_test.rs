//! Integration tests for tool dispatch.
//!
//! Tests verify that:
//! - Unknown tools and bad arguments never reach a handler
//! - A handler exceeding the call deadline yields TimeoutError
//! - A panicking handler yields InternalError and the dispatcher keeps working
//! - Calls are handled one at a time

mod common;

use common::{TestDb, args, call};
use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use sql_mcp_server::db::StatsSnapshot;
use sql_mcp_server::error::{DbResult, ErrorCategory, ErrorKind};
use sql_mcp_server::mcp::{
    Dispatcher, JsonObject, ToolDescriptor, ToolHandler, ToolInput, ToolRegistry, ToolRequest,
    parse_arguments,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Deserialize, JsonSchema)]
struct BoomInput {
    /// Panic when present
    #[serde(default)]
    boom: Option<String>,
}

impl ToolInput for BoomInput {}

type Work<'a> = Result<BoxFuture<'a, DbResult<JsonValue>>, String>;

struct Sleepy(Duration);

impl ToolHandler for Sleepy {
    fn call(&self, _arguments: JsonObject) -> Work<'_> {
        Ok(Box::pin(async move {
            tokio::time::sleep(self.0).await;
            Ok(json!("done"))
        }))
    }
}

struct Panicky;

impl ToolHandler for Panicky {
    fn call(&self, arguments: JsonObject) -> Work<'_> {
        let input: BoomInput = parse_arguments(arguments)?;
        Ok(Box::pin(async move {
            if input.boom.is_some() {
                panic!("handler exploded");
            }
            Ok(json!("fine"))
        }))
    }
}

#[derive(Default)]
struct Counting {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl ToolHandler for Counting {
    fn call(&self, _arguments: JsonObject) -> Work<'_> {
        Ok(Box::pin(async move {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(JsonValue::Null)
        }))
    }
}

fn single_tool(name: &'static str, handler: Arc<dyn ToolHandler>, timeout: Duration) -> Dispatcher {
    let descriptor = ToolDescriptor::new::<BoomInput>(name, "test tool");
    let registry = ToolRegistry::builder()
        .register(descriptor, handler)
        .build()
        .unwrap();
    Dispatcher::new(Arc::new(registry), timeout)
}

#[tokio::test]
async fn test_unknown_tool_opens_nothing() {
    let db = TestDb::with_statements(&[]).await;
    let (gateway, dispatcher) = db.dispatcher(false, Duration::from_secs(5));

    let response = call(&dispatcher, "drop_everything", json!({"sql": "SELECT 1"})).await;
    let error = response.error.expect("error response");
    assert_eq!(error.kind, ErrorKind::UnknownTool);
    assert_eq!(error.category, ErrorCategory::UnknownTool);
    assert!(error.suggestion.is_some());
    assert_eq!(gateway.stats(), StatsSnapshot { opened: 0, closed: 0 });
}

#[tokio::test]
async fn test_wrong_argument_type_is_invalid_arguments() {
    let db = TestDb::with_statements(&[]).await;
    let (gateway, dispatcher) = db.dispatcher(false, Duration::from_secs(5));

    for arguments in [json!({}), json!({"sql": 42}), json!({"sql": "   "})] {
        let response = call(&dispatcher, "run_query", arguments.clone()).await;
        assert_eq!(
            response.error_kind(),
            Some(ErrorKind::InvalidArguments),
            "{arguments}"
        );
    }
    assert_eq!(gateway.stats().opened, 0);
}

#[tokio::test]
async fn test_handler_timeout() {
    let dispatcher = single_tool(
        "slow",
        Arc::new(Sleepy(Duration::from_secs(5))),
        Duration::from_millis(50),
    );

    let response = call(&dispatcher, "slow", json!({})).await;
    let error = response.error.expect("error response");
    assert_eq!(error.kind, ErrorKind::TimeoutError);
    assert_eq!(error.category, ErrorCategory::HandlerFailure);
}

#[tokio::test]
async fn test_handler_within_deadline() {
    let dispatcher = single_tool(
        "quick",
        Arc::new(Sleepy(Duration::from_millis(1))),
        Duration::from_secs(5),
    );

    let response = call(&dispatcher, "quick", json!({})).await;
    assert_eq!(response.payload, Some(json!("done")));
}

#[tokio::test]
async fn test_panic_becomes_internal_error() {
    let dispatcher = single_tool("fragile", Arc::new(Panicky), Duration::from_secs(5));

    let response = call(&dispatcher, "fragile", json!({"boom": "yes"})).await;
    let error = response.error.expect("error response");
    assert_eq!(error.kind, ErrorKind::InternalError);
    assert!(error.message.contains("handler exploded"), "{}", error.message);

    // The dispatcher is still usable after a panic
    let response = call(&dispatcher, "fragile", json!({})).await;
    assert_eq!(response.payload, Some(json!("fine")));
}

#[tokio::test]
async fn test_rejected_arguments_never_run_handler() {
    let dispatcher = single_tool("fragile", Arc::new(Panicky), Duration::from_secs(5));

    let response = call(&dispatcher, "fragile", json!({"boom": 7})).await;
    let error = response.error.expect("error response");
    assert_eq!(error.kind, ErrorKind::InvalidArguments);
    assert_eq!(error.category, ErrorCategory::InvalidArguments);
    assert!(error.message.contains("invalid type"), "{}", error.message);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_calls_are_sequential() {
    let counting = Arc::new(Counting::default());
    let dispatcher = Arc::new(single_tool(
        "count",
        Arc::clone(&counting) as Arc<dyn ToolHandler>,
        Duration::from_secs(5),
    ));

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher
                    .dispatch(ToolRequest::new("count", args(json!({}))))
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_success());
    }
    assert_eq!(counting.max.load(Ordering::SeqCst), 1);
}
