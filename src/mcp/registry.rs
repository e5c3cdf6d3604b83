//! Tool registry.
//!
//! Tools are registered once, before the transport starts, and looked up by
//! name for every call. A tool's arguments are a typed input struct: its
//! `JsonSchema` derive produces the schema advertised by `tools/list`, and
//! deserializing into it (plus [`ToolInput::check`]) is the validation step
//! that runs before the handler is allowed to touch the database or disk.

use crate::error::DbResult;
use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Arguments object of a tool call.
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Typed arguments of one tool.
pub trait ToolInput: DeserializeOwned + JsonSchema {
    /// Checks the schema cannot express (non-empty text, identifier syntax).
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Deserialize and check call arguments.
///
/// Unknown extra arguments are ignored; JSON null counts as absent for
/// optional fields.
pub fn parse_arguments<T: ToolInput>(arguments: JsonObject) -> Result<T, String> {
    let input: T =
        serde_json::from_value(JsonValue::Object(arguments)).map_err(|e| e.to_string())?;
    input.check()?;
    Ok(input)
}

/// Reject blank text.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("parameter '{}' must not be empty", field))
    } else {
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_$]*`, optionally qualified by one schema part.
pub fn is_identifier(s: &str) -> bool {
    fn part(p: &str) -> bool {
        let mut chars = p.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    }
    let parts: Vec<&str> = s.split('.').collect();
    (1..=2).contains(&parts.len()) && parts.iter().all(|p| part(p))
}

/// JSON Schema of a tool input as the object MCP expects.
pub fn schema_for<T: JsonSchema>() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema) {
        Ok(JsonValue::Object(map)) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

/// Static description of one tool.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Arc<JsonObject>,
}

impl ToolDescriptor {
    pub fn new<T: ToolInput>(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            input_schema: schema_for::<T>(),
        }
    }
}

/// Implementation backing one tool.
pub trait ToolHandler: Send + Sync {
    /// Validate the arguments and return the work to run.
    ///
    /// `Err` means the arguments were rejected; nothing has been done yet.
    fn call(&self, arguments: JsonObject) -> Result<BoxFuture<'_, DbResult<JsonValue>>, String>;
}

pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub handler: Arc<dyn ToolHandler>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is registered more than once")]
    DuplicateTool(String),

    #[error("Tool name cannot be empty")]
    EmptyName,
}

/// Immutable set of tools, in registration order.
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder { tools: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.descriptor.name == name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub struct ToolRegistryBuilder {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistryBuilder {
    pub fn register(mut self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) -> Self {
        self.tools.push(RegisteredTool {
            descriptor,
            handler,
        });
        self
    }

    pub fn build(self) -> Result<ToolRegistry, RegistryError> {
        let mut seen = HashSet::new();
        for tool in &self.tools {
            let name = tool.descriptor.name;
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if !seen.insert(name) {
                return Err(RegistryError::DuplicateTool(name.to_string()));
            }
        }
        Ok(ToolRegistry { tools: self.tools })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct CopyInput {
        /// Source table
        table: String,
        /// Destination file
        #[serde(alias = "outputPath")]
        output_path: String,
        /// Optional note
        #[serde(default)]
        note: Option<String>,
    }

    impl ToolInput for CopyInput {
        fn check(&self) -> Result<(), String> {
            if !is_identifier(&self.table) {
                return Err(format!("'{}' is not a valid table name", self.table));
            }
            require_non_empty("output_path", &self.output_path)
        }
    }

    struct Echo;

    impl ToolHandler for Echo {
        fn call(
            &self,
            arguments: JsonObject,
        ) -> Result<BoxFuture<'_, DbResult<JsonValue>>, String> {
            let input: CopyInput = parse_arguments(arguments)?;
            Ok(Box::pin(async move { Ok(json!(input.output_path)) }))
        }
    }

    fn args(v: JsonValue) -> JsonObject {
        match v {
            JsonValue::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn copy_descriptor() -> ToolDescriptor {
        ToolDescriptor::new::<CopyInput>("copy_table", "Copy a table")
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("users"));
        assert!(is_identifier("_tmp$1"));
        assert!(is_identifier("public.users"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1users"));
        assert!(!is_identifier("users; DROP TABLE x"));
        assert!(!is_identifier("a.b.c"));
        assert!(!is_identifier("a."));
        assert!(!is_identifier("\"quoted\""));
    }

    #[test]
    fn test_parse_alias_and_extra_args() {
        let input: CopyInput = parse_arguments(args(
            json!({"table": "t", "outputPath": "/tmp/t.csv", "verbose": true}),
        ))
        .unwrap();
        assert_eq!(input.output_path, "/tmp/t.csv");
        assert!(input.note.is_none());
    }

    #[test]
    fn test_parse_null_optional_is_absent() {
        let input: CopyInput =
            parse_arguments(args(json!({"table": "t", "output_path": "a", "note": null})))
                .unwrap();
        assert!(input.note.is_none());
    }

    #[test]
    fn test_parse_missing_required() {
        let err = parse_arguments::<CopyInput>(args(json!({"table": "t"}))).unwrap_err();
        assert!(err.contains("output_path"), "{err}");
    }

    #[test]
    fn test_parse_wrong_type() {
        let err = parse_arguments::<CopyInput>(args(json!({"table": 5, "output_path": "x"})))
            .unwrap_err();
        assert!(err.contains("invalid type"), "{err}");
    }

    #[test]
    fn test_parse_name_and_alias_together_rejected() {
        let err = parse_arguments::<CopyInput>(args(
            json!({"table": "t", "output_path": "a.csv", "outputPath": "b.csv"}),
        ))
        .unwrap_err();
        assert!(err.contains("output_path"), "{err}");
    }

    #[test]
    fn test_check_runs_after_deserialize() {
        let err = parse_arguments::<CopyInput>(args(
            json!({"table": "t; DROP TABLE t", "output_path": "a.csv"}),
        ))
        .unwrap_err();
        assert!(err.contains("not a valid table name"), "{err}");

        let err = parse_arguments::<CopyInput>(args(json!({"table": "t", "output_path": "  "})))
            .unwrap_err();
        assert!(err.contains("must not be empty"), "{err}");
    }

    #[test]
    fn test_input_schema_from_derive() {
        let schema = copy_descriptor().input_schema;
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["table"]["type"], "string");
        assert_eq!(schema["properties"]["table"]["description"], "Source table");
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("table")));
        assert!(required.contains(&json!("output_path")));
        assert!(!required.contains(&json!("note")));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let result = ToolRegistry::builder()
            .register(copy_descriptor(), Arc::new(Echo))
            .register(copy_descriptor(), Arc::new(Echo))
            .build();
        assert!(matches!(result, Err(RegistryError::DuplicateTool(name)) if name == "copy_table"));
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let registry = ToolRegistry::builder()
            .register(copy_descriptor(), Arc::new(Echo))
            .build()
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("nope").is_none());

        let tool = registry.get("copy_table").unwrap();
        let work = tool
            .handler
            .call(args(json!({"table": "t", "output_path": "o.csv"})))
            .unwrap();
        assert_eq!(work.await.unwrap(), json!("o.csv"));
        assert!(tool.handler.call(JsonObject::new()).is_err());
    }
}
