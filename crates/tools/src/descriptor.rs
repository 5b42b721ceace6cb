//! Tool descriptors: one namespace-qualified callback plus its schemas.
//!
//! The callback kind is decided once, at construction, as a tagged variant —
//! the dispatcher never has to inspect the callable again per invocation.
//! Schemas are kept in their raw JSON form (for announcing the tool to the
//! peer) and compiled into validators when the descriptor enters a registry.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use switchboard_protocol::ToolSpec;

/// A synchronous tool callback: plain function from args to result.
pub type SyncCallback = Arc<dyn Fn(Value) -> Result<Value, anyhow::Error> + Send + Sync>;

/// Object-safe trait for asynchronous tool callbacks.
#[async_trait]
pub trait AsyncTool: Send + Sync {
    /// Run the tool with the given JSON arguments.
    async fn invoke(&self, args: Value) -> Result<Value, anyhow::Error>;
}

/// The two callback kinds, tagged at construction.
#[derive(Clone)]
pub enum ToolCallback {
    Sync(SyncCallback),
    Async(Arc<dyn AsyncTool>),
}

impl ToolCallback {
    fn kind(&self) -> &'static str {
        match self {
            ToolCallback::Sync(_) => "sync",
            ToolCallback::Async(_) => "async",
        }
    }
}

/// One local tool the peer may call by `(namespace, name)`.
pub struct ToolDescriptor {
    pub namespace: String,
    pub name: String,
    pub description: Option<String>,
    callback: ToolCallback,
    input_schema: Option<Value>,
    output_schema: Option<Value>,
    input_validator: Option<jsonschema::Validator>,
    output_validator: Option<jsonschema::Validator>,
}

impl ToolDescriptor {
    /// Create a descriptor around a synchronous callback.
    pub fn sync<F>(
        namespace: impl Into<String>,
        name: impl Into<String>,
        callback: F,
    ) -> Self
    where
        F: Fn(Value) -> Result<Value, anyhow::Error> + Send + Sync + 'static,
    {
        Self::new(namespace, name, ToolCallback::Sync(Arc::new(callback)))
    }

    /// Create a descriptor around an asynchronous callback.
    pub fn async_tool(
        namespace: impl Into<String>,
        name: impl Into<String>,
        tool: impl AsyncTool + 'static,
    ) -> Self {
        Self::new(namespace, name, ToolCallback::Async(Arc::new(tool)))
    }

    fn new(namespace: impl Into<String>, name: impl Into<String>, callback: ToolCallback) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            description: None,
            callback,
            input_schema: None,
            output_schema: None,
            input_validator: None,
            output_validator: None,
        }
    }

    /// Set the human-readable description announced to the peer.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the JSON Schema the peer's arguments must satisfy.
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Set the JSON Schema the callback's return value must satisfy.
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Qualified `namespace.name` form used in logs and error messages.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// The wire shape announced via `register_tool`.
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            output_schema: self.output_schema.clone(),
        }
    }

    /// Compile the raw schemas into validators (draft 2020-12).
    ///
    /// Called once when the descriptor enters a registry; a schema that does
    /// not compile keeps the descriptor out of the registry.
    pub(crate) fn compile_schemas(&mut self) -> Result<(), String> {
        if let Some(schema) = &self.input_schema {
            let validator = jsonschema::draft202012::options()
                .build(schema)
                .map_err(|e| e.to_string())?;
            self.input_validator = Some(validator);
        }
        if let Some(schema) = &self.output_schema {
            let validator = jsonschema::draft202012::options()
                .build(schema)
                .map_err(|e| e.to_string())?;
            self.output_validator = Some(validator);
        }
        Ok(())
    }

    /// Validate inbound arguments. A descriptor without an input schema
    /// accepts anything.
    pub fn validate_input(&self, args: &Value) -> Result<(), String> {
        match &self.input_validator {
            Some(validator) => validator.validate(args).map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }

    /// Validate the callback's return value against the output schema.
    pub fn validate_output(&self, value: &Value) -> Result<(), String> {
        match &self.output_validator {
            Some(validator) => validator.validate(value).map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }

    /// Run the callback, awaiting it if the descriptor is async.
    pub async fn invoke(&self, args: Value) -> Result<Value, anyhow::Error> {
        match &self.callback {
            ToolCallback::Sync(f) => f(args),
            ToolCallback::Async(tool) => tool.invoke(args).await,
        }
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("kind", &self.callback.kind())
            .field("has_input_schema", &self.input_schema.is_some())
            .field("has_output_schema", &self.output_schema.is_some())
            .finish()
    }
}

/// Simple addition tool for testing purposes.
pub fn add_tool() -> ToolDescriptor {
    ToolDescriptor::sync("math", "add", |args| {
        let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
        let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
        Ok(serde_json::json!(a + b))
    })
    .with_description("Adds two integers")
    .with_input_schema(serde_json::json!({
        "type": "object",
        "properties": {
            "a": {"type": "number"},
            "b": {"type": "number"}
        },
        "required": ["a", "b"]
    }))
}
