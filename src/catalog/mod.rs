//! Tool catalog built from an OpenAPI document
//!
//! Every `paths.<path>.<method>` operation becomes one tool named after its
//! `operationId`. Parameter schemas are copied recursively (object
//! `properties`, array `items`); `$ref` targets are not followed, so a
//! referenced schema surfaces without a `type`.
//!
//! A JSON request body is exposed as the reserved `requestBody` argument
//! next to the declared parameters.

mod source;

pub use source::{CatalogSource, HttpCatalogSource, StaticCatalogSource};

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{GatewayError, Result};
use crate::types::{ParameterSchema, ToolDefinition};

/// Argument name carrying the JSON request body of an operation
pub const REQUEST_BODY_KEY: &str = "requestBody";

const OPERATION_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// HTTP method of a route, closed over what the dispatcher can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    Get,
    Post,
    /// Declared in the document but not dispatchable
    Unsupported(String),
}

impl RouteKind {
    /// Classify a method name, case-insensitively.
    pub fn from_method(method: &str) -> Self {
        if method.eq_ignore_ascii_case("get") {
            Self::Get
        } else if method.eq_ignore_ascii_case("post") {
            Self::Post
        } else {
            Self::Unsupported(method.to_ascii_uppercase())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Unsupported(method) => method,
        }
    }
}

/// Where a tool call is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBinding {
    /// Path template as written in the document
    pub path: String,
    pub kind: RouteKind,
}

impl RouteBinding {
    pub fn new(path: impl Into<String>, kind: RouteKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Tools advertised to the model plus the route of each.
///
/// Invariant: every tool name has exactly one route binding.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
    routes: HashMap<String, RouteBinding>,
}

impl ToolCatalog {
    /// Catalog with no tools.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn routes(&self) -> &HashMap<String, RouteBinding> {
        &self.routes
    }

    pub fn route(&self, tool_name: &str) -> Option<&RouteBinding> {
        self.routes.get(tool_name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Insert or replace a tool; a repeated name keeps its first position
    /// but takes the later definition and route.
    fn upsert(&mut self, tool: ToolDefinition, route: RouteBinding) {
        match self.tools.iter_mut().find(|t| t.name == tool.name) {
            Some(existing) => {
                tracing::warn!(
                    tool = %tool.name,
                    path = %route.path,
                    "duplicate operationId, later operation wins"
                );
                *existing = tool.clone();
            }
            None => self.tools.push(tool.clone()),
        }
        self.routes.insert(tool.name, route);
    }
}

/// Build the tool catalog for an OpenAPI document.
///
/// Fails on a document without a `paths` object, on a path item that is
/// not an object or declares no operation, and on operations lacking an
/// `operationId`.
pub fn build_catalog(document: &Value) -> Result<ToolCatalog> {
    let paths = document
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| GatewayError::InvalidDocument("missing 'paths' object".into()))?;

    let mut catalog = ToolCatalog::default();

    for (path, item) in paths {
        let item = item.as_object().ok_or_else(|| {
            GatewayError::InvalidDocument(format!("path item '{path}' is not an object"))
        })?;

        let mut declared = 0usize;
        for method in OPERATION_METHODS {
            let Some(operation) = item.get(method) else {
                continue;
            };
            declared += 1;
            let (tool, route) = build_operation(path, method, operation)?;
            catalog.upsert(tool, route);
        }

        if declared == 0 {
            return Err(GatewayError::InvalidDocument(format!(
                "path item '{path}' declares no operations"
            )));
        }
    }

    tracing::debug!(tools = catalog.len(), "built tool catalog");
    Ok(catalog)
}

fn build_operation(
    path: &str,
    method: &str,
    operation: &Value,
) -> Result<(ToolDefinition, RouteBinding)> {
    let label = format!("{} {path}", method.to_ascii_uppercase());
    let operation = operation
        .as_object()
        .ok_or_else(|| GatewayError::InvalidDocument(format!("operation {label} is not an object")))?;

    let name = operation
        .get("operationId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            GatewayError::InvalidDocument(format!("operation {label} has no operationId"))
        })?;

    let description = operation
        .get("summary")
        .or_else(|| operation.get("description"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut parameters = ParameterSchema::default();

    for param in operation
        .get("parameters")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
    {
        let Some(param_name) = param.get("name").and_then(Value::as_str) else {
            tracing::warn!(operation = name, "skipping parameter without a name");
            continue;
        };
        let schema = param
            .get("schema")
            .map(resolve_schema)
            .unwrap_or_else(|| Value::Object(Map::new()));
        parameters.properties.insert(param_name.to_string(), schema);

        if param.get("required").and_then(Value::as_bool) == Some(true) {
            parameters.required.push(param_name.to_string());
        }
    }

    if let Some(body_schema) = operation
        .get("requestBody")
        .and_then(|body| body.get("content"))
        .and_then(|content| content.get("application/json"))
        .and_then(|json| json.get("schema"))
    {
        parameters
            .properties
            .insert(REQUEST_BODY_KEY.to_string(), resolve_schema(body_schema));
    }

    Ok((
        ToolDefinition::new(name, description, parameters),
        RouteBinding::new(path, RouteKind::from_method(method)),
    ))
}

/// Recursive copy of the parts of a schema the model needs.
fn resolve_schema(schema: &Value) -> Value {
    let mut out = Map::new();

    for key in ["type", "description", "enum", "format"] {
        if let Some(value) = schema.get(key) {
            out.insert(key.to_string(), value.clone());
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object)
        && !properties.is_empty()
    {
        let resolved = properties
            .iter()
            .map(|(name, prop)| (name.clone(), resolve_schema(prop)))
            .collect();
        out.insert("properties".to_string(), Value::Object(resolved));
    }

    if let Some(items) = schema.get("items") {
        out.insert("items".to_string(), resolve_schema(items));
    }

    Value::Object(out)
}
