//! Tool definitions advertised to the model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Object schema describing a tool's arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Property name -> resolved schema
    pub properties: Map<String, Value>,
    /// Names of required properties
    pub required: Vec<String>,
}

impl ParameterSchema {
    /// Render as a JSON schema object.
    pub fn to_json(&self) -> Value {
        json!({
            "type": "object",
            "properties": Value::Object(self.properties.clone()),
            "required": self.required,
        })
    }
}

/// A callable tool: one API operation exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Function-tool entry for a chat-completions `tools` array.
    pub fn to_openai_tool(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters.to_json(),
            }
        })
    }
}
