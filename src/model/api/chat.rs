use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};

use crate::{assistant::ToolObject, model::common::Module};

/// A tool the caller may hand to the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolView {
    pub name: String,
    pub description: String,
    pub module: Module,
    pub input_schema: RootSchema,
}

impl From<&ToolObject> for ToolView {
    fn from(tool: &ToolObject) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.to_string(),
            module: tool.module,
            input_schema: tool.input_schema.clone(),
        }
    }
}

/// What a tool call produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool: String,
    pub summary: String,
}
