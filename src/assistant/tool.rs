use chrono::NaiveDate;
use mongodb::Database;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::{error::Result, model::common::Module};

/// What a tool call runs against.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub db: Database,
    /// The constituency's calendar date at the time of the call.
    pub today: NaiveDate,
}

/// A read-only query the assistant can run on the user's behalf.
///
/// The implementing type is the tool's input: its JSON schema is published to
/// the assistant, and each call deserializes the assistant's arguments into it.
#[rocket::async_trait]
pub trait AsyncTool: JsonSchema + DeserializeOwned + Send + Sync + 'static {
    /// Unique name the assistant calls the tool by.
    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    /// The module a user needs to see and call this tool.
    const MODULE: Module;

    /// Run the query, returning a short plain-text summary of the result.
    async fn call(&self, ctx: &ToolContext) -> Result<String>;
}
