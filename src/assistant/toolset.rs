use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use rocket::{http::Status, serde::json::serde_json};
use schemars::{gen::SchemaGenerator, schema::RootSchema};
use thiserror::Error;

use crate::{
    error::{Error, Result},
    model::common::{Module, Permissions},
};

use super::tool::{AsyncTool, ToolContext};

type CallFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Deserialize `T` from the arguments, then call it.
type ErasedCall =
    for<'a> fn(serde_json::Value, &'a ToolContext) -> std::result::Result<CallFuture<'a>, serde_json::Error>;

fn erased_call<'a, T: AsyncTool>(
    args: serde_json::Value,
    ctx: &'a ToolContext,
) -> std::result::Result<CallFuture<'a>, serde_json::Error> {
    let tool: T = serde_json::from_value(args)?;
    Ok(Box::pin(async move { tool.call(ctx).await }))
}

/// A registered tool with its input type erased.
pub struct ToolObject {
    pub name: &'static str,
    pub description: &'static str,
    pub module: Module,
    pub input_schema: RootSchema,
    call: ErasedCall,
}

impl ToolObject {
    fn from_tool<T: AsyncTool>() -> Self {
        Self {
            name: T::NAME,
            description: T::DESCRIPTION,
            module: T::MODULE,
            input_schema: SchemaGenerator::default().into_root_schema_for::<T>(),
            call: erased_call::<T>,
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolSetCreationError {
    #[error("Two or more tools are named '{0}'")]
    NameConflict(&'static str),
}

#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("No tool named '{0}'")]
    NotFound(String),
    #[error("The {0} module is needed to use this tool")]
    Forbidden(Module),
    #[error("Invalid tool arguments: {0}")]
    Deserialization(serde_json::Error),
    #[error(transparent)]
    Failed(#[from] Error),
}

impl From<ToolCallError> for Error {
    fn from(err: ToolCallError) -> Self {
        match err {
            ToolCallError::NotFound(_) => Error::Status(Status::NotFound, err.to_string()),
            ToolCallError::Forbidden(_) => Error::forbidden(err.to_string()),
            ToolCallError::Deserialization(_) => Error::bad_request(err.to_string()),
            ToolCallError::Failed(err) => err,
        }
    }
}

/// The tools available to the assistant, keyed by unique name.
#[derive(Default)]
pub struct ToolSet {
    tools: HashMap<&'static str, ToolObject>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tool<T: AsyncTool>(mut self) -> std::result::Result<Self, ToolSetCreationError> {
        if self.tools.contains_key(T::NAME) {
            return Err(ToolSetCreationError::NameConflict(T::NAME));
        }
        self.tools.insert(T::NAME, ToolObject::from_tool::<T>());
        Ok(self)
    }

    /// The tools a user with these permissions may call, by name.
    pub fn visible_to(&self, permissions: &Permissions) -> Vec<&ToolObject> {
        let mut visible: Vec<&ToolObject> = self
            .tools
            .values()
            .filter(|tool| permissions.grants(tool.module))
            .collect();
        visible.sort_by_key(|tool| tool.name);
        visible
    }

    /// Look up a tool, check the caller may use it, parse the arguments and
    /// run it.
    pub async fn try_tool_call(
        &self,
        name: &str,
        args: serde_json::Value,
        permissions: &Permissions,
        ctx: &ToolContext,
    ) -> std::result::Result<String, ToolCallError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolCallError::NotFound(name.to_string()))?;
        if !permissions.grants(tool.module) {
            return Err(ToolCallError::Forbidden(tool.module));
        }
        let call = (tool.call)(args, ctx).map_err(ToolCallError::Deserialization)?;
        Ok(call.await?)
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        list.entries(self.tools.keys());
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use schemars::JsonSchema;
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize, JsonSchema)]
    struct Echo {
        text: String,
    }

    #[rocket::async_trait]
    impl AsyncTool for Echo {
        const NAME: &'static str = "echo";
        const DESCRIPTION: &'static str = "Repeat the text";
        const MODULE: Module = Module::Chat;

        async fn call(&self, _ctx: &ToolContext) -> Result<String> {
            Ok(self.text.clone())
        }
    }

    #[derive(Deserialize, JsonSchema)]
    struct EchoAgain {}

    #[rocket::async_trait]
    impl AsyncTool for EchoAgain {
        const NAME: &'static str = "echo";
        const DESCRIPTION: &'static str = "Also called echo";
        const MODULE: Module = Module::Projects;

        async fn call(&self, _ctx: &ToolContext) -> Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn names_must_be_unique() {
        let tools = ToolSet::new().add_tool::<Echo>().unwrap();
        assert!(matches!(
            tools.add_tool::<EchoAgain>(),
            Err(ToolSetCreationError::NameConflict("echo"))
        ));
    }

    #[test]
    fn visibility_follows_module() {
        let tools = ToolSet::new().add_tool::<Echo>().unwrap();
        assert_eq!(
            tools
                .visible_to(&Permissions::from_modules([Module::Chat]))
                .len(),
            1
        );
        assert!(tools
            .visible_to(&Permissions::from_modules([Module::Projects]))
            .is_empty());
        assert_eq!(
            tools
                .visible_to(&Permissions::from_modules([Module::Admin]))
                .len(),
            1
        );
    }

    #[test]
    fn schema_describes_input() {
        let tools = ToolSet::new().add_tool::<Echo>().unwrap();
        let echo = &tools.visible_to(&Permissions::from_modules([Module::Chat]))[0];
        let schema = serde_json::to_value(&echo.input_schema).unwrap();
        assert!(schema["properties"]["text"].is_object());
        assert_eq!(schema["required"][0], "text");
    }

    #[test]
    fn error_statuses() {
        assert_eq!(
            Error::from(ToolCallError::NotFound("x".to_string())).status(),
            Status::NotFound
        );
        assert_eq!(
            Error::from(ToolCallError::Forbidden(Module::Voters)).status(),
            Status::Forbidden
        );
        let bad_args = serde_json::from_str::<Echo>("{}").err().unwrap();
        assert_eq!(
            Error::from(ToolCallError::Deserialization(bad_args)).status(),
            Status::BadRequest
        );
    }
}
