use mongodb::Database;
use rocket::{
    serde::json::{serde_json, Json},
    Route, State,
};

use crate::{
    assistant::{ToolContext, ToolSet},
    config::Config,
    error::Error,
    model::{
        api::{
            auth::Permit,
            chat::{ToolOutput, ToolView},
            envelope::{ok, Reply},
        },
        common::gate,
    },
};

type Chat = Permit<gate::Chat>;

pub fn routes() -> Vec<Route> {
    routes![list_tools, call_tool]
}

/// The tools the caller's modules allow, by name.
#[get("/api/chat/tools")]
async fn list_tools(permit: Chat, tools: &State<ToolSet>) -> Reply<Vec<ToolView>> {
    ok(tools
        .visible_to(&permit.permissions)
        .into_iter()
        .map(Into::into)
        .collect())
}

/// Run one tool with the assistant's arguments as the body.
#[post("/api/chat/tools/<name>", data = "<args>", format = "json")]
async fn call_tool(
    permit: Chat,
    name: &str,
    args: Json<serde_json::Value>,
    tools: &State<ToolSet>,
    db: &State<Database>,
    config: &State<Config>,
) -> Reply<ToolOutput> {
    let ctx = ToolContext {
        db: db.inner().clone(),
        today: config.today(),
    };
    let summary = tools
        .try_tool_call(name, args.into_inner(), &permit.permissions, &ctx)
        .await
        .map_err(Error::from)?;
    info!("{} called {name}", permit.user.username);
    ok(ToolOutput {
        tool: name.to_string(),
        summary,
    })
}
