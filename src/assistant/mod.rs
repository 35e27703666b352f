//! Read-only queries the AI assistant may run for a signed-in user. Each tool
//! belongs to a module, and a user only sees and calls the tools whose module
//! they hold.

mod tool;
mod toolset;
pub mod tools;

pub use tool::{AsyncTool, ToolContext};
pub use toolset::{ToolCallError, ToolObject, ToolSet, ToolSetCreationError};
