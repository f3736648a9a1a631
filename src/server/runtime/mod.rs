//! MCP server startup and tool registration.
mod server_info;
mod startup;
mod tool_registry;

pub use server_info::build_instructions;
pub use startup::{publish_target, run_server, start_registration, RuntimeExit};
pub use tool_registry::RegistryMcpServer;
