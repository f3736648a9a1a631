use std::{collections::HashMap, sync::Arc};

use rmcp::{
    handler::server::{tool::ToolCallContext, wrapper::Parameters, ServerHandler},
    model::{
        CallToolRequestParam, CallToolResult, ErrorData, Implementation, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    tool, tool_router, Json, RoleServer,
};

use crate::{
    catalog::{CatalogEntry, LiveCatalog},
    server::config::ServerConfig,
    sync::{ListingOverride, SyncError, ToolHost},
    tools::{
        self, arithmetic, clock, ArithmeticRequest, ArithmeticResponse, DatetimeResponse,
        ServerToolRouter,
    },
};

/// MCP server exposing the demo tools; its listing can be routed through a live catalog.
#[derive(Clone)]
pub struct RegistryMcpServer {
    config: Arc<ServerConfig>,
    instructions: Arc<String>,
    tool_router: ServerToolRouter<Self>,
    listing: ListingOverride,
}

impl RegistryMcpServer {
    pub fn new(config: ServerConfig, instructions: String) -> Self {
        Self {
            config: Arc::new(config),
            instructions: Arc::new(instructions),
            tool_router: tools::build_router(Self::tool_router),
            listing: ListingOverride::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Tools a `tools/list` request returns right now.
    pub fn listed_tools(&self) -> Vec<Tool> {
        let registered = self.tool_router.list_all();
        match self.listing.current() {
            Some(catalog) => apply_catalog(registered, &catalog),
            None => registered,
        }
    }
}

/// Registered tools narrowed and redescribed by [`LiveCatalog::list_entries`].
fn apply_catalog(registered: Vec<Tool>, catalog: &LiveCatalog) -> Vec<Tool> {
    let mut listed: HashMap<String, String> = catalog
        .list_entries()
        .into_iter()
        .map(|entry| (entry.name, entry.description))
        .collect();
    registered
        .into_iter()
        .filter_map(|mut tool| {
            let description = listed.remove(&*tool.name)?;
            tool.description = Some(description.into());
            Some(tool)
        })
        .collect()
}

fn catalog_entry(tool: &Tool) -> CatalogEntry {
    CatalogEntry::new(
        tool.name.to_string(),
        tool.description.as_deref().unwrap_or_default(),
        tool.input_schema.as_ref().clone(),
    )
}

#[tool_router(router = tool_router)]
impl RegistryMcpServer {
    #[tool(name = "add", description = "Add two numbers")]
    async fn add(
        &self,
        Parameters(request): Parameters<ArithmeticRequest>,
    ) -> Result<Json<ArithmeticResponse>, ErrorData> {
        arithmetic::add(&request).map(Json)
    }

    #[tool(name = "minus", description = "Subtract two numbers")]
    async fn minus(
        &self,
        Parameters(request): Parameters<ArithmeticRequest>,
    ) -> Result<Json<ArithmeticResponse>, ErrorData> {
        arithmetic::minus(&request).map(Json)
    }

    #[tool(name = "get_datetime", description = "Get current datetime as string")]
    async fn get_datetime(&self) -> Result<Json<DatetimeResponse>, ErrorData> {
        Ok(Json(clock::now()))
    }
}

impl ServerHandler for RegistryMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
                ..Implementation::from_build_env()
            },
            instructions: Some((*self.instructions).clone()),
            ..ServerInfo::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.listed_tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let call = ToolCallContext::new(self, request, context);
        self.tool_router.call(call).await
    }
}

impl ToolHost for RegistryMcpServer {
    fn has_tool_listing(&self) -> bool {
        !self.tool_router.list_all().is_empty()
    }

    fn registered_entries(&self) -> Vec<CatalogEntry> {
        self.tool_router.list_all().iter().map(catalog_entry).collect()
    }

    fn override_listing(&self, catalog: Arc<LiveCatalog>) -> Result<(), SyncError> {
        self.listing.install(catalog)
    }
}
