use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use nacos_mcp_sync::{
    registry::{ConfigStore, InMemoryRegistry, RegistryClient, TOOLS_GROUP},
    server::{
        config::{ServerConfig, ServerSection},
        runtime::RegistryMcpServer,
    },
    sync::{spawn_registration, PublishTarget, RegistrationOutcome, ServerIdentity},
};
use rmcp::{
    model::{CallToolRequestParam, ClientInfo},
    serve_client, RoleClient, ServiceExt,
    service::RunningService,
};
use serde_json::json;

fn server_config() -> ServerConfig {
    ServerConfig {
        server: ServerSection {
            host: "127.0.0.1".into(),
            port: 18002,
            name: "calc".into(),
            version: "1.0.0".into(),
            instructions: None,
        },
        registry: None,
        source_path: PathBuf::from("config.toml"),
    }
}

fn identity() -> ServerIdentity {
    ServerIdentity {
        name: "calc".into(),
        description: None,
        version: "1.0.0".into(),
    }
}

async fn connect(
    server: RegistryMcpServer,
) -> Result<RunningService<RoleClient, ClientInfo>> {
    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    tokio::spawn(async move {
        if let Ok(running) = server.serve(server_io).await {
            let _ = running.waiting().await;
        }
    });
    Ok(serve_client(ClientInfo::default(), client_io).await?)
}

async fn listed_names(client: &RunningService<RoleClient, ClientInfo>) -> Result<Vec<String>> {
    let list = client.list_tools(None).await?;
    let mut names: Vec<String> = list.tools.iter().map(|tool| tool.name.to_string()).collect();
    names.sort();
    Ok(names)
}

#[tokio::test]
async fn remote_overlay_disables_and_redescribes_tools_over_mcp() -> Result<()> {
    let memory = Arc::new(InMemoryRegistry::new());
    memory
        .publish_config(
            "calc-mcp-tools.json",
            TOOLS_GROUP,
            &json!({
                "tools": [{"name": "minus", "description": "Subtract b from a"}],
                "toolsMeta": {"add": {"enabled": false}}
            })
            .to_string(),
        )
        .await?;
    let server = RegistryMcpServer::new(server_config(), "test".into());

    let outcome = spawn_registration(
        Arc::new(server.clone()),
        RegistryClient::new(memory.clone(), memory.clone()),
        identity(),
        PublishTarget::Local,
    )
    .await?;
    match outcome {
        RegistrationOutcome::Completed(report) => assert!(report.is_complete()),
        RegistrationOutcome::Panicked(reason) => panic!("registration panicked: {reason}"),
    }

    let client = connect(server).await?;
    assert_eq!(listed_names(&client).await?, vec!["get_datetime", "minus"]);
    let list = client.list_tools(None).await?;
    let minus = list
        .tools
        .iter()
        .find(|tool| tool.name.as_ref() == "minus")
        .context("minus listed")?;
    assert_eq!(minus.description.as_deref(), Some("Subtract b from a"));

    let published = memory
        .document("calc-mcp-tools.json", TOOLS_GROUP)
        .context("tools document published")?;
    let published: serde_json::Value = serde_json::from_str(&published)?;
    let names: Vec<&str> = published["tools"]
        .as_array()
        .context("tools array")?
        .iter()
        .filter_map(|entry| entry["name"].as_str())
        .collect();
    assert_eq!(names.len(), 3);
    assert_eq!(published["toolsMeta"]["add"]["enabled"], json!(false));
    assert!(memory.document("calc-mcp-server.json", "mcp-server").is_some());

    client.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn watch_update_reenables_tool_for_connected_client() -> Result<()> {
    let memory = Arc::new(InMemoryRegistry::new());
    memory
        .publish_config(
            "calc-mcp-tools.json",
            TOOLS_GROUP,
            &json!({"tools": [], "toolsMeta": {"add": {"enabled": false}}}).to_string(),
        )
        .await?;
    let server = RegistryMcpServer::new(server_config(), "test".into());
    spawn_registration(
        Arc::new(server.clone()),
        RegistryClient::new(memory.clone(), memory.clone()),
        identity(),
        PublishTarget::Local,
    )
    .await?;

    let client = connect(server).await?;
    assert_eq!(listed_names(&client).await?, vec!["get_datetime", "minus"]);

    memory
        .publish_config(
            "calc-mcp-tools.json",
            TOOLS_GROUP,
            &json!({"tools": [], "toolsMeta": {}}).to_string(),
        )
        .await?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let names = listed_names(&client).await?;
        if names == vec!["add", "get_datetime", "minus"] {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "add was not re-enabled: {names:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    client.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn unavailable_registry_keeps_local_listing_and_tools_callable() -> Result<()> {
    let memory = Arc::new(InMemoryRegistry::new());
    memory.set_unavailable(true);
    let server = RegistryMcpServer::new(server_config(), "test".into());

    let outcome = spawn_registration(
        Arc::new(server.clone()),
        RegistryClient::new(memory.clone(), memory.clone()),
        identity(),
        PublishTarget::Local,
    )
    .await?;
    match outcome {
        RegistrationOutcome::Completed(report) => {
            assert!(report.sync.is_err());
            assert!(report.descriptor.is_err());
        }
        RegistrationOutcome::Panicked(reason) => panic!("registration panicked: {reason}"),
    }

    let client = connect(server).await?;
    assert_eq!(
        listed_names(&client).await?,
        vec!["add", "get_datetime", "minus"]
    );

    let result = client
        .call_tool(CallToolRequestParam {
            name: "add".into(),
            arguments: json!({"a": 2, "b": 3}).as_object().cloned(),
        })
        .await?;
    assert_eq!(result.structured_content, Some(json!({"result": 5})));

    client.cancel().await?;
    Ok(())
}
