use std::{
    process::{Command as StdCommand, Stdio},
    time::Duration,
};

use anyhow::Result;
use rmcp::{model::ClientInfo, serve_client};
use tokio::time::timeout;

use crate::common::{fixture, spawn_server_process, BINARY_PATH};

async fn listed_tool_names(config_fixture: &str) -> Result<Vec<String>> {
    let (mut child, transport, stderr_task) = spawn_server_process(config_fixture).await?;

    let client = serve_client(ClientInfo::default(), transport).await?;
    let list = client.list_tools(None).await?;
    let mut names: Vec<String> = list.tools.iter().map(|tool| tool.name.to_string()).collect();
    names.sort();

    client.cancel().await?;
    let status = timeout(Duration::from_secs(5), child.wait()).await??;
    assert!(
        status.success(),
        "server should exit cleanly but exit status was {status:?}"
    );
    if let Some(handle) = stderr_task {
        let _ = handle.await;
    }
    Ok(names)
}

#[tokio::test]
async fn stdio_spawn_with_memory_registry_lists_tools() -> Result<()> {
    let names = listed_tool_names("tests/fixtures/config_memory_registry.toml").await?;
    assert_eq!(names, vec!["add", "get_datetime", "minus"]);
    Ok(())
}

#[tokio::test]
async fn unreachable_registry_still_serves_local_catalog() -> Result<()> {
    let names = listed_tool_names("tests/fixtures/config_unreachable_registry.toml").await?;
    assert_eq!(names, vec!["add", "get_datetime", "minus"]);
    Ok(())
}

#[tokio::test]
async fn server_without_registry_lists_tools() -> Result<()> {
    let names = listed_tool_names("tests/fixtures/config_no_registry.toml").await?;
    assert_eq!(names, vec!["add", "get_datetime", "minus"]);
    Ok(())
}

#[test]
fn unknown_transport_exits_with_failure() {
    let output = StdCommand::new(BINARY_PATH)
        .args(["--transport", "sse"])
        .env(
            "MCP_CONFIG_PATH",
            fixture("tests/fixtures/config_no_registry.toml"),
        )
        .stdin(Stdio::null())
        .output()
        .expect("process should start");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Unknown transport: sse"),
        "stderr should name the transport: {stderr}"
    );
}

#[test]
fn missing_server_name_exits_with_failure() {
    let status = StdCommand::new(BINARY_PATH)
        .env(
            "MCP_CONFIG_PATH",
            fixture("tests/fixtures/config_missing_name.toml"),
        )
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("process should start");
    assert!(!status.success());
}
