//! End-to-end tests of the `azurearm` binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUB: &str = "00000000-0000-0000-0000-000000000001";

fn file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// The binary with an empty configuration and no credentials from the
/// environment.
fn azurearm(config: &NamedTempFile) -> Command {
    let mut cmd = Command::cargo_bin("azurearm").unwrap();
    cmd.arg("--no-color")
        .arg("-c")
        .arg(config.path())
        .env_remove("AZUREARM_PROFILE")
        .env_remove("AZURE_SUBSCRIPTION_ID")
        .env_remove("RUST_LOG");
    cmd
}

fn empty_config() -> NamedTempFile {
    file(".toml", "")
}

#[test]
fn test_help() {
    Command::cargo_bin("azurearm")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Azure Resource Manager"));
}

#[test]
fn test_functions_lists_states_only() {
    let config = empty_config();
    azurearm(&config)
        .args(["functions", "--states"])
        .assert()
        .success()
        .stdout(predicate::str::contains("State functions ("))
        .stdout(predicate::str::contains("azurearm_network.virtual_network_present"))
        .stdout(predicate::str::contains("azurearm_network.virtual_network_get").not());
}

#[test]
fn test_functions_json_filter() {
    let config = empty_config();
    let output = azurearm(&config)
        .args(["--output", "json", "functions", "--execution", "lock"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let names: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(!names.is_empty());
    assert!(names.iter().all(|n| n.contains("lock")));
}

#[test]
fn test_unknown_function_exit_code() {
    let config = empty_config();
    azurearm(&config)
        .args(["call", "azurearm_network.nothing"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("azurearm_network.nothing"));
}

#[test]
fn test_malformed_argument_exit_code() {
    let config = empty_config();
    azurearm(&config)
        .args(["call", "azurearm_network.virtual_network_get", "vnet1"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("expected key=value"));
}

#[test]
fn test_unknown_profile_exit_code() {
    let config = empty_config();
    azurearm(&config)
        .args(["-p", "nope", "call", "azurearm_resource.resource_groups_list"])
        .assert()
        .code(4);
}

#[test]
fn test_apply_without_credentials_fails_the_state() {
    let config = empty_config();
    let states = file(
        ".yml",
        "rg1:\n  azurearm_resource.resource_group_present:\n    - location: eastus\n",
    );
    azurearm(&config)
        .arg("apply")
        .arg(states.path())
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "Connection information must be specified via connection_auth dictionary!",
        ))
        .stdout(predicate::str::contains("failed=1"));
}

#[test]
fn test_apply_rejects_execution_functions() {
    let config = empty_config();
    let states = file(
        ".yml",
        "rg1:\n  azurearm_resource.resource_group_get:\n    - name: rg1\n",
    );
    azurearm(&config)
        .arg("apply")
        .arg(states.path())
        .assert()
        .code(5)
        .stderr(predicate::str::contains("is not a state function"));
}

// ============================================================================
// Against a mock resource manager
// ============================================================================

async fn resource_manager() -> MockServer {
    let server = MockServer::start().await;
    let group = format!("/subscriptions/{}/resourceGroups/rg1", SUB);
    Mock::given(method("HEAD"))
        .and(path(group.as_str()))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(group.as_str()))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": group,
            "name": "rg1",
            "location": "eastus",
            "tags": {"env": "prod"},
            "properties": {"provisioningState": "Succeeded"},
        })))
        .mount(&server)
        .await;
    server
}

fn profile_config(server: &MockServer) -> NamedTempFile {
    file(
        ".toml",
        &format!(
            "[profiles.mock]\nsubscription_id = \"{}\"\nbase_url = \"{}\"\naccess_token = \"tok\"\n",
            SUB,
            server.uri()
        ),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_call_against_mock_server() {
    let server = resource_manager().await;
    let config = profile_config(&server);

    let output = azurearm(&config)
        .args([
            "-p",
            "mock",
            "--output",
            "json",
            "call",
            "azurearm_resource.resource_group_get",
            "name=rg1",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let group: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(group["location"], json!("eastus"));
    assert_eq!(group["provisioning_state"], json!("Succeeded"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_apply_against_mock_server_is_idempotent() {
    let server = resource_manager().await;
    let config = profile_config(&server);
    let states = file(
        ".yml",
        "rg1:\n  azurearm_resource.resource_group_present:\n    - location: eastus\n    - tags:\n        env: prod\n",
    );

    let output = azurearm(&config)
        .args(["-p", "mock", "--output", "json", "apply"])
        .arg(states.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["ok"], json!(1));
    assert_eq!(report["states"][0]["status"], json!("ok"));
    assert_eq!(
        report["states"][0]["comment"],
        json!("Resource group rg1 is already present.")
    );
    assert!(server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .all(|r| r.method.as_str() != "PUT"));
}
