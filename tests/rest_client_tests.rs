//! HTTP-level tests for the resource manager client and the token
//! credentials, against a local mock server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use azurearm::azure::auth::{
    CachedCredential, ClientSecretCredential, StaticTokenCredential, TokenCredential,
};
use azurearm::azure::paging::paged_object_to_list;
use azurearm::azure::{
    ArmClient, ArmError, ArmRequest, AuthError, ClientConfig, DefaultClientFactory, RestClient,
};
use azurearm::modules::{ModuleContext, ModuleRegistry};
use common::{exec_params, SUB};

fn rest_client(server: &MockServer) -> RestClient {
    let config = ClientConfig {
        base_url: server.uri(),
        poll_interval: Duration::from_millis(10),
        lro_timeout: Duration::from_secs(5),
        ..ClientConfig::default()
    };
    RestClient::new(config, SUB, Arc::new(StaticTokenCredential::new("token"))).unwrap()
}

// ============================================================================
// RestClient
// ============================================================================

#[tokio::test]
async fn test_get_sends_bearer_and_api_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/s/resourceGroups/rg1"))
        .and(query_param("api-version", "2022-09-01"))
        .and(header("authorization", "Bearer token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "rg1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = rest_client(&server);
    let response = client
        .send(ArmRequest::get("/subscriptions/s/resourceGroups/rg1", "2022-09-01"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body["name"], json!("rg1"));
}

#[tokio::test]
async fn test_error_body_becomes_cloud_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": "InvalidResourceName", "message": "Name is invalid."}
        })))
        .mount(&server)
        .await;

    let client = rest_client(&server);
    let err = client
        .send(ArmRequest::put("/subscriptions/s/resourceGroups/bad!", "1").body(json!({})))
        .await
        .unwrap_err();
    match err {
        ArmError::Cloud(e) => {
            assert_eq!(e.code, "InvalidResourceName");
            assert_eq!(e.status, Some(400));
            assert_eq!(
                e.to_string(),
                "Azure Error: InvalidResourceName\nMessage: Name is invalid."
            );
        }
        other => panic!("expected a cloud error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_head_not_found_is_a_status() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = rest_client(&server);
    let response = client
        .send(ArmRequest::head("/subscriptions/s/resourceGroups/none", "1"))
        .await
        .unwrap();
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_put_waits_for_async_operation() {
    let server = MockServer::start().await;
    let resource = "/subscriptions/s/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/v";
    Mock::given(method("PUT"))
        .and(path(resource))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header(
                    "Azure-AsyncOperation",
                    format!("{}/operations/op1", server.uri()).as_str(),
                )
                .set_body_json(json!({"properties": {"provisioningState": "Updating"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(resource))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "v",
            "properties": {"provisioningState": "Succeeded"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = rest_client(&server);
    let response = client
        .send(ArmRequest::put(resource, "2018-11-01").body(json!({"location": "eastus"})))
        .await
        .unwrap();
    assert_eq!(
        response.body["properties"]["provisioningState"],
        json!("Succeeded")
    );
}

#[tokio::test]
async fn test_failed_async_operation_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(202).insert_header(
            "Azure-AsyncOperation",
            format!("{}/operations/op2", server.uri()).as_str(),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": {"code": "InUseSubnetCannotBeDeleted", "message": "Subnet is in use."}
        })))
        .mount(&server)
        .await;

    let client = rest_client(&server);
    let err = client
        .send(ArmRequest::delete("/subscriptions/s/x", "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ArmError::Cloud(e) if e.code == "InUseSubnetCannotBeDeleted"));
}

#[tokio::test]
async fn test_paging_follows_next_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/s/resourcegroups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"name": "a"}],
            "nextLink": format!("{}/page2?api-version=1", server.uri()),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"value": [{"name": "b"}]})),
        )
        .mount(&server)
        .await;

    let client = rest_client(&server);
    let items = paged_object_to_list(&client, ArmRequest::get("/subscriptions/s/resourcegroups", "1"))
        .await
        .unwrap();
    let names: Vec<_> = items.iter().map(|i| i["name"].clone()).collect();
    assert_eq!(names, vec![json!("a"), json!("b")]);
}

// ============================================================================
// Credentials
// ============================================================================

fn secret_credential(server: &MockServer) -> ClientSecretCredential {
    ClientSecretCredential {
        http: reqwest::Client::new(),
        authority_host: server.uri(),
        tenant: "tenant1".to_string(),
        client_id: "app".to_string(),
        secret: "hunter2".to_string(),
        resource: "https://management.core.windows.net/".to_string(),
    }
}

#[tokio::test]
async fn test_service_principal_token_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant1/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "sp-token",
            "expires_in": "3600",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = CachedCredential::new(Box::new(secret_credential(&server)));
    let first = credential.get_token().await.unwrap();
    let second = credential.get_token().await.unwrap();
    assert_eq!(first.token, "sp-token");
    assert_eq!(second.token, "sp-token");
}

#[tokio::test]
async fn test_token_error_description_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided.",
        })))
        .mount(&server)
        .await;

    let err = secret_credential(&server).get_token().await.unwrap_err();
    match err {
        AuthError::TokenRequest { message, .. } => {
            assert!(message.starts_with("AADSTS7000215"));
        }
        other => panic!("expected a token error, got {:?}", other),
    }
}

// ============================================================================
// Through the registry
// ============================================================================

#[tokio::test]
async fn test_execution_function_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/subscriptions/{}/resourceGroups/rg1", SUB)))
        .and(header("authorization", "Bearer pre-acquired"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": format!("/subscriptions/{}/resourceGroups/rg1", SUB),
            "name": "rg1",
            "location": "eastus",
            "properties": {"provisioningState": "Succeeded"},
        })))
        .mount(&server)
        .await;

    let factory = DefaultClientFactory::new(ClientConfig::default()).unwrap();
    let ctx = ModuleContext::new(Arc::new(factory));
    let mut params = exec_params(json!({"name": "rg1"}));
    params.insert("base_url".to_string(), json!(server.uri()));
    params.insert("access_token".to_string(), json!("pre-acquired"));

    let group = ModuleRegistry::with_builtins()
        .call("azurearm_resource.resource_group_get", &ctx, &params)
        .await
        .unwrap();
    assert_eq!(group["location"], json!("eastus"));
    assert_eq!(group["provisioning_state"], json!("Succeeded"));
}
