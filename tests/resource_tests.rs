//! Integration tests for `azurearm_resource`: resource groups, management
//! locks and policy definitions and assignments.

mod common;

use azurearm::azure::Method;
use azurearm::states::StateStatus;
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;

// ============================================================================
// Resource groups
// ============================================================================

#[tokio::test]
async fn test_resource_group_check_existence() {
    let h = Harness::with_group();
    let exists = h
        .call(
            "azurearm_resource.resource_group_check_existence",
            &exec_params(json!({"name": RG})),
        )
        .await;
    assert_eq!(exists, json!(true));

    let missing = h
        .call(
            "azurearm_resource.resource_group_check_existence",
            &exec_params(json!({"name": "other"})),
        )
        .await;
    assert_eq!(missing, json!(false));
}

#[tokio::test]
async fn test_resource_group_present_creates_then_settles() {
    let h = Harness::new();
    let args = state_params(json!({
        "name": "rg2",
        "location": "westeurope",
        "tags": {"owner": "ops"},
    }));

    let created = h.state("azurearm_resource.resource_group_present", &args).await;
    assert_eq!(created.status(), StateStatus::Changed);
    assert_eq!(created.comment, "Resource group rg2 has been created.");
    assert_eq!(created.changes["new"]["location"], json!("westeurope"));

    let again = h.state("azurearm_resource.resource_group_present", &args).await;
    assert_eq!(again.status(), StateStatus::Ok);
    assert_eq!(again.comment, "Resource group rg2 is already present.");
    assert_eq!(h.client.requests_matching(Method::Put, "resourceGroups/rg2").len(), 1);
}

#[tokio::test]
async fn test_resource_group_tag_change_in_test_mode() {
    let h = Harness::new();
    h.client.seed(
        &group_id("rg2"),
        json!({"location": "westeurope", "tags": {"owner": "ops"}}),
    );
    let args = state_params(json!({
        "name": "rg2",
        "location": "westeurope",
        "tags": {"owner": "dev"},
        "test": true,
    }));

    let ret = h.state("azurearm_resource.resource_group_present", &args).await;
    assert_eq!(ret.result, None);
    assert_eq!(ret.comment, "Resource group rg2 tags would be updated.");
    assert_eq!(ret.changes["old"], json!({"owner": "ops"}));
    assert_eq!(ret.changes["new"], json!({"owner": "dev"}));
    assert!(h.client.requests_matching(Method::Put, "resourceGroups/rg2").is_empty());
}

#[tokio::test]
async fn test_resource_group_absent_twice() {
    let h = Harness::with_group();
    let args = state_params(json!({"name": RG}));

    let first = h.state("azurearm_resource.resource_group_absent", &args).await;
    assert_eq!(first.status(), StateStatus::Changed);
    assert_eq!(first.comment, format!("Resource group {} has been deleted.", RG));

    let second = h.state("azurearm_resource.resource_group_absent", &args).await;
    assert_eq!(second.status(), StateStatus::Ok);
    assert_eq!(second.comment, format!("Resource group {} is already absent.", RG));
}

// ============================================================================
// Management locks
// ============================================================================

#[tokio::test]
async fn test_resource_group_lock_lifecycle() {
    let h = Harness::with_group();
    let args = exec_params(json!({
        "name": "no-delete",
        "resource_group": RG,
        "lock_level": "CanNotDelete",
        "notes": "keep",
    }));

    let created = h
        .call(
            "azurearm_resource.management_lock_create_or_update_at_resource_group_level",
            &args,
        )
        .await;
    assert_eq!(created["name"], json!("no-delete"));
    assert_eq!(created["level"], json!("CanNotDelete"));

    let listed = h
        .call(
            "azurearm_resource.management_locks_list_at_resource_group_level",
            &exec_params(json!({"resource_group": RG})),
        )
        .await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let deleted = h
        .call(
            "azurearm_resource.management_lock_delete_at_resource_group_level",
            &args,
        )
        .await;
    assert_eq!(deleted, json!(true));
}

// ============================================================================
// Policy
// ============================================================================

fn deny_rule() -> serde_json::Value {
    json!({
        "if": {"field": "location", "notIn": ["eastus", "westus"]},
        "then": {"effect": "deny"},
    })
}

#[tokio::test]
async fn test_policy_definition_present_is_idempotent() {
    let h = Harness::new();
    let args = state_params(json!({
        "name": "allowed-locations",
        "policy_rule": deny_rule(),
        "display_name": "Allowed locations",
        "mode": "All",
    }));

    let created = h
        .state("azurearm_resource.policy_definition_present", &args)
        .await;
    assert_eq!(created.status(), StateStatus::Changed);

    let again = h
        .state("azurearm_resource.policy_definition_present", &args)
        .await;
    assert_eq!(again.status(), StateStatus::Ok);
    assert_eq!(
        again.comment,
        "Policy definition allowed-locations is already present."
    );
}

#[tokio::test]
async fn test_policy_definition_from_rule_file() {
    let h = Harness::new();
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        "{}",
        json!({"properties": {"policyRule": deny_rule(), "mode": "Indexed", "displayName": "From file"}})
    )
    .unwrap();

    let ret = h
        .state(
            "azurearm_resource.policy_definition_present",
            &state_params(json!({
                "name": "from-file",
                "policy_rule_file": file.path().to_str().unwrap(),
            })),
        )
        .await;
    assert_eq!(ret.status(), StateStatus::Changed);

    let stored = h
        .call(
            "azurearm_resource.policy_definition_get",
            &exec_params(json!({"name": "from-file"})),
        )
        .await;
    assert_eq!(stored["policy_rule"], deny_rule());
    assert_eq!(stored["mode"], json!("Indexed"));
    assert_eq!(stored["display_name"], json!("From file"));
}

#[tokio::test]
async fn test_policy_definition_needs_a_rule() {
    let h = Harness::new();
    let ret = h
        .state(
            "azurearm_resource.policy_definition_present",
            &state_params(json!({"name": "empty"})),
        )
        .await;
    assert_eq!(ret.status(), StateStatus::Failed);
    assert_eq!(
        ret.comment,
        "One of \"policy_rule\", \"policy_rule_json\", or \"policy_rule_file\" is required!"
    );
    assert!(h.client.requests().is_empty());
}

#[tokio::test]
async fn test_policy_definition_absent_when_missing() {
    let h = Harness::new();
    let ret = h
        .state(
            "azurearm_resource.policy_definition_absent",
            &state_params(json!({"name": "gone"})),
        )
        .await;
    assert_eq!(ret.status(), StateStatus::Ok);
    assert_eq!(ret.comment, "Policy definition gone is already absent.");
}

#[tokio::test]
async fn test_policy_assignment_present_and_absent_are_idempotent() {
    let h = Harness::with_group();
    let definition = state_params(json!({
        "name": "allowed-locations",
        "policy_rule": deny_rule(),
        "mode": "All",
    }));
    h.state("azurearm_resource.policy_definition_present", &definition)
        .await;

    let args = state_params(json!({
        "name": "rg1-locations",
        "scope": group_id(RG),
        "definition_name": "allowed-locations",
        "display_name": "Locations for rg1",
    }));
    let created = h
        .state("azurearm_resource.policy_assignment_present", &args)
        .await;
    assert_eq!(created.status(), StateStatus::Changed);
    assert_eq!(
        created.comment,
        "Policy assignment rg1-locations has been created."
    );

    let again = h
        .state("azurearm_resource.policy_assignment_present", &args)
        .await;
    assert_eq!(again.status(), StateStatus::Ok, "{:?}", again.changes);
    assert_eq!(
        again.comment,
        "Policy assignment rg1-locations is already present."
    );
    assert_eq!(
        h.client
            .requests_matching(Method::Put, "policyAssignments/rg1-locations")
            .len(),
        1
    );

    let removed = h
        .state("azurearm_resource.policy_assignment_absent", &args)
        .await;
    assert_eq!(removed.status(), StateStatus::Changed);
    let gone = h
        .state("azurearm_resource.policy_assignment_absent", &args)
        .await;
    assert_eq!(gone.status(), StateStatus::Ok);
    assert_eq!(
        gone.comment,
        "Policy assignment rg1-locations is already absent."
    );
}
