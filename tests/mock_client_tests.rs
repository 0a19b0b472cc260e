//! Request-level expectations on execution and state functions, using a
//! mocked [`ArmClient`].

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use mockall::predicate::always;
use serde_json::json;

use azurearm::azure::{
    api, ArmClient, ArmError, ArmRequest, ArmResponse, AuthError, ClientFactory, CloudError,
    ConnectionAuth, Method, Service,
};
use azurearm::modules::{ModuleContext, ModuleError, ModuleParams, ModuleRegistry};

mock! {
    pub Arm {}

    #[async_trait]
    impl ArmClient for Arm {
        fn subscription_id(&self) -> &str;
        async fn send(&self, request: ArmRequest) -> Result<ArmResponse, ArmError>;
    }
}

/// Hands out the one mocked client.
struct Fixed(Arc<MockArm>);

#[async_trait]
impl ClientFactory for Fixed {
    async fn client(
        &self,
        _service: Service,
        _auth: &ConnectionAuth,
    ) -> Result<Arc<dyn ArmClient>, AuthError> {
        Ok(self.0.clone())
    }
}

fn context(mock: MockArm) -> ModuleContext {
    ModuleContext::new(Arc::new(Fixed(Arc::new(mock))))
}

fn mock_arm() -> MockArm {
    let mut mock = MockArm::new();
    mock.expect_subscription_id()
        .return_const("sub".to_string());
    mock
}

fn params(value: serde_json::Value) -> ModuleParams {
    value
        .as_object()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

const VNET: &str =
    "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet1";

#[tokio::test]
async fn test_get_sends_one_request() {
    let mut mock = mock_arm();
    mock.expect_send()
        .withf(|r| r.method == Method::Get && r.path == VNET && r.api_version == api::NETWORK)
        .times(1)
        .returning(|_| {
            Ok(ArmResponse::new(
                200,
                json!({"name": "vnet1", "properties": {"enableDdosProtection": false}}),
            ))
        });

    let value = ModuleRegistry::with_builtins()
        .call(
            "azurearm_network.virtual_network_get",
            &context(mock),
            &params(json!({"name": "vnet1", "resource_group": "rg1"})),
        )
        .await
        .unwrap();
    assert_eq!(value["enable_ddos_protection"], json!(false));
}

#[tokio::test]
async fn test_transport_failure_aborts_the_call() {
    let mut mock = mock_arm();
    mock.expect_send()
        .with(always())
        .times(1)
        .returning(|_| Err(ArmError::Transport("connection reset".to_string())));

    let err = ModuleRegistry::with_builtins()
        .call(
            "azurearm_network.virtual_network_get",
            &context(mock),
            &params(json!({"name": "vnet1", "resource_group": "rg1"})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ModuleError::ExecutionFailed(m) if m.contains("connection reset")));
}

#[tokio::test]
async fn test_check_mode_absent_never_deletes() {
    let mut mock = mock_arm();
    mock.expect_send()
        .withf(|r| r.method == Method::Get)
        .times(1)
        .returning(|r| {
            Ok(ArmResponse::new(
                200,
                json!({"id": r.path, "name": "vnet1", "location": "eastus"}),
            ))
        });
    mock.expect_send()
        .withf(|r| r.method == Method::Delete)
        .never();

    let ctx = context(mock).with_check_mode(true);
    let ret = ModuleRegistry::with_builtins()
        .call_state(
            "azurearm_network.virtual_network_absent",
            &ctx,
            &params(json!({
                "name": "vnet1",
                "resource_group": "rg1",
                "connection_auth": {"subscription_id": "sub"},
            })),
        )
        .await
        .unwrap();
    assert_eq!(ret.result, None);
    assert_eq!(ret.comment, "Virtual network vnet1 would be deleted.");
    assert_eq!(ret.changes["new"], json!({}));
}

// ============================================================================
// One read per module
// ============================================================================

struct Case {
    function: &'static str,
    params: serde_json::Value,
    path: String,
    api_version: &'static str,
}

fn cases() -> Vec<Case> {
    vec![
        Case {
            function: "azurearm_resource.resource_group_get",
            params: json!({"name": "rg1"}),
            path: "/subscriptions/sub/resourceGroups/rg1".to_string(),
            api_version: api::RESOURCES,
        },
        Case {
            function: "azurearm_network.virtual_network_get",
            params: json!({"name": "vnet1", "resource_group": "rg1"}),
            path: VNET.to_string(),
            api_version: api::NETWORK,
        },
        Case {
            function: "azurearm_compute.availability_set_get",
            params: json!({"name": "aset1", "resource_group": "rg1"}),
            path: "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Compute/availabilitySets/aset1"
                .to_string(),
            api_version: api::COMPUTE,
        },
        Case {
            function: "azurearm_monitor.diagnostic_settings_get",
            params: json!({"name": "to-workspace", "resource_uri": VNET}),
            path: format!(
                "{}/providers/Microsoft.Insights/diagnosticSettings/to-workspace",
                VNET
            ),
            api_version: api::DIAGNOSTIC_SETTINGS,
        },
        Case {
            function: "azurearm_authorization.role_assignment_get",
            params: json!({"name": "a1", "scope": "/subscriptions/sub"}),
            path: "/subscriptions/sub/providers/Microsoft.Authorization/roleAssignments/a1"
                .to_string(),
            api_version: api::ROLE_ASSIGNMENTS,
        },
    ]
}

#[tokio::test]
async fn test_each_module_sends_exactly_one_get() {
    let registry = ModuleRegistry::with_builtins();
    for case in cases() {
        let mut mock = mock_arm();
        let (path, api_version) = (case.path.clone(), case.api_version);
        mock.expect_send()
            .withf(move |r| r.method == Method::Get && r.path == path && r.api_version == api_version)
            .times(1)
            .returning(|r| {
                Ok(ArmResponse::new(
                    200,
                    json!({"id": r.path, "properties": {"provisioningState": "Succeeded"}}),
                ))
            });

        let value = registry
            .call(case.function, &context(mock), &params(case.params))
            .await
            .unwrap();
        assert_eq!(value["id"], json!(case.path), "{}", case.function);
        assert_eq!(value["provisioning_state"], json!("Succeeded"), "{}", case.function);
    }
}

#[tokio::test]
async fn test_each_module_returns_cloud_errors_verbatim() {
    let registry = ModuleRegistry::with_builtins();
    for case in cases() {
        let mut mock = mock_arm();
        mock.expect_send().times(1).returning(|_| {
            Err(ArmError::Cloud(
                CloudError::new("AuthorizationFailed", "The client does not have authorization.")
                    .with_status(403),
            ))
        });

        let value = registry
            .call(case.function, &context(mock), &params(case.params))
            .await
            .unwrap();
        assert_eq!(
            value,
            json!({"error": "Azure Error: AuthorizationFailed\nMessage: The client does not have authorization."}),
            "{}",
            case.function
        );
    }
}
