//! `azurearm_authorization` execution functions: provider operation metadata,
//! role assignments and role definitions.

use serde_json::{json, Value};
use uuid::Uuid;

use super::arm::{fetch, list_keyed, model_or_return, name, params_with, resource_group, send_bool};
use super::{register_execution, ModuleContext, ModuleParams, ModuleRegistry, ModuleResult, ParamExt};
use crate::azure::{api, ids, ArmClient, ArmRequest, Service};

pub const MODULE: &str = "azurearm_authorization";

const AUTH: Service = Service::Authorization;

const PROVIDER: &str = "providers/Microsoft.Authorization";

fn operations_path(namespace: Option<&str>) -> String {
    match namespace {
        Some(namespace) => format!("/{}/providerOperations/{}", PROVIDER, namespace),
        None => format!("/{}/providerOperations", PROVIDER),
    }
}

fn scoped(scope: &str, rest: &str) -> String {
    format!("{}/{}/{}", scope.trim_end_matches('/'), PROVIDER, rest)
}

/// The scope argument, or the subscription of the client.
fn scope_or_subscription(params: &ModuleParams, client: &dyn ArmClient) -> ModuleResult<String> {
    Ok(params
        .get_string("scope")?
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| ids::subscription(client.subscription_id())))
}

/// Operations offered by the resource provider `name`.
pub async fn provider_operations_metadata_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let namespace = name(params)?;
    let expand = params.get_string("expand")?;
    let client = ctx.client(AUTH, params).await?;
    let request = ArmRequest::get(operations_path(Some(&namespace)), api::PROVIDER_OPERATIONS)
        .query_opt("$expand", expand);
    fetch(client.as_ref(), request, AUTH, params).await
}

pub async fn provider_operations_metadata_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(AUTH, params).await?;
    let request = ArmRequest::get(operations_path(None), api::PROVIDER_OPERATIONS);
    list_keyed(client.as_ref(), request, "name", AUTH, params).await
}

pub async fn role_assignment_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let assignment = name(params)?;
    let scope = params.get_string_required("scope")?;
    let client = ctx.client(AUTH, params).await?;
    let path = scoped(&scope, &format!("roleAssignments/{}", assignment));
    fetch(client.as_ref(), ArmRequest::get(path, api::ROLE_ASSIGNMENTS), AUTH, params).await
}

/// Grant `role_definition_id` to `principal_id` at `scope`. Assignments are
/// named by GUID; one is generated when `name` is left out.
pub async fn role_assignment_create(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let scope = params.get_string_required("scope")?;
    let assignment = params
        .get_string("name")?
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let client = ctx.client(AUTH, params).await?;

    let kwargs = params_with(params, &[("name", json!(assignment))]);
    let body = model_or_return!(AUTH, "RoleAssignmentCreateParameters", &kwargs);
    let path = scoped(&scope, &format!("roleAssignments/{}", assignment));
    fetch(
        client.as_ref(),
        ArmRequest::put(path, api::ROLE_ASSIGNMENTS).body(body),
        AUTH,
        params,
    )
    .await
}

pub async fn role_assignment_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let assignment = name(params)?;
    let scope = params.get_string_required("scope")?;
    let client = ctx.client(AUTH, params).await?;
    let path = scoped(&scope, &format!("roleAssignments/{}", assignment));
    send_bool(client.as_ref(), ArmRequest::delete(path, api::ROLE_ASSIGNMENTS), AUTH, params).await
}

/// Assignments at `scope` (the subscription by default), keyed by name.
pub async fn role_assignments_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let filter = params.get_string("filter")?;
    let client = ctx.client(AUTH, params).await?;
    let scope = scope_or_subscription(params, client.as_ref())?;
    let request = ArmRequest::get(scoped(&scope, "roleAssignments"), api::ROLE_ASSIGNMENTS)
        .query_opt("$filter", filter);
    list_keyed(client.as_ref(), request, "name", AUTH, params).await
}

pub async fn role_assignments_list_for_resource_group(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let filter = params.get_string("filter")?;
    let client = ctx.client(AUTH, params).await?;
    let scope = ids::resource_group(client.subscription_id(), &rg);
    let request = ArmRequest::get(scoped(&scope, "roleAssignments"), api::ROLE_ASSIGNMENTS)
        .query_opt("$filter", filter);
    list_keyed(client.as_ref(), request, "name", AUTH, params).await
}

/// Role definitions visible at `scope`, keyed by role name.
pub async fn role_definitions_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let filter = params.get_string("filter")?;
    let client = ctx.client(AUTH, params).await?;
    let scope = scope_or_subscription(params, client.as_ref())?;
    let request = ArmRequest::get(scoped(&scope, "roleDefinitions"), api::ROLE_ASSIGNMENTS)
        .query_opt("$filter", filter);
    list_keyed(client.as_ref(), request, "role_name", AUTH, params).await
}

pub fn register(registry: &mut ModuleRegistry) {
    register_execution!(
        registry,
        MODULE,
        [
            provider_operations_metadata_get,
            provider_operations_metadata_list,
            role_assignment_get,
            role_assignment_create,
            role_assignment_delete,
            role_assignments_list,
            role_assignments_list_for_resource_group,
            role_definitions_list,
        ]
    );
}
