//! Policy definitions and assignments.

use serde_json::{json, Map, Value};

use super::LOG;
use crate::azure::{api, ids, ArmClient, ArmRequest, Service};
use crate::modules::arm::{
    cloud_error, error_value, fetch, list, list_keyed, model_or_return, name, params_with,
    resource_group, send_bool, CloudResultExt,
};
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};

const POL: Service = Service::Policy;

const AUTHORIZATION: &str = "Microsoft.Authorization";

fn definition_path(client: &dyn ArmClient, definition: &str) -> String {
    format!(
        "{}/providers/{}/policyDefinitions/{}",
        ids::subscription(client.subscription_id()),
        AUTHORIZATION,
        definition
    )
}

fn assignment_path(scope: &str, assignment: &str) -> String {
    format!(
        "{}/providers/{}/policyAssignments/{}",
        scope.trim_end_matches('/'),
        AUTHORIZATION,
        assignment
    )
}

pub async fn policy_assignment_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let assignment = name(params)?;
    let scope = params.get_string_required("scope")?;
    let client = ctx.client(POL, params).await?;
    let path = assignment_path(&scope, &assignment);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::POLICY), LOG, params).await
}

/// Assign the definition called `definition_name` at `scope`.
pub async fn policy_assignment_create(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let assignment = name(params)?;
    let scope = params.get_string_required("scope")?;
    let definition_name = params.get_string_required("definition_name")?;
    let client = ctx.client(POL, params).await?;

    let definitions = policy_definitions_list(ctx, params).await?;
    let definition_id = definitions
        .get(&definition_name)
        .and_then(|d| d.get("id"))
        .and_then(|id| id.as_str())
        .map(str::to_string);
    let Some(definition_id) = definition_id else {
        return Ok(error_value(format!(
            "The policy definition named \"{}\" could not be found.",
            definition_name
        )));
    };

    let kwargs = params_with(params, &[("policy_definition_id", json!(definition_id))]);
    let body = model_or_return!(POL, "PolicyAssignment", &kwargs);
    let path = assignment_path(&scope, &assignment);
    fetch(client.as_ref(), ArmRequest::put(path, api::POLICY).body(body), LOG, params).await
}

pub async fn policy_assignment_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let assignment = name(params)?;
    let scope = params.get_string_required("scope")?;
    let client = ctx.client(POL, params).await?;
    let path = assignment_path(&scope, &assignment);
    fetch(client.as_ref(), ArmRequest::get(path, api::POLICY), LOG, params).await
}

pub async fn policy_assignments_list_for_resource_group(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let filter = params.get_string("filter")?;
    let client = ctx.client(POL, params).await?;
    let path = ids::provider(client.subscription_id(), &rg, AUTHORIZATION, "policyAssignments");
    let request = ArmRequest::get(path, api::POLICY).query_opt("$filter", filter);
    list_keyed(client.as_ref(), request, "name", LOG, params).await
}

pub async fn policy_assignments_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(POL, params).await?;
    let path = format!(
        "{}/providers/{}/policyAssignments",
        ids::subscription(client.subscription_id()),
        AUTHORIZATION
    );
    list_keyed(client.as_ref(), ArmRequest::get(path, api::POLICY), "name", LOG, params).await
}

/// Create or update a custom definition. `policy_rule` must be a mapping.
pub async fn policy_definition_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let definition = name(params)?;
    if !matches!(params.get("policy_rule"), Some(Value::Object(_))) {
        return Ok(error_value("The policy rule must be a dictionary!"));
    }
    let client = ctx.client(POL, params).await?;
    let body = model_or_return!(POL, "PolicyDefinition", params);
    let path = definition_path(client.as_ref(), &definition);
    fetch(client.as_ref(), ArmRequest::put(path, api::POLICY).body(body), LOG, params).await
}

pub async fn policy_definition_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let definition = name(params)?;
    let client = ctx.client(POL, params).await?;
    let path = definition_path(client.as_ref(), &definition);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::POLICY), LOG, params).await
}

pub async fn policy_definition_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let definition = name(params)?;
    let client = ctx.client(POL, params).await?;
    let path = definition_path(client.as_ref(), &definition);
    fetch(client.as_ref(), ArmRequest::get(path, api::POLICY), LOG, params).await
}

/// Definitions keyed by name. Built-in definitions are left out when
/// `hide_builtin` is set.
pub async fn policy_definitions_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let hide_builtin = params.get_bool_or("hide_builtin", false);
    let client = ctx.client(POL, params).await?;
    let path = format!(
        "{}/providers/{}/policyDefinitions",
        ids::subscription(client.subscription_id()),
        AUTHORIZATION
    );
    let items = match list(client.as_ref(), ArmRequest::get(path, api::POLICY))
        .await
        .cloud()?
    {
        Ok(items) => items,
        Err(exc) => return Ok(cloud_error(LOG, &exc, params)),
    };

    let mut out = Map::new();
    for item in items {
        let builtin = item.get("policy_type").and_then(|t| t.as_str()) == Some("BuiltIn");
        if hide_builtin && builtin {
            continue;
        }
        if let Some(key) = item.get("name").and_then(|n| n.as_str()).map(str::to_string) {
            out.insert(key, item);
        }
    }
    Ok(Value::Object(out))
}
