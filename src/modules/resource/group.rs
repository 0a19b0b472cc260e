//! Resource groups, subscriptions, tenants and resource providers.

use serde_json::{json, Value};

use super::LOG;
use crate::azure::{api, ids, ArmClient, ArmRequest, Service};
use crate::modules::arm::{check_existence, fetch, list_keyed, model_or_return, name, send_bool};
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};

const RES: Service = Service::Resource;
const SUB: Service = Service::Subscription;

fn group_path(client: &dyn ArmClient, group: &str) -> String {
    ids::resource_group(client.subscription_id(), group)
}

pub async fn resource_groups_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(RES, params).await?;
    let path = format!("{}/resourcegroups", ids::subscription(client.subscription_id()));
    list_keyed(client.as_ref(), ArmRequest::get(path, api::RESOURCES), "name", LOG, params).await
}

/// `true` when the group exists.
pub async fn resource_group_check_existence(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let group = name(params)?;
    let client = ctx.client(RES, params).await?;
    let path = group_path(client.as_ref(), &group);
    check_existence(client.as_ref(), ArmRequest::head(path, api::RESOURCES), LOG, params).await
}

pub async fn resource_group_get(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let group = name(params)?;
    let client = ctx.client(RES, params).await?;
    let path = group_path(client.as_ref(), &group);
    fetch(client.as_ref(), ArmRequest::get(path, api::RESOURCES), LOG, params).await
}

/// Create or update a group from `location` and the optional `managed_by`
/// and `tags`. Other keyword arguments are ignored.
pub async fn resource_group_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let group = name(params)?;
    let location = params.get_string_required("location")?;
    let client = ctx.client(RES, params).await?;

    let mut kwargs = ModuleParams::new();
    kwargs.insert("location".to_string(), json!(location));
    for key in ["managed_by", "tags"] {
        if let Some(value) = params.get_value(key) {
            kwargs.insert(key.to_string(), value.clone());
        }
    }
    let body = model_or_return!(RES, "ResourceGroup", &kwargs);
    let path = group_path(client.as_ref(), &group);
    fetch(client.as_ref(), ArmRequest::put(path, api::RESOURCES).body(body), LOG, params).await
}

pub async fn resource_group_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let group = name(params)?;
    let client = ctx.client(RES, params).await?;
    let path = group_path(client.as_ref(), &group);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::RESOURCES), LOG, params).await
}

/// Locations available to the `subscription_id` subscription, keyed by name.
pub async fn subscriptions_list_locations(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(SUB, params).await?;
    let path = format!("{}/locations", ids::subscription(client.subscription_id()));
    list_keyed(client.as_ref(), ArmRequest::get(path, api::SUBSCRIPTIONS), "name", LOG, params)
        .await
}

pub async fn subscription_get(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let client = ctx.client(SUB, params).await?;
    let path = ids::subscription(client.subscription_id());
    fetch(client.as_ref(), ArmRequest::get(path, api::SUBSCRIPTIONS), LOG, params).await
}

/// Subscriptions visible to the credential, keyed by subscription id.
pub async fn subscriptions_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(SUB, params).await?;
    let request = ArmRequest::get("/subscriptions", api::SUBSCRIPTIONS);
    list_keyed(client.as_ref(), request, "subscription_id", LOG, params).await
}

/// Tenants visible to the credential, keyed by tenant id.
pub async fn tenants_list(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let client = ctx.client(SUB, params).await?;
    let request = ArmRequest::get("/tenants", api::SUBSCRIPTIONS);
    list_keyed(client.as_ref(), request, "tenant_id", LOG, params).await
}

/// Registered resource providers, keyed by namespace. Resource type aliases
/// are expanded unless `expand` says otherwise.
pub async fn providers_list(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let top = params.get_string("top")?;
    let expand = params
        .get_string("expand")?
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "resourceTypes/aliases".to_string());
    let client = ctx.client(RES, params).await?;
    let path = format!("{}/providers", ids::subscription(client.subscription_id()));
    let request = ArmRequest::get(path, api::RESOURCES)
        .query_opt("$top", top)
        .query("$expand", expand);
    list_keyed(client.as_ref(), request, "namespace", LOG, params).await
}
