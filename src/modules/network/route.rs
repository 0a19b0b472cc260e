//! Route filters, route filter rules, routes and route tables.

use serde_json::{json, Value};
use tracing::error;

use super::{net_path, sub_path};
use crate::azure::logging::log_cloud_error;
use crate::azure::models::as_dict;
use crate::azure::{api, ArmClient, ArmRequest, Service};
use crate::modules::arm::{
    error_value, fetch, list_keyed, model_or_return, name, params_with, resource_group,
    send_bool, with_location, CloudResultExt,
};
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};

const NET: Service = Service::Network;

/// Rules only match BGP communities.
const RULE_TYPE: &str = "Community";

fn filter_path(client: &dyn ArmClient, rg: &str, filter: &str) -> String {
    net_path(client, rg, &format!("routeFilters/{}", filter))
}

fn table_path(client: &dyn ArmClient, rg: &str, table: &str) -> String {
    net_path(client, rg, &format!("routeTables/{}", table))
}

pub async fn route_filter_rule_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rule = name(params)?;
    let filter = params.get_string_required("route_filter")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/routeFilterRules/{}", filter_path(client.as_ref(), &rg, &filter), rule);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn route_filter_rule_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rule = name(params)?;
    let filter = params.get_string_required("route_filter")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/routeFilterRules/{}", filter_path(client.as_ref(), &rg, &filter), rule);
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

/// Create or update a route filter rule from `access` and a list of
/// `communities`.
///
/// The service answers an unauthorized subscription with a bare subscription
/// id as the message; that case is reported in words.
pub async fn route_filter_rule_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rule = name(params)?;
    params.get_string_required("access")?;
    let filter = params.get_string_required("route_filter")?;
    let rg = resource_group(params)?;
    if !matches!(params.get("communities"), Some(Value::Array(_))) {
        error!("The communities parameter must be a list of strings!");
        return Ok(Value::Bool(false));
    }
    let Some(kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(NET, params).await?;

    let kwargs = params_with(&kwargs, &[("route_filter_rule_type", json!(RULE_TYPE))]);
    let body = model_or_return!(NET, "RouteFilterRule", &kwargs);
    let path = format!("{}/routeFilterRules/{}", filter_path(client.as_ref(), &rg, &filter), rule);

    Ok(
        match client
            .send(ArmRequest::put(path, api::NETWORK).body(body))
            .await
            .cloud()?
        {
            Ok(response) => as_dict(&response.body),
            Err(exc) => {
                let mut message = exc.to_string();
                if params.get_string("subscription_id")?.as_deref() == Some(message.trim()) {
                    message = "Subscription not authorized for this operation!".to_string();
                }
                log_cloud_error(NET, &message, params);
                error_value(message)
            }
        },
    )
}

pub async fn route_filter_rules_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let filter = params.get_string_required("route_filter")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/routeFilterRules", filter_path(client.as_ref(), &rg, &filter));
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn route_filter_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let filter = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = filter_path(client.as_ref(), &rg, &filter);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn route_filter_get(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let filter = name(params)?;
    let rg = resource_group(params)?;
    let expand = params.get_string("expand")?;
    let client = ctx.client(NET, params).await?;
    let request = ArmRequest::get(filter_path(client.as_ref(), &rg, &filter), api::NETWORK)
        .query_opt("$expand", expand);
    fetch(client.as_ref(), request, NET, params).await
}

pub async fn route_filter_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let filter = name(params)?;
    let rg = resource_group(params)?;
    let Some(kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(NET, params).await?;
    let body = model_or_return!(NET, "RouteFilter", &kwargs);
    let path = filter_path(client.as_ref(), &rg, &filter);
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn route_filters_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, "routeFilters");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn route_filters_list_all(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(NET, params).await?;
    let path = sub_path(client.as_ref(), "routeFilters");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn route_delete(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let route = name(params)?;
    let table = params.get_string_required("route_table")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/routes/{}", table_path(client.as_ref(), &rg, &table), route);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn route_get(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let route = name(params)?;
    let table = params.get_string_required("route_table")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/routes/{}", table_path(client.as_ref(), &rg, &table), route);
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

pub async fn route_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let route = name(params)?;
    params.get_string_required("address_prefix")?;
    params.get_string_required("next_hop_type")?;
    let table = params.get_string_required("route_table")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let body = model_or_return!(NET, "Route", params);
    let path = format!("{}/routes/{}", table_path(client.as_ref(), &rg, &table), route);
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn routes_list(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let table = params.get_string_required("route_table")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/routes", table_path(client.as_ref(), &rg, &table));
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn route_table_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let table = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = table_path(client.as_ref(), &rg, &table);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn route_table_get(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let table = name(params)?;
    let rg = resource_group(params)?;
    let expand = params.get_string("expand")?;
    let client = ctx.client(NET, params).await?;
    let request = ArmRequest::get(table_path(client.as_ref(), &rg, &table), api::NETWORK)
        .query_opt("$expand", expand);
    fetch(client.as_ref(), request, NET, params).await
}

pub async fn route_table_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let table = name(params)?;
    let rg = resource_group(params)?;
    let Some(kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(NET, params).await?;
    let body = model_or_return!(NET, "RouteTable", &kwargs);
    let path = table_path(client.as_ref(), &rg, &table);
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn route_tables_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, "routeTables");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn route_tables_list_all(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(NET, params).await?;
    let path = sub_path(client.as_ref(), "routeTables");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}
