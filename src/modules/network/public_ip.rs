//! Public IP addresses.

use serde_json::Value;

use super::{net_path, sub_path};
use crate::azure::{api, ArmRequest, Service};
use crate::modules::arm::{
    fetch, list_keyed, model_or_return, name, resource_group, send_bool, with_location,
};
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};

const NET: Service = Service::Network;

fn pip_path(client: &dyn crate::azure::ArmClient, rg: &str, pip: &str) -> String {
    net_path(client, rg, &format!("publicIPAddresses/{}", pip))
}

pub async fn public_ip_address_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let pip = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = pip_path(client.as_ref(), &rg, &pip);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

/// Get a public IP address, expanding referenced resources named in `expand`.
pub async fn public_ip_address_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let pip = name(params)?;
    let rg = resource_group(params)?;
    let expand = params.get_string("expand")?;
    let client = ctx.client(NET, params).await?;
    let request = ArmRequest::get(pip_path(client.as_ref(), &rg, &pip), api::NETWORK)
        .query_opt("$expand", expand);
    fetch(client.as_ref(), request, NET, params).await
}

pub async fn public_ip_address_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let pip = name(params)?;
    let rg = resource_group(params)?;
    let Some(kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(NET, params).await?;
    let body = model_or_return!(NET, "PublicIPAddress", &kwargs);
    let path = pip_path(client.as_ref(), &rg, &pip);
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn public_ip_addresses_list_all(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(NET, params).await?;
    let path = sub_path(client.as_ref(), "publicIPAddresses");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn public_ip_addresses_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, "publicIPAddresses");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}
