//! Virtual networks, subnets, peerings, usages and availability checks.

use serde_json::{json, Value};
use tracing::error;

use super::{id_ref, net_path, sub_path};
use crate::azure::{api, ArmRequest, Service};
use crate::modules::arm::{
    fetch, list_keyed, list_plain, model_or_return, name, params_with, resource_group, send_bool,
    with_location,
};
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};

const NET: Service = Service::Network;

/// Check whether a DNS label is free in a region.
pub async fn check_dns_name_availability(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let label = name(params)?;
    let region = params.get_string_required("region")?;
    let client = ctx.client(NET, params).await?;
    let request = ArmRequest::get(
        sub_path(client.as_ref(), &format!("locations/{}/CheckDnsNameAvailability", region)),
        api::NETWORK,
    )
    .query("domainNameLabel", label);
    fetch(client.as_ref(), request, NET, params).await
}

/// Check whether a private address is free in a virtual network.
pub async fn check_ip_address_availability(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let ip_address = params.get_string_required("ip_address")?;
    let vnet = params.get_string_required("virtual_network")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let request = ArmRequest::get(
        net_path(
            client.as_ref(),
            &rg,
            &format!("virtualNetworks/{}/CheckIPAddressAvailability", vnet),
        ),
        api::NETWORK,
    )
    .query("ipAddress", ip_address);
    fetch(client.as_ref(), request, NET, params).await
}

pub async fn subnets_list(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let vnet = params.get_string_required("virtual_network")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, &format!("virtualNetworks/{}/subnets", vnet));
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn subnet_get(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let subnet = name(params)?;
    let vnet = params.get_string_required("virtual_network")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(
        client.as_ref(),
        &rg,
        &format!("virtualNetworks/{}/subnets/{}", vnet, subnet),
    );
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

/// Create or update a subnet. Security group and route table names are
/// resolved to ids in the same resource group.
pub async fn subnet_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let subnet = name(params)?;
    params.get_string_required("address_prefix")?;
    let vnet = params.get_string_required("virtual_network")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;

    let mut kwargs = params.clone();
    if let Some(nsg) = params.get_string("network_security_group")?.filter(|s| !s.is_empty()) {
        let found = super::network_security_group_get(
            ctx,
            &params_with(params, &[("name", json!(nsg))]),
        )
        .await?;
        if let Some(reference) = id_ref(&found) {
            kwargs.insert("network_security_group".to_string(), reference);
        }
    }
    if let Some(table) = params.get_string("route_table")?.filter(|s| !s.is_empty()) {
        let found =
            super::route_table_get(ctx, &params_with(params, &[("name", json!(table))])).await?;
        if let Some(reference) = id_ref(&found) {
            kwargs.insert("route_table".to_string(), reference);
        }
    }

    let body = model_or_return!(NET, "Subnet", &kwargs);
    let path = net_path(
        client.as_ref(),
        &rg,
        &format!("virtualNetworks/{}/subnets/{}", vnet, subnet),
    );
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn subnet_delete(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let subnet = name(params)?;
    let vnet = params.get_string_required("virtual_network")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(
        client.as_ref(),
        &rg,
        &format!("virtualNetworks/{}/subnets/{}", vnet, subnet),
    );
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn virtual_networks_list_all(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(NET, params).await?;
    let path = sub_path(client.as_ref(), "virtualNetworks");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn virtual_networks_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, "virtualNetworks");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

/// Create or update a virtual network from `address_prefixes` and the
/// optional `dns_servers`.
pub async fn virtual_network_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let vnet = name(params)?;
    let rg = resource_group(params)?;
    let Some(mut kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };

    let prefixes = match params.get("address_prefixes") {
        Some(Value::Array(prefixes)) => prefixes.clone(),
        _ => {
            error!("Address prefixes must be specified as a list!");
            return Ok(Value::Bool(false));
        }
    };

    let client = ctx.client(NET, params).await?;
    kwargs.insert(
        "address_space".to_string(),
        json!({ "address_prefixes": prefixes }),
    );
    kwargs.insert(
        "dhcp_options".to_string(),
        json!({ "dns_servers": params.get("dns_servers").cloned().unwrap_or(Value::Null) }),
    );

    let body = model_or_return!(NET, "VirtualNetwork", &kwargs);
    let path = net_path(client.as_ref(), &rg, &format!("virtualNetworks/{}", vnet));
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn virtual_network_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let vnet = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, &format!("virtualNetworks/{}", vnet));
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn virtual_network_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let vnet = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, &format!("virtualNetworks/{}", vnet));
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

/// Network resource usage in a location, as a plain list.
pub async fn usages_list(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let location = params.get_string_required("location")?;
    let client = ctx.client(NET, params).await?;
    let path = sub_path(client.as_ref(), &format!("locations/{}/usages", location));
    list_plain(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

pub async fn virtual_network_peerings_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let vnet = params.get_string_required("virtual_network")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(
        client.as_ref(),
        &rg,
        &format!("virtualNetworks/{}/virtualNetworkPeerings", vnet),
    );
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

fn peering_path(
    client: &dyn crate::azure::ArmClient,
    rg: &str,
    vnet: &str,
    peering: &str,
) -> String {
    net_path(
        client,
        rg,
        &format!("virtualNetworks/{}/virtualNetworkPeerings/{}", vnet, peering),
    )
}

pub async fn virtual_network_peering_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let peering = name(params)?;
    let vnet = params.get_string_required("virtual_network")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = peering_path(client.as_ref(), &rg, &vnet, &peering);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn virtual_network_peering_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let peering = name(params)?;
    let vnet = params.get_string_required("virtual_network")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = peering_path(client.as_ref(), &rg, &vnet, &peering);
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

/// Create or update a peering. The remote network is looked up in
/// `remote_vnet_group`, or in the local resource group when that is absent.
pub async fn virtual_network_peering_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let peering = name(params)?;
    let remote = params.get_string_required("remote_virtual_network")?;
    let vnet = params.get_string_required("virtual_network")?;
    let rg = resource_group(params)?;
    let remote_group = params
        .get_string("remote_vnet_group")?
        .unwrap_or_else(|| rg.clone());
    let client = ctx.client(NET, params).await?;

    let remote_vnet = virtual_network_get(
        ctx,
        &params_with(
            params,
            &[("name", json!(remote)), ("resource_group", json!(remote_group))],
        ),
    )
    .await?;

    let mut kwargs = params.clone();
    if let Some(reference) = id_ref(&remote_vnet) {
        kwargs.insert("remote_virtual_network".to_string(), reference);
    }

    let body = model_or_return!(NET, "VirtualNetworkPeering", &kwargs);
    let path = peering_path(client.as_ref(), &rg, &vnet, &peering);
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}
