//! Virtual network gateways, their connections, and local network gateways.

use serde_json::{json, Value};
use tracing::error;

use super::{id_ref, net_path};
use crate::azure::{api, ArmClient, ArmRequest, Service};
use crate::modules::arm::{
    fetch, list_keyed, model_or_return, name, params_with, quiet, resource_group, send_bool,
    send_or_error, with_location,
};
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};

const NET: Service = Service::Network;

fn gateway_path(client: &dyn ArmClient, rg: &str, gateway: &str) -> String {
    net_path(client, rg, &format!("virtualNetworkGateways/{}", gateway))
}

fn connection_path(client: &dyn ArmClient, rg: &str, connection: &str) -> String {
    net_path(client, rg, &format!("connections/{}", connection))
}

fn local_path(client: &dyn ArmClient, rg: &str, gateway: &str) -> String {
    net_path(client, rg, &format!("localNetworkGateways/{}", gateway))
}

/// Turn a gateway endpoint given by name, or as a fetched mapping, into an
/// `{"id"}` reference. Unresolvable endpoints are left as given.
async fn endpoint_ref(
    ctx: &ModuleContext,
    params: &ModuleParams,
    key: &str,
    local: bool,
) -> ModuleResult<Option<Value>> {
    match params.get(key) {
        Some(Value::String(gateway)) => {
            let lookup = params_with(&quiet(params), &[("name", json!(gateway))]);
            let found = if local {
                local_network_gateway_get(ctx, &lookup).await?
            } else {
                virtual_network_gateway_get(ctx, &lookup).await?
            };
            Ok(id_ref(&found))
        }
        Some(mapping @ Value::Object(_)) => Ok(id_ref(mapping)),
        _ => Ok(None),
    }
}

/// Create or update a gateway connection.
///
/// `virtual_network_gateway1`, `virtual_network_gateway2` and
/// `local_network_gateway2` may each be a gateway name in the same resource
/// group or a mapping carrying its `id`.
pub async fn virtual_network_gateway_connection_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let connection = name(params)?;
    let rg = resource_group(params)?;
    params.get_string_required("connection_type")?;
    if params.get_value("virtual_network_gateway1").is_none() {
        return Err(crate::modules::ModuleError::MissingParameter(
            "virtual_network_gateway1".to_string(),
        ));
    }
    let Some(mut kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(NET, params).await?;

    for (key, local) in [
        ("virtual_network_gateway1", false),
        ("virtual_network_gateway2", false),
        ("local_network_gateway2", true),
    ] {
        if let Some(reference) = endpoint_ref(ctx, params, key, local).await? {
            kwargs.insert(key.to_string(), reference);
        }
    }

    let body = model_or_return!(NET, "VirtualNetworkGatewayConnection", &kwargs);
    let path = connection_path(client.as_ref(), &rg, &connection);
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn virtual_network_gateway_connection_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let connection = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = connection_path(client.as_ref(), &rg, &connection);
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

pub async fn virtual_network_gateway_connection_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let connection = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = connection_path(client.as_ref(), &rg, &connection);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn virtual_network_gateway_connection_set_shared_key(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let connection = name(params)?;
    let rg = resource_group(params)?;
    params.get_string_required("value")?;
    let client = ctx.client(NET, params).await?;
    let body = model_or_return!(NET, "ConnectionSharedKey", params);
    let path = format!("{}/sharedkey", connection_path(client.as_ref(), &rg, &connection));
    send_or_error(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params)
        .await
}

pub async fn virtual_network_gateway_connection_get_shared_key(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let connection = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/sharedkey", connection_path(client.as_ref(), &rg, &connection));
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

pub async fn virtual_network_gateway_connection_reset_shared_key(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let connection = name(params)?;
    let rg = resource_group(params)?;
    params.get_string_required("key_length")?;
    let client = ctx.client(NET, params).await?;
    let body = model_or_return!(NET, "ConnectionResetSharedKey", params);
    let path = format!(
        "{}/sharedkey/reset",
        connection_path(client.as_ref(), &rg, &connection)
    );
    send_or_error(client.as_ref(), ArmRequest::post(path, api::NETWORK).body(body), NET, params)
        .await
}

pub async fn virtual_network_gateway_connections_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, "connections");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn virtual_network_gateways_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, "virtualNetworkGateways");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

/// Create or update a gateway. Named ip configurations are attached to the
/// `GatewaySubnet` (or `subnet`) of `virtual_network`, and their public IP
/// names are resolved to ids.
pub async fn virtual_network_gateway_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let gateway = name(params)?;
    let rg = resource_group(params)?;
    let vnet = params.get_string_required("virtual_network")?;
    let subnet = params
        .get_string("subnet")?
        .unwrap_or_else(|| "GatewaySubnet".to_string());
    let Some(mut kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(NET, params).await?;

    if let Some(Value::Array(mut configs)) = params.get("ip_configurations").cloned() {
        let found = super::subnet_get(
            ctx,
            &params_with(
                params,
                &[("name", json!(subnet)), ("virtual_network", json!(vnet))],
            ),
        )
        .await?;
        if let Some(subnet_ref) = id_ref(&found) {
            for config in configs.iter_mut().filter_map(|c| c.as_object_mut()) {
                if !config.contains_key("name") {
                    continue;
                }
                config.insert("subnet".to_string(), subnet_ref.clone());
                let Some(pip) = config
                    .get("public_ip_address")
                    .and_then(|p| p.as_str())
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                else {
                    continue;
                };
                let found =
                    super::public_ip_address_get(ctx, &params_with(params, &[("name", json!(pip))]))
                        .await?;
                if let Some(reference) = id_ref(&found) {
                    config.insert("public_ip_address".to_string(), reference);
                }
            }
        }
        kwargs.insert("ip_configurations".to_string(), Value::Array(configs));
    }

    let body = model_or_return!(NET, "VirtualNetworkGateway", &kwargs);
    let path = gateway_path(client.as_ref(), &rg, &gateway);
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn virtual_network_gateway_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let gateway = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = gateway_path(client.as_ref(), &rg, &gateway);
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

pub async fn virtual_network_gateway_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let gateway = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = gateway_path(client.as_ref(), &rg, &gateway);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn virtual_network_gateway_list_connections(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let gateway = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/connections", gateway_path(client.as_ref(), &rg, &gateway));
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

/// POST an action on a gateway and return the normalized answer.
async fn gateway_action(
    ctx: &ModuleContext,
    params: &ModuleParams,
    action: &str,
    build: impl FnOnce(ArmRequest) -> ArmRequest,
) -> ModuleResult<Value> {
    let gateway = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/{}", gateway_path(client.as_ref(), &rg, &gateway), action);
    fetch(client.as_ref(), build(ArmRequest::post(path, api::NETWORK)), NET, params).await
}

pub async fn virtual_network_gateway_reset(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let gateway = name(params)?;
    let rg = resource_group(params)?;
    let vip = params.get_string("gateway_vip")?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/reset", gateway_path(client.as_ref(), &rg, &gateway));
    let request = ArmRequest::post(path, api::NETWORK).query_opt("gatewayVip", vip);
    send_or_error(client.as_ref(), request, NET, params).await
}

pub async fn virtual_network_gateway_reset_vpn_client_shared_key(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let gateway = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!(
        "{}/resetvpnclientsharedkey",
        gateway_path(client.as_ref(), &rg, &gateway)
    );
    send_or_error(client.as_ref(), ArmRequest::post(path, api::NETWORK), NET, params).await
}

/// Generate a VPN client package and return its download URL.
pub async fn virtual_network_gateway_generatevpnclientpackage(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let body = model_or_return!(NET, "VpnClientParameters", params);
    gateway_action(ctx, params, "generatevpnclientpackage", |r| r.body(body)).await
}

pub async fn virtual_network_gateway_generate_vpn_profile(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let body = model_or_return!(NET, "VpnClientParameters", params);
    gateway_action(ctx, params, "generatevpnprofile", |r| r.body(body)).await
}

pub async fn virtual_network_gateway_get_vpn_profile_package_url(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    gateway_action(ctx, params, "getvpnprofilepackageurl", |r| r).await
}

pub async fn virtual_network_gateway_get_bgp_peer_status(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let peer = params.get_string("peer")?;
    gateway_action(ctx, params, "getBgpPeerStatus", |r| r.query_opt("peer", peer)).await
}

pub async fn virtual_network_gateway_supported_vpn_devices(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    gateway_action(ctx, params, "supportedvpndevices", |r| r).await
}

pub async fn virtual_network_gateway_get_learned_routes(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    gateway_action(ctx, params, "getLearnedRoutes", |r| r).await
}

pub async fn virtual_network_gateway_get_advertised_routes(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let peer = params.get_string_required("peer")?;
    gateway_action(ctx, params, "getAdvertisedRoutes", |r| r.query("peer", peer)).await
}

/// Set the IPsec policy for point-to-site clients from the
/// `vpnclient_ipsec_params` mapping.
pub async fn virtual_network_gateway_set_vpnclient_ipsec_parameters(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let policy: ModuleParams = match params.get("vpnclient_ipsec_params") {
        Some(Value::Object(policy)) => policy
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => {
            error!("The vpnclient_ipsec_params parameter must be a dictionary!");
            return Ok(Value::Bool(false));
        }
    };
    let body = model_or_return!(NET, "VpnClientIPsecParameters", &policy);
    gateway_action(ctx, params, "setvpnclientipsecparameters", |r| r.body(body)).await
}

pub async fn virtual_network_gateway_get_vpnclient_ipsec_parameters(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    gateway_action(ctx, params, "getvpnclientipsecparameters", |r| r).await
}

/// Device configuration script for the connection `name`.
pub async fn virtual_network_gateway_vpn_device_configuration_script(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let connection = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let body = model_or_return!(NET, "VpnDeviceScriptParameters", params);
    let path = format!(
        "{}/vpndeviceconfigurationscript",
        connection_path(client.as_ref(), &rg, &connection)
    );
    fetch(client.as_ref(), ArmRequest::post(path, api::NETWORK).body(body), NET, params).await
}

pub async fn local_network_gateway_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let gateway = name(params)?;
    let rg = resource_group(params)?;
    let Some(kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(NET, params).await?;
    let body = model_or_return!(NET, "LocalNetworkGateway", &kwargs);
    let path = local_path(client.as_ref(), &rg, &gateway);
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn local_network_gateway_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let gateway = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = local_path(client.as_ref(), &rg, &gateway);
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

pub async fn local_network_gateway_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let gateway = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = local_path(client.as_ref(), &rg, &gateway);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn local_network_gateways_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, "localNetworkGateways");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}
