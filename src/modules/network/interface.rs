//! Network interfaces, including those attached to scale-set instances.

use serde_json::{json, Value};

use super::{id_ref, net_path, sub_path};
use crate::azure::{api, ids, ArmClient, ArmRequest, Service};
use crate::modules::arm::{
    fetch, fetch_values, list_keyed, model_or_return, name, params_with, resource_group,
    send_bool, with_location,
};
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};

const NET: Service = Service::Network;

/// Scale-set interfaces are only served by this older network api-version.
const SCALE_SET_API: &str = "2018-10-01";

fn nic_path(client: &dyn ArmClient, rg: &str, nic: &str) -> String {
    net_path(client, rg, &format!("networkInterfaces/{}", nic))
}

fn scale_set_path(client: &dyn ArmClient, rg: &str, scale_set: &str, rest: &str) -> String {
    ids::provider(
        client.subscription_id(),
        rg,
        "Microsoft.Compute",
        &format!("virtualMachineScaleSets/{}/{}", scale_set, rest),
    )
}

pub async fn network_interface_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let nic = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = nic_path(client.as_ref(), &rg, &nic);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn network_interface_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let nic = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = nic_path(client.as_ref(), &rg, &nic);
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

/// Create or update a network interface.
///
/// Every named ip configuration is attached to `subnet` in
/// `virtual_network`. Security group, virtual machine and public IP names are
/// resolved to ids; a name that cannot be resolved is passed on unchanged.
pub async fn network_interface_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let nic = name(params)?;
    let subnet = params.get_string_required("subnet")?;
    let vnet = params.get_string_required("virtual_network")?;
    let rg = resource_group(params)?;
    let Some(mut kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(NET, params).await?;

    if let Some(nsg) = params.get_string("network_security_group")?.filter(|s| !s.is_empty()) {
        let found =
            super::network_security_group_get(ctx, &params_with(params, &[("name", json!(nsg))]))
                .await?;
        if let Some(reference) = id_ref(&found) {
            kwargs.insert("network_security_group".to_string(), reference);
        }
    }
    if let Some(vm) = params.get_string("virtual_machine")?.filter(|s| !s.is_empty()) {
        let found = crate::modules::compute::virtual_machine_get(
            ctx,
            &params_with(params, &[("name", json!(vm))]),
        )
        .await?;
        if let Some(reference) = id_ref(&found) {
            kwargs.insert("virtual_machine".to_string(), reference);
        }
    }

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

    let body = model_or_return!(NET, "NetworkInterface", &kwargs);
    let path = nic_path(client.as_ref(), &rg, &nic);
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn network_interfaces_list_all(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(NET, params).await?;
    let path = sub_path(client.as_ref(), "networkInterfaces");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn network_interfaces_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, "networkInterfaces");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

/// Routes in effect on an interface, as a list.
pub async fn network_interface_get_effective_route_table(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let nic = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/effectiveRouteTable", nic_path(client.as_ref(), &rg, &nic));
    fetch_values(client.as_ref(), ArmRequest::post(path, api::NETWORK), NET, params).await
}

/// Security groups in effect on an interface, as a list.
pub async fn network_interface_list_effective_network_security_groups(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let nic = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!(
        "{}/effectiveNetworkSecurityGroups",
        nic_path(client.as_ref(), &rg, &nic)
    );
    fetch_values(client.as_ref(), ArmRequest::post(path, api::NETWORK), NET, params).await
}

pub async fn list_virtual_machine_scale_set_vm_network_interfaces(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let scale_set = params.get_string_required("scale_set")?;
    let index = params.get_string_required("vm_index")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = scale_set_path(
        client.as_ref(),
        &rg,
        &scale_set,
        &format!("virtualMachines/{}/networkInterfaces", index),
    );
    list_keyed(client.as_ref(), ArmRequest::get(path, SCALE_SET_API), "name", NET, params).await
}

pub async fn list_virtual_machine_scale_set_network_interfaces(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let scale_set = params.get_string_required("scale_set")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = scale_set_path(client.as_ref(), &rg, &scale_set, "networkInterfaces");
    list_keyed(client.as_ref(), ArmRequest::get(path, SCALE_SET_API), "name", NET, params).await
}

pub async fn get_virtual_machine_scale_set_network_interface(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let nic = name(params)?;
    let scale_set = params.get_string_required("scale_set")?;
    let index = params.get_string_required("vm_index")?;
    let rg = resource_group(params)?;
    let expand = params.get_string("expand")?;
    let client = ctx.client(NET, params).await?;
    let path = scale_set_path(
        client.as_ref(),
        &rg,
        &scale_set,
        &format!("virtualMachines/{}/networkInterfaces/{}", index, nic),
    );
    let request = ArmRequest::get(path, SCALE_SET_API).query_opt("$expand", expand);
    fetch(client.as_ref(), request, NET, params).await
}
