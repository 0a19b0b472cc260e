//! Virtual network, subnet and peering states.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::given;
use crate::azure::ids;
use crate::modules::arm::{error_text, is_error};
use crate::modules::network as net;
use crate::modules::{ModuleContext, ModuleParams, ModuleResult};
use crate::states::{or_return, Compare, Field, Presence, StateReturn, StateRun};

pub async fn virtual_network_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Virtual network")?);

    let vnet = net::virtual_network_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&vnet) {
        let fields = [
            Field::tags(),
            Field::new("dns_servers", Compare::Set).at("dhcp_options.dns_servers"),
            Field::new("address_prefixes", Compare::Set)
                .at("address_space.address_prefixes")
                .report("address_space.address_prefixes"),
            Field::new("enable_ddos_protection", Compare::Exact)
                .or(json!(false))
                .actual_or(json!(false)),
            Field::new("enable_vm_protection", Compare::Exact)
                .or(json!(false))
                .actual_or(json!(false)),
        ];
        or_return!(run.diff(&vnet, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        run.creating(json!({
            "name": run.name(),
            "resource_group": run.arg("resource_group"),
            "address_space": { "address_prefixes": run.arg("address_prefixes") },
            "dhcp_options": { "dns_servers": run.arg("dns_servers") },
            "enable_ddos_protection": run.params().get("enable_ddos_protection").cloned().unwrap_or(json!(false)),
            "enable_vm_protection": run.params().get("enable_vm_protection").cloned().unwrap_or(json!(false)),
            "tags": run.arg("tags"),
        }));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let created = net::virtual_network_create_or_update(ctx, &run.call_params(&[])).await?;
    Ok(run.created(&created))
}

pub async fn virtual_network_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Virtual network")?);
    let vnet = net::virtual_network_get(ctx, &run.lookup(&[])).await?;
    run.absent(vnet, |p| async move { net::virtual_network_delete(ctx, &p).await })
        .await
}

/// Subnet `name` of `virtual_network`. `security_group` and `route_table`
/// are names in the same resource group.
pub async fn subnet_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Subnet")?);

    let subnet = net::subnet_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&subnet) {
        let fields = [
            Field::new("address_prefix", Compare::Exact),
            Field::new("security_group", Compare::IdName)
                .at("network_security_group")
                .report("network_security_group")
                .when(Presence::Truthy),
            Field::new("route_table", Compare::IdName).when(Presence::Truthy),
        ];
        or_return!(run.diff(&subnet, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        run.creating(json!({
            "name": run.name(),
            "address_prefix": run.arg("address_prefix"),
            "network_security_group": run.arg("security_group"),
            "route_table": run.arg("route_table"),
        }));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let kwargs = run.call_params(&[("network_security_group", run.arg("security_group"))]);
    let created = net::subnet_create_or_update(ctx, &kwargs).await?;
    Ok(run.created(&created))
}

pub async fn subnet_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Subnet")?);
    let subnet = net::subnet_get(ctx, &run.lookup(&[])).await?;
    run.absent(subnet, |p| async move { net::subnet_delete(ctx, &p).await })
        .await
}

const PEERING_FLAGS: [(&str, bool); 4] = [
    ("allow_virtual_network_access", true),
    ("allow_forwarded_traffic", false),
    ("allow_gateway_transit", false),
    ("use_remote_gateways", false),
];

static REMOTE_DISCONNECTED: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"because remote peering (\S+) referencing parent virtual network").ok()
});

/// Name of the remote peering a `RemotePeeringIsDisconnected` error points
/// at.
fn disconnected_remote(error: &str) -> Option<String> {
    if !error.starts_with("Azure Error: RemotePeeringIsDisconnected") {
        return None;
    }
    let captures = REMOTE_DISCONNECTED.as_ref()?.captures(error)?;
    Some(ids::name_from_id(captures.get(1)?.as_str()).to_string())
}

/// Peering `name` from `virtual_network` to `remote_virtual_network`, which
/// lives in `remote_vnet_group` (the same resource group by default).
///
/// When the service refuses because the remote side of the peering is
/// disconnected, the remote peering is re-initiated and the create retried
/// once.
pub async fn virtual_network_peering_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Peering object")?);

    let mut desired = run.params().clone();
    for (flag, default) in PEERING_FLAGS {
        if desired.get(flag).map_or(true, Value::is_null) {
            desired.insert(flag.to_string(), json!(default));
        }
    }
    let flags: Vec<(&str, Value)> = PEERING_FLAGS
        .iter()
        .map(|(flag, _)| (*flag, desired[*flag].clone()))
        .collect();

    let peering = net::virtual_network_peering_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&peering) {
        let mut fields = vec![Field::new("remote_virtual_network", Compare::IdName)];
        fields.extend(
            PEERING_FLAGS
                .iter()
                .map(|(flag, _)| Field::new(flag, Compare::Exact).actual_or(json!(false))),
        );
        or_return!(run.diff_with(&desired, &peering, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        let mut new = given(&desired, &["remote_virtual_network"]);
        new.insert("name".to_string(), json!(run.name()));
        let remote_group = match run.arg("remote_vnet_group") {
            Value::Null => run.arg("resource_group"),
            group => group,
        };
        new.insert("remote_vnet_group".to_string(), remote_group);
        for (flag, value) in &flags {
            new.insert((*flag).to_string(), value.clone());
        }
        run.creating(Value::Object(new));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let kwargs = run.call_params(&flags);
    let mut created = net::virtual_network_peering_create_or_update(ctx, &kwargs).await?;
    if let Some(remote_name) = disconnected_remote(&error_text(&created)) {
        info!(peering = %run.name(), remote = %remote_name, "re-initiating disconnected remote peering");
        reinitiate_remote(&run, &remote_name).await?;
        created = net::virtual_network_peering_create_or_update(ctx, &kwargs).await?;
    }
    Ok(run.created(&created))
}

/// Put the remote side of a peering back into the `Initiated` state,
/// pointing at this side's virtual network.
async fn reinitiate_remote(run: &StateRun<'_>, remote_name: &str) -> ModuleResult<()> {
    let ctx = run.ctx;
    let local_vnet = run.arg("virtual_network");
    let local_group = run.arg("resource_group");
    let remote_vnet = run.arg("remote_virtual_network");
    let remote_group = match run.arg("remote_vnet_group") {
        Value::Null => local_group.clone(),
        group => group,
    };

    let lookup = run.lookup(&[
        ("name", json!(remote_name)),
        ("virtual_network", remote_vnet.clone()),
        ("resource_group", remote_group.clone()),
    ]);
    let remote = net::virtual_network_peering_get(ctx, &lookup).await?;
    if is_error(&remote) {
        debug!(remote = %remote_name, "remote peering not found");
        return Ok(());
    }

    let mut kwargs = run.connection();
    if let Value::Object(fields) = remote {
        kwargs.extend(fields);
    }
    kwargs.insert("peering_state".to_string(), json!("Initiated"));
    kwargs.insert("name".to_string(), json!(remote_name));
    kwargs.insert("virtual_network".to_string(), remote_vnet);
    kwargs.insert("resource_group".to_string(), remote_group);
    kwargs.insert("remote_virtual_network".to_string(), local_vnet);
    kwargs.insert("remote_vnet_group".to_string(), local_group);
    net::virtual_network_peering_create_or_update(ctx, &kwargs).await?;
    Ok(())
}

pub async fn virtual_network_peering_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Peering object")?);
    let peering = net::virtual_network_peering_get(ctx, &run.lookup(&[])).await?;
    run.absent(peering, |p| async move {
        net::virtual_network_peering_delete(ctx, &p).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_remote() {
        let error = "Azure Error: RemotePeeringIsDisconnected\nMessage: Peering /subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/a/virtualNetworkPeerings/a-b cannot be created because remote peering /subscriptions/s/resourceGroups/rg2/providers/Microsoft.Network/virtualNetworks/b/virtualNetworkPeerings/b-a referencing parent virtual network is in Disconnected state.";
        assert_eq!(disconnected_remote(error), Some("b-a".to_string()));
        assert_eq!(disconnected_remote("Azure Error: Conflict"), None);
    }
}
