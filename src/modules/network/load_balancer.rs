//! Load balancers.

use serde_json::{json, Value};

use super::{id_ref, net_path, sub_path};
use crate::azure::{api, ArmRequest, Service};
use crate::modules::arm::{
    fetch, is_error, list_keyed, model_or_return, name, params_with, resource_group, send_bool,
    with_location,
};
use crate::modules::{ModuleContext, ModuleParams, ModuleResult};

const NET: Service = Service::Network;

/// Child collections whose members rules refer to by name.
const FRONTENDS: &str = "frontendIPConfigurations";
const POOLS: &str = "backendAddressPools";
const PROBES: &str = "probes";

/// Which name references each rule collection carries.
const RULE_REFERENCES: [(&str, &[(&str, &str)]); 4] = [
    (
        "load_balancing_rules",
        &[
            ("frontend_ip_configuration", FRONTENDS),
            ("backend_address_pool", POOLS),
            ("probe", PROBES),
        ],
    ),
    ("inbound_nat_rules", &[("frontend_ip_configuration", FRONTENDS)]),
    ("inbound_nat_pools", &[("frontend_ip_configuration", FRONTENDS)]),
    (
        "outbound_nat_rules",
        &[
            ("frontend_ip_configuration", FRONTENDS),
            ("backend_address_pool", POOLS),
        ],
    ),
];

/// Id of a child of the load balancer being written.
pub fn child_id(subscription: &str, rg: &str, balancer: &str, kind: &str, child: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/loadBalancers/{}/{}/{}",
        subscription, rg, balancer, kind, child
    )
}

fn name_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub async fn load_balancers_list_all(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(NET, params).await?;
    let path = sub_path(client.as_ref(), "loadBalancers");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn load_balancers_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, "loadBalancers");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn load_balancer_get(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let balancer = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, &format!("loadBalancers/{}", balancer));
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

/// Find the id of the first subnet called `subnet` in any virtual network of
/// the resource group.
async fn find_subnet(
    ctx: &ModuleContext,
    params: &ModuleParams,
    subnet: &str,
) -> ModuleResult<Option<Value>> {
    let vnets = super::virtual_networks_list(ctx, params).await?;
    if is_error(&vnets) {
        return Ok(None);
    }
    let names: Vec<String> = vnets
        .as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();
    for vnet in names {
        let subnets =
            super::subnets_list(ctx, &params_with(params, &[("virtual_network", json!(vnet))]))
                .await?;
        if let Some(found) = subnets.get(subnet) {
            if let Some(reference) = id_ref(found) {
                return Ok(Some(reference));
            }
        }
    }
    Ok(None)
}

/// Create or update a load balancer.
///
/// Frontend public IP names and subnet names are resolved to ids. Names of
/// frontends, pools and probes inside rules become ids of this balancer's
/// children.
pub async fn load_balancer_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let balancer = name(params)?;
    let rg = resource_group(params)?;
    let Some(mut kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(NET, params).await?;
    let subscription = client.subscription_id().to_string();

    if let Some(Value::Array(mut frontends)) = kwargs.get("frontend_ip_configurations").cloned() {
        for frontend in frontends.iter_mut() {
            let Some(config) = frontend.as_object_mut() else {
                continue;
            };
            if let Some(pip) = config.get("public_ip_address").cloned() {
                let found = super::public_ip_address_get(
                    ctx,
                    &params_with(params, &[("name", json!(name_of(&pip)))]),
                )
                .await?;
                if let Some(reference) = id_ref(&found) {
                    config.insert("public_ip_address".to_string(), reference);
                }
            } else if let Some(subnet) = config.get("subnet").cloned() {
                if let Some(reference) = find_subnet(ctx, params, &name_of(&subnet)).await? {
                    config.insert("subnet".to_string(), reference);
                }
            }
        }
        kwargs.insert(
            "frontend_ip_configurations".to_string(),
            Value::Array(frontends),
        );
    }

    for (collection, references) in RULE_REFERENCES {
        let Some(Value::Array(rules)) = kwargs.get_mut(collection) else {
            continue;
        };
        for rule in rules.iter_mut().filter_map(|r| r.as_object_mut()) {
            for (key, kind) in references {
                if let Some(child) = rule.get(*key).map(name_of) {
                    rule.insert(
                        key.to_string(),
                        json!({ "id": child_id(&subscription, &rg, &balancer, kind, &child) }),
                    );
                }
            }
        }
    }

    let body = model_or_return!(NET, "LoadBalancer", &kwargs);
    let path = net_path(client.as_ref(), &rg, &format!("loadBalancers/{}", balancer));
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn load_balancer_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let balancer = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, &format!("loadBalancers/{}", balancer));
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}
