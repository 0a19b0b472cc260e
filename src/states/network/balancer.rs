//! Load balancer, public IP address and network interface states.

use serde_json::{json, Value};

use super::{given, sku_mapping, with_sku};
use crate::modules::arm::is_error;
use crate::modules::network as net;
use crate::modules::{ModuleContext, ModuleParams, ModuleResult};
use crate::states::{or_return, Compare, Field, Presence, StateReturn, StateRun};

const FRONTEND_REFS: &[&str] = &["public_ip_address", "subnet"];
const RULE_REFS: &[&str] = &["frontend_ip_configuration", "backend_address_pool", "probe"];
const NAT_REFS: &[&str] = &["frontend_ip_configuration"];

fn balancer_fields() -> Vec<Field> {
    let configs: [(&'static str, &'static [&'static str]); 7] = [
        ("frontend_ip_configurations", FRONTEND_REFS),
        ("backend_address_pools", &[]),
        ("probes", &[]),
        ("load_balancing_rules", RULE_REFS),
        ("inbound_nat_rules", NAT_REFS),
        ("inbound_nat_pools", NAT_REFS),
        ("outbound_nat_rules", NAT_REFS),
    ];
    let mut fields = vec![
        Field::tags(),
        Field::new("sku", Compare::Deep).when(Presence::Truthy),
    ];
    fields.extend(configs.into_iter().map(|(key, id_keys)| {
        Field::new(key, Compare::ListOfDicts { id_keys }).when(Presence::Truthy)
    }));
    fields
}

/// Load balancer `name`. Frontends, pools, probes, rules and NAT settings are
/// lists of mappings matched by `name`; references inside them are given by
/// name.
pub async fn load_balancer_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Load balancer")?);
    let desired = with_sku(run.params());

    let balancer = net::load_balancer_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&balancer) {
        or_return!(run.diff_with(&desired, &balancer, &balancer_fields()));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        let mut new = given(
            &desired,
            &[
                "sku",
                "tags",
                "frontend_ip_configurations",
                "backend_address_pools",
                "load_balancing_rules",
                "probes",
                "inbound_nat_rules",
                "inbound_nat_pools",
                "outbound_nat_rules",
            ],
        );
        new.insert("name".to_string(), json!(run.name()));
        new.insert("resource_group".to_string(), run.arg("resource_group"));
        run.creating(Value::Object(new));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let sku = sku_mapping(run.params()).unwrap_or(Value::Null);
    let created = net::load_balancer_create_or_update(ctx, &run.call_params(&[("sku", sku)])).await?;
    Ok(run.created(&created))
}

pub async fn load_balancer_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Load balancer")?);
    let balancer = net::load_balancer_get(ctx, &run.lookup(&[])).await?;
    run.absent(balancer, |p| async move { net::load_balancer_delete(ctx, &p).await })
        .await
}

pub async fn public_ip_address_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Public IP address")?);
    let desired = with_sku(run.params());

    let pip = net::public_ip_address_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&pip) {
        let fields = [
            Field::tags(),
            Field::new(
                "dns_settings",
                Compare::Keys {
                    label: "DNS settings",
                    case_insensitive: false,
                },
            )
            .when(Presence::Truthy),
            Field::new("sku", Compare::Deep).when(Presence::Truthy),
            Field::new("public_ip_allocation_method", Compare::Capitalized).when(Presence::Truthy),
            Field::new("public_ip_address_version", Compare::CaseInsensitive)
                .when(Presence::Truthy),
            Field::new("idle_timeout_in_minutes", Compare::Integer).when(Presence::Truthy),
        ];
        or_return!(run.diff_with(&desired, &pip, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        let mut new = given(
            &desired,
            &[
                "tags",
                "dns_settings",
                "sku",
                "public_ip_allocation_method",
                "public_ip_address_version",
                "idle_timeout_in_minutes",
            ],
        );
        new.insert("name".to_string(), json!(run.name()));
        run.creating(Value::Object(new));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let sku = sku_mapping(run.params()).unwrap_or(Value::Null);
    let created =
        net::public_ip_address_create_or_update(ctx, &run.call_params(&[("sku", sku)])).await?;
    Ok(run.created(&created))
}

pub async fn public_ip_address_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Public IP address")?);
    let pip = net::public_ip_address_get(ctx, &run.lookup(&[])).await?;
    run.absent(pip, |p| async move { net::public_ip_address_delete(ctx, &p).await })
        .await
}

/// Network interface `name` on `subnet` of `virtual_network`. At least one
/// entry of `ip_configurations` is required.
pub async fn network_interface_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Network interface")?);

    let iface = net::network_interface_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&iface) {
        let fields = [
            Field::tags(),
            Field::new("mac_address", Compare::Exact).when(Presence::Truthy),
            Field::new("primary", Compare::Exact)
                .when(Presence::NotNull)
                .actual_or(json!(true)),
            Field::new("enable_accelerated_networking", Compare::Exact).when(Presence::NotNull),
            Field::new("enable_ip_forwarding", Compare::Exact).when(Presence::NotNull),
            Field::new("network_security_group", Compare::IdName).when(Presence::Truthy),
            Field::new("virtual_machine", Compare::IdName).when(Presence::Truthy),
            Field::new(
                "dns_settings",
                Compare::Keys {
                    label: "DNS settings",
                    case_insensitive: true,
                },
            )
            .when(Presence::Truthy),
            Field::new(
                "ip_configurations",
                Compare::ListOfDicts {
                    id_keys: FRONTEND_REFS,
                },
            ),
        ];
        or_return!(run.diff(&iface, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        let mut new = given(
            run.params(),
            &[
                "ip_configurations",
                "dns_settings",
                "network_security_group",
                "virtual_machine",
                "enable_accelerated_networking",
                "enable_ip_forwarding",
                "mac_address",
                "primary",
                "tags",
            ],
        );
        new.insert("name".to_string(), json!(run.name()));
        run.creating(Value::Object(new));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let created = net::network_interface_create_or_update(ctx, &run.call_params(&[])).await?;
    Ok(run.created(&created))
}

pub async fn network_interface_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Network interface")?);
    let iface = net::network_interface_get(ctx, &run.lookup(&[])).await?;
    run.absent(iface, |p| async move { net::network_interface_delete(ctx, &p).await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::compute_diff;

    #[test]
    fn test_balancer_frontend_by_name() {
        let desired: ModuleParams = [(
            "frontend_ip_configurations".to_string(),
            json!([{"name": "fe1", "public_ip_address": "pip1"}]),
        )]
        .into_iter()
        .collect();
        let actual = json!({
            "frontend_ip_configurations": [{
                "name": "fe1",
                "public_ip_address": {"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/pip1"},
                "provisioning_state": "Succeeded",
            }],
        });
        let changes = compute_diff(&desired, &actual, &balancer_fields()).unwrap();
        assert!(changes.is_empty(), "{:?}", changes);
    }
}
