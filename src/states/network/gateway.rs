//! Gateway connection, virtual network gateway and local network gateway
//! states.

use serde_json::{json, Value};

use super::{given, sku_mapping, with_sku};
use crate::modules::arm::is_error;
use crate::modules::network as net;
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};
use crate::states::{or_return, Compare, Field, Presence, StateReturn, StateRun};

const CONNECTION: &str = "Virtual network gateway connection";

fn id_of(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

/// Compare the gateway the connection points at under `key` with the one
/// named by the argument of the same name.
async fn compare_endpoint(
    run: &mut StateRun<'_>,
    connection: &Value,
    key: &str,
    local: bool,
) -> ModuleResult<()> {
    let wanted = match run.arg(key) {
        Value::String(gateway) => {
            let lookup = run.lookup(&[("name", json!(gateway))]);
            let found = if local {
                net::local_network_gateway_get(run.ctx, &lookup).await?
            } else {
                net::virtual_network_gateway_get(run.ctx, &lookup).await?
            };
            if is_error(&found) {
                return Ok(());
            }
            found
        }
        mapping @ Value::Object(_) => mapping,
        _ => return Ok(()),
    };
    let current = connection.get(key).cloned().unwrap_or(Value::Null);
    let same = match (id_of(&wanted), id_of(&current)) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    };
    if !same {
        run.change(key, json!({ "old": current, "new": run.arg(key) }));
    }
    Ok(())
}

/// Connection `name` from `virtual_network_gateway1` to a local gateway
/// (`IPSec`), another virtual network gateway (`Vnet2Vnet`) or an
/// ExpressRoute circuit (`ExpressRoute`).
pub async fn virtual_network_gateway_connection_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, CONNECTION)?);
    let connection_type = params.get_string_required("connection_type")?;

    let connection = net::virtual_network_gateway_connection_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&connection) {
        let mut fields = vec![
            Field::tags(),
            Field::new("enable_bgp", Compare::Exact).when(Presence::NotNull),
            Field::new("connection_protocol", Compare::Exact).when(Presence::NotNull),
        ];
        match connection_type.to_lowercase().as_str() {
            "ipsec" => {
                compare_endpoint(&mut run, &connection, "local_network_gateway2", true).await?;
                fields.push(Field::new("shared_key", Compare::Exact).when(Presence::NotNull));
                fields.push(
                    Field::new("ipsec_policies", Compare::ListOfDicts { id_keys: &[] })
                        .when(Presence::NotNull),
                );
            }
            "vnet2vnet" => {
                compare_endpoint(&mut run, &connection, "virtual_network_gateway2", false).await?;
                fields.push(Field::new("shared_key", Compare::Exact).when(Presence::NotNull));
            }
            "expressroute" => {
                fields.push(Field::new("authorization_key", Compare::Exact).when(Presence::NotNull));
            }
            _ => {}
        }
        or_return!(run.diff(&connection, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        let mut new = given(
            run.params(),
            &[
                "resource_group",
                "virtual_network_gateway1",
                "connection_type",
                "tags",
                "virtual_network_gateway2",
                "local_network_gateway2",
                "shared_key",
                "authorization_key",
                "enable_bgp",
                "ipsec_policies",
                "connection_protocol",
                "routing_weight",
                "express_route_gateway_bypass",
                "use_policy_based_traffic_selectors",
            ],
        );
        new.insert("name".to_string(), json!(run.name()));
        run.creating(Value::Object(new));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let created =
        net::virtual_network_gateway_connection_create_or_update(ctx, &run.call_params(&[]))
            .await?;
    Ok(run.created(&created))
}

pub async fn virtual_network_gateway_connection_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, CONNECTION)?);
    let connection = net::virtual_network_gateway_connection_get(ctx, &run.lookup(&[])).await?;
    run.absent(connection, |p| async move {
        net::virtual_network_gateway_connection_delete(ctx, &p).await
    })
    .await
}

fn bgp_settings() -> Field {
    Field::new(
        "bgp_settings",
        Compare::Keys {
            label: "BGP settings",
            case_insensitive: false,
        },
    )
    .when(Presence::Truthy)
}

/// Gateway `name` in the `GatewaySubnet` of `virtual_network`.
/// `address_prefixes` become the gateway's custom routes.
pub async fn virtual_network_gateway_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Virtual network gateway")?);
    let desired = with_sku(run.params());

    let gateway = net::virtual_network_gateway_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&gateway) {
        let fields = [
            Field::tags(),
            Field::new(
                "ip_configurations",
                Compare::ListOfDicts {
                    id_keys: &["public_ip_address", "subnet"],
                },
            )
            .when(Presence::Truthy),
            Field::new("active_active", Compare::Exact)
                .or(json!(false))
                .actual_or(json!(false)),
            Field::new("enable_bgp", Compare::Exact)
                .or(json!(false))
                .actual_or(json!(false)),
            Field::new("sku", Compare::Deep).when(Presence::Truthy),
            bgp_settings(),
            Field::new("address_prefixes", Compare::Set)
                .at("custom_routes.address_prefixes")
                .report("custom_routes.address_prefixes"),
        ];
        or_return!(run.diff_with(&desired, &gateway, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        let mut new = given(
            &desired,
            &[
                "resource_group",
                "virtual_network",
                "ip_configurations",
                "tags",
                "gateway_type",
                "vpn_type",
                "sku",
                "enable_bgp",
                "bgp_settings",
                "active_active",
            ],
        );
        new.insert("name".to_string(), json!(run.name()));
        if let Some(prefixes) = desired.get("address_prefixes").filter(|p| !p.is_null()) {
            new.insert(
                "custom_routes".to_string(),
                json!({ "address_prefixes": prefixes }),
            );
        }
        run.creating(Value::Object(new));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let sku = sku_mapping(run.params()).unwrap_or(Value::Null);
    let routes = json!({ "address_prefixes": run.arg("address_prefixes") });
    let kwargs = run.call_params(&[("sku", sku), ("custom_routes", routes)]);
    let created = net::virtual_network_gateway_create_or_update(ctx, &kwargs).await?;
    Ok(run.created(&created))
}

pub async fn virtual_network_gateway_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Virtual network gateway object")?);
    let gateway = net::virtual_network_gateway_get(ctx, &run.lookup(&[])).await?;
    run.absent(gateway, |p| async move {
        net::virtual_network_gateway_delete(ctx, &p).await
    })
    .await
}

/// Local gateway `name` at `gateway_ip_address`, announcing
/// `address_prefixes`.
pub async fn local_network_gateway_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Local network gateway")?);

    let gateway = net::local_network_gateway_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&gateway) {
        let fields = [
            Field::tags(),
            Field::new("gateway_ip_address", Compare::Exact),
            bgp_settings(),
            Field::new("address_prefixes", Compare::Set)
                .at("local_network_address_space.address_prefixes")
                .report("local_network_address_space.address_prefixes"),
        ];
        or_return!(run.diff(&gateway, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        let mut new = given(
            run.params(),
            &["resource_group", "gateway_ip_address", "tags", "bgp_settings"],
        );
        new.insert("name".to_string(), json!(run.name()));
        new.insert(
            "local_network_address_space".to_string(),
            json!({ "address_prefixes": run.arg("address_prefixes") }),
        );
        run.creating(Value::Object(new));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let space = json!({ "address_prefixes": run.arg("address_prefixes") });
    let kwargs = run.call_params(&[("local_network_address_space", space)]);
    let created = net::local_network_gateway_create_or_update(ctx, &kwargs).await?;
    Ok(run.created(&created))
}

pub async fn local_network_gateway_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Local network gateway object")?);
    let gateway = net::local_network_gateway_get(ctx, &run.lookup(&[])).await?;
    run.absent(gateway, |p| async move {
        net::local_network_gateway_delete(ctx, &p).await
    })
    .await
}
