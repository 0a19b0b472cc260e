//! Route table and route states.

use serde_json::{json, Value};

use super::given;
use crate::modules::arm::is_error;
use crate::modules::network as net;
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};
use crate::states::{or_return, Compare, Field, Presence, StateReturn, StateRun};

pub async fn route_table_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Route table")?);

    let table = net::route_table_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&table) {
        let fields = [
            Field::tags(),
            Field::new("disable_bgp_route_propagation", Compare::Exact).when(Presence::Truthy),
            Field::new("routes", Compare::ListOfDicts { id_keys: &[] }).when(Presence::Truthy),
        ];
        or_return!(run.diff(&table, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        let mut new = given(run.params(), &["tags", "routes", "disable_bgp_route_propagation"]);
        new.insert("name".to_string(), json!(run.name()));
        new.insert("resource_group".to_string(), run.arg("resource_group"));
        run.creating(Value::Object(new));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let created = net::route_table_create_or_update(ctx, &run.call_params(&[])).await?;
    Ok(run.created(&created))
}

pub async fn route_table_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Route table")?);
    let table = net::route_table_get(ctx, &run.lookup(&[])).await?;
    run.absent(table, |p| async move { net::route_table_delete(ctx, &p).await })
        .await
}

/// Route `name` in `route_table`. `next_hop_ip_address` only counts when the
/// next hop is a virtual appliance.
pub async fn route_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Route")?);

    let route = net::route_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&route) {
        let mut fields = vec![
            Field::new("address_prefix", Compare::Exact),
            Field::new("next_hop_type", Compare::CaseInsensitive).actual_or(json!("")),
        ];
        let appliance = params
            .get_string("next_hop_type")?
            .is_some_and(|hop| hop.eq_ignore_ascii_case("virtualappliance"));
        if appliance {
            fields.push(Field::new("next_hop_ip_address", Compare::Exact));
        }
        or_return!(run.diff(&route, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        let mut new = given(
            run.params(),
            &["address_prefix", "next_hop_type", "next_hop_ip_address"],
        );
        new.insert("name".to_string(), json!(run.name()));
        run.creating(Value::Object(new));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let created = net::route_create_or_update(ctx, &run.call_params(&[])).await?;
    Ok(run.created(&created))
}

pub async fn route_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Route")?);
    let route = net::route_get(ctx, &run.lookup(&[])).await?;
    run.absent(route, |p| async move { net::route_delete(ctx, &p).await })
        .await
}
