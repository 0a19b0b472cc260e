//! `azurearm_compute` state functions.

use serde_json::{json, Value};

use super::diff::capitalize;
use super::{or_return, Compare, Field, Presence, StateReturn, StateRun};
use crate::azure::ids;
use crate::modules::arm::is_error;
use crate::modules::compute::{self as comp, MODULE};
use crate::modules::{register_states, ModuleContext, ModuleParams, ModuleRegistry, ModuleResult};

/// Lowercased, sorted names of the machines in an availability set.
fn member_names(members: &Value) -> Vec<String> {
    let mut names: Vec<String> = members
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|vm| vm.get("id").and_then(Value::as_str))
                .map(|id| ids::name_from_id(id).to_lowercase())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Availability set `name`. `virtual_machines` lists machine names in the
/// same resource group.
pub async fn availability_set_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Availability set")?);

    let sku = match params.get("sku") {
        Some(Value::String(sku)) if !sku.is_empty() => json!({ "name": capitalize(sku) }),
        Some(sku @ Value::Object(_)) => sku.clone(),
        _ => Value::Null,
    };
    let machines = run.arg("virtual_machines");
    if !machines.is_null() && !machines.is_array() {
        return Ok(run.fail("Virtual machines must be supplied as a list!"));
    }

    let aset = comp::availability_set_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&aset) {
        let fields = [
            Field::tags(),
            Field::new("platform_update_domain_count", Compare::Integer).when(Presence::Truthy),
            Field::new("platform_fault_domain_count", Compare::Integer).when(Presence::Truthy),
        ];
        or_return!(run.diff(&aset, &fields));

        let current_sku = aset.get("sku").cloned().unwrap_or(Value::Null);
        if !sku.is_null() && sku.get("name") != current_sku.get("name") {
            run.change("sku", json!({ "old": current_sku, "new": sku.clone() }));
        }

        if let Value::Array(wanted) = &machines {
            let current = aset.get("virtual_machines").cloned().unwrap_or(json!([]));
            let mut local: Vec<String> = wanted
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_lowercase)
                .collect();
            local.sort();
            if !wanted.is_empty() && local != member_names(&current) {
                run.change(
                    "virtual_machines",
                    json!({ "old": current, "new": machines.clone() }),
                );
            }
        }

        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        run.creating(json!({
            "name": run.name(),
            "virtual_machines": machines,
            "platform_update_domain_count": run.arg("platform_update_domain_count"),
            "platform_fault_domain_count": run.arg("platform_fault_domain_count"),
            "sku": sku.clone(),
            "tags": run.arg("tags"),
        }));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let created = comp::availability_set_create_or_update(ctx, &run.call_params(&[("sku", sku)]))
        .await?;
    Ok(run.created(&created))
}

pub async fn availability_set_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Availability set")?);
    let aset = comp::availability_set_get(ctx, &run.lookup(&[])).await?;
    run.absent(aset, |p| async move { comp::availability_set_delete(ctx, &p).await })
        .await
}

pub fn register(registry: &mut ModuleRegistry) {
    register_states!(
        registry,
        MODULE,
        [availability_set_present, availability_set_absent]
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_names() {
        let members = json!([
            {"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/VM2"},
            {"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1"},
            {"name": "no-id"},
        ]);
        assert_eq!(member_names(&members), vec!["vm1", "vm2"]);
        assert!(member_names(&Value::Null).is_empty());
    }
}
