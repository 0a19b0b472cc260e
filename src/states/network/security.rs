//! Network security group and security rule states.

use serde_json::{json, Value};

use super::given;
use crate::modules::arm::is_error;
use crate::modules::network as net;
use crate::modules::{ModuleContext, ModuleParams, ModuleResult};
use crate::states::{or_return, Compare, Field, Presence, StateReturn, StateRun};

pub async fn network_security_group_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Network security group")?);

    let nsg = net::network_security_group_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&nsg) {
        let fields = [
            Field::tags(),
            Field::new("security_rules", Compare::ListOfDicts { id_keys: &[] })
                .when(Presence::Truthy),
        ];
        or_return!(run.diff(&nsg, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        run.creating(json!({
            "name": run.name(),
            "resource_group": run.arg("resource_group"),
            "tags": run.arg("tags"),
            "security_rules": run.arg("security_rules"),
        }));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let created =
        net::network_security_group_create_or_update(ctx, &run.call_params(&[])).await?;
    Ok(run.created(&created))
}

pub async fn network_security_group_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Network security group")?);
    let nsg = net::network_security_group_get(ctx, &run.lookup(&[])).await?;
    run.absent(nsg, |p| async move {
        net::network_security_group_delete(ctx, &p).await
    })
    .await
}

fn rule_fields() -> Vec<Field> {
    let mut fields = vec![
        Field::new("access", Compare::Capitalized),
        Field::new("description", Compare::Exact),
        Field::new("direction", Compare::Capitalized),
        Field::new("priority", Compare::Integer),
        Field::new("protocol", Compare::CaseInsensitive).actual_or(json!("")),
        Field::new("destination_port_range", Compare::Exact),
        Field::new("source_port_range", Compare::Exact),
    ];
    for ranges in ["destination_port_ranges", "source_port_ranges"] {
        fields.push(
            Field::new(ranges, Compare::SortedList)
                .or(json!([]))
                .actual_or(json!([])),
        );
    }
    for prefix in ["destination_address_prefix", "source_address_prefix"] {
        fields.push(
            Field::new(prefix, Compare::CaseInsensitive)
                .or(json!(""))
                .actual_or(json!("")),
        );
    }
    for prefixes in ["destination_address_prefixes", "source_address_prefixes"] {
        fields.push(
            Field::new(prefixes, Compare::SortedListCaseInsensitive)
                .or(json!([]))
                .actual_or(json!([])),
        );
    }
    fields
}

/// Rule `name` of `security_group`. Every port range and address prefix is
/// given either in its singular or its plural form.
pub async fn security_rule_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Security rule")?);

    let desired = match net::resolve_exclusive_pairs(run.params()) {
        Ok(desired) => desired,
        Err(comment) => return Ok(run.fail(comment)),
    };

    let rule = net::security_rule_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&rule) {
        or_return!(run.diff_with(&desired, &rule, &rule_fields()));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        let mut new = given(
            &desired,
            &[
                "access",
                "description",
                "direction",
                "priority",
                "protocol",
                "destination_address_prefix",
                "destination_address_prefixes",
                "destination_port_range",
                "destination_port_ranges",
                "source_address_prefix",
                "source_address_prefixes",
                "source_port_range",
                "source_port_ranges",
            ],
        );
        new.insert("name".to_string(), json!(run.name()));
        run.creating(Value::Object(new));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let created = net::security_rule_create_or_update(ctx, &run.call_params(&[])).await?;
    Ok(run.created(&created))
}

pub async fn security_rule_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Security rule")?);
    let rule = net::security_rule_get(ctx, &run.lookup(&[])).await?;
    run.absent(rule, |p| async move { net::security_rule_delete(ctx, &p).await })
        .await
}
