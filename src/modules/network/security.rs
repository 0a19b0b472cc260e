//! Network security groups and their rules.

use serde_json::{json, Value};
use tracing::error;

use super::{net_path, sub_path};
use crate::azure::{api, ArmRequest, Service};
use crate::modules::arm::{
    error_value, fetch, is_error, list_keyed, list_plain, model_or_return, name, params_with,
    resource_group, send_bool, truthy, with_location,
};
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};

const NET: Service = Service::Network;

/// Plural/singular argument pairs of a security rule. One of each pair must
/// be given, and the plural form wins.
pub const EXCLUSIVE_PAIRS: [(&str, &str); 4] = [
    ("source_port_ranges", "source_port_range"),
    ("source_address_prefixes", "source_address_prefix"),
    ("destination_port_ranges", "destination_port_range"),
    ("destination_address_prefixes", "destination_address_prefix"),
];

/// Apply the exclusive-pair rules to rule arguments.
///
/// On success the returned copy has the singular form of every pair whose
/// plural was given cleared. On failure the message says which pair is wrong.
pub fn resolve_exclusive_pairs(params: &ModuleParams) -> Result<ModuleParams, String> {
    let mut out = params.clone();
    for (plural, singular) in EXCLUSIVE_PAIRS {
        let many = params.get(plural);
        if !truthy(many) && !truthy(params.get(singular)) {
            return Err(format!(
                "Either the {} or {} parameter must be provided!",
                plural, singular
            ));
        }
        if truthy(many) {
            if !matches!(many, Some(Value::Array(_))) {
                return Err(format!("The {} parameter must be a list!", plural));
            }
            out.insert(singular.to_string(), Value::Null);
        }
    }
    Ok(out)
}

fn nsg_path(client: &dyn crate::azure::ArmClient, rg: &str, nsg: &str) -> String {
    net_path(client, rg, &format!("networkSecurityGroups/{}", nsg))
}

/// The rule name, given as `security_rule` or `name`.
fn rule_name(params: &ModuleParams) -> ModuleResult<String> {
    match params.get_string("security_rule")? {
        Some(rule) => Ok(rule),
        None => name(params),
    }
}

/// Find one default rule of a security group by name.
pub async fn default_security_rule_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rule = name(params)?;
    let group = params.get_string_required("security_group")?;
    let defaults = default_security_rules_list(ctx, params).await?;
    if is_error(&defaults) {
        return Ok(defaults);
    }
    let found = defaults.as_array().and_then(|rules| {
        rules
            .iter()
            .find(|r| r.get("name").and_then(|n| n.as_str()) == Some(rule.as_str()))
            .cloned()
    });
    Ok(found.unwrap_or_else(|| error_value(format!("Unable to find {} in {}!", rule, group))))
}

/// Default rules of a security group.
pub async fn default_security_rules_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let group = params.get_string_required("security_group")?;
    let nsg = network_security_group_get(ctx, &params_with(params, &[("name", json!(group))])).await?;
    if is_error(&nsg) {
        return Ok(nsg);
    }
    Ok(match nsg.get("default_security_rules") {
        Some(rules) => rules.clone(),
        None => {
            error!("No default security rules found for {}!", group);
            error_value("default_security_rules")
        }
    })
}

/// Rules of a security group, as a plain list.
pub async fn security_rules_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let group = params.get_string_required("security_group")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/securityRules", nsg_path(client.as_ref(), &rg, &group));
    list_plain(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

/// Create or update a security rule.
pub async fn security_rule_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rule = name(params)?;
    for required in ["access", "direction", "priority", "protocol"] {
        params.get_string_required(required)?;
    }
    let group = params.get_string_required("security_group")?;
    let rg = resource_group(params)?;

    let kwargs = match resolve_exclusive_pairs(params) {
        Ok(kwargs) => kwargs,
        Err(message) => {
            error!("{}", message);
            return Ok(Value::Bool(false));
        }
    };

    let client = ctx.client(NET, params).await?;
    let body = model_or_return!(NET, "SecurityRule", &kwargs);
    let path = format!("{}/securityRules/{}", nsg_path(client.as_ref(), &rg, &group), rule);
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn security_rule_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rule = rule_name(params)?;
    let group = params.get_string_required("security_group")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/securityRules/{}", nsg_path(client.as_ref(), &rg, &group), rule);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn security_rule_get(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let rule = rule_name(params)?;
    let group = params.get_string_required("security_group")?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = format!("{}/securityRules/{}", nsg_path(client.as_ref(), &rg, &group), rule);
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

pub async fn network_security_group_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let group = name(params)?;
    let rg = resource_group(params)?;
    let Some(kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(NET, params).await?;
    let body = model_or_return!(NET, "NetworkSecurityGroup", &kwargs);
    let path = nsg_path(client.as_ref(), &rg, &group);
    fetch(client.as_ref(), ArmRequest::put(path, api::NETWORK).body(body), NET, params).await
}

pub async fn network_security_group_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let group = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = nsg_path(client.as_ref(), &rg, &group);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::NETWORK), NET, params).await
}

pub async fn network_security_group_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let group = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = nsg_path(client.as_ref(), &rg, &group);
    fetch(client.as_ref(), ArmRequest::get(path, api::NETWORK), NET, params).await
}

pub async fn network_security_groups_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(NET, params).await?;
    let path = net_path(client.as_ref(), &rg, "networkSecurityGroups");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

pub async fn network_security_groups_list_all(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(NET, params).await?;
    let path = sub_path(client.as_ref(), "networkSecurityGroups");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::NETWORK), "name", NET, params).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: Value) -> ModuleParams {
        pairs
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[test]
    fn test_plural_wins_over_singular() {
        let resolved = resolve_exclusive_pairs(&params(json!({
            "source_port_ranges": ["80", "443"],
            "source_port_range": "22",
            "source_address_prefix": "*",
            "destination_port_range": "*",
            "destination_address_prefix": "*",
        })))
        .unwrap();
        assert_eq!(resolved["source_port_range"], Value::Null);
        assert_eq!(resolved["source_address_prefix"], json!("*"));
    }

    #[test]
    fn test_missing_pair_is_reported() {
        let err = resolve_exclusive_pairs(&params(json!({
            "source_port_range": "*",
            "source_address_prefix": "*",
            "destination_port_range": "*",
        })))
        .unwrap_err();
        assert_eq!(
            err,
            "Either the destination_address_prefixes or destination_address_prefix parameter must be provided!"
        );
    }

    #[test]
    fn test_plural_must_be_a_list() {
        let err = resolve_exclusive_pairs(&params(json!({
            "source_port_ranges": "80",
            "source_address_prefix": "*",
            "destination_port_range": "*",
            "destination_address_prefix": "*",
        })))
        .unwrap_err();
        assert_eq!(err, "The source_port_ranges parameter must be a list!");
    }
}
