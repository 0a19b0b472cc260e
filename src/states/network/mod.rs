//! `azurearm_network` state functions.

mod balancer;
mod gateway;
mod route;
mod security;
mod vnet;

use serde_json::{json, Value};

use super::diff::capitalize;
use crate::modules::network::MODULE;
use crate::modules::{register_states, ModuleParams, ModuleRegistry};

/// `sku` given as a plain name, as the `{"name": ...}` mapping the service
/// returns.
fn sku_mapping(params: &ModuleParams) -> Option<Value> {
    match params.get("sku") {
        Some(Value::String(sku)) if !sku.is_empty() => Some(json!({ "name": capitalize(sku) })),
        Some(sku @ Value::Object(_)) => Some(sku.clone()),
        _ => None,
    }
}

/// Copy of `params` with `sku` in mapping form.
fn with_sku(params: &ModuleParams) -> ModuleParams {
    let mut out = params.clone();
    if let Some(sku) = sku_mapping(params) {
        out.insert("sku".to_string(), sku);
    }
    out
}

/// `new` side of a create: the listed arguments, skipping missing ones.
fn given(params: &ModuleParams, keys: &[&str]) -> serde_json::Map<String, Value> {
    keys.iter()
        .filter_map(|key| {
            params
                .get(*key)
                .filter(|v| !v.is_null())
                .map(|v| ((*key).to_string(), v.clone()))
        })
        .collect()
}

pub fn register(registry: &mut ModuleRegistry) {
    use balancer::*;
    use gateway::*;
    use route::*;
    use security::*;
    use vnet::*;

    register_states!(
        registry,
        MODULE,
        [
            virtual_network_present,
            virtual_network_absent,
            subnet_present,
            subnet_absent,
            virtual_network_peering_present,
            virtual_network_peering_absent,
            network_security_group_present,
            network_security_group_absent,
            security_rule_present,
            security_rule_absent,
            load_balancer_present,
            load_balancer_absent,
            public_ip_address_present,
            public_ip_address_absent,
            network_interface_present,
            network_interface_absent,
            route_table_present,
            route_table_absent,
            route_present,
            route_absent,
            virtual_network_gateway_connection_present,
            virtual_network_gateway_connection_absent,
            virtual_network_gateway_present,
            virtual_network_gateway_absent,
            local_network_gateway_present,
            local_network_gateway_absent,
        ]
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku_mapping() {
        let mut params = ModuleParams::new();
        assert_eq!(sku_mapping(&params), None);
        params.insert("sku".to_string(), json!("standard"));
        assert_eq!(sku_mapping(&params), Some(json!({"name": "Standard"})));
        params.insert("sku".to_string(), json!({"name": "Basic", "tier": "Regional"}));
        assert_eq!(with_sku(&params)["sku"]["tier"], json!("Regional"));
    }

    #[test]
    fn test_given_skips_null() {
        let mut params = ModuleParams::new();
        params.insert("tags".to_string(), json!({"a": "b"}));
        params.insert("sku".to_string(), Value::Null);
        let new = given(&params, &["tags", "sku", "zones"]);
        assert_eq!(Value::Object(new), json!({"tags": {"a": "b"}}));
    }
}
