//! `azurearm_network` execution functions.

mod gateway;
mod interface;
mod load_balancer;
mod public_ip;
mod route;
mod security;
mod vnet;

pub use gateway::*;
pub use interface::*;
pub use load_balancer::*;
pub use public_ip::*;
pub use route::*;
pub use security::*;
pub use vnet::*;

use serde_json::{json, Value};

use super::arm::is_error;
use super::{register_execution, ModuleRegistry};
use crate::azure::{ids, ArmClient};

pub const MODULE: &str = "azurearm_network";

const PROVIDER: &str = "Microsoft.Network";

/// Path of a network resource inside a resource group.
fn net_path(client: &dyn ArmClient, resource_group: &str, rest: &str) -> String {
    ids::provider(client.subscription_id(), resource_group, PROVIDER, rest)
}

/// Path of a subscription-wide network collection.
fn sub_path(client: &dyn ArmClient, rest: &str) -> String {
    format!(
        "{}/providers/{}/{}",
        ids::subscription(client.subscription_id()),
        PROVIDER,
        rest
    )
}

/// `{"id": ...}` reference to a fetched resource, unless the fetch failed.
fn id_ref(resource: &Value) -> Option<Value> {
    if is_error(resource) {
        return None;
    }
    resource
        .get("id")
        .and_then(|id| id.as_str())
        .map(|id| json!({ "id": id }))
}

pub fn register(registry: &mut ModuleRegistry) {
    register_execution!(
        registry,
        MODULE,
        [
            check_dns_name_availability,
            check_ip_address_availability,
            default_security_rule_get,
            default_security_rules_list,
            security_rules_list,
            security_rule_create_or_update,
            security_rule_delete,
            security_rule_get,
            network_security_group_create_or_update,
            network_security_group_delete,
            network_security_group_get,
            network_security_groups_list,
            network_security_groups_list_all,
            subnets_list,
            subnet_get,
            subnet_create_or_update,
            subnet_delete,
            virtual_networks_list_all,
            virtual_networks_list,
            virtual_network_create_or_update,
            virtual_network_delete,
            virtual_network_get,
            load_balancers_list_all,
            load_balancers_list,
            load_balancer_get,
            load_balancer_create_or_update,
            load_balancer_delete,
            usages_list,
            network_interface_delete,
            network_interface_get,
            network_interface_create_or_update,
            network_interfaces_list_all,
            network_interfaces_list,
            network_interface_get_effective_route_table,
            network_interface_list_effective_network_security_groups,
            list_virtual_machine_scale_set_vm_network_interfaces,
            list_virtual_machine_scale_set_network_interfaces,
            get_virtual_machine_scale_set_network_interface,
            public_ip_address_delete,
            public_ip_address_get,
            public_ip_address_create_or_update,
            public_ip_addresses_list_all,
            public_ip_addresses_list,
            route_filter_rule_delete,
            route_filter_rule_get,
            route_filter_rule_create_or_update,
            route_filter_rules_list,
            route_filter_delete,
            route_filter_get,
            route_filter_create_or_update,
            route_filters_list,
            route_filters_list_all,
            route_delete,
            route_get,
            route_create_or_update,
            routes_list,
            route_table_delete,
            route_table_get,
            route_table_create_or_update,
            route_tables_list,
            route_tables_list_all,
            virtual_network_gateway_connection_create_or_update,
            virtual_network_gateway_connection_get,
            virtual_network_gateway_connection_delete,
            virtual_network_gateway_connection_set_shared_key,
            virtual_network_gateway_connection_get_shared_key,
            virtual_network_gateway_connection_reset_shared_key,
            virtual_network_gateway_connections_list,
            virtual_network_gateways_list,
            virtual_network_gateway_create_or_update,
            virtual_network_gateway_get,
            virtual_network_gateway_delete,
            virtual_network_gateway_list_connections,
            virtual_network_gateway_reset,
            virtual_network_gateway_reset_vpn_client_shared_key,
            virtual_network_gateway_generatevpnclientpackage,
            virtual_network_gateway_generate_vpn_profile,
            virtual_network_gateway_get_vpn_profile_package_url,
            virtual_network_gateway_get_bgp_peer_status,
            virtual_network_gateway_supported_vpn_devices,
            virtual_network_gateway_get_learned_routes,
            virtual_network_gateway_get_advertised_routes,
            virtual_network_gateway_set_vpnclient_ipsec_parameters,
            virtual_network_gateway_get_vpnclient_ipsec_parameters,
            virtual_network_gateway_vpn_device_configuration_script,
            local_network_gateway_create_or_update,
            local_network_gateway_get,
            local_network_gateway_delete,
            local_network_gateways_list,
            virtual_network_peerings_list,
            virtual_network_peering_get,
            virtual_network_peering_delete,
            virtual_network_peering_create_or_update,
        ]
    );
}
