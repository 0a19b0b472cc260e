use super::{prop, top, Attr, AttrType::*, ModelTable};
use crate::azure::Service;

fn id() -> Attr {
    top("id", Str)
}

fn name() -> Attr {
    top("name", Str)
}

fn location() -> Attr {
    top("location", Str)
}

fn tags() -> Attr {
    top("tags", Map)
}

fn ipsec_fields() -> Vec<Attr> {
    vec![
        top("sa_life_time_seconds", Int).required(),
        top("sa_data_size_kilobytes", Int).required(),
        top("ipsec_encryption", Str).required(),
        top("ipsec_integrity", Str).required(),
        top("ike_encryption", Str).required(),
        top("ike_integrity", Str).required(),
        top("dh_group", Str).required(),
        top("pfs_group", Str).required(),
    ]
}

pub(super) fn models() -> ModelTable {
    let n = Service::Network;
    vec![
        (n, "SubResource", vec![id()]),
        (n, "AddressSpace", vec![top("address_prefixes", StrList)]),
        (n, "DhcpOptions", vec![top("dns_servers", StrList)]),
        (
            n,
            "SecurityRule",
            vec![
                id(),
                name(),
                prop("description", Str),
                prop("protocol", Str).required(),
                prop("source_port_range", Str),
                prop("destination_port_range", Str),
                prop("source_address_prefix", Str),
                prop("destination_address_prefix", Str),
                prop("source_port_ranges", StrList),
                prop("destination_port_ranges", StrList),
                prop("source_address_prefixes", StrList),
                prop("destination_address_prefixes", StrList),
                prop("access", Str).required(),
                prop("priority", Int),
                prop("direction", Str).required(),
            ],
        ),
        (
            n,
            "NetworkSecurityGroup",
            vec![
                id(),
                location(),
                tags(),
                prop("security_rules", ModelList("SecurityRule")),
            ],
        ),
        (
            n,
            "Subnet",
            vec![
                id(),
                name(),
                prop("address_prefix", Str),
                prop("address_prefixes", StrList),
                prop("network_security_group", Model("SubResource")),
                prop("route_table", Model("SubResource")),
                prop("service_endpoints", Object),
                prop("delegations", Object),
            ],
        ),
        (
            n,
            "VirtualNetwork",
            vec![
                id(),
                location(),
                tags(),
                prop("address_space", Model("AddressSpace")),
                prop("dhcp_options", Model("DhcpOptions")),
                prop("subnets", ModelList("Subnet")),
                prop("enable_ddos_protection", Bool),
                prop("enable_vm_protection", Bool),
                prop("ddos_protection_plan", Model("SubResource")),
            ],
        ),
        (
            n,
            "VirtualNetworkPeering",
            vec![
                id(),
                name(),
                prop("remote_virtual_network", Model("SubResource")),
                prop("allow_virtual_network_access", Bool),
                prop("allow_forwarded_traffic", Bool),
                prop("allow_gateway_transit", Bool),
                prop("use_remote_gateways", Bool),
                prop("remote_address_space", Model("AddressSpace")),
                prop("peering_state", Str),
            ],
        ),
        (n, "Sku", vec![top("name", Str), top("tier", Str)]),
        (
            n,
            "PublicIPAddressDnsSettings",
            vec![
                top("domain_name_label", Str),
                top("fqdn", Str),
                top("reverse_fqdn", Str),
            ],
        ),
        (
            n,
            "PublicIPAddress",
            vec![
                id(),
                location(),
                tags(),
                top("sku", Model("Sku")),
                top("zones", StrList),
                prop("public_ip_allocation_method", Str).wire("publicIPAllocationMethod"),
                prop("public_ip_address_version", Str).wire("publicIPAddressVersion"),
                prop("dns_settings", Model("PublicIPAddressDnsSettings")),
                prop("ip_address", Str),
                prop("idle_timeout_in_minutes", Int),
                prop("ip_tags", Object),
            ],
        ),
        (
            n,
            "FrontendIPConfiguration",
            vec![
                id(),
                name(),
                top("zones", StrList),
                prop("private_ip_address", Str).wire("privateIPAddress"),
                prop("private_ip_allocation_method", Str).wire("privateIPAllocationMethod"),
                prop("subnet", Model("SubResource")),
                prop("public_ip_address", Model("SubResource")).wire("publicIPAddress"),
            ],
        ),
        (n, "BackendAddressPool", vec![id(), name()]),
        (
            n,
            "Probe",
            vec![
                id(),
                name(),
                prop("protocol", Str).required(),
                prop("port", Int).required(),
                prop("interval_in_seconds", Int),
                prop("number_of_probes", Int),
                prop("request_path", Str),
            ],
        ),
        (
            n,
            "LoadBalancingRule",
            vec![
                id(),
                name(),
                prop("frontend_ip_configuration", Model("SubResource"))
                    .wire("frontendIPConfiguration"),
                prop("backend_address_pool", Model("SubResource")),
                prop("probe", Model("SubResource")),
                prop("protocol", Str).required(),
                prop("load_distribution", Str),
                prop("frontend_port", Int).required(),
                prop("backend_port", Int),
                prop("idle_timeout_in_minutes", Int),
                prop("enable_floating_ip", Bool).wire("enableFloatingIP"),
                prop("disable_outbound_snat", Bool),
            ],
        ),
        (
            n,
            "InboundNatRule",
            vec![
                id(),
                name(),
                prop("frontend_ip_configuration", Model("SubResource"))
                    .wire("frontendIPConfiguration"),
                prop("protocol", Str),
                prop("frontend_port", Int),
                prop("backend_port", Int),
                prop("idle_timeout_in_minutes", Int),
                prop("enable_floating_ip", Bool).wire("enableFloatingIP"),
            ],
        ),
        (
            n,
            "InboundNatPool",
            vec![
                id(),
                name(),
                prop("frontend_ip_configuration", Model("SubResource"))
                    .wire("frontendIPConfiguration"),
                prop("protocol", Str).required(),
                prop("frontend_port_range_start", Int).required(),
                prop("frontend_port_range_end", Int).required(),
                prop("backend_port", Int).required(),
                prop("idle_timeout_in_minutes", Int),
                prop("enable_floating_ip", Bool).wire("enableFloatingIP"),
            ],
        ),
        (
            n,
            "OutboundNatRule",
            vec![
                id(),
                name(),
                prop("allocated_outbound_ports", Int),
                prop("frontend_ip_configuration", Model("SubResource"))
                    .wire("frontendIPConfiguration"),
                prop("backend_address_pool", Model("SubResource")),
            ],
        ),
        (
            n,
            "LoadBalancer",
            vec![
                id(),
                location(),
                tags(),
                top("sku", Model("Sku")),
                prop("frontend_ip_configurations", ModelList("FrontendIPConfiguration"))
                    .wire("frontendIPConfigurations"),
                prop("backend_address_pools", ModelList("BackendAddressPool")),
                prop("load_balancing_rules", ModelList("LoadBalancingRule")),
                prop("probes", ModelList("Probe")),
                prop("inbound_nat_rules", ModelList("InboundNatRule")),
                prop("inbound_nat_pools", ModelList("InboundNatPool")),
                prop("outbound_nat_rules", ModelList("OutboundNatRule")),
            ],
        ),
        (
            n,
            "NetworkInterfaceIPConfiguration",
            vec![
                id(),
                name(),
                prop("private_ip_address", Str).wire("privateIPAddress"),
                prop("private_ip_allocation_method", Str).wire("privateIPAllocationMethod"),
                prop("private_ip_address_version", Str).wire("privateIPAddressVersion"),
                prop("subnet", Model("SubResource")),
                prop("primary", Bool),
                prop("public_ip_address", Model("SubResource")).wire("publicIPAddress"),
                prop("load_balancer_backend_address_pools", ModelList("SubResource")),
                prop("load_balancer_inbound_nat_rules", ModelList("SubResource")),
                prop("application_gateway_backend_address_pools", ModelList("SubResource")),
            ],
        ),
        (
            n,
            "NetworkInterfaceDnsSettings",
            vec![
                top("dns_servers", StrList),
                top("internal_dns_name_label", Str),
            ],
        ),
        (
            n,
            "NetworkInterface",
            vec![
                id(),
                location(),
                tags(),
                prop("virtual_machine", Model("SubResource")),
                prop("network_security_group", Model("SubResource")),
                prop("ip_configurations", ModelList("NetworkInterfaceIPConfiguration"))
                    .wire("ipConfigurations"),
                prop("dns_settings", Model("NetworkInterfaceDnsSettings")),
                prop("mac_address", Str),
                prop("primary", Bool),
                prop("enable_accelerated_networking", Bool),
                prop("enable_ip_forwarding", Bool).wire("enableIPForwarding"),
            ],
        ),
        (
            n,
            "RouteFilterRule",
            vec![
                id(),
                name(),
                location(),
                prop("access", Str).required(),
                prop("route_filter_rule_type", Str).required(),
                prop("communities", StrList).required(),
            ],
        ),
        (
            n,
            "RouteFilter",
            vec![
                id(),
                location(),
                tags(),
                prop("rules", ModelList("RouteFilterRule")),
            ],
        ),
        (
            n,
            "Route",
            vec![
                id(),
                name(),
                prop("address_prefix", Str),
                prop("next_hop_type", Str).required(),
                prop("next_hop_ip_address", Str),
            ],
        ),
        (
            n,
            "RouteTable",
            vec![
                id(),
                location(),
                tags(),
                prop("routes", ModelList("Route")),
                prop("disable_bgp_route_propagation", Bool),
            ],
        ),
        (
            n,
            "VirtualNetworkGatewaySku",
            vec![top("name", Str), top("tier", Str), top("capacity", Int)],
        ),
        (
            n,
            "VirtualNetworkGatewayIPConfiguration",
            vec![
                id(),
                name(),
                prop("private_ip_allocation_method", Str).wire("privateIPAllocationMethod"),
                prop("subnet", Model("SubResource")),
                prop("public_ip_address", Model("SubResource")).wire("publicIPAddress"),
            ],
        ),
        (
            n,
            "BgpSettings",
            vec![
                top("asn", Int),
                top("bgp_peering_address", Str),
                top("peer_weight", Int),
            ],
        ),
        (
            n,
            "VirtualNetworkGateway",
            vec![
                id(),
                location(),
                tags(),
                prop("ip_configurations", ModelList("VirtualNetworkGatewayIPConfiguration"))
                    .wire("ipConfigurations"),
                prop("gateway_type", Str),
                prop("vpn_type", Str),
                prop("enable_bgp", Bool),
                prop("active_active", Bool),
                prop("gateway_default_site", Model("SubResource")),
                prop("sku", Model("VirtualNetworkGatewaySku")),
                prop("vpn_client_configuration", Object),
                prop("bgp_settings", Model("BgpSettings")),
                prop("custom_routes", Model("AddressSpace")),
            ],
        ),
        (
            n,
            "LocalNetworkGateway",
            vec![
                id(),
                location(),
                tags(),
                prop("local_network_address_space", Model("AddressSpace")),
                prop("gateway_ip_address", Str),
                prop("bgp_settings", Model("BgpSettings")),
            ],
        ),
        (n, "IpsecPolicy", ipsec_fields()),
        (n, "VpnClientIPsecParameters", ipsec_fields()),
        (
            n,
            "VirtualNetworkGatewayConnection",
            vec![
                id(),
                location(),
                tags(),
                prop("virtual_network_gateway1", Model("SubResource")).required(),
                prop("virtual_network_gateway2", Model("SubResource")),
                prop("local_network_gateway2", Model("SubResource")),
                prop("connection_type", Str).required(),
                prop("connection_protocol", Str),
                prop("routing_weight", Int),
                prop("shared_key", Str),
                prop("authorization_key", Str),
                prop("peer", Model("SubResource")),
                prop("enable_bgp", Bool),
                prop("use_policy_based_traffic_selectors", Bool),
                prop("ipsec_policies", ModelList("IpsecPolicy")),
                prop("express_route_gateway_bypass", Bool),
            ],
        ),
        (n, "ConnectionSharedKey", vec![id(), top("value", Str).required()]),
        (
            n,
            "ConnectionResetSharedKey",
            vec![top("key_length", Int).required()],
        ),
        (
            n,
            "VpnClientParameters",
            vec![
                top("processor_architecture", Str),
                top("authentication_method", Str),
                top("radius_server_auth_certificate", Str),
                top("client_root_certificates", StrList),
            ],
        ),
        (
            n,
            "VpnDeviceScriptParameters",
            vec![
                top("vendor", Str),
                top("device_family", Str),
                top("firmware_version", Str),
            ],
        ),
    ]
}
