//! pfSense configuration schema.
//!
//! Declares every section of a `config.xml` backup that pfFocus understands.
//! Sections not listed here (packages, certificates, shaper, ...) are skipped
//! while parsing. The interface and DHCP containers accept any `opt<N>`
//! child through a prefix fallback because their keys are user-assigned.

use std::sync::{Arc, OnceLock};

use schema_tree_core::{
    Schema, SchemaBuilder, SchemaError, FLAG, INTEGER, PORT, REFERENCE, TEXT, TIMESTAMP,
};

/// Type name of the synthetic document root.
pub const DOCUMENT: &str = "document";

/// Location fields that are mutually exclusive.
pub const LOCATION_TARGETS: [&str; 3] = ["any", "network", "address"];

static SCHEMA: OnceLock<Result<Arc<Schema>, SchemaError>> = OnceLock::new();

/// Shared pfSense schema, validated on first use.
pub fn pfsense_schema() -> Result<Arc<Schema>, SchemaError> {
    SCHEMA.get_or_init(|| build_schema().map(Arc::new)).clone()
}

fn build_schema() -> Result<Schema, SchemaError> {
    let mut b = SchemaBuilder::new();

    b.structured(DOCUMENT).one("pfsense", "config");
    b.structured("config")
        .one("version", TEXT)
        .one("lastchange", TEXT)
        .one("revision", "revision")
        .one("system", "system")
        .one("interfaces", "interfaces")
        .one("vlans", "vlans")
        .one("bridges", "bridges")
        .one("gateways", "gateways")
        .one("staticroutes", "staticroutes")
        .one("dhcpd", "dhcpd")
        .one("aliases", "aliases")
        .one("nat", "nat")
        .one("filter", "filter")
        .one("dnsmasq", "dnsmasq")
        .one("openvpn", "openvpn")
        .one("syslog", "syslog")
        .one("sysctl", "sysctl");

    b.structured("revision")
        .one("time", TIMESTAMP)
        .one("description", TEXT)
        .one("username", TEXT);
    b.structured("change")
        .one("time", TIMESTAMP)
        .one("username", TEXT);

    declare_system(&mut b);
    declare_network(&mut b);
    declare_dhcpd(&mut b);
    declare_firewall(&mut b);
    declare_services(&mut b);
    declare_openvpn(&mut b);

    b.build(DOCUMENT)
}

fn declare_system(b: &mut SchemaBuilder) {
    b.structured("system")
        .one("optimization", TEXT)
        .one("hostname", TEXT)
        .one("domain", TEXT)
        .one("timeservers", TEXT)
        .one("timezone", TEXT)
        .one("language", TEXT)
        .many("dnsserver", TEXT)
        .one("webgui", "webgui")
        .many("group", "group")
        .many("user", "user")
        .one("disablenatreflection", TEXT);
    b.structured("webgui")
        .one("protocol", TEXT)
        .one("port", PORT)
        .one("ssl-certref", TEXT);
    b.structured("group")
        .one("name", TEXT)
        .one("description", TEXT)
        .one("scope", TEXT)
        .one("gid", INTEGER)
        .many("member", TEXT)
        .many("priv", TEXT);
    b.structured("user")
        .one("name", TEXT)
        .one("descr", TEXT)
        .one("scope", TEXT)
        .one("groupname", TEXT)
        .one("uid", INTEGER)
        .one("expires", TEXT)
        .one("disabled", FLAG)
        .many("priv", TEXT);
}

fn declare_network(b: &mut SchemaBuilder) {
    b.structured("interfaces")
        .one("wan", "interface")
        .one("lan", "interface")
        .prefix("opt", "interface");
    b.structured("interface")
        .one("if", TEXT)
        .one("descr", TEXT)
        .one("ipaddr", TEXT)
        .one("subnet", TEXT)
        .one("ipaddrv6", TEXT)
        .one("subnetv6", TEXT)
        .one("gateway", TEXT)
        .one("gatewayv6", TEXT)
        .one("mtu", INTEGER)
        .one("spoofmac", TEXT)
        .one("enable", FLAG)
        .one("blockpriv", FLAG)
        .one("blockbogons", FLAG);

    b.structured("vlans").many("vlan", "vlan");
    b.structured("vlan")
        .one("if", TEXT)
        .one("tag", INTEGER)
        .one("pcp", TEXT)
        .one("descr", TEXT)
        .one("vlanif", TEXT);

    b.structured("bridges").many("bridged", "bridge");
    b.structured("bridge")
        .one("members", REFERENCE)
        .one("descr", TEXT)
        .one("bridgeif", TEXT);

    b.structured("gateways")
        .many("gateway_item", "gateway")
        .one("defaultgw4", TEXT)
        .one("defaultgw6", TEXT);
    b.structured("gateway")
        .one("interface", REFERENCE)
        .one("gateway", TEXT)
        .one("name", TEXT)
        .one("weight", INTEGER)
        .one("ipprotocol", TEXT)
        .one("monitor", TEXT)
        .one("descr", TEXT)
        .one("defaultgw", FLAG);

    b.structured("staticroutes").many("route", "route");
    b.structured("route")
        .one("network", REFERENCE)
        .one("gateway", TEXT)
        .one("descr", TEXT)
        .one("disabled", FLAG);
}

fn declare_dhcpd(b: &mut SchemaBuilder) {
    b.structured("dhcpd")
        .one("wan", "dhcpd_interface")
        .one("lan", "dhcpd_interface")
        .prefix("opt", "dhcpd_interface");
    b.structured("dhcpd_interface")
        .one("enable", FLAG)
        .one("defaultleasetime", INTEGER)
        .one("maxleasetime", INTEGER)
        .one("gateway", TEXT)
        .one("domain", TEXT)
        .one("netmask", TEXT)
        .many("dnsserver", TEXT)
        .many("range", "dhcp_range")
        .many("staticmap", "staticmap");
    b.structured("dhcp_range").one("from", TEXT).one("to", TEXT);
    b.structured("staticmap")
        .one("mac", TEXT)
        .one("cid", TEXT)
        .one("ipaddr", TEXT)
        .one("hostname", TEXT)
        .one("descr", TEXT);
}

fn declare_firewall(b: &mut SchemaBuilder) {
    b.structured("aliases").many("alias", "alias");
    b.structured("alias")
        .one("name", TEXT)
        .one("type", TEXT)
        .one("address", TEXT)
        .one("descr", TEXT)
        .one("detail", TEXT)
        .one("url", TEXT)
        .one("updatefreq", TEXT);

    b.choice("location", &LOCATION_TARGETS)
        .one("any", FLAG)
        .one("network", REFERENCE)
        .one("address", REFERENCE)
        .one("port", PORT)
        .one("not", FLAG);

    b.structured("nat")
        .many("rule", "nat_rule")
        .one("outbound", "nat_outbound");
    b.structured("nat_rule")
        .one("source", "location")
        .one("destination", "location")
        .one("protocol", TEXT)
        .one("target", TEXT)
        .one("local-port", PORT)
        .one("interface", REFERENCE)
        .one("descr", TEXT)
        .one("associated-rule-id", TEXT)
        .one("disabled", FLAG)
        .one("created", "change")
        .one("updated", "change");
    b.structured("nat_outbound")
        .one("mode", TEXT)
        .many("rule", "outbound_rule");
    b.structured("outbound_rule")
        .one("interface", REFERENCE)
        .one("source", "location")
        .one("destination", "location")
        .one("dstport", PORT)
        .one("protocol", TEXT)
        .one("target", TEXT)
        .one("targetip", TEXT)
        .one("targetip_subnet", TEXT)
        .one("natport", PORT)
        .one("staticnatport", FLAG)
        .one("nonat", FLAG)
        .one("descr", TEXT)
        .one("disabled", FLAG)
        .one("created", "change")
        .one("updated", "change");

    b.structured("filter").many("rule", "filter_rule");
    b.structured("filter_rule")
        .one("id", TEXT)
        .one("tracker", TEXT)
        .one("type", TEXT)
        .one("interface", REFERENCE)
        .one("ipprotocol", TEXT)
        .one("tag", TEXT)
        .one("tagged", TEXT)
        .one("max", TEXT)
        .one("max-src-nodes", TEXT)
        .one("max-src-conn", TEXT)
        .one("max-src-states", TEXT)
        .one("statetimeout", TEXT)
        .one("statetype", TEXT)
        .one("os", TEXT)
        .one("protocol", TEXT)
        .one("source", "location")
        .one("destination", "location")
        .one("gateway", TEXT)
        .one("sched", TEXT)
        .one("floating", TEXT)
        .one("quick", FLAG)
        .one("log", FLAG)
        .one("descr", TEXT)
        .one("associated-rule-id", TEXT)
        .one("disabled", FLAG)
        .one("created", "change")
        .one("updated", "change");
}

fn declare_services(b: &mut SchemaBuilder) {
    b.structured("dnsmasq")
        .one("enable", FLAG)
        .one("regdhcp", FLAG)
        .one("regdhcpstatic", FLAG)
        .one("strict_order", FLAG)
        .one("custom_options", TEXT)
        .one("interface", REFERENCE)
        .many("hosts", "dnsmasq_host")
        .many("domainoverrides", "domainoverride");
    b.structured("dnsmasq_host")
        .one("host", TEXT)
        .one("domain", TEXT)
        .one("ip", TEXT)
        .one("descr", TEXT)
        .one("aliases", "host_aliases");
    b.structured("host_aliases").many("item", "host_alias");
    b.structured("host_alias")
        .one("host", TEXT)
        .one("domain", TEXT)
        .one("description", TEXT);
    b.structured("domainoverride")
        .one("domain", TEXT)
        .one("ip", TEXT)
        .one("descr", TEXT);

    b.structured("syslog")
        .one("enable", FLAG)
        .one("logall", FLAG)
        .one("reverse", FLAG)
        .one("logfilesize", INTEGER)
        .one("nentries", INTEGER)
        .one("remoteserver", TEXT)
        .one("remoteserver2", TEXT)
        .one("remoteserver3", TEXT)
        .one("sourceip", TEXT)
        .one("ipproto", TEXT);

    b.structured("sysctl").many("item", "tunable");
    b.structured("tunable")
        .one("tunable", TEXT)
        .one("value", TEXT)
        .one("descr", TEXT);
}

fn declare_openvpn(b: &mut SchemaBuilder) {
    b.structured("openvpn")
        .many("openvpn-server", "openvpn_server")
        .many("openvpn-client", "openvpn_client")
        .many("openvpn-csc", "openvpn_csc");
    b.structured("openvpn_server")
        .one("vpnid", INTEGER)
        .one("mode", TEXT)
        .one("authmode", TEXT)
        .one("protocol", TEXT)
        .one("dev_mode", TEXT)
        .one("interface", REFERENCE)
        .one("ipaddr", TEXT)
        .one("local_port", PORT)
        .one("crypto", TEXT)
        .one("digest", TEXT)
        .one("tunnel_network", TEXT)
        .one("remote_network", TEXT)
        .one("local_network", TEXT)
        .one("dynamic_ip", TEXT)
        .one("pool_enable", TEXT)
        .one("topology", TEXT)
        .one("description", TEXT)
        .one("custom_options", TEXT)
        .one("disable", FLAG);
    b.structured("openvpn_client")
        .one("vpnid", INTEGER)
        .one("auth_user", TEXT)
        .one("mode", TEXT)
        .one("protocol", TEXT)
        .one("dev_mode", TEXT)
        .one("interface", REFERENCE)
        .one("ipaddr", TEXT)
        .one("local_port", PORT)
        .one("server_addr", TEXT)
        .one("server_port", PORT)
        .one("crypto", TEXT)
        .one("digest", TEXT)
        .one("tunnel_network", TEXT)
        .one("remote_network", TEXT)
        .one("local_network", TEXT)
        .one("topology", TEXT)
        .one("description", TEXT)
        .one("custom_options", TEXT)
        .one("disable", FLAG);
    b.structured("openvpn_csc")
        .one("server_list", TEXT)
        .one("common_name", TEXT)
        .one("description", TEXT)
        .one("tunnel_network", TEXT)
        .one("disable", FLAG);
}

#[cfg(test)]
mod tests {
    use schema_tree_core::{Cardinality, LeafKind, Shape};

    use super::pfsense_schema;

    #[test]
    fn schema_declarations_are_consistent() {
        let schema = pfsense_schema().expect("pfSense schema should validate");
        let config = schema.type_id("config").expect("config type");
        assert!(schema.child(config, "filter").is_some());
        assert!(schema.child(config, "installedpackages").is_none());
    }

    #[test]
    fn optional_interfaces_fall_back_to_interface_type() {
        let schema = pfsense_schema().expect("schema");
        let interfaces = schema.type_id("interfaces").expect("interfaces");
        let dhcpd = schema.type_id("dhcpd").expect("dhcpd");

        let opt = schema.child(interfaces, "opt7").expect("opt7");
        assert_eq!(opt.cardinality, Cardinality::Single);
        assert_eq!(schema.decl(opt.ty).name(), "interface");
        assert_eq!(
            schema.decl(schema.child(dhcpd, "opt3").expect("opt3").ty).name(),
            "dhcpd_interface"
        );
        assert!(schema.child(interfaces, "dmz").is_none());
    }

    #[test]
    fn openvpn_children_use_hyphenated_element_names() {
        let schema = pfsense_schema().expect("schema");
        let openvpn = schema.type_id("openvpn").expect("openvpn");
        let server = schema.child(openvpn, "openvpn-server").expect("server");
        assert_eq!(server.cardinality, Cardinality::Repeated);
    }

    #[test]
    fn locations_are_choice_nodes_with_reference_targets() {
        let schema = pfsense_schema().expect("schema");
        let location = schema.type_id("location").expect("location");
        assert_eq!(schema.decl(location).shape(), Shape::Choice);
        let address = schema.child(location, "address").expect("address");
        assert_eq!(
            schema.decl(address.ty).leaf_kind(),
            Some(LeafKind::Reference)
        );
    }
}
