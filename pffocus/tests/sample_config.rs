use std::path::PathBuf;

use pffocus::document::{LocationTarget, PfSenseDocument};
use pffocus::resolve::{Resolution, Resolved};
use pretty_assertions::assert_eq;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn sample() -> PfSenseDocument {
    PfSenseDocument::parse_file(&fixture("fixtures/pfsense-sample.xml")).expect("parse sample")
}

#[test]
fn sample_exposes_sections() {
    let doc = sample();
    assert_eq!(doc.version(), Some("21.7"));
    assert_eq!(doc.hostname(), Some("gateway"));
    assert_eq!(doc.interface_keys(), ["wan", "lan", "opt1"]);
    assert_eq!(doc.aliases().len(), 2);
    assert_eq!(doc.filter_rules().len(), 3);
    assert_eq!(doc.nat_rules().len(), 1);
    assert_eq!(doc.outbound_nat_rules().len(), 1);
    assert!(doc.has_path("openvpn.openvpn_server"));
    assert!(!doc.has_path("cert"));
}

#[test]
fn negated_destination_points_at_interface_address() {
    let doc = sample();
    let tree = doc.tree();
    let rule = doc.filter_rules()[2];
    let destination = doc.location(tree.attr(rule, "destination").expect("destination"));

    assert!(destination.negated);
    assert_eq!(destination.port, Some("1024-65535"));
    let Some(LocationTarget::Network(network)) = destination.target else {
        panic!("expected network target");
    };
    let Some(Resolved::One(Resolution::Interface { name, .. })) =
        doc.resolve(network).expect("resolve")
    else {
        panic!("expected interface");
    };
    assert_eq!(name, "lan");
}

#[test]
fn bridge_members_resolve_to_each_interface() {
    let doc = sample();
    let tree = doc.tree();
    let bridge = tree.list(doc.section("bridges").expect("bridges"), "bridged")[0];
    let members = tree.attr(bridge, "members").expect("members");

    let Some(Resolved::Many(items)) = doc.resolve(members).expect("resolve") else {
        panic!("expected a list");
    };
    let names: Vec<String> = items.iter().map(ToString::to_string).collect();
    assert_eq!(names, ["interface:lan", "interface:opt1"]);
}

#[test]
fn static_route_resolves_alias() {
    let doc = sample();
    let tree = doc.tree();
    let route = tree.list(doc.section("staticroutes").expect("routes"), "route")[0];
    let network = tree.attr(route, "network").expect("network");

    assert_eq!(
        doc.resolve(network).expect("resolve").map(|r| r.to_string()),
        Some("alias:webservers".to_string())
    );
}
