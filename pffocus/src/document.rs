use std::io::BufRead;
use std::path::Path;

use schema_tree_core::{
    parse, parse_file, parse_reader, Child, Document, NodeId, ParseError, Value,
};

use crate::resolve::{ResolveError, Resolved, Resolver};
use crate::schema::pfsense_schema;

/// A parsed pfSense configuration backup.
#[derive(Debug, Clone)]
pub struct PfSenseDocument {
    tree: Document,
}

/// Which endpoint a firewall rule location points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationTarget {
    Any,
    /// Reference leaf holding a network, alias or `<iface>ip` token.
    Network(NodeId),
    /// Reference leaf holding an address, alias or interface token.
    Address(NodeId),
}

/// Typed view of a rule `source` / `destination` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location<'a> {
    pub target: Option<LocationTarget>,
    pub port: Option<&'a str>,
    pub negated: bool,
}

impl PfSenseDocument {
    pub fn parse(xml: &[u8]) -> Result<Self, ParseError> {
        let tree = parse(xml, pfsense_schema()?)?;
        Ok(Self { tree })
    }

    pub fn parse_reader<R: BufRead>(input: R) -> Result<Self, ParseError> {
        let tree = parse_reader(input, pfsense_schema()?)?;
        Ok(Self { tree })
    }

    pub fn parse_file(path: &Path) -> Result<Self, ParseError> {
        let tree = parse_file(path, pfsense_schema()?)?;
        Ok(Self { tree })
    }

    /// The underlying typed tree.
    pub fn tree(&self) -> &Document {
        &self.tree
    }

    /// The `<pfsense>` element, if the backup had one.
    pub fn config(&self) -> Option<NodeId> {
        self.tree.attr(self.tree.root(), "pfsense")
    }

    /// Node at a dotted path below `<pfsense>`, e.g. `nat.outbound`.
    pub fn section(&self, path: &str) -> Option<NodeId> {
        self.tree.lookup_path(self.config()?, path)
    }

    /// Node or list at a dotted path below `<pfsense>`, e.g. `filter.rule`.
    pub fn section_child(&self, path: &str) -> Option<Child<'_>> {
        self.tree.lookup_child(self.config()?, path)
    }

    /// Whether a dotted path below `<pfsense>` exists, e.g. `vlans.vlan`.
    pub fn has_path(&self, path: &str) -> bool {
        self.section_child(path).is_some()
    }

    pub fn version(&self) -> Option<&str> {
        self.tree.attr_text(self.config()?, "version")
    }

    pub fn hostname(&self) -> Option<&str> {
        self.tree.attr_text(self.section("system")?, "hostname")
    }

    /// Interface keys (`wan`, `lan`, `opt1`, ...) in document order.
    pub fn interface_keys(&self) -> Vec<&str> {
        let Some(interfaces) = self.section("interfaces") else {
            return Vec::new();
        };
        self.tree.children(interfaces).map(|(key, _)| key).collect()
    }

    pub fn interface(&self, key: &str) -> Option<NodeId> {
        self.tree.attr(self.section("interfaces")?, key)
    }

    pub fn aliases(&self) -> &[NodeId] {
        self.list_at("aliases", "alias")
    }

    pub fn filter_rules(&self) -> &[NodeId] {
        self.list_at("filter", "rule")
    }

    pub fn nat_rules(&self) -> &[NodeId] {
        self.list_at("nat", "rule")
    }

    pub fn outbound_nat_rules(&self) -> &[NodeId] {
        self.list_at("nat.outbound", "rule")
    }

    fn list_at(&self, section: &str, key: &str) -> &[NodeId] {
        match self.section(section) {
            Some(node) => self.tree.list(node, key),
            None => &[],
        }
    }

    /// Read a location node (`source` / `destination`).
    pub fn location(&self, id: NodeId) -> Location<'_> {
        let tree = &self.tree;
        let target = if tree.attr(id, "any").is_some() {
            Some(LocationTarget::Any)
        } else if let Some(network) = tree.attr(id, "network") {
            Some(LocationTarget::Network(network))
        } else {
            tree.attr(id, "address").map(LocationTarget::Address)
        };
        Location {
            target,
            port: tree.attr_text(id, "port"),
            negated: tree.attr(id, "not").is_some(),
        }
    }

    /// Resolve a reference leaf without a nesting limit.
    pub fn resolve(&self, leaf: NodeId) -> Result<Option<Resolved>, ResolveError> {
        Resolver::new().resolve(&self.tree, leaf)
    }

    /// Project the whole document with references resolved.
    pub fn to_value(&self) -> Result<Value, ResolveError> {
        self.tree.project(self.tree.root(), &Resolver::new())
    }
}
