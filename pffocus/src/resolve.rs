//! Reference resolution.
//!
//! Rule, NAT and service sections name interfaces and aliases by their keys
//! (`lan`, `opt2`, `webservers`). Resolving a reference leaf looks those keys
//! up elsewhere in the document and returns the referenced entity:
//!
//! 1. an interface whose key equals the token, or equals the token minus a
//!    trailing `ip` ("this interface's address", e.g. `lanip`);
//! 2. an alias whose `name` equals the token;
//! 3. otherwise the token itself.
//!
//! Comma separated text is a list of independent tokens. Nothing is cached:
//! each call walks the tree again. Alias chains are not cycle-checked; a
//! resolver built with [`Resolver::with_max_depth`] turns runaway nesting into
//! [`ResolveError::DepthExceeded`].

use std::cell::Cell;
use std::fmt::{self, Display, Formatter};

use schema_tree_core::{Document, IndexMap, NodeId, ReferenceResolver, Slot, Value};
use thiserror::Error;
use tracing::debug;

/// Outcome of resolving one reference token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing matched; the token is returned unchanged.
    Literal(String),
    /// A declared interface. `attributes` holds its projection plus `name`.
    Interface {
        name: String,
        attributes: IndexMap<String, Value>,
    },
    /// A named alias with its full projection.
    Alias {
        name: String,
        attributes: IndexMap<String, Value>,
    },
}

impl Display for Resolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Literal(text) => write!(f, "{text}"),
            Resolution::Interface { name, .. } => write!(f, "interface:{name}"),
            Resolution::Alias { name, .. } => write!(f, "alias:{name}"),
        }
    }
}

impl From<Resolution> for Value {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Literal(text) => Value::Text(text),
            Resolution::Interface { attributes, .. } => tagged("interface", attributes),
            Resolution::Alias { attributes, .. } => tagged("alias", attributes),
        }
    }
}

fn tagged(tag: &str, attributes: IndexMap<String, Value>) -> Value {
    let mut map = IndexMap::new();
    map.insert(tag.to_string(), Value::Map(attributes));
    Value::Map(map)
}

/// Resolved value of a reference leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    One(Resolution),
    /// Comma separated text, one entry per token in source order.
    Many(Vec<Resolution>),
}

impl Display for Resolved {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::One(resolution) => write!(f, "{resolution}"),
            Resolved::Many(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<Resolved> for Value {
    fn from(resolved: Resolved) -> Self {
        match resolved {
            Resolved::One(resolution) => resolution.into(),
            Resolved::Many(items) => Value::List(items.into_iter().map(Value::from).collect()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("reference resolution nested deeper than {limit} levels")]
    DepthExceeded { limit: usize },
}

/// Resolves reference leaves against the document they belong to.
#[derive(Debug, Default)]
pub struct Resolver {
    max_depth: Option<usize>,
    depth: Cell<usize>,
}

impl Resolver {
    /// Resolver without a nesting limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that fails once resolutions nest deeper than `limit`.
    ///
    /// The pfSense schema declares no reference fields inside interfaces or
    /// aliases, so real lookups nest one level deep; a limit of `0` rejects
    /// every interface or alias match and any larger limit never triggers.
    pub fn with_max_depth(limit: usize) -> Self {
        Self {
            max_depth: Some(limit),
            depth: Cell::new(0),
        }
    }

    /// Resolve the reference leaf `leaf`; `None` if the leaf has no text.
    pub fn resolve(&self, doc: &Document, leaf: NodeId) -> Result<Option<Resolved>, ResolveError> {
        let Some(text) = doc.text(leaf) else {
            return Ok(None);
        };
        let resolved = if text.contains(',') {
            Resolved::Many(
                text.split(',')
                    .map(|token| self.resolve_token(doc, leaf, token))
                    .collect::<Result<_, _>>()?,
            )
        } else {
            Resolved::One(self.resolve_token(doc, leaf, text)?)
        };
        Ok(Some(resolved))
    }

    /// Tokens are matched after trimming whitespace; a token that matches
    /// nothing is returned with its original text.
    fn resolve_token(
        &self,
        doc: &Document,
        leaf: NodeId,
        token: &str,
    ) -> Result<Resolution, ResolveError> {
        let key = token.trim();
        let root = doc.root_of(leaf);

        if let Some((name, iface)) = find_interface(doc, root, key) {
            let _guard = self.descend()?;
            let mut attributes = project_map(doc, iface, self)?;
            attributes.insert("name".to_string(), Value::Text(name.clone()));
            return Ok(Resolution::Interface { name, attributes });
        }

        if let Some(alias) = find_alias(doc, root, key) {
            let _guard = self.descend()?;
            let attributes = project_map(doc, alias, self)?;
            return Ok(Resolution::Alias {
                name: key.to_string(),
                attributes,
            });
        }

        debug!(token = key, "reference left unresolved");
        Ok(Resolution::Literal(token.to_string()))
    }

    fn descend(&self) -> Result<DepthGuard<'_>, ResolveError> {
        let depth = self.depth.get() + 1;
        if let Some(limit) = self.max_depth {
            if depth > limit {
                return Err(ResolveError::DepthExceeded { limit });
            }
        }
        self.depth.set(depth);
        Ok(DepthGuard { depth: &self.depth })
    }
}

struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

impl ReferenceResolver for Resolver {
    type Error = ResolveError;

    fn resolve_reference(&self, doc: &Document, leaf: NodeId) -> Result<Value, ResolveError> {
        Ok(self.resolve(doc, leaf)?.map_or(Value::Null, Value::from))
    }
}

/// Exact key match first, then the `<key>ip` address form.
fn find_interface(doc: &Document, root: NodeId, token: &str) -> Option<(String, NodeId)> {
    let interfaces = doc.lookup_path(root, "pfsense.interfaces")?;
    let declared = || {
        doc.children(interfaces).filter_map(|(key, slot)| match slot {
            Slot::Single(iface) => Some((key, *iface)),
            Slot::List(_) => None,
        })
    };

    let stripped = token.strip_suffix("ip");
    declared()
        .find(|(key, _)| *key == token)
        .or_else(|| declared().find(|(key, _)| stripped == Some(*key)))
        .map(|(key, iface)| (key.to_string(), iface))
}

fn find_alias(doc: &Document, root: NodeId, token: &str) -> Option<NodeId> {
    let aliases = doc.lookup_path(root, "pfsense.aliases")?;
    doc.list(aliases, "alias")
        .iter()
        .copied()
        .find(|alias| doc.attr_text(*alias, "name") == Some(token))
}

fn project_map(
    doc: &Document,
    id: NodeId,
    resolver: &Resolver,
) -> Result<IndexMap<String, Value>, ResolveError> {
    match doc.project(id, resolver)? {
        Value::Map(map) => Ok(map),
        _ => Ok(IndexMap::new()),
    }
}
