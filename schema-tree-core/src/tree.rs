use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::schema::{LeafKind, Schema, Shape, TypeDecl, TypeId};

/// Index of a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Coerced payload of a leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Flag,
}

/// Children stored under one attribute key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Single(NodeId),
    List(Vec<NodeId>),
}

/// Result of typed access by attribute key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child<'a> {
    Node(NodeId),
    List(&'a [NodeId]),
}

#[derive(Debug, Clone)]
pub(crate) enum Content {
    Leaf(Option<Scalar>),
    Branch(IndexMap<String, Slot>),
}

/// One element of the source document.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) ty: TypeId,
    pub(crate) element: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) content: Content,
}

impl Node {
    /// Raw element name as it appeared in the source.
    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn type_id(&self) -> TypeId {
        self.ty
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn scalar(&self) -> Option<&Scalar> {
        match &self.content {
            Content::Leaf(value) => value.as_ref(),
            Content::Branch(_) => None,
        }
    }
}

/// An immutable, schema-typed tree of nodes.
///
/// Nodes live in an arena and refer to each other by [`NodeId`]. The parent
/// owns its children; the `parent` link is only an index used for upward
/// lookup. A singular child replaced by a later occurrence stays allocated but
/// is unlinked, so walks from the root never reach it.
#[derive(Debug, Clone)]
pub struct Document {
    schema: Arc<Schema>,
    nodes: Vec<Node>,
}

impl Document {
    pub(crate) fn new(schema: Arc<Schema>) -> Self {
        let root = Node {
            ty: schema.root(),
            element: String::new(),
            parent: None,
            content: Content::Branch(IndexMap::new()),
        };
        Self {
            schema,
            nodes: vec![root],
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The synthetic root node standing above the outermost element.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn decl(&self, id: NodeId) -> &TypeDecl {
        self.schema.decl(self.node(id).ty)
    }

    pub fn leaf_kind(&self, id: NodeId) -> Option<LeafKind> {
        self.decl(id).leaf_kind()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Topmost ancestor of `id`, found by following parent links.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Typed access by attribute key: a node, a list of nodes, or absent.
    pub fn child(&self, id: NodeId, key: &str) -> Option<Child<'_>> {
        match self.slots(id)?.get(key)? {
            Slot::Single(child) => Some(Child::Node(*child)),
            Slot::List(items) => Some(Child::List(items)),
        }
    }

    /// Singular child stored under `key`.
    pub fn attr(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match self.child(id, key)? {
            Child::Node(child) => Some(child),
            Child::List(_) => None,
        }
    }

    /// Repeated children stored under `key`, in document order.
    pub fn list(&self, id: NodeId, key: &str) -> &[NodeId] {
        match self.child(id, key) {
            Some(Child::List(items)) => items,
            _ => &[],
        }
    }

    /// Attribute keys and slots of a structured node, in insertion order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (&str, &Slot)> + '_ {
        self.slots(id)
            .into_iter()
            .flat_map(|slots| slots.iter().map(|(key, slot)| (key.as_str(), slot)))
    }

    pub fn scalar(&self, id: NodeId) -> Option<&Scalar> {
        self.node(id).scalar()
    }

    /// Text payload of a text, port or reference leaf.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.scalar(id)? {
            Scalar::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn integer(&self, id: NodeId) -> Option<i64> {
        match self.scalar(id)? {
            Scalar::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn timestamp(&self, id: NodeId) -> Option<DateTime<Utc>> {
        match self.scalar(id)? {
            Scalar::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    /// Text of the singular leaf stored under `key`.
    pub fn attr_text(&self, id: NodeId, key: &str) -> Option<&str> {
        self.text(self.attr(id, key)?)
    }

    /// Follow a dotted chain of singular attribute keys.
    pub fn lookup_path(&self, id: NodeId, path: &str) -> Option<NodeId> {
        let mut current = id;
        for segment in path.split('.') {
            current = self.attr(current, segment)?;
        }
        Some(current)
    }

    /// Whether a dotted chain of attribute keys resolves from `id`.
    ///
    /// Intermediate steps must be singular; the final step may be a list.
    /// Missing steps simply yield `false`.
    pub fn has_path(&self, id: NodeId, path: &str) -> bool {
        self.lookup_child(id, path).is_some()
    }

    /// Like [`Document::lookup_path`], but the final step may name a list.
    pub fn lookup_child(&self, id: NodeId, path: &str) -> Option<Child<'_>> {
        match path.rsplit_once('.') {
            Some((head, last)) => self.child(self.lookup_path(id, head)?, last),
            None => self.child(id, path),
        }
    }

    fn slots(&self, id: NodeId) -> Option<&IndexMap<String, Slot>> {
        match &self.node(id).content {
            Content::Branch(slots) => Some(slots),
            Content::Leaf(_) => None,
        }
    }

    pub(crate) fn alloc(&mut self, ty: TypeId, element: &str, parent: NodeId) -> NodeId {
        let content = match self.schema.decl(ty).shape() {
            Shape::Leaf(LeafKind::Flag) => Content::Leaf(Some(Scalar::Flag)),
            Shape::Leaf(_) => Content::Leaf(None),
            Shape::Structured | Shape::Choice => Content::Branch(IndexMap::new()),
        };
        self.nodes.push(Node {
            ty,
            element: element.to_string(),
            parent: Some(parent),
            content,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn set_scalar(&mut self, id: NodeId, value: Scalar) {
        if let Content::Leaf(slot) = &mut self.nodes[id.0].content {
            *slot = Some(value);
        }
    }

    /// Set a singular child, replacing any previous one. Members of a choice
    /// group evict the other members.
    pub(crate) fn attach_single(&mut self, parent: NodeId, key: String, child: NodeId) {
        let decl = self.schema.decl(self.nodes[parent.0].ty);
        let evict: Vec<String> = if decl.exclusive().contains(&key) {
            decl.exclusive()
                .iter()
                .filter(|member| **member != key)
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        if let Content::Branch(slots) = &mut self.nodes[parent.0].content {
            for member in &evict {
                slots.shift_remove(member);
            }
            slots.insert(key, Slot::Single(child));
        }
    }

    /// Append a child to the ordered sequence under `key`.
    pub(crate) fn attach_list(&mut self, parent: NodeId, key: String, child: NodeId) {
        if let Content::Branch(slots) = &mut self.nodes[parent.0].content {
            match slots.entry(key).or_insert_with(|| Slot::List(Vec::new())) {
                Slot::List(items) => items.push(child),
                slot @ Slot::Single(_) => *slot = Slot::List(vec![child]),
            }
        }
    }
}
