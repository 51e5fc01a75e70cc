//! Declarative schema tables.
//!
//! A [`Schema`] lists every node type a document may contain. Structured types
//! map declared child names to a cardinality and a child type; leaf types say
//! how element text is coerced. Tables are registered through
//! [`SchemaBuilder`] and validated once in [`SchemaBuilder::build`], so the
//! tree builder only ever performs hash lookups.

use std::borrow::Cow;
use std::collections::HashMap;

use thiserror::Error;

/// Name of the pre-registered raw text leaf type.
pub const TEXT: &str = "text";
/// Name of the pre-registered base-10 integer leaf type.
pub const INTEGER: &str = "integer";
/// Name of the pre-registered seconds-since-epoch leaf type.
pub const TIMESTAMP: &str = "timestamp";
/// Name of the pre-registered presence flag leaf type.
pub const FLAG: &str = "flag";
/// Name of the pre-registered port / port range / service alias leaf type.
pub const PORT: &str = "port";
/// Name of the pre-registered reference-bearing text leaf type.
pub const REFERENCE: &str = "reference";

/// Index of a type inside a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

/// How leaf text is turned into a scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Text,
    Integer,
    Timestamp,
    Flag,
    Port,
    Reference,
}

/// Overall shape of a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Leaf(LeafKind),
    Structured,
    /// Structured node whose exclusive group holds at most one member.
    Choice,
}

/// Whether a child name holds one node or an ordered sequence of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Repeated,
}

/// Resolved declaration of one child name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildDecl {
    pub cardinality: Cardinality,
    pub ty: TypeId,
}

/// A registered node type.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    name: String,
    shape: Shape,
    children: HashMap<String, ChildDecl>,
    prefixes: Vec<(String, ChildDecl)>,
    exclusive: Vec<String>,
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Leaf kind, or `None` for structured and choice types.
    pub fn leaf_kind(&self) -> Option<LeafKind> {
        match self.shape {
            Shape::Leaf(kind) => Some(kind),
            Shape::Structured | Shape::Choice => None,
        }
    }

    /// Members of the exclusive group of a choice type (empty otherwise).
    pub fn exclusive(&self) -> &[String] {
        &self.exclusive
    }

    /// Look up a child by attribute key: declared names first, then prefixes.
    pub fn child(&self, key: &str) -> Option<ChildDecl> {
        if let Some(decl) = self.children.get(key) {
            return Some(*decl);
        }
        self.prefixes
            .iter()
            .find(|(prefix, _)| key.starts_with(prefix.as_str()))
            .map(|(_, decl)| *decl)
    }
}

/// A validated set of node types with a designated root.
#[derive(Debug, Clone)]
pub struct Schema {
    types: Vec<TypeDecl>,
    by_name: HashMap<String, TypeId>,
    root: TypeId,
}

impl Schema {
    /// Type of the synthetic document root.
    pub fn root(&self) -> TypeId {
        self.root
    }

    pub fn decl(&self, ty: TypeId) -> &TypeDecl {
        &self.types[ty.0]
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Look up a child of `ty` by raw element name.
    ///
    /// Returns `None` for undeclared names; callers treat those as unknown
    /// content rather than an error.
    pub fn child(&self, ty: TypeId, element: &str) -> Option<ChildDecl> {
        self.decl(ty).child(&attribute_key(element))
    }
}

/// Normalise an element name into an attribute key (`-` becomes `_`).
pub fn attribute_key(element: &str) -> Cow<'_, str> {
    if element.contains('-') {
        Cow::Owned(element.replace('-', "_"))
    } else {
        Cow::Borrowed(element)
    }
}

/// Errors found while validating schema declarations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("type '{0}' is declared more than once")]
    DuplicateType(String),
    #[error("type '{ty}' declares child '{child}' more than once")]
    DuplicateChild { ty: String, child: String },
    #[error("type '{ty}' refers to undeclared type '{target}' for child '{child}'")]
    UnknownType {
        ty: String,
        child: String,
        target: String,
    },
    #[error("choice type '{ty}' lists '{member}' in its group without a singular declaration")]
    InvalidChoiceMember { ty: String, member: String },
    #[error("root type '{0}' is not a declared structured type")]
    InvalidRoot(String),
}

#[derive(Debug)]
struct PendingChild {
    key: String,
    cardinality: Cardinality,
    target: String,
    prefix: bool,
}

#[derive(Debug)]
struct PendingType {
    name: String,
    shape: Shape,
    children: Vec<PendingChild>,
    exclusive: Vec<String>,
}

/// Collects type declarations and validates them into a [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    types: Vec<PendingType>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    /// Start a schema with the built-in leaf types already registered.
    pub fn new() -> Self {
        let leaves = [
            (TEXT, LeafKind::Text),
            (INTEGER, LeafKind::Integer),
            (TIMESTAMP, LeafKind::Timestamp),
            (FLAG, LeafKind::Flag),
            (PORT, LeafKind::Port),
            (REFERENCE, LeafKind::Reference),
        ];
        let types = leaves
            .into_iter()
            .map(|(name, kind)| PendingType {
                name: name.to_string(),
                shape: Shape::Leaf(kind),
                children: Vec::new(),
                exclusive: Vec::new(),
            })
            .collect();
        Self { types }
    }

    /// Declare a structured type.
    pub fn structured(&mut self, name: &str) -> TypeBuilder<'_> {
        self.push(name, Shape::Structured, Vec::new())
    }

    /// Declare a choice type whose `group` members exclude one another.
    pub fn choice(&mut self, name: &str, group: &[&str]) -> TypeBuilder<'_> {
        let exclusive = group.iter().map(|m| attribute_key(m).into_owned()).collect();
        self.push(name, Shape::Choice, exclusive)
    }

    fn push(&mut self, name: &str, shape: Shape, exclusive: Vec<String>) -> TypeBuilder<'_> {
        self.types.push(PendingType {
            name: name.to_string(),
            shape,
            children: Vec::new(),
            exclusive,
        });
        let last = self.types.len() - 1;
        TypeBuilder {
            pending: &mut self.types[last],
        }
    }

    /// Validate every declaration and produce the schema rooted at `root`.
    pub fn build(self, root: &str) -> Result<Schema, SchemaError> {
        let mut by_name = HashMap::new();
        for (idx, pending) in self.types.iter().enumerate() {
            if by_name.insert(pending.name.clone(), TypeId(idx)).is_some() {
                return Err(SchemaError::DuplicateType(pending.name.clone()));
            }
        }

        let mut types = Vec::with_capacity(self.types.len());
        for pending in self.types {
            types.push(resolve_type(pending, &by_name)?);
        }

        let root_id = match by_name.get(root) {
            Some(id) if types[id.0].shape == Shape::Structured => *id,
            _ => return Err(SchemaError::InvalidRoot(root.to_string())),
        };

        Ok(Schema {
            types,
            by_name,
            root: root_id,
        })
    }
}

fn resolve_type(
    pending: PendingType,
    by_name: &HashMap<String, TypeId>,
) -> Result<TypeDecl, SchemaError> {
    let mut children = HashMap::new();
    let mut prefixes: Vec<(String, ChildDecl)> = Vec::new();

    for child in pending.children {
        let ty = *by_name
            .get(&child.target)
            .ok_or_else(|| SchemaError::UnknownType {
                ty: pending.name.clone(),
                child: child.key.clone(),
                target: child.target.clone(),
            })?;
        let decl = ChildDecl {
            cardinality: child.cardinality,
            ty,
        };
        let duplicate = if child.prefix {
            if prefixes.iter().any(|(p, _)| *p == child.key) {
                true
            } else {
                prefixes.push((child.key.clone(), decl));
                false
            }
        } else {
            children.insert(child.key.clone(), decl).is_some()
        };
        if duplicate {
            return Err(SchemaError::DuplicateChild {
                ty: pending.name,
                child: child.key,
            });
        }
    }

    for member in &pending.exclusive {
        let singular = children
            .get(member)
            .is_some_and(|decl| decl.cardinality == Cardinality::Single);
        if !singular {
            return Err(SchemaError::InvalidChoiceMember {
                ty: pending.name,
                member: member.clone(),
            });
        }
    }

    Ok(TypeDecl {
        name: pending.name,
        shape: pending.shape,
        children,
        prefixes,
        exclusive: pending.exclusive,
    })
}

/// Chained child declarations for one type.
pub struct TypeBuilder<'a> {
    pending: &'a mut PendingType,
}

impl TypeBuilder<'_> {
    /// Declare a singular child; a repeated element keeps its last occurrence.
    pub fn one(self, child: &str, ty: &str) -> Self {
        self.add(child, ty, Cardinality::Single, false)
    }

    /// Declare a repeated child collected in document order.
    pub fn many(self, child: &str, ty: &str) -> Self {
        self.add(child, ty, Cardinality::Repeated, false)
    }

    /// Map every undeclared child whose name starts with `prefix` to `ty`.
    pub fn prefix(self, prefix: &str, ty: &str) -> Self {
        self.add(prefix, ty, Cardinality::Single, true)
    }

    fn add(self, child: &str, ty: &str, cardinality: Cardinality, prefix: bool) -> Self {
        self.pending.children.push(PendingChild {
            key: attribute_key(child).into_owned(),
            cardinality,
            target: ty.to_string(),
            prefix,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Cardinality, SchemaBuilder, SchemaError, INTEGER, TEXT};

    fn sample() -> SchemaBuilder {
        let mut builder = SchemaBuilder::new();
        builder.structured("root").one("config", "config");
        builder
            .structured("config")
            .one("name", TEXT)
            .many("item", "item")
            .one("item-count", INTEGER)
            .prefix("opt", "item");
        builder.structured("item").one("value", TEXT);
        builder
    }

    #[test]
    fn looks_up_declared_and_prefixed_children() {
        let schema = sample().build("root").expect("schema");
        let config = schema.type_id("config").expect("config type");

        let item = schema.child(config, "item").expect("item declared");
        assert_eq!(item.cardinality, Cardinality::Repeated);

        let opt = schema.child(config, "opt12").expect("opt prefix");
        assert_eq!(opt.cardinality, Cardinality::Single);
        assert_eq!(opt.ty, schema.type_id("item").expect("item type"));

        assert!(schema.child(config, "item-count").is_some());
        assert!(schema.child(config, "missing").is_none());
    }

    #[test]
    fn rejects_duplicate_child_names() {
        let mut builder = SchemaBuilder::new();
        builder
            .structured("root")
            .one("name", TEXT)
            .many("name", INTEGER);
        let err = builder.build("root").expect_err("duplicate child");
        assert_eq!(
            err,
            SchemaError::DuplicateChild {
                ty: "root".to_string(),
                child: "name".to_string()
            }
        );
    }

    #[test]
    fn rejects_unknown_target_types() {
        let mut builder = SchemaBuilder::new();
        builder.structured("root").one("system", "system");
        let err = builder.build("root").expect_err("unknown type");
        assert!(matches!(err, SchemaError::UnknownType { target, .. } if target == "system"));
    }

    #[test]
    fn rejects_repeated_choice_members() {
        let mut builder = SchemaBuilder::new();
        builder.structured("root").one("loc", "loc");
        builder
            .choice("loc", &["any", "address"])
            .one("any", TEXT)
            .many("address", TEXT);
        let err = builder.build("root").expect_err("invalid choice");
        assert!(matches!(err, SchemaError::InvalidChoiceMember { member, .. } if member == "address"));
    }

    #[test]
    fn rejects_leaf_root() {
        let err = SchemaBuilder::new().build(TEXT).expect_err("leaf root");
        assert_eq!(err, SchemaError::InvalidRoot(TEXT.to_string()));
    }
}
