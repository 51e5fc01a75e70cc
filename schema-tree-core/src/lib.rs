//! Declarative schema-to-tree mapping for streaming XML.
//!
//! A [`Schema`] declares, per node type, which child elements are recognised
//! and whether each holds one node or an ordered list. The [`TreeBuilder`]
//! walks enter / text / leave events once and links typed nodes into a
//! [`Document`]; undeclared elements are skipped. Documents are read back
//! through typed accessors or projected into plain [`Value`]s.

pub mod builder;
pub mod coerce;
pub mod parser;
pub mod schema;
pub mod tree;
pub mod value;

pub use indexmap::IndexMap;

pub use builder::{build_from_events, BuildError, StructureError, TreeBuilder, XmlEvent};
pub use coerce::FormatError;
pub use parser::{parse, parse_file, parse_reader, ParseError};
pub use schema::{
    Cardinality, LeafKind, Schema, SchemaBuilder, SchemaError, Shape, TypeId, FLAG, INTEGER,
    PORT, REFERENCE, TEXT, TIMESTAMP,
};
pub use tree::{Child, Document, Node, NodeId, Scalar, Slot};
pub use value::{LiteralReferences, ReferenceResolver, Value};
