//! Streaming tree builder.
//!
//! [`TreeBuilder`] consumes a depth-first sequence of enter / text / leave
//! events and, driven only by the [`Schema`], links typed nodes into one
//! [`Document`]. Nothing is buffered beyond the stack of open elements.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::coerce::{coerce, FormatError};
use crate::schema::{attribute_key, Cardinality, Schema};
use crate::tree::{Document, NodeId};

/// One event of a depth-first element walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEvent<'a> {
    Enter(&'a str),
    Text(&'a str),
    Leave(&'a str),
}

/// The event sequence does not describe a well-nested tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StructureError {
    #[error("closing </{found}> while <{expected}> is open")]
    Mismatch { expected: String, found: String },
    #[error("closing </{0}> with no open element")]
    UnexpectedClose(String),
    #[error("document ended with unclosed element(s): {}", .0.join(" > "))]
    Unterminated(Vec<String>),
    #[error("second top-level element <{second}> after <{first}>")]
    MultipleRoots { first: String, second: String },
    #[error("document contains no elements")]
    NoRoot,
}

/// Fatal errors raised while building a document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Root,
    List,
    Attribute,
    Unknown,
}

#[derive(Debug)]
struct Frame {
    node: Option<NodeId>,
    name: String,
    slot: SlotKind,
    text: String,
    pending: Option<FormatError>,
}

/// Builds a [`Document`] from enter / text / leave events.
#[derive(Debug)]
pub struct TreeBuilder {
    doc: Document,
    stack: Vec<Frame>,
    top_level: Option<String>,
}

impl TreeBuilder {
    pub fn new(schema: Arc<Schema>) -> Self {
        let doc = Document::new(schema);
        let root = Frame {
            node: Some(doc.root()),
            name: String::new(),
            slot: SlotKind::Root,
            text: String::new(),
            pending: None,
        };
        Self {
            doc,
            stack: vec![root],
            top_level: None,
        }
    }

    /// Number of elements currently open, excluding the synthetic root.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn feed(&mut self, event: XmlEvent<'_>) -> Result<(), BuildError> {
        match event {
            XmlEvent::Enter(name) => self.enter(name),
            XmlEvent::Text(content) => {
                self.text(content);
                Ok(())
            }
            XmlEvent::Leave(name) => self.leave(name),
        }
    }

    /// Open an element below the current one.
    ///
    /// Only one top-level element may be opened per document.
    pub fn enter(&mut self, name: &str) -> Result<(), BuildError> {
        if self.stack.len() == 1 {
            if let Some(first) = &self.top_level {
                return Err(StructureError::MultipleRoots {
                    first: first.clone(),
                    second: name.to_string(),
                }
                .into());
            }
            self.top_level = Some(name.to_string());
        }

        let parent = self.stack.last().and_then(|frame| frame.node);
        let decl = parent.and_then(|parent| {
            let ty = self.doc.node(parent).type_id();
            self.doc.schema().child(ty, name).map(|decl| (parent, decl))
        });

        let (node, slot) = match decl {
            Some((parent, decl)) => {
                let slot = match decl.cardinality {
                    Cardinality::Repeated => SlotKind::List,
                    Cardinality::Single => SlotKind::Attribute,
                };
                (Some(self.doc.alloc(decl.ty, name, parent)), slot)
            }
            None => {
                if parent.is_some() {
                    debug!(element = name, depth = self.depth(), "skipping undeclared element");
                }
                (None, SlotKind::Unknown)
            }
        };

        self.stack.push(Frame {
            node,
            name: name.to_string(),
            slot,
            text: String::new(),
            pending: None,
        });
        Ok(())
    }

    /// Append character data to the current element.
    ///
    /// Leaves are coerced from the whole buffer on every call; a failure is
    /// held until the element closes and only raised if the final text still
    /// does not coerce.
    pub fn text(&mut self, content: &str) {
        let Some(frame) = self.stack.last_mut() else {
            return;
        };
        frame.text.push_str(content);

        let Some(node) = frame.node else {
            return;
        };
        let Some(kind) = self.doc.leaf_kind(node) else {
            return;
        };
        match coerce(kind, &frame.name, &frame.text) {
            Ok(value) => {
                frame.pending = None;
                self.doc.set_scalar(node, value);
            }
            Err(err) => frame.pending = Some(err),
        }
    }

    /// Close the current element and link it into its parent.
    pub fn leave(&mut self, name: &str) -> Result<(), BuildError> {
        let top = self
            .stack
            .last()
            .ok_or_else(|| StructureError::UnexpectedClose(name.to_string()))?;
        if top.slot == SlotKind::Root {
            return Err(StructureError::UnexpectedClose(name.to_string()).into());
        }
        if top.name != name {
            return Err(StructureError::Mismatch {
                expected: top.name.clone(),
                found: name.to_string(),
            }
            .into());
        }

        let frame = self
            .stack
            .pop()
            .ok_or_else(|| StructureError::UnexpectedClose(name.to_string()))?;
        if let Some(err) = frame.pending {
            return Err(err.into());
        }
        let parent = self.stack.last().and_then(|parent| parent.node);

        match (frame.slot, frame.node, parent) {
            (SlotKind::List, Some(node), Some(parent)) => {
                trace!(element = name, "append to list");
                self.doc
                    .attach_list(parent, attribute_key(name).into_owned(), node);
            }
            (SlotKind::Attribute, Some(node), Some(parent)) => {
                trace!(element = name, "set attribute");
                self.doc
                    .attach_single(parent, attribute_key(name).into_owned(), node);
            }
            _ => {}
        }
        Ok(())
    }

    /// Finish the walk; every element except the synthetic root must be
    /// closed and exactly one top-level element must have been seen.
    pub fn finish(self) -> Result<Document, BuildError> {
        if self.stack.len() != 1 {
            let open = self.stack[1..]
                .iter()
                .map(|frame| frame.name.clone())
                .collect();
            return Err(StructureError::Unterminated(open).into());
        }
        if self.top_level.is_none() {
            return Err(StructureError::NoRoot.into());
        }
        Ok(self.doc)
    }
}

/// Build a document from an in-memory event sequence.
pub fn build_from_events<'a, I>(schema: Arc<Schema>, events: I) -> Result<Document, BuildError>
where
    I: IntoIterator<Item = XmlEvent<'a>>,
{
    let mut builder = TreeBuilder::new(schema);
    for event in events {
        builder.feed(event)?;
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{build_from_events, BuildError, StructureError, TreeBuilder, XmlEvent};
    use super::XmlEvent::{Enter, Leave, Text};
    use crate::schema::{Schema, SchemaBuilder, FLAG, INTEGER, PORT, TEXT};
    use crate::tree::{Child, Scalar};

    fn schema() -> Arc<Schema> {
        let mut builder = SchemaBuilder::new();
        builder.structured("document").one("config", "config");
        builder
            .structured("config")
            .one("name", TEXT)
            .one("count", INTEGER)
            .one("port", PORT)
            .many("item", "item")
            .one("where", "location");
        builder.structured("item").one("value", TEXT).one("on", FLAG);
        builder
            .choice("location", &["any", "address"])
            .one("any", FLAG)
            .one("address", TEXT)
            .one("port", PORT);
        Arc::new(builder.build("document").expect("schema"))
    }

    fn leaf<'a>(name: &'a str, text: &'a str) -> Vec<XmlEvent<'a>> {
        vec![Enter(name), Text(text), Leave(name)]
    }

    fn config(body: Vec<XmlEvent<'_>>) -> Vec<XmlEvent<'_>> {
        let mut events = vec![Enter("config")];
        events.extend(body);
        events.push(Leave("config"));
        events
    }

    #[test]
    fn undeclared_elements_are_dropped_silently() {
        let mut body = leaf("name", "fw");
        body.extend([Enter("mystery"), Enter("name"), Text("x"), Leave("name"), Leave("mystery")]);
        let doc = build_from_events(schema(), config(body)).expect("build");

        let config = doc.attr(doc.root(), "config").expect("config");
        assert_eq!(doc.attr_text(config, "name"), Some("fw"));
        assert!(doc.child(config, "mystery").is_none());
    }

    #[test]
    fn repeated_singular_element_keeps_last_value() {
        let mut body = leaf("name", "first");
        body.extend(leaf("name", "second"));
        let doc = build_from_events(schema(), config(body)).expect("build");

        let config = doc.attr(doc.root(), "config").expect("config");
        assert_eq!(doc.attr_text(config, "name"), Some("second"));
    }

    #[test]
    fn repeated_elements_keep_source_order() {
        let mut body = Vec::new();
        for value in ["a", "b", "c"] {
            body.push(Enter("item"));
            body.extend(leaf("value", value));
            body.push(Leave("item"));
        }
        let doc = build_from_events(schema(), config(body)).expect("build");

        let config = doc.attr(doc.root(), "config").expect("config");
        let values: Vec<_> = doc
            .list(config, "item")
            .iter()
            .filter_map(|item| doc.attr_text(*item, "value"))
            .collect();
        assert_eq!(values, ["a", "b", "c"]);
        assert!(matches!(doc.child(config, "item"), Some(Child::List(items)) if items.len() == 3));
    }

    #[test]
    fn presence_flag_is_true_without_text() {
        let body = vec![Enter("item"), Enter("on"), Leave("on"), Leave("item")];
        let doc = build_from_events(schema(), config(body)).expect("build");

        let config = doc.attr(doc.root(), "config").expect("config");
        let item = doc.list(config, "item")[0];
        let on = doc.attr(item, "on").expect("flag");
        assert_eq!(doc.scalar(on), Some(&Scalar::Flag));
    }

    #[test]
    fn text_split_across_events_is_coerced_as_a_whole() {
        let body = vec![Enter("port"), Text("80:"), Text("443"), Leave("port")];
        let doc = build_from_events(schema(), config(body)).expect("build");

        let config = doc.attr(doc.root(), "config").expect("config");
        assert_eq!(doc.attr_text(config, "port"), Some("80:443"));
    }

    #[test]
    fn bad_leaf_text_is_a_format_error() {
        let err = build_from_events(schema(), config(leaf("count", "many"))).expect_err("format");
        assert!(matches!(err, BuildError::Format(e) if e.element == "count"));

        let err = build_from_events(schema(), config(leaf("port", "abc!"))).expect_err("format");
        assert!(matches!(err, BuildError::Format(_)));
    }

    #[test]
    fn mismatched_close_is_a_structure_error() {
        let events = vec![Enter("config"), Enter("name"), Leave("config")];
        let err = build_from_events(schema(), events).expect_err("mismatch");
        assert_eq!(
            err,
            BuildError::Structure(StructureError::Mismatch {
                expected: "name".to_string(),
                found: "config".to_string(),
            })
        );
    }

    #[test]
    fn close_without_open_is_a_structure_error() {
        let err = build_from_events(schema(), vec![Leave("config")]).expect_err("close");
        assert!(matches!(
            err,
            BuildError::Structure(StructureError::UnexpectedClose(_))
        ));
    }

    #[test]
    fn unterminated_document_is_a_structure_error() {
        let mut builder = TreeBuilder::new(schema());
        builder.enter("config").expect("enter");
        builder.enter("mystery").expect("enter");
        assert_eq!(builder.depth(), 2);
        let err = builder.finish().expect_err("unterminated");
        assert_eq!(
            err,
            BuildError::Structure(StructureError::Unterminated(vec![
                "config".to_string(),
                "mystery".to_string()
            ]))
        );
    }

    #[test]
    fn second_top_level_element_is_a_structure_error() {
        let mut events = config(leaf("name", "one"));
        events.extend(config(leaf("name", "two")));
        let err = build_from_events(schema(), events).expect_err("two roots");
        assert_eq!(
            err,
            BuildError::Structure(StructureError::MultipleRoots {
                first: "config".to_string(),
                second: "config".to_string(),
            })
        );
    }

    #[test]
    fn empty_event_stream_has_no_root() {
        let err = build_from_events(schema(), Vec::new()).expect_err("empty");
        assert_eq!(err, BuildError::Structure(StructureError::NoRoot));

        let err = build_from_events(schema(), vec![Text("  \n")]).expect_err("text only");
        assert_eq!(err, BuildError::Structure(StructureError::NoRoot));
    }

    #[test]
    fn choice_members_evict_each_other() {
        let mut body = vec![Enter("where")];
        body.extend([Enter("any"), Leave("any")]);
        body.extend(leaf("port", "22"));
        body.extend(leaf("address", "10.0.0.1"));
        body.push(Leave("where"));
        let doc = build_from_events(schema(), config(body)).expect("build");

        let config = doc.attr(doc.root(), "config").expect("config");
        let location = doc.attr(config, "where").expect("location");
        assert!(doc.attr(location, "any").is_none());
        assert_eq!(doc.attr_text(location, "address"), Some("10.0.0.1"));
        assert_eq!(doc.attr_text(location, "port"), Some("22"));
    }

    #[test]
    fn replaced_attribute_keeps_parent_links() {
        let mut body = leaf("name", "one");
        body.extend(leaf("name", "two"));
        let doc = build_from_events(schema(), config(body)).expect("build");

        let config = doc.attr(doc.root(), "config").expect("config");
        let name = doc.attr(config, "name").expect("name");
        assert_eq!(doc.parent(name), Some(config));
        assert_eq!(doc.root_of(name), doc.root());
    }
}
