use colored::Colorize;
use schema_tree_core::{Document, LeafKind, NodeId, Scalar, Slot};

use crate::resolve::{ResolveError, Resolver};

/// Render a typed tree with a configurable max depth.
///
/// Leaves print their value; reference leaves also print what they resolve to.
pub fn render_tree(
    doc: &Document,
    node: NodeId,
    max_depth: usize,
    resolver: Option<&Resolver>,
) -> Result<String, ResolveError> {
    let mut out = String::new();
    let label = match doc.node(node).element() {
        "" => "(document)",
        element => element,
    };
    render_node(doc, node, label, 0, max_depth, resolver, &mut out)?;
    Ok(out)
}

fn render_node(
    doc: &Document,
    node: NodeId,
    label: &str,
    depth: usize,
    max_depth: usize,
    resolver: Option<&Resolver>,
    out: &mut String,
) -> Result<(), ResolveError> {
    let indent = "  ".repeat(depth);

    if let Some(kind) = doc.leaf_kind(node) {
        let value = leaf_text(doc, node, kind, resolver)?;
        out.push_str(&format!("{}{} = {}\n", indent, label.bold(), value));
        return Ok(());
    }

    out.push_str(&format!("{}{}\n", indent, label.bold()));
    if depth >= max_depth {
        return Ok(());
    }

    for (key, slot) in doc.children(node) {
        match slot {
            Slot::Single(child) => {
                render_node(doc, *child, key, depth + 1, max_depth, resolver, out)?;
            }
            Slot::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    let label = format!("{key}[{idx}]");
                    render_node(doc, *item, &label, depth + 1, max_depth, resolver, out)?;
                }
            }
        }
    }
    Ok(())
}

fn leaf_text(
    doc: &Document,
    node: NodeId,
    kind: LeafKind,
    resolver: Option<&Resolver>,
) -> Result<String, ResolveError> {
    let raw = match doc.scalar(node) {
        None => return Ok("-".dimmed().to_string()),
        Some(Scalar::Text(text)) => format!("{text:?}"),
        Some(Scalar::Integer(value)) => value.to_string(),
        Some(Scalar::Timestamp(value)) => value.to_rfc3339(),
        Some(Scalar::Flag) => "true".to_string(),
    };

    let resolved = match (kind, resolver) {
        (LeafKind::Reference, Some(resolver)) => resolver.resolve(doc, node)?,
        _ => None,
    };
    Ok(match resolved {
        Some(resolved) => format!("{} -> {}", raw, resolved.to_string().cyan()),
        None => raw,
    })
}
