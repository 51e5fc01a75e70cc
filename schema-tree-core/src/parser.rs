use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use thiserror::Error;

use crate::builder::{BuildError, TreeBuilder};
use crate::schema::{Schema, SchemaError};
use crate::tree::Document;

/// Errors that can occur while parsing XML into a typed [`Document`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input XML could not be decoded or tokenized.
    #[error("failed to parse XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Input bytes were not valid UTF-8 for tag/text extraction.
    #[error("invalid UTF-8 while parsing XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// Failed to read input file.
    #[error("failed to read XML file: {0}")]
    Io(#[from] std::io::Error),
    /// Element structure or leaf text rejected by the tree builder.
    #[error("malformed document: {0}")]
    Build(#[from] BuildError),
    /// Schema declarations are inconsistent.
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),
}

/// Parse XML bytes into a [`Document`] typed by `schema`.
pub fn parse(xml: &[u8], schema: Arc<Schema>) -> Result<Document, ParseError> {
    parse_reader(xml, schema)
}

/// Parse an XML file into a [`Document`] typed by `schema`.
pub fn parse_file(path: &Path, schema: Arc<Schema>) -> Result<Document, ParseError> {
    let file = File::open(path)?;
    parse_reader(BufReader::new(file), schema)
}

/// Stream XML from an already opened reader into a [`Document`].
///
/// Elements are handed to the [`TreeBuilder`] as they are read; XML
/// attributes, comments, processing instructions and the doctype are ignored.
pub fn parse_reader<R: BufRead>(input: R, schema: Arc<Schema>) -> Result<Document, ParseError> {
    let mut reader = Reader::from_reader(input);
    let config = reader.config_mut();
    config.trim_text(false);
    // End tags are matched by the tree builder so mismatches surface as
    // structure errors.
    config.check_end_names = false;

    let mut buf = Vec::new();
    let mut builder = TreeBuilder::new(schema);

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                builder.enter(qname_to_str(e.name())?)?;
            }
            Event::Empty(e) => {
                let name = qname_to_str(e.name())?;
                builder.enter(name)?;
                builder.leave(name)?;
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                builder.text(&text);
            }
            Event::CData(e) => {
                builder.text(std::str::from_utf8(e.as_ref())?);
            }
            Event::End(e) => {
                builder.leave(qname_to_str(e.name())?)?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
        }
        buf.clear();
    }

    Ok(builder.finish()?)
}

fn qname_to_str(name: QName<'_>) -> Result<&str, ParseError> {
    Ok(std::str::from_utf8(name.into_inner())?)
}
