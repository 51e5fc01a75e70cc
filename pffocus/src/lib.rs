//! Typed, cross-referenced view of pfSense configuration backups.
//!
//! A `config.xml` backup is streamed once through the
//! [`schema_tree_core`] builder using the pfSense [`schema`]. The resulting
//! [`document::PfSenseDocument`] gives typed access to each section and a
//! plain-value projection for downstream formats.
//!
//! ## Modules
//!
//! - [`schema`] — Declared pfSense sections and their field types
//! - [`document`] — Parsed document with typed helpers (locations, rules, interfaces)
//! - [`resolve`] — On-demand interface and alias resolution for reference fields
//! - [`settings`] — Optional TOML settings
//! - [`inspect`] — Indented tree rendering for the command line
//!
//! # Examples
//!
//! ```ignore
//! use pffocus::document::PfSenseDocument;
//!
//! let doc = PfSenseDocument::parse_file("config.xml".as_ref())?;
//! println!("version {}", doc.version().unwrap_or("?"));
//! for rule in doc.filter_rules() {
//!     let iface = doc.tree().attr(*rule, "interface");
//!     if let Some(leaf) = iface {
//!         println!("{:?}", doc.resolve(leaf)?);
//!     }
//! }
//! ```

pub mod document;
pub mod inspect;
pub mod resolve;
pub mod schema;
pub mod settings;
