//! Namespace-aware XML tree parser and serializer for WebDAV request and
//! response bodies.
//!
//! # Description
//!
//! A document is given to the [`Parser`] in chunks of any size, as they
//! arrive from the network, and comes out as a [`Document`]: a tree of
//! elements whose names are resolved to namespaces registered in a
//! [`NamespaceTable`]. The `DAV:` namespace always has index 0, so WebDAV
//! element names can be matched without any lookup.
//!
//! - [`Parser`]: incremental parser which builds the tree.
//! - [`Document`], [`Element`], [`Attribute`] and [`Text`]: read-only views
//!   of the tree.
//! - [`writer::to_text`]: writes a subtree back to text in one of four
//!   [`Style`]s.
//! - [`escape::quote_string`] and [`escape::quote_elem`]: escaping of
//!   character data before it is written.
//!
//! Only UTF-8 documents are supported. Comments, processing instructions
//! and the document type declaration are skipped.
//!
//! Optional support of asynchronous reading using [tokio] is enabled by the
//! [`async-tokio`](#async-tokio) feature.
//!
//! # Example
//!
//! ```
//! use dav_xml::{NamespaceId, NamespaceMap, Parser, Style};
//! # use pretty_assertions::assert_eq;
//!
//! let mut parser = Parser::new();
//! parser.feed(br#"<D:propfind xmlns:D="DAV:"><D:prop xmlns:z="urn:z">"#)?;
//! parser.feed(br#"<z:color/></D:prop></D:propfind>"#)?;
//! let doc = parser.done()?;
//!
//! let prop = doc.root().first_child().unwrap();
//! assert_eq!(prop.name(), "prop");
//! assert_eq!(prop.namespace(), NamespaceId::DAV);
//!
//! let color = prop.first_child().unwrap();
//! assert_eq!(color.namespace_uri(), Some("urn:z"));
//! assert_eq!(
//!     color.to_text(Style::FullNsLang, &mut NamespaceMap::new())?,
//!     r#"<ns0:color xmlns:ns0="urn:z"/>"#,
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Features
//!
//! `dav-xml` supports the following features:
//!
//! [tokio]: https://tokio.rs/
#![cfg_attr(
    feature = "document-features",
    cfg_attr(doc, doc = ::document_features::document_features!(
        feature_label = "<a id=\"{feature}\" href=\"#{feature}\"><strong><code>{feature}</code></strong></a>"
    ))
)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
// docs.rs defines `docsrs` when building documentation
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod errors;
pub mod escape;
pub mod name;
pub mod reader;
pub mod text;
pub mod tree;
pub mod writer;

// reexports
pub use crate::errors::{Error, Result};
pub use crate::name::{NamespaceId, NamespaceTable, QName};
pub use crate::reader::{parse_bytes, parse_from_source, parse_str, Config, Parser};
#[cfg(feature = "async-tokio")]
pub use crate::reader::parse_from_async_source;
pub use crate::text::Text;
pub use crate::tree::{Attribute, Document, Element, ElementId};
pub use crate::writer::{NamespaceMap, Style};
