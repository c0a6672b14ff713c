//! Utility functions for integration tests
// Not all tests use all helpers
#![allow(dead_code)]

use std::fmt::Write;

use dav_xml::{Document, Element, Parser, Result};

/// Parses `xml` feeding it in chunks of `size` bytes.
pub fn parse_in_chunks(xml: &[u8], size: usize) -> Result<Document> {
    let mut parser = Parser::new();
    for chunk in xml.chunks(size) {
        parser.feed(chunk)?;
    }
    parser.done()
}

/// Parses `xml` with every chunk size from 1 byte to the whole input and
/// checks that all parses give the same tree. Returns that tree.
pub fn parse_all_splits(xml: &str) -> Document {
    let whole = parse_in_chunks(xml.as_bytes(), xml.len().max(1)).unwrap();
    let expected = dump(&whole);
    for size in 1..xml.len() {
        let doc = parse_in_chunks(xml.as_bytes(), size).unwrap();
        assert_eq!(dump(&doc), expected, "chunk size {}", size);
    }
    whole
}

/// Textual form of the whole tree, showing namespace indexes, languages,
/// attributes and both text slots of every element.
pub fn dump(doc: &Document) -> String {
    let mut out = String::new();
    dump_element(doc.root(), 0, &mut out);
    out
}

fn dump_element(element: Element, depth: usize, out: &mut String) {
    let _ = write!(
        out,
        "{:indent$}{} {}",
        "",
        element.name(),
        element.namespace(),
        indent = depth * 2
    );
    if let Some(lang) = element.lang() {
        let _ = write!(out, " lang={}", lang);
    }
    for attr in element.attributes() {
        let _ = write!(out, " [{} {}={:?}]", attr.namespace(), attr.name(), attr.value());
    }
    let _ = writeln!(out, " first={:?}", element.first_cdata().to_text());
    for child in element.children() {
        dump_element(child, depth + 1, out);
        let _ = writeln!(
            out,
            "{:indent$}following={:?}",
            "",
            child.following_cdata().to_text(),
            indent = depth * 2 + 2
        );
    }
}
