use std::io::{self, Read};

use dav_xml::errors::{AllocationError, Error, IncompleteError, SyntaxErrorKind};
use dav_xml::name::{NamespaceId, DAV_NAMESPACE};
use dav_xml::reader::{parse_from_source, parse_str, Config, Parser};
use pretty_assertions::assert_eq;

mod helpers;
use helpers::{dump, parse_all_splits, parse_in_chunks};

#[test]
fn mixed_content() {
    let doc = parse_all_splits(r#"<a:x xmlns:a="urn:a"><a:y>hi</a:y>tail</a:x>"#);
    let index = doc.namespaces().lookup("urn:a").unwrap();

    let x = doc.root();
    assert_eq!(x.name(), "x");
    assert_eq!(x.namespace(), NamespaceId::Bound(index));
    assert_eq!(x.first_cdata(), "");
    assert_eq!(x.following_cdata(), "");

    let y = x.first_child().unwrap();
    assert_eq!(y.name(), "y");
    assert_eq!(y.namespace(), NamespaceId::Bound(index));
    assert_eq!(y.first_cdata(), "hi");
    assert_eq!(y.following_cdata(), "tail");
    assert_eq!(y.next_sibling(), None);
    assert_eq!(x.children().count(), 1);
}

#[test]
fn dav_namespace_is_first() {
    let doc = parse_str(r#"<x:a xmlns:x="urn:x"><D:b xmlns:D="DAV:"/></x:a>"#).unwrap();
    let table = doc.namespaces();
    assert_eq!(table.get(0), Some(DAV_NAMESPACE));
    assert_eq!(table.lookup("urn:x"), Some(1));
    assert_eq!(table.len(), 2);

    let b = doc.root().first_child().unwrap();
    assert!(b.namespace().is_dav());
    assert_eq!(b.namespace_uri(), Some("DAV:"));
}

#[test]
fn whole_document() {
    let xml = concat!(
        "\u{FEFF}<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n",
        "<!DOCTYPE propfind [<!ENTITY x \"<>\">]>\n",
        "<!-- request -->\n",
        "<D:propfind xmlns:D=\"DAV:\" xml:lang=\"en-US\">\r\n",
        "  <D:prop><?pi data?><D:displayname>a &amp; b</D:displayname>",
        "<D:comment><![CDATA[<raw> & ]]>&#x41;&#66;</D:comment></D:prop>\n",
        "</D:propfind>\n",
        "<!-- trailer -->",
    );
    let doc = parse_all_splits(xml);
    assert_eq!(
        dump(&doc),
        concat!(
            "propfind ns#0 lang=en-US first=\"\\n  \"\n",
            "  prop ns#0 first=\"\"\n",
            "    displayname ns#0 first=\"a & b\"\n",
            "    following=\"\"\n",
            "    comment ns#0 first=\"<raw> & AB\"\n",
            "    following=\"\"\n",
            "  following=\"\\n\"\n",
        )
    );
    assert_eq!(doc.root().effective_lang(), Some("en-US"));
    let prop = doc.root().first_child().unwrap();
    assert_eq!(prop.lang(), None);
    assert_eq!(prop.effective_lang(), Some("en-US"));
}

#[test]
fn attributes() {
    let doc = parse_all_splits(
        "<a xmlns:p='urn:p' p:one=\"1\" two='a&lt;b' three=\"x\n\ty\"><b p:one='2'/></a>",
    );
    let root = doc.root();
    let attributes: Vec<_> = root
        .attributes()
        .map(|a| (a.name(), a.namespace_uri(), a.value()))
        .collect();
    assert_eq!(
        attributes,
        vec![
            ("one", Some("urn:p"), "1"),
            ("two", None, "a<b"),
            ("three", None, "x  y"),
        ]
    );
    let p = doc.namespaces().lookup("urn:p").unwrap();
    assert_eq!(root.attribute_ns(NamespaceId::Bound(p), "one").unwrap().value(), "1");
    assert!(root.attribute_ns(NamespaceId::Unbound, "one").is_none());
    assert_eq!(root.attribute("two").unwrap().namespace(), NamespaceId::Unbound);
    // declarations are not attributes
    assert!(root.attribute("p").is_none());
    assert!(root.attribute("xmlns:p").is_none());
}

#[test]
fn utf8_split_anywhere() {
    let doc = parse_all_splits("<ŝ attr='ĉu'>Ĝis ŝi 🦀 &#x1F980;</ŝ>");
    assert_eq!(doc.root().name(), "ŝ");
    assert_eq!(doc.root().attribute("attr").unwrap().value(), "ĉu");
    assert_eq!(doc.root().first_cdata(), "Ĝis ŝi 🦀 🦀");
}

#[test]
fn mismatched_end_tag() {
    let mut parser = Parser::new();
    let error = parser.feed(b"<a><b></a>").unwrap_err();
    match &error {
        Error::Syntax(e) => assert_eq!(
            e.kind,
            SyntaxErrorKind::MismatchedEndTag {
                expected: "b".into(),
                found: "a".into(),
            }
        ),
        e => panic!("expected syntax error, got {:?}", e),
    }
    assert!(matches!(parser.done(), Err(Error::Syntax(_))));
    assert!(matches!(parser.feed(b"</b>"), Err(Error::Syntax(_))));
}

#[test]
fn unclosed_element() {
    let mut parser = Parser::new();
    parser.feed(b"<a><b></b>").unwrap();
    match parser.done() {
        Err(Error::Incomplete(IncompleteError::UnclosedElements(names))) => {
            assert_eq!(names, vec!["a".to_string()])
        }
        other => panic!("expected incomplete document, got {:?}", other),
    }
}

#[test]
fn truncated_markup() {
    for (xml, kind) in [
        ("<a><b", SyntaxErrorKind::UnclosedTag),
        ("<a><!-- x", SyntaxErrorKind::UnclosedComment),
        ("<a><![CDATA[x", SyntaxErrorKind::UnclosedCData),
        ("<a><?pi", SyntaxErrorKind::UnclosedPIOrXmlDecl),
    ] {
        match parse_str(xml) {
            Err(Error::Syntax(e)) => assert_eq!(e.kind, kind, "{}", xml),
            other => panic!("{}: expected syntax error, got {:?}", xml, other),
        }
    }
}

#[test]
fn structure_errors() {
    for xml in ["<a/><b/>", "text<a/>", "<a/>text", "</a>", "<a x=1/>", "<1a/>"] {
        assert!(
            matches!(parse_str(xml), Err(Error::Syntax(_))),
            "{} should be rejected",
            xml
        );
    }
    assert!(matches!(
        parse_in_chunks(b"<a>\xFF</a>", 2),
        Err(Error::Syntax(e)) if e.kind == SyntaxErrorKind::NonUtf8
    ));
}

#[test]
fn error_position() {
    let mut parser = Parser::new();
    parser.feed(b"<a>\n  <b>\n").unwrap();
    let error = parser.feed(b"</c>").unwrap_err();
    match error {
        Error::Syntax(e) => {
            assert_eq!(e.position.line, 3);
            assert_eq!(e.position.column, 1);
            assert_eq!(e.position.offset, 10);
        }
        e => panic!("expected syntax error, got {:?}", e),
    }
}

#[test]
fn error_message() {
    let mut parser = Parser::new();
    let mut buffer = [0u8; 128];
    assert_eq!(parser.error_message(&mut buffer), "No error.");

    parser.feed(b"<a><b></a>").unwrap_err();
    assert_eq!(
        parser.error_message(&mut buffer),
        "syntax error at line 1, column 7 (offset 6): expected `</b>`, but `</a>` was found"
    );
    let mut small = [0u8; 12];
    assert_eq!(parser.error_message(&mut small), "syntax error");
}

#[test]
fn single_use() {
    let mut parser = Parser::new();
    parser.feed(b"<a/>").unwrap();
    parser.done().unwrap();
    assert!(matches!(parser.done(), Err(Error::NotActive)));
    assert!(matches!(parser.feed(b"<a/>"), Err(Error::NotActive)));
    assert_eq!(
        Error::NotActive.to_string(),
        "The parser is not active."
    );
}

#[test]
fn limits() {
    let mut config = Config::default();
    config.node_limit = Some(3);
    let mut parser = Parser::with_config(config);
    assert!(matches!(
        parser.feed(b"<a><b/><c/><d/></a>"),
        Err(Error::Allocation(AllocationError::NodeLimit(3)))
    ));

    let mut config = Config::default();
    config.max_depth = Some(2);
    let mut parser = Parser::with_config(config);
    assert!(matches!(
        parser.feed(b"<a><b><c>"),
        Err(Error::Allocation(AllocationError::DepthLimit(2)))
    ));
}

/// Returns data in pieces of at most 2 bytes, interrupting every other read.
struct Trickle<'a> {
    data: &'a [u8],
    interrupt: bool,
}

impl<'a> Read for Trickle<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.interrupt = !self.interrupt;
        if self.interrupt {
            return Err(io::ErrorKind::Interrupted.into());
        }
        let len = self.data.len().min(buf.len()).min(2);
        buf[..len].copy_from_slice(&self.data[..len]);
        self.data = &self.data[len..];
        Ok(len)
    }
}

#[test]
fn from_source() {
    let xml = b"<r xmlns='urn:r'><a>1</a><b>2</b></r>";
    let doc = parse_from_source(
        Trickle {
            data: xml,
            interrupt: false,
        },
        16,
    )
    .unwrap();
    assert_eq!(dump(&doc), dump(&parse_in_chunks(xml, xml.len()).unwrap()));
    assert_eq!(doc.root().namespace_uri(), Some("urn:r"));
}

struct Broken;

impl Read for Broken {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "connection reset"))
    }
}

#[test]
fn source_error() {
    let mut parser = Parser::new();
    assert!(matches!(parser.feed_from(Broken, 8), Err(Error::Io(_))));
    assert!(matches!(parser.last_error(), Some(Error::Io(_))));
    assert!(matches!(parse_from_source(Broken, 8), Err(Error::Io(_))));
}
