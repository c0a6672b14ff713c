use dav_xml::errors::{Error, NamespaceError};
use dav_xml::name::{NamespaceId, NamespaceTable, NO_NAMESPACE};
use dav_xml::reader::{parse_str, Config, Parser};
use pretty_assertions::assert_eq;

mod helpers;
use helpers::parse_all_splits;

#[test]
fn intern_table() {
    let mut table = NamespaceTable::new();
    assert_eq!(table.intern("DAV:"), 0);
    let a = table.intern("urn:a");
    assert_eq!(table.intern("urn:b"), a + 1);
    assert_eq!(table.intern("urn:a"), a);
    assert_eq!(table.intern("DAV:"), 0);
    assert_eq!(table.lookup("urn:c"), None);
    assert_eq!(
        table.iter().collect::<Vec<_>>(),
        vec![(0, "DAV:"), (1, "urn:a"), (2, "urn:b")]
    );
}

#[test]
fn shadowing() {
    let doc = parse_all_splits(r#"<r xmlns:d="DAV:"><d:a xmlns:d="urn:other"/><d:b/></r>"#);
    let mut children = doc.root().children();
    let a = children.next().unwrap();
    let b = children.next().unwrap();
    assert_eq!(a.namespace_uri(), Some("urn:other"));
    assert_eq!(b.namespace_uri(), Some("DAV:"));
    assert_eq!(b.namespace(), NamespaceId::DAV);
}

#[test]
fn inner_declarations_stay_inside() {
    let doc = parse_all_splits(concat!(
        r#"<r xmlns="urn:outer">"#,
        r#"<a xmlns="urn:inner" xmlns:p="urn:p"><p:x/><y/></a>"#,
        r#"<b/>"#,
        r#"</r>"#,
    ));
    let root = doc.root();
    assert_eq!(root.namespace_uri(), Some("urn:outer"));

    let a = root.first_child().unwrap();
    assert_eq!(a.namespace_uri(), Some("urn:inner"));
    let mut inner = a.children();
    assert_eq!(inner.next().unwrap().namespace_uri(), Some("urn:p"));
    assert_eq!(inner.next().unwrap().namespace_uri(), Some("urn:inner"));

    let b = a.next_sibling().unwrap();
    assert_eq!(b.namespace_uri(), Some("urn:outer"));

    // the prefix went out of scope together with `a`
    let mut parser = Parser::new();
    assert_eq!(
        parser
            .feed(br#"<r><a xmlns:p="urn:p"/><p:b/></r>"#)
            .map_err(|e| e.to_string()),
        Err("an undefined namespace prefix `p` was used".to_string())
    );
}

#[test]
fn reserved_prefix() {
    let doc = parse_str("<xml:foo/>").unwrap();
    let root = doc.root();
    assert_eq!(root.name(), "xml:foo");
    assert_eq!(root.namespace(), NamespaceId::Literal);
    assert_eq!(root.namespace().to_raw(), Ok(NO_NAMESPACE));
    assert_eq!(root.namespace_uri(), None);
    assert_eq!(doc.namespaces().len(), 1);

    let doc = parse_str(r#"<XMLfoo:bar XmL:attr="1"/>"#).unwrap();
    assert_eq!(doc.root().name(), "XMLfoo:bar");
    assert_eq!(doc.root().namespace(), NamespaceId::Literal);
    assert_eq!(
        doc.root().attribute("XmL:attr").unwrap().namespace(),
        NamespaceId::Literal
    );
}

/// `xml`-prefixed names are never resolved, whatever the default namespace
/// in scope is.
#[test]
fn reserved_prefix_under_reset_default() {
    let doc = parse_all_splits(concat!(
        r#"<r xmlns="urn:r">"#,
        r#"<a xmlns=""><xml:b/><c/></a>"#,
        r#"<xml:d/>"#,
        r#"</r>"#,
    ));
    let root = doc.root();
    let a = root.first_child().unwrap();
    assert_eq!(a.namespace(), NamespaceId::Unbound);

    let mut inner = a.children();
    let b = inner.next().unwrap();
    assert_eq!((b.name(), b.namespace()), ("xml:b", NamespaceId::Literal));
    let c = inner.next().unwrap();
    assert_eq!((c.name(), c.namespace()), ("c", NamespaceId::Unbound));

    let d = a.next_sibling().unwrap();
    assert_eq!((d.name(), d.namespace()), ("xml:d", NamespaceId::Literal));

    // the empty URI was never interned
    assert_eq!(doc.namespaces().len(), 2);
}

#[test]
fn attributes_have_no_default_namespace() {
    let xml = r#"<r xmlns="urn:r" xmlns:p="urn:p" a="1" p:b="2"/>"#;

    let doc = parse_str(xml).unwrap();
    let attributes: Vec<_> = doc
        .root()
        .attributes()
        .map(|a| (a.name(), a.namespace_uri()))
        .collect();
    assert_eq!(attributes, vec![("a", None), ("b", Some("urn:p"))]);

    let mut config = Config::default();
    config.default_namespace_for_attributes = true;
    let mut parser = Parser::with_config(config);
    parser.feed(xml.as_bytes()).unwrap();
    let doc = parser.done().unwrap();
    let a = doc.root().attribute("a").unwrap();
    assert_eq!(a.namespace_uri(), Some("urn:r"));
}

#[test]
fn same_uri_same_index() {
    let doc = parse_str(concat!(
        r#"<a:r xmlns:a="urn:x">"#,
        r#"<b:c xmlns:b="urn:x"/>"#,
        r#"<D:d xmlns:D="DAV:"/>"#,
        r#"</a:r>"#,
    ))
    .unwrap();
    let root = doc.root();
    let c = root.first_child().unwrap();
    assert_eq!(c.namespace(), root.namespace());
    assert_eq!(c.next_sibling().unwrap().namespace(), NamespaceId::DAV);
    assert_eq!(doc.namespaces().len(), 2);
}

#[test]
fn errors() {
    let cases: &[(&str, NamespaceError)] = &[
        ("<p:a/>", NamespaceError::UnknownPrefix("p".into())),
        ("<a p:b='1'/>", NamespaceError::UnknownPrefix("p".into())),
        (
            r#"<a xmlns:p=""/>"#,
            NamespaceError::EmptyPrefixedUri("p".into()),
        ),
        (
            r#"<a xmlns:xmlns="urn:x"/>"#,
            NamespaceError::DeclaredXmlnsPrefix,
        ),
        ("<:a/>", NamespaceError::MalformedName(":a".into())),
        ("<a:/>", NamespaceError::MalformedName("a:".into())),
    ];
    for (xml, expected) in cases {
        match parse_str(xml) {
            Err(Error::Namespace(e)) => assert_eq!(&e, expected, "{}", xml),
            other => panic!("{}: expected namespace error, got {:?}", xml, other),
        }
    }
}

#[test]
fn raw_ids() {
    assert_eq!(NamespaceId::from_raw(0).unwrap(), NamespaceId::DAV);
    assert_eq!(NamespaceId::from_raw(5).unwrap(), NamespaceId::Bound(5));
    assert_eq!(NamespaceId::from_raw(-10).unwrap(), NamespaceId::Unbound);
    assert!(NamespaceId::from_raw(-100).is_err());
    assert!(NamespaceId::from_raw(-1).is_err());
    assert_eq!(NamespaceId::Bound(3).to_raw(), Ok(3));
    assert_eq!(NamespaceId::Literal.to_raw(), Ok(-10));
}
