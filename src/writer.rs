//! Serialization of element subtrees back to XML text.
//!
//! Names are written with output-local prefixes: the `DAV:` namespace is
//! always written as `D`, other namespaces get `ns0`, `ns1`, ... in the
//! order in which a [`NamespaceMap`] first declares them. A namespace which
//! the map does not declare is written as `n<index>`, with its index in the
//! [`NamespaceTable`].

use std::fmt;

use tracing::trace;

use crate::errors::InternalConsistencyError;
use crate::escape::quote_string;
use crate::name::{NamespaceId, NamespaceTable, DAV_ID};
use crate::text::Text;
use crate::tree::Element;

/// What part of an element [`to_text`] writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-types", derive(serde::Deserialize, serde::Serialize))]
pub enum Style {
    /// The element itself: start tag, content and end tag.
    Full = 0,
    /// Only the content: character data and child elements.
    Inner = 1,
    /// The language of the element (if any), a NUL character, then the
    /// content as in [`Inner`](Self::Inner).
    LangInner = 2,
    /// As [`Full`](Self::Full), with declarations of every namespace used
    /// in the subtree on the start tag, so the output stands on its own.
    FullNsLang = 3,
}

impl Style {
    /// Converts the numeric form used by existing callers.
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Full),
            1 => Some(Self::Inner),
            2 => Some(Self::LangInner),
            3 => Some(Self::FullNsLang),
            _ => None,
        }
    }

    /// Returns the numeric form of the style.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// A prefix assigned to a namespace in the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// `D`, reserved for the `DAV:` namespace
    Dav,
    /// `ns<n>`
    Generated(u32),
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Dav => f.write_str("D"),
            Self::Generated(n) => write!(f, "ns{}", n),
        }
    }
}

/// Prefixes declared in an output, indexed by position in the
/// [`NamespaceTable`].
///
/// Start with a fresh map for each independent output. Reusing a map across
/// [`to_text`] calls which produce parts of the same output prevents
/// namespaces from being declared twice.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamespaceMap {
    prefixes: Vec<Option<Prefix>>,
    /// Number of `ns<n>` prefixes handed out
    generated: u32,
}

impl NamespaceMap {
    /// Creates a map without declared namespaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the prefix declared for the namespace with this index.
    pub fn get(&self, index: usize) -> Option<Prefix> {
        self.prefixes.get(index).copied().flatten()
    }

    /// `true` if a prefix was declared for the namespace with this index.
    pub fn is_declared(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Returns the prefix for the namespace with this index, assigning the
    /// next free one if none was declared yet.
    pub fn declare(&mut self, index: usize) -> Prefix {
        if let Some(prefix) = self.get(index) {
            return prefix;
        }
        let prefix = if index == DAV_ID as usize {
            Prefix::Dav
        } else {
            self.generated += 1;
            Prefix::Generated(self.generated - 1)
        };
        if self.prefixes.len() <= index {
            self.prefixes.resize(index + 1, None);
        }
        self.prefixes[index] = Some(prefix);
        prefix
    }

    /// Number of declared namespaces.
    pub fn len(&self) -> usize {
        self.prefixes.iter().filter(|p| p.is_some()).count()
    }

    /// `true` if nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets all declarations, so the map can be used for a new output.
    pub fn clear(&mut self) {
        self.prefixes.clear();
        self.generated = 0;
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// A pending piece of output.
enum Step<'d> {
    /// Write an element. The language is the one in effect in the output
    /// around it.
    Open(Element<'d>, Option<&'d str>),
    Close(Element<'d>),
    Text(Text<'d>),
}

struct Serializer<'a, 'd> {
    table: &'a NamespaceTable,
    remap: &'a mut NamespaceMap,
    out: String,
    stack: Vec<Step<'d>>,
}

impl<'a, 'd> Serializer<'a, 'd> {
    fn check(&self, ns: NamespaceId) -> Result<(), InternalConsistencyError> {
        match ns {
            NamespaceId::Bound(index) if index >= self.table.len() => {
                Err(InternalConsistencyError::OutOfTable {
                    index,
                    len: self.table.len(),
                })
            }
            _ => Ok(()),
        }
    }

    fn write_name(&mut self, name: &str, ns: NamespaceId) -> Result<(), InternalConsistencyError> {
        self.check(ns)?;
        if let NamespaceId::Bound(index) = ns {
            match self.remap.get(index) {
                Some(prefix) => self.out.push_str(&prefix.to_string()),
                None if index == DAV_ID as usize => self.out.push_str("D"),
                // not declared anywhere in the output. `n<index>` cannot be
                // mistaken for a generated `ns<n>` prefix of the same map
                None => {
                    self.out.push('n');
                    self.out.push_str(&index.to_string());
                }
            }
            self.out.push(':');
        }
        self.out.push_str(name);
        Ok(())
    }

    fn write_text(&mut self, text: Text<'d>) {
        for fragment in text.fragments() {
            self.out.push_str(fragment);
        }
    }

    /// Declares in `remap` the namespaces used in the subtree which are not
    /// declared in the output yet. Returns the new prefixes with the index of
    /// their namespace, in order of first use.
    ///
    /// Nothing is declared if any name refers to a namespace outside the
    /// table.
    fn declare_subtree(
        &mut self,
        element: Element<'d>,
    ) -> Result<Vec<(Prefix, usize)>, InternalConsistencyError> {
        let doc = element.document();
        let mut used = Vec::new();
        for id in doc.subtree_ids(element.id()) {
            let e = doc.element(id);
            used.push(e.namespace());
            used.extend(e.attributes().map(|a| a.namespace()));
        }
        for ns in &used {
            self.check(*ns)?;
        }
        let mut declared = Vec::new();
        for index in used.into_iter().filter_map(NamespaceId::index) {
            if !self.remap.is_declared(index) {
                declared.push((self.remap.declare(index), index));
            }
        }
        Ok(declared)
    }

    fn write_declarations(&mut self, declared: &[(Prefix, usize)]) {
        for &(prefix, index) in declared {
            let uri = self.table.get(index).unwrap_or_default();
            self.out.push_str(" xmlns:");
            self.out.push_str(&prefix.to_string());
            self.out.push_str("=\"");
            self.out.push_str(&quote_string(uri, true));
            self.out.push('"');
        }
    }

    /// Queues the content of `element`: its first character data, then each
    /// child followed by the character data after it.
    fn push_content(&mut self, element: Element<'d>, lang: Option<&'d str>) {
        let children: Vec<_> = element.children().collect();
        for child in children.into_iter().rev() {
            self.stack.push(Step::Text(child.following_cdata()));
            self.stack.push(Step::Open(child, lang));
        }
        self.stack.push(Step::Text(element.first_cdata()));
    }

    fn open(
        &mut self,
        element: Element<'d>,
        mut lang: Option<&'d str>,
        declare: bool,
    ) -> Result<(), InternalConsistencyError> {
        // prefixes must be known before the name is written
        let declared = if declare {
            self.declare_subtree(element)?
        } else {
            Vec::new()
        };
        self.out.push('<');
        self.write_name(element.name(), element.namespace())?;
        self.write_declarations(&declared);
        if let Some(own) = element.lang() {
            if lang != Some(own) {
                self.out.push_str(" xml:lang=\"");
                self.out.push_str(&quote_string(own, true));
                self.out.push('"');
                lang = Some(own);
            }
        }
        for attr in element.attributes() {
            self.out.push(' ');
            self.write_name(attr.name(), attr.namespace())?;
            self.out.push_str("=\"");
            self.out.push_str(attr.value());
            self.out.push('"');
        }
        if element.is_empty() {
            self.out.push_str("/>");
        } else {
            self.out.push('>');
            self.stack.push(Step::Close(element));
            self.push_content(element, lang);
        }
        Ok(())
    }

    fn run(mut self) -> Result<String, InternalConsistencyError> {
        while let Some(step) = self.stack.pop() {
            match step {
                Step::Open(element, lang) => self.open(element, lang, false)?,
                Step::Close(element) => {
                    self.out.push_str("</");
                    self.write_name(element.name(), element.namespace())?;
                    self.out.push('>');
                }
                Step::Text(text) => self.write_text(text),
            }
        }
        Ok(self.out)
    }
}

/// Serializes `element` in the given style.
///
/// Namespace indexes are looked up in `table`, which is normally the table
/// of the element's document. Prefixes are taken from `remap`, and
/// [`Style::FullNsLang`] records there the namespaces it declares.
///
/// Character data and attribute values are written as stored; call
/// [`quote_elem`](crate::escape::quote_elem) first if they may contain
/// markup characters.
///
/// # Errors
///
/// [`InternalConsistencyError::OutOfTable`] if a name of the subtree refers
/// to a namespace that `table` does not have.
///
/// # Example
///
/// ```
/// # use dav_xml::reader::parse_str;
/// # use dav_xml::writer::{to_text, NamespaceMap, Style};
/// # use pretty_assertions::assert_eq;
/// let doc = parse_str(r#"<p:prop xmlns:p="urn:example"><p:a/>text</p:prop>"#).unwrap();
/// let root = doc.root();
///
/// let xml = to_text(root, Style::FullNsLang, doc.namespaces(), &mut NamespaceMap::new()).unwrap();
/// assert_eq!(xml, r#"<ns0:prop xmlns:ns0="urn:example"><ns0:a/>text</ns0:prop>"#);
///
/// let xml = to_text(root, Style::Inner, doc.namespaces(), &mut NamespaceMap::new()).unwrap();
/// assert_eq!(xml, "<n1:a/>text");
/// ```
pub fn to_text(
    element: Element,
    style: Style,
    table: &NamespaceTable,
    remap: &mut NamespaceMap,
) -> Result<String, InternalConsistencyError> {
    trace!(?style, element = element.name(), "serializing");
    let mut serializer = Serializer {
        table,
        remap,
        out: String::new(),
        stack: Vec::new(),
    };
    match style {
        Style::Full => serializer.open(element, None, false)?,
        Style::FullNsLang => serializer.open(element, None, true)?,
        Style::Inner => serializer.push_content(element, None),
        Style::LangInner => {
            let lang = element.lang();
            if let Some(lang) = lang {
                serializer.out.push_str(lang);
            }
            serializer.out.push('\0');
            serializer.push_content(element, lang);
        }
    }
    serializer.run()
}

/// Returns an empty-element tag with the name of `element`, ignoring its
/// attributes and content.
///
/// ```
/// # use dav_xml::reader::parse_str;
/// # use dav_xml::writer::empty_elem;
/// # use pretty_assertions::assert_eq;
/// let doc = parse_str(r#"<D:prop xmlns:D="DAV:" xmlns:z="urn:z"><z:color>red</z:color><plain/></D:prop>"#).unwrap();
/// let root = doc.root();
/// assert_eq!(empty_elem(root), "<D:prop/>");
/// let mut children = root.children();
/// assert_eq!(empty_elem(children.next().unwrap()), "<ns1:color/>");
/// assert_eq!(empty_elem(children.next().unwrap()), "<plain/>");
/// ```
pub fn empty_elem(element: Element) -> String {
    match element.namespace() {
        NamespaceId::Bound(index) if index == DAV_ID as usize => {
            format!("<D:{}/>", element.name())
        }
        NamespaceId::Bound(index) => format!("<ns{}:{}/>", index, element.name()),
        NamespaceId::Unbound | NamespaceId::Literal => format!("<{}/>", element.name()),
    }
}
