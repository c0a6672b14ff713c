//! The element tree produced by the [parser](crate::reader::Parser).
//!
//! All nodes of a [`Document`] live in one [`Arena`] and refer to each other
//! by index, so a document is released at once when it is dropped. Nodes
//! are read through the [`Element`] and [`Attribute`] views, which borrow
//! the document.

use std::fmt;
use std::iter::FusedIterator;

use crate::errors::AllocationError;
use crate::name::{NamespaceId, NamespaceTable};
use crate::text::{Text, TextList, TextNode};
use crate::writer::{NamespaceMap, Style};

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde-types", derive(serde::Deserialize, serde::Serialize))]
        pub struct $name(u32);

        impl $name {
            /// Position of the node in its arena storage.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            fn from_index(index: usize) -> Result<Self, AllocationError> {
                u32::try_from(index)
                    .map(Self)
                    .map_err(|_| AllocationError::NodeLimit(u32::MAX as usize))
            }
        }
    };
}

node_id!(
    /// Identifies an element inside its [`Document`].
    ElementId
);
node_id!(
    /// Identifies an attribute inside its [`Document`].
    AttributeId
);
node_id!(
    /// Identifies a character data fragment inside its [`Document`].
    TextId
);

////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ElementNode {
    pub name: String,
    pub ns: NamespaceId,
    pub lang: Option<String>,
    /// Text before the first child, or the whole text of a leaf
    pub first_cdata: TextList,
    /// Text after the end tag of this element, up to the next sibling or the
    /// end tag of the parent
    pub following_cdata: TextList,
    pub parent: Option<ElementId>,
    pub next: Option<ElementId>,
    pub first_child: Option<ElementId>,
    pub first_attr: Option<AttributeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AttributeNode {
    pub name: String,
    pub ns: NamespaceId,
    pub value: String,
    pub next: Option<AttributeId>,
}

/// Which text list of an element receives character data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TextSlot {
    First,
    Following,
}

/// Node storage of a document.
///
/// Allocation fails when the optional node budget is exhausted or when the
/// backing memory cannot be reserved.
#[derive(Clone, Debug, Default)]
pub(crate) struct Arena {
    elements: Vec<ElementNode>,
    attributes: Vec<AttributeNode>,
    texts: Vec<TextNode>,
    limit: Option<usize>,
}

impl Arena {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Total number of allocated nodes of all kinds.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len() + self.attributes.len() + self.texts.len()
    }

    fn check_limit(&self) -> Result<(), AllocationError> {
        match self.limit {
            Some(limit) if self.len() >= limit => Err(AllocationError::NodeLimit(limit)),
            _ => Ok(()),
        }
    }

    pub fn alloc_element(
        &mut self,
        name: String,
        ns: NamespaceId,
        parent: Option<ElementId>,
    ) -> Result<ElementId, AllocationError> {
        self.check_limit()?;
        self.elements.try_reserve(1)?;
        let id = ElementId::from_index(self.elements.len())?;
        self.elements.push(ElementNode {
            name,
            ns,
            lang: None,
            first_cdata: TextList::default(),
            following_cdata: TextList::default(),
            parent,
            next: None,
            first_child: None,
            first_attr: None,
        });
        Ok(id)
    }

    pub fn alloc_attribute(
        &mut self,
        name: String,
        ns: NamespaceId,
        value: String,
    ) -> Result<AttributeId, AllocationError> {
        self.check_limit()?;
        self.attributes.try_reserve(1)?;
        let id = AttributeId::from_index(self.attributes.len())?;
        self.attributes.push(AttributeNode {
            name,
            ns,
            value,
            next: None,
        });
        Ok(id)
    }

    /// Stores `text` as a new fragment at the end of the `slot` list of
    /// `owner`. Empty text is not stored.
    pub fn append_text(
        &mut self,
        owner: ElementId,
        slot: TextSlot,
        text: String,
    ) -> Result<(), AllocationError> {
        if text.is_empty() {
            return Ok(());
        }
        self.check_limit()?;
        self.texts.try_reserve(1)?;
        let id = TextId::from_index(self.texts.len())?;
        self.texts.push(TextNode { text, next: None });

        let node = &mut self.elements[owner.index()];
        let list = match slot {
            TextSlot::First => &mut node.first_cdata,
            TextSlot::Following => &mut node.following_cdata,
        };
        list.push(&mut self.texts, id);
        Ok(())
    }

    #[inline]
    pub fn element(&self, id: ElementId) -> &ElementNode {
        &self.elements[id.index()]
    }

    #[inline]
    pub fn element_mut(&mut self, id: ElementId) -> &mut ElementNode {
        &mut self.elements[id.index()]
    }

    #[inline]
    pub fn attribute(&self, id: AttributeId) -> &AttributeNode {
        &self.attributes[id.index()]
    }

    #[inline]
    pub fn attribute_mut(&mut self, id: AttributeId) -> &mut AttributeNode {
        &mut self.attributes[id.index()]
    }

    #[inline]
    pub fn text(&self, id: TextId) -> &TextNode {
        &self.texts[id.index()]
    }

    #[inline]
    pub fn text_mut(&mut self, id: TextId) -> &mut TextNode {
        &mut self.texts[id.index()]
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// A completely parsed XML document: the root element and the table of
/// namespace URIs used by its names.
#[derive(Clone, Debug)]
pub struct Document {
    arena: Arena,
    root: ElementId,
    namespaces: NamespaceTable,
}

impl Document {
    pub(crate) fn new(arena: Arena, root: ElementId, namespaces: NamespaceTable) -> Self {
        Self {
            arena,
            root,
            namespaces,
        }
    }

    /// The root element.
    #[inline]
    pub fn root(&self) -> Element<'_> {
        self.element(self.root)
    }

    /// Namespace URIs referenced by the resolved names of this document.
    #[inline]
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Returns the element with the given identifier.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this document.
    #[inline]
    pub fn element(&self, id: ElementId) -> Element<'_> {
        assert!(id.index() < self.arena.elements.len(), "{:?} is not in this document", id);
        Element { doc: self, id }
    }

    /// Returns the element with the given identifier, or `None` if there is
    /// no such element in the document.
    pub fn get(&self, id: ElementId) -> Option<Element<'_>> {
        (id.index() < self.arena.elements.len()).then(|| Element { doc: self, id })
    }

    /// Number of elements in the document.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.arena.elements.len()
    }

    /// Identifiers of `id` and all its descendant elements, in depth-first
    /// pre-order.
    pub fn subtree_ids(&self, id: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            let first = stack.len();
            let mut child = self.arena.element(current).first_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.arena.element(c).next;
            }
            // children were pushed in document order, pop them in the same order
            stack[first..].reverse();
        }
        result
    }

    #[inline]
    pub(crate) fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Borrowed view of an element of a [`Document`].
///
/// ```
/// # use dav_xml::reader::parse_str;
/// # use dav_xml::name::NamespaceId;
/// # use pretty_assertions::assert_eq;
/// let doc = parse_str(r#"<D:prop xmlns:D="DAV:" xml:lang="en"><D:getetag/>tail</D:prop>"#).unwrap();
/// let root = doc.root();
/// assert_eq!(root.name(), "prop");
/// assert_eq!(root.namespace(), NamespaceId::DAV);
/// assert_eq!(root.lang(), Some("en"));
///
/// let child = root.first_child().unwrap();
/// assert_eq!(child.name(), "getetag");
/// assert_eq!(child.lang(), None);
/// assert_eq!(child.effective_lang(), Some("en"));
/// assert_eq!(child.following_cdata(), "tail");
/// ```
#[derive(Clone, Copy)]
pub struct Element<'d> {
    doc: &'d Document,
    id: ElementId,
}

impl<'d> Element<'d> {
    #[inline]
    fn node(&self) -> &'d ElementNode {
        self.doc.arena.element(self.id)
    }

    #[inline]
    fn view(&self, id: ElementId) -> Element<'d> {
        Element { doc: self.doc, id }
    }

    /// Identifier of this element inside its document.
    #[inline]
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// The document this element belongs to.
    #[inline]
    pub fn document(&self) -> &'d Document {
        self.doc
    }

    /// Local name of the element. Names with a reserved `xml*` prefix keep
    /// their prefix.
    #[inline]
    pub fn name(&self) -> &'d str {
        &self.node().name
    }

    /// Resolved namespace of the element name.
    #[inline]
    pub fn namespace(&self) -> NamespaceId {
        self.node().ns
    }

    /// URI of the namespace of the element name, if it has one.
    pub fn namespace_uri(&self) -> Option<&'d str> {
        self.doc.namespaces.uri(self.namespace())
    }

    /// Value of an `xml:lang` attribute written on this element.
    #[inline]
    pub fn lang(&self) -> Option<&'d str> {
        self.node().lang.as_deref()
    }

    /// Language in effect for this element: its own `xml:lang` or the one
    /// of the nearest ancestor that has it.
    pub fn effective_lang(&self) -> Option<&'d str> {
        self.ancestors_or_self().find_map(|e| e.lang())
    }

    /// Character data before the first child element.
    #[inline]
    pub fn first_cdata(&self) -> Text<'d> {
        Text::new(&self.doc.arena, self.node().first_cdata)
    }

    /// Character data after the end tag of this element and before the next
    /// sibling (or the end tag of the parent).
    #[inline]
    pub fn following_cdata(&self) -> Text<'d> {
        Text::new(&self.doc.arena, self.node().following_cdata)
    }

    /// Parent element, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<Element<'d>> {
        self.node().parent.map(|id| self.view(id))
    }

    /// Next element with the same parent.
    #[inline]
    pub fn next_sibling(&self) -> Option<Element<'d>> {
        self.node().next.map(|id| self.view(id))
    }

    /// First child element.
    #[inline]
    pub fn first_child(&self) -> Option<Element<'d>> {
        self.node().first_child.map(|id| self.view(id))
    }

    /// `true` if the element has neither child elements nor character data
    /// inside it, i.e. it can be written as `<name/>`.
    pub fn is_empty(&self) -> bool {
        let node = self.node();
        node.first_child.is_none() && node.first_cdata.is_empty()
    }

    /// Iterates over the child elements in document order.
    pub fn children(&self) -> Children<'d> {
        Children {
            doc: self.doc,
            next: self.node().first_child,
        }
    }

    /// Iterates over this element and its ancestors up to the root.
    pub fn ancestors_or_self(&self) -> impl Iterator<Item = Element<'d>> {
        std::iter::successors(Some(*self), Element::parent)
    }

    /// Iterates over the attributes in document order. Namespace
    /// declarations and `xml:lang` are not attributes.
    pub fn attributes(&self) -> Attributes<'d> {
        Attributes {
            doc: self.doc,
            next: self.node().first_attr,
        }
    }

    /// Returns the first attribute with the given stored name, whatever its
    /// namespace is.
    pub fn attribute(&self, name: &str) -> Option<Attribute<'d>> {
        self.attributes().find(|a| a.name() == name)
    }

    /// Returns the first attribute with the given namespace and local name.
    pub fn attribute_ns(&self, ns: NamespaceId, name: &str) -> Option<Attribute<'d>> {
        self.attributes()
            .find(|a| a.namespace() == ns && a.name() == name)
    }

    /// Serializes this element, see [`writer::to_text`](crate::writer::to_text).
    ///
    /// Uses the namespace table of the owning document.
    pub fn to_text(
        &self,
        style: Style,
        remap: &mut NamespaceMap,
    ) -> Result<String, crate::errors::InternalConsistencyError> {
        crate::writer::to_text(*self, style, &self.doc.namespaces, remap)
    }
}

impl<'d> fmt::Debug for Element<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("ns", &self.namespace())
            .field("lang", &self.lang())
            .finish()
    }
}

impl<'d> PartialEq for Element<'d> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

/// Iterator over the child elements of an [`Element`].
#[derive(Clone)]
pub struct Children<'d> {
    doc: &'d Document,
    next: Option<ElementId>,
}

impl<'d> Iterator for Children<'d> {
    type Item = Element<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.doc.arena.element(id).next;
        Some(Element { doc: self.doc, id })
    }
}

impl<'d> FusedIterator for Children<'d> {}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Borrowed view of an attribute of an [`Element`].
#[derive(Clone, Copy)]
pub struct Attribute<'d> {
    doc: &'d Document,
    id: AttributeId,
}

impl<'d> Attribute<'d> {
    #[inline]
    fn node(&self) -> &'d AttributeNode {
        self.doc.arena.attribute(self.id)
    }

    /// Identifier of this attribute inside its document.
    #[inline]
    pub fn id(&self) -> AttributeId {
        self.id
    }

    /// Local name of the attribute, or the whole name for a reserved `xml*`
    /// prefix.
    #[inline]
    pub fn name(&self) -> &'d str {
        &self.node().name
    }

    /// Resolved namespace of the attribute name.
    #[inline]
    pub fn namespace(&self) -> NamespaceId {
        self.node().ns
    }

    /// URI of the namespace of the attribute name, if it has one.
    pub fn namespace_uri(&self) -> Option<&'d str> {
        self.doc.namespaces.uri(self.namespace())
    }

    /// The value with references decoded and whitespace normalized.
    #[inline]
    pub fn value(&self) -> &'d str {
        &self.node().value
    }
}

impl<'d> fmt::Debug for Attribute<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name())
            .field("ns", &self.namespace())
            .field("value", &self.value())
            .finish()
    }
}

/// Iterator over the attributes of an [`Element`].
#[derive(Clone)]
pub struct Attributes<'d> {
    doc: &'d Document,
    next: Option<AttributeId>,
}

impl<'d> Iterator for Attributes<'d> {
    type Item = Attribute<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.doc.arena.attribute(id).next;
        Some(Attribute { doc: self.doc, id })
    }
}

impl<'d> FusedIterator for Attributes<'d> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Builds `<r><a/><b><c/></b></r>` by hand
    fn sample() -> (Document, [ElementId; 4]) {
        let mut arena = Arena::new(None);
        let r = arena.alloc_element("r".into(), NamespaceId::Unbound, None).unwrap();
        let a = arena.alloc_element("a".into(), NamespaceId::Unbound, Some(r)).unwrap();
        let b = arena.alloc_element("b".into(), NamespaceId::Unbound, Some(r)).unwrap();
        let c = arena.alloc_element("c".into(), NamespaceId::Unbound, Some(b)).unwrap();
        arena.element_mut(r).first_child = Some(a);
        arena.element_mut(a).next = Some(b);
        arena.element_mut(b).first_child = Some(c);
        (Document::new(arena, r, NamespaceTable::new()), [r, a, b, c])
    }

    #[test]
    fn subtree_is_preorder() {
        let (doc, [r, a, b, c]) = sample();
        assert_eq!(doc.subtree_ids(r), vec![r, a, b, c]);
        assert_eq!(doc.subtree_ids(b), vec![b, c]);
        assert_eq!(doc.subtree_ids(a), vec![a]);
    }

    #[test]
    fn navigation() {
        let (doc, [r, a, b, c]) = sample();
        let root = doc.root();
        assert_eq!(root.id(), r);
        assert_eq!(root.parent(), None);
        assert_eq!(
            root.children().map(|e| e.id()).collect::<Vec<_>>(),
            vec![a, b]
        );
        assert_eq!(doc.element(c).parent().map(|e| e.id()), Some(b));
        assert_eq!(doc.element(a).next_sibling().map(|e| e.id()), Some(b));
        assert_eq!(doc.element(b).next_sibling(), None);
        assert!(doc.element(a).is_empty());
        assert!(!doc.element(b).is_empty());
        assert_eq!(doc.get(ElementId(99)).map(|e| e.id()), None);
        assert_eq!(doc.element_count(), 4);
    }

    #[test]
    fn node_limit() {
        let mut arena = Arena::new(Some(2));
        let r = arena.alloc_element("r".into(), NamespaceId::Unbound, None).unwrap();
        arena
            .alloc_attribute("x".into(), NamespaceId::Unbound, "1".into())
            .unwrap();
        assert_eq!(
            arena.append_text(r, TextSlot::First, "t".into()),
            Err(AllocationError::NodeLimit(2))
        );
        // empty text never consumes the budget
        assert_eq!(arena.append_text(r, TextSlot::First, String::new()), Ok(()));
        assert_eq!(arena.len(), 2);
    }
}
