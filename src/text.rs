//! Character data storage.
//!
//! Each run of character data read by the parser is stored as a chain of
//! fragments. A run is usually a single fragment, but input split across
//! several chunks may produce more. The concatenation of fragments is the
//! text of the run.

use std::fmt;
use std::iter::FusedIterator;

use crate::tree::{Arena, TextId};

/// A single stored piece of character data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TextNode {
    pub text: String,
    pub next: Option<TextId>,
}

/// Head and tail of a chain of [`TextNode`]s.
///
/// Appending is O(1): the new fragment is linked after the tail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TextList {
    first: Option<TextId>,
    last: Option<TextId>,
}

impl TextList {
    #[inline]
    pub fn first(&self) -> Option<TextId> {
        self.first
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Links the already allocated fragment `id` at the end of the list.
    pub fn push(&mut self, nodes: &mut [TextNode], id: TextId) {
        match self.last {
            Some(last) => nodes[last.index()].next = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Borrowed view of a run of character data, for example the
/// [`first_cdata`](crate::tree::Element::first_cdata) of an element.
///
/// Compare with a string to compare the concatenation of all fragments:
///
/// ```
/// # use dav_xml::reader::parse_str;
/// let doc = parse_str("<a>x &amp; y</a>").unwrap();
/// assert_eq!(doc.root().first_cdata(), "x & y");
/// assert_eq!(doc.root().following_cdata(), "");
/// ```
#[derive(Clone, Copy)]
pub struct Text<'d> {
    arena: &'d Arena,
    list: TextList,
}

impl<'d> Text<'d> {
    pub(crate) fn new(arena: &'d Arena, list: TextList) -> Self {
        Self { arena, list }
    }

    /// `true` if no fragment was ever stored. A stored fragment is never
    /// empty, so this is also `true` exactly when the text is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Iterates over the stored fragments in document order.
    pub fn fragments(&self) -> Fragments<'d> {
        Fragments {
            arena: self.arena,
            next: self.list.first(),
        }
    }

    /// Length in bytes of the whole text.
    pub fn len(&self) -> usize {
        self.fragments().map(str::len).sum()
    }

    /// Concatenates the fragments into one string.
    pub fn to_text(&self) -> String {
        let mut result = String::with_capacity(self.len());
        for fragment in self.fragments() {
            result.push_str(fragment);
        }
        result
    }
}

impl<'d> fmt::Display for Text<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for fragment in self.fragments() {
            f.write_str(fragment)?;
        }
        Ok(())
    }
}

impl<'d> fmt::Debug for Text<'d> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.fragments()).finish()
    }
}

impl<'d> PartialEq<str> for Text<'d> {
    fn eq(&self, other: &str) -> bool {
        let mut rest = other;
        for fragment in self.fragments() {
            match rest.strip_prefix(fragment) {
                Some(tail) => rest = tail,
                None => return false,
            }
        }
        rest.is_empty()
    }
}

impl<'d, 'a> PartialEq<&'a str> for Text<'d> {
    #[inline]
    fn eq(&self, other: &&'a str) -> bool {
        self == *other
    }
}

impl<'d, 'o> PartialEq<Text<'o>> for Text<'d> {
    fn eq(&self, other: &Text<'o>) -> bool {
        // fragment boundaries may differ
        self.to_text() == other.to_text()
    }
}

/// Iterator over the fragments of a [`Text`].
#[derive(Clone)]
pub struct Fragments<'d> {
    arena: &'d Arena,
    next: Option<TextId>,
}

impl<'d> Iterator for Fragments<'d> {
    type Item = &'d str;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.arena.text(self.next?);
        self.next = node.next;
        Some(&node.text)
    }
}

impl<'d> FusedIterator for Fragments<'d> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TextSlot;
    use pretty_assertions::assert_eq;

    fn arena_with_root() -> (Arena, crate::tree::ElementId) {
        let mut arena = Arena::new(None);
        let root = arena
            .alloc_element("root".into(), crate::name::NamespaceId::Unbound, None)
            .unwrap();
        (arena, root)
    }

    #[test]
    fn empty_list() {
        let (arena, root) = arena_with_root();
        let text = Text::new(&arena, arena.element(root).first_cdata);
        assert!(text.is_empty());
        assert_eq!(text.len(), 0);
        assert_eq!(text, "");
        assert_eq!(text.fragments().count(), 0);
    }

    #[test]
    fn append_keeps_order() {
        let (mut arena, root) = arena_with_root();
        for piece in ["one ", "two ", "three"] {
            arena
                .append_text(root, TextSlot::First, piece.into())
                .unwrap();
        }
        let text = Text::new(&arena, arena.element(root).first_cdata);
        assert_eq!(
            text.fragments().collect::<Vec<_>>(),
            vec!["one ", "two ", "three"]
        );
        assert_eq!(text, "one two three");
        assert_ne!(text, "one two");
        assert_ne!(text, "one two three!");
        assert_eq!(text.to_string(), "one two three");
        assert_eq!(text.len(), 13);
    }

    #[test]
    fn lists_are_independent() {
        let (mut arena, root) = arena_with_root();
        arena
            .append_text(root, TextSlot::First, "inside".into())
            .unwrap();
        arena
            .append_text(root, TextSlot::Following, "after".into())
            .unwrap();
        let node = arena.element(root);
        assert_eq!(Text::new(&arena, node.first_cdata), "inside");
        assert_eq!(Text::new(&arena, node.following_cdata), "after");
    }
}
