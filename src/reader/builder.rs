//! Builds a [`Document`] from tokenizer events.

use std::mem;

use tracing::trace;

use crate::errors::{AllocationError, Error, IncompleteError};
use crate::name::NamespaceTable;
use crate::reader::event::{Event, StartTag};
use crate::reader::resolver::NamespaceResolver;
use crate::reader::Config;
use crate::tree::{Arena, AttributeId, Document, ElementId, TextSlot};

/// An element whose end tag was not seen yet.
#[derive(Clone, Copy, Debug)]
struct OpenElement {
    id: ElementId,
    /// Most recently added child, which receives the text that follows it
    last_child: Option<ElementId>,
}

/// Creates the element tree by consuming events one by one.
///
/// Namespace prefixes are resolved when an element starts, so names are
/// final as soon as they are stored. The tokenizer guarantees that events
/// are properly nested, that there is a single root element and that text
/// appears only inside it.
#[derive(Clone, Debug)]
pub(crate) struct TreeBuilder {
    arena: Arena,
    namespaces: NamespaceTable,
    resolver: NamespaceResolver,
    /// Path from the root to the current element
    parents: Vec<OpenElement>,
    root: Option<ElementId>,
    max_depth: Option<usize>,
}

impl TreeBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            arena: Arena::new(config.node_limit),
            namespaces: NamespaceTable::new(),
            resolver: NamespaceResolver::new(config.default_namespace_for_attributes),
            parents: Vec::new(),
            root: None,
            max_depth: config.max_depth,
        }
    }

    /// Pushes new event to the builder
    pub fn feed(&mut self, event: Event) -> Result<(), Error> {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => {
                self.parents.pop();
                self.resolver.pop_scope();
                Ok(())
            }
            Event::Text(text) => {
                let (owner, slot) = match self.parents.last() {
                    Some(OpenElement {
                        last_child: Some(child),
                        ..
                    }) => (*child, TextSlot::Following),
                    Some(OpenElement { id, .. }) => (*id, TextSlot::First),
                    // spaces around the root element are not stored
                    None => return Ok(()),
                };
                self.arena.append_text(owner, slot, text)?;
                Ok(())
            }
        }
    }

    fn start(&mut self, tag: StartTag) -> Result<(), Error> {
        if let Some(max) = self.max_depth {
            if self.parents.len() >= max {
                return Err(AllocationError::DepthLimit(max).into());
            }
        }
        let resolved = self
            .resolver
            .enter(&tag.name, tag.attributes, &mut self.namespaces)?;

        let parent = self.parents.last().map(|p| p.id);
        let id = self
            .arena
            .alloc_element(resolved.name.name, resolved.name.ns, parent)?;
        trace!(?id, name = %tag.name, "element started");

        let mut last_attr: Option<AttributeId> = None;
        for (name, value) in resolved.attributes {
            let attr = self.arena.alloc_attribute(name.name, name.ns, value)?;
            match last_attr {
                Some(last) => self.arena.attribute_mut(last).next = Some(attr),
                None => self.arena.element_mut(id).first_attr = Some(attr),
            }
            last_attr = Some(attr);
        }
        self.arena.element_mut(id).lang = resolved.lang;

        match self.parents.last_mut() {
            Some(parent) => {
                match parent.last_child {
                    Some(last) => self.arena.element_mut(last).next = Some(id),
                    None => self.arena.element_mut(parent.id).first_child = Some(id),
                }
                parent.last_child = Some(id);
            }
            None => self.root = Some(id),
        }
        self.parents.push(OpenElement {
            id,
            last_child: None,
        });
        Ok(())
    }

    /// Checks that the tree is complete and hands it over. The builder is
    /// left empty.
    pub fn finish(&mut self) -> Result<Document, Error> {
        if !self.parents.is_empty() {
            let names = self
                .parents
                .iter()
                .map(|p| self.arena.element(p.id).name.clone())
                .collect();
            return Err(IncompleteError::UnclosedElements(names).into());
        }
        let root = self.root.take().ok_or(IncompleteError::MissingRoot)?;
        Ok(Document::new(
            mem::take(&mut self.arena),
            root,
            mem::take(&mut self.namespaces),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::NamespaceId;
    use pretty_assertions::assert_eq;

    fn build(events: Vec<Event>) -> Result<Document, Error> {
        let mut builder = TreeBuilder::new(&Config::default());
        for event in events {
            builder.feed(event)?;
        }
        builder.finish()
    }

    fn text(text: &str) -> Event {
        Event::Text(text.into())
    }

    fn end(name: &str) -> Event {
        Event::End(name.into())
    }

    #[test]
    fn text_placement() {
        let doc = build(vec![
            Event::Start(StartTag::new("r")),
            text("head"),
            Event::Start(StartTag::new("a")),
            text("in a"),
            end("a"),
            text("after a"),
            text(", still after a"),
            Event::Start(StartTag::new("b")),
            end("b"),
            end("r"),
        ])
        .unwrap();

        let root = doc.root();
        assert_eq!(root.first_cdata(), "head");
        assert_eq!(root.following_cdata(), "");

        let a = root.first_child().unwrap();
        assert_eq!(a.name(), "a");
        assert_eq!(a.first_cdata(), "in a");
        assert_eq!(a.following_cdata(), "after a, still after a");
        assert_eq!(a.following_cdata().fragments().count(), 2);

        let b = a.next_sibling().unwrap();
        assert_eq!(b.name(), "b");
        assert!(b.is_empty());
        assert_eq!(b.following_cdata(), "");
        assert_eq!(b.parent().map(|p| p.id()), Some(root.id()));
    }

    #[test]
    fn attributes_in_order() {
        let doc = build(vec![
            Event::Start(
                StartTag::new("r")
                    .with_attribute("z", "1")
                    .with_attribute("xml:lang", "fr")
                    .with_attribute("a", "2")
                    .with_attribute("a", "3"),
            ),
            end("r"),
        ])
        .unwrap();

        let root = doc.root();
        assert_eq!(root.lang(), Some("fr"));
        let attributes: Vec<_> = root
            .attributes()
            .map(|a| (a.name(), a.namespace(), a.value()))
            .collect();
        assert_eq!(
            attributes,
            vec![
                ("z", NamespaceId::Unbound, "1"),
                ("a", NamespaceId::Unbound, "2"),
                ("a", NamespaceId::Unbound, "3"),
            ]
        );
    }

    #[test]
    fn incomplete() {
        let error = build(vec![
            Event::Start(StartTag::new("a")),
            Event::Start(StartTag::new("b")),
        ])
        .unwrap_err();
        assert!(matches!(
            error,
            Error::Incomplete(IncompleteError::UnclosedElements(names)) if names == ["a", "b"]
        ));

        let error = build(vec![]).unwrap_err();
        assert!(matches!(
            error,
            Error::Incomplete(IncompleteError::MissingRoot)
        ));
    }

    #[test]
    fn depth_limit() {
        let mut builder = TreeBuilder::new(&Config {
            max_depth: Some(2),
            ..Config::default()
        });
        builder.feed(Event::Start(StartTag::new("a"))).unwrap();
        builder.feed(Event::Start(StartTag::new("b"))).unwrap();
        assert!(matches!(
            builder.feed(Event::Start(StartTag::new("c"))),
            Err(Error::Allocation(AllocationError::DepthLimit(2)))
        ));
    }
}
