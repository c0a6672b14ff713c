//! Lexical resolution of namespace prefixes.
//!
//! Bindings declared by an element are pushed on a single stack tagged with
//! the depth of the element, and popped when the element ends. Lookups scan
//! the stack from the top, so inner declarations shadow outer ones without
//! modifying them.

use tracing::trace;

use crate::errors::{Error, NamespaceError};
use crate::name::{NamespaceId, NamespaceTable, QName};

/// Name of the attribute which holds the language of an element.
const XML_LANG: &str = "xml:lang";

/// What a prefix is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Binding {
    /// Index in the [`NamespaceTable`]
    Namespace(usize),
    /// `xmlns=""`: the default namespace is reset to no namespace
    Empty,
}

#[derive(Clone, Debug)]
struct NsBinding {
    /// Declared prefix, empty for the default namespace
    prefix: String,
    binding: Binding,
    depth: usize,
}

/// A name after resolution: the local name (or the whole name for a
/// reserved prefix) and its namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ResolvedName {
    pub name: String,
    pub ns: NamespaceId,
}

/// A start tag after namespace processing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ResolvedStart {
    pub name: ResolvedName,
    /// Value of `xml:lang`, if the tag has it
    pub lang: Option<String>,
    /// Remaining attributes, in document order
    pub attributes: Vec<(ResolvedName, String)>,
}

/// Stack-based namespace resolver.
#[derive(Clone, Debug, Default)]
pub(crate) struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    /// Current element depth
    depth: usize,
    /// Resolve unprefixed attribute names with the default namespace
    attributes_use_default: bool,
}

impl NamespaceResolver {
    pub fn new(attributes_use_default: bool) -> Self {
        Self {
            attributes_use_default,
            ..Self::default()
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a binding for the current scope
    pub fn declare(&mut self, prefix: &str, binding: Binding) {
        trace!(prefix, ?binding, depth = self.depth, "namespace declared");
        self.bindings.push(NsBinding {
            prefix: prefix.to_string(),
            binding,
            depth: self.depth,
        });
    }

    /// Resolve a prefix, the empty prefix being the default namespace
    pub fn resolve(&self, prefix: &str) -> Option<Binding> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix == prefix)
            .map(|b| b.binding)
    }

    /// Resolves a qualified name in the current scope. `use_default` tells
    /// whether an unprefixed name takes the default namespace.
    pub fn resolve_name(&self, raw: &str, use_default: bool) -> Result<ResolvedName, NamespaceError> {
        let qname = QName::new(raw);
        if qname.has_reserved_prefix() {
            return Ok(ResolvedName {
                name: raw.to_string(),
                ns: NamespaceId::Literal,
            });
        }
        let ns = match qname.prefix {
            Some(prefix) => {
                if prefix.is_empty() || qname.local.is_empty() || qname.local.contains(':') {
                    return Err(NamespaceError::MalformedName(raw.to_string()));
                }
                match self.resolve(prefix) {
                    Some(Binding::Namespace(index)) => NamespaceId::Bound(index),
                    // prefixes are never bound to nothing, but be lenient
                    Some(Binding::Empty) => NamespaceId::Unbound,
                    None => return Err(NamespaceError::UnknownPrefix(prefix.to_string())),
                }
            }
            None if use_default => match self.resolve("") {
                Some(Binding::Namespace(index)) => NamespaceId::Bound(index),
                Some(Binding::Empty) | None => NamespaceId::Unbound,
            },
            None => NamespaceId::Unbound,
        };
        Ok(ResolvedName {
            name: qname.local.to_string(),
            ns,
        })
    }

    /// Opens the scope of a start tag: applies its namespace declarations,
    /// extracts `xml:lang` and resolves the element and attribute names.
    ///
    /// URIs of declared namespaces are added to `table`.
    pub fn enter(
        &mut self,
        name: &str,
        attributes: Vec<(String, String)>,
        table: &mut NamespaceTable,
    ) -> Result<ResolvedStart, Error> {
        self.push_scope();

        let mut lang = None;
        let mut regular = Vec::with_capacity(attributes.len());
        for (attr, value) in attributes {
            let qname = QName::new(&attr);
            if qname.prefix == Some("xmlns") && qname.local.is_empty() {
                return Err(NamespaceError::MalformedName(attr.clone()).into());
            }
            let declared = qname.as_namespace_binding().map(str::to_string);
            match declared.as_deref() {
                Some("") if value.is_empty() => self.declare("", Binding::Empty),
                Some("") => {
                    let index = table.try_intern(&value)?;
                    self.declare("", Binding::Namespace(index));
                }
                Some("xmlns") => return Err(NamespaceError::DeclaredXmlnsPrefix.into()),
                Some(prefix) if prefix.contains(':') => {
                    return Err(NamespaceError::MalformedName(attr.clone()).into())
                }
                Some(prefix) if value.is_empty() => {
                    return Err(NamespaceError::EmptyPrefixedUri(prefix.to_string()).into())
                }
                Some(prefix) => {
                    let index = table.try_intern(&value)?;
                    self.declare(prefix, Binding::Namespace(index));
                }
                None if attr == XML_LANG => lang = Some(value),
                None => regular.push((attr, value)),
            }
        }

        let name = self.resolve_name(name, true)?;
        let attributes = regular
            .into_iter()
            .map(|(attr, value)| {
                self.resolve_name(&attr, self.attributes_use_default)
                    .map(|name| (name, value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResolvedStart {
            name,
            lang,
            attributes,
        })
    }
}
