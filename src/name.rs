//! Module for handling names according to the W3C [Namespaces in XML 1.1 (Second Edition)][spec]
//! specification: qualified names, namespace identifiers and the table of
//! namespace URIs seen by a parser.
//!
//! [spec]: https://www.w3.org/TR/xml-names11

use std::collections::HashMap;
use std::fmt;

use crate::errors::{AllocationError, InternalConsistencyError};

/// The namespace URI always stored at index 0 of a [`NamespaceTable`].
pub const DAV_NAMESPACE: &str = "DAV:";

/// Raw namespace id of [`DAV_NAMESPACE`].
pub const DAV_ID: i32 = 0;
/// Raw namespace id of names without namespace.
pub const NO_NAMESPACE: i32 = -10;
/// Raw namespace ids less than or equal to this value are error sentinels
/// which never appear on a finished tree.
pub const ERROR_BASE: i32 = -100;

/// Resolved namespace of an element or attribute name.
///
/// Converted to and from the integer representation used by existing callers
/// with [`to_raw`](Self::to_raw) and [`from_raw`](Self::from_raw).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-types", derive(serde::Deserialize, serde::Serialize))]
pub enum NamespaceId {
    /// The name is bound to the namespace with this index in the
    /// [`NamespaceTable`].
    Bound(usize),
    /// The name has no namespace: either it has no prefix and no default
    /// namespace is in scope, or the default namespace was reset with
    /// `xmlns=""`.
    Unbound,
    /// The prefix of the name starts with `xml` (in any case). Such prefixes
    /// are reserved, so the name is kept unresolved with its prefix.
    Literal,
}

impl NamespaceId {
    /// Identifier of the `DAV:` namespace.
    pub const DAV: NamespaceId = NamespaceId::Bound(0);

    /// Returns the raw integer form: the table index, or [`NO_NAMESPACE`]
    /// for both [`Unbound`](Self::Unbound) and [`Literal`](Self::Literal).
    ///
    /// Fails if the index does not fit an `i32`.
    pub fn to_raw(self) -> Result<i32, InternalConsistencyError> {
        match self {
            Self::Bound(index) => {
                i32::try_from(index).map_err(|_| InternalConsistencyError::IndexTooLarge(index))
            }
            Self::Unbound | Self::Literal => Ok(NO_NAMESPACE),
        }
    }

    /// Parses the raw integer form.
    ///
    /// [`NO_NAMESPACE`] maps to [`Unbound`](Self::Unbound) because the
    /// distinction with [`Literal`](Self::Literal) is not representable.
    /// Values in the error range, or any other negative value, are rejected.
    pub fn from_raw(raw: i32) -> Result<Self, InternalConsistencyError> {
        match raw {
            i if i >= 0 => Ok(Self::Bound(i as usize)),
            NO_NAMESPACE => Ok(Self::Unbound),
            i if i <= ERROR_BASE => Err(InternalConsistencyError::ErrorSentinel(i)),
            i => Err(InternalConsistencyError::InvalidRaw(i)),
        }
    }

    /// Returns the table index if the name is bound to a namespace.
    #[inline]
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Bound(index) => Some(index),
            _ => None,
        }
    }

    /// `true` for the `DAV:` namespace, which never needs a table lookup.
    #[inline]
    pub fn is_dav(self) -> bool {
        self == Self::DAV
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bound(index) => write!(f, "ns#{}", index),
            Self::Unbound => f.write_str("no namespace"),
            Self::Literal => f.write_str("reserved prefix"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Append-only registry of namespace URIs.
///
/// The index of a URI is the position of its first insertion and never
/// changes. Index 0 is always [`DAV_NAMESPACE`], so `DAV:` names can be
/// recognized without a lookup.
///
/// With the `serde-types` feature the table is serialized as the list of its
/// URIs, and the lookup map is rebuilt when it is deserialized.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-types", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(
    feature = "serde-types",
    serde(from = "Vec<String>", into = "Vec<String>")
)]
pub struct NamespaceTable {
    uris: Vec<String>,
    index: HashMap<String, usize>,
}

impl NamespaceTable {
    /// Creates a table which contains only [`DAV_NAMESPACE`].
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert(DAV_NAMESPACE.to_string(), 0);
        Self {
            uris: vec![DAV_NAMESPACE.to_string()],
            index,
        }
    }

    /// Returns the index of `uri`, inserting it at the end of the table if it
    /// was never seen. URIs are compared as exact strings.
    ///
    /// ```
    /// # use dav_xml::name::NamespaceTable;
    /// # use pretty_assertions::assert_eq;
    /// let mut table = NamespaceTable::new();
    /// assert_eq!(table.intern("DAV:"), 0);
    /// assert_eq!(table.intern("urn:a"), 1);
    /// assert_eq!(table.intern("urn:b"), 2);
    /// assert_eq!(table.intern("urn:a"), 1);
    /// ```
    pub fn intern(&mut self, uri: &str) -> usize {
        match self.try_intern(uri) {
            Ok(index) => index,
            Err(_) => std::alloc::handle_alloc_error(std::alloc::Layout::new::<String>()),
        }
    }

    /// Fallible version of [`intern`](Self::intern) which reports memory
    /// exhaustion instead of aborting.
    pub fn try_intern(&mut self, uri: &str) -> Result<usize, AllocationError> {
        if let Some(&index) = self.index.get(uri) {
            return Ok(index);
        }
        self.uris.try_reserve(1)?;
        self.index.try_reserve(1)?;
        let index = self.uris.len();
        self.uris.push(uri.to_string());
        self.index.insert(uri.to_string(), index);
        Ok(index)
    }

    /// Returns the index of `uri` without inserting it.
    pub fn lookup(&self, uri: &str) -> Option<usize> {
        self.index.get(uri).copied()
    }

    /// Returns the URI stored at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.uris.get(index).map(String::as_str)
    }

    /// Returns the URI of a resolved namespace id, `None` for names without
    /// namespace or for an index outside of the table.
    pub fn uri(&self, id: NamespaceId) -> Option<&str> {
        id.index().and_then(|index| self.get(index))
    }

    /// Number of URIs in the table, [`DAV_NAMESPACE`] included.
    #[inline]
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Always `false`: the table contains at least [`DAV_NAMESPACE`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// Iterates over `(index, uri)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.uris.iter().map(String::as_str).enumerate()
    }
}

impl Default for NamespaceTable {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<String>> for NamespaceTable {
    /// Interns the URIs in order. [`DAV_NAMESPACE`] keeps index 0 and
    /// duplicates are merged, so the indexes of a list produced by a table
    /// are preserved.
    fn from(uris: Vec<String>) -> Self {
        let mut table = Self::new();
        for uri in uris {
            table.intern(&uri);
        }
        table
    }
}

impl From<NamespaceTable> for Vec<String> {
    #[inline]
    fn from(table: NamespaceTable) -> Self {
        table.uris
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [qualified name] split at its first colon.
///
/// [qualified name]: https://www.w3.org/TR/xml-names11/#dt-qualname
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QName<'a> {
    /// The whole name, as written in the document
    pub raw: &'a str,
    /// The part before the first colon, if there is a colon
    pub prefix: Option<&'a str>,
    /// The part after the first colon, or the whole name
    pub local: &'a str,
}

impl<'a> QName<'a> {
    /// Splits `raw` at its first colon.
    pub fn new(raw: &'a str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => Self {
                raw,
                prefix: Some(prefix),
                local,
            },
            None => Self {
                raw,
                prefix: None,
                local: raw,
            },
        }
    }

    /// `true` if the prefix is reserved: it starts with the three letters
    /// `xml` in any combination of case.
    ///
    /// ```
    /// # use dav_xml::name::QName;
    /// assert!(QName::new("xml:lang").has_reserved_prefix());
    /// assert!(QName::new("XmL-custom:a").has_reserved_prefix());
    /// assert!(!QName::new("xmlfoo").has_reserved_prefix());
    /// assert!(!QName::new("d:xml").has_reserved_prefix());
    /// ```
    pub fn has_reserved_prefix(&self) -> bool {
        self.prefix.map_or(false, is_reserved_prefix)
    }

    /// If the name is a namespace declaration, returns the declared prefix:
    /// the empty string for `xmlns` (default namespace) and `p` for `xmlns:p`.
    pub fn as_namespace_binding(&self) -> Option<&'a str> {
        match self.prefix {
            None if self.raw == "xmlns" => Some(""),
            Some("xmlns") => Some(self.local),
            _ => None,
        }
    }
}

/// `true` if `prefix` starts with `xml` in any combination of case.
#[inline]
pub fn is_reserved_prefix(prefix: &str) -> bool {
    prefix
        .as_bytes()
        .get(..3)
        .map_or(false, |start| start.eq_ignore_ascii_case(b"xml"))
}
