//! Error management module

use std::collections::TryReserveError;
use std::fmt;
use std::io::Error as IoError;
use std::sync::Arc;

use crate::escape::EscapeError;
use crate::reader::validation::ValidationError;

/// Position in the input stream where an error was detected.
///
/// `offset` counts bytes from the beginning of the first chunk fed to the
/// parser. `line` and `column` are 1-based, and `column` counts bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    /// Byte offset from the start of the document
    pub offset: u64,
    /// Line number, starting from 1
    pub line: u64,
    /// Column (in bytes) within the line, starting from 1
    pub column: u64,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "line {}, column {} (offset {})",
            self.line, self.column, self.offset
        )
    }
}

/// The kind of structural malformation found by the tokenizer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxErrorKind {
    /// The input ended inside `<...>` markup of a start or end tag.
    #[error("start or end tag not closed: `>` not found before end of input")]
    UnclosedTag,
    /// The input ended inside a comment.
    #[error("comment not closed: `-->` not found before end of input")]
    UnclosedComment,
    /// The input ended inside a CDATA section.
    #[error("CDATA not closed: `]]>` not found before end of input")]
    UnclosedCData,
    /// The input ended inside a processing instruction or XML declaration.
    #[error("processing instruction or xml declaration not closed: `?>` not found before end of input")]
    UnclosedPIOrXmlDecl,
    /// The input ended inside the document type declaration.
    #[error("DOCTYPE not closed: `>` not found before end of input")]
    UnclosedDoctype,
    /// Markup starting with `<!` which is neither a comment, a CDATA section
    /// nor a document type declaration.
    #[error("unknown or missed symbol in markup")]
    InvalidBangMarkup,
    /// An attribute in a start tag is not in the `name="value"` form.
    #[error("malformed attribute: {0}")]
    MalformedAttribute(String),
    /// The end tag does not match the innermost open start tag.
    #[error("expected `</{expected}>`, but `</{found}>` was found")]
    MismatchedEndTag {
        /// Name of the innermost open element
        expected: String,
        /// Name found in the end tag
        found: String,
    },
    /// An end tag was found while no element was open.
    #[error("close tag `</{0}>` does not match any open tag")]
    UnmatchedEndTag(String),
    /// A second top-level element was found.
    #[error("multiple root elements: `<{0}>` found after the root element was closed")]
    MultipleRoots(String),
    /// Non-whitespace character data outside of the root element.
    #[error("character data is not allowed outside of the root element")]
    TextOutsideRoot,
    /// A name, a comment, a processing instruction or character data violates
    /// an XML well-formedness constraint.
    #[error("{0}")]
    Invalid(#[from] ValidationError),
    /// An entity or character reference could not be decoded.
    #[error("{0}")]
    Escape(#[from] EscapeError),
    /// The input is not valid UTF-8.
    #[error("input is not valid UTF-8")]
    NonUtf8,
}

/// A structural malformation reported by the tokenizer together with the
/// position where it was detected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("syntax error at {position}: {kind}")]
pub struct SyntaxError {
    /// What went wrong
    pub kind: SyntaxErrorKind,
    /// Where it went wrong
    pub position: Position,
}

/// Namespace-related errors raised while resolving qualified names and
/// namespace declarations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    /// A prefix was used that is not declared in any enclosing scope.
    #[error("an undefined namespace prefix `{0}` was used")]
    UnknownPrefix(String),
    /// `xmlns:prefix=""`: namespace prefixes cannot be bound to an empty URI.
    #[error("namespace prefix `{0}` was defined with an empty URI")]
    EmptyPrefixedUri(String),
    /// The `xmlns` prefix cannot be declared.
    #[error("the `xmlns` prefix cannot be declared")]
    DeclaredXmlnsPrefix,
    /// A qualified name with an empty prefix or an empty local part.
    #[error("malformed qualified name `{0}`")]
    MalformedName(String),
}

/// The document ended before it was complete.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IncompleteError {
    /// No root element was found at all.
    #[error("missing root element")]
    MissingRoot,
    /// Elements were opened but never closed. Names are listed outermost first.
    #[error("unclosed elements: {}", .0.join(", "))]
    UnclosedElements(Vec<String>),
}

/// Node storage could not grow.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// The configured node budget was exhausted.
    #[error("node limit of {0} exceeded")]
    NodeLimit(usize),
    /// The configured nesting depth was exceeded.
    #[error("maximum element depth of {0} exceeded")]
    DepthLimit(usize),
    /// The allocator refused to reserve memory.
    #[error("memory reservation failed: {0}")]
    OutOfMemory(#[from] TryReserveError),
}

/// A tree given to the serializer refers to a namespace that cannot exist.
///
/// This signals a defect of whoever built the tree (or a namespace table that
/// does not belong to the tree), never a problem of the parsed input.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InternalConsistencyError {
    /// A raw namespace id in the error range (`<= -100`).
    #[error("namespace id {0} is in the internal error range")]
    ErrorSentinel(i32),
    /// A raw namespace id which is neither an index nor a known sentinel.
    #[error("namespace id {0} is not a valid identifier")]
    InvalidRaw(i32),
    /// A namespace index too large for the raw integer form.
    #[error("namespace index {0} does not fit the raw representation")]
    IndexTooLarge(usize),
    /// An index outside of the namespace table.
    #[error("namespace index {index} is out of the table of {len} namespaces")]
    OutOfTable {
        /// The offending index
        index: usize,
        /// Length of the namespace table
        len: usize,
    },
}

/// The error type used by this crate.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// Reading from the byte source failed.
    #[error("I/O error: {0}")]
    Io(Arc<IoError>),
    /// The input is not well-formed XML.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// The input is well-formed XML but violates XML Namespaces.
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    /// The input ended before the document was complete.
    #[error("incomplete document: {0}")]
    Incomplete(#[from] IncompleteError),
    /// Node storage exhausted.
    #[error("allocation failure: {0}")]
    Allocation(#[from] AllocationError),
    /// The parser already produced its document.
    #[error("The parser is not active.")]
    NotActive,
    /// A tree refers to a namespace that cannot exist.
    #[error("internal consistency error: {0}")]
    InternalConsistency(#[from] InternalConsistencyError),
}

impl From<IoError> for Error {
    /// Creates a new `Error::Io` from the given error
    #[inline]
    fn from(error: IoError) -> Error {
        Self::Io(Arc::new(error))
    }
}

impl From<TryReserveError> for Error {
    #[inline]
    fn from(error: TryReserveError) -> Error {
        Self::Allocation(error.into())
    }
}

/// A specialized `Result` type where the error is hard-wired to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
