//! Contains the incremental [`Parser`] which builds a [`Document`] from
//! chunks of bytes, and the [`Tokenizer`] it is based on.

use std::io::{ErrorKind, Read};

use tracing::{debug, trace};

use crate::errors::{Error, Result};
use crate::tree::Document;

#[cfg(feature = "async-tokio")]
mod async_reader;
mod builder;
mod event;
mod resolver;
mod tokenizer;
pub mod validation;

#[cfg(feature = "async-tokio")]
pub use async_reader::parse_from_async_source;
pub use event::{Event, StartTag};
pub use tokenizer::Tokenizer;

use builder::TreeBuilder;

/// Message reported by [`Parser::error_message`] when no error occurred.
pub const NO_ERROR: &str = "No error.";

/// A struct that holds a parser configuration.
///
/// The configuration is read when the first chunk is fed, so changes made
/// through [`Parser::config_mut`] after that have no effect.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// Whether comments should be validated. If enabled, an error is
    /// returned when a comment contains `--`.
    ///
    /// Default: `false`
    pub check_comments: bool,

    /// Whether attribute names without prefix take the default namespace.
    ///
    /// XML Namespaces says they never do, so the default namespace applies
    /// to element names only. Some producers of WebDAV bodies expect
    /// otherwise.
    ///
    /// Default: `false`
    pub default_namespace_for_attributes: bool,

    /// Maximum number of nodes (elements, attributes and text fragments)
    /// that the document may contain. Exceeding it is an allocation failure.
    ///
    /// Default: `None`, i.e. unlimited
    pub node_limit: Option<usize>,

    /// Maximum nesting depth of elements; the root element is at depth 1.
    /// Exceeding it is an allocation failure.
    ///
    /// Default: `None`, i.e. unlimited
    pub max_depth: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_comments: false,
            default_namespace_for_attributes: false,
            node_limit: None,
            max_depth: None,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// State of a parse in progress
#[derive(Clone, Debug)]
struct Session {
    tokenizer: Tokenizer,
    builder: TreeBuilder,
}

impl Session {
    fn new(config: &Config) -> Self {
        Self {
            tokenizer: Tokenizer::new(config.check_comments),
            builder: TreeBuilder::new(config),
        }
    }

    fn drain(&mut self) -> Result<()> {
        while let Some(event) = self.tokenizer.next_event()? {
            self.builder.feed(event)?;
        }
        Ok(())
    }

    fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.tokenizer.push(chunk)?;
        self.drain()
    }

    fn finish(&mut self) -> Result<Document> {
        self.tokenizer.finish();
        self.drain()?;
        self.builder.finish()
    }
}

#[derive(Clone, Debug)]
enum State {
    /// Nothing was fed yet
    Idle,
    Feeding(Box<Session>),
    /// The document was produced
    Finished,
    /// The parse failed, the error is reported again by every call
    Failed(Error),
}

/// An incremental XML parser which builds a [`Document`].
///
/// Input is given in chunks of any size with [`feed`](Self::feed); chunk
/// boundaries may fall anywhere, including inside a tag, a reference or a
/// multi-byte character. [`done`](Self::done) ends the input and returns
/// the document.
///
/// The first error stops the parser: every following call reports it again.
///
/// # Example
///
/// ```
/// # use dav_xml::reader::Parser;
/// # use dav_xml::name::NamespaceId;
/// # use pretty_assertions::assert_eq;
/// let mut parser = Parser::new();
/// parser.feed(br#"<D:propfind xmlns:D="DAV:"><D:al"#).unwrap();
/// parser.feed(br#"lprop/></D:propfind>"#).unwrap();
/// let doc = parser.done().unwrap();
///
/// let root = doc.root();
/// assert_eq!(root.name(), "propfind");
/// assert_eq!(root.namespace(), NamespaceId::DAV);
/// assert_eq!(root.first_child().unwrap().name(), "allprop");
///
/// // the parser is single-use
/// assert!(parser.done().is_err());
/// ```
#[derive(Clone, Debug)]
pub struct Parser {
    config: Config,
    state: State,
}

impl Parser {
    /// Creates a parser with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a parser with the given configuration.
    pub fn with_config(config: Config) -> Self {
        debug!(?config, "parser created");
        Self {
            config,
            state: State::Idle,
        }
    }

    /// Returns a shared reference to the parser configuration.
    #[inline]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the parser configuration, which is
    /// taken into account only until the first chunk is fed.
    #[inline]
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Returns the state of the parse, starting it if needed.
    fn session(&mut self) -> Result<&mut Session> {
        match self.state {
            State::Idle => {
                debug!("parse started");
                self.state = State::Feeding(Box::new(Session::new(&self.config)));
            }
            State::Feeding(_) => {}
            State::Finished => return Err(Error::NotActive),
            State::Failed(ref error) => return Err(error.clone()),
        }
        match &mut self.state {
            State::Feeding(session) => Ok(&mut **session),
            _ => Err(Error::NotActive),
        }
    }

    /// Remembers the error of the last operation
    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(ref error) = result {
            debug!(%error, "parse failed");
            self.state = State::Failed(error.clone());
        }
        result
    }

    /// Feeds the next chunk of the document. Complete events in the input
    /// are processed before returning, so errors are reported as soon as
    /// they can be detected.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        trace!(len = chunk.len(), "feed");
        let result = self.session()?.feed(chunk);
        self.record(result)
    }

    /// Ends the input and returns the document.
    ///
    /// Fails if the input ends inside markup, if elements are not closed or
    /// if there is no root element. Once a document was returned, the parser
    /// is not active anymore and any further call fails with
    /// [`Error::NotActive`].
    pub fn done(&mut self) -> Result<Document> {
        let result = self.session()?.finish();
        let result = self.record(result);
        if result.is_ok() {
            debug!("parse finished");
            self.state = State::Finished;
        }
        result
    }

    /// Feeds the whole content of `source`, read in chunks of `chunk_size`
    /// bytes. [`done`](Self::done) must still be called.
    pub fn feed_from<R: Read>(&mut self, mut source: R, chunk_size: usize) -> Result<()> {
        let mut buf = vec![0; chunk_size.max(1)];
        loop {
            let len = match source.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(len) => len,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return self.record(Err(e.into())),
            };
            self.feed(&buf[..len])?;
        }
    }

    /// The error which stopped the parser, if any.
    pub fn last_error(&self) -> Option<&Error> {
        match &self.state {
            State::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Writes the message of the error which stopped the parser into
    /// `buffer` and returns it as a string. `"No error."` is written if the
    /// parser has not failed.
    ///
    /// A message longer than the buffer is truncated at a character
    /// boundary.
    ///
    /// ```
    /// # use dav_xml::reader::Parser;
    /// # use pretty_assertions::assert_eq;
    /// let mut parser = Parser::new();
    /// let mut buffer = [0u8; 64];
    /// assert_eq!(parser.error_message(&mut buffer), "No error.");
    ///
    /// parser.feed(b"<a:b/>").unwrap_err();
    /// assert_eq!(parser.error_message(&mut buffer), "an undefined namespace prefix `a` was used");
    ///
    /// let mut small = [0u8; 12];
    /// assert_eq!(parser.error_message(&mut small), "an undefined");
    /// ```
    pub fn error_message<'b>(&self, buffer: &'b mut [u8]) -> &'b str {
        let message = match &self.state {
            State::Failed(error) => error.to_string(),
            _ => NO_ERROR.to_string(),
        };
        let mut len = message.len().min(buffer.len());
        while !message.is_char_boundary(len) {
            len -= 1;
        }
        buffer[..len].copy_from_slice(&message.as_bytes()[..len]);
        std::str::from_utf8(&buffer[..len]).unwrap_or_default()
    }
}

impl Default for Parser {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Reads `source` to the end in chunks of `chunk_size` bytes and parses it.
///
/// ```
/// # use dav_xml::reader::parse_from_source;
/// let doc = parse_from_source(&b"<a><b/>text</a>"[..], 3).unwrap();
/// assert_eq!(doc.root().first_child().unwrap().following_cdata(), "text");
/// ```
pub fn parse_from_source<R: Read>(source: R, chunk_size: usize) -> Result<Document> {
    let mut parser = Parser::new();
    parser.feed_from(source, chunk_size)?;
    parser.done()
}

/// Parses a complete document given as a string.
pub fn parse_str(xml: &str) -> Result<Document> {
    parse_bytes(xml.as_bytes())
}

/// Parses a complete document given as bytes.
pub fn parse_bytes(xml: &[u8]) -> Result<Document> {
    let mut parser = Parser::new();
    parser.feed(xml)?;
    parser.done()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{IncompleteError, SyntaxErrorKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn errors_are_sticky() {
        let mut parser = Parser::new();
        let error = parser.feed(b"<a></b>").unwrap_err();
        assert!(matches!(
            &error,
            Error::Syntax(e) if matches!(e.kind, SyntaxErrorKind::MismatchedEndTag { .. })
        ));
        assert_eq!(
            parser.feed(b"<a/>").unwrap_err().to_string(),
            error.to_string()
        );
        assert_eq!(parser.done().unwrap_err().to_string(), error.to_string());
        assert!(parser.last_error().is_some());
    }

    #[test]
    fn not_active_after_done() {
        let mut parser = Parser::new();
        parser.feed(b"<a/>").unwrap();
        parser.done().unwrap();
        assert!(matches!(parser.feed(b" "), Err(Error::NotActive)));
        assert!(matches!(parser.done(), Err(Error::NotActive)));
        let mut buffer = [0u8; 32];
        assert_eq!(parser.error_message(&mut buffer), NO_ERROR);
    }

    #[test]
    fn empty_input() {
        assert!(matches!(
            Parser::new().done(),
            Err(Error::Incomplete(IncompleteError::MissingRoot))
        ));
        assert!(matches!(
            parse_str("  <!-- only a comment -->  "),
            Err(Error::Incomplete(IncompleteError::MissingRoot))
        ));
    }

    #[test]
    fn truncated_message() {
        let mut parser = Parser::new();
        parser.feed("<ŝ></ĉ>".as_bytes()).unwrap_err();
        let mut buffer = [0u8; 1];
        assert_eq!(parser.error_message(&mut buffer), "s");
        let mut buffer = [0u8; 0];
        assert_eq!(parser.error_message(&mut buffer), "");
    }

    #[test]
    fn config_applies_on_first_feed() {
        let mut parser = Parser::new();
        parser.config_mut().check_comments = true;
        assert!(parser.feed(b"<a><!-- -- --></a>").is_err());

        let mut parser = Parser::new();
        parser.feed(b"<a>").unwrap();
        parser.config_mut().check_comments = true;
        parser.feed(b"<!-- -- --></a>").unwrap();
        parser.done().unwrap();
    }

    #[test]
    fn chunked_source() {
        let xml = "<a xmlns='urn:x'>one<b>two</b>three</a>";
        for chunk in 1..xml.len() + 1 {
            let doc = parse_from_source(xml.as_bytes(), chunk).unwrap();
            let root = doc.root();
            assert_eq!(root.first_cdata(), "one", "chunk {}", chunk);
            let b = root.first_child().unwrap();
            assert_eq!(b.first_cdata(), "two", "chunk {}", chunk);
            assert_eq!(b.following_cdata(), "three", "chunk {}", chunk);
        }
    }
}
