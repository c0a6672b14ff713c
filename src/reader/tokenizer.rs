//! A push tokenizer: bytes are appended with [`Tokenizer::push`] in chunks of
//! any size and complete events are pulled with [`Tokenizer::next_event`].
//!
//! Markup which is not complete yet stays in the internal buffer until the
//! following chunk completes it. Character data is reported as soon as it is
//! available, so long runs of text do not accumulate in the buffer.

use std::borrow::Cow;
use std::str::from_utf8;

use memchr::{memchr, memchr_iter, memmem};

use crate::errors::{Error, Position, Result, SyntaxError, SyntaxErrorKind};
use crate::escape::{unescape, unterminated_reference};
use crate::reader::event::{Event, StartTag};
use crate::reader::validation::{
    check_comment, check_name, check_pi, check_text, is_whitespace,
};

const BOM: &[u8] = b"\xEF\xBB\xBF";
const COMMENT_START: &[u8] = b"<!--";
const CDATA_START: &[u8] = b"<![CDATA[";
const DOCTYPE_START: &[u8] = b"<!DOCTYPE";

/// Where the tokenizer is relative to the root element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Root {
    /// Prolog: XML declaration, DOCTYPE, comments, PIs and spaces
    Before,
    Inside,
    /// Epilog: comments, PIs and spaces
    After,
}

/// Result of one attempt to read a token at the start of the buffer
enum Step {
    Event(Event),
    /// Markup without event was consumed
    Skipped,
    /// The token is not complete, wait for the next chunk
    NeedData,
}

/// How the start of the buffer relates to a fixed markup prefix
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Prefix {
    Full,
    /// The buffer is shorter than the prefix, but matches so far
    Partial,
    No,
}

fn match_prefix(input: &[u8], prefix: &[u8]) -> Prefix {
    if input.starts_with(prefix) {
        Prefix::Full
    } else if prefix.starts_with(input) {
        Prefix::Partial
    } else {
        Prefix::No
    }
}

/// Push tokenizer of an XML document.
///
/// ```
/// # use dav_xml::reader::{Event, StartTag, Tokenizer};
/// # use pretty_assertions::assert_eq;
/// let mut tokenizer = Tokenizer::new(false);
/// tokenizer.push(b"<a x='1'>he").unwrap();
///
/// let start = StartTag::new("a").with_attribute("x", "1");
/// assert_eq!(tokenizer.next_event().unwrap(), Some(Event::Start(start)));
/// assert_eq!(tokenizer.next_event().unwrap(), Some(Event::Text("he".into())));
/// assert_eq!(tokenizer.next_event().unwrap(), None);
///
/// tokenizer.push(b"llo</a").unwrap();
/// assert_eq!(tokenizer.next_event().unwrap(), Some(Event::Text("llo".into())));
/// assert_eq!(tokenizer.next_event().unwrap(), None);
///
/// tokenizer.push(b">").unwrap();
/// tokenizer.finish();
/// assert_eq!(tokenizer.next_event().unwrap(), Some(Event::End("a".into())));
/// assert_eq!(tokenizer.next_event().unwrap(), None);
/// ```
#[derive(Clone, Debug)]
pub struct Tokenizer {
    buf: Vec<u8>,
    /// Start of unconsumed input in `buf`
    pos: usize,
    /// Position of `buf[pos]` in the document
    position: Position,
    /// Bytes after `pos` already searched for the terminator of the current
    /// markup
    searched: usize,
    /// No more input will be pushed
    eof: bool,
    bom_checked: bool,
    /// Nothing but a byte order mark was consumed yet
    at_start: bool,
    root: Root,
    /// Names of the open elements, innermost last
    open: Vec<String>,
    /// End event synthesized for an empty element tag
    pending_end: Option<String>,
    check_comments: bool,
}

impl Tokenizer {
    /// Creates a tokenizer. If `check_comments` is set, comments containing
    /// `--` are rejected.
    pub fn new(check_comments: bool) -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
            position: Position {
                offset: 0,
                line: 1,
                column: 1,
            },
            searched: 0,
            eof: false,
            bom_checked: false,
            at_start: true,
            root: Root::Before,
            open: Vec::new(),
            pending_end: None,
            check_comments,
        }
    }

    /// Appends a chunk of input.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        self.compact();
        self.buf.try_reserve(chunk.len())?;
        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    /// Marks the end of input. Markup still incomplete after that is
    /// reported as an error by [`next_event`](Self::next_event).
    #[inline]
    pub fn finish(&mut self) {
        self.eof = true;
    }

    /// Position of the first byte not consumed yet.
    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Number of elements opened and not closed yet.
    #[inline]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Returns the next complete event, or `None` if more input is needed
    /// (or, after [`finish`](Self::finish), if the input is exhausted).
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        if let Some(name) = self.pending_end.take() {
            return Ok(Some(Event::End(name)));
        }
        loop {
            if !self.bom_checked && !self.skip_bom() {
                return Ok(None);
            }
            let step = match self.buf.get(self.pos) {
                None => return Ok(None),
                Some(b'<') => self.read_markup()?,
                Some(_) => self.read_text()?,
            };
            match step {
                Step::Event(event) => return Ok(Some(event)),
                Step::Skipped => continue,
                Step::NeedData => return Ok(None),
            }
        }
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////

    fn error(&self, kind: SyntaxErrorKind) -> Error {
        Error::Syntax(SyntaxError {
            kind,
            position: self.position,
        })
    }

    #[inline]
    fn rest(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Drops already consumed bytes from the buffer
    fn compact(&mut self) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
    }

    /// Marks `len` bytes as consumed and advances the position
    fn consume(&mut self, len: usize) {
        let consumed = &self.buf[self.pos..self.pos + len];
        let mut last_newline = None;
        let mut lines = 0;
        for i in memchr_iter(b'\n', consumed) {
            lines += 1;
            last_newline = Some(i);
        }
        match last_newline {
            Some(i) => {
                self.position.line += lines;
                self.position.column = (len - i) as u64;
            }
            None => self.position.column += len as u64,
        }
        self.position.offset += len as u64;
        self.pos += len;
        self.searched = 0;
        self.at_start = false;
    }

    /// Returns `false` if more input is needed to decide
    fn skip_bom(&mut self) -> bool {
        match match_prefix(self.rest(), BOM) {
            Prefix::Full => {
                self.consume(BOM.len());
                self.at_start = true;
            }
            Prefix::Partial if !self.eof => return false,
            _ => {}
        }
        self.bom_checked = true;
        true
    }

    /// Searches `pattern` in the current markup, skipping its first `from`
    /// bytes and the bytes already searched by the previous attempt. Returns
    /// the offset of the pattern from the start of the markup.
    fn find(&mut self, from: usize, pattern: &[u8]) -> Option<usize> {
        let rest = &self.buf[self.pos..];
        let start = from.max(self.searched.saturating_sub(pattern.len() - 1));
        match memmem::find(&rest[start..], pattern) {
            Some(i) => Some(start + i),
            None => {
                self.searched = rest.len();
                None
            }
        }
    }

    fn utf8<'a>(&self, bytes: &'a [u8]) -> Result<&'a str> {
        from_utf8(bytes).map_err(|_| self.error(SyntaxErrorKind::NonUtf8))
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////

    fn read_text(&mut self) -> Result<Step> {
        let rest = self.rest();
        let (len, complete) = match memchr(b'<', rest) {
            Some(i) => (i, true),
            None => (rest.len(), self.eof),
        };

        if self.root != Root::Inside {
            if rest[..len].iter().any(|b| !is_whitespace(*b)) {
                return Err(self.error(SyntaxErrorKind::TextOutsideRoot));
            }
            self.consume(len);
            return Ok(Step::Skipped);
        }

        let len = if complete {
            len
        } else {
            safe_text_len(&rest[..len])
        };
        if len == 0 {
            return Ok(Step::NeedData);
        }

        let text = {
            let raw = self.utf8(&rest[..len])?;
            check_text(raw).map_err(|e| self.error(e.into()))?;
            let normalized = normalize_line_ends(raw);
            unescape(&normalized)
                .map_err(|e| self.error(e.into()))?
                .into_owned()
        };

        self.consume(len);
        Ok(Step::Event(Event::Text(text)))
    }

    fn read_markup(&mut self) -> Result<Step> {
        match self.buf.get(self.pos + 1).copied() {
            None if self.eof => Err(self.error(SyntaxErrorKind::UnclosedTag)),
            None => Ok(Step::NeedData),
            Some(b'!') => self.read_bang(),
            Some(b'?') => self.read_pi(),
            Some(b'/') => self.read_end(),
            Some(_) => self.read_start(),
        }
    }

    /// Comment, CDATA section or DOCTYPE
    fn read_bang(&mut self) -> Result<Step> {
        let rest = self.rest();
        let kinds = [
            (COMMENT_START, SyntaxErrorKind::UnclosedComment),
            (CDATA_START, SyntaxErrorKind::UnclosedCData),
            (DOCTYPE_START, SyntaxErrorKind::UnclosedDoctype),
        ];
        let mut unclosed = None;
        for (prefix, kind) in kinds {
            match match_prefix(rest, prefix) {
                Prefix::Full => {
                    return match kind {
                        SyntaxErrorKind::UnclosedComment => self.read_comment(),
                        SyntaxErrorKind::UnclosedCData => self.read_cdata(),
                        _ => self.read_doctype(),
                    }
                }
                Prefix::Partial => {
                    unclosed.get_or_insert(kind);
                }
                Prefix::No => {}
            }
        }
        match unclosed {
            Some(_) if !self.eof => Ok(Step::NeedData),
            Some(kind) => Err(self.error(kind)),
            None => Err(self.error(SyntaxErrorKind::InvalidBangMarkup)),
        }
    }

    fn read_comment(&mut self) -> Result<Step> {
        match self.find(COMMENT_START.len(), b"-->") {
            Some(end) => {
                let content = &self.buf[self.pos + COMMENT_START.len()..self.pos + end];
                let content = self.utf8(content)?;
                check_comment(content, self.check_comments)
                    .map_err(|e| self.error(e.into()))?;
                self.consume(end + 3);
                Ok(Step::Skipped)
            }
            None if self.eof => Err(self.error(SyntaxErrorKind::UnclosedComment)),
            None => Ok(Step::NeedData),
        }
    }

    fn read_cdata(&mut self) -> Result<Step> {
        if self.root != Root::Inside {
            return Err(self.error(SyntaxErrorKind::TextOutsideRoot));
        }
        match self.find(CDATA_START.len(), b"]]>") {
            Some(end) => {
                let content = &self.buf[self.pos + CDATA_START.len()..self.pos + end];
                let content = self.utf8(content)?;
                check_text(content).map_err(|e| self.error(e.into()))?;
                let text = normalize_line_ends(content).into_owned();
                self.consume(end + 3);
                if text.is_empty() {
                    Ok(Step::Skipped)
                } else {
                    Ok(Step::Event(Event::Text(text)))
                }
            }
            None if self.eof => Err(self.error(SyntaxErrorKind::UnclosedCData)),
            None => Ok(Step::NeedData),
        }
    }

    fn read_doctype(&mut self) -> Result<Step> {
        if self.root != Root::Before {
            return Err(self.error(SyntaxErrorKind::InvalidBangMarkup));
        }
        match doctype_end(self.rest()) {
            Some(end) => {
                self.utf8(&self.rest()[..end])?;
                self.consume(end + 1);
                Ok(Step::Skipped)
            }
            None if self.eof => Err(self.error(SyntaxErrorKind::UnclosedDoctype)),
            None => Ok(Step::NeedData),
        }
    }

    /// Processing instruction or XML declaration
    fn read_pi(&mut self) -> Result<Step> {
        match self.find(2, b"?>") {
            Some(end) => {
                let content = self.utf8(&self.buf[self.pos + 2..self.pos + end])?;
                check_pi(content, self.at_start).map_err(|e| self.error(e.into()))?;
                self.consume(end + 2);
                Ok(Step::Skipped)
            }
            None if self.eof => Err(self.error(SyntaxErrorKind::UnclosedPIOrXmlDecl)),
            None => Ok(Step::NeedData),
        }
    }

    fn read_end(&mut self) -> Result<Step> {
        let end = match self.find(2, b">") {
            Some(end) => end,
            None if self.eof => return Err(self.error(SyntaxErrorKind::UnclosedTag)),
            None => return Ok(Step::NeedData),
        };
        let raw = self.utf8(&self.buf[self.pos + 2..self.pos + end])?;
        let name = raw.trim_end_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
        check_name(name).map_err(|e| self.error(e.into()))?;

        match self.open.last() {
            Some(open) if open == name => {}
            Some(open) => {
                return Err(self.error(SyntaxErrorKind::MismatchedEndTag {
                    expected: open.clone(),
                    found: name.to_string(),
                }))
            }
            None => return Err(self.error(SyntaxErrorKind::UnmatchedEndTag(name.to_string()))),
        }
        let name = name.to_string();
        self.open.pop();
        if self.open.is_empty() {
            self.root = Root::After;
        }
        self.consume(end + 1);
        Ok(Step::Event(Event::End(name)))
    }

    fn read_start(&mut self) -> Result<Step> {
        let end = match tag_end(self.rest()) {
            Some(end) => end,
            None if self.eof => return Err(self.error(SyntaxErrorKind::UnclosedTag)),
            None => return Ok(Step::NeedData),
        };
        let content = self.utf8(&self.buf[self.pos + 1..self.pos + end])?;
        let (content, empty) = match content.strip_suffix('/') {
            Some(content) => (content, true),
            None => (content, false),
        };
        let name_end = content
            .bytes()
            .position(is_whitespace)
            .unwrap_or(content.len());
        let name = &content[..name_end];
        check_name(name).map_err(|e| self.error(e.into()))?;
        if self.root == Root::After {
            return Err(self.error(SyntaxErrorKind::MultipleRoots(name.to_string())));
        }
        let attributes =
            parse_attributes(&content[name_end..]).map_err(|kind| self.error(kind))?;
        let name = name.to_string();

        self.consume(end + 1);
        self.root = Root::Inside;
        if empty {
            if self.open.is_empty() {
                self.root = Root::After;
            }
            self.pending_end = Some(name.clone());
        } else {
            self.open.push(name.clone());
        }
        Ok(Step::Event(Event::Start(StartTag {
            name,
            attributes,
            empty,
        })))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Length of the prefix of an incomplete run of character data which can be
/// reported now. Holds back an incomplete UTF-8 sequence, an entity reference
/// without `;` and a trailing `\r` which may start a `\r\n` pair.
fn safe_text_len(text: &[u8]) -> usize {
    let mut len = match from_utf8(text) {
        Ok(_) => text.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        // invalid sequence, reported when the text is decoded
        Err(_) => text.len(),
    };
    if let Some(amp) = unterminated_reference(&text[..len]) {
        len = amp;
    }
    if text[..len].ends_with(b"\r") {
        len -= 1;
    }
    len
}

/// Offset of the `>` closing a start tag, ignoring `>` inside quoted values
fn tag_end(input: &[u8]) -> Option<usize> {
    let mut quote = None;
    for (i, &b) in input.iter().enumerate().skip(1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => return Some(i),
                _ => {}
            },
        }
    }
    None
}

/// Offset of the `>` closing a document type declaration. Skips quoted
/// literals, and comments inside the internal subset.
fn doctype_end(input: &[u8]) -> Option<usize> {
    let mut quote = None;
    let mut subset = false;
    let mut i = DOCTYPE_START.len();
    while i < input.len() {
        let b = input[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'[' => subset = true,
                b']' => subset = false,
                b'<' if subset && input[i..].starts_with(COMMENT_START) => {
                    let end = memmem::find(&input[i + COMMENT_START.len()..], b"-->")?;
                    i += COMMENT_START.len() + end + 3;
                    continue;
                }
                b'>' if !subset => return Some(i),
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Parses the attributes part of a start tag, i.e. everything after the
/// element name
fn parse_attributes(input: &str) -> std::result::Result<Vec<(String, String)>, SyntaxErrorKind> {
    let bytes = input.as_bytes();
    let skip_spaces = |mut i: usize| {
        while i < bytes.len() && is_whitespace(bytes[i]) {
            i += 1;
        }
        i
    };

    let mut attributes = Vec::new();
    let mut i = 0;
    loop {
        let start = i;
        i = skip_spaces(i);
        if i == bytes.len() {
            return Ok(attributes);
        }
        let name_start = i;
        while i < bytes.len() && !is_whitespace(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        let name = &input[name_start..i];
        if start == name_start {
            return Err(SyntaxErrorKind::MalformedAttribute(format!(
                "no whitespace before attribute `{}`",
                name
            )));
        }
        check_name(name)?;

        i = skip_spaces(i);
        if bytes.get(i) != Some(&b'=') {
            return Err(SyntaxErrorKind::MalformedAttribute(format!(
                "attribute `{}` has no value",
                name
            )));
        }
        i = skip_spaces(i + 1);
        let quote = match bytes.get(i) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => {
                return Err(SyntaxErrorKind::MalformedAttribute(format!(
                    "value of attribute `{}` is not quoted",
                    name
                )))
            }
        };
        let value_start = i + 1;
        let value_end = match memchr(quote, &bytes[value_start..]) {
            Some(len) => value_start + len,
            None => {
                return Err(SyntaxErrorKind::MalformedAttribute(format!(
                    "value of attribute `{}` is not closed",
                    name
                )))
            }
        };
        let raw = &input[value_start..value_end];
        if raw.contains('<') {
            return Err(SyntaxErrorKind::MalformedAttribute(format!(
                "value of attribute `{}` contains `<`",
                name
            )));
        }
        check_text(raw)?;
        let value = unescape(&normalize_attribute_value(raw))?.into_owned();
        attributes.push((name.to_string(), value));
        i = value_end + 1;
    }
}

/// Replaces `\r\n` and lone `\r` with `\n`
fn normalize_line_ends(text: &str) -> Cow<str> {
    let bytes = text.as_bytes();
    if memchr(b'\r', bytes).is_none() {
        return Cow::Borrowed(text);
    }
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for i in memchr_iter(b'\r', bytes) {
        result.push_str(&text[last..i]);
        result.push('\n');
        last = if bytes.get(i + 1) == Some(&b'\n') { i + 2 } else { i + 1 };
    }
    result.push_str(&text[last..]);
    Cow::Owned(result)
}

/// Replaces every whitespace character (and `\r\n` pair) with a single space
fn normalize_attribute_value(value: &str) -> Cow<str> {
    match normalize_line_ends(value) {
        Cow::Borrowed(v) if !v.contains(['\t', '\n']) => Cow::Borrowed(v),
        v => Cow::Owned(v.replace(['\t', '\n'], " ")),
    }
}
