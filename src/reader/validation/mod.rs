//! Well-formedness checks applied by the tokenizer to names, character data,
//! comments and processing instructions.
//!
//! Each kind of content has an iterator over the violations it contains, so
//! a caller can either stop at the first one or collect all of them.

use std::fmt;
use std::str::Chars;

/// An error returned if a [well-formedness constraint][WFC] is violated.
///
/// [WFC]: https://www.w3.org/TR/xml/#dt-wfc
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Input contains character which is not allowed in XML.
    RestrictedChar(char),
    /// The name of an element, an attribute or the target of a processing
    /// instruction is empty.
    EmptyName,
    /// The name of an element, an attribute or the target of a processing
    /// instruction contains characters that are not allowed in names.
    InvalidName,
    /// A comment contains forbidden double-hyphen (`--`) sequence inside.
    ///
    /// According to the [specification], for compatibility, comments MUST NOT contain
    /// double-hyphen (`--`) sequence, in particular, they cannot end by `--->`.
    ///
    /// [specification]: https://www.w3.org/TR/xml/#sec-comments
    DoubleHyphenInComment,
    /// The target of a processing instruction is `xml` in some combination of
    /// case, which is reserved, and the instruction is not the XML declaration
    /// at the start of the document.
    ReservedPITarget,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::EmptyName => f.write_str("empty name"),
            Self::InvalidName => f.write_str("invalid character in name"),
            Self::RestrictedChar(ch) => write!(
                f,
                "character `{}` (0x{:x}) are not allowed in XML",
                ch.escape_debug(),
                *ch as u32
            ),
            Self::DoubleHyphenInComment => {
                f.write_str("forbidden string `--` was found in a comment")
            }
            Self::ReservedPITarget => f.write_str(
                "processing instruction target `xml` is reserved for the XML declaration",
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

////////////////////////////////////////////////////////////////////////////////////////////////////

mod comment;
mod name;
mod pi;
mod text;

pub use comment::*;
pub use name::*;
pub use pi::*;
pub use text::*;

/// Checks if the character corresponds to the [`Char`] production of
/// the XML 1.0 specification.
///
/// Any Unicode character, excluding the surrogate blocks, FFFE, and FFFF.
///
/// [`Char`]: https://www.w3.org/TR/xml/#NT-Char
pub fn is_xml10_char(ch: char) -> bool {
    matches!(ch,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{0020}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Checks if the byte is one of the four [whitespace] characters of XML.
///
/// [whitespace]: https://www.w3.org/TR/xml/#NT-S
#[inline]
pub const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\r' | b'\n' | b'\t')
}

fn valid_chars(iter: &mut Chars) -> Option<ValidationError> {
    for ch in iter {
        if !is_xml10_char(ch) {
            return Some(ValidationError::RestrictedChar(ch));
        }
    }
    None
}

/// Returns the first violation of the [`Name`] production in `name`.
///
/// [`Name`]: https://www.w3.org/TR/xml/#NT-Name
#[inline]
pub fn check_name(name: &str) -> Result<(), ValidationError> {
    NameValidationIter::from(name).next().map_or(Ok(()), Err)
}

/// Returns the first character of `text` which is not allowed in XML.
#[inline]
pub fn check_text(text: &str) -> Result<(), ValidationError> {
    TextValidationIter::from(text).next().map_or(Ok(()), Err)
}
