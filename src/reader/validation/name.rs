use std::iter::FusedIterator;
use std::str::Chars;

use super::ValidationError::*;
use super::{is_xml10_char, ValidationError};

/// Checks if the character corresponds to the [`NameStartChar`] production of
/// the XML specification (both 1.0 fifth edition and 1.1).
///
/// [`NameStartChar`]: https://www.w3.org/TR/xml/#NT-NameStartChar
#[inline]
pub fn is_name_start_char(ch: char) -> bool {
    matches!(ch, ':'
        | 'A'..='Z'
        | '_'
        | 'a'..='z'
        | '\u{00C0}'..='\u{00D6}'
        | '\u{00D8}'..='\u{00F6}'
        | '\u{00F8}'..='\u{02FF}'
        | '\u{0370}'..='\u{037D}'
        | '\u{037F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}'
    )
}

/// Checks if the character corresponds to the [`NameChar`] production of
/// the XML specification.
///
/// [`NameChar`]: https://www.w3.org/TR/xml/#NT-NameChar
#[inline]
pub fn is_name_char(ch: char) -> bool {
    is_name_start_char(ch)
        || matches!(ch, '-'
            | '.'
            | '0'..='9'
            | '\u{00B7}'
            | '\u{0300}'..='\u{036F}'
            | '\u{203F}'..='\u{2040}'
        )
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Reports the violations of the `Name` production. Stops after the first
/// invalid character.
#[derive(Clone, Debug)]
pub struct NameValidationIter<'i> {
    /// Iterator over characters of the name
    iter: Chars<'i>,
    /// If `true`, the first character already checked
    first: bool,
}

impl<'i> From<&'i str> for NameValidationIter<'i> {
    fn from(value: &'i str) -> Self {
        Self {
            iter: value.chars(),
            first: true,
        }
    }
}

impl<'i> Iterator for NameValidationIter<'i> {
    type Item = ValidationError;

    fn next(&mut self) -> Option<Self::Item> {
        if self.first {
            self.first = false;
            match self.iter.next() {
                Some(ch) if is_name_start_char(ch) => {}
                Some(ch) if !is_xml10_char(ch) => return Some(RestrictedChar(ch)),
                Some(_) => return Some(InvalidName),
                None => return Some(EmptyName),
            }
        }
        for ch in &mut self.iter {
            if !is_xml10_char(ch) {
                return Some(RestrictedChar(ch));
            }
            if !is_name_char(ch) {
                return Some(InvalidName);
            }
        }
        None
    }
}

impl<'i> FusedIterator for NameValidationIter<'i> {}

////////////////////////////////////////////////////////////////////////////////////////////////////
