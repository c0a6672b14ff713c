use std::iter::FusedIterator;
use std::str::Chars;

use super::{valid_chars, ValidationError};

/// Reports characters of character data or of an attribute value which are
/// not allowed in XML. References are checked when they are decoded.
#[derive(Clone, Debug)]
pub struct TextValidationIter<'i> {
    /// Iterator over characters of the text
    iter: Chars<'i>,
}

impl<'i> From<&'i str> for TextValidationIter<'i> {
    fn from(value: &'i str) -> Self {
        Self {
            iter: value.chars(),
        }
    }
}

impl<'i> Iterator for TextValidationIter<'i> {
    type Item = ValidationError;

    fn next(&mut self) -> Option<Self::Item> {
        valid_chars(&mut self.iter)
    }
}

impl<'i> FusedIterator for TextValidationIter<'i> {}

////////////////////////////////////////////////////////////////////////////////////////////////////
