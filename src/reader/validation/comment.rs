use std::iter::FusedIterator;
use std::str::Chars;

use super::ValidationError::*;
use super::{is_xml10_char, ValidationError};

/// Reports restricted characters and `--` sequences inside a comment.
#[derive(Clone, Debug)]
pub struct CommentValidationIter<'i> {
    /// Iterator over the content of the comment, i.e. the text between
    /// `<!--` and `-->`.
    iter: Chars<'i>,
    /// `true`, if last character being seen is a dash character (`-`).
    dash: bool,
}

impl<'i> Iterator for CommentValidationIter<'i> {
    type Item = ValidationError;

    fn next(&mut self) -> Option<Self::Item> {
        for ch in &mut self.iter {
            let dash = ch == '-';
            if self.dash && dash {
                // Does not consider the second dash as start of new sequence
                self.dash = false;
                return Some(DoubleHyphenInComment);
            }
            self.dash = dash;
            if !is_xml10_char(ch) {
                return Some(RestrictedChar(ch));
            }
        }
        None
    }
}

impl<'i> From<&'i str> for CommentValidationIter<'i> {
    fn from(value: &'i str) -> Self {
        Self {
            iter: value.chars(),
            dash: false,
        }
    }
}

impl<'i> FusedIterator for CommentValidationIter<'i> {}

/// Checks the content of a comment. When `double_hyphen` is `false`, only
/// restricted characters are reported.
pub fn check_comment(content: &str, double_hyphen: bool) -> Result<(), ValidationError> {
    let mut it = CommentValidationIter::from(content);
    // a comment cannot end with `-`: it would form `--->`
    let trailing = double_hyphen && content.ends_with('-');
    match it.find(|e| double_hyphen || *e != DoubleHyphenInComment) {
        Some(e) => Err(e),
        None if trailing => Err(DoubleHyphenInComment),
        None => Ok(()),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
