use std::iter::FusedIterator;
use std::str::Chars;

use super::{is_whitespace, valid_chars, NameValidationIter, ValidationError};

/// Reports characters of a processing instruction which are not allowed in
/// XML.
#[derive(Clone, Debug)]
pub struct PIValidationIter<'i> {
    /// Iterator over characters between `<?` and `?>`.
    iter: Chars<'i>,
}

impl<'i> Iterator for PIValidationIter<'i> {
    type Item = ValidationError;

    fn next(&mut self) -> Option<Self::Item> {
        valid_chars(&mut self.iter)
    }
}

impl<'i> From<&'i str> for PIValidationIter<'i> {
    fn from(value: &'i str) -> Self {
        Self {
            iter: value.chars(),
        }
    }
}

impl<'i> FusedIterator for PIValidationIter<'i> {}

/// Splits the content of a processing instruction (the text between `<?` and
/// `?>`) into its target and the rest.
pub fn pi_target(content: &str) -> &str {
    let end = content
        .bytes()
        .position(is_whitespace)
        .unwrap_or(content.len());
    &content[..end]
}

/// Checks a processing instruction. The target `xml` is reserved unless
/// `xml_decl_allowed`, which holds only at the very start of a document.
pub fn check_pi(content: &str, xml_decl_allowed: bool) -> Result<(), ValidationError> {
    let target = pi_target(content);
    if let Some(e) = NameValidationIter::from(target).next() {
        return Err(e);
    }
    if target.eq_ignore_ascii_case("xml") && !(xml_decl_allowed && target == "xml") {
        return Err(ValidationError::ReservedPITarget);
    }
    PIValidationIter::from(content).next().map_or(Ok(()), Err)
}

////////////////////////////////////////////////////////////////////////////////////////////////////
