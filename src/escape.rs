//! Manage xml character escapes

use memchr::{memchr, memchr2_iter, memrchr};
use std::borrow::Cow;
use std::num::ParseIntError;
use std::ops::Range;

use crate::tree::{Document, ElementId};

/// Error for XML escape / unescape.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EscapeError {
    /// Referenced entity in unknown to the parser.
    #[error("at {0:?}: unrecognized entity `{1}`")]
    UnrecognizedEntity(Range<usize>, String),
    /// Cannot find `;` after `&`
    #[error("at {0:?}: cannot find ';' after '&'")]
    UnterminatedEntity(Range<usize>),
    /// Attempt to parse character reference (`&#<dec-number>;` or `&#x<hex-number>;`)
    /// was unsuccessful, not all characters are decimal or hexadecimal numbers.
    #[error("invalid character reference: {0}")]
    InvalidCharRef(#[from] ParseCharRefError),
}

/// Error of parsing character reference (`&#<dec-number>;` or `&#x<hex-number>;`).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseCharRefError {
    /// Number contains sign character (`+` or `-`) which is not allowed.
    #[error("sign character (+ or -) is not allowed")]
    UnexpectedSign,
    /// Number cannot be parsed due to non-number characters or a numeric overflow.
    #[error("{0}")]
    InvalidNumber(#[from] ParseIntError),
    /// Character reference represents not a valid unicode codepoint.
    #[error("{0:#x} is not a valid unicode codepoint")]
    InvalidCodepoint(u32),
    /// Character reference expanded to a not permitted character for an XML.
    #[error("character reference {0:#x} expands to a character not allowed in XML")]
    IllegalCharacter(u32),
}

/// Escapes `<`, `>` and `&` with their entity references, and `"` as well
/// when `escape_quotes` is set.
///
/// The function is not idempotent: the `&` of an already escaped text is
/// escaped again, so every raw value must be quoted exactly once.
///
/// ```
/// # use dav_xml::escape::quote_string;
/// # use pretty_assertions::assert_eq;
/// assert_eq!(quote_string("<a&b>", false), "&lt;a&amp;b&gt;");
/// assert_eq!(quote_string("say \"hi\"", false), "say \"hi\"");
/// assert_eq!(quote_string("say \"hi\"", true), "say &quot;hi&quot;");
/// ```
pub fn quote_string(raw: &str, escape_quotes: bool) -> Cow<'_, str> {
    if escape_quotes {
        _quote(raw, |ch| matches!(ch, b'<' | b'>' | b'&' | b'"'))
    } else {
        _quote(raw, |ch| matches!(ch, b'<' | b'>' | b'&'))
    }
}

/// Escapes every byte of `raw` for which `escape_chars` returns `true`
fn _quote<F: Fn(u8) -> bool>(raw: &str, escape_chars: F) -> Cow<'_, str> {
    let bytes = raw.as_bytes();
    let mut escaped = None;
    let mut iter = bytes.iter();
    let mut pos = 0;
    while let Some(i) = iter.position(|&b| escape_chars(b)) {
        let escaped = escaped.get_or_insert_with(|| String::with_capacity(raw.len() + 8));
        let new_pos = pos + i;
        escaped.push_str(&raw[pos..new_pos]);
        match bytes[new_pos] {
            b'<' => escaped.push_str("&lt;"),
            b'>' => escaped.push_str("&gt;"),
            b'&' => escaped.push_str("&amp;"),
            b'"' => escaped.push_str("&quot;"),
            _ => unreachable!("only '<', '>', '&' and '\"' are escaped"),
        }
        pos = new_pos + 1;
    }

    if let Some(mut escaped) = escaped {
        if let Some(tail) = raw.get(pos..) {
            escaped.push_str(tail);
        }
        Cow::Owned(escaped)
    } else {
        Cow::Borrowed(raw)
    }
}

/// Escapes, in place, every attribute value and every text fragment of the
/// element `id` and of all its descendants, quotes included.
///
/// Used to prepare a subtree that will be serialized into a context that
/// requires escaped content. Languages and namespace URIs are not touched:
/// the serializer quotes them itself.
pub fn quote_elem(doc: &mut Document, id: ElementId) {
    for element in doc.subtree_ids(id) {
        let arena = doc.arena_mut();
        let mut attr = arena.element(element).first_attr;
        while let Some(a) = attr {
            let node = arena.attribute_mut(a);
            if let Cow::Owned(quoted) = quote_string(&node.value, true) {
                node.value = quoted;
            }
            attr = node.next;
        }

        let node = arena.element(element);
        let lists = [node.first_cdata, node.following_cdata];
        for list in lists {
            let mut fragment = list.first();
            while let Some(t) = fragment {
                let node = arena.text_mut(t);
                if let Cow::Owned(quoted) = quote_string(&node.text, true) {
                    node.text = quoted;
                }
                fragment = node.next;
            }
        }
    }
}

/// Decodes the predefined entities (`&lt;`, `&gt;`, `&amp;`, `&apos;`,
/// `&quot;`) and character references (`&#NN;`, `&#xHH;`) of `raw`.
///
/// Returns the input unchanged if it contains no `&`.
pub fn unescape(raw: &str) -> Result<Cow<'_, str>, EscapeError> {
    let bytes = raw.as_bytes();
    let mut unescaped = None;
    let mut last_end = 0;
    let mut iter = memchr2_iter(b'&', b';', bytes);
    while let Some(start) = iter.by_ref().find(|p| bytes[*p] == b'&') {
        match iter.next() {
            Some(end) if bytes[end] == b';' => {
                let out = unescaped.get_or_insert_with(|| String::with_capacity(raw.len()));
                out.push_str(&raw[last_end..start]);

                let pat = &raw[start + 1..end];
                if let Some(entity) = pat.strip_prefix('#') {
                    let codepoint = parse_number(entity)?;
                    out.push(codepoint);
                } else if let Some(value) = resolve_predefined_entity(pat) {
                    out.push_str(value);
                } else {
                    return Err(EscapeError::UnrecognizedEntity(
                        start + 1..end,
                        pat.to_string(),
                    ));
                }

                last_end = end + 1;
            }
            _ => return Err(EscapeError::UnterminatedEntity(start..raw.len())),
        }
    }

    match unescaped {
        Some(mut out) => {
            out.push_str(&raw[last_end..]);
            Ok(Cow::Owned(out))
        }
        None => Ok(Cow::Borrowed(raw)),
    }
}

/// Resolves one of the five entities predefined by the XML specification.
pub const fn resolve_predefined_entity(entity: &str) -> Option<&'static str> {
    let s = match entity.as_bytes() {
        b"lt" => "<",
        b"gt" => ">",
        b"amp" => "&",
        b"apos" => "'",
        b"quot" => "\"",
        _ => return None,
    };
    Some(s)
}

/// Returns the offset of an entity reference which starts in `text` but is
/// not terminated by `;` inside it. Such a reference may be completed by the
/// next input chunk.
pub(crate) fn unterminated_reference(text: &[u8]) -> Option<usize> {
    let amp = memrchr(b'&', text)?;
    match memchr(b';', &text[amp..]) {
        Some(_) => None,
        None => Some(amp),
    }
}

/// Parses the number part of a character reference, i.e. the text between
/// `&#` and `;`. Hexadecimal numbers start with `x`.
pub fn parse_number(num: &str) -> Result<char, ParseCharRefError> {
    let code = if let Some(hex) = num.strip_prefix('x') {
        from_str_radix(hex, 16)?
    } else {
        from_str_radix(num, 10)?
    };
    match std::char::from_u32(code) {
        Some(c) if crate::reader::validation::is_xml10_char(c) => Ok(c),
        Some(_) => Err(ParseCharRefError::IllegalCharacter(code)),
        None => Err(ParseCharRefError::InvalidCodepoint(code)),
    }
}

#[inline]
fn from_str_radix(src: &str, radix: u32) -> Result<u32, ParseCharRefError> {
    match src.as_bytes().first().copied() {
        // `u32::from_str_radix` accepts `+`, but we don't want it
        Some(b'+') | Some(b'-') => Err(ParseCharRefError::UnexpectedSign),
        _ => u32::from_str_radix(src, radix).map_err(ParseCharRefError::InvalidNumber),
    }
}
