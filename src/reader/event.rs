/// Event emitted by [`Tokenizer::next_event`].
///
/// All strings are owned: the bytes they were decoded from may be discarded
/// before the event is processed, when the next chunk of input arrives.
///
/// [`Tokenizer::next_event`]: crate::reader::Tokenizer::next_event
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// Start tag `<tag attr="value">`. An empty element tag `<tag/>` is also
    /// reported as `Start`, followed by an `End` with the same name.
    Start(StartTag),
    /// End tag `</tag>`, or the end of an empty element tag.
    End(String),
    /// Character data inside the root element, with line ends normalized and
    /// references decoded. Content of CDATA sections is reported verbatim.
    ///
    /// A run of character data which spans several input chunks may be
    /// reported as several consecutive `Text` events.
    Text(String),
}

/// Name and attributes of a start tag, as written in the document.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StartTag {
    /// The qualified name of the element
    pub name: String,
    /// Attributes in document order, with values normalized and decoded.
    /// Namespace declarations are included.
    pub attributes: Vec<(String, String)>,
    /// `true` for an empty element tag `<tag/>`
    pub empty: bool,
}

impl StartTag {
    /// Creates a start tag without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            empty: false,
        }
    }

    /// Adds an attribute, builder style.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }
}
