//! Standalone, self-validating XML documents
//!
//! The documents written by this crate embed their Document Type Definition right after
//! the XML declaration and a comment with the creation time:
//! ```text
//! <?xml version='1.0' encoding='utf-8' standalone='yes'?>
//! <!-- File generated by diffphot on Sun Jun 20 23:21:05 1993 UTC -->
//!
//! <!DOCTYPE annuli [
//! ...
//! ]>
//!
//! <annuli>
//! ...
//! ```
//! Every document is validated against its own DTD after it is written and before it is read.

use crate::passband::PassbandError;
use chrono::Utc;
use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

mod dtd;
use dtd::Dtd;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("failed to read {path:?}")]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("XML parsing error: {0}")]
    Parse(String),
    #[error("document is not valid against its DTD: {0}")]
    Validation(String),
    #[error("unexpected document contents: {0}")]
    Format(String),
    #[error("unsupported encoding {0:?}, expected utf-8 or us-ascii")]
    Encoding(String),
    #[error("invalid photometric filter in the document")]
    Passband(#[from] PassbandError),
}
impl XmlError {
    /// True if the document exists but does not hold what is expected
    pub fn is_invalid_format(&self) -> bool {
        matches!(
            self,
            XmlError::Parse(_) | XmlError::Validation(_) | XmlError::Format(_)
        )
    }
}
pub(crate) type Result<T> = std::result::Result<T, XmlError>;

/// Character encodings the documents can be written with
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Encoding {
    Utf8,
    /// non-ASCII characters are written as character references
    Ascii,
}
impl Encoding {
    pub(crate) fn new(label: &str) -> Result<Self> {
        match label.to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "us-ascii" | "ascii" => Ok(Encoding::Ascii),
            _ => Err(XmlError::Encoding(label.to_string())),
        }
    }
    fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Ascii => "us-ascii",
        }
    }
}

/// A node of an in-memory XML tree
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}
impl Element {
    pub(crate) fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
    pub(crate) fn with_attribute<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.set_attribute(key, value);
        self
    }
    pub(crate) fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self
    }
    pub(crate) fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }
    /// Sets an attribute, replacing its previous value if any
    pub(crate) fn set_attribute<K: Into<String>, V: ToString>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key, value)),
        }
    }
    pub(crate) fn push(&mut self, child: Element) {
        self.children.push(child);
    }
    pub(crate) fn name(&self) -> &str {
        &self.name
    }
    pub(crate) fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }
    pub(crate) fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
    pub(crate) fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
    pub(crate) fn children(&self) -> &[Element] {
        &self.children
    }
    /// The first child with the given name
    pub(crate) fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
    /// Parses the value of a mandatory attribute
    pub(crate) fn parse_attribute<T: std::str::FromStr>(&self, key: &str) -> Result<T> {
        let value = self.attribute(key).ok_or_else(|| {
            XmlError::Format(format!("<{}> has no {} attribute", self.name, key))
        })?;
        value.trim().parse().map_err(|_| {
            XmlError::Format(format!("invalid {} of <{}>: {:?}", key, self.name, value))
        })
    }
    /// Parses the text of the element
    pub(crate) fn parse_text<T: std::str::FromStr>(&self) -> Result<T> {
        let text = self.text().unwrap_or_default();
        text.trim().parse().map_err(|_| {
            XmlError::Format(format!("invalid content of <{}>: {:?}", self.name, text))
        })
    }
    /// Drops the whitespace-only text that indents the children of an element
    fn without_indentation(mut self) -> Self {
        let blank = self.text.as_deref().is_some_and(|t| t.trim().is_empty());
        if blank && !self.children.is_empty() {
            self.text = None;
        }
        self
    }

    fn start(&self) -> BytesStart<'_> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        start
    }
    fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        if self.text.is_none() && self.children.is_empty() {
            return writer.write_event(Event::Empty(self.start())).map_err(xml_error);
        }
        writer.write_event(Event::Start(self.start())).map_err(xml_error)?;
        if let Some(text) = &self.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_error)?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(xml_error)
    }
}

/// Asctime-like representation of the current time, as used in the generation comment
fn generation_time() -> String {
    Utc::now().format("%a %b %e %H:%M:%S %Y").to_string()
}

/// Serializes a tree into a standalone document with the given DTD
pub(crate) fn to_document(root: &Element, doctype: &str, encoding: Encoding) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    root.write(&mut writer)?;
    let body = String::from_utf8(writer.into_inner())
        .map_err(|e| XmlError::Parse(format!("invalid UTF-8: {}", e)))?;

    let document = format!(
        "<?xml version='1.0' encoding='{}' standalone='yes'?>\n\
         <!-- File generated by diffphot on {} UTC -->\n\
         \n{}\n\n{}\n",
        encoding.label(),
        generation_time(),
        doctype.trim(),
        body
    );
    Ok(match encoding {
        Encoding::Utf8 => document,
        Encoding::Ascii => document
            .chars()
            .map(|c| {
                if c.is_ascii() {
                    c.to_string()
                } else {
                    format!("&#{};", c as u32)
                }
            })
            .collect(),
    })
}

/// Parses a document into its document type declaration and its root element
pub(crate) fn parse(xml: &str) -> Result<(Option<String>, Element)> {
    let mut reader = Reader::from_str(xml);

    let mut doctype = None;
    let mut root = None;
    let mut stack: Vec<Element> = Vec::new();
    let mut buf = Vec::new();

    loop {
        let element = match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::DocType(e) => {
                doctype = Some(String::from_utf8_lossy(&e).to_string());
                None
            }
            Event::Start(e) => {
                stack.push(element_from(&e)?);
                None
            }
            Event::Empty(e) => Some(element_from(&e)?),
            Event::End(_) => stack.pop().map(Element::without_indentation),
            Event::Text(e) => {
                let text = e.unescape().map_err(xml_error)?;
                if !(stack.is_empty() && text.trim().is_empty()) {
                    append_text(&mut stack, &text)?;
                }
                None
            }
            Event::CData(e) => {
                append_text(&mut stack, &String::from_utf8_lossy(&e))?;
                None
            }
            Event::Eof => break,
            _ => None,
        };
        if let Some(element) = element {
            match stack.last_mut() {
                Some(parent) => parent.push(element),
                None if root.is_none() => root = Some(element),
                None => return Err(XmlError::Parse("more than one root element".into())),
            }
        }
        buf.clear();
    }
    if !stack.is_empty() {
        return Err(XmlError::Parse("unclosed elements at end of document".into()));
    }
    let root = root.ok_or_else(|| XmlError::Parse("no root element".into()))?;
    Ok((doctype, root))
}

fn xml_error<E: std::fmt::Display>(e: E) -> XmlError {
    XmlError::Parse(e.to_string())
}

fn element_from(start: &BytesStart) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let value = attr.unescape_value().map_err(xml_error)?;
        element.set_attribute(String::from_utf8_lossy(attr.key.as_ref()), value);
    }
    Ok(element)
}

fn append_text(stack: &mut [Element], text: &str) -> Result<()> {
    let element = stack
        .last_mut()
        .ok_or_else(|| XmlError::Parse("text outside of the root element".into()))?;
    element.text.get_or_insert_with(String::new).push_str(text);
    Ok(())
}

/// Validates a tree against the internal DTD of its document
pub(crate) fn validate(doctype: Option<&str>, root: &Element) -> Result<()> {
    let doctype =
        doctype.ok_or_else(|| XmlError::Validation("no document type declaration".into()))?;
    Dtd::parse(doctype)
        .and_then(|dtd| dtd.validate(root))
        .map_err(XmlError::Validation)
}

/// Reads a document, a file that is not valid UTF-8 is a parsing error
fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::InvalidData => {
            XmlError::Parse(format!("{:?} is not valid UTF-8: {}", path, source))
        }
        _ => XmlError::Missing {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Reads a standalone document and validates it against its own DTD
pub(crate) fn load<P: AsRef<Path>>(path: P) -> Result<Element> {
    let path = path.as_ref();
    let contents = read_document(path)?;
    let (doctype, root) = parse(&contents)?;
    validate(doctype.as_deref(), &root)?;
    log::info!(
        "Loaded <{}> with {} entries from {:?}",
        root.name(),
        root.children().len(),
        path
    );
    Ok(root)
}

/// Writes a standalone document, overwriting `path`, and validates what was written
pub(crate) fn dump<P: AsRef<Path>>(
    path: P,
    root: &Element,
    doctype: &str,
    encoding: Encoding,
) -> Result<()> {
    let path = path.as_ref();
    let document = to_document(root, doctype, encoding)?;
    fs::write(path, document).map_err(|source| XmlError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    validate_dtd(path)?;
    log::info!(
        "Saved <{}> with {} entries to {:?}",
        root.name(),
        root.children().len(),
        path
    );
    Ok(())
}

/// Validates an XML file against the DTD declared in its internal subset
pub fn validate_dtd<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let contents = read_document(path)?;
    let (doctype, root) = parse(&contents)?;
    validate(doctype.as_deref(), &root)
}
