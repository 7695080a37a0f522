//! Translation offsets between images
//!
//! [XMLOffsetFile] keeps the offsets as an in-memory XML tree that is written to and read
//! from standalone documents of the form:
//! ```text
//! <offsets size="1">
//!   <offset>
//!     <reference>ferM_0001.fits</reference>
//!     <shifted date="Sun Jun 20 23:21:05 1993 UTC" filter="Johnson V">ferM_0002.fits</shifted>
//!     <x_offset overlap="85">-12.5</x_offset>
//!     <y_offset overlap="84">3.25</y_offset>
//!   </offset>
//! </offsets>
//! ```

use crate::{
    xml::{self, Element, Encoding, Result, XmlError},
    Passband,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::{cmp::Ordering, path::Path};

/// Dates are written in Coordinated Universal Time, e.g. `Sun Jun 20 23:21:05 1993 UTC`
pub const DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y UTC";

const DOCTYPE: &str = r#"
<!DOCTYPE offsets [
<!ELEMENT offsets (offset+)>
<!ATTLIST offsets size CDATA  #REQUIRED>

<!ELEMENT offset (reference, shifted, x_offset, y_offset)>
<!ELEMENT reference (#PCDATA)>
<!ELEMENT shifted   (#PCDATA)>
<!ATTLIST shifted date   CDATA  #REQUIRED>
<!ATTLIST shifted filter CDATA  #REQUIRED>
<!ELEMENT x_offset  (#PCDATA)>
<!ATTLIST x_offset overlap CDATA #REQUIRED>
<!ELEMENT y_offset  (#PCDATA)>
<!ATTLIST y_offset overlap CDATA #REQUIRED>
]>
"#;

/// Formats Unix time with [DATE_FORMAT]
pub fn format_date(date: i64) -> Result<String> {
    DateTime::<Utc>::from_timestamp(date, 0)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .ok_or_else(|| XmlError::Format(format!("{} is out of the range of dates", date)))
}
/// Parses a [DATE_FORMAT] date into Unix time
pub fn parse_date(date: &str) -> Result<i64> {
    NaiveDateTime::parse_from_str(date.trim(), DATE_FORMAT)
        .map(|date| date.and_utc().timestamp())
        .map_err(|e| XmlError::Format(format!("invalid date {:?}: {}", date, e)))
}

/// The translation offset between a reference image and a shifted image
///
/// The offset is given in pixels, in the frame of the reference image.
#[derive(Debug, Clone, PartialEq)]
pub struct XMLOffset {
    /// path to the reference image
    pub reference: String,
    /// path to the shifted image
    pub shifted: String,
    /// photometric filter of the shifted image
    pub filter: Passband,
    /// observation date of the shifted image [Unix time]
    pub date: i64,
    pub x: f64,
    pub y: f64,
    /// number of stars that overlapped along the x-axis when the offset was computed
    pub x_overlap: usize,
    /// number of stars that overlapped along the y-axis when the offset was computed
    pub y_overlap: usize,
}
impl XMLOffset {
    #[allow(clippy::too_many_arguments)]
    pub fn new<S: Into<String>>(
        reference: S,
        shifted: S,
        filter: Passband,
        date: i64,
        x: f64,
        y: f64,
        x_overlap: usize,
        y_overlap: usize,
    ) -> Self {
        Self {
            reference: reference.into(),
            shifted: shifted.into(),
            filter,
            date,
            x,
            y,
            x_overlap,
            y_overlap,
        }
    }
    fn to_element(&self) -> Result<Element> {
        Ok(Element::new("offset")
            .with_child(Element::new("reference").with_text(self.reference.as_str()))
            .with_child(
                Element::new("shifted")
                    .with_attribute("date", format_date(self.date)?)
                    .with_attribute("filter", self.filter)
                    .with_text(self.shifted.as_str()),
            )
            .with_child(
                Element::new("x_offset")
                    .with_attribute("overlap", self.x_overlap)
                    .with_text(format!("{:?}", self.x)),
            )
            .with_child(
                Element::new("y_offset")
                    .with_attribute("overlap", self.y_overlap)
                    .with_text(format!("{:?}", self.y)),
            ))
    }
    fn from_element(element: &Element) -> Result<Self> {
        let child = |name: &str| {
            element.child(name).ok_or_else(|| {
                XmlError::Format(format!("<{}> is missing from <offset>", name))
            })
        };
        let reference = child("reference")?;
        let shifted = child("shifted")?;
        let x_offset = child("x_offset")?;
        let y_offset = child("y_offset")?;
        let date = shifted.attribute("date").unwrap_or_default();
        let filter = shifted.attribute("filter").unwrap_or_default();
        Ok(Self {
            reference: reference.text().unwrap_or_default().to_string(),
            shifted: shifted.text().unwrap_or_default().to_string(),
            filter: filter.parse()?,
            date: parse_date(date)?,
            x: x_offset.parse_text()?,
            y: y_offset.parse_text()?,
            x_overlap: x_offset.parse_attribute("overlap")?,
            y_overlap: y_offset.parse_attribute("overlap")?,
        })
    }
}
/// Offsets are sorted by date first
impl PartialOrd for XMLOffset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.date.cmp(&other.date) {
            Ordering::Equal => (
                &self.reference,
                &self.shifted,
                &self.filter,
                self.x,
                self.y,
                self.x_overlap,
                self.y_overlap,
            )
                .partial_cmp(&(
                    &other.reference,
                    &other.shifted,
                    &other.filter,
                    other.x,
                    other.y,
                    other.x_overlap,
                    other.y_overlap,
                )),
            ordering => Some(ordering),
        }
    }
}

/// A container of [XMLOffset]s backed by a standalone XML document
#[derive(Debug, Clone)]
pub struct XMLOffsetFile {
    root: Element,
}
impl Default for XMLOffsetFile {
    fn default() -> Self {
        Self {
            root: Element::new("offsets").with_attribute("size", 0),
        }
    }
}
impl XMLOffsetFile {
    /// An empty container
    pub fn new() -> Self {
        Default::default()
    }
    /// Loads the offsets saved to an XML file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = xml::load(path)?;
        if root.name() != "offsets" {
            return Err(XmlError::Format(format!(
                "<{}> is not an offsets document",
                root.name()
            )));
        }
        Ok(Self { root })
    }
    pub fn len(&self) -> usize {
        self.root.children().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Appends an offset, the changes are not saved until [XMLOffsetFile::dump] is called
    pub fn add(&mut self, offset: &XMLOffset) -> Result<()> {
        self.root.push(offset.to_element()?);
        self.root.set_attribute("size", self.len());
        Ok(())
    }
    /// The `index`-th offset
    pub fn get(&self, index: usize) -> Result<XMLOffset> {
        let element = self.root.children().get(index).ok_or_else(|| {
            XmlError::Format(format!(
                "offset #{} is out of range, there are {} offsets",
                index,
                self.len()
            ))
        })?;
        XMLOffset::from_element(element)
    }
    /// Iterator over the offsets
    pub fn iter(&self) -> impl Iterator<Item = Result<XMLOffset>> + '_ {
        self.root.children().iter().map(XMLOffset::from_element)
    }
    /// Writes the offsets to a UTF-8 XML file, overwriting it
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.dump_with_encoding(path, "utf-8")
    }
    /// Writes the offsets to an XML file, overwriting it, and validates the written document
    pub fn dump_with_encoding<P: AsRef<Path>>(&self, path: P, encoding: &str) -> Result<()> {
        xml::dump(path, &self.root, DOCTYPE, Encoding::new(encoding)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset(date: i64) -> XMLOffset {
        XMLOffset::new(
            "ferM_0001.fits",
            "ferM_0002.fits",
            "Johnson V".parse().unwrap(),
            date,
            -12.5,
            3.25,
            85,
            84,
        )
    }

    #[test]
    fn date_format() {
        assert_eq!(
            format_date(740618465).unwrap(),
            "Sun Jun 20 23:21:05 1993 UTC"
        );
        assert_eq!(
            format_date(1262674861).unwrap(),
            "Tue Jan  5 07:01:01 2010 UTC"
        );
        assert_eq!(parse_date("Sun Jun 20 23:21:05 1993 UTC").unwrap(), 740618465);
        assert_eq!(parse_date("Tue Jan  5 07:01:01 2010 UTC").unwrap(), 1262674861);
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn add() {
        let mut offsets = XMLOffsetFile::new();
        assert!(offsets.is_empty());
        offsets.add(&offset(740618465)).unwrap();
        offsets.add(&offset(740618500)).unwrap();
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets.root.attribute("size"), Some("2"));
        assert_eq!(offsets.get(1).unwrap(), offset(740618500));
        assert!(offsets.get(2).is_err());
    }

    #[test]
    fn element_layout() {
        let element = offset(740618465).to_element().unwrap();
        let shifted = element.child("shifted").unwrap();
        assert_eq!(shifted.attribute("date"), Some("Sun Jun 20 23:21:05 1993 UTC"));
        assert_eq!(shifted.attribute("filter"), Some("Johnson V"));
        let x_offset = element.child("x_offset").unwrap();
        assert_eq!(x_offset.text(), Some("-12.5"));
        assert_eq!(x_offset.attribute("overlap"), Some("85"));

        let mut whole = offset(740618465);
        whole.x = 3.;
        whole.y = -0.;
        let element = whole.to_element().unwrap();
        assert_eq!(element.child("x_offset").unwrap().text(), Some("3.0"));
        assert_eq!(element.child("y_offset").unwrap().text(), Some("-0.0"));
        assert_eq!(XMLOffset::from_element(&element).unwrap(), whole);
    }

    #[test]
    fn paths_keep_whitespace() {
        let mut offset = offset(740618465);
        offset.reference = " ref.fits".into();
        offset.shifted = "shifted.fits ".into();
        let mut offsets = XMLOffsetFile::new();
        offsets.add(&offset).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        offsets.dump(file.path()).unwrap();
        let loaded = XMLOffsetFile::open(file.path()).unwrap();
        assert_eq!(loaded.get(0).unwrap(), offset);
    }

    #[test]
    fn ordered_by_date() {
        let mut later = offset(740618500);
        later.x = -100.;
        assert!(offset(740618465) < later);
        let mut sorted = vec![later.clone(), offset(740618465)];
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(sorted[1], later);
    }
}
