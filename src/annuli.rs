//! Aperture photometry parameters
//!
//! The aperture and sky annuli evaluated for each photometric filter, with the resulting
//! scatter of the light curves of the most constant stars, are saved to documents like:
//! ```text
//! <annuli>
//!   <band name="Johnson V" aperture="3.50000" annulus="7.00000" dannulus="2.00000" stdev="0.00712000">
//!     <candidate aperture="3.00000" annulus="7.00000" dannulus="2.00000" stdev="0.00840000"/>
//!     <candidate aperture="3.50000" annulus="7.00000" dannulus="2.00000" stdev="0.00712000"/>
//!   </band>
//! </annuli>
//! ```
//! The attributes of `band` repeat the candidate with the lowest standard deviation.

use crate::{
    xml::{self, Element, Encoding, Result, XmlError},
    Passband,
};
use itertools::Itertools;
use std::{collections::BTreeMap, fmt, path::Path};

const DOCTYPE: &str = r#"
<!DOCTYPE annuli [
<!ELEMENT annuli (band*)>

<!ELEMENT band (candidate*)>
<!ATTLIST band name     CDATA #REQUIRED>
<!ATTLIST band aperture CDATA #REQUIRED>
<!ATTLIST band annulus  CDATA #REQUIRED>
<!ATTLIST band dannulus CDATA #REQUIRED>
<!ATTLIST band stdev    CDATA #REQUIRED>

<!ELEMENT candidate EMPTY>
<!ATTLIST candidate aperture CDATA #REQUIRED>
<!ATTLIST candidate annulus  CDATA #REQUIRED>
<!ATTLIST candidate dannulus CDATA #REQUIRED>
<!ATTLIST candidate stdev    CDATA #REQUIRED>
]>
"#;

/// An evaluated set of aperture photometry parameters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CandidateAnnuli {
    /// aperture radius [pixel]
    pub aperture: f64,
    /// inner radius of the sky annulus [pixel]
    pub annulus: f64,
    /// width of the sky annulus [pixel]
    pub dannulus: f64,
    /// scatter of the light curves of the most constant stars
    pub stdev: f64,
}
impl fmt::Display for CandidateAnnuli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CandidateAnnuli({:.6}, {:.6}, {:.6}, {:.6})",
            self.aperture, self.annulus, self.dannulus, self.stdev
        )
    }
}
impl CandidateAnnuli {
    pub fn new(aperture: f64, annulus: f64, dannulus: f64, stdev: f64) -> Self {
        Self {
            aperture,
            annulus,
            dannulus,
            stdev,
        }
    }
    fn with_attributes(&self, element: Element) -> Element {
        element
            .with_attribute("aperture", format!("{:.5}", self.aperture))
            .with_attribute("annulus", format!("{:.5}", self.annulus))
            .with_attribute("dannulus", format!("{:.5}", self.dannulus))
            .with_attribute("stdev", format!("{:.8}", self.stdev))
    }
    fn from_attributes(element: &Element) -> Result<Self> {
        Ok(Self {
            aperture: element.parse_attribute("aperture")?,
            annulus: element.parse_attribute("annulus")?,
            dannulus: element.parse_attribute("dannulus")?,
            stdev: element.parse_attribute("stdev")?,
        })
    }
    /// Saves the candidates of each photometric filter to a UTF-8 XML file, overwriting it
    ///
    /// The filters are written in ascending order, each with the candidate of lowest standard
    /// deviation as attributes followed by all its candidates sorted by annulus and aperture.
    pub fn xml_dump<P: AsRef<Path>>(
        path: P,
        annuli: &BTreeMap<Passband, Vec<CandidateAnnuli>>,
    ) -> Result<()> {
        Self::xml_dump_with_encoding(path, annuli, "utf-8")
    }
    /// Saves the candidates of each photometric filter to an XML file with the given encoding
    pub fn xml_dump_with_encoding<P: AsRef<Path>>(
        path: P,
        annuli: &BTreeMap<Passband, Vec<CandidateAnnuli>>,
        encoding: &str,
    ) -> Result<()> {
        let encoding = Encoding::new(encoding)?;
        let mut root = Element::new("annuli");
        for (filter, candidates) in annuli {
            let best = candidates
                .iter()
                .min_by(|a, b| a.stdev.total_cmp(&b.stdev))
                .ok_or_else(|| {
                    XmlError::Format(format!("no candidate annuli for the {} filter", filter))
                })?;
            let band = candidates
                .iter()
                .sorted_by(|a, b| {
                    a.annulus
                        .total_cmp(&b.annulus)
                        .then(a.aperture.total_cmp(&b.aperture))
                })
                .fold(
                    best.with_attributes(Element::new("band").with_attribute("name", filter)),
                    |band, candidate| {
                        band.with_child(candidate.with_attributes(Element::new("candidate")))
                    },
                );
            root.push(band);
        }
        xml::dump(path, &root, DOCTYPE, encoding)
    }
    /// Loads the candidates of each photometric filter from an XML file
    ///
    /// If `best_only` is true, only the candidate of lowest standard deviation is returned for
    /// each filter, otherwise all the candidates are returned in the order they were saved.
    pub fn xml_load<P: AsRef<Path>>(
        path: P,
        best_only: bool,
    ) -> Result<BTreeMap<Passband, Vec<CandidateAnnuli>>> {
        let root = xml::load(path)?;
        if root.name() != "annuli" {
            return Err(XmlError::Format(format!(
                "<{}> is not an annuli document",
                root.name()
            )));
        }
        let mut annuli = BTreeMap::<Passband, Vec<CandidateAnnuli>>::new();
        for band in root.children() {
            let filter: Passband = band.attribute("name").unwrap_or_default().parse()?;
            let candidates = annuli.entry(filter).or_default();
            if best_only {
                candidates.push(Self::from_attributes(band)?);
            } else {
                for candidate in band.children() {
                    candidates.push(Self::from_attributes(candidate)?);
                }
            }
        }
        Ok(annuli)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let candidate = CandidateAnnuli::new(3.5, 7., 2.25, 0.00712);
        assert_eq!(
            candidate.to_string(),
            "CandidateAnnuli(3.500000, 7.000000, 2.250000, 0.007120)"
        );
    }

    #[test]
    fn attribute_precision() {
        let element = CandidateAnnuli::new(1. / 3., 7., 2., 0.123456789)
            .with_attributes(Element::new("candidate"));
        assert_eq!(element.attribute("aperture"), Some("0.33333"));
        assert_eq!(element.attribute("annulus"), Some("7.00000"));
        assert_eq!(element.attribute("dannulus"), Some("2.00000"));
        assert_eq!(element.attribute("stdev"), Some("0.12345679"));
        let parsed = CandidateAnnuli::from_attributes(&element).unwrap();
        assert_eq!(parsed.aperture, 0.33333);
        assert_eq!(parsed.stdev, 0.12345679);
    }

    #[test]
    fn empty_band() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut annuli = BTreeMap::new();
        annuli.insert("Johnson V".parse::<Passband>().unwrap(), vec![]);
        assert!(matches!(
            CandidateAnnuli::xml_dump(file.path(), &annuli),
            Err(XmlError::Format(_))
        ));
        assert_eq!(std::fs::metadata(file.path()).unwrap().len(), 0);
    }

    #[test]
    fn no_band() {
        let file = tempfile::NamedTempFile::new().unwrap();
        CandidateAnnuli::xml_dump(file.path(), &BTreeMap::new()).unwrap();
        assert!(CandidateAnnuli::xml_load(file.path(), false)
            .unwrap()
            .is_empty());
    }
}
