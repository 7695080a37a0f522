//! Detection catalogs
//!
//! A [Catalog] is the frozen, ordered list of the [Star]s found on an image by the
//! source detection software.

use crate::{Pixel, Star};
use std::{
    ops::{Bound, Deref, RangeBounds},
    path::{Path, PathBuf},
};

mod field;
mod loader;
pub use field::Field;
pub use loader::CatalogLoader;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read the catalog {path:?}")]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("the contents of the catalog {path:?} cannot be decoded")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path:?} has no column-label header (not saved in the ASCII_HEAD format?)")]
    NoHeader { path: PathBuf },
    #[error("the {label} column is missing from the catalog {path:?}")]
    MissingColumn { path: PathBuf, label: String },
    #[error("line {line} of the catalog {path:?}: {reason}")]
    Row {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("flag {0} is outside of the [0, 255] range")]
    FlagRange(i64),
    #[error("failed to write the catalog as CSV")]
    Csv(#[from] csv::Error),
}
impl CatalogError {
    /// True if the catalog exists but its contents cannot be interpreted
    pub fn is_invalid_format(&self) -> bool {
        matches!(
            self,
            CatalogError::Corrupt { .. }
                | CatalogError::NoHeader { .. }
                | CatalogError::MissingColumn { .. }
                | CatalogError::Row { .. }
        )
    }
}
type Result<T> = std::result::Result<T, CatalogError>;

/// Bit of the extraction flags set for saturated sources
const SATURATED_FLAG: i64 = 0b100;

/// An immutable sequence of [Star]s
///
/// The stars are reached through the slice the catalog dereferences to, which is read-only:
/// ```compile_fail
/// let mut catalog = diffphot::Catalog::from_sequence(vec![]);
/// catalog[0] = diffphot::Star::new(1., 2., 3., 4., 5, 6., false, 7., 8., 1.);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// the file the catalog was parsed from
    path: Option<PathBuf>,
    stars: Vec<Star>,
}
impl Catalog {
    /// Loads a catalog with the default [CatalogLoader] settings
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        CatalogLoader::default().path(path).load()
    }
    /// Builds a catalog from stars, keeping their order
    pub fn from_sequence<I: IntoIterator<Item = Star>>(stars: I) -> Self {
        Self {
            path: None,
            stars: stars.into_iter().collect(),
        }
    }
    /// Decodes the saturation bit of the extraction flags
    ///
    /// The flags are an 8-bit mask, values out of the `[0, 255]` range are rejected.
    pub fn flag_saturated(flag: i64) -> Result<bool> {
        if !(0..=255).contains(&flag) {
            return Err(CatalogError::FlagRange(flag));
        }
        Ok(flag & SATURATED_FLAG != 0)
    }
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
    /// A new catalog with the stars within `range`, or `None` if the range is out of bounds
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Option<Catalog> {
        let bounds: (Bound<usize>, Bound<usize>) =
            (range.start_bound().cloned(), range.end_bound().cloned());
        self.stars.get(bounds).map(|stars| Catalog {
            path: self.path.clone(),
            stars: stars.to_vec(),
        })
    }
    /// The image coordinates of the stars
    pub fn get_image_coordinates(&self) -> Vec<Pixel> {
        self.iter().map(Star::pixel).collect()
    }
    /// Writes the stars to a CSV file
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        for star in self.iter() {
            wtr.serialize(star)?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}
impl Deref for Catalog {
    type Target = [Star];

    fn deref(&self) -> &Self::Target {
        &self.stars
    }
}
impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        self.stars == other.stars
    }
}
impl FromIterator<Star> for Catalog {
    fn from_iter<I: IntoIterator<Item = Star>>(iter: I) -> Self {
        Catalog::from_sequence(iter)
    }
}
impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Star;
    type IntoIter = std::slice::Iter<'a, Star>;

    fn into_iter(self) -> Self::IntoIter {
        self.stars.iter()
    }
}
impl IntoIterator for Catalog {
    type Item = Star;
    type IntoIter = std::vec::IntoIter<Star>;

    fn into_iter(self) -> Self::IntoIter {
        self.stars.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::star::tests::random_star;

    fn random_catalog(n: usize) -> Catalog {
        let mut rng = rand::thread_rng();
        (0..n).map(|_| random_star(&mut rng)).collect()
    }

    #[test]
    fn flag_saturated() {
        let saturated: Vec<i64> = (0..=255)
            .filter(|&flag| Catalog::flag_saturated(flag).unwrap())
            .collect();
        assert_eq!(saturated.len(), 128);
        assert_eq!(&saturated[..8], &[4, 5, 6, 7, 12, 13, 14, 15]);
        assert_eq!(&saturated[120..], &[244, 245, 246, 247, 252, 253, 254, 255]);
        for flag in [-2, -1, 256, 257] {
            assert!(matches!(
                Catalog::flag_saturated(flag),
                Err(CatalogError::FlagRange(f)) if f == flag
            ));
        }
    }

    #[test]
    fn from_sequence() {
        let catalog = random_catalog(25);
        let stars = catalog.to_vec();
        let identical = Catalog::from_sequence(stars.clone());
        assert_eq!(identical, catalog);
        assert!(identical.path().is_none());
        assert_eq!(identical.iter().copied().collect::<Vec<_>>(), stars);

        let different = Catalog::from_sequence(stars.iter().rev().copied());
        assert_ne!(different, catalog);
    }

    #[test]
    fn slice() {
        let catalog = random_catalog(10);
        let head = catalog.slice(..4).unwrap();
        assert_eq!(head.len(), 4);
        assert_eq!(&head[..], &catalog[..4]);
        let tail = catalog.slice(7..=9).unwrap();
        assert_eq!(&tail[..], &catalog[7..]);
        assert_eq!(catalog.slice(..), Some(catalog.clone()));
        assert!(catalog.slice(5..11).is_none());
    }

    #[test]
    fn image_coordinates() {
        let catalog = random_catalog(50);
        let pixels = catalog.get_image_coordinates();
        assert_eq!(pixels.len(), catalog.len());
        for (pixel, star) in pixels.iter().zip(&catalog) {
            assert_eq!(pixel.x(), star.x());
            assert_eq!(pixel.y(), star.y());
        }
    }

    #[test]
    fn csv_export() {
        let catalog = random_catalog(3);
        let file = tempfile::NamedTempFile::new().unwrap();
        catalog.to_csv(file.path()).unwrap();
        let contents = std::fs::read_to_string(file.path()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("x,y,alpha,delta,area,mag,saturated,snr,fwhm,elongation")
        );
        assert_eq!(lines.count(), 3);
    }
}
