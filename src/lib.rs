//! # Differential photometry core
//!
//! Detection catalogs and the XML stores of a differential photometry pipeline:
//!  - [Catalog]: the [Star]s detected on an image, parsed from a SExtractor catalog saved
//!    in the `ASCII_HEAD` format (see [CatalogLoader]),
//!  - [XMLOffsetFile]: the translation offsets between images,
//!  - [CandidateAnnuli]: the aperture photometry parameters evaluated per photometric filter.
//!
//! The XML stores are standalone documents embedding their own DTD, they are validated after
//! being written and before being read (see [validate_dtd]).
//!
//! ```no_run
//! use diffphot::Catalog;
//!
//! let catalog = Catalog::new("ferM_0001.cat")?;
//! let faint = catalog.iter().filter(|star| star.mag() > 16.).count();
//! println!("{} stars, {} fainter than magnitude 16", catalog.len(), faint);
//! # Ok::<(), diffphot::Error>(())
//! ```

pub mod annuli;
pub mod catalog;
pub mod error;
pub mod offsets;
pub mod passband;
pub mod pixel;
pub mod star;
pub mod xml;

pub use annuli::CandidateAnnuli;
pub use catalog::{Catalog, CatalogError, CatalogLoader, Field};
pub use error::Error;
pub use offsets::{XMLOffset, XMLOffsetFile};
pub use passband::{Passband, PassbandError, PhotometricSystem};
pub use pixel::Pixel;
pub use star::Star;
pub use xml::{validate_dtd, XmlError};
