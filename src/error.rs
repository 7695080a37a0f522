use crate::{catalog::CatalogError, passband::PassbandError, xml::XmlError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `catalog` module")]
    Catalog(#[from] CatalogError),
    #[error("Error in the `passband` module")]
    Passband(#[from] PassbandError),
    #[error("Error in the `xml` module")]
    Xml(#[from] XmlError),
}
impl Error {
    /// True if a catalog or a document exists but its contents cannot be interpreted
    pub fn is_invalid_format(&self) -> bool {
        match self {
            Error::Catalog(e) => e.is_invalid_format(),
            Error::Passband(_) => true,
            Error::Xml(e) => e.is_invalid_format(),
        }
    }
}
