use std::fmt;
use strum_macros::EnumIter;

/// The catalog columns a [Star](crate::Star) is built from
#[derive(EnumIter, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    X,
    Y,
    Alpha,
    Delta,
    Area,
    Magnitude,
    Flux,
    FluxError,
    /// Half-light radius, twice its value is the FWHM
    FluxRadius,
    Flags,
    Elongation,
}
impl Field {
    /// The SExtractor parameter name of the field
    pub fn default_label(&self) -> &'static str {
        use Field::*;
        match self {
            X => "X_IMAGE",
            Y => "Y_IMAGE",
            Alpha => "ALPHA_SKY",
            Delta => "DELTA_SKY",
            Area => "ISOAREAF_IMAGE",
            Magnitude => "MAG_AUTO",
            Flux => "FLUX_ISO",
            FluxError => "FLUXERR_ISO",
            FluxRadius => "FLUX_RADIUS",
            Flags => "FLAGS",
            Elongation => "ELONGATION",
        }
    }
}
impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Field::*;
        match self {
            X => write!(f, "x coordinate"),
            Y => write!(f, "y coordinate"),
            Alpha => write!(f, "right ascension"),
            Delta => write!(f, "declination"),
            Area => write!(f, "isophotal area"),
            Magnitude => write!(f, "magnitude"),
            Flux => write!(f, "flux"),
            FluxError => write!(f, "flux error"),
            FluxRadius => write!(f, "flux radius"),
            Flags => write!(f, "extraction flags"),
            Elongation => write!(f, "elongation"),
        }
    }
}
