use once_cell::sync::Lazy;
use regex::Regex;
use std::{cmp::Ordering, fmt, str::FromStr};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

#[derive(Debug, thiserror::Error)]
pub enum PassbandError {
    #[error("{0:?} is not a recognized photometric filter")]
    Unrecognized(String),
    #[error(r#"letter "{letter}" does not exist in the {system} photometric system"#)]
    Letter {
        system: PhotometricSystem,
        letter: String,
    },
}
type Result<T> = std::result::Result<T, PassbandError>;

/// Optional system name followed by the filter letter, e.g. `Johnson V`, `2MASS_Ks` or `V`
static PASSBAND_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:(\w+)[\s_-]+)?(\w{1,2})\s*$").unwrap());

/// Photometric systems, sorted the way they are listed in the XML stores
#[derive(EnumIter, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhotometricSystem {
    Johnson,
    Cousins,
    Gunn,
    Sdss,
    TwoMass,
    Stromgren,
}
impl PhotometricSystem {
    /// The filter letters of the system, from the shortest to the longest effective wavelength
    pub fn letters(&self) -> &'static [&'static str] {
        use PhotometricSystem::*;
        match self {
            Johnson => &["U", "B", "V", "R", "I", "J", "H", "K", "L", "M", "N"],
            Cousins => &["R", "I"],
            Gunn => &["g", "r", "i", "z"],
            Sdss => &["u", "g", "r", "i", "z"],
            TwoMass => &["J", "H", "Ks"],
            Stromgren => &["u", "v", "b", "y"],
        }
    }
    fn parse(name: &str) -> Option<Self> {
        use PhotometricSystem::*;
        match name.to_lowercase().as_str() {
            "johnson" => Some(Johnson),
            "cousins" => Some(Cousins),
            "gunn" => Some(Gunn),
            "sdss" => Some(Sdss),
            "2mass" => Some(TwoMass),
            "strömgren" | "stromgren" | "stroemgren" => Some(Stromgren),
            _ => None,
        }
    }
}
impl fmt::Display for PhotometricSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PhotometricSystem::*;
        match self {
            Johnson => write!(f, "Johnson"),
            Cousins => write!(f, "Cousins"),
            Gunn => write!(f, "Gunn"),
            Sdss => write!(f, "SDSS"),
            TwoMass => write!(f, "2MASS"),
            Stromgren => write!(f, "Strömgren"),
        }
    }
}

/// A photometric filter: a letter of a photometric system
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Passband {
    system: PhotometricSystem,
    letter: &'static str,
}
impl Passband {
    /// A new filter, the letter is matched case-insensitively against the system letters
    pub fn new(system: PhotometricSystem, letter: &str) -> Result<Self> {
        system
            .letters()
            .iter()
            .find(|l| l.eq_ignore_ascii_case(letter))
            .map(|&letter| Self { system, letter })
            .ok_or_else(|| PassbandError::Letter {
                system,
                letter: letter.to_string(),
            })
    }
    pub fn system(&self) -> PhotometricSystem {
        self.system
    }
    pub fn letter(&self) -> &'static str {
        self.letter
    }
    /// Rank of the filter in its system, sorted by effective wavelength
    fn rank(&self) -> usize {
        self.system
            .letters()
            .iter()
            .position(|&l| l == self.letter)
            .unwrap_or(usize::MAX)
    }
    /// All the filters of all the photometric systems
    pub fn all() -> impl Iterator<Item = Passband> {
        PhotometricSystem::iter().flat_map(|system| {
            system
                .letters()
                .iter()
                .map(move |&letter| Passband { system, letter })
        })
    }
}
impl Ord for Passband {
    fn cmp(&self, other: &Self) -> Ordering {
        self.system
            .cmp(&other.system)
            .then_with(|| self.rank().cmp(&other.rank()))
    }
}
impl PartialOrd for Passband {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl fmt::Display for Passband {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.system, self.letter)
    }
}
impl FromStr for Passband {
    type Err = PassbandError;

    fn from_str(value: &str) -> Result<Self> {
        let caps = PASSBAND_REGEX
            .captures(value)
            .ok_or_else(|| PassbandError::Unrecognized(value.to_string()))?;
        let system = match caps.get(1) {
            Some(name) => PhotometricSystem::parse(name.as_str())
                .ok_or_else(|| PassbandError::Unrecognized(value.to_string()))?,
            None => PhotometricSystem::Johnson,
        };
        Passband::new(system, &caps[2])
    }
}
impl TryFrom<&str> for Passband {
    type Error = PassbandError;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}
