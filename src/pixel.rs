use serde::Serialize;
use std::fmt;

/// A point in image coordinates
///
/// The coordinates are only readable once the pixel is built:
/// ```compile_fail
/// let mut pixel = diffphot::Pixel::new(4., 6.);
/// pixel.x = 8.;
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Pixel {
    x: f64,
    y: f64,
}
impl Pixel {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
    pub fn x(&self) -> f64 {
        self.x
    }
    pub fn y(&self) -> f64 {
        self.y
    }
    /// Euclidean distance to another pixel
    pub fn distance(&self, other: &Pixel) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}
impl From<(f64, f64)> for Pixel {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}
impl From<Pixel> for (f64, f64) {
    fn from(pixel: Pixel) -> Self {
        (pixel.x, pixel.y)
    }
}
impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}
