use crate::Pixel;
use serde::Serialize;

/// A source detected on an image
///
/// `Star` is a frozen record: every field is set by [Star::new] and can only be read afterwards.
/// ```compile_fail
/// let mut star = diffphot::Star::new(1., 2., 3., 4., 5, 6., false, 7., 8., 1.);
/// star.mag = 10.;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Star {
    /// x coordinate on the image [pixel]
    x: f64,
    /// y coordinate on the image [pixel]
    y: f64,
    /// right ascension [deg]
    alpha: f64,
    /// declination [deg]
    delta: f64,
    /// isophotal area [pixel^2]
    area: u32,
    mag: f64,
    saturated: bool,
    snr: f64,
    /// full width at half maximum [pixel]
    fwhm: f64,
    elongation: f64,
}
impl Star {
    /// A new star, the physical range of the values is not checked
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x: f64,
        y: f64,
        alpha: f64,
        delta: f64,
        area: u32,
        mag: f64,
        saturated: bool,
        snr: f64,
        fwhm: f64,
        elongation: f64,
    ) -> Self {
        Self {
            x,
            y,
            alpha,
            delta,
            area,
            mag,
            saturated,
            snr,
            fwhm,
            elongation,
        }
    }
    pub fn x(&self) -> f64 {
        self.x
    }
    pub fn y(&self) -> f64 {
        self.y
    }
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
    pub fn delta(&self) -> f64 {
        self.delta
    }
    pub fn area(&self) -> u32 {
        self.area
    }
    pub fn mag(&self) -> f64 {
        self.mag
    }
    pub fn saturated(&self) -> bool {
        self.saturated
    }
    pub fn snr(&self) -> f64 {
        self.snr
    }
    pub fn fwhm(&self) -> f64 {
        self.fwhm
    }
    pub fn elongation(&self) -> f64 {
        self.elongation
    }
    /// The image coordinates as a [Pixel]
    pub fn pixel(&self) -> Pixel {
        Pixel::new(self.x, self.y)
    }
    /// Euclidean distance between the image coordinates of both stars [pixel]
    pub fn distance(&self, other: &Star) -> f64 {
        self.pixel().distance(&other.pixel())
    }
    /// Great-circle separation between the sky coordinates of both stars [deg]
    ///
    /// Uses the Vincenty formula, well conditioned for coincident and antipodal points alike.
    pub fn angular_distance(&self, other: &Star) -> f64 {
        let (sin_d1, cos_d1) = self.delta.to_radians().sin_cos();
        let (sin_d2, cos_d2) = other.delta.to_radians().sin_cos();
        let (sin_da, cos_da) = (other.alpha - self.alpha).to_radians().sin_cos();

        let num1 = cos_d2 * sin_da;
        let num2 = cos_d1 * sin_d2 - sin_d1 * cos_d2 * cos_da;
        let den = sin_d1 * sin_d2 + cos_d1 * cos_d2 * cos_da;
        num1.hypot(num2).atan2(den).to_degrees()
    }
}
