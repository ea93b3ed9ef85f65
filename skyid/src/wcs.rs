//! Pixel to sky coordinate transforms.
//!
//! Detected clusters live in pixel space; downstream identification needs
//! equatorial coordinates. [`PixelToSky`] is the seam between the two, and
//! [`TanWcs`] implements the gnomonic projection used by most survey plates
//! (DSS, SDSS, etc.) from the standard FITS keywords.
//!
//! Pixel coordinates passed to [`PixelToSky::pixel_to_sky`] are 0-based,
//! while FITS `CRPIXn` values are 1-based; the offset is applied internally.

use crate::coords::Equatorial;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors produced while building or evaluating a WCS.
#[derive(Error, Debug)]
pub enum WcsError {
    #[error("Missing WCS keyword {0}")]
    MissingKeyword(String),
    #[error("Non-finite value for WCS keyword {0}")]
    NonFiniteKeyword(String),
    #[error("Pixel position ({0}, {1}) is not finite")]
    InvalidPixel(f64, f64),
    #[error("Cannot read WCS keywords: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot parse WCS keywords: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Converts 0-based pixel positions into sky coordinates.
pub trait PixelToSky {
    fn pixel_to_sky(&self, x: f64, y: f64) -> Result<Equatorial, WcsError>;
}

/// Gnomonic (TAN) world coordinate system.
///
/// The linear part maps pixel offsets from the reference pixel to
/// intermediate world coordinates (degrees) through the `CD` matrix; the
/// deprojection then places those on the sphere around `CRVAL`.
#[derive(Debug, Clone, PartialEq)]
pub struct TanWcs {
    /// Reference pixel (1-based, FITS convention)
    crpix: [f64; 2],
    /// Sky position of the reference pixel in degrees (RA, Dec)
    crval: [f64; 2],
    /// Linear transform in degrees per pixel, row-major
    cd: [[f64; 2]; 2],
}

impl TanWcs {
    pub fn new(crpix: [f64; 2], crval: [f64; 2], cd: [[f64; 2]; 2]) -> Self {
        Self { crpix, crval, cd }
    }

    /// Build a WCS from a keyword map such as a parsed FITS header.
    ///
    /// Requires `CRPIX1/2` and `CRVAL1/2`. The linear part is taken from
    /// `CD1_1..CD2_2` when `CD1_1` is present, otherwise from `CDELT1/2`
    /// combined with the optional `PCi_j` matrix (identity by default).
    pub fn from_keywords(keywords: &BTreeMap<String, f64>) -> Result<Self, WcsError> {
        let get = |key: &str| -> Result<f64, WcsError> {
            let value = keywords
                .get(key)
                .copied()
                .ok_or_else(|| WcsError::MissingKeyword(key.to_string()))?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(WcsError::NonFiniteKeyword(key.to_string()))
            }
        };
        let get_or = |key: &str, default: f64| -> Result<f64, WcsError> {
            if keywords.contains_key(key) {
                get(key)
            } else {
                Ok(default)
            }
        };

        let crpix = [get("CRPIX1")?, get("CRPIX2")?];
        let crval = [get("CRVAL1")?, get("CRVAL2")?];

        let cd = if keywords.contains_key("CD1_1") {
            [
                [get("CD1_1")?, get_or("CD1_2", 0.0)?],
                [get_or("CD2_1", 0.0)?, get("CD2_2")?],
            ]
        } else {
            let cdelt = [get("CDELT1")?, get("CDELT2")?];
            let pc = [
                [get_or("PC1_1", 1.0)?, get_or("PC1_2", 0.0)?],
                [get_or("PC2_1", 0.0)?, get_or("PC2_2", 1.0)?],
            ];
            [
                [cdelt[0] * pc[0][0], cdelt[0] * pc[0][1]],
                [cdelt[1] * pc[1][0], cdelt[1] * pc[1][1]],
            ]
        };

        Ok(Self::new(crpix, crval, cd))
    }

    /// Load keywords from a JSON object (`{"CRPIX1": 512.0, ...}`).
    pub fn load_from_file(path: &Path) -> Result<Self, WcsError> {
        let json = std::fs::read_to_string(path)?;
        let keywords: BTreeMap<String, f64> = serde_json::from_str(&json)?;
        Self::from_keywords(&keywords)
    }

    /// Sky position of the reference pixel.
    pub fn reference(&self) -> Equatorial {
        Equatorial::from_degrees(self.crval[0], self.crval[1])
    }
}

impl PixelToSky for TanWcs {
    fn pixel_to_sky(&self, x: f64, y: f64) -> Result<Equatorial, WcsError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(WcsError::InvalidPixel(x, y));
        }

        let dx = x + 1.0 - self.crpix[0];
        let dy = y + 1.0 - self.crpix[1];

        let xi = (self.cd[0][0] * dx + self.cd[0][1] * dy).to_radians();
        let eta = (self.cd[1][0] * dx + self.cd[1][1] * dy).to_radians();

        let ra0 = self.crval[0].to_radians();
        let dec0 = self.crval[1].to_radians();

        let denom = dec0.cos() - eta * dec0.sin();
        let ra = ra0 + xi.atan2(denom);
        let dec = (dec0.sin() + eta * dec0.cos()).atan2((xi * xi + denom * denom).sqrt());

        Ok(Equatorial::from_degrees(
            ra.to_degrees().rem_euclid(360.0),
            dec.to_degrees(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    fn keywords(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn simple_wcs() -> TanWcs {
        TanWcs::from_keywords(&keywords(&[
            ("CRPIX1", 51.0),
            ("CRPIX2", 51.0),
            ("CRVAL1", 300.0),
            ("CRVAL2", 10.0),
            ("CDELT1", -0.001),
            ("CDELT2", 0.001),
        ]))
        .unwrap()
    }

    #[test]
    fn test_reference_pixel_maps_to_crval() {
        let wcs = simple_wcs();
        // CRPIX is 1-based, so pixel 50 (0-based) is the reference
        let sky = wcs.pixel_to_sky(50.0, 50.0).unwrap();
        assert_relative_eq!(sky.ra_deg, 300.0, epsilon = 1e-10);
        assert_relative_eq!(sky.dec_deg, 10.0, epsilon = 1e-10);
        assert_eq!(wcs.reference(), Equatorial::from_degrees(300.0, 10.0));
    }

    #[test]
    fn test_small_offsets_follow_plate_scale() {
        let wcs = simple_wcs();

        // 10 pixels up in y is 0.01 degree north
        let north = wcs.pixel_to_sky(50.0, 60.0).unwrap();
        assert_relative_eq!(north.dec_deg, 10.01, epsilon = 1e-6);
        assert_relative_eq!(north.ra_deg, 300.0, epsilon = 1e-9);

        // 10 pixels right in x decreases RA by 0.01 / cos(dec)
        let east = wcs.pixel_to_sky(60.0, 50.0).unwrap();
        let expected = 300.0 - 0.01 / 10.0_f64.to_radians().cos();
        assert_relative_eq!(east.ra_deg, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_ra_wraps_into_range() {
        let wcs = TanWcs::new([1.0, 1.0], [0.0, 0.0], [[0.001, 0.0], [0.0, 0.001]]);
        let sky = wcs.pixel_to_sky(-10.0, 0.0).unwrap();
        assert!(sky.ra_deg > 359.0 && sky.ra_deg < 360.0);
    }

    #[test]
    fn test_cd_matrix_takes_precedence() {
        let wcs = TanWcs::from_keywords(&keywords(&[
            ("CRPIX1", 1.0),
            ("CRPIX2", 1.0),
            ("CRVAL1", 10.0),
            ("CRVAL2", 0.0),
            ("CD1_1", 0.0),
            ("CD1_2", 0.002),
            ("CD2_1", 0.002),
            ("CD2_2", 0.0),
            ("CDELT1", 99.0),
            ("CDELT2", 99.0),
        ]))
        .unwrap();

        // Rotated 90 degrees: moving in x changes declination
        let sky = wcs.pixel_to_sky(5.0, 0.0).unwrap();
        assert_relative_eq!(sky.ra_deg, 10.0, epsilon = 1e-9);
        assert_relative_eq!(sky.dec_deg, 0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_keyword() {
        let result = TanWcs::from_keywords(&keywords(&[("CRPIX1", 1.0)]));
        assert!(matches!(result, Err(WcsError::MissingKeyword(k)) if k == "CRPIX2"));
    }

    #[test]
    fn test_rejects_non_finite_pixels() {
        let wcs = simple_wcs();
        assert!(matches!(
            wcs.pixel_to_sky(f64::NAN, 0.0),
            Err(WcsError::InvalidPixel(_, _))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"CRPIX1": 51.0, "CRPIX2": 51.0, "CRVAL1": 300.0, "CRVAL2": 10.0, "CDELT1": -0.001, "CDELT2": 0.001}}"#
        )
        .unwrap();

        let wcs = TanWcs::load_from_file(file.path()).unwrap();
        assert_eq!(wcs, simple_wcs());
    }
}
