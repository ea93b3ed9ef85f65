//! Equatorial coordinates and sexagesimal formatting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position on the celestial sphere in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equatorial {
    /// Right ascension in degrees, `[0, 360)`
    pub ra_deg: f64,
    /// Declination in degrees, `[-90, 90]`
    pub dec_deg: f64,
}

impl Equatorial {
    pub fn from_degrees(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    /// Great-circle separation to another position, in degrees.
    ///
    /// Uses the haversine form, which stays accurate for the arcsecond-scale
    /// separations typical of catalog cone searches.
    pub fn separation_deg(&self, other: &Equatorial) -> f64 {
        let (ra1, dec1) = (self.ra_deg.to_radians(), self.dec_deg.to_radians());
        let (ra2, dec2) = (other.ra_deg.to_radians(), other.dec_deg.to_radians());

        let half_ddec = ((dec2 - dec1) / 2.0).sin();
        let half_dra = ((ra2 - ra1) / 2.0).sin();
        let h = half_ddec * half_ddec + dec1.cos() * dec2.cos() * half_dra * half_dra;

        (2.0 * h.sqrt().min(1.0).asin()).to_degrees()
    }
}

impl fmt::Display for Equatorial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format_radec(self))
    }
}

/// Format a declination-like angle as `[deg:min:sec]`.
///
/// Integer parts are truncated toward zero, seconds keep six decimals.
pub fn format_dms(angle_deg: f64) -> String {
    let degree = angle_deg.trunc();
    let minute = (angle_deg - degree) * 60.0;
    let second = (minute - minute.trunc()) * 60.0;
    format!(
        "[{}:{}:{:.6}]",
        degree as i64,
        minute.trunc() as i64,
        second
    )
}

/// Format a right-ascension angle (degrees) as `[hour:min:sec]`.
pub fn format_hms(angle_deg: f64) -> String {
    let hours = angle_deg * 24.0 / 360.0;
    let hour = hours.trunc();
    let minutes = (hours - hour) * 60.0;
    let seconds = (minutes - minutes.trunc()) * 60.0;
    format!(
        "[{}:{}:{:.6}]",
        hour as i64,
        minutes.trunc() as i64,
        seconds
    )
}

/// Format a full position as `RA=[h:m:s] DEC=[d:m:s]`.
pub fn format_radec(position: &Equatorial) -> String {
    format!(
        "RA={} DEC={}",
        format_hms(position.ra_deg),
        format_dms(position.dec_deg)
    )
}
