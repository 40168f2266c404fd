/// Photometric/astrometric report for a selected object.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use tracing::warn;

use crate::analysis::Candidate;
use crate::image::ImageBuffer;
use crate::wcs::{self, Wcs};

pub const BAD_WCS: &str = "BAD WCS";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    /// Fitted centroid with the pixel-coordinate offset applied.
    pub x: f64,
    pub y: f64,
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub ra_txt: String,
    pub dec_txt: String,
    pub equinox: f64,
    pub fwhm: f64,
    pub fwhm_x: f64,
    pub fwhm_y: f64,
    pub ellipticity: f64,
    pub background: f64,
    pub skylevel: f64,
    pub brightness: f64,
    /// Arcseconds.
    pub starsize: f64,
    pub time_local: String,
    pub time_ut: String,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "X: {:.2}  Y: {:.2}", self.x, self.y)?;
        writeln!(
            f,
            "RA: {}  DEC: {}  ({:.6}, {:.6})  EQUINOX: {:.1}",
            self.ra_txt, self.dec_txt, self.ra_deg, self.dec_deg, self.equinox
        )?;
        writeln!(
            f,
            "FWHM: {:.3}  (X: {:.3}  Y: {:.3})  Ellipticity: {:.3}  Star size: {:.3}\"",
            self.fwhm, self.fwhm_x, self.fwhm_y, self.ellipticity, self.starsize
        )?;
        writeln!(
            f,
            "Background: {:.3}  Sky level: {:.3}  Brightness: {:.3}",
            self.background, self.skylevel, self.brightness
        )?;
        write!(f, "Time: {} (local)  {} (UT)", self.time_local, self.time_ut)
    }
}

/// Builds a [`Report`]; each derived field falls back on its own.
pub struct ReportBuilder<'a> {
    image: &'a ImageBuffer,
    candidate: &'a Candidate,
    pixel_coords_offset: f64,
    now: Option<DateTime<Utc>>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(image: &'a ImageBuffer, candidate: &'a Candidate) -> Self {
        ReportBuilder {
            image,
            candidate,
            pixel_coords_offset: 0.0,
            now: None,
        }
    }

    pub fn with_pixel_coords_offset(mut self, offset: f64) -> Self {
        self.pixel_coords_offset = offset;
        self
    }

    /// Timestamp the report at `now` instead of the build time.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn sky_position(&self) -> (f64, f64, String, String) {
        let result = Wcs::from_header(self.image.header())
            .and_then(|w| w.pixel_to_sky(self.candidate.objx, self.candidate.objy));
        match result {
            Ok((ra, dec)) => (ra, dec, wcs::ra_deg_to_str(ra), wcs::dec_deg_to_str(dec)),
            Err(e) => {
                warn!("Couldn't calculate sky coordinates: {:#}", e);
                (0.0, 0.0, BAD_WCS.to_string(), BAD_WCS.to_string())
            }
        }
    }

    fn star_size(&self) -> f64 {
        match wcs::starsize(self.image.header(), self.candidate.fwhm_x, self.candidate.fwhm_y) {
            Ok(size) => size,
            Err(e) => {
                warn!("Couldn't calculate star size: {:#}", e);
                0.0
            }
        }
    }

    pub fn build(self) -> Report {
        let c = self.candidate;
        let (ra_deg, dec_deg, ra_txt, dec_txt) = self.sky_position();
        let now = self.now.unwrap_or_else(Utc::now);

        Report {
            x: c.objx + self.pixel_coords_offset,
            y: c.objy + self.pixel_coords_offset,
            ra_deg,
            dec_deg,
            ra_txt,
            dec_txt,
            equinox: self.image.keyword_f64("EQUINOX", 2000.0),
            fwhm: c.fwhm,
            fwhm_x: c.fwhm_x,
            fwhm_y: c.fwhm_y,
            ellipticity: c.ellipticity,
            background: c.background,
            skylevel: c.skylevel,
            brightness: c.brightness,
            starsize: self.star_size(),
            time_local: now.with_timezone(&Local).format(TIME_FORMAT).to_string(),
            time_ut: now.format(TIME_FORMAT).to_string(),
        }
    }
}

/// Report for `candidate` with the default builder settings plus `offset`.
pub fn make_report(image: &ImageBuffer, candidate: &Candidate, offset: f64) -> Report {
    ReportBuilder::new(image, candidate)
        .with_pixel_coords_offset(offset)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{Header, HeaderValue};
    use crate::test_utils::wcs_header;
    use chrono::TimeZone;
    use ndarray::Array2;
    use std::path::Path;

    fn candidate() -> Candidate {
        Candidate {
            x: 100.0,
            y: 50.0,
            objx: 100.0,
            objy: 50.0,
            fwhm_x: 4.0,
            fwhm_y: 6.0,
            fwhm: 52f64.sqrt(),
            ellipticity: 4.0 / 6.0,
            background: 500.0,
            skylevel: 498.0,
            brightness: 3000.0,
            pos: 1.0,
        }
    }

    fn image(header: Header) -> ImageBuffer {
        ImageBuffer::new("1", Array2::zeros((100, 200)), header, Path::new("a.fits"))
    }

    #[test]
    fn test_report_with_wcs() {
        let mut header = wcs_header(150.0, 30.0, 101.0, 51.0, 0.5 / 3600.0);
        header.set("EQUINOX", HeaderValue::Float(1950.0));
        let img = image(header);
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap();

        let report = ReportBuilder::new(&img, &candidate())
            .with_pixel_coords_offset(1.0)
            .at(when)
            .build();

        assert_eq!((report.x, report.y), (101.0, 51.0));
        assert!((report.ra_deg - 150.0).abs() < 1e-9);
        assert!((report.dec_deg - 30.0).abs() < 1e-9);
        assert_eq!(report.ra_txt, "10:00:00.000");
        assert_eq!(report.dec_txt, "+30:00:00.00");
        assert_eq!(report.equinox, 1950.0);
        assert!((report.starsize - 2.5).abs() < 1e-9);
        assert_eq!(report.time_ut, "2024-03-01 12:30:45");
        assert_eq!(report.time_local.len(), report.time_ut.len());
        assert_eq!(report.brightness, 3000.0);
    }

    #[test]
    fn test_bad_wcs_falls_back() {
        let img = image(Header::new());
        let report = make_report(&img, &candidate(), 0.0);
        assert_eq!(report.ra_txt, BAD_WCS);
        assert_eq!(report.dec_txt, BAD_WCS);
        assert_eq!((report.ra_deg, report.dec_deg), (0.0, 0.0));
        assert_eq!(report.starsize, 0.0);
        assert_eq!(report.equinox, 2000.0);
        assert_eq!(report.fwhm, 52f64.sqrt());
    }

    #[test]
    fn test_star_size_survives_bad_projection() {
        let mut header = wcs_header(150.0, 30.0, 1.0, 1.0, 1.0 / 3600.0);
        header.set("CTYPE1", HeaderValue::String("RA---ZPN".into()));
        let report = make_report(&image(header), &candidate(), 0.0);
        assert_eq!(report.ra_txt, BAD_WCS);
        assert!((report.starsize - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_is_fitted_centroid() {
        let cand = Candidate {
            objx: 100.4,
            objy: 49.7,
            ..candidate()
        };
        let header = wcs_header(150.0, 30.0, 101.0, 51.0, 0.5 / 3600.0);
        let report = make_report(&image(header), &cand, 1.0);
        assert!((report.x - 101.4).abs() < 1e-9, "x: {}", report.x);
        assert!((report.y - 50.7).abs() < 1e-9, "y: {}", report.y);
        // Sky position follows the same point: RA grows to the left
        assert!(report.ra_deg < 150.0);
        assert!(report.dec_deg < 30.0);
    }

    #[test]
    fn test_display() {
        let report = make_report(&image(Header::new()), &candidate(), 0.0);
        let text = report.to_string();
        assert!(text.starts_with("X: 100.00  Y: 50.00"));
        assert!(text.contains("RA: BAD WCS  DEC: BAD WCS"));
        assert!(text.contains("Brightness: 3000.000"));
    }
}
