/// Celestial coordinates from FITS WCS keywords (gnomonic/TAN only).

use anyhow::{bail, Result};

use crate::formats::Header;

/// Pixel-to-intermediate linear transform in degrees per pixel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinearTransform {
    pub cd11: f64,
    pub cd12: f64,
    pub cd21: f64,
    pub cd22: f64,
}

impl LinearTransform {
    /// From CDi_j, else PCi_j × CDELTi, else CDELTi + CROTA2.
    pub fn from_header(header: &Header) -> Result<Self> {
        let cd = |k: &str| header.get_f64(k);
        if ["CD1_1", "CD1_2", "CD2_1", "CD2_2"].iter().any(|k| header.contains(k)) {
            return Ok(LinearTransform {
                cd11: cd("CD1_1").unwrap_or(0.0),
                cd12: cd("CD1_2").unwrap_or(0.0),
                cd21: cd("CD2_1").unwrap_or(0.0),
                cd22: cd("CD2_2").unwrap_or(0.0),
            });
        }

        let (cdelt1, cdelt2) = match (cd("CDELT1"), cd("CDELT2")) {
            (Some(a), Some(b)) => (a, b),
            _ => bail!("Missing CD matrix or CDELT1/CDELT2 keywords"),
        };

        if ["PC1_1", "PC1_2", "PC2_1", "PC2_2"].iter().any(|k| header.contains(k)) {
            return Ok(LinearTransform {
                cd11: cdelt1 * cd("PC1_1").unwrap_or(1.0),
                cd12: cdelt1 * cd("PC1_2").unwrap_or(0.0),
                cd21: cdelt2 * cd("PC2_1").unwrap_or(0.0),
                cd22: cdelt2 * cd("PC2_2").unwrap_or(1.0),
            });
        }

        let rot = cd("CROTA2").unwrap_or(0.0).to_radians();
        let (sin, cos) = rot.sin_cos();
        Ok(LinearTransform {
            cd11: cdelt1 * cos,
            cd12: -cdelt2 * sin,
            cd21: cdelt1 * sin,
            cd22: cdelt2 * cos,
        })
    }

    pub fn determinant(&self) -> f64 {
        self.cd11 * self.cd22 - self.cd12 * self.cd21
    }
}

/// Rotation `(xrot, yrot)` and scale `(cdelt1, cdelt2)`, all in degrees.
pub fn rotation_and_scale(header: &Header) -> Result<((f64, f64), (f64, f64))> {
    let m = LinearTransform::from_header(header)?;
    let det = m.determinant();
    if det == 0.0 || !det.is_finite() {
        bail!("Singular WCS matrix");
    }
    let sgn = det.signum();

    let cdelt1 = sgn * m.cd11.hypot(m.cd21);
    let cdelt2 = m.cd12.hypot(m.cd22);
    let xrot = (sgn * m.cd21).atan2(sgn * m.cd11).to_degrees();
    let yrot = (-m.cd12).atan2(m.cd22).to_degrees();
    Ok(((xrot, yrot), (cdelt1, cdelt2)))
}

/// Star size in arcseconds from the pixel FWHMs.
pub fn starsize(header: &Header, fwhm_x: f64, fwhm_y: f64) -> Result<f64> {
    let (_, (cdelt1, cdelt2)) = rotation_and_scale(header)?;
    Ok(3600.0 * (fwhm_x * cdelt1.abs() + fwhm_y * cdelt2.abs()) / 2.0)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Wcs {
    crpix: (f64, f64),
    /// Reference sky position (RA, Dec) in degrees.
    crval: (f64, f64),
    matrix: LinearTransform,
}

impl Wcs {
    pub fn from_header(header: &Header) -> Result<Self> {
        let ctype1 = match header.get_str("CTYPE1") {
            Some(c) => c.trim().to_uppercase(),
            None => bail!("No WCS in header (missing CTYPE1)"),
        };
        let ctype2 = header.get_str("CTYPE2").map(|c| c.trim().to_uppercase()).unwrap_or_default();

        let proj1 = ctype1.get(5..8).unwrap_or("");
        let proj2 = ctype2.get(5..8).unwrap_or("");
        if proj1 != "TAN" || proj2 != "TAN" {
            bail!("Unsupported projection '{}'/'{}'", ctype1, ctype2);
        }
        if !ctype1.starts_with("RA") || !ctype2.starts_with("DEC") {
            bail!("Unsupported celestial axes '{}'/'{}'", ctype1, ctype2);
        }

        let get = |k: &str| match header.get_f64(k) {
            Some(v) => Ok(v),
            None => bail!("Missing {} keyword", k),
        };

        Ok(Wcs {
            crpix: (get("CRPIX1")?, get("CRPIX2")?),
            crval: (get("CRVAL1")?, get("CRVAL2")?),
            matrix: LinearTransform::from_header(header)?,
        })
    }

    /// Data coordinates (0-based) to (RA, Dec) in degrees.
    pub fn pixel_to_sky(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            bail!("Invalid pixel position ({}, {})", x, y);
        }
        let m = &self.matrix;
        let px = x + 1.0 - self.crpix.0;
        let py = y + 1.0 - self.crpix.1;
        let xi = (m.cd11 * px + m.cd12 * py).to_radians();
        let eta = (m.cd21 * px + m.cd22 * py).to_radians();

        let ra0 = self.crval.0.to_radians();
        let dec0 = self.crval.1.to_radians();
        let (sin_d0, cos_d0) = dec0.sin_cos();

        let denom = cos_d0 - eta * sin_d0;
        let ra = ra0 + xi.atan2(denom);
        let dec = (sin_d0 + eta * cos_d0).atan2(xi.hypot(denom));

        let ra = ra.to_degrees().rem_euclid(360.0);
        let dec = dec.to_degrees();
        if !ra.is_finite() || !dec.is_finite() {
            bail!("WCS transform failed at ({}, {})", x, y);
        }
        Ok((ra, dec))
    }
}

/// `HH:MM:SS.sss`
pub fn ra_deg_to_str(ra_deg: f64) -> String {
    let day_ms = 24 * 3600 * 1000;
    let total = ((ra_deg.rem_euclid(360.0) / 15.0) * 3600.0 * 1000.0).round() as i64 % day_ms;
    let (h, rest) = (total / 3_600_000, total % 3_600_000);
    let (m, rest) = (rest / 60_000, rest % 60_000);
    let (s, ms) = (rest / 1000, rest % 1000);
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

/// `±DD:MM:SS.ss`
pub fn dec_deg_to_str(dec_deg: f64) -> String {
    let sign = if dec_deg < 0.0 { '-' } else { '+' };
    let total = (dec_deg.abs() * 3600.0 * 100.0).round() as i64;
    let (d, rest) = (total / 360_000, total % 360_000);
    let (m, rest) = (rest / 6000, rest % 6000);
    let (s, cs) = (rest / 100, rest % 100);
    format!("{}{:02}:{:02}:{:02}.{:02}", sign, d, m, s, cs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::wcs_header;

    #[test]
    fn test_reference_pixel_maps_to_crval() {
        let header = wcs_header(150.0, 30.0, 101.0, 51.0, 1.0 / 3600.0);
        let wcs = Wcs::from_header(&header).unwrap();
        let (ra, dec) = wcs.pixel_to_sky(100.0, 50.0).unwrap();
        assert!((ra - 150.0).abs() < 1e-9, "ra: {}", ra);
        assert!((dec - 30.0).abs() < 1e-9, "dec: {}", dec);
    }

    #[test]
    fn test_offset_along_dec() {
        let header = wcs_header(0.0, 0.0, 1.0, 1.0, 1.0 / 3600.0);
        let wcs = Wcs::from_header(&header).unwrap();
        let (ra, dec) = wcs.pixel_to_sky(0.0, 3600.0).unwrap();
        assert!(ra.abs() < 1e-9 || (ra - 360.0).abs() < 1e-9, "ra: {}", ra);
        // atan(pi/180) in degrees, slightly under 1 deg
        assert!((dec - 0.999_898).abs() < 1e-5, "dec: {}", dec);

        // East is left: negative CDELT1 raises RA for decreasing x
        let (ra, _) = wcs.pixel_to_sky(-3600.0, 0.0).unwrap();
        assert!(ra > 0.99 && ra < 1.0, "ra: {}", ra);
    }

    #[test]
    fn test_missing_and_unsupported() {
        assert!(Wcs::from_header(&Header::new()).is_err());

        let mut header = wcs_header(10.0, 10.0, 1.0, 1.0, 0.001);
        header.set("CTYPE1", crate::formats::HeaderValue::String("RA---SIN".into()));
        let err = Wcs::from_header(&header).unwrap_err();
        assert!(err.to_string().contains("Unsupported projection"), "{}", err);
    }

    #[test]
    fn test_rotation_and_scale_from_cdelt() {
        let header = wcs_header(10.0, 10.0, 1.0, 1.0, 0.5 / 3600.0);
        let ((xrot, yrot), (cdelt1, cdelt2)) = rotation_and_scale(&header).unwrap();
        assert!(xrot.abs() < 1e-9 && yrot.abs() < 1e-9);
        assert!((cdelt1 + 0.5 / 3600.0).abs() < 1e-12, "cdelt1: {}", cdelt1);
        assert!((cdelt2 - 0.5 / 3600.0).abs() < 1e-12, "cdelt2: {}", cdelt2);
    }

    #[test]
    fn test_rotation_from_cd_matrix() {
        use crate::formats::HeaderValue::Float;
        let mut header = Header::new();
        let s = 1.0 / 3600.0;
        let (sin, cos) = 30f64.to_radians().sin_cos();
        header.set("CD1_1", Float(s * cos));
        header.set("CD1_2", Float(-s * sin));
        header.set("CD2_1", Float(s * sin));
        header.set("CD2_2", Float(s * cos));
        let ((xrot, yrot), (c1, c2)) = rotation_and_scale(&header).unwrap();
        assert!((xrot - 30.0).abs() < 1e-9 && (yrot - 30.0).abs() < 1e-9);
        assert!((c1 - s).abs() < 1e-12 && (c2 - s).abs() < 1e-12);
    }

    #[test]
    fn test_starsize() {
        let header = wcs_header(10.0, 10.0, 1.0, 1.0, 0.5 / 3600.0);
        let size = starsize(&header, 4.0, 6.0).unwrap();
        assert!((size - 2.5).abs() < 1e-9, "size: {}", size);
        assert!(starsize(&Header::new(), 4.0, 6.0).is_err());
    }

    #[test]
    fn test_sexagesimal_formatting() {
        assert_eq!(ra_deg_to_str(0.0), "00:00:00.000");
        assert_eq!(ra_deg_to_str(150.0), "10:00:00.000");
        assert_eq!(ra_deg_to_str(83.633_083), "05:34:31.940");
        assert_eq!(ra_deg_to_str(359.999_999_99), "00:00:00.000");
        assert_eq!(dec_deg_to_str(22.014_472), "+22:00:52.10");
        assert_eq!(dec_deg_to_str(-5.5), "-05:30:00.00");
        assert_eq!(dec_deg_to_str(0.0), "+00:00:00.00");
    }
}
