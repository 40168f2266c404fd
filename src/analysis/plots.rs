/// Data behind the radial, FWHM and contour plots of a picked object.

use anyhow::{bail, Context, Result};
use ndarray::ArrayView1;

use super::background::find_median;
use super::evaluate::{cuts_through, fit_cut};
use crate::image::{Cutout, ImageBuffer};

/// (distance from centre, pixel value) pairs sorted by distance.
#[derive(Clone, Debug, Default)]
pub struct RadialProfile {
    pub points: Vec<(f64, f64)>,
}

/// One cut through an object with its fitted Gaussian.
#[derive(Clone, Debug)]
pub struct CutProfile {
    /// Absolute coordinate of `values[0]` along the cut.
    pub start: usize,
    pub values: Vec<f64>,
    /// Model evaluated at each sample, with the cut median added back.
    pub model: Vec<f64>,
    pub center: f64,
    pub fwhm: f64,
}

#[derive(Clone, Debug)]
pub struct FwhmProfiles {
    pub x: CutProfile,
    pub y: CutProfile,
}

#[derive(Debug)]
pub struct ContourData {
    pub cutout: Cutout,
    /// Ascending levels strictly between the cutout min and max; a flat
    /// cutout has the single level of its value.
    pub levels: Vec<f64>,
}

pub fn radial_profile(image: &ImageBuffer, x: f64, y: f64, radius: usize) -> Result<RadialProfile> {
    let cutout = image.cutout_radius(x, y, radius)?;
    let r = radius as f64;
    let mut points: Vec<(f64, f64)> = cutout
        .data
        .indexed_iter()
        .filter(|(_, v)| v.is_finite())
        .filter_map(|((j, i), &v)| {
            let dx = (cutout.x1 + i) as f64 - x;
            let dy = (cutout.y1 + j) as f64 - y;
            let d = dx.hypot(dy);
            (d <= r).then_some((d, v as f64))
        })
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(RadialProfile { points })
}

pub fn fwhm_profiles(image: &ImageBuffer, x: f64, y: f64, radius: usize) -> Result<FwhmProfiles> {
    let cutout = image.cutout_radius(x, y, 0)?;
    let data = image.data().view();
    let ((row, x0), (col, y0)) = cuts_through(&data, cutout.x1, cutout.y1, radius);

    Ok(FwhmProfiles {
        x: cut_profile(row, x0, "X")?,
        y: cut_profile(col, y0, "Y")?,
    })
}

fn cut_profile(cut: ArrayView1<f32>, start: usize, axis: &str) -> Result<CutProfile> {
    let (fit, mu) = fit_cut(cut).with_context(|| format!("FWHM fit failed along {}", axis))?;
    let mut sorted = cut.to_vec();
    let median = find_median(&mut sorted) as f64;
    Ok(CutProfile {
        start,
        values: cut.iter().map(|&v| v as f64).collect(),
        model: (0..cut.len()).map(|i| fit.evaluate(i as f64) + median).collect(),
        center: start as f64 + mu,
        fwhm: fit.fwhm(),
    })
}

/// `count` evenly spaced levels over a cutout of `radius` around (x, y).
/// A flat cutout yields one level.
pub fn contour_levels(image: &ImageBuffer, x: f64, y: f64, radius: usize, count: usize) -> Result<ContourData> {
    let cutout = image.cutout_radius(x, y, radius)?;
    let (lo, hi) = cutout
        .data
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v as f64), hi.max(v as f64))
        });
    if !lo.is_finite() {
        bail!("No contours: cutout has no finite pixels");
    }
    if lo >= hi {
        return Ok(ContourData {
            cutout,
            levels: vec![lo],
        });
    }
    let step = (hi - lo) / (count + 1) as f64;
    let levels = (1..=count).map(|i| lo + step * i as f64).collect();
    Ok(ContourData { cutout, levels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::Header;
    use crate::test_utils::star_field;
    use ndarray::Array2;
    use std::path::Path;

    fn star_image() -> ImageBuffer {
        let data = star_field(61, 51, &[(30.0, 25.0, 4000.0, 2.0)], 100.0, 0.0);
        ImageBuffer::new("1", data, Header::new(), Path::new("star.fits"))
    }

    #[test]
    fn test_radial_profile_sorted_and_bounded() {
        let image = star_image();
        let profile = radial_profile(&image, 30.0, 25.0, 10).unwrap();
        assert!(!profile.points.is_empty());
        assert!(profile.points.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(profile.points.iter().all(|p| p.0 <= 10.0));
        assert_eq!(profile.points[0], (0.0, 4100.0));
    }

    #[test]
    fn test_fwhm_profiles() {
        let image = star_image();
        let p = fwhm_profiles(&image, 30.0, 25.0, 10).unwrap();
        assert_eq!(p.x.start, 20);
        assert_eq!(p.x.values.len(), 21);
        assert!((p.x.center - 30.0).abs() < 0.05, "cx: {}", p.x.center);
        assert!((p.y.center - 25.0).abs() < 0.05, "cy: {}", p.y.center);
        assert!((p.x.fwhm - 4.71).abs() < 0.1, "fwhm: {}", p.x.fwhm);
        assert!((p.x.model[10] - p.x.values[10]).abs() < 5.0);
    }

    #[test]
    fn test_contour_levels() {
        let image = star_image();
        let c = contour_levels(&image, 30.0, 25.0, 10, 12).unwrap();
        assert_eq!(c.levels.len(), 12);
        assert!(c.levels.windows(2).all(|w| w[0] < w[1]));
        assert!(c.levels[0] > 100.0 && c.levels[11] < 4100.0);
        assert_eq!((c.cutout.x1, c.cutout.y1), (20, 15));

        let flat = ImageBuffer::new("f", Array2::from_elem((20, 20), 1.0), Header::new(), Path::new("f"));
        assert_eq!(contour_levels(&flat, 10.0, 10.0, 5, 12).unwrap().levels, vec![1.0]);

        let blank = ImageBuffer::new("b", Array2::from_elem((20, 20), f32::NAN), Header::new(), Path::new("b"));
        assert!(contour_levels(&blank, 10.0, 10.0, 5, 12).is_err());
    }
}
