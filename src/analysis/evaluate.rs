/// Peak evaluation: row/column Gaussian fits, brightness and centrality.

use ndarray::{s, ArrayView1, ArrayView2};
use rayon::prelude::*;
use tracing::debug;

use super::background::{find_median, finite_samples, sky_level};
use super::fitting::{fit_gaussian_1d, GaussianFit1D};
use super::peaks::Peak;
use super::Candidate;

/// Fit along the cut `values`, first subtracting its median. Returns the
/// fit and the centre in cut coordinates, or `None` if the fitted mean
/// falls outside the cut.
pub(crate) fn fit_cut(values: ArrayView1<f32>) -> Option<(GaussianFit1D, f64)> {
    let mut samples: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if samples.len() != values.len() {
        return None;
    }
    let median = find_median(&mut samples) as f64;
    let cut: Vec<f64> = values.iter().map(|&v| v as f64 - median).collect();
    let fit = fit_gaussian_1d(&cut)?;
    if fit.mu < 0.0 || fit.mu > (cut.len() - 1) as f64 {
        return None;
    }
    Some((fit, fit.mu))
}

/// Row and column cuts of half-length `radius` through `(x, y)`. Returns the
/// cuts with their start offsets.
pub(crate) fn cuts_through<'a>(
    data: &'a ArrayView2<f32>,
    x: usize,
    y: usize,
    radius: usize,
) -> ((ArrayView1<'a, f32>, usize), (ArrayView1<'a, f32>, usize)) {
    let (height, width) = data.dim();
    let x0 = x.saturating_sub(radius);
    let x1 = (x + radius).min(width - 1);
    let y0 = y.saturating_sub(radius);
    let y1 = (y + radius).min(height - 1);
    (
        (data.slice(s![y, x0..=x1]), x0),
        (data.slice(s![y0..=y1, x]), y0),
    )
}

/// Evaluate each peak. Failed fits are dropped; surviving candidates keep
/// the order of `peaks`. Coordinates stay in cutout space.
pub(crate) fn evaluate_peaks(
    peaks: &[Peak],
    data: &ArrayView2<f32>,
    fwhm_radius: usize,
) -> Vec<Candidate> {
    let mut samples = finite_samples(data);
    let median = find_median(&mut samples) as f64;
    let skylevel = sky_level(&samples, 3, 3.0);

    peaks
        .par_iter()
        .filter_map(|peak| {
            let cand = evaluate_peak(peak, data, fwhm_radius, median, skylevel as f64);
            if cand.is_none() {
                debug!("Rejected peak at ({}, {}): fit failed", peak.x, peak.y);
            }
            cand
        })
        .collect()
}

fn evaluate_peak(
    peak: &Peak,
    data: &ArrayView2<f32>,
    fwhm_radius: usize,
    median: f64,
    skylevel: f64,
) -> Option<Candidate> {
    let (height, width) = data.dim();
    let (x, y) = (peak.x as usize, peak.y as usize);
    let ((row, x0), (col, y0)) = cuts_through(data, x, y, fwhm_radius);

    let (fit_x, mu_x) = fit_cut(row)?;
    let (fit_y, mu_y) = fit_cut(col)?;
    let ctr_x = x0 as f64 + mu_x;
    let ctr_y = y0 as f64 + mu_y;

    let fwhm_x = fit_x.fwhm();
    let fwhm_y = fit_y.fwhm();
    let fwhm = fwhm_x.hypot(fwhm_y);
    let ellipticity = if fwhm_x.max(fwhm_y) > 0.0 {
        fwhm_x.min(fwhm_y) / fwhm_x.max(fwhm_y)
    } else {
        0.0
    };

    // Centrality: 1.0 at the centre, falling off quadratically
    let (wd, ht) = (width as f64, height as f64);
    let dx = wd / 2.0 - ctr_x;
    let dy = ht / 2.0 - ctr_y;
    let dx2 = dx * dx / wd / (wd / 4.0);
    let dy2 = dy * dy / ht / (ht / 4.0);
    let pos = 1.0 - dx2.max(dy2);

    let brightness = mean_within(data, ctr_x, ctr_y, 2.0)? - median;

    Some(Candidate {
        x: x as f64,
        y: y as f64,
        objx: ctr_x,
        objy: ctr_y,
        fwhm_x,
        fwhm_y,
        fwhm,
        ellipticity,
        background: median,
        skylevel,
        brightness,
        pos,
    })
}

/// Mean of the finite pixels whose centres lie within `r` of `(cx, cy)`.
fn mean_within(data: &ArrayView2<f32>, cx: f64, cy: f64, r: f64) -> Option<f64> {
    let (height, width) = data.dim();
    let xs = (cx - r).floor().max(0.0) as usize..=((cx + r).ceil() as usize).min(width - 1);
    let ys = (cy - r).floor().max(0.0) as usize..=((cy + r).ceil() as usize).min(height - 1);

    let mut sum = 0.0;
    let mut n = 0usize;
    for yy in ys {
        for xx in xs.clone() {
            let (ddx, ddy) = (xx as f64 - cx, yy as f64 - cy);
            let v = data[[yy, xx]];
            if ddx * ddx + ddy * ddy <= r * r && v.is_finite() {
                sum += v as f64;
                n += 1;
            }
        }
    }
    (n > 0).then(|| sum / n as f64)
}
