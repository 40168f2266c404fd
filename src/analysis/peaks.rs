/// Bright-peak detection: maximum filter + connected labelling of maxima.

use ndarray::ArrayView2;

/// Candidate peak position in cutout coordinates. Plateaus report their
/// bounding-box centre, so coordinates may be half-integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Peak {
    pub x: f64,
    pub y: f64,
}

/// Find local maxima above `threshold`.
///
/// A pixel is a maximum if it equals the maximum of the `size`×`size` window
/// around it (window clipped at the borders) and exceeds `threshold`.
/// Touching maxima (4-connected) are merged into one peak. Peaks come back in
/// raster order of their first pixel.
pub(crate) fn find_bright_peaks(data: &ArrayView2<f32>, threshold: f32, size: usize) -> Vec<Peak> {
    let (height, width) = data.dim();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let image_max = maximum_filter(data, size.max(1));

    // Binary mask of maxima
    let mut maxima = vec![false; width * height];
    for y in 0..height {
        for x in 0..width {
            let v = data[[y, x]];
            maxima[y * width + x] = v.is_finite() && v == image_max[y * width + x] && v > threshold;
        }
    }

    // Two-pass labelling of the mask (4-connectivity)
    let mut sets = LabelSets::new();
    let mut labels = vec![0u32; width * height];
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if !maxima[idx] {
                continue;
            }
            let left = if x > 0 { labels[idx - 1] } else { 0 };
            let up = if y > 0 { labels[idx - width] } else { 0 };
            labels[idx] = match (left, up) {
                (0, 0) => sets.fresh(),
                (l, 0) | (0, l) => l,
                (l, u) => sets.merge(l, u),
            };
        }
    }

    // Bounding box per component. Roots are the smallest label of their
    // component, so label order is raster order of first pixels.
    let mut boxes: Vec<Option<(usize, usize, usize, usize)>> = vec![None; sets.len()];
    for y in 0..height {
        for x in 0..width {
            let l = labels[y * width + x];
            if l == 0 {
                continue;
            }
            let root = sets.root(l) as usize;
            boxes[root] = Some(match boxes[root] {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }

    boxes
        .into_iter()
        .flatten()
        .filter_map(|(x0, y0, x1, y1)| {
            let xc = (x0 + x1) as f64 / 2.0;
            let yc = (y0 + y1) as f64 / 2.0;
            // The centre of an irregular plateau may fall off the plateau
            let v = data[[yc as usize, xc as usize]];
            (v >= threshold).then_some(Peak { x: xc, y: yc })
        })
        .collect()
}

/// Separable max filter with a `size`-wide window clipped at the borders.
fn maximum_filter(data: &ArrayView2<f32>, size: usize) -> Vec<f32> {
    let (height, width) = data.dim();
    let before = size / 2;
    let after = size - before - 1;

    let mut rows = vec![f32::NEG_INFINITY; width * height];
    for y in 0..height {
        for x in 0..width {
            let lo = x.saturating_sub(before);
            let hi = (x + after).min(width - 1);
            rows[y * width + x] = (lo..=hi)
                .map(|i| data[[y, i]])
                .filter(|v| v.is_finite())
                .fold(f32::NEG_INFINITY, f32::max);
        }
    }

    let mut out = vec![f32::NEG_INFINITY; width * height];
    for y in 0..height {
        let lo = y.saturating_sub(before);
        let hi = (y + after).min(height - 1);
        for x in 0..width {
            out[y * width + x] = (lo..=hi)
                .map(|j| rows[j * width + x])
                .fold(f32::NEG_INFINITY, f32::max);
        }
    }
    out
}

// ── Label sets ──────────────────────────────────────────────────────────────

/// Disjoint sets of provisional labels. Label 0 is the background.
struct LabelSets {
    parent: Vec<u32>,
}

impl LabelSets {
    fn new() -> Self {
        LabelSets { parent: vec![0] }
    }

    fn len(&self) -> usize {
        self.parent.len()
    }

    fn fresh(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        label
    }

    /// Representative of `label`; every label on the way is re-pointed at it.
    fn root(&mut self, label: u32) -> u32 {
        let mut root = label;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut cur = label;
        while cur != root {
            let next = self.parent[cur as usize];
            self.parent[cur as usize] = root;
            cur = next;
        }
        root
    }

    /// Join two sets under the smaller root and return it.
    fn merge(&mut self, a: u32, b: u32) -> u32 {
        let (ra, rb) = (self.root(a), self.root(b));
        let (keep, drop) = (ra.min(rb), ra.max(rb));
        self.parent[drop as usize] = keep;
        keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::star_field;
    use ndarray::Array2;

    #[test]
    fn test_flat_has_no_peaks() {
        let data = Array2::from_elem((21, 21), 500.0_f32);
        assert!(find_bright_peaks(&data.view(), 500.0, 10).is_empty());
    }

    #[test]
    fn test_single_star() {
        let data = star_field(41, 41, &[(20.0, 18.0, 3000.0, 2.0)], 100.0, 0.0);
        let peaks = find_bright_peaks(&data.view(), 200.0, 10);
        assert_eq!(peaks, vec![Peak { x: 20.0, y: 18.0 }]);
    }

    #[test]
    fn test_two_stars_raster_order() {
        let data = star_field(
            60,
            40,
            &[(45.0, 10.0, 2000.0, 1.5), (12.0, 30.0, 4000.0, 1.5)],
            100.0,
            0.0,
        );
        let peaks = find_bright_peaks(&data.view(), 300.0, 5);
        assert_eq!(peaks.len(), 2);
        assert_eq!((peaks[0].x, peaks[0].y), (45.0, 10.0));
        assert_eq!((peaks[1].x, peaks[1].y), (12.0, 30.0));
    }

    #[test]
    fn test_plateau_reports_centre() {
        let mut data = Array2::from_elem((10, 10), 0.0_f32);
        data[[4, 4]] = 10.0;
        data[[4, 5]] = 10.0;
        let peaks = find_bright_peaks(&data.view(), 1.0, 3);
        assert_eq!(peaks, vec![Peak { x: 4.5, y: 4.0 }]);
    }

    #[test]
    fn test_branches_joined_below_are_one_peak() {
        // Two columns whose labels meet below their first row
        let mut data = Array2::from_elem((8, 8), 0.0_f32);
        for y in 2..=4 {
            data[[y, 2]] = 9.0;
            data[[y, 4]] = 9.0;
        }
        data[[4, 3]] = 9.0;
        data[[3, 3]] = 9.0;
        let peaks = find_bright_peaks(&data.view(), 1.0, 3);
        assert_eq!(peaks, vec![Peak { x: 3.0, y: 3.0 }]);
    }

    #[test]
    fn test_label_sets_root_is_smallest() {
        let mut sets = LabelSets::new();
        let (a, b, c) = (sets.fresh(), sets.fresh(), sets.fresh());
        assert_eq!(sets.merge(c, b), b);
        assert_eq!(sets.merge(b, a), a);
        assert_eq!(sets.root(c), a);
        assert_eq!(sets.len(), 4);
    }

    #[test]
    fn test_below_threshold_ignored() {
        let data = star_field(31, 31, &[(15.0, 15.0, 50.0, 2.0)], 100.0, 0.0);
        assert!(find_bright_peaks(&data.view(), 200.0, 10).is_empty());
    }

    #[test]
    fn test_maximum_filter_window() {
        let data = Array2::from_shape_fn((1, 6), |(_, x)| x as f32);
        let out = maximum_filter(&data.view(), 3);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0, 5.0]);
    }
}
