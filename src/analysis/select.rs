/// Candidate filtering and ranking.

use std::cmp::Ordering;

use super::Candidate;

/// Selection thresholds applied to evaluated candidates.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionCriteria {
    pub min_fwhm: f64,
    pub max_fwhm: f64,
    pub min_ellipse: f64,
    /// Fraction of the cutout size excluded at each edge.
    pub edge_width: f64,
}

impl SelectionCriteria {
    pub fn accepts(&self, c: &Candidate, width: usize, height: usize) -> bool {
        let (w, h) = (width as f64, height as f64);
        c.fwhm >= self.min_fwhm
            && c.fwhm <= self.max_fwhm
            && c.ellipticity >= self.min_ellipse
            && c.x >= self.edge_width * w
            && c.x <= (1.0 - self.edge_width) * w
            && c.y >= self.edge_width * h
            && c.y <= (1.0 - self.edge_width) * h
    }
}

/// Keep candidates meeting `criteria`, best first by `brightness * pos`.
/// Ties keep their input order.
pub(crate) fn select_candidates(
    candidates: Vec<Candidate>,
    width: usize,
    height: usize,
    criteria: &SelectionCriteria,
) -> Vec<Candidate> {
    let mut selected: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| criteria.accepts(c, width, height))
        .collect();
    selected.sort_by(|a, b| {
        let (sa, sb) = (a.brightness * a.pos, b.brightness * b.pos);
        sb.partial_cmp(&sa).unwrap_or(Ordering::Equal)
    });
    selected
}
