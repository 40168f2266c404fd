/// Object finding: cutout, bright peaks, Gaussian evaluation, selection.

pub(crate) mod background;
mod evaluate;
mod fitting;
mod peaks;
pub mod plots;
mod select;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::image::ImageBuffer;

pub use fitting::{GaussianFit1D, FWHM_PER_SIGMA};
pub use peaks::Peak;
pub use select::SelectionCriteria;

/// One evaluated object. Coordinates are absolute image pixels once
/// returned from [`ObjectFinder::find_objects`].
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Integer peak position.
    pub x: f64,
    pub y: f64,
    /// Fitted centroid.
    pub objx: f64,
    pub objy: f64,
    pub fwhm_x: f64,
    pub fwhm_y: f64,
    /// sqrt(fwhm_x² + fwhm_y²)
    pub fwhm: f64,
    /// min/max of the two FWHMs; 1.0 is round.
    pub ellipticity: f64,
    /// Cutout median.
    pub background: f64,
    /// Sigma-clipped mode of the cutout.
    pub skylevel: f64,
    /// Mean within 2 px of the centroid, minus the background.
    pub brightness: f64,
    /// Centrality weight used for ranking.
    pub pos: f64,
}

impl Candidate {
    /// Shift cutout coordinates into image coordinates.
    pub fn rebase(mut self, x1: usize, y1: usize) -> Self {
        let (dx, dy) = (x1 as f64, y1 as f64);
        self.x += dx;
        self.y += dy;
        self.objx += dx;
        self.objy += dy;
        self
    }
}

#[derive(Debug, Error)]
pub enum FindError {
    #[error("Cannot find bright peaks")]
    NoPeaks,
    #[error("Error evaluating bright peaks: no candidates found")]
    NoCandidates,
    #[error("No object matches selection criteria")]
    NoMatch,
    #[error("Object finding cancelled")]
    Cancelled,
    #[error("{0}")]
    Cutout(String),
}

/// Shared cancellation flag, settable from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<(), FindError> {
        if self.is_cancelled() {
            Err(FindError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Finder parameters, as read from the `[finder]` settings table.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// Cutout half-width; also the peak filter size and FWHM cut half-length.
    pub radius: usize,
    /// Peak threshold. `None` picks median + 5 × mean deviation.
    pub threshold: Option<f32>,
    pub min_fwhm: f64,
    pub max_fwhm: f64,
    pub min_ellipse: f64,
    pub edge_width: f64,
    /// Added to reported pixel positions (1.0 for FITS-style coordinates).
    pub pixel_coords_offset: f64,
    pub contour_radius: usize,
    pub num_contours: usize,
}

impl Default for FinderConfig {
    fn default() -> Self {
        FinderConfig {
            radius: 10,
            threshold: None,
            min_fwhm: 2.0,
            max_fwhm: 50.0,
            min_ellipse: 0.5,
            edge_width: 0.01,
            pixel_coords_offset: 0.0,
            contour_radius: 10,
            num_contours: 12,
        }
    }
}

impl FinderConfig {
    pub fn criteria(&self) -> SelectionCriteria {
        SelectionCriteria {
            min_fwhm: self.min_fwhm,
            max_fwhm: self.max_fwhm,
            min_ellipse: self.min_ellipse,
            edge_width: self.edge_width,
        }
    }
}

/// Object finder with builder pattern.
pub struct ObjectFinder {
    config: FinderConfig,
    thread_pool: Option<Arc<rayon::ThreadPool>>,
}

impl Default for ObjectFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectFinder {
    pub fn new() -> Self {
        Self::from_config(FinderConfig::default())
    }

    pub fn from_config(config: FinderConfig) -> Self {
        ObjectFinder {
            config,
            thread_pool: None,
        }
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub fn with_radius(mut self, radius: usize) -> Self {
        self.config.radius = radius.max(1);
        self
    }

    /// Fixed peak threshold instead of the automatic one.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.config.threshold = Some(threshold);
        self
    }

    pub fn with_fwhm_range(mut self, min: f64, max: f64) -> Self {
        self.config.min_fwhm = min;
        self.config.max_fwhm = max;
        self
    }

    pub fn with_min_ellipse(mut self, min: f64) -> Self {
        self.config.min_ellipse = min.clamp(0.0, 1.0);
        self
    }

    pub fn with_edge_width(mut self, width: f64) -> Self {
        self.config.edge_width = width.clamp(0.0, 0.5);
        self
    }

    pub fn with_pixel_coords_offset(mut self, offset: f64) -> Self {
        self.config.pixel_coords_offset = offset;
        self
    }

    /// Use a custom rayon thread pool for peak evaluation.
    pub fn with_thread_pool(mut self, pool: Arc<rayon::ThreadPool>) -> Self {
        self.thread_pool = Some(pool);
        self
    }

    /// Find objects near `(x, y)` (data coordinates).
    ///
    /// Returns the selected candidates, best first, in image coordinates.
    pub fn find_objects(
        &self,
        image: &ImageBuffer,
        x: f64,
        y: f64,
        cancel: &CancelToken,
    ) -> Result<Vec<Candidate>, FindError> {
        let result = match &self.thread_pool {
            Some(pool) => pool.install(|| self.find_impl(image, x, y, cancel)),
            None => self.find_impl(image, x, y, cancel),
        };
        if let Err(e) = &result {
            error!("Error finding object: {}", e);
        }
        result
    }

    fn find_impl(
        &self,
        image: &ImageBuffer,
        x: f64,
        y: f64,
        cancel: &CancelToken,
    ) -> Result<Vec<Candidate>, FindError> {
        let radius = self.config.radius;
        let cutout = image
            .cutout_radius(x, y, radius)
            .map_err(|e| FindError::Cutout(format!("{:#}", e)))?;
        let view = cutout.data.view();
        let (height, width) = view.dim();
        cancel.check()?;

        let threshold = match self.config.threshold {
            Some(t) => t,
            None => background::auto_threshold(&mut background::finite_samples(&view), 5.0),
        };
        let peaks = peaks::find_bright_peaks(&view, threshold, radius);
        debug!("{} peaks above {:.2} in {}x{} cutout", peaks.len(), threshold, width, height);
        if peaks.is_empty() {
            return Err(FindError::NoPeaks);
        }
        cancel.check()?;

        let candidates = evaluate::evaluate_peaks(&peaks, &view, radius);
        if candidates.is_empty() {
            return Err(FindError::NoCandidates);
        }
        cancel.check()?;

        let selected = select::select_candidates(candidates, width, height, &self.config.criteria());
        if selected.is_empty() {
            return Err(FindError::NoMatch);
        }

        Ok(selected
            .into_iter()
            .map(|c| c.rebase(cutout.x1, cutout.y1))
            .collect())
    }
}
