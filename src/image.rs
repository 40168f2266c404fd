/// In-memory image held by a buffer.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use ndarray::{s, Array2};

use crate::formats::Header;

#[derive(Debug)]
pub struct ImageBuffer {
    name: String,
    /// Pixel data indexed `[[y, x]]`.
    data: Array2<f32>,
    header: Header,
    path: PathBuf,
}

/// Square sub-region of an image with its offset in the parent.
#[derive(Debug)]
pub struct Cutout {
    pub data: Array2<f32>,
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

impl ImageBuffer {
    pub fn new(name: &str, data: Array2<f32>, header: Header, path: &Path) -> Self {
        ImageBuffer {
            name: name.to_string(),
            data,
            header,
            path: path.to_path_buf(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<f32> {
        self.data.get((y, x)).copied()
    }

    /// Float keyword with a default when absent or non-numeric.
    pub fn keyword_f64(&self, keyword: &str, default: f64) -> f64 {
        self.header.get_f64(keyword).unwrap_or(default)
    }

    /// Cut a box of half-width `radius` around `(x, y)`, clipped to the image.
    pub fn cutout_radius(&self, x: f64, y: f64, radius: usize) -> Result<Cutout> {
        let (width, height) = (self.width(), self.height());
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            bail!("Point ({:.2}, {:.2}) is outside the image", x, y);
        }
        let (xc, yc) = (x as usize, y as usize);
        if xc >= width || yc >= height {
            bail!(
                "Point ({:.2}, {:.2}) is outside the {}x{} image",
                x,
                y,
                width,
                height
            );
        }

        let x1 = xc.saturating_sub(radius);
        let y1 = yc.saturating_sub(radius);
        let x2 = (xc + radius).min(width - 1);
        let y2 = (yc + radius).min(height - 1);

        Ok(Cutout {
            data: self.data.slice(s![y1..=y2, x1..=x2]).to_owned(),
            x1,
            y1,
            x2,
            y2,
        })
    }
}
