pub mod fits;
pub mod header;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use ndarray::Array2;

pub use header::{Card, Header, HeaderValue};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Source of image data for the `rd` command.
pub trait ImageLoader {
    fn load(&self, path: &Path) -> Result<(Header, Array2<f32>)>;
}

/// Loads plain or gzip-compressed FITS files from disk.
#[derive(Default)]
pub struct FitsLoader;

impl ImageLoader for FitsLoader {
    fn load(&self, path: &Path) -> Result<(Header, Array2<f32>)> {
        read_image(path)
    }
}

pub fn read_image(path: &Path) -> Result<(Header, Array2<f32>)> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open FITS file {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let compressed = reader
        .fill_buf()
        .context("Failed to read FITS file")?
        .starts_with(&GZIP_MAGIC);

    let result = if compressed {
        let mut decoder = GzDecoder::new(reader);
        fits::read_fits(&mut decoder)
    } else {
        fits::read_fits(&mut reader)
    };
    result.with_context(|| format!("Failed to load {}", path.display()))
}
