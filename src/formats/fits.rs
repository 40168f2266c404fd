use std::io::Read;

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use rayon::prelude::*;

use super::header::{parse_card, Header};

const FITS_BLOCK_SIZE: usize = 2880;
const FITS_CARD_SIZE: usize = 80;

const CHUNK: usize = 65536;
const PAR_THRESHOLD: usize = CHUNK * 2;

/// Primary HDU geometry and scaling, pulled from the parsed header.
struct DataLayout {
    bitpix: i32,
    width: usize,
    height: usize,
    bzero: f64,
    bscale: f64,
}

fn read_header<R: Read>(reader: &mut R) -> Result<Header> {
    let mut header = Header::new();
    let mut block = [0u8; FITS_BLOCK_SIZE];
    let mut first_block = true;

    loop {
        reader
            .read_exact(&mut block)
            .context("Failed to read FITS header block")?;

        if first_block {
            if !block.starts_with(b"SIMPLE  =") {
                bail!("Not a FITS file (missing SIMPLE keyword)");
            }
            first_block = false;
        }

        for card_bytes in block.chunks_exact(FITS_CARD_SIZE) {
            let card = String::from_utf8_lossy(card_bytes);
            if card.starts_with("END") && card.as_bytes().get(3).map_or(true, |&b| b == b' ') {
                return Ok(header);
            }
            if let Some(parsed) = parse_card(&card) {
                header.push(parsed);
            }
        }
    }
}

fn data_layout(header: &Header) -> Result<DataLayout> {
    let bitpix = header
        .get_i64("BITPIX")
        .context("Missing BITPIX keyword in FITS header")? as i32;
    let naxis = header.get_i64("NAXIS").unwrap_or(0);
    if naxis < 2 {
        bail!("FITS image must have at least 2 dimensions");
    }
    let width = header.get_i64("NAXIS1").unwrap_or(0);
    let height = header.get_i64("NAXIS2").unwrap_or(0);
    if width <= 0 || height <= 0 {
        bail!("Invalid FITS image dimensions");
    }

    Ok(DataLayout {
        bitpix,
        width: width as usize,
        height: height as usize,
        bzero: header.get_f64("BZERO").unwrap_or(0.0),
        bscale: header.get_f64("BSCALE").unwrap_or(1.0),
    })
}

/// Read the primary HDU of a FITS stream.
///
/// Only the first image plane is returned for cubes (NAXIS > 2); the pixel
/// array is indexed `[[y, x]]` with row 0 being the first row in the file.
pub fn read_fits<R: Read>(reader: &mut R) -> Result<(Header, Array2<f32>)> {
    let header = read_header(reader)?;
    let layout = data_layout(&header)?;

    let bytes_per_pixel = (layout.bitpix.unsigned_abs() as usize) / 8;
    if bytes_per_pixel == 0 {
        bail!("Unsupported BITPIX value: {}", layout.bitpix);
    }
    let num_bytes = layout
        .width
        .checked_mul(layout.height)
        .and_then(|n| n.checked_mul(bytes_per_pixel))
        .and_then(|n| u64::try_from(n).ok())
        .with_context(|| {
            format!(
                "Invalid FITS image dimensions: {} x {}",
                layout.width, layout.height
            )
        })?;

    // The buffer grows with the bytes actually present, not the header's claim
    let mut raw_data = Vec::new();
    reader
        .by_ref()
        .take(num_bytes)
        .read_to_end(&mut raw_data)
        .context("Failed to read FITS data")?;
    if (raw_data.len() as u64) < num_bytes {
        bail!(
            "Failed to read FITS data: expected {} bytes, found {}",
            num_bytes,
            raw_data.len()
        );
    }

    let pixels = decode_pixels(&raw_data, layout.bitpix, layout.bzero, layout.bscale)?;
    let data = Array2::from_shape_vec((layout.height, layout.width), pixels)
        .context("FITS data does not match NAXIS1 x NAXIS2")?;

    Ok((header, data))
}

fn sample_u8(b: &[u8]) -> f64 {
    b[0] as f64
}

fn sample_i16(b: &[u8]) -> f64 {
    i16::from_be_bytes([b[0], b[1]]) as f64
}

fn sample_i32(b: &[u8]) -> f64 {
    i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64
}

fn sample_i64(b: &[u8]) -> f64 {
    i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f64
}

fn sample_f32(b: &[u8]) -> f64 {
    f32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64
}

fn sample_f64(b: &[u8]) -> f64 {
    f64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

/// Big-endian raw samples → physical values (`BZERO + BSCALE * raw`).
fn decode_pixels(raw: &[u8], bitpix: i32, bzero: f64, bscale: f64) -> Result<Vec<f32>> {
    let sample: fn(&[u8]) -> f64 = match bitpix {
        8 => sample_u8,
        16 => sample_i16,
        32 => sample_i32,
        64 => sample_i64,
        -32 => sample_f32,
        -64 => sample_f64,
        other => bail!("Unsupported BITPIX value: {}", other),
    };
    let bpp = (bitpix.unsigned_abs() as usize) / 8;
    let num_pixels = raw.len() / bpp;
    let mut pixels = vec![0f32; num_pixels];

    let convert = |s: &[u8], d: &mut [f32]| {
        for (px, dst) in s.chunks_exact(bpp).zip(d.iter_mut()) {
            *dst = (bzero + bscale * sample(px)) as f32;
        }
    };
    if num_pixels >= PAR_THRESHOLD {
        raw.par_chunks(CHUNK * bpp)
            .zip(pixels.par_chunks_mut(CHUNK))
            .for_each(|(s, d)| convert(s, d));
    } else {
        convert(raw, &mut pixels);
    }

    Ok(pixels)
}
