/// Shared fixtures for unit tests: in-memory loader, scripted shell, synthetic frames.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use ndarray::Array2;

use crate::config::Settings;
use crate::formats::{Header, HeaderValue, ImageLoader};
use crate::shell::{ShellOutput, ShellRunner};
use crate::zview::ZView;

/// Serves images registered by path instead of reading files.
#[derive(Default)]
pub struct MemoryLoader {
    images: HashMap<PathBuf, Array2<f32>>,
    headers: HashMap<PathBuf, Header>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, path: &str, data: Array2<f32>) -> Self {
        self.images.insert(PathBuf::from(path), data);
        self
    }

    pub fn with_header(mut self, path: &str, header: Header) -> Self {
        self.headers.insert(PathBuf::from(path), header);
        self
    }
}

impl ImageLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<(Header, Array2<f32>)> {
        let Some(data) = self.images.get(path) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: No such file", path.display()),
            )
            .into());
        };
        let header = self.headers.get(path).cloned().unwrap_or_default();
        Ok((header, data.clone()))
    }
}

#[derive(Default)]
struct ShellLog {
    replies: HashMap<String, ShellOutput>,
    calls: Vec<(String, PathBuf)>,
}

/// Records commands and answers with canned output; unknown commands succeed silently.
#[derive(Clone, Default)]
pub struct RecordingShell {
    log: Arc<Mutex<ShellLog>>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, command: &str, status: i32, stdout: &str, stderr: &str) -> Self {
        let reply = ShellOutput {
            status: Some(status),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        };
        self.log.lock().unwrap().replies.insert(command.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.log.lock().unwrap().calls.clone()
    }
}

impl ShellRunner for RecordingShell {
    fn run(&self, command: &str, cwd: &Path) -> Result<ShellOutput> {
        let mut log = self.log.lock().unwrap();
        log.calls.push((command.to_string(), cwd.to_path_buf()));
        Ok(log.replies.get(command).cloned().unwrap_or(ShellOutput {
            status: Some(0),
            ..Default::default()
        }))
    }
}

/// Gaussian stars `(x, y, amplitude, sigma)` on a flat background, plus
/// deterministic Gaussian noise of standard deviation `noise`.
pub fn star_field(
    width: usize,
    height: usize,
    stars: &[(f64, f64, f64, f64)],
    background: f64,
    noise: f64,
) -> Array2<f32> {
    let mut data = Array2::from_shape_fn((height, width), |(y, x)| {
        let star: f64 = stars
            .iter()
            .map(|&(sx, sy, amp, sigma)| {
                let (dx, dy) = (x as f64 - sx, y as f64 - sy);
                amp * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
            })
            .sum();
        (background + star) as f32
    });

    if noise > 0.0 {
        let mut rng = 99u64;
        for v in data.iter_mut() {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            let u1 = ((rng >> 11) as f64 / (1u64 << 53) as f64).max(1e-15);
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            let u2 = (rng >> 11) as f64 / (1u64 << 53) as f64;
            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
            *v += (noise * z) as f32;
        }
    }
    data
}

/// TAN header with square pixels of `scale` degrees, RA increasing to the left.
pub fn wcs_header(crval1: f64, crval2: f64, crpix1: f64, crpix2: f64, scale: f64) -> Header {
    let mut header = Header::new();
    header.set("CTYPE1", HeaderValue::String("RA---TAN".into()));
    header.set("CTYPE2", HeaderValue::String("DEC--TAN".into()));
    header.set("CRVAL1", HeaderValue::Float(crval1));
    header.set("CRVAL2", HeaderValue::Float(crval2));
    header.set("CRPIX1", HeaderValue::Float(crpix1));
    header.set("CRPIX2", HeaderValue::Float(crpix2));
    header.set("CDELT1", HeaderValue::Float(-scale));
    header.set("CDELT2", HeaderValue::Float(scale));
    header
}

/// Headless interpreter rooted at `/work` with a silent shell.
pub fn zview_with(loader: MemoryLoader) -> ZView {
    ZView::with_cwd(Settings::default(), PathBuf::from("/work"))
        .with_loader(Box::new(loader))
        .with_shell(Box::new(RecordingShell::new()))
}
