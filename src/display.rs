/// Display surfaces: the seam between the interpreter and a rendering toolkit.
///
/// Rendering itself is out of scope; `HeadlessBackend` keeps the state a real
/// viewer would render from (image, color map, cut levels, distribution).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::debug;

use crate::image::ImageBuffer;

/// Color maps understood by the headless backend.
pub const COLOR_MAPS: &[&str] = &[
    "autumn", "blue", "bluered", "cool", "cubehelix", "gray", "green", "heat", "hot", "hsv",
    "idl4", "idl5", "idl6", "jet", "light", "pastel", "rainbow", "rainbow1", "rainbow2",
    "rainbow3", "rainbow4", "ramp", "real", "red", "smooth", "spring", "stairs8", "stairs9",
    "standard", "summer", "viridis", "winter",
];

pub const DEFAULT_COLOR_MAP: &str = "gray";

/// Color distribution (stretch) algorithm.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Distribution {
    Linear,
    Log,
    Power,
    Sqrt,
    Squared,
    Asinh,
    Sinh,
    Histeq,
}

impl Distribution {
    pub const ALL: [Distribution; 8] = [
        Distribution::Linear,
        Distribution::Log,
        Distribution::Power,
        Distribution::Sqrt,
        Distribution::Squared,
        Distribution::Asinh,
        Distribution::Sinh,
        Distribution::Histeq,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Distribution::Linear => "linear",
            Distribution::Log => "log",
            Distribution::Power => "power",
            Distribution::Sqrt => "sqrt",
            Distribution::Squared => "squared",
            Distribution::Asinh => "asinh",
            Distribution::Sinh => "sinh",
            Distribution::Histeq => "histeq",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Distribution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Distribution::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Distribution::ALL.iter().map(|d| d.name()).collect();
                anyhow::anyhow!(
                    "Unknown color distribution '{}' (expected one of: {})",
                    s,
                    names.join(", ")
                )
            })
    }
}

/// One display surface (a viewer window in a GUI host).
pub trait DisplaySurface {
    fn name(&self) -> &str;
    fn size(&self) -> (u32, u32);

    fn set_image(&mut self, image: Arc<ImageBuffer>);
    fn image(&self) -> Option<&Arc<ImageBuffer>>;

    fn set_color_map(&mut self, name: &str) -> Result<()>;
    fn color_map(&self) -> &str;
    fn invert_color_map(&mut self);
    fn color_map_inverted(&self) -> bool;

    fn set_cut_levels(&mut self, lo: f64, hi: f64);
    fn cut_levels(&self) -> Option<(f64, f64)>;

    fn set_distribution(&mut self, dist: Distribution);
    fn distribution(&self) -> Distribution;
}

/// Factory for display surfaces.
pub trait DisplayBackend {
    fn make_surface(&mut self, name: &str, width: u32, height: u32)
        -> Result<Box<dyn DisplaySurface>>;

    /// Release a surface that is being dropped from the registry.
    fn close_surface(&mut self, surface: Box<dyn DisplaySurface>);

    fn color_maps(&self) -> Vec<String>;
}

#[derive(Default)]
pub struct HeadlessBackend {
    open: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of surfaces created and not yet closed.
    pub fn open_surfaces(&self) -> usize {
        self.open
    }
}

impl DisplayBackend for HeadlessBackend {
    fn make_surface(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn DisplaySurface>> {
        if width == 0 || height == 0 {
            bail!("Invalid viewer size {}x{}", width, height);
        }
        self.open += 1;
        debug!("Created headless surface '{}' ({}x{})", name, width, height);
        Ok(Box::new(HeadlessSurface::new(name, width, height)))
    }

    fn close_surface(&mut self, surface: Box<dyn DisplaySurface>) {
        self.open = self.open.saturating_sub(1);
        debug!("Closed headless surface '{}'", surface.name());
    }

    fn color_maps(&self) -> Vec<String> {
        COLOR_MAPS.iter().map(|s| s.to_string()).collect()
    }
}

pub struct HeadlessSurface {
    name: String,
    width: u32,
    height: u32,
    image: Option<Arc<ImageBuffer>>,
    color_map: String,
    inverted: bool,
    cuts: Option<(f64, f64)>,
    distribution: Distribution,
}

impl HeadlessSurface {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        HeadlessSurface {
            name: name.to_string(),
            width,
            height,
            image: None,
            color_map: DEFAULT_COLOR_MAP.to_string(),
            inverted: false,
            cuts: None,
            distribution: Distribution::Linear,
        }
    }
}

impl DisplaySurface for HeadlessSurface {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Displaying a new image resets the cuts to its min/max.
    fn set_image(&mut self, image: Arc<ImageBuffer>) {
        let (lo, hi) = image
            .data()
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        self.cuts = if lo <= hi {
            Some((lo as f64, hi as f64))
        } else {
            None
        };
        self.image = Some(image);
    }

    fn image(&self) -> Option<&Arc<ImageBuffer>> {
        self.image.as_ref()
    }

    fn set_color_map(&mut self, name: &str) -> Result<()> {
        match COLOR_MAPS.iter().find(|c| c.eq_ignore_ascii_case(name)) {
            Some(cmap) => {
                self.color_map = cmap.to_string();
                self.inverted = false;
                Ok(())
            }
            None => bail!("No such color map: '{}'", name),
        }
    }

    fn color_map(&self) -> &str {
        &self.color_map
    }

    fn invert_color_map(&mut self) {
        self.inverted = !self.inverted;
    }

    fn color_map_inverted(&self) -> bool {
        self.inverted
    }

    fn set_cut_levels(&mut self, lo: f64, hi: f64) {
        self.cuts = Some((lo, hi));
    }

    fn cut_levels(&self) -> Option<(f64, f64)> {
        self.cuts
    }

    fn set_distribution(&mut self, dist: Distribution) {
        self.distribution = dist;
    }

    fn distribution(&self) -> Distribution {
        self.distribution
    }
}
