/// Interpreter settings loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::analysis::FinderConfig;
use crate::display::DEFAULT_COLOR_MAP;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_viewer_width: u32,
    pub default_viewer_height: u32,
    /// Lines kept in the transcript.
    pub history_limit: usize,
    /// Prefix transcript lines with the local time.
    pub timestamp_history: bool,
    pub default_color_map: String,
    pub finder: FinderConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_viewer_width: 900,
            default_viewer_height: 1000,
            history_limit: 5000,
            timestamp_history: false,
            default_color_map: DEFAULT_COLOR_MAP.to_string(),
            finder: FinderConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text).context("Invalid settings")?;
        if settings.default_viewer_width == 0 || settings.default_viewer_height == 0 {
            bail!("Viewer size must be non-zero");
        }
        if settings.finder.min_fwhm > settings.finder.max_fwhm {
            bail!(
                "finder.min_fwhm ({}) exceeds finder.max_fwhm ({})",
                settings.finder.min_fwhm,
                settings.finder.max_fwhm
            );
        }
        Ok(settings)
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}; using defaults", path.display());
            return Ok(Settings::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to load settings from {}", path.display()))
    }

    /// `<config dir>/zview/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("zview").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!((s.default_viewer_width, s.default_viewer_height), (900, 1000));
        assert_eq!(s.history_limit, 5000);
        assert_eq!(s.finder.radius, 10);
        assert_eq!(s.finder.threshold, None);
        assert_eq!(s.default_color_map, "gray");
    }

    #[test]
    fn test_partial_toml() {
        let s = Settings::from_toml_str(
            r#"
            history_limit = 100

            [finder]
            radius = 15
            threshold = 250.0
            min_ellipse = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(s.history_limit, 100);
        assert_eq!(s.default_viewer_width, 900);
        assert_eq!(s.finder.radius, 15);
        assert_eq!(s.finder.threshold, Some(250.0));
        assert_eq!(s.finder.min_ellipse, 0.3);
        assert_eq!(s.finder.max_fwhm, 50.0);
    }

    #[test]
    fn test_invalid() {
        assert!(Settings::from_toml_str("history_limit = \"lots\"").is_err());
        assert!(Settings::from_toml_str("default_viewer_width = 0").is_err());
        assert!(Settings::from_toml_str("[finder]\nmin_fwhm = 9.0\nmax_fwhm = 3.0").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Settings::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(missing, Settings::default());

        let path = dir.path().join("zview.toml");
        fs::write(&path, "default_color_map = \"rainbow3\"\n").unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.default_color_map, "rainbow3");
    }
}
