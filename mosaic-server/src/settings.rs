use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use mosaic_core::{LayoutConfig, Orientation};

use crate::error::StartupError;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub plot_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Overrides the orientation from the chart config when set.
    pub orientation: Option<Orientation>,
    pub chart_config: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from("uploads/"),
            plot_dir: PathBuf::from("static/plots/"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            orientation: None,
            chart_config: None,
            font_path: None,
        }
    }
}

fn parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>, StartupError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| StartupError::InvalidVar {
                name: name.to_string(),
                value: raw,
            }),
        _ => Ok(None),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, StartupError> {
        let defaults = Self::default();
        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT")?.unwrap_or(defaults.port),
            upload_dir: env::var("MOSAIC_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            plot_dir: env::var("MOSAIC_PLOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.plot_dir),
            max_upload_bytes: parsed("MOSAIC_MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
            orientation: parsed("MOSAIC_ORIENTATION")?,
            chart_config: env::var("MOSAIC_CHART_CONFIG").ok().map(PathBuf::from),
            font_path: env::var("MOSAIC_FONT").ok().map(PathBuf::from),
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, StartupError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| StartupError::InvalidVar {
            name: "HOST".to_string(),
            value: raw,
        })
    }

    /// The chart config file if one is set, defaults otherwise.
    pub fn layout_config(&self) -> Result<LayoutConfig, StartupError> {
        let base = match &self.chart_config {
            Some(path) => {
                let txt = fs::read_to_string(path).map_err(|source| StartupError::Io {
                    path: path.clone(),
                    source,
                })?;
                LayoutConfig::from_json_str(&txt).map_err(|source| StartupError::ChartConfig {
                    path: path.clone(),
                    source,
                })?
            }
            None => LayoutConfig::default(),
        };
        let config = match self.orientation {
            Some(o) => base.with_orientation(o),
            None => base,
        };
        config.validate()?;
        Ok(config)
    }
}
