use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub density: DensityConfig,
    #[serde(default)]
    pub detail: DetailConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub data_csv: PathBuf,
    pub null_marker: String, // cell value treated as missing
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_csv: PathBuf::from("open_pubs_10000_sample.csv"),
            null_marker: "\\N".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub title: String,
    /// How many names the multi-select starts with.
    pub default_selection: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: "Explore London Pubs".to_string(),
            default_selection: 10,
        }
    }
}

/// Camera and hexagon layer settings for the concentration map.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DensityConfig {
    pub zoom: f64,
    pub pitch: f64,
    pub radius: f64, // metres, hexagon center to vertex
    pub elevation_scale: f64,
    pub elevation_range: [f64; 2],
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            zoom: 10.0,
            pitch: 50.0,
            radius: 200.0,
            elevation_scale: 4.0,
            elevation_range: [0.0, 1000.0],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetailConfig {
    pub zoom: f64,
    pub radius: f64,
    pub fill_color: [u8; 3],
    pub map_style: String,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            zoom: 15.0,
            radius: 100.0,
            fill_color: [255, 0, 0],
            map_style: "mapbox://styles/mapbox/light-v9".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
