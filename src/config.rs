use crate::color::Color;
use crate::viewport::{LatLng, Viewport};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Zone table as `.csv` or `.json`.
    pub zones: PathBuf,
    #[serde(default)]
    pub columns: ColumnConfig,
}

/// Source column names for each zone field.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnConfig {
    pub id: String,
    pub country: String,
    pub population: String,
    pub area: String,
    pub roads: String,
    pub region: String,
    pub geometry: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        ColumnConfig {
            id: "fbcz_id".to_string(),
            country: "country".to_string(),
            population: "win_population".to_string(),
            area: "area".to_string(),
            roads: "win_roads_km".to_string(),
            region: "region".to_string(),
            geometry: "geography_wkt".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub tile_url: String,
    pub attribution: String,
    pub zoom: u8,
    /// `[lat, lng]` used when a selection has nothing to center on.
    pub fallback_center: [f64; 2],
    pub fallback_zoom: u8,
    pub border_color: Color,
    pub border_weight: f64,
    pub fill_opacity: f64,
    pub neutral_color: Color,
    pub popup_max_width: u32,
    pub default_country: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors".to_string(),
            zoom: 6,
            fallback_center: [54.0, 15.0],
            fallback_zoom: 4,
            border_color: Color::BLACK,
            border_weight: 1.0,
            fill_opacity: 0.7,
            neutral_color: Color::GRAY,
            popup_max_width: 300,
            default_country: "United Kingdom".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn fallback_viewport(&self) -> Viewport {
        let [lat, lng] = self.fallback_center;
        Viewport {
            center: LatLng { lat, lng },
            zoom: self.fallback_zoom,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { port: 8080 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::parse("[input]\nzones = \"zones.csv\"\n").unwrap();
        assert_eq!(config.input.zones, PathBuf::from("zones.csv"));
        assert_eq!(config.input.columns, ColumnConfig::default());
        assert_eq!(config.render, RenderConfig::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.output.dir, PathBuf::from("output"));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::parse(
            r##"
            [input]
            zones = "zones.json"
            [input.columns]
            id = "zone"
            [render]
            neutral_color = "#cccccc"
            fallback_center = [48.5, 2.25]
            zoom = 7
            [server]
            port = 9000
            "##,
        )
        .unwrap();
        assert_eq!(config.input.columns.id, "zone");
        assert_eq!(config.input.columns.country, "country");
        assert_eq!(config.render.neutral_color, Color::rgb(0xcc, 0xcc, 0xcc));
        assert_eq!(config.render.zoom, 7);
        assert_eq!(config.render.fallback_viewport().center, LatLng { lat: 48.5, lng: 2.25 });
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_bad_color_is_rejected() {
        let err = AppConfig::parse(
            "[input]\nzones = \"z.csv\"\n[render]\nborder_color = \"not-a-color\"\n",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("not-a-color"));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load_from_file(Path::new("/nonexistent/zonemap.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
