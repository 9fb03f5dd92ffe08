use crate::buffer::DEFAULT_SEGMENTS;
use crate::filter::RegionFilter;
use crate::processing::ImpactOptions;
use crate::projection::{Crs, DEFAULT_PROJECTED_EPSG};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub filter: RegionFilter,
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub mines_csv: PathBuf,
    pub localities_csv: PathBuf,
    #[serde(default)]
    pub columns: ColumnConfig,
}

/// CSV header names for each field the loader reads.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnConfig {
    pub lat: String,
    pub lon: String,
    pub mine_id: String,
    pub population: String,
    pub name: String,
    pub department: String,
    pub province: String,
    pub district: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            lat: "lat".to_string(),
            lon: "lon".to_string(),
            mine_id: "mine_id".to_string(),
            population: "population".to_string(),
            name: "name".to_string(),
            department: "department".to_string(),
            province: "province".to_string(),
            district: "district".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub radius_km: f64,
    pub projection_epsg: u32,
    pub buffer_segments: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            radius_km: 10.0,
            projection_epsg: DEFAULT_PROJECTED_EPSG,
            buffer_segments: DEFAULT_SEGMENTS,
        }
    }
}

impl AnalysisConfig {
    pub fn impact_options(&self) -> Result<ImpactOptions> {
        let projected = Crs::from_epsg(self.projection_epsg)
            .with_context(|| format!("Invalid projection_epsg {}", self.projection_epsg))?;
        Ok(ImpactOptions {
            projected,
            buffer_segments: self.buffer_segments,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            mines_csv = "data/minas.csv"
            localities_csv = "data/bdpi.csv"

            [output]
            dir = "out"
            "#,
        )
        .unwrap();

        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.input.columns, ColumnConfig::default());
        assert!(config.filter.is_empty());
        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.analysis.impact_options().unwrap(),
            ImpactOptions::default()
        );
    }

    #[test]
    fn overrides_columns_and_filter() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            mines_csv = "m.csv"
            localities_csv = "l.csv"

            [input.columns]
            mine_id = "unidad_minera"
            population = "poblacion"

            [analysis]
            radius_km = 25.0
            projection_epsg = 32717

            [filter]
            departments = ["CUSCO"]

            [output]
            dir = "out"

            [server]
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(config.input.columns.mine_id, "unidad_minera");
        assert_eq!(config.input.columns.lat, "lat");
        assert_eq!(config.analysis.radius_km, 25.0);
        assert_eq!(config.analysis.buffer_segments, DEFAULT_SEGMENTS);
        assert_eq!(config.filter.departments, vec!["CUSCO".to_string()]);
        assert_eq!(config.server.port, 8080);

        let options = config.analysis.impact_options().unwrap();
        assert_eq!(options.projected.epsg(), 32717);
    }

    #[test]
    fn unsupported_projection_is_an_error() {
        let analysis = AnalysisConfig {
            projection_epsg: 3857,
            ..AnalysisConfig::default()
        };
        assert!(analysis.impact_options().is_err());
    }
}
