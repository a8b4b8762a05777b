use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::ephemeris::GroundStation;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub station: StationConfig,
    pub rotator: RotatorConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    pub predict: PredictConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: Option<String>,
    /// `"lat, lon"` in decimal degrees.
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RotatorConfig {
    pub cal_file: PathBuf,
    #[serde(default)]
    pub backend: BackendChoice,
    #[serde(default = "default_max_seek_ticks")]
    pub max_seek_ticks: u32,
}

/// Hardware interface behind the rotator. Only the software simulation is
/// built in; device bindings implement `RotatorBackend` out of tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendChoice {
    #[default]
    Simulated,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictConfig {
    pub tle_folder: PathBuf,
    #[serde(default = "default_min_elevation")]
    pub min_elevation_deg: f64,
    /// Look plan sample spacing, e.g. "1m" or "30s".
    #[serde(default = "default_time_step")]
    pub time_step: String,
}

fn default_bind() -> String {
    // Picked from the unassigned range; matches the historical service port.
    "0.0.0.0:9040".to_string()
}

fn default_max_seek_ticks() -> u32 {
    crate::rotator::DEFAULT_MAX_SEEK_TICKS
}

fn default_min_elevation() -> f64 {
    30.0
}

fn default_time_step() -> String {
    "1m".to_string()
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn ground_station(&self) -> GroundStation {
        GroundStation::from_coordinates(&self.station.coordinates, Some(self.station.altitude_m))
            .unwrap_or_default()
    }

    pub fn time_step(&self) -> Result<chrono::Duration, ConfigError> {
        let std_duration = humantime::parse_duration(self.predict.time_step.trim())
            .map_err(|e| ConfigError::Invalid(format!("time_step: {e}")))?;
        chrono::Duration::from_std(std_duration)
            .map_err(|e| ConfigError::Invalid(format!("time_step: {e}")))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let station =
            GroundStation::from_coordinates(&self.station.coordinates, Some(self.station.altitude_m));
        let Some(station) = station else {
            return invalid(format!(
                "coordinates '{}' are not 'lat, lon'",
                self.station.coordinates
            ));
        };
        if !(-90.0..=90.0).contains(&station.latitude_deg) {
            return invalid(format!("latitude {} is out of range", station.latitude_deg));
        }
        if !(-180.0..=180.0).contains(&station.longitude_deg) {
            return invalid(format!(
                "longitude {} is out of range",
                station.longitude_deg
            ));
        }
        // Dead Sea shore to Mt Everest.
        if !(-430.0..=8850.0).contains(&station.altitude_m) {
            return invalid(format!("altitude {} is out of range", station.altitude_m));
        }

        let addr: SocketAddr = match self.service.bind.parse() {
            Ok(addr) => addr,
            Err(_) => return invalid(format!("bind address '{}' is invalid", self.service.bind)),
        };
        if addr.port() < 1024 {
            return invalid(format!(
                "port {} is out of range, must be 1024 to 65535",
                addr.port()
            ));
        }

        if !(0.0..=90.0).contains(&self.predict.min_elevation_deg) {
            return invalid(format!(
                "min_elevation_deg {} is out of range",
                self.predict.min_elevation_deg
            ));
        }
        self.time_step()?;

        Ok(())
    }
}
