//! Run configuration loading and validation.
//!
//! A run is described by a TOML file. Every key is optional; missing keys
//! fall back to [`RunConfig::default`].

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::simulation::signal_calculations::{DirectionalGains, PathLossParameters};
use crate::simulation::types::{CollisionFidelity, Point, RadioMode};

/// Error type for configuration loading failures.
#[derive(Debug)]
pub enum ConfigLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl ConfigLoadError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ConfigLoadError::FileReadError(_) => 64,
            ConfigLoadError::ParseError(_) | ConfigLoadError::ValidationError(_) => 65,
        }
    }
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            ConfigLoadError::ParseError(msg) => write!(f, "Failed to parse TOML: {}", msg),
            ConfigLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigLoadError {}

/// Parameters of one simulation run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Devices created around each station.
    pub devices_per_station: usize,
    /// Mean of the exponential waiting time between transmissions (ms).
    pub mean_send_interval_ms: u64,
    pub radio_mode: RadioMode,
    /// Virtual run length (ms).
    pub duration_ms: u64,
    pub collision_check: CollisionFidelity,
    /// Devices point a directional antenna at their home station.
    pub directional_antennas: bool,
    pub station_count: usize,
    /// Distance between neighbouring stations of the preset layouts (m).
    pub station_spacing: f64,
    /// 1 means all stations form one network; anything else gives every
    /// station its own network that only counts its own devices.
    pub networks: u32,
    pub seed: u64,
    /// Payload length in bytes.
    pub payload_length: usize,
    pub path_loss: PathLossParameters,
    pub directional_gains: DirectionalGains,
    /// Overrides the preset layout for `station_count`.
    pub station_positions: Option<Vec<Point>>,
    /// Minimum distance between any two devices (m).
    pub min_device_separation: f64,
    /// Position draws per device before placement gives up.
    pub placement_retries: u32,
    /// Directory receiving the `exp{mode}BS{stations}.dat` result files.
    pub results_dir: PathBuf,
    /// Optional JSON run report.
    pub report_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            devices_per_station: 100,
            mean_send_interval_ms: 1_000_000,
            radio_mode: RadioMode::DistanceOptimized,
            duration_ms: 86_400_000,
            collision_check: CollisionFidelity::Full,
            directional_antennas: true,
            station_count: 1,
            station_spacing: 100.0,
            networks: 1,
            seed: 1,
            payload_length: 20,
            path_loss: PathLossParameters::default(),
            directional_gains: DirectionalGains::default(),
            station_positions: None,
            min_device_separation: 0.0,
            placement_retries: 100,
            results_dir: PathBuf::from("results"),
            report_path: None,
        }
    }
}

impl RunConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(config_path: &Path) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))
            .map_err(|e| ConfigLoadError::FileReadError(format!("{:#}", e)))?;

        let config = Self::from_toml(&content)?;
        log::debug!("Loaded run configuration from {}", config_path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigLoadError> {
        let config: RunConfig = toml::from_str(content)
            .context("Invalid TOML format")
            .map_err(|e| ConfigLoadError::ParseError(format!("{:#}", e)))?;

        validate_config(&config).map_err(ConfigLoadError::ValidationError)?;
        Ok(config)
    }

    /// Whether all stations share one network.
    pub fn shared_network(&self) -> bool {
        self.networks == 1
    }
}

/// Check value ranges the engine relies on.
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
pub fn validate_config(config: &RunConfig) -> Result<(), String> {
    const MAX_STATIONS: usize = 1000;
    const MAX_PAYLOAD: usize = 255;

    if config.station_count == 0 || config.station_count > MAX_STATIONS {
        return Err(format!("station_count {} must be within 1-{}", config.station_count, MAX_STATIONS));
    }
    if config.mean_send_interval_ms == 0 {
        return Err("mean_send_interval_ms must be positive".to_string());
    }
    if config.duration_ms == 0 {
        return Err("duration_ms must be positive".to_string());
    }
    if config.payload_length > MAX_PAYLOAD {
        return Err(format!("payload_length {} exceeds maximum of {}", config.payload_length, MAX_PAYLOAD));
    }
    if config.networks == 0 {
        return Err("networks must be at least 1".to_string());
    }
    if !config.station_spacing.is_finite() || config.station_spacing < 0.0 {
        return Err(format!("Invalid station_spacing {}, must be non-negative", config.station_spacing));
    }
    if !config.min_device_separation.is_finite() || config.min_device_separation < 0.0 {
        return Err(format!(
            "Invalid min_device_separation {}, must be non-negative",
            config.min_device_separation
        ));
    }
    if config.placement_retries == 0 {
        return Err("placement_retries must be at least 1".to_string());
    }

    let path_loss = &config.path_loss;
    if path_loss.path_loss_exponent <= 0.0 {
        return Err("Invalid path_loss_exponent, must be positive".to_string());
    }
    if path_loss.reference_distance <= 0.0 {
        return Err("Invalid reference_distance, must be positive".to_string());
    }

    if let Some(positions) = &config.station_positions {
        if positions.len() != config.station_count {
            return Err(format!(
                "station_positions lists {} stations, station_count is {}",
                positions.len(),
                config.station_count
            ));
        }
        if let Some((idx, p)) = positions.iter().enumerate().find(|(_, p)| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(format!("Station {} position ({}, {}) is not finite", idx, p.x, p.y));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = RunConfig::from_toml("").unwrap();
        assert_eq!(config.payload_length, 20);
        assert_eq!(config.radio_mode, RadioMode::DistanceOptimized);
        assert!(config.shared_network());
        assert_eq!(config.path_loss.reference_distance, 40.0);
    }

    #[test]
    fn parses_full_run_description() {
        let content = r#"
            devices_per_station = 5
            mean_send_interval_ms = 2000
            radio_mode = "fixed-fast"
            duration_ms = 60000
            collision_check = "simplified"
            directional_antennas = false
            station_count = 2
            networks = 2
            seed = 99
            station_positions = [{ x = 0.0, y = 0.0 }, { x = 50.0, y = 0.0 }]

            [path_loss]
            path_loss_exponent = 2.5

            [directional_gains]
            within_30 = 6.0
        "#;
        let config = RunConfig::from_toml(content).unwrap();
        assert_eq!(config.devices_per_station, 5);
        assert_eq!(config.radio_mode, RadioMode::FixedFast);
        assert_eq!(config.collision_check, CollisionFidelity::Simplified);
        assert!(!config.shared_network());
        assert_eq!(config.path_loss.path_loss_exponent, 2.5);
        assert_eq!(config.path_loss.path_loss_at_reference_distance, 127.41);
        assert_eq!(config.directional_gains.within_30, 6.0);
        assert_eq!(config.directional_gains.beyond_150, -3.0);
        assert_eq!(config.station_positions.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn rejects_unknown_radio_mode() {
        let err = RunConfig::from_toml("radio_mode = \"turbo\"").unwrap_err();
        assert!(matches!(err, ConfigLoadError::ParseError(_)));
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut config = RunConfig::default();
        assert!(validate_config(&config).is_ok());

        config.station_count = 0;
        assert!(validate_config(&config).is_err());

        config = RunConfig::default();
        config.station_count = 3;
        config.station_positions = Some(vec![Point::new(0.0, 0.0)]);
        let err = validate_config(&config).unwrap_err();
        assert!(err.contains("station_positions"));

        config = RunConfig::default();
        config.mean_send_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = RunConfig::load(Path::new("/nonexistent/run.toml")).unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileReadError(_)));
        assert_eq!(err.exit_code(), 64);
    }
}
