// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::cache::{DAILY_CACHE_CAPACITY, FLIGHT_CACHE_CAPACITY};
use crate::filter::DEFAULT_WINDOW_DAYS;
use crate::transport::Dataset;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/loz-airport/LSGL_tracker/master/data_raw";
pub const DEFAULT_FLIGHT_CAP: usize = 1000;
const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// File name of each dataset under the base URL or directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetFiles {
    pub arrivals: String,
    pub departures: String,
    pub arrival_state_vectors: String,
    pub departure_state_vectors: String,
    pub aircraft_metadata: String,
    pub airport_metadata: String,
}

impl Default for DatasetFiles {
    fn default() -> Self {
        Self {
            arrivals: "bl_arr_all.csv".to_string(),
            departures: "bl_dep_all.csv".to_string(),
            arrival_state_vectors: "bl_arr_SV_all.csv".to_string(),
            departure_state_vectors: "bl_dep_SV_all.csv".to_string(),
            aircraft_metadata: "aircraft_metadata.csv".to_string(),
            airport_metadata: "airport_metadata.csv".to_string(),
        }
    }
}

impl DatasetFiles {
    pub fn file_for(&self, dataset: Dataset) -> &str {
        match dataset {
            Dataset::Arrivals => &self.arrivals,
            Dataset::Departures => &self.departures,
            Dataset::ArrivalStateVectors => &self.arrival_state_vectors,
            Dataset::DepartureStateVectors => &self.departure_state_vectors,
            Dataset::AircraftMetadata => &self.aircraft_metadata,
            Dataset::AirportMetadata => &self.airport_metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub base_url: String,
    pub files: DatasetFiles,
    pub timeout_secs: u64,
    /// Total flights kept per query; each side gets half.
    pub flight_cap: usize,
    pub flight_cache_capacity: usize,
    pub daily_cache_capacity: usize,
    pub default_window_days: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            files: DatasetFiles::default(),
            timeout_secs: 30,
            flight_cap: DEFAULT_FLIGHT_CAP,
            flight_cache_capacity: FLIGHT_CACHE_CAPACITY,
            daily_cache_capacity: DAILY_CACHE_CAPACITY,
            default_window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl TrackerConfig {
    pub fn default_path() -> PathBuf {
        crate::get_config_root().join(CONFIG_FILE)
    }

    /// Loads the config at `path`, falling back to defaults if it is missing
    /// or unreadable.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);

        if !path.exists() {
            debug!("No config file; using defaults — path={}", path.display());
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Ignoring unreadable config — path={} error={}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "flight_cap": 200, "files": { "arrivals": "arr.csv" } }"#).unwrap();

        let config = TrackerConfig::load_from(&path).unwrap();
        assert_eq!(config.flight_cap, 200);
        assert_eq!(config.files.arrivals, "arr.csv");
        assert_eq!(config.files.departures, "bl_dep_all.csv");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.default_window_days, 7);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = TrackerConfig {
            timeout_secs: 5,
            ..TrackerConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(TrackerConfig::load(Some(&path)), config);
    }

    #[test]
    fn test_corrupt_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(TrackerConfig::load_from(&path), Err(ConfigError::Json(_))));
        assert_eq!(TrackerConfig::load(Some(&path)), TrackerConfig::default());
    }

    #[test]
    fn test_file_for_each_dataset() {
        let files = DatasetFiles::default();
        assert_eq!(files.file_for(Dataset::Arrivals), "bl_arr_all.csv");
        assert_eq!(files.file_for(Dataset::ArrivalStateVectors), "bl_arr_SV_all.csv");
        assert_eq!(files.file_for(Dataset::AirportMetadata), "airport_metadata.csv");
    }
}
