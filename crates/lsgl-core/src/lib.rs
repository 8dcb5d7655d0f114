// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

pub mod aggregate;
pub mod cache;
pub mod combine;
pub mod config;
pub mod controller;
pub mod filter;
pub mod join;
pub mod records;
pub mod transport;

use std::path::PathBuf;

pub use aggregate::DailyCount;
pub use config::TrackerConfig;
pub use controller::{FlightDataController, LoadSummary};
pub use filter::{Clock, DateRange, FixedClock, SystemClock};
pub use join::{AirportInfo, EnrichedFlight};
pub use records::{FlightRecord, FlightType, RawRow, RawValue, StateVectorRecord, Timestamp};
pub use transport::{Dataset, DirSource, FetchError, HttpSource, RowSource};

/// Per-user config directory, or the working directory when the platform
/// has none.
pub fn get_config_root() -> PathBuf {
    directories::ProjectDirs::from("org", "lsgl", "LSGL-Tracker")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
