// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::config::{DatasetFiles, TrackerConfig};
use crate::records::{RawRow, RawValue};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// The six datasets fetched by one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataset {
    Arrivals,
    Departures,
    ArrivalStateVectors,
    DepartureStateVectors,
    AircraftMetadata,
    AirportMetadata,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::Arrivals,
        Dataset::Departures,
        Dataset::ArrivalStateVectors,
        Dataset::DepartureStateVectors,
        Dataset::AircraftMetadata,
        Dataset::AirportMetadata,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dataset::Arrivals => "arrivals",
            Dataset::Departures => "departures",
            Dataset::ArrivalStateVectors => "arrival_state_vectors",
            Dataset::DepartureStateVectors => "departure_state_vectors",
            Dataset::AircraftMetadata => "aircraft_metadata",
            Dataset::AirportMetadata => "airport_metadata",
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to fetch {file}: {status}")]
    Status {
        file: String,
        status: reqwest::StatusCode,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Dataset file not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Where raw rows come from. Implementations must be shareable across the
/// worker threads a load fans out to.
pub trait RowSource: Send + Sync {
    fn fetch_rows(&self, dataset: Dataset) -> Result<Vec<RawRow>, FetchError>;
}

impl<F> RowSource for F
where
    F: Fn(Dataset) -> Result<Vec<RawRow>, FetchError> + Send + Sync,
{
    fn fetch_rows(&self, dataset: Dataset) -> Result<Vec<RawRow>, FetchError> {
        self(dataset)
    }
}

/// Parses CSV text with a header row into loosely-typed rows.
///
/// Record lengths may vary; missing trailing cells are left out of the row
/// and cells beyond the header are dropped. Rows with only empty cells are
/// skipped.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<RawRow>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    let mut overlong = 0usize;

    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        if record.len() > headers.len() {
            overlong += 1;
        }
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(name, field)| (name.to_string(), RawValue::from_csv_field(field)))
            .collect();
        rows.push(row);
    }

    if overlong > 0 {
        debug!("Dropped cells beyond header width — rows_affected={}", overlong);
    }
    Ok(rows)
}

/// Fetches `{base_url}/{file}` over HTTP.
pub struct HttpSource {
    client: reqwest::blocking::Client,
    base_url: String,
    files: DatasetFiles,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, files: DatasetFiles, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            files,
        })
    }

    pub fn from_config(config: &TrackerConfig) -> Result<Self, FetchError> {
        Self::new(
            config.base_url.clone(),
            config.files.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn url_for(&self, dataset: Dataset) -> String {
        format!("{}/{}", self.base_url, self.files.file_for(dataset))
    }
}

impl RowSource for HttpSource {
    fn fetch_rows(&self, dataset: Dataset) -> Result<Vec<RawRow>, FetchError> {
        let url = self.url_for(dataset);
        info!("Fetching dataset — dataset={} url={}", dataset.name(), url);

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                file: self.files.file_for(dataset).to_string(),
                status,
            });
        }
        let bytes = response.bytes()?;
        debug!(
            "Downloaded dataset — dataset={} bytes={}",
            dataset.name(),
            bytes.len()
        );

        Ok(parse_csv(&bytes[..])?)
    }
}

/// Reads dataset files from a local directory.
pub struct DirSource {
    dir: PathBuf,
    files: DatasetFiles,
}

impl DirSource {
    pub fn new<P: AsRef<Path>>(dir: P, files: DatasetFiles) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            files,
        }
    }

    pub fn path_for(&self, dataset: Dataset) -> PathBuf {
        self.dir.join(self.files.file_for(dataset))
    }
}

impl RowSource for DirSource {
    fn fetch_rows(&self, dataset: Dataset) -> Result<Vec<RawRow>, FetchError> {
        let path = self.path_for(dataset);
        if !path.exists() {
            return Err(FetchError::NotFound(path));
        }
        debug!(
            "Reading dataset — dataset={} path={}",
            dataset.name(),
            path.display()
        );
        let file = File::open(&path)?;
        Ok(parse_csv(file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_typing_and_shape() {
        let data = "\
ICAO24,arrival_date,altitude,on_ground
4b1805,2024-01-10,1200,false

abc123,,,
,,,
def456,2024-01-11
";
        let rows = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0]["ICAO24"], RawValue::Text("4b1805".into()));
        assert_eq!(rows[0]["altitude"], RawValue::Number(1200.0));
        assert_eq!(rows[0]["on_ground"], RawValue::Bool(false));
        assert_eq!(rows[1]["arrival_date"], RawValue::Null);
        assert!(!rows[2].contains_key("altitude"));
    }

    #[test]
    fn test_parse_csv_drops_extra_cells() {
        let rows = parse_csv("a,b\n1,2,3\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn test_dir_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirSource::new(dir.path(), DatasetFiles::default());
        let err = source.fetch_rows(Dataset::Arrivals).unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
        assert!(err.to_string().contains("bl_arr_all.csv"));
    }

    #[test]
    fn test_http_source_urls() {
        let source = HttpSource::new(
            "https://example.invalid/data/",
            DatasetFiles::default(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            source.url_for(Dataset::DepartureStateVectors),
            "https://example.invalid/data/bl_dep_SV_all.csv"
        );
    }

    #[test]
    fn test_closure_source() {
        let source = |dataset: Dataset| -> Result<Vec<RawRow>, FetchError> {
            match dataset {
                Dataset::Arrivals => Ok(vec![RawRow::new()]),
                _ => Ok(Vec::new()),
            }
        };
        assert_eq!(source.fetch_rows(Dataset::Arrivals).unwrap().len(), 1);
        assert!(source.fetch_rows(Dataset::AirportMetadata).unwrap().is_empty());
    }

    #[test]
    fn test_dataset_names_are_unique() {
        let names: std::collections::HashSet<_> = Dataset::ALL.iter().map(|d| d.name()).collect();
        assert_eq!(names.len(), Dataset::ALL.len());
    }
}
