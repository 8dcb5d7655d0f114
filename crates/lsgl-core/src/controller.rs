// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::aggregate::{aggregate, DailyCount};
use crate::cache::{QueryCache, QueryKey};
use crate::combine::combine;
use crate::config::TrackerConfig;
use crate::filter::{filter_by_bounds, filter_by_range, retain_last, Clock, DateRange, SystemClock};
use crate::join::{AirportInfo, EnrichedFlight, MetadataIndex};
use crate::records::{
    normalize_aircraft, normalize_airports, normalize_flights, normalize_state_vectors,
    AircraftMetadataRecord, AirportMetadataRecord, DateField, FlightRecord, FlightType, RawRow,
    StateVectorRecord, Timestamp,
};
use crate::transport::{Dataset, RowSource};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Everything one load produced. Replaced as a whole when a load settles.
#[derive(Debug, Default)]
pub struct Datasets {
    pub arrivals: Vec<FlightRecord>,
    pub departures: Vec<FlightRecord>,
    pub arrival_state_vectors: Vec<StateVectorRecord>,
    pub departure_state_vectors: Vec<StateVectorRecord>,
    pub metadata: MetadataIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub arrivals: usize,
    pub departures: usize,
    pub arrival_state_vectors: usize,
    pub departure_state_vectors: usize,
    pub aircraft: usize,
    pub airports: usize,
    pub failures: Vec<String>,
}

/// A dataset after fetch and normalisation.
enum Loaded {
    Flights(FlightType, Vec<FlightRecord>),
    StateVectors(FlightType, Vec<StateVectorRecord>),
    Aircraft(Vec<AircraftMetadataRecord>),
    Airports(Vec<AirportMetadataRecord>),
}

impl Loaded {
    fn from_rows(dataset: Dataset, rows: Vec<RawRow>) -> Self {
        match dataset {
            Dataset::Arrivals => {
                Loaded::Flights(FlightType::Arrival, normalize_flights(rows, FlightType::Arrival))
            }
            Dataset::Departures => Loaded::Flights(
                FlightType::Departure,
                normalize_flights(rows, FlightType::Departure),
            ),
            Dataset::ArrivalStateVectors => {
                Loaded::StateVectors(FlightType::Arrival, normalize_state_vectors(rows))
            }
            Dataset::DepartureStateVectors => {
                Loaded::StateVectors(FlightType::Departure, normalize_state_vectors(rows))
            }
            Dataset::AircraftMetadata => Loaded::Aircraft(normalize_aircraft(rows)),
            Dataset::AirportMetadata => Loaded::Airports(normalize_airports(rows)),
        }
    }
}

/// Raises the processing flag for as long as it lives.
struct Processing<'a>(&'a AtomicUsize);

impl<'a> Processing<'a> {
    fn start(depth: &'a AtomicUsize) -> Self {
        depth.fetch_add(1, Ordering::SeqCst);
        Self(depth)
    }
}

impl Drop for Processing<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owns the loaded datasets and answers filtered/aggregated queries.
///
/// All methods take `&self`: a query may run while a load is in flight and
/// sees whichever datasets were current when it started.
pub struct FlightDataController {
    source: Box<dyn RowSource>,
    clock: Box<dyn Clock>,
    flight_cap: usize,
    default_window_days: u32,
    data: RwLock<Arc<Datasets>>,
    range: RwLock<DateRange>,
    error: RwLock<Option<String>>,
    loading: AtomicBool,
    processing: AtomicUsize,
    misses: AtomicU64,
    flight_cache: Mutex<QueryCache<Vec<EnrichedFlight>>>,
    daily_cache: Mutex<QueryCache<Vec<DailyCount>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FlightDataController {
    pub fn new<S: RowSource + 'static>(source: S, config: &TrackerConfig) -> Self {
        Self {
            source: Box::new(source),
            clock: Box::new(SystemClock),
            flight_cap: config.flight_cap,
            default_window_days: config.default_window_days,
            data: RwLock::new(Arc::new(Datasets::default())),
            range: RwLock::new(DateRange {
                days: config.default_window_days,
                start: None,
                end: None,
            }),
            error: RwLock::new(None),
            loading: AtomicBool::new(false),
            processing: AtomicUsize::new(0),
            misses: AtomicU64::new(0),
            flight_cache: Mutex::new(QueryCache::new(config.flight_cache_capacity)),
            daily_cache: Mutex::new(QueryCache::new(config.daily_cache_capacity)),
        }
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst) > 0
    }

    /// Set only when every dataset of the last load failed.
    pub fn error(&self) -> Option<String> {
        self.error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn date_range(&self) -> DateRange {
        *self.range.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of cache-miss computations so far, across both caches.
    pub fn cache_misses(&self) -> u64 {
        self.misses.load(Ordering::SeqCst)
    }

    /// Current datasets. Cheap; the snapshot stays valid across reloads.
    pub fn datasets(&self) -> Arc<Datasets> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn arrival_state_vectors(&self) -> Vec<StateVectorRecord> {
        self.datasets().arrival_state_vectors.clone()
    }

    pub fn departure_state_vectors(&self) -> Vec<StateVectorRecord> {
        self.datasets().departure_state_vectors.clone()
    }

    /// Fetches and normalises all six datasets concurrently.
    ///
    /// A failed dataset is left empty and does not stop the others. The error
    /// field is set only when all of them fail.
    pub fn load_data(&self) -> LoadSummary {
        self.loading.store(true, Ordering::SeqCst);
        *self.error.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("Loading flight data — datasets={}", Dataset::ALL.len());

        let outcomes: Vec<(Dataset, Result<Loaded, String>)> = Dataset::ALL
            .par_iter()
            .map(|&dataset| {
                let outcome = self
                    .source
                    .fetch_rows(dataset)
                    .map(|rows| Loaded::from_rows(dataset, rows))
                    .map_err(|e| format!("{}: {}", dataset.name(), e));
                (dataset, outcome)
            })
            .collect();

        let mut next = Datasets::default();
        let mut aircraft = Vec::new();
        let mut airports = Vec::new();
        let mut failures = Vec::new();

        for (dataset, outcome) in outcomes {
            match outcome {
                Ok(Loaded::Flights(FlightType::Arrival, rows)) => next.arrivals = rows,
                Ok(Loaded::Flights(FlightType::Departure, rows)) => next.departures = rows,
                Ok(Loaded::StateVectors(FlightType::Arrival, rows)) => {
                    next.arrival_state_vectors = rows
                }
                Ok(Loaded::StateVectors(FlightType::Departure, rows)) => {
                    next.departure_state_vectors = rows
                }
                Ok(Loaded::Aircraft(rows)) => aircraft = rows,
                Ok(Loaded::Airports(rows)) => airports = rows,
                Err(message) => {
                    debug!("Dataset failed — dataset={}", dataset.name());
                    failures.push(message);
                }
            }
        }
        next.metadata = MetadataIndex::new(aircraft, airports);

        if failures.len() == Dataset::ALL.len() {
            error!("All datasets failed to load — errors={}", failures.join("; "));
            *self.error.write().unwrap_or_else(PoisonError::into_inner) =
                Some(format!("Failed to load flight data: {}", failures.join("; ")));
        } else if !failures.is_empty() {
            warn!(
                "Partial load — failed={} errors={}",
                failures.len(),
                failures.join("; ")
            );
        }

        let summary = LoadSummary {
            arrivals: next.arrivals.len(),
            departures: next.departures.len(),
            arrival_state_vectors: next.arrival_state_vectors.len(),
            departure_state_vectors: next.departure_state_vectors.len(),
            aircraft: next.metadata.aircraft().len(),
            airports: next.metadata.airports().len(),
            failures,
        };
        info!(
            "Loaded flight data — arrivals={} departures={} arrival_svs={} departure_svs={} aircraft={} airports={}",
            summary.arrivals,
            summary.departures,
            summary.arrival_state_vectors,
            summary.departure_state_vectors,
            summary.aircraft,
            summary.airports
        );

        *self.data.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        lock(&self.flight_cache).clear();
        lock(&self.daily_cache).clear();

        self.loading.store(false, Ordering::SeqCst);
        summary
    }

    /// Sizes of the current datasets.
    pub fn summary(&self) -> LoadSummary {
        let data = self.datasets();
        LoadSummary {
            arrivals: data.arrivals.len(),
            departures: data.departures.len(),
            arrival_state_vectors: data.arrival_state_vectors.len(),
            departure_state_vectors: data.departure_state_vectors.len(),
            aircraft: data.metadata.aircraft().len(),
            airports: data.metadata.airports().len(),
            failures: Vec::new(),
        }
    }

    /// Stores the range used by `current_flights`/`current_daily_counts`.
    /// `days` falls back to the configured default window.
    pub fn set_date_range(
        &self,
        days: Option<u32>,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) {
        let range = DateRange {
            days: days.unwrap_or(self.default_window_days),
            start,
            end,
        };
        debug!("Date range set — key={}", QueryKey::from(&range));
        *self.range.write().unwrap_or_else(PoisonError::into_inner) = range;
    }

    /// Flights in the window, capped per side, merged and enriched.
    pub fn get_filtered_flights(
        &self,
        days: u32,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Arc<Vec<EnrichedFlight>> {
        self.flights_for(&DateRange::new(days, start, end))
    }

    pub fn get_daily_counts(
        &self,
        days: u32,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Arc<Vec<DailyCount>> {
        self.daily_counts_for(&DateRange::new(days, start, end))
    }

    pub fn current_flights(&self) -> Arc<Vec<EnrichedFlight>> {
        self.flights_for(&self.date_range())
    }

    pub fn current_daily_counts(&self) -> Arc<Vec<DailyCount>> {
        self.daily_counts_for(&self.date_range())
    }

    pub fn get_airport_info(&self, icao: &str) -> Option<AirportInfo> {
        self.datasets().metadata.resolve_airport(icao)
    }

    pub fn get_aircraft_info(&self, icao24: &str) -> Option<AircraftMetadataRecord> {
        self.datasets().metadata.resolve_aircraft(icao24).cloned()
    }

    /// State vectors from both sides sampled within `[start, end]`, by time.
    pub fn state_vectors_in_range(&self, start: Timestamp, end: Timestamp) -> Vec<StateVectorRecord> {
        let data = self.datasets();
        let mut hits: Vec<StateVectorRecord> = filter_by_bounds(
            &data.arrival_state_vectors,
            start,
            end,
            DateField::RequestedTime,
        )
        .into_iter()
        .chain(filter_by_bounds(
            &data.departure_state_vectors,
            start,
            end,
            DateField::RequestedTime,
        ))
        .cloned()
        .collect();
        hits.sort_by_key(|sv| sv.requested_time);
        hits
    }

    fn flights_for(&self, range: &DateRange) -> Arc<Vec<EnrichedFlight>> {
        let key = QueryKey::from(range);
        // Held across the computation so check-then-insert is atomic
        let mut cache = lock(&self.flight_cache);
        if let Some(hit) = cache.get(&key) {
            debug!("Flight cache hit — key={}", key);
            return hit;
        }

        let _processing = Processing::start(&self.processing);
        self.misses.fetch_add(1, Ordering::SeqCst);
        let flights = Arc::new(self.compute_flights(range));
        debug!("Flight cache miss — key={} flights={}", key, flights.len());

        if let Some(evicted) = cache.insert(key, flights.clone()) {
            debug!("Flight cache evicted — key={}", evicted);
        }
        flights
    }

    fn daily_counts_for(&self, range: &DateRange) -> Arc<Vec<DailyCount>> {
        let key = QueryKey::from(range);
        let mut cache = lock(&self.daily_cache);
        if let Some(hit) = cache.get(&key) {
            debug!("Daily cache hit — key={}", key);
            return hit;
        }

        let _processing = Processing::start(&self.processing);
        self.misses.fetch_add(1, Ordering::SeqCst);
        let flights = self.flights_for(range);
        let counts = Arc::new(aggregate(flights.as_slice()));
        debug!("Daily cache miss — key={} days={}", key, counts.len());

        if let Some(evicted) = cache.insert(key, counts.clone()) {
            debug!("Daily cache evicted — key={}", evicted);
        }
        counts
    }

    fn compute_flights(&self, range: &DateRange) -> Vec<EnrichedFlight> {
        let data = self.datasets();
        let today = self.clock.today();
        let per_side = self.flight_cap / 2;

        let arrivals = filter_by_range(&data.arrivals, range, DateField::ArrivalDate, today);
        let departures = filter_by_range(&data.departures, range, DateField::DepartureDate, today);
        let arrivals = retain_last(arrivals, per_side);
        let departures = retain_last(departures, per_side);

        combine(arrivals, departures)
            .into_iter()
            .map(|flight| data.metadata.enrich(flight))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FixedClock;
    use crate::records::RawValue;
    use crate::transport::FetchError;
    use chrono::NaiveDate;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), RawValue::Text(v.to_string())))
            .collect()
    }

    fn today() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
    }

    #[test]
    fn test_processing_guard_nests() {
        let depth = AtomicUsize::new(0);
        {
            let _outer = Processing::start(&depth);
            {
                let _inner = Processing::start(&depth);
                assert_eq!(depth.load(Ordering::SeqCst), 2);
            }
            assert_eq!(depth.load(Ordering::SeqCst), 1);
        }
        assert_eq!(depth.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cap_applies_per_side_before_combining() {
        let source = |dataset: Dataset| -> Result<Vec<RawRow>, FetchError> {
            Ok(match dataset {
                Dataset::Arrivals => (1..=5)
                    .map(|d| row(&[("arrival_date", format!("2024-01-0{}", d).as_str())]))
                    .collect(),
                Dataset::Departures => vec![row(&[("departure_date", "2024-01-01")])],
                _ => Vec::new(),
            })
        };
        let config = TrackerConfig {
            flight_cap: 4,
            ..TrackerConfig::default()
        };
        let controller = FlightDataController::new(source, &config).with_clock(today());
        controller.load_data();

        let flights = controller.get_filtered_flights(30, None, None);
        // Two most recent arrivals plus the lone departure
        assert_eq!(flights.len(), 3);
        let days: Vec<String> = flights
            .iter()
            .map(|f| f.flight.primary_date().unwrap().format("%d").to_string())
            .collect();
        assert_eq!(days, vec!["01", "04", "05"]);
    }

    #[test]
    fn test_set_date_range_defaults_days() {
        let source = |_: Dataset| -> Result<Vec<RawRow>, FetchError> { Ok(Vec::new()) };
        let controller = FlightDataController::new(source, &TrackerConfig::default());

        controller.set_date_range(Some(30), None, None);
        assert_eq!(controller.date_range().days, 30);
        controller.set_date_range(None, None, None);
        assert_eq!(controller.date_range(), DateRange::default());
    }
}
