// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::records::{FlightRecord, FlightType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub arrivals: usize,
    pub departures: usize,
}

impl DailyCount {
    pub fn total(&self) -> usize {
        self.arrivals + self.departures
    }
}

/// Buckets flights by the UTC calendar day of their primary date.
/// Undated flights are skipped. Output is ascending by date.
pub fn aggregate<F: AsRef<FlightRecord>>(flights: &[F]) -> Vec<DailyCount> {
    let mut buckets: BTreeMap<NaiveDate, DailyCount> = BTreeMap::new();

    for flight in flights {
        let flight = flight.as_ref();
        let Some(date) = flight.primary_date().map(|d| d.date_naive()) else {
            continue;
        };
        let bucket = buckets.entry(date).or_insert(DailyCount {
            date,
            arrivals: 0,
            departures: 0,
        });
        match flight.flight_type {
            FlightType::Arrival => bucket.arrivals += 1,
            FlightType::Departure => bucket.departures += 1,
        }
    }

    buckets.into_values().collect()
}
