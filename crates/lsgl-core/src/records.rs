// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Timestamp = DateTime<Utc>;

/// A loosely-typed CSV cell, typed the way the loader guesses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// One source row: header name -> cell.
pub type RawRow = BTreeMap<String, RawValue>;

impl RawValue {
    /// Dynamic typing for a single CSV field.
    ///
    /// Empty cells become `Null`, `true`/`false` become booleans and finite
    /// numerals become numbers. A numeral is only typed as a number when
    /// `as_text` renders it back to the same characters, so `"007"`,
    /// `"1.50"` and hex addresses such as `"39e123"` stay text.
    pub fn from_csv_field(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return RawValue::Null;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return RawValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return RawValue::Bool(false);
        }
        if looks_numeric(trimmed) {
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() && number_text(n) == trimmed {
                    return RawValue::Number(n);
                }
            }
        }
        RawValue::Text(trimmed.to_string())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for identifiers and labels. `None` for empty cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Number(n) => Some(number_text(*n)),
            RawValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            }
        }
    }
}

fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn looks_numeric(s: &str) -> bool {
    // f64::from_str also accepts "inf" and "NaN"; those are text here
    s.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightType {
    Arrival,
    Departure,
}

impl FlightType {
    /// The date a flight of this type is sorted, filtered and bucketed by.
    pub fn primary_field(self) -> DateField {
        match self {
            FlightType::Arrival => DateField::ArrivalDate,
            FlightType::Departure => DateField::DepartureDate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    DepartureDate,
    ArrivalDate,
    DepartureTime,
    ArrivalTime,
    RequestedTime,
}

/// Records that expose typed timestamps by field.
pub trait Dated {
    fn date(&self, field: DateField) -> Option<Timestamp>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub flight_type: FlightType,
    pub aircraft_icao24: Option<String>,
    pub origin_airport_icao: Option<String>,
    pub destination_airport_icao: Option<String>,
    pub departure_date: Option<Timestamp>,
    pub arrival_date: Option<Timestamp>,
    pub departure_time: Option<Timestamp>,
    pub arrival_time: Option<Timestamp>,
    /// Source columns this crate does not interpret, kept as-is.
    #[serde(flatten)]
    pub extra: RawRow,
}

impl FlightRecord {
    pub fn primary_date(&self) -> Option<Timestamp> {
        self.date(self.flight_type.primary_field())
    }

    /// The airport at the other end of the trip: origin for arrivals,
    /// destination for departures.
    pub fn remote_airport(&self) -> Option<&str> {
        match self.flight_type {
            FlightType::Arrival => self.origin_airport_icao.as_deref(),
            FlightType::Departure => self.destination_airport_icao.as_deref(),
        }
    }
}

impl Dated for FlightRecord {
    fn date(&self, field: DateField) -> Option<Timestamp> {
        match field {
            DateField::DepartureDate => self.departure_date,
            DateField::ArrivalDate => self.arrival_date,
            DateField::DepartureTime => self.departure_time,
            DateField::ArrivalTime => self.arrival_time,
            DateField::RequestedTime => None,
        }
    }
}

impl AsRef<FlightRecord> for FlightRecord {
    fn as_ref(&self) -> &FlightRecord {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVectorRecord {
    pub requested_time: Option<Timestamp>,
    pub arrival_date: Option<Timestamp>,
    pub departure_date: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: RawRow,
}

impl Dated for StateVectorRecord {
    fn date(&self, field: DateField) -> Option<Timestamp> {
        match field {
            DateField::RequestedTime => self.requested_time,
            DateField::ArrivalDate => self.arrival_date,
            DateField::DepartureDate => self.departure_date,
            DateField::DepartureTime | DateField::ArrivalTime => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftMetadataRecord {
    /// Transponder address as spelled in the registry (`icao24` or `ICAO24`).
    pub icao24: Option<String>,
    #[serde(flatten)]
    pub fields: RawRow,
}

impl AircraftMetadataRecord {
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(RawValue::as_text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportMetadataRecord {
    #[serde(flatten)]
    pub fields: RawRow,
}

/// Column spellings that may carry an airport's code, highest priority first.
pub const AIRPORT_CODE_FIELDS: [&str; 4] = ["icao", "ICAO", "ident", "gps_code"];

impl AirportMetadataRecord {
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(RawValue::as_text)
    }

    /// First non-empty code column in priority order.
    pub fn code(&self) -> Option<String> {
        AIRPORT_CODE_FIELDS.iter().find_map(|f| self.field(f))
    }
}

const NAIVE_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a date or date-time cell. Unparseable input yields `None`.
///
/// Numbers are Unix epoch seconds; naive text is read as UTC.
pub fn parse_timestamp(value: &RawValue) -> Option<Timestamp> {
    match value {
        RawValue::Number(secs) => epoch_seconds(*secs),
        RawValue::Text(s) => parse_text_timestamp(s),
        RawValue::Null | RawValue::Bool(_) => None,
    }
}

pub fn epoch_seconds(secs: f64) -> Option<Timestamp> {
    if !secs.is_finite() {
        return None;
    }
    let millis = (secs * 1000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    Utc.timestamp_millis_opt(millis as i64).single()
}

fn parse_text_timestamp(s: &str) -> Option<Timestamp> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::default()).and_utc())
}

fn take_timestamp(row: &mut RawRow, field: &str) -> Option<Timestamp> {
    row.remove(field).as_ref().and_then(parse_timestamp)
}

fn take_text(row: &mut RawRow, names: &[&str]) -> Option<String> {
    let mut found = None;
    for name in names {
        if let Some(value) = row.remove(*name) {
            if found.is_none() {
                found = value.as_text();
            }
        }
    }
    found
}

/// Types flight rows for one dataset. `flight_type` comes from the dataset,
/// never from the row.
pub fn normalize_flights(rows: Vec<RawRow>, flight_type: FlightType) -> Vec<FlightRecord> {
    rows.into_iter()
        .map(|mut row| {
            row.remove("flight_type");
            FlightRecord {
                flight_type,
                aircraft_icao24: take_text(&mut row, &["ICAO24", "icao24"]),
                origin_airport_icao: take_text(&mut row, &["departure_airport_ICAO"]),
                destination_airport_icao: take_text(&mut row, &["destination_airport_ICAO"]),
                departure_date: take_timestamp(&mut row, "departure_date"),
                arrival_date: take_timestamp(&mut row, "arrival_date"),
                departure_time: take_timestamp(&mut row, "departure_time"),
                arrival_time: take_timestamp(&mut row, "arrival_time"),
                extra: row,
            }
        })
        .collect()
}

pub fn normalize_state_vectors(rows: Vec<RawRow>) -> Vec<StateVectorRecord> {
    rows.into_iter()
        .map(|mut row| {
            let requested_time = match row.remove("requested_time") {
                Some(RawValue::Number(secs)) => epoch_seconds(secs),
                Some(RawValue::Text(s)) => s.trim().parse::<f64>().ok().and_then(epoch_seconds),
                _ => None,
            };
            StateVectorRecord {
                requested_time,
                arrival_date: take_timestamp(&mut row, "arrival_date"),
                departure_date: take_timestamp(&mut row, "departure_date"),
                extra: row,
            }
        })
        .collect()
}

pub fn normalize_aircraft(rows: Vec<RawRow>) -> Vec<AircraftMetadataRecord> {
    rows.into_iter()
        .map(|mut row| AircraftMetadataRecord {
            icao24: take_text(&mut row, &["ICAO24", "icao24"]),
            fields: row,
        })
        .collect()
}

pub fn normalize_airports(rows: Vec<RawRow>) -> Vec<AirportMetadataRecord> {
    rows.into_iter()
        .map(|fields| AirportMetadataRecord { fields })
        .collect()
}
