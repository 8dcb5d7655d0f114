// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::records::{AircraftMetadataRecord, AirportMetadataRecord, FlightRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display projection of an airport registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportInfo {
    pub name: String,
    pub country: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedFlight {
    #[serde(flatten)]
    pub flight: FlightRecord,
    pub aircraft_metadata: Option<AircraftMetadataRecord>,
    pub airport_info: Option<AirportInfo>,
}

impl AsRef<FlightRecord> for EnrichedFlight {
    fn as_ref(&self) -> &FlightRecord {
        &self.flight
    }
}

fn aircraft_key(icao24: &str) -> String {
    icao24.trim().to_lowercase()
}

fn airport_key(icao: &str) -> String {
    icao.trim().to_uppercase()
}

/// Reference tables with a hash index on the normalised join key.
///
/// Aircraft keys fold to lowercase, airport keys to uppercase. When a key
/// repeats, the first row in source order wins.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    aircraft: Vec<AircraftMetadataRecord>,
    airports: Vec<AirportMetadataRecord>,
    aircraft_by_key: HashMap<String, usize>,
    airports_by_key: HashMap<String, usize>,
}

impl MetadataIndex {
    pub fn new(aircraft: Vec<AircraftMetadataRecord>, airports: Vec<AirportMetadataRecord>) -> Self {
        let mut aircraft_by_key = HashMap::with_capacity(aircraft.len());
        for (i, record) in aircraft.iter().enumerate() {
            if let Some(code) = &record.icao24 {
                aircraft_by_key.entry(aircraft_key(code)).or_insert(i);
            }
        }

        let mut airports_by_key = HashMap::with_capacity(airports.len());
        for (i, record) in airports.iter().enumerate() {
            if let Some(code) = record.code() {
                airports_by_key.entry(airport_key(&code)).or_insert(i);
            }
        }

        Self {
            aircraft,
            airports,
            aircraft_by_key,
            airports_by_key,
        }
    }

    pub fn aircraft(&self) -> &[AircraftMetadataRecord] {
        &self.aircraft
    }

    pub fn airports(&self) -> &[AirportMetadataRecord] {
        &self.airports
    }

    pub fn resolve_aircraft(&self, icao24: &str) -> Option<&AircraftMetadataRecord> {
        let key = aircraft_key(icao24);
        if key.is_empty() {
            return None;
        }
        self.aircraft_by_key.get(&key).map(|&i| &self.aircraft[i])
    }

    pub fn airport_record(&self, icao: &str) -> Option<&AirportMetadataRecord> {
        let key = airport_key(icao);
        if key.is_empty() {
            return None;
        }
        self.airports_by_key.get(&key).map(|&i| &self.airports[i])
    }

    /// Name, country and city for an airport code. The code itself stands in
    /// for a missing name.
    pub fn resolve_airport(&self, icao: &str) -> Option<AirportInfo> {
        let record = self.airport_record(icao)?;
        Some(AirportInfo {
            name: record
                .field("name")
                .unwrap_or_else(|| icao.trim().to_string()),
            country: record.field("country").or_else(|| record.field("iso_country")),
            city: record.field("city").or_else(|| record.field("municipality")),
        })
    }

    pub fn enrich(&self, flight: &FlightRecord) -> EnrichedFlight {
        let aircraft_metadata = flight
            .aircraft_icao24
            .as_deref()
            .and_then(|code| self.resolve_aircraft(code))
            .cloned();
        let airport_info = flight
            .remote_airport()
            .and_then(|code| self.resolve_airport(code));

        EnrichedFlight {
            flight: flight.clone(),
            aircraft_metadata,
            airport_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        normalize_aircraft, normalize_airports, normalize_flights, FlightType, RawRow, RawValue,
    };

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), RawValue::Text(v.to_string())))
            .collect()
    }

    fn sample_index() -> MetadataIndex {
        let aircraft = normalize_aircraft(vec![
            row(&[("icao24", "abc123"), ("registration", "HB-FOX")]),
            row(&[("ICAO24", "ABC123"), ("registration", "HB-DUP")]),
            row(&[("icao24", "4b1805"), ("registration", "HB-KOF")]),
        ]);
        let airports = normalize_airports(vec![
            row(&[
                ("ident", "LSGL"),
                ("name", "Lausanne-Blécherette"),
                ("iso_country", "CH"),
                ("municipality", "Lausanne"),
            ]),
            row(&[("icao", "lsgg"), ("country", "Switzerland"), ("city", "Geneva")]),
            row(&[("gps_code", "LFLB")]),
        ]);
        MetadataIndex::new(aircraft, airports)
    }

    #[test]
    fn test_aircraft_lookup_is_case_insensitive() {
        let index = sample_index();
        let hit = index.resolve_aircraft("ABC123").unwrap();
        assert_eq!(hit.field("registration").as_deref(), Some("HB-FOX"));
        assert!(index.resolve_aircraft(" 4B1805 ").is_some());
        assert!(index.resolve_aircraft("ffffff").is_none());
        assert!(index.resolve_aircraft("").is_none());
    }

    #[test]
    fn test_first_duplicate_wins() {
        let index = sample_index();
        let hit = index.resolve_aircraft("abc123").unwrap();
        assert_eq!(hit.field("registration").as_deref(), Some("HB-FOX"));
    }

    #[test]
    fn test_airport_projection() {
        let index = sample_index();

        let lsgl = index.resolve_airport("lsgl").unwrap();
        assert_eq!(lsgl.name, "Lausanne-Blécherette");
        assert_eq!(lsgl.country.as_deref(), Some("CH"));
        assert_eq!(lsgl.city.as_deref(), Some("Lausanne"));

        let lsgg = index.resolve_airport("LSGG").unwrap();
        assert_eq!(lsgg.name, "LSGG");
        assert_eq!(lsgg.city.as_deref(), Some("Geneva"));

        let lflb = index.resolve_airport("LFLB").unwrap();
        assert_eq!(lflb.name, "LFLB");
        assert_eq!(lflb.country, None);

        assert!(index.resolve_airport("KJFK").is_none());
    }

    #[test]
    fn test_empty_tables_never_match() {
        let index = MetadataIndex::default();
        assert!(index.resolve_aircraft("abc123").is_none());
        assert!(index.resolve_airport("LSGL").is_none());
    }

    #[test]
    fn test_enrich_uses_remote_airport() {
        let index = sample_index();
        let flights = normalize_flights(
            vec![row(&[
                ("ICAO24", "ABC123"),
                ("departure_airport_ICAO", "LSGL"),
                ("destination_airport_ICAO", "LSGG"),
            ])],
            FlightType::Departure,
        );

        let enriched = index.enrich(&flights[0]);
        assert_eq!(
            enriched.aircraft_metadata.and_then(|a| a.field("registration")),
            Some("HB-FOX".to_string())
        );
        assert_eq!(enriched.airport_info.map(|a| a.name), Some("LSGG".to_string()));
    }
}
