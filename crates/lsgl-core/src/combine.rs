// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::records::FlightRecord;
use std::cmp::Ordering;

/// Orders flights by primary date. Undated flights sort after every dated one.
pub fn by_primary_date(a: &FlightRecord, b: &FlightRecord) -> Ordering {
    match (a.primary_date(), b.primary_date()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Merges arrivals and departures into one chronological sequence.
///
/// The sort is stable: ties keep arrivals ahead of departures, each in
/// source order.
pub fn combine<F: AsRef<FlightRecord>>(arrivals: Vec<F>, departures: Vec<F>) -> Vec<F> {
    let mut all = arrivals;
    all.extend(departures);
    all.sort_by(|a, b| by_primary_date(a.as_ref(), b.as_ref()));
    all
}
