// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::fetch::Fetcher;
use crate::geo::Coordinate;
use crate::lookup::{run_batches, LookupReport, LookupSettings};
use crate::records::FieldAliases;
use crate::token::TokenArena;
use log::info;
use serde_json::Value;
use std::collections::HashMap;

pub const STATION_URL_PREFIX: &str =
    "https://aviationweather.gov/api/data/stationinfo?format=json&ids=";

const STATION_ID: FieldAliases = FieldAliases(&["icaoId", "station_id"]);

/// Coordinate field pairs, highest priority first. A pair is only used when
/// both halves are present.
const COORDINATE_PAIRS: [(FieldAliases, FieldAliases); 2] = [
    (FieldAliases(&["lat"]), FieldAliases(&["lon"])),
    (FieldAliases(&["latitude"]), FieldAliases(&["longitude"])),
];

/// Looks up coordinates for airport tokens that do not have one yet.
///
/// Found coordinates are written to every matching token and to `cache`, so
/// later refreshes and rebuilt token lists skip the lookup entirely.
pub fn resolve_coordinates<F: Fetcher + ?Sized>(
    arena: &mut TokenArena,
    cache: &mut HashMap<String, Coordinate>,
    fetcher: &F,
    settings: &LookupSettings,
) -> LookupReport {
    arena.apply_coordinates(cache);
    let missing = arena.airport_identifiers_where(|t| t.coordinate.is_none());
    if missing.is_empty() {
        return LookupReport::default();
    }

    let report = run_batches("Station", fetcher, settings, &missing, |record| {
        let Some((id, coordinate)) = station_coordinate(record) else {
            return false;
        };
        if arena.set_coordinate(&id, coordinate) == 0 {
            return false;
        }
        cache.insert(id, coordinate);
        true
    });

    info!(
        "Station lookup finished — requested={} matched={} batches={} failed={}",
        missing.len(),
        report.matched,
        report.batches,
        report.failed_batches
    );
    report
}

fn station_coordinate(record: &Value) -> Option<(String, Coordinate)> {
    let id = STATION_ID.text(record)?;
    let coordinate = COORDINATE_PAIRS.iter().find_map(|(lat, lon)| {
        let lat = lat.number(record)?;
        let lon = lon.number(record)?;
        Some(Coordinate::checked(lat, lon))
    })??;
    Some((id, coordinate))
}
