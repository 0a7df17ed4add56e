use crate::category::FlightCategory;
use crate::fetch::Fetcher;
use crate::lookup::{run_batches, LookupReport, LookupSettings};
use crate::records::FieldAliases;
use crate::token::TokenArena;
use log::{debug, info};
use serde_json::Value;

pub const METAR_URL_PREFIX: &str = "https://aviationweather.gov/api/data/metar?format=json&ids=";

const STATION_ID: FieldAliases = FieldAliases(&["icaoId", "station_id"]);
const FLIGHT_CATEGORY: FieldAliases = FieldAliases(&["fltCat", "flight_category"]);

/// Re-resolves the live flight category of every airport token.
///
/// All categories are cleared first: a station that reports nothing this
/// cycle must not keep last cycle's color.
pub fn resolve_categories<F: Fetcher + ?Sized>(
    arena: &mut TokenArena,
    fetcher: &F,
    settings: &LookupSettings,
) -> LookupReport {
    arena.clear_categories();
    let identifiers = arena.airport_identifiers_where(|_| true);
    if identifiers.is_empty() {
        return LookupReport::default();
    }

    let report = run_batches("METAR", fetcher, settings, &identifiers, |record| {
        match metar_category(record) {
            Some((id, category)) => arena.set_category(&id, category) > 0,
            None => false,
        }
    });

    info!(
        "METAR lookup finished — requested={} matched={} batches={} failed={}",
        identifiers.len(),
        report.matched,
        report.batches,
        report.failed_batches
    );
    report
}

fn metar_category(record: &Value) -> Option<(String, FlightCategory)> {
    let id = STATION_ID.text(record)?;
    let raw = FLIGHT_CATEGORY.text(record);
    match raw.as_deref().and_then(FlightCategory::parse) {
        Some(category) => Some((id, category)),
        None => {
            debug!("Ignoring METAR without a usable category — station={} value={:?}", id, raw);
            None
        }
    }
}
