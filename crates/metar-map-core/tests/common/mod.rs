#![allow(dead_code)]

use metar_map_core::batch::RequestTemplate;
use metar_map_core::fetch::{FetchError, Fetcher};
use metar_map_core::lookup::LookupSettings;
use metar_map_core::refresh::EngineSettings;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub const STATION_PREFIX: &str = "https://stations.test/api/stationinfo?format=json&ids=";
pub const METAR_PREFIX: &str = "https://metar.test/api/metar?format=json&ids=";

pub const KJFK: (f64, f64) = (40.6398, -73.7789);

/// Latitude offset that puts a point `nm` nautical miles due north.
pub fn north_of(origin: (f64, f64), nm: f64) -> (f64, f64) {
    (origin.0 + nm / 60.04, origin.1)
}

pub fn test_settings(max_url_len: usize) -> EngineSettings {
    let lookup = |prefix: &str| LookupSettings {
        template: RequestTemplate::new(prefix, ""),
        max_url_len,
        batch_pause: Duration::ZERO,
    };
    EngineSettings {
        station: lookup(STATION_PREFIX),
        metar: lookup(METAR_PREFIX),
        ..EngineSettings::default()
    }
}

// --- Mock Services ---

/// Answers station and METAR lookups from in-memory tables and records
/// every URL it was asked for.
#[derive(Default)]
pub struct FakeAviationWeather {
    pub stations: HashMap<String, (f64, f64)>,
    pub metars: HashMap<String, String>,
    /// Identifiers whose batch fails with a 503.
    pub failing: HashSet<String>,
    /// Extra records appended to every METAR response.
    pub extra_metar_records: Vec<serde_json::Value>,
    pub legacy_fields: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeAviationWeather {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn station(mut self, id: &str, coord: (f64, f64)) -> Self {
        self.stations.insert(id.to_string(), coord);
        self
    }

    pub fn metar(mut self, id: &str, category: &str) -> Self {
        self.metars.insert(id.to_string(), category.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn station_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|u| u.starts_with(STATION_PREFIX))
            .collect()
    }

    pub fn metar_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|u| u.starts_with(METAR_PREFIX))
            .collect()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

pub fn ids_in(url: &str) -> Vec<String> {
    let list = url.rsplit("ids=").next().unwrap_or("");
    list.split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Fetcher for FakeAviationWeather {
    fn get(&self, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let ids = ids_in(url);
        if ids.iter().any(|id| self.failing.contains(id)) {
            return Err(FetchError::Status(503));
        }

        let mut records = Vec::new();
        if url.starts_with(STATION_PREFIX) {
            for id in &ids {
                if let Some((lat, lon)) = self.stations.get(id) {
                    records.push(if self.legacy_fields {
                        json!({"station_id": id, "latitude": lat.to_string(), "longitude": lon.to_string()})
                    } else {
                        json!({"icaoId": id, "lat": lat, "lon": lon, "site": "Test Field"})
                    });
                }
            }
        } else {
            for id in &ids {
                if let Some(cat) = self.metars.get(id) {
                    records.push(if self.legacy_fields {
                        json!({"station_id": id, "flight_category": cat})
                    } else {
                        json!({"icaoId": id, "fltCat": cat, "rawOb": format!("{} 191651Z AUTO", id)})
                    });
                }
            }
            records.extend(self.extra_metar_records.iter().cloned());
        }
        Ok(serde_json::Value::Array(records).to_string())
    }
}
