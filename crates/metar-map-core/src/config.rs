use crate::batch::{RequestTemplate, DEFAULT_MAX_URL_LEN};
use crate::fallback::FALLBACK_RADIUS_NM;
use crate::geocode::STATION_URL_PREFIX;
use crate::lookup::LookupSettings;
use crate::refresh::EngineSettings;
use crate::token::MAX_TOKENS;
use crate::weather::METAR_URL_PREFIX;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MAP_LIST: &str = "VFR,MVFR,IFR,LIFR,SKIP";

/// Persisted map settings. Every field falls back to its default when
/// missing from the file, so older config files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub map_list: String,
    /// 1..=255; out-of-range values are clamped when loaded.
    pub brightness: i32,
    /// Physical LED count. When absent the strip is sized to the token list.
    pub led_count: Option<usize>,
    pub refresh_minutes: u32,
    pub fallback_radius_nm: f64,
    pub max_url_len: usize,
    pub metar_url_prefix: String,
    pub station_url_prefix: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub batch_pause_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            map_list: DEFAULT_MAP_LIST.to_string(),
            brightness: 120,
            led_count: None,
            refresh_minutes: 20,
            fallback_radius_nm: FALLBACK_RADIUS_NM,
            max_url_len: DEFAULT_MAX_URL_LEN,
            metar_url_prefix: METAR_URL_PREFIX.to_string(),
            station_url_prefix: STATION_URL_PREFIX.to_string(),
            connect_timeout_secs: 8,
            request_timeout_secs: 15,
            batch_pause_ms: 250,
        }
    }
}

impl MapConfig {
    pub fn default_path() -> PathBuf {
        crate::get_config_root().join("config.json")
    }

    /// Loads the config at `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "No config file; using defaults — path={}",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: MapConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// Clamps values into the ranges the device supports.
    pub fn normalize(&mut self) {
        self.brightness = self.brightness.clamp(1, 255);
        self.led_count = self.led_count.map(|n| n.min(MAX_TOKENS));
        self.refresh_minutes = self.refresh_minutes.max(1);
        if !self.fallback_radius_nm.is_finite() || self.fallback_radius_nm < 0.0 {
            self.fallback_radius_nm = FALLBACK_RADIUS_NM;
        }
    }

    pub fn brightness_level(&self) -> u8 {
        self.brightness.clamp(1, 255) as u8
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let pause = Duration::from_millis(self.batch_pause_ms);
        EngineSettings {
            led_count: self.led_count,
            brightness: self.brightness_level(),
            refresh_interval: chrono::Duration::minutes(i64::from(self.refresh_minutes.max(1))),
            fallback_radius_nm: self.fallback_radius_nm,
            station: LookupSettings {
                template: RequestTemplate::new(self.station_url_prefix.clone(), ""),
                max_url_len: self.max_url_len,
                batch_pause: pause,
            },
            metar: LookupSettings {
                template: RequestTemplate::new(self.metar_url_prefix.clone(), ""),
                max_url_len: self.max_url_len,
                batch_pause: pause,
            },
        }
    }
}
