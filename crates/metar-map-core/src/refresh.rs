// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::batch::{RequestTemplate, DEFAULT_MAX_URL_LEN};
use crate::fallback::{resolve_effective, Resolution, FALLBACK_RADIUS_NM};
use crate::fetch::Fetcher;
use crate::geo::Coordinate;
use crate::geocode::{resolve_coordinates, STATION_URL_PREFIX};
use crate::lookup::{LookupReport, LookupSettings};
use crate::render::{present, render_frame, solid_frame, PixelSink, Rgb};
use crate::token::{classify, TokenArena, MAX_TOKENS};
use crate::weather::{resolve_categories, METAR_URL_PREFIX};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("A refresh is already in progress")]
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshTrigger {
    ListChanged,
    Periodic,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshStage {
    Idle,
    Classifying,
    RenderingImmediate,
    ResolvingGeocode,
    ResolvingCategory,
    ApplyingFallback,
    RenderingFinal,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Physical LED count. `None` sizes the strip to the token list.
    pub led_count: Option<usize>,
    pub brightness: u8,
    pub refresh_interval: chrono::Duration,
    pub fallback_radius_nm: f64,
    pub station: LookupSettings,
    pub metar: LookupSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let pause = Duration::from_millis(250);
        Self {
            led_count: None,
            brightness: 120,
            refresh_interval: chrono::Duration::minutes(20),
            fallback_radius_nm: FALLBACK_RADIUS_NM,
            station: LookupSettings {
                template: RequestTemplate::new(STATION_URL_PREFIX, ""),
                max_url_len: DEFAULT_MAX_URL_LEN,
                batch_pause: pause,
            },
            metar: LookupSettings {
                template: RequestTemplate::new(METAR_URL_PREFIX, ""),
                max_url_len: DEFAULT_MAX_URL_LEN,
                batch_pause: pause,
            },
        }
    }
}

/// Read-only view for status pages and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSummary {
    pub token_count: usize,
    pub airport_count: usize,
    /// Airports with neither live nor inherited data.
    pub unresolved_count: usize,
    pub inherited_count: usize,
    pub led_count: usize,
    pub stage: RefreshStage,
    pub last_trigger: Option<RefreshTrigger>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub station_report: LookupReport,
    pub metar_report: LookupReport,
}

struct MapState<S> {
    source: String,
    needs_rebuild: bool,
    arena: TokenArena,
    /// Station coordinates by identifier. Never invalidated.
    coordinates: HashMap<String, Coordinate>,
    effective: Vec<Option<Resolution>>,
    frame: Vec<Rgb>,
    brightness: u8,
    sink: S,
    last_trigger: Option<RefreshTrigger>,
    last_refresh: Option<DateTime<Utc>>,
    station_report: LookupReport,
    metar_report: LookupReport,
}

/// Last rendered view of the map, readable while a refresh holds the state.
#[derive(Debug, Clone)]
struct Snapshot {
    summary: MapSummary,
    tokens: TokenArena,
    frame: Vec<Rgb>,
    effective: Vec<Option<Resolution>>,
}

/// Clears the in-progress flag when the refresh that set it ends.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the token list, caches and strip, and runs the refresh pipeline.
///
/// Every entry point that touches the strip claims the in-progress flag
/// first. A second request arriving while one runs gets
/// [`RefreshError::InProgress`] instead of waiting or interleaving.
pub struct MapEngine<F, S> {
    settings: EngineSettings,
    fetcher: F,
    in_progress: AtomicBool,
    stage: Mutex<RefreshStage>,
    published: Mutex<Snapshot>,
    state: Mutex<MapState<S>>,
}

impl<F: Fetcher, S: PixelSink> MapEngine<F, S> {
    pub fn new(settings: EngineSettings, fetcher: F, sink: S) -> Self {
        let brightness = settings.brightness.max(1);
        let led_count = settings.led_count.unwrap_or(0).min(MAX_TOKENS);
        Self {
            settings,
            fetcher,
            in_progress: AtomicBool::new(false),
            stage: Mutex::new(RefreshStage::Idle),
            published: Mutex::new(Snapshot {
                summary: MapSummary {
                    token_count: 0,
                    airport_count: 0,
                    unresolved_count: 0,
                    inherited_count: 0,
                    led_count,
                    stage: RefreshStage::Idle,
                    last_trigger: None,
                    last_refresh: None,
                    station_report: LookupReport::default(),
                    metar_report: LookupReport::default(),
                },
                tokens: TokenArena::default(),
                frame: Vec::new(),
                effective: Vec::new(),
            }),
            state: Mutex::new(MapState {
                source: String::new(),
                needs_rebuild: false,
                arena: TokenArena::default(),
                coordinates: HashMap::new(),
                effective: Vec::new(),
                frame: Vec::new(),
                brightness,
                sink,
                last_trigger: None,
                last_refresh: None,
                station_report: LookupReport::default(),
                metar_report: LookupReport::default(),
            }),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Replaces the token list and refreshes. The list is only reclassified
    /// when the text actually changed.
    pub fn set_list(&self, source: &str) -> Result<MapSummary, RefreshError> {
        let _guard = self.begin()?;
        let mut state = self.lock_state();
        if state.source != source {
            state.source = source.to_string();
            state.needs_rebuild = true;
        }
        Ok(self.run_pipeline(&mut state, RefreshTrigger::ListChanged))
    }

    /// Manual refresh.
    pub fn refresh(&self) -> Result<MapSummary, RefreshError> {
        let _guard = self.begin()?;
        let mut state = self.lock_state();
        Ok(self.run_pipeline(&mut state, RefreshTrigger::Manual))
    }

    /// Periodic refresh. Returns `Ok(None)` when the interval has not elapsed
    /// since the last completed refresh.
    pub fn refresh_if_due(&self, now: DateTime<Utc>) -> Result<Option<MapSummary>, RefreshError> {
        let _guard = self.begin()?;
        let mut state = self.lock_state();
        let due = match state.last_refresh {
            None => true,
            Some(last) => now.signed_duration_since(last) >= self.settings.refresh_interval,
        };
        if !due {
            return Ok(None);
        }
        Ok(Some(self.run_pipeline(&mut state, RefreshTrigger::Periodic)))
    }

    /// Sets strip brightness (clamped to 1..=255) and re-presents the
    /// current frame.
    pub fn set_brightness(&self, level: u8) -> Result<(), RefreshError> {
        let _guard = self.begin()?;
        let mut state = self.lock_state();
        state.brightness = level.max(1);
        let frame = state.frame.clone();
        let brightness = state.brightness;
        if let Err(e) = present(&mut state.sink, &frame, brightness) {
            error!("Failed to apply brightness — level={} error={:#}", brightness, e);
        }
        Ok(())
    }

    /// Fills the whole strip with one color, bypassing the map. The next
    /// refresh restores the map.
    pub fn test_pattern(&self, color: Rgb) -> Result<(), RefreshError> {
        let _guard = self.begin()?;
        let mut state = self.lock_state();
        let frame = solid_frame(color, self.led_count_for(&state.arena));
        let brightness = state.brightness;
        if let Err(e) = present(&mut state.sink, &frame, brightness) {
            error!("Failed to show test pattern — error={:#}", e);
        }
        Ok(())
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub fn stage(&self) -> RefreshStage {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Status of the last rendered frame. Never waits on a running refresh.
    pub fn summary(&self) -> MapSummary {
        let mut summary = self.lock_published().summary.clone();
        summary.stage = self.stage();
        summary
    }

    pub fn tokens(&self) -> TokenArena {
        self.lock_published().tokens.clone()
    }

    pub fn frame(&self) -> Vec<Rgb> {
        self.lock_published().frame.clone()
    }

    pub fn effective(&self) -> Vec<Option<Resolution>> {
        self.lock_published().effective.clone()
    }

    pub fn with_sink<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock_state().sink)
    }

    fn begin(&self) -> Result<RefreshGuard<'_>, RefreshError> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected request while a refresh is running — stage={:?}", self.stage());
            return Err(RefreshError::InProgress);
        }
        Ok(RefreshGuard(&self.in_progress))
    }

    fn lock_state(&self) -> MutexGuard<'_, MapState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_published(&self) -> MutexGuard<'_, Snapshot> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &MapState<S>) {
        let snapshot = Snapshot {
            summary: self.build_summary(state),
            tokens: state.arena.clone(),
            frame: state.frame.clone(),
            effective: state.effective.clone(),
        };
        *self.lock_published() = snapshot;
    }

    fn set_stage(&self, stage: RefreshStage) {
        debug!("Refresh stage — stage={:?}", stage);
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner) = stage;
    }

    fn led_count_for(&self, arena: &TokenArena) -> usize {
        self.settings.led_count.unwrap_or(arena.len()).min(MAX_TOKENS)
    }

    fn run_pipeline(&self, state: &mut MapState<S>, trigger: RefreshTrigger) -> MapSummary {
        info!(
            "Refresh started — trigger={:?} rebuild={} cached_coordinates={}",
            trigger,
            state.needs_rebuild,
            state.coordinates.len()
        );

        self.set_stage(RefreshStage::Classifying);
        if state.needs_rebuild {
            state.arena = classify(&state.source);
            state.needs_rebuild = false;
        }
        state.arena.clear_categories();
        state.arena.apply_coordinates(&state.coordinates);
        state.effective.clear();

        // Skip and legend positions light up before any network traffic.
        self.set_stage(RefreshStage::RenderingImmediate);
        self.render(state);

        self.set_stage(RefreshStage::ResolvingGeocode);
        state.station_report = resolve_coordinates(
            &mut state.arena,
            &mut state.coordinates,
            &self.fetcher,
            &self.settings.station,
        );

        self.set_stage(RefreshStage::ResolvingCategory);
        state.metar_report =
            resolve_categories(&mut state.arena, &self.fetcher, &self.settings.metar);

        self.set_stage(RefreshStage::ApplyingFallback);
        state.effective = resolve_effective(&state.arena, self.settings.fallback_radius_nm);

        self.set_stage(RefreshStage::RenderingFinal);
        self.render(state);

        state.last_trigger = Some(trigger);
        state.last_refresh = Some(Utc::now());
        self.set_stage(RefreshStage::Idle);
        self.publish(state);

        let summary = self.build_summary(state);
        info!(
            "Refresh finished — tokens={} airports={} unresolved={} inherited={}",
            summary.token_count,
            summary.airport_count,
            summary.unresolved_count,
            summary.inherited_count
        );
        summary
    }

    fn render(&self, state: &mut MapState<S>) {
        let frame = render_frame(&state.arena, &state.effective, self.led_count_for(&state.arena));
        if let Err(e) = present(&mut state.sink, &frame, state.brightness) {
            error!("Failed to commit frame to strip — leds={} error={:#}", frame.len(), e);
        }
        state.frame = frame;
        self.publish(state);
    }

    fn build_summary(&self, state: &MapState<S>) -> MapSummary {
        let mut unresolved_count = 0;
        let mut inherited_count = 0;
        for token in state.arena.airports() {
            match state.effective.get(token.position).copied().flatten() {
                None => unresolved_count += 1,
                Some(r) if r.is_inherited() => inherited_count += 1,
                Some(_) => {}
            }
        }
        MapSummary {
            token_count: state.arena.len(),
            airport_count: state.arena.airport_count(),
            unresolved_count,
            inherited_count,
            led_count: self.led_count_for(&state.arena),
            stage: self.stage(),
            last_trigger: state.last_trigger,
            last_refresh: state.last_refresh,
            station_report: state.station_report,
            metar_report: state.metar_report,
        }
    }
}
