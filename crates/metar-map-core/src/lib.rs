// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Map data and rendering engine for a one-LED-per-airport METAR map.
//!
//! The pipeline is: [`token::classify`] → [`geocode::resolve_coordinates`] →
//! [`weather::resolve_categories`] → [`fallback::resolve_effective`] →
//! [`render::render_frame`], sequenced by [`refresh::MapEngine`].

pub mod batch;
pub mod category;
pub mod config;
pub mod fallback;
pub mod fetch;
pub mod geo;
pub mod geocode;
pub mod lookup;
pub mod records;
pub mod refresh;
pub mod render;
pub mod token;
pub mod weather;

pub use category::FlightCategory;
pub use config::MapConfig;
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use refresh::{
    EngineSettings, MapEngine, MapSummary, RefreshError, RefreshStage, RefreshTrigger,
};
pub use render::{MemoryStrip, PixelSink, Rgb};
pub use token::{classify, Token, TokenArena, TokenKind, MAX_TOKENS};

use std::path::PathBuf;

/// Directory holding the persisted map configuration.
pub fn get_config_root() -> PathBuf {
    directories::ProjectDirs::from("org", "metar-map", "METAR-Map")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
