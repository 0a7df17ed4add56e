use crate::category::FlightCategory;
use crate::fallback::Resolution;
use crate::token::{TokenArena, TokenKind};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    /// Dim white: "no data", kept distinct from an intentional `SKIP`.
    pub const IDLE: Rgb = Rgb::new(24, 24, 24);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const MAGENTA: Rgb = Rgb::new(255, 0, 255);

    /// Parses the strip-test color names `red`, `green`, `blue` and `off`.
    pub fn from_test_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "red" => Some(Rgb::RED),
            "green" => Some(Rgb::GREEN),
            "blue" => Some(Rgb::BLUE),
            "off" => Some(Rgb::OFF),
            _ => None,
        }
    }
}

pub fn category_color(category: FlightCategory) -> Rgb {
    match category {
        FlightCategory::Vfr => Rgb::GREEN,
        FlightCategory::Mvfr => Rgb::BLUE,
        FlightCategory::Ifr => Rgb::RED,
        FlightCategory::Lifr => Rgb::MAGENTA,
    }
}

/// Output side of the strip driver.
pub trait PixelSink {
    fn set_pixel(&mut self, index: usize, color: Rgb);
    fn set_brightness(&mut self, level: u8);
    /// Pushes everything set so far to the hardware in one go.
    fn commit(&mut self) -> Result<()>;
}

/// Builds the full frame for `led_count` LEDs.
///
/// Only the first `min(led_count, arena.len())` positions are mapped from
/// tokens; every LED past that is idle. `effective` is indexed by token
/// position and may be shorter than the arena (e.g. before any lookup ran),
/// in which case airports render idle.
pub fn render_frame(
    arena: &TokenArena,
    effective: &[Option<Resolution>],
    led_count: usize,
) -> Vec<Rgb> {
    let mapped_len = led_count.min(arena.len());
    let mut frame = vec![Rgb::IDLE; led_count];

    for (slot, token) in frame.iter_mut().zip(arena.iter()).take(mapped_len) {
        *slot = match &token.kind {
            TokenKind::Skip => Rgb::OFF,
            TokenKind::Legend(category) => category_color(*category),
            TokenKind::Airport(_) => effective
                .get(token.position)
                .copied()
                .flatten()
                .map(|r| category_color(r.category))
                .unwrap_or(Rgb::IDLE),
            TokenKind::Invalid => Rgb::IDLE,
        };
    }
    frame
}

pub fn solid_frame(color: Rgb, led_count: usize) -> Vec<Rgb> {
    vec![color; led_count]
}

/// Writes a finished frame and commits it once, so the strip never shows a
/// half-written update.
pub fn present<S: PixelSink + ?Sized>(sink: &mut S, frame: &[Rgb], brightness: u8) -> Result<()> {
    sink.set_brightness(brightness);
    for (index, color) in frame.iter().enumerate() {
        sink.set_pixel(index, *color);
    }
    sink.commit()
}

/// Sink that keeps every committed frame in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStrip {
    pending: Vec<Rgb>,
    pub brightness: u8,
    pub frames: Vec<Vec<Rgb>>,
}

impl MemoryStrip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&[Rgb]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl PixelSink for MemoryStrip {
    fn set_pixel(&mut self, index: usize, color: Rgb) {
        if self.pending.len() <= index {
            self.pending.resize(index + 1, Rgb::OFF);
        }
        self.pending[index] = color;
    }

    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    fn commit(&mut self) -> Result<()> {
        self.frames.push(self.pending.clone());
        Ok(())
    }
}
