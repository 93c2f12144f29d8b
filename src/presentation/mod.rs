//! Presentation Module
//!
//! Stateless rules that turn fetched figures into styling decisions.

pub mod palette;
pub mod rules;
pub mod timezone;

pub use palette::{palette_by_index, palette_by_key, palette_by_name, Palette, PaletteSeeds, PALETTES};
pub use rules::{
    classify, share_percent, status_palette, threshold_palette, tone, trend_direction, trend_palette, Metric,
    Polarity, ThresholdLevel, Thresholds, Tone, TrendDirection,
};
