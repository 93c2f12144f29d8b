//! Severity rules for dashboard figures.
//!
//! Thresholds and polarity are static per metric; everything here is a pure
//! function of its arguments.

use serde::{Deserialize, Serialize};

use super::palette::{palette_by_name, Palette, PALETTES};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: f64,
    pub high: f64,
}

impl Thresholds {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Polarity {
    HigherBetter,
    LowerBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdLevel {
    Low,
    Ok,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

/// How a figure reads to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Good,
    Warn,
    Bad,
    Neutral,
}

impl Tone {
    pub fn palette(self) -> &'static Palette {
        named(match self {
            Tone::Good => "emerald",
            Tone::Warn => "amber",
            Tone::Bad => "rose",
            Tone::Neutral => "blue",
        })
    }
}

/// Figures the dashboard colors by threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    VacancyPercent,
    RatePercent,
    Count,
    SharePercent,
}

impl Metric {
    pub fn thresholds(self) -> Thresholds {
        match self {
            Metric::VacancyPercent => Thresholds::new(10.0, 25.0),
            Metric::RatePercent => Thresholds::new(60.0, 90.0),
            Metric::Count => Thresholds::new(5.0, 20.0),
            Metric::SharePercent => Thresholds::new(20.0, 40.0),
        }
    }
}

/// Strict comparison: values equal to a bound are `Ok`
pub fn classify(value: f64, thresholds: Thresholds) -> ThresholdLevel {
    if value < thresholds.low {
        ThresholdLevel::Low
    } else if value > thresholds.high {
        ThresholdLevel::High
    } else {
        ThresholdLevel::Ok
    }
}

pub fn tone(level: ThresholdLevel, polarity: Polarity) -> Tone {
    match (level, polarity) {
        (ThresholdLevel::Ok, _) => Tone::Warn,
        (ThresholdLevel::Low, Polarity::HigherBetter) | (ThresholdLevel::High, Polarity::LowerBetter) => Tone::Bad,
        (ThresholdLevel::High, Polarity::HigherBetter) | (ThresholdLevel::Low, Polarity::LowerBetter) => Tone::Good,
    }
}

pub fn threshold_palette(value: f64, thresholds: Thresholds, polarity: Polarity) -> &'static Palette {
    tone(classify(value, thresholds), polarity).palette()
}

pub fn trend_direction(level: ThresholdLevel, polarity: Polarity) -> TrendDirection {
    match tone(level, polarity) {
        Tone::Good => TrendDirection::Up,
        Tone::Bad => TrendDirection::Down,
        Tone::Warn | Tone::Neutral => TrendDirection::Neutral,
    }
}

pub fn trend_palette(direction: TrendDirection) -> &'static Palette {
    match direction {
        TrendDirection::Up => Tone::Good.palette(),
        TrendDirection::Down => Tone::Bad.palette(),
        TrendDirection::Neutral => Tone::Neutral.palette(),
    }
}

/// Palette for an invoice/payment/request status, case-insensitive
pub fn status_palette(status: &str) -> &'static Palette {
    match status.trim().to_lowercase().as_str() {
        "paid" | "approved" => named("emerald"),
        "partially_paid" | "partial" => named("amber"),
        "pending" => named("blue"),
        "overdue" | "failed" | "canceled" | "cancelled" => named("rose"),
        "all" => named("violet"),
        _ => Tone::Neutral.palette(),
    }
}

/// `part` as a rounded percentage of `total`; 0 when there is no total
pub fn share_percent(part: f64, total: f64) -> i64 {
    if total == 0.0 || !total.is_finite() {
        return 0;
    }
    ((part / total) * 100.0).round() as i64
}

fn named(name: &str) -> &'static Palette {
    palette_by_name(name).unwrap_or(&PALETTES[0])
}
