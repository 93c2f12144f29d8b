//! Card palettes.
//!
//! A fixed set of style-token records, picked by index, by name or by a
//! stable hash of an arbitrary key (so the same landlord always gets the
//! same card color).

use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    pub name: &'static str,
    pub card: &'static str,
    pub border: &'static str,
    pub icon_bg: &'static str,
    pub icon: &'static str,
    pub badge: &'static str,
    pub accent_text: &'static str,
    pub accent_bg: &'static str,
}

macro_rules! palette {
    ($name:literal) => {
        Palette {
            name: $name,
            card: concat!("bg-", $name, "-500/[0.05] dark:bg-", $name, "-500/10"),
            border: concat!("border-", $name, "-200/70 dark:border-", $name, "-500/30"),
            icon_bg: concat!("bg-", $name, "-500/10"),
            icon: concat!("text-", $name, "-600 dark:text-", $name, "-400"),
            badge: concat!("bg-", $name, "-500/10 text-", $name, "-700 dark:text-", $name, "-300 border-", $name, "-200/60"),
            accent_text: concat!("text-", $name, "-700 dark:text-", $name, "-300"),
            accent_bg: concat!("bg-", $name, "-500/10"),
        }
    };
}

pub static PALETTES: [Palette; 6] = [
    palette!("emerald"),
    palette!("blue"),
    palette!("violet"),
    palette!("amber"),
    palette!("rose"),
    palette!("teal"),
];

pub fn palette_by_index(index: usize) -> &'static Palette {
    &PALETTES[index % PALETTES.len()]
}

pub fn palette_by_name(name: &str) -> Option<&'static Palette> {
    PALETTES.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Deterministic palette for `key`; `seed` reshuffles the assignment
pub fn palette_by_key(key: &str, seed: u32) -> &'static Palette {
    let hashed = hash_key(&format!("{}:{}", key, seed));
    palette_by_index((hashed % PALETTES.len() as u64) as usize)
}

/// djb2 variant over UTF-16 code units with 32-bit wrapping
fn hash_key(value: &str) -> u64 {
    let mut hash: i32 = 5381;
    for unit in value.encode_utf16() {
        hash = hash.wrapping_mul(33) ^ i32::from(unit);
    }
    i64::from(hash).unsigned_abs()
}

/// Per-session random seeds, one per storage key, so palettes vary between
/// sessions but stay put within one
#[derive(Default)]
pub struct PaletteSeeds {
    seeds: Mutex<HashMap<String, u32>>,
}

impl PaletteSeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, storage_key: &str) -> u32 {
        let mut seeds = self.seeds.lock().unwrap_or_else(PoisonError::into_inner);
        *seeds
            .entry(storage_key.to_string())
            .or_insert_with(|| rand::thread_rng().gen_range(0..1_000_000))
    }

    pub fn palette(&self, storage_key: &str, key: &str) -> &'static Palette {
        palette_by_key(key, self.seed(storage_key))
    }
}
