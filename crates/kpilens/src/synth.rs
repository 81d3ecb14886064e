//! Seeded synthetic datasets, used when a source cannot be read.
//!
//! Every synthetic dataset has a temporal `date` column, two categorical
//! columns and three numeric columns, so schema inference and default
//! selection always succeed on it.

use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::dataset::{Dataset, DatasetBuilder};

pub const REGIONS: [&str; 5] = ["North", "South", "East", "West", "Central"];
pub const CHANNELS: [&str; 3] = ["Online", "Retail", "Partner"];

/// `row_count` rows (at least one) of daily data ending today at midnight UTC.
#[must_use]
pub fn synthesize_dataset(row_count: usize, seed: u64) -> Dataset {
    let anchor = Utc::now().date_naive().and_time(NaiveTime::MIN);
    synthesize_dataset_at(row_count, seed, anchor)
}

/// Like [`synthesize_dataset`] with an explicit anchor: row `i` is dated
/// `anchor - i days`.
#[must_use]
pub fn synthesize_dataset_at(row_count: usize, seed: u64, anchor: NaiveDateTime) -> Dataset {
    let rows = row_count.max(1);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut dates = Vec::with_capacity(rows);
    let mut regions = Vec::with_capacity(rows);
    let mut channels = Vec::with_capacity(rows);
    let mut revenue = Vec::with_capacity(rows);
    let mut units = Vec::with_capacity(rows);
    let mut satisfaction = Vec::with_capacity(rows);

    let mut date = anchor;
    for _ in 0..rows {
        dates.push(date);
        date -= TimeDelta::days(1);
        regions.push(REGIONS[rng.gen_range(0..REGIONS.len())]);
        channels.push(CHANNELS[rng.gen_range(0..CHANNELS.len())]);
        revenue.push(round2(rng.gen_range(1_000.0..50_000.0)));
        units.push(f64::from(rng.gen_range(1_u32..=500)));
        satisfaction.push(round2(rng.gen_range(1.0..=5.0)));
    }

    DatasetBuilder::new()
        .temporal("date", dates)
        .categorical("region", regions)
        .categorical("channel", channels)
        .numeric("revenue", revenue)
        .numeric("units", units)
        .numeric("satisfaction", satisfaction)
        .build()
        .expect("synthetic columns share one length and distinct names")
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
