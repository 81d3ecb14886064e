//! # kpilens
//!
//! Metrics engine for arbitrary tabular data:
//!
//! - **Schema Inference**: Classify columns as numeric, categorical or temporal
//! - **Default Selection**: Pick measure, dimension and time columns deterministically
//! - **Filtering**: Category inclusion and inclusive value ranges over the measure
//! - **Aggregation**: Summary statistics, top-N groups, shares and normalized group means
//! - **Loading**: Cached CSV sources with seeded synthetic fallback data

pub mod cache;
pub mod config;
pub mod correlation;
pub mod dataset;
pub mod filter;
pub mod group;
pub mod schema;
pub mod source;
pub mod summary;
pub mod synth;

mod error;

pub use self::{
    cache::{DatasetCache, LoadedDataset, Loader, Origin},
    config::Config,
    dataset::{Dataset, DatasetBuilder, Value},
    error::{DegenerateRangeError, Error, SchemaError},
    filter::{CategoryFilter, Filter, FilteredView, ValueRange, apply_filter},
    group::{
        GroupShare, GroupValue, NormalizedMeans, Order, nested_group_sums, normalized_group_means,
        top_n_by_group,
    },
    schema::{ColumnKind, DefaultSelection, Schema, infer_schema, select_defaults},
    summary::{Stat, Summary, Trend, compute_summary},
    synth::synthesize_dataset,
};
