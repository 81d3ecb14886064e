//! Grouped aggregates: ranked group totals, shares of total and normalized
//! group means.
//!
//! Groups are keyed by the exact text of the group column and kept in the
//! order they are first encountered. Rows with a missing group value are
//! skipped.

use arrow_array::{Array, Float64Array, StringArray};
use indexmap::IndexMap;
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    dataset::Dataset,
    error::{DegenerateRangeError, Error},
    summary::Stat,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    #[default]
    Descending,
    Ascending,
}

/// A group and its summed measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValue {
    pub group: String,
    pub value: f64,
}

impl GroupValue {
    pub fn new(group: impl Into<String>, value: f64) -> Self {
        Self {
            group: group.into(),
            value,
        }
    }
}

/// A group's summed measure and its fraction of the grand total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupShare {
    pub group: String,
    pub value: f64,
    pub share: Stat,
}

/// Per-group metric means scaled to `[0, 1]` across groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedMeans {
    /// group -> metric column -> normalized mean
    pub groups: IndexMap<String, IndexMap<String, f64>>,
    /// Metrics that could not be normalized and hold
    /// [`DegenerateRangeError::NEUTRAL`] for every group.
    pub degenerate: Vec<DegenerateRangeError>,
}

impl NormalizedMeans {
    #[must_use]
    pub fn get(&self, group: &str, metric: &str) -> Option<f64> {
        self.groups.get(group)?.get(metric).copied()
    }
}

fn group_sums(view: &Dataset, group_column: &str, measure_column: &str) -> Result<IndexMap<String, f64>, Error> {
    let keys = view.labels(group_column)?;
    let values = view.numbers(measure_column)?;
    let mut sums: IndexMap<String, f64> = IndexMap::new();
    for row in 0..view.num_rows() {
        if keys.is_null(row) {
            continue;
        }
        let sum = sums.entry(keys.value(row).to_owned()).or_insert(0.0);
        if values.is_valid(row) {
            *sum += values.value(row);
        }
    }
    if let Some((group, _)) = sums.iter().find(|(_, sum)| !sum.is_finite()) {
        return Err(overflow(measure_column, group));
    }
    Ok(sums)
}

fn overflow(measure_column: &str, group: &str) -> Error {
    Error::NonFiniteSum {
        column: measure_column.to_owned(),
        group: group.to_owned(),
    }
}

/// Summed measure per outer group and, within it, per inner group.
///
/// Both levels keep first-encountered order. Rows missing either key are
/// skipped.
pub fn nested_group_sums(
    view: &Dataset,
    outer_column: &str,
    inner_column: &str,
    measure_column: &str,
) -> Result<IndexMap<String, IndexMap<String, f64>>, Error> {
    let outer = view.labels(outer_column)?;
    let inner = view.labels(inner_column)?;
    let values = view.numbers(measure_column)?;
    let mut sums: IndexMap<String, IndexMap<String, f64>> = IndexMap::new();
    for row in 0..view.num_rows() {
        if outer.is_null(row) || inner.is_null(row) {
            continue;
        }
        let sum = sums
            .entry(outer.value(row).to_owned())
            .or_default()
            .entry(inner.value(row).to_owned())
            .or_insert(0.0);
        if values.is_valid(row) {
            *sum += values.value(row);
        }
    }
    for (group, children) in &sums {
        if let Some((child, _)) = children.iter().find(|(_, sum)| !sum.is_finite()) {
            return Err(overflow(measure_column, &format!("{group}/{child}")));
        }
    }
    Ok(sums)
}

/// The `n` groups with the largest (or smallest) summed measure.
///
/// Ties keep the order in which groups were first encountered.
pub fn top_n_by_group(
    view: &Dataset,
    group_column: &str,
    measure_column: &str,
    n: usize,
    order: Order,
) -> Result<Vec<GroupValue>, Error> {
    let mut groups: Vec<GroupValue> = group_sums(view, group_column, measure_column)?
        .into_iter()
        .map(|(group, value)| GroupValue { group, value })
        .collect();
    // stable sort
    match order {
        Order::Descending => groups.sort_by(|a, b| b.value.total_cmp(&a.value)),
        Order::Ascending => groups.sort_by(|a, b| a.value.total_cmp(&b.value)),
    }
    groups.truncate(n);
    Ok(groups)
}

/// Every group with its share of the total, in first-encountered order.
///
/// Shares are undefined when the grand total is zero or overflows.
pub fn group_shares(
    view: &Dataset,
    group_column: &str,
    measure_column: &str,
) -> Result<Vec<GroupShare>, Error> {
    let sums = group_sums(view, group_column, measure_column)?;
    let total: f64 = sums.values().sum();
    Ok(sums
        .into_iter()
        .map(|(group, value)| GroupShare {
            group,
            value,
            share: if total == 0.0 || !total.is_finite() {
                Stat::Undefined
            } else {
                Stat::Defined(value / total)
            },
        })
        .collect())
}

/// Min-max scale `means` to `[0, 1]`. `None` entries stay `None` and do not
/// take part in the range.
pub fn min_max_normalize(
    column: &str,
    means: &[Option<f64>],
) -> Result<Vec<Option<f64>>, DegenerateRangeError> {
    let (lo, hi) = match means.iter().flatten().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::MinMax(lo, hi) if lo < hi => (*lo, *hi),
        MinMaxResult::MinMax(value, _) | MinMaxResult::OneElement(value) => {
            return Err(DegenerateRangeError {
                column: column.to_owned(),
                value: Some(*value),
            });
        }
        MinMaxResult::NoElements => {
            return Err(DegenerateRangeError {
                column: column.to_owned(),
                value: None,
            });
        }
    };
    Ok(means
        .iter()
        .map(|mean| mean.map(|v| (v - lo) / (hi - lo)))
        .collect())
}

/// Mean of each metric per group, min-max normalized per metric.
///
/// A metric whose group means are all equal is reported in
/// [`NormalizedMeans::degenerate`] and every group gets the neutral value
/// for it. A group without any value for a metric also gets the neutral
/// value.
#[allow(clippy::cast_precision_loss)]
pub fn normalized_group_means<S: AsRef<str>>(
    view: &Dataset,
    group_column: &str,
    metric_columns: &[S],
) -> Result<NormalizedMeans, Error> {
    let keys = view.labels(group_column)?;
    let metrics = metric_columns
        .iter()
        .map(|column| view.numbers(column.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let accumulated = accumulate(&keys, &metrics);
    if accumulated.is_empty() {
        return Ok(NormalizedMeans::default());
    }

    let mut result = NormalizedMeans {
        groups: accumulated
            .keys()
            .map(|group| (group.clone(), IndexMap::new()))
            .collect(),
        degenerate: Vec::new(),
    };
    for (index, column) in metric_columns.iter().map(AsRef::as_ref).enumerate() {
        let means: Vec<Option<f64>> = accumulated
            .values()
            .map(|slots| {
                let (sum, count) = slots[index];
                (count > 0)
                    .then(|| sum / count as f64)
                    .filter(|mean| mean.is_finite())
            })
            .collect();
        let normalized = min_max_normalize(column, &means).unwrap_or_else(|e| {
            warn!("{e}, using {}", DegenerateRangeError::NEUTRAL);
            result.degenerate.push(e);
            vec![None; means.len()]
        });
        for (metrics, value) in result.groups.values_mut().zip(normalized) {
            metrics.insert(
                column.to_owned(),
                value.unwrap_or(DegenerateRangeError::NEUTRAL),
            );
        }
    }
    Ok(result)
}

/// Per group, per metric `(sum, count)` of present values.
fn accumulate(keys: &StringArray, metrics: &[Float64Array]) -> IndexMap<String, Vec<(f64, usize)>> {
    let mut accumulated: IndexMap<String, Vec<(f64, usize)>> = IndexMap::new();
    for row in 0..keys.len() {
        if keys.is_null(row) {
            continue;
        }
        let slots = accumulated
            .entry(keys.value(row).to_owned())
            .or_insert_with(|| vec![(0.0, 0); metrics.len()]);
        for (slot, values) in slots.iter_mut().zip(metrics) {
            if values.is_valid(row) {
                slot.0 += values.value(row);
                slot.1 += 1;
            }
        }
    }
    accumulated
}
