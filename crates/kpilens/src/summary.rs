//! Summary statistics of a measure column.

use std::fmt;

use arrow_arith::aggregate::{max, min, sum};
use arrow_array::Array;
use serde::Serialize;

use crate::{dataset::Dataset, error::Error};

/// A statistic that may have no defined value.
///
/// `Undefined` stands for "no data" and is never a computed zero. It
/// serializes as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Stat {
    Defined(f64),
    Undefined,
}

impl Stat {
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(v),
            Self::Undefined => None,
        }
    }

    #[must_use]
    pub fn is_defined(self) -> bool {
        matches!(self, Self::Defined(_))
    }

    #[must_use]
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        self.value().map(f).into()
    }
}

impl From<Option<f64>> for Stat {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Undefined, Self::Defined)
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{v}"),
            Self::Undefined => f.write_str("no data"),
        }
    }
}

/// Direction suggested by comparing mean and median.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Sum of present values, zero for an empty view. Undefined when the sum
    /// overflows.
    pub total: Stat,
    /// Rows in the view.
    pub count: usize,
    /// Rows whose measure is missing.
    pub missing: usize,
    pub mean: Stat,
    pub max: Stat,
    pub min: Stat,
    pub median: Stat,
}

impl Summary {
    /// `Increasing` when the mean exceeds the median.
    #[must_use]
    pub fn trend(&self) -> Option<Trend> {
        let mean = self.mean.value()?;
        let median = self.median.value()?;
        Some(if mean > median {
            Trend::Increasing
        } else {
            Trend::Stable
        })
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn compute_summary(view: &Dataset, measure_column: &str) -> Result<Summary, Error> {
    let values = view.numbers(measure_column)?;
    let present = values.len() - values.null_count();
    let total = sum(&values).unwrap_or(0.0);
    let lo = min(&values);
    let hi = max(&values);
    let mean = match (lo, hi) {
        (Some(lo), Some(hi)) if present > 0 => {
            let n = present as f64;
            let mean = if total.is_finite() {
                total / n
            } else {
                values.iter().flatten().map(|v| v / n).sum::<f64>()
            };
            // rounding can push the mean of near-equal values past an extreme
            mean.is_finite().then(|| mean.clamp(lo, hi))
        }
        _ => None,
    };

    let mut sorted: Vec<f64> = values.iter().flatten().collect();
    sorted.sort_by(f64::total_cmp);
    let median = match sorted.len() {
        0 => None,
        n if n % 2 == 1 => Some(sorted[n / 2]),
        n => Some(sorted[n / 2 - 1] / 2.0 + sorted[n / 2] / 2.0),
    };

    Ok(Summary {
        total: total.is_finite().then_some(total).into(),
        count: view.num_rows(),
        missing: values.null_count(),
        mean: mean.into(),
        max: hi.into(),
        min: lo.into(),
        median: median.into(),
    })
}
