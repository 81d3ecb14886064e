//! Pairwise Pearson correlation between numeric columns.

use arrow_array::{Array, Float64Array};
use serde::Serialize;

use crate::{dataset::Dataset, error::Error, summary::Stat};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `values[i][j]` correlates `columns[i]` with `columns[j]`.
    pub values: Vec<Vec<Stat>>,
}

impl CorrelationMatrix {
    #[must_use]
    pub fn get(&self, a: &str, b: &str) -> Option<Stat> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Correlate every pair of `columns` over the rows where both are present.
///
/// A pair with fewer than two such rows, or with a constant side, is
/// [`Stat::Undefined`].
pub fn correlation_matrix<S: AsRef<str>>(
    view: &Dataset,
    columns: &[S],
) -> Result<CorrelationMatrix, Error> {
    let series = columns
        .iter()
        .map(|column| view.numbers(column.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let values = series
        .iter()
        .enumerate()
        .map(|(i, x)| {
            series
                .iter()
                .enumerate()
                .map(|(j, y)| {
                    let r = pearson(x, y);
                    if i == j { r.map(|_| 1.0) } else { r }
                })
                .collect()
        })
        .collect();
    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.as_ref().to_owned()).collect(),
        values,
    })
}

#[allow(clippy::cast_precision_loss)]
fn pearson(x: &Float64Array, y: &Float64Array) -> Stat {
    let pairs: Vec<(f64, f64)> = (0..x.len())
        .filter(|&row| x.is_valid(row) && y.is_valid(row))
        .map(|row| (x.value(row), y.value(row)))
        .collect();
    if pairs.len() < 2 {
        return Stat::Undefined;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let (dx, dy) = (a - mean_x, b - mean_y);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let r = sxy / (sxx * syy).sqrt();
    if sxx == 0.0 || syy == 0.0 || !r.is_finite() {
        return Stat::Undefined;
    }
    Stat::Defined(r.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DatasetBuilder;

    #[test]
    fn perfect_and_inverse_correlation() {
        let dataset = DatasetBuilder::new()
            .numeric("x", [1.0, 2.0, 3.0, 4.0])
            .numeric("up", [2.0, 4.0, 6.0, 8.0])
            .numeric("down", [8.0, 6.0, 4.0, 2.0])
            .build()
            .unwrap();
        let matrix = correlation_matrix(&dataset, &["x", "up", "down"]).unwrap();
        assert_eq!(matrix.get("x", "x"), Some(Stat::Defined(1.0)));
        let up = matrix.get("x", "up").unwrap().value().unwrap();
        let down = matrix.get("x", "down").unwrap().value().unwrap();
        assert!((up - 1.0).abs() < 1e-12);
        assert!((down + 1.0).abs() < 1e-12);
        assert_eq!(matrix.get("x", "nope"), None);
    }

    #[test]
    fn constant_or_sparse_columns_are_undefined() {
        let dataset = DatasetBuilder::new()
            .numeric("x", [Some(1.0), Some(2.0), Some(3.0)])
            .numeric("flat", [Some(5.0), Some(5.0), Some(5.0)])
            .numeric("sparse", [None, Some(1.0), None])
            .build()
            .unwrap();
        let matrix = correlation_matrix(&dataset, &["x", "flat", "sparse"]).unwrap();
        assert_eq!(matrix.get("x", "flat"), Some(Stat::Undefined));
        assert_eq!(matrix.get("flat", "flat"), Some(Stat::Undefined));
        assert_eq!(matrix.get("x", "sparse"), Some(Stat::Undefined));
    }
}
