//! Declarative row filters and the read-only views they produce.

use std::{collections::BTreeSet, io::Write, ops::Deref};

use arrow_arith::aggregate::{max, min};
use arrow_array::{Array, BooleanArray};
use arrow_csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{dataset::Dataset, error::Error, schema::DefaultSelection};

/// Which values of the dimension column a row may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    #[default]
    All,
    /// Only these values. An empty set admits no row.
    Only(BTreeSet<String>),
}

impl CategoryFilter {
    pub fn only<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::Only(values.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn none() -> Self {
        Self::Only(BTreeSet::new())
    }
}

/// Closed interval `[min, max]` on the measure column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub category_filter: CategoryFilter,
    pub value_range: Option<ValueRange>,
}

impl Filter {
    /// Admits every row.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_categories(mut self, category_filter: CategoryFilter) -> Self {
        self.category_filter = category_filter;
        self
    }

    #[must_use]
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.value_range = Some(ValueRange::new(min, max));
        self
    }
}

/// Rows of a dataset that passed a [`Filter`], in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView {
    dataset: Dataset,
    source_rows: Vec<usize>,
}

impl FilteredView {
    /// Index of each kept row in the dataset the view was filtered from.
    #[must_use]
    pub fn source_rows(&self) -> &[usize] {
        &self.source_rows
    }

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[must_use]
    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    /// Filter this view again, keeping row indices relative to the original
    /// dataset.
    pub fn refine(&self, selection: &DefaultSelection, filter: &Filter) -> Result<Self, Error> {
        let view = apply_filter(&self.dataset, selection, filter)?;
        let source_rows = view
            .source_rows
            .iter()
            .map(|&row| self.source_rows[row])
            .collect();
        Ok(Self {
            dataset: view.dataset,
            source_rows,
        })
    }

    /// Write the kept rows as CSV with a header line.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut writer = WriterBuilder::new().with_header(true).build(writer);
        writer.write(self.dataset.batch())?;
        Ok(())
    }
}

impl Deref for FilteredView {
    type Target = Dataset;

    fn deref(&self) -> &Self::Target {
        &self.dataset
    }
}

/// Keep the rows that pass both the category and the range predicate.
///
/// The category predicate is skipped when the selection has no dimension
/// column. Rows with a missing measure fail any range.
pub fn apply_filter(
    dataset: &Dataset,
    selection: &DefaultSelection,
    filter: &Filter,
) -> Result<FilteredView, Error> {
    let categories = match (&filter.category_filter, &selection.dimension_column) {
        (CategoryFilter::Only(allowed), Some(column)) => Some((allowed, dataset.labels(column)?)),
        _ => None,
    };
    let measures = match filter.value_range {
        Some(range) => Some((range, dataset.numbers(&selection.measure_column)?)),
        None => None,
    };

    let keep: Vec<usize> = (0..dataset.num_rows())
        .filter(|&row| {
            let category_ok = categories.as_ref().is_none_or(|(allowed, labels)| {
                labels.is_valid(row) && allowed.contains(labels.value(row))
            });
            let range_ok = measures.as_ref().is_none_or(|(range, values)| {
                values.is_valid(row) && range.contains(values.value(row))
            });
            category_ok && range_ok
        })
        .collect();

    let mut mask = vec![false; dataset.num_rows()];
    for &row in &keep {
        mask[row] = true;
    }
    let filtered = dataset.filter(&BooleanArray::from(mask))?;
    debug!(
        rows = dataset.num_rows(),
        kept = filtered.num_rows(),
        "Applied filter"
    );
    Ok(FilteredView {
        dataset: filtered,
        source_rows: keep,
    })
}

/// The `[min, max]` of a numeric column, the widest range a filter can use.
pub fn value_bounds(dataset: &Dataset, column: &str) -> Result<Option<ValueRange>, Error> {
    let values = dataset.numbers(column)?;
    Ok(min(&values)
        .zip(max(&values))
        .map(|(lo, hi)| ValueRange::new(lo, hi)))
}
