//! Column classification and default column selection.
//!
//! Classification works on unannotated input: a column is numeric when every
//! non-missing value parses as a number, temporal when its name mentions a
//! date or time or every value parses as one, and categorical otherwise.

use arrow_array::{Array, cast::AsArray};
use arrow_cast::cast;
use arrow_schema::DataType;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::{Dataset, first_duplicate, is_missing_text, parse_datetime, parse_number},
    error::SchemaError,
};

/// Name fragments that mark a column as temporal.
pub const TEMPORAL_KEYWORDS: [&str; 4] = ["date", "time", "fecha", "timestamp"];

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Temporal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceOptions {
    /// Case-insensitive substrings of a column name that mark it temporal.
    pub temporal_keywords: Vec<String>,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            temporal_keywords: TEMPORAL_KEYWORDS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl InferenceOptions {
    fn names_time(&self, column: &str) -> bool {
        let column = column.to_lowercase();
        self.temporal_keywords
            .iter()
            .any(|keyword| column.contains(&keyword.to_lowercase()))
    }
}

/// Disjoint, source-ordered lists of column names by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    temporal_columns: Vec<String>,
}

impl Schema {
    #[must_use]
    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    #[must_use]
    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    #[must_use]
    pub fn temporal_columns(&self) -> &[String] {
        &self.temporal_columns
    }

    #[must_use]
    pub fn first_numeric(&self) -> Option<&str> {
        self.numeric_columns.first().map(String::as_str)
    }

    #[must_use]
    pub fn first_categorical(&self) -> Option<&str> {
        self.categorical_columns.first().map(String::as_str)
    }

    #[must_use]
    pub fn first_temporal(&self) -> Option<&str> {
        self.temporal_columns.first().map(String::as_str)
    }

    #[must_use]
    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        let has = |columns: &[String]| columns.iter().any(|c| c == column);
        if has(&self.numeric_columns) {
            Some(ColumnKind::Numeric)
        } else if has(&self.categorical_columns) {
            Some(ColumnKind::Categorical)
        } else if has(&self.temporal_columns) {
            Some(ColumnKind::Temporal)
        } else {
            None
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.numeric_columns.len() + self.categorical_columns.len() + self.temporal_columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, column: String, kind: ColumnKind) {
        match kind {
            ColumnKind::Numeric => self.numeric_columns.push(column),
            ColumnKind::Categorical => self.categorical_columns.push(column),
            ColumnKind::Temporal => self.temporal_columns.push(column),
        }
    }
}

/// Classify every column with the default keyword set.
pub fn infer_schema(dataset: &Dataset) -> Result<Schema, SchemaError> {
    infer_schema_with(dataset, &InferenceOptions::default())
}

pub fn infer_schema_with(
    dataset: &Dataset,
    options: &InferenceOptions,
) -> Result<Schema, SchemaError> {
    if dataset.num_columns() == 0 {
        return Err(SchemaError::NoColumns);
    }
    if let Some(name) = first_duplicate(dataset.column_names()) {
        return Err(SchemaError::DuplicateColumn(name));
    }
    if dataset.num_rows() == 0 {
        return Err(SchemaError::NoRows);
    }
    let mut schema = Schema::default();
    for (field, array) in dataset
        .batch()
        .schema_ref()
        .fields()
        .iter()
        .zip(dataset.batch().columns())
    {
        let kind = classify_column(field.name(), array, options);
        schema.push(field.name().clone(), kind);
    }
    Ok(schema)
}

/// Kind of a single column, judged from its Arrow type and, for text, its values.
#[must_use]
pub fn classify_column(name: &str, array: &dyn Array, options: &InferenceOptions) -> ColumnKind {
    match array.data_type() {
        data_type if data_type.is_numeric() => ColumnKind::Numeric,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(..) => ColumnKind::Temporal,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            classify_text(name, array, options)
        }
        _ => ColumnKind::Categorical,
    }
}

fn classify_text(name: &str, array: &dyn Array, options: &InferenceOptions) -> ColumnKind {
    let Ok(text) = cast(array, &DataType::Utf8) else {
        return ColumnKind::Categorical;
    };
    let values: Vec<&str> = text
        .as_string::<i32>()
        .iter()
        .flatten()
        .filter(|s| !is_missing_text(s))
        .collect();
    if values.iter().all(|s| parse_number(s).is_ok()) {
        ColumnKind::Numeric
    } else if options.names_time(name) || values.iter().all(|s| parse_datetime(s).is_ok()) {
        ColumnKind::Temporal
    } else {
        ColumnKind::Categorical
    }
}

/// Default measure, dimension and time columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSelection {
    pub measure_column: String,
    pub dimension_column: Option<String>,
    pub time_column: Option<String>,
}

impl DefaultSelection {
    #[must_use]
    pub fn new(measure_column: impl Into<String>) -> Self {
        Self {
            measure_column: measure_column.into(),
            dimension_column: None,
            time_column: None,
        }
    }

    #[must_use]
    pub fn with_dimension(mut self, column: impl Into<String>) -> Self {
        self.dimension_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_time(mut self, column: impl Into<String>) -> Self {
        self.time_column = Some(column.into());
        self
    }
}

/// The first column of each kind in source order. A measure is mandatory.
pub fn select_defaults(schema: &Schema) -> Result<DefaultSelection, SchemaError> {
    let measure_column = schema.first_numeric().ok_or(SchemaError::NoNumericColumn)?;
    Ok(DefaultSelection {
        measure_column: measure_column.to_owned(),
        dimension_column: schema.first_categorical().map(ToOwned::to_owned),
        time_column: schema.first_temporal().map(ToOwned::to_owned),
    })
}
