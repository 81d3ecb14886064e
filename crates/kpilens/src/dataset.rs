//! In-memory tabular datasets backed by Arrow record batches.

mod builder;
mod value;

use std::{collections::HashSet, sync::Arc};

use arrow_array::{
    Array, ArrayRef, BooleanArray, Float64Array, RecordBatch, StringArray,
    TimestampMillisecondArray,
    cast::AsArray,
    types::{Float64Type, TimestampMillisecondType},
};
use arrow_cast::cast;
use arrow_schema::{DataType, Field, Schema as ArrowSchema, TimeUnit};
use arrow_select::filter::filter_record_batch;
use indexmap::IndexMap;

use crate::{
    error::Error,
    schema::{ColumnKind, InferenceOptions, Schema, classify_column},
};

pub use self::{builder::DatasetBuilder, value::Value};
pub(crate) use self::value::{is_missing_text, parse_datetime, parse_number};

/// Storage type of temporal columns.
pub const TIMESTAMP_TYPE: DataType = DataType::Timestamp(TimeUnit::Millisecond, None);

/// An immutable, ordered collection of rows sharing one column set.
///
/// Columns may arrive in any Arrow type. [`Dataset::conform`] rewrites them
/// into canonical storage once their [`ColumnKind`] is known: `Float64` for
/// numeric, `Utf8` for categorical and millisecond timestamps for temporal
/// columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    #[must_use]
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    #[must_use]
    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Column names in source order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|field| field.name().as_str())
    }

    pub fn column(&self, name: &str) -> Result<&ArrayRef, Error> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_owned()))
    }

    /// Numeric view of a column. Missing and non-finite cells are null.
    pub fn numbers(&self, name: &str) -> Result<Float64Array, Error> {
        let array = self.column(name)?;
        let values = match array.data_type() {
            DataType::Float64 => array.as_primitive::<Float64Type>().clone(),
            data_type if data_type.is_numeric() => cast(array, &DataType::Float64)?
                .as_primitive::<Float64Type>()
                .clone(),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
                let text = cast(array, &DataType::Utf8)?;
                text.as_string::<i32>()
                    .iter()
                    .map(|cell| cell.map_or(Ok(None), parse_number))
                    .collect::<Result<Float64Array, ()>>()
                    .map_err(|()| kind_error(name, array, ColumnKind::Numeric))?
            }
            _ => return Err(kind_error(name, array, ColumnKind::Numeric)),
        };
        Ok(finite(values))
    }

    /// Text view of any column. Missing markers are null.
    pub fn labels(&self, name: &str) -> Result<StringArray, Error> {
        let array = self.column(name)?;
        let text = cast(array, &DataType::Utf8)?;
        Ok(text
            .as_string::<i32>()
            .iter()
            .map(|cell| cell.filter(|s| !is_missing_text(s)))
            .collect())
    }

    /// Timestamp view of a date, date-time or parseable text column.
    pub fn timestamps(&self, name: &str) -> Result<TimestampMillisecondArray, Error> {
        let array = self.column(name)?;
        match array.data_type() {
            DataType::Timestamp(..) | DataType::Date32 | DataType::Date64 => Ok(cast(
                array,
                &TIMESTAMP_TYPE,
            )?
            .as_primitive::<TimestampMillisecondType>()
            .clone()),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
                let text = cast(array, &DataType::Utf8)?;
                text.as_string::<i32>()
                    .iter()
                    .map(|cell| -> Result<Option<i64>, ()> {
                        let parsed = cell.map_or(Ok(None), parse_datetime)?;
                        Ok(parsed.map(|dt| dt.and_utc().timestamp_millis()))
                    })
                    .collect::<Result<TimestampMillisecondArray, ()>>()
                    .map_err(|()| kind_error(name, array, ColumnKind::Temporal))
            }
            _ => Err(kind_error(name, array, ColumnKind::Temporal)),
        }
    }

    /// A single cell.
    pub fn value(&self, column: &str, row: usize) -> Result<Value, Error> {
        let array = self.column(column)?;
        if row >= array.len() {
            return Err(Error::RowOutOfBounds {
                row,
                len: array.len(),
            });
        }
        if array.is_null(row) {
            return Ok(Value::Missing);
        }
        let cell = array.slice(row, 1);
        let value = match cell.data_type() {
            data_type if data_type.is_numeric() => {
                let v = cast(&cell, &DataType::Float64)?
                    .as_primitive::<Float64Type>()
                    .value(0);
                if v.is_finite() {
                    Value::Number(v)
                } else {
                    Value::Missing
                }
            }
            DataType::Timestamp(..) | DataType::Date32 | DataType::Date64 => cast(
                &cell,
                &TIMESTAMP_TYPE,
            )?
            .as_primitive::<TimestampMillisecondType>()
            .value_as_datetime(0)
            .map_or(Value::Missing, Value::Time),
            _ => {
                let text = cast(&cell, &DataType::Utf8)?;
                let s = text.as_string::<i32>().value(0);
                if is_missing_text(s) {
                    Value::Missing
                } else {
                    Value::Text(s.to_owned())
                }
            }
        };
        Ok(value)
    }

    /// All cells of one row, keyed by column name in source order.
    pub fn row(&self, row: usize) -> Result<IndexMap<String, Value>, Error> {
        self.column_names()
            .map(|name| Ok((name.to_owned(), self.value(name, row)?)))
            .collect()
    }

    /// Rows where `mask` is true, in source order.
    pub fn filter(&self, mask: &BooleanArray) -> Result<Self, Error> {
        Ok(Self::new(filter_record_batch(&self.batch, mask)?))
    }

    /// Remove every row with at least one missing cell.
    pub fn drop_incomplete_rows(&self) -> Result<Self, Error> {
        let presence = self
            .column_names()
            .map(|name| self.labels(name))
            .collect::<Result<Vec<_>, _>>()?;
        let mask: BooleanArray = (0..self.num_rows())
            .map(|row| Some(presence.iter().all(|column| column.is_valid(row))))
            .collect();
        self.filter(&mask)
    }

    /// Rewrite every column into the canonical storage of its kind.
    ///
    /// A temporal column whose values do not all parse as dates (one matched
    /// by name only) is kept as text.
    pub fn conform(&self, schema: &Schema) -> Result<Self, Error> {
        if let Some(name) = first_duplicate(self.column_names()) {
            return Err(Error::DuplicateColumn(name));
        }
        let arrow_schema = self.batch.schema();
        let mut fields = Vec::with_capacity(arrow_schema.fields().len());
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(arrow_schema.fields().len());
        for field in arrow_schema.fields() {
            let name = field.name();
            let kind = schema
                .kind_of(name)
                .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
            let (data_type, column): (DataType, ArrayRef) = match kind {
                ColumnKind::Numeric => (DataType::Float64, Arc::new(self.numbers(name)?)),
                ColumnKind::Temporal => match self.timestamps(name) {
                    Ok(timestamps) => (TIMESTAMP_TYPE, Arc::new(timestamps)),
                    Err(Error::ColumnKind { .. }) => (DataType::Utf8, Arc::new(self.labels(name)?)),
                    Err(e) => return Err(e),
                },
                ColumnKind::Categorical => (DataType::Utf8, Arc::new(self.labels(name)?)),
            };
            fields.push(Field::new(name, data_type, true));
            columns.push(column);
        }
        let batch = RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), columns)?;
        Ok(Self::new(batch))
    }
}

/// The first name that occurs twice.
pub(crate) fn first_duplicate<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .find(|name| !seen.insert(*name))
        .map(str::to_owned)
}

fn kind_error(name: &str, array: &ArrayRef, expected: ColumnKind) -> Error {
    Error::ColumnKind {
        column: name.to_owned(),
        expected,
        actual: classify_column(name, array, &InferenceOptions::default()),
    }
}

fn finite(values: Float64Array) -> Float64Array {
    if values.iter().flatten().all(f64::is_finite) {
        values
    } else {
        values
            .iter()
            .map(|v| v.filter(|v| v.is_finite()))
            .collect()
    }
}
