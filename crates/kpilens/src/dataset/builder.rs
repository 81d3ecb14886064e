use std::sync::Arc;

use arrow_array::{ArrayRef, Float64Array, RecordBatch, StringArray, TimestampMillisecondArray};
use arrow_schema::{DataType, Field, Schema as ArrowSchema};
use chrono::NaiveDateTime;

use crate::{
    dataset::{Dataset, TIMESTAMP_TYPE, first_duplicate, is_missing_text},
    error::Error,
};

/// Column-by-column construction of a [`Dataset`].
///
/// ```
/// use kpilens::DatasetBuilder;
///
/// let dataset = DatasetBuilder::new()
///     .numeric("sales", [10.0, 20.0])
///     .categorical("region", ["North", "South"])
///     .build()
///     .unwrap();
/// assert_eq!(dataset.num_rows(), 2);
/// ```
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    fields: Vec<Field>,
    columns: Vec<ArrayRef>,
}

impl DatasetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric column; `None` and non-finite values are missing.
    #[must_use]
    pub fn numeric<I>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<f64>>,
    {
        let array: Float64Array = values
            .into_iter()
            .map(|v| v.into().filter(|v| v.is_finite()))
            .collect();
        self.push(name, DataType::Float64, Arc::new(array))
    }

    /// Categorical column; missing markers such as `""` or `"NA"` are missing.
    #[must_use]
    pub fn categorical<I>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let array: StringArray = values
            .into_iter()
            .map(|v| {
                let v = v.as_ref();
                (!is_missing_text(v)).then(|| v.to_owned())
            })
            .collect();
        self.push(name, DataType::Utf8, Arc::new(array))
    }

    #[must_use]
    pub fn temporal<I>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<NaiveDateTime>>,
    {
        let array: TimestampMillisecondArray = values
            .into_iter()
            .map(|v| v.into().map(|dt| dt.and_utc().timestamp_millis()))
            .collect();
        self.push(name, TIMESTAMP_TYPE, Arc::new(array))
    }

    /// Raw text column, left for schema inference to classify.
    #[must_use]
    pub fn text<I>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let array: StringArray = values.into_iter().map(Some).collect();
        self.push(name, DataType::Utf8, Arc::new(array))
    }

    /// Fails when columns differ in length or a name repeats.
    pub fn build(self) -> Result<Dataset, Error> {
        if let Some(name) = first_duplicate(self.fields.iter().map(|f| f.name().as_str())) {
            return Err(Error::DuplicateColumn(name));
        }
        let schema = ArrowSchema::new(self.fields);
        let batch = RecordBatch::try_new(Arc::new(schema), self.columns)?;
        Ok(Dataset::new(batch))
    }

    fn push(mut self, name: &str, data_type: DataType, column: ArrayRef) -> Self {
        self.fields.push(Field::new(name, data_type, true));
        self.columns.push(column);
        self
    }
}
