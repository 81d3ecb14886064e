//! Reading delimited text files into raw datasets.

use std::{
    fs::File,
    io::{Seek, SeekFrom},
    path::Path,
    sync::Arc,
};

use arrow_csv::{ReaderBuilder, reader::Format};
use arrow_schema::{ArrowError, DataType, Field, Schema as ArrowSchema};
use arrow_select::concat::concat_batches;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    dataset::{Dataset, first_duplicate},
    error::Error,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    pub delimiter: char,
    /// Drop rows with any missing cell before inference.
    pub drop_incomplete_rows: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            drop_incomplete_rows: false,
        }
    }
}

/// Read a delimited file with a header line. Every column is read as text;
/// classification is left to [`infer_schema`](crate::infer_schema).
pub fn read_csv(path: &Path, options: &SourceOptions) -> Result<Dataset, Error> {
    let delimiter = u8::try_from(options.delimiter).map_err(|_| {
        ArrowError::CsvError(format!(
            "Delimiter {:?} is not a single byte",
            options.delimiter
        ))
    })?;
    let format = Format::default()
        .with_header(true)
        .with_delimiter(delimiter);

    let mut file = File::open(path)?;
    let (header, _) = format.infer_schema(&mut file, None)?;
    file.seek(SeekFrom::Start(0))?;
    if let Some(name) = first_duplicate(header.fields().iter().map(|field| field.name().as_str())) {
        return Err(Error::DuplicateColumn(name));
    }

    let schema = Arc::new(ArrowSchema::new(
        header
            .fields()
            .iter()
            .map(|field| Field::new(field.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));
    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_format(format)
        .build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    let dataset = Dataset::new(concat_batches(&schema, &batches)?);
    debug!(
        path = %path.display(),
        rows = dataset.num_rows(),
        columns = dataset.num_columns(),
        "Read CSV"
    );

    if options.drop_incomplete_rows {
        dataset.drop_incomplete_rows()
    } else {
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::Value;

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn columns_are_read_as_text() {
        let file = write("sales,region\n10,North\n,South\n");
        let dataset = read_csv(file.path(), &SourceOptions::default()).unwrap();
        assert_eq!(dataset.num_rows(), 2);
        assert_eq!(dataset.column_names().collect::<Vec<_>>(), ["sales", "region"]);
        assert_eq!(dataset.value("sales", 0).unwrap(), Value::Text("10".into()));
        assert_eq!(dataset.value("sales", 1).unwrap(), Value::Missing);
    }

    #[test]
    fn custom_delimiter_and_dropna() {
        let file = write("a;b\n1;x\n2;\n3;z\n");
        let options = SourceOptions {
            delimiter: ';',
            drop_incomplete_rows: true,
        };
        let dataset = read_csv(file.path(), &options).unwrap();
        assert_eq!(dataset.num_rows(), 2);
        assert_eq!(dataset.value("b", 1).unwrap(), Value::Text("z".into()));
    }

    #[test]
    fn repeated_header_is_rejected() {
        let file = write("a,a,b\n1,x,y\n2,z,w\n");
        let result = read_csv(file.path(), &SourceOptions::default());
        assert!(matches!(result, Err(Error::DuplicateColumn(name)) if name == "a"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_csv(&dir.path().join("absent.csv"), &SourceOptions::default());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn ragged_rows_are_an_error() {
        let file = write("a,b\n1,2\n3\n");
        let result = read_csv(file.path(), &SourceOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn multibyte_delimiter_is_rejected() {
        let file = write("a\n1\n");
        let options = SourceOptions {
            delimiter: '→',
            ..SourceOptions::default()
        };
        assert!(matches!(
            read_csv(file.path(), &options),
            Err(Error::Arrow(ArrowError::CsvError(_)))
        ));
    }
}
