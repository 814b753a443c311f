//! Dataset types for depurar.
//!
//! Provides the [`Dataset`] trait and [`ArrowDataset`] implementation for
//! working with Arrow-based tabular data, plus the [`ColumnCells`] view
//! that profiling and assessment operate on.

use std::{path::Path, sync::Arc};

use arrow::{array::RecordBatch, datatypes::SchemaRef};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    file::properties::WriterProperties,
};

use crate::error::{Error, Result};

/// A dataset that can be iterated over.
///
/// Datasets provide access to tabular data stored as Arrow RecordBatches.
/// All implementations must be thread-safe (Send + Sync). A dataset is
/// immutable once handed to the assessment core.
pub trait Dataset: Send + Sync {
    /// Returns the total number of rows in the dataset.
    fn len(&self) -> usize;

    /// Returns true if the dataset contains no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the schema of the dataset.
    fn schema(&self) -> SchemaRef;

    /// Returns an iterator over all RecordBatches in the dataset.
    fn iter(&self) -> Box<dyn Iterator<Item = RecordBatch> + Send + '_>;

    /// Returns the number of batches in the dataset.
    fn num_batches(&self) -> usize;

    /// Returns a specific batch by index.
    fn get_batch(&self, index: usize) -> Option<&RecordBatch>;
}

/// An in-memory dataset backed by Arrow RecordBatches.
///
/// This is the primary dataset type for depurar. Quality assessment does
/// not mutate it; profiling and scoring read through the [`ColumnCells`]
/// view produced by [`ArrowDataset::cells`].
///
/// # Example
///
/// ```no_run
/// use depurar::{ArrowDataset, Dataset};
///
/// let dataset = ArrowDataset::from_csv("orders.csv").unwrap();
/// println!("Dataset has {} rows", dataset.len());
/// ```
#[derive(Debug, Clone)]
pub struct ArrowDataset {
    batches: Vec<RecordBatch>,
    schema: SchemaRef,
    row_count: usize,
}

impl ArrowDataset {
    /// Creates a new ArrowDataset from a vector of RecordBatches.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The batches vector is empty
    /// - The batches have inconsistent schemas
    pub fn new(batches: Vec<RecordBatch>) -> Result<Self> {
        if batches.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let schema = batches[0].schema();

        for (i, batch) in batches.iter().enumerate().skip(1) {
            if batch.schema() != schema {
                return Err(Error::schema_mismatch(format!(
                    "Batch {} has different schema than batch 0",
                    i
                )));
            }
        }

        let row_count = batches.iter().map(|b| b.num_rows()).sum();

        Ok(Self {
            batches,
            schema,
            row_count,
        })
    }

    /// Creates an ArrowDataset from a single RecordBatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch vector would be empty.
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        Self::new(vec![batch])
    }

    /// Loads a dataset from a Parquet file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is not valid
    /// Parquet, or contains no batches.
    pub fn from_parquet(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(Error::Parquet)?;
        let reader = builder.build().map_err(Error::Parquet)?;

        let batches: Vec<RecordBatch> = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::Arrow)?;

        if batches.is_empty() {
            return Err(Error::EmptyDataset);
        }

        Self::new(batches)
    }

    /// Saves the dataset to a Parquet file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    pub fn to_parquet(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| Error::io(e, path))?;

        let props = WriterProperties::builder().build();
        let mut writer =
            ArrowWriter::try_new(file, self.schema.clone(), Some(props)).map_err(Error::Parquet)?;

        for batch in &self.batches {
            writer.write(batch).map_err(Error::Parquet)?;
        }

        writer.close().map_err(Error::Parquet)?;
        Ok(())
    }

    /// Loads a dataset from a CSV file, inferring the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is not valid CSV,
    /// or is empty.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_csv_with_options(path, CsvOptions::default())
    }

    /// Loads a dataset from a CSV file with options.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the file is empty.
    pub fn from_csv_with_options(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self> {
        use std::io::{BufReader, Seek, SeekFrom};

        use arrow_csv::{reader::Format, ReaderBuilder};

        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
        let mut buf_reader = BufReader::new(file);

        let schema = if let Some(schema) = options.schema {
            Arc::new(schema)
        } else {
            let mut format = Format::default().with_header(options.has_header);
            if let Some(delim) = options.delimiter {
                format = format.with_delimiter(delim);
            }
            let (inferred, _) = format
                .infer_schema(&mut buf_reader, Some(1000))
                .map_err(Error::Arrow)?;

            buf_reader
                .seek(SeekFrom::Start(0))
                .map_err(|e| Error::io(e, path))?;

            Arc::new(inferred)
        };

        let mut builder = ReaderBuilder::new(schema)
            .with_batch_size(options.batch_size)
            .with_header(options.has_header);

        if let Some(delim) = options.delimiter {
            builder = builder.with_delimiter(delim);
        }

        let reader = builder.build(buf_reader).map_err(Error::Arrow)?;

        let batches: Vec<RecordBatch> = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::Arrow)?;

        if batches.is_empty() {
            return Err(Error::EmptyDataset);
        }

        Self::new(batches)
    }

    /// Loads a dataset from a CSV string with a header row.
    ///
    /// Convenient for tests and small inline datasets.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid CSV or is empty.
    pub fn from_csv_str(data: &str) -> Result<Self> {
        use std::io::Cursor;

        use arrow_csv::{reader::Format, ReaderBuilder};

        let mut cursor_for_infer = Cursor::new(data.as_bytes());
        let format = Format::default().with_header(true);
        let (inferred, _) = format
            .infer_schema(&mut cursor_for_infer, Some(1000))
            .map_err(Error::Arrow)?;

        let schema = Arc::new(inferred);
        let cursor = Cursor::new(data.as_bytes());

        let builder = ReaderBuilder::new(schema)
            .with_batch_size(8192)
            .with_header(true);

        let reader = builder.build(cursor).map_err(Error::Arrow)?;

        let batches: Vec<RecordBatch> = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::Arrow)?;

        if batches.is_empty() {
            return Err(Error::EmptyDataset);
        }

        Self::new(batches)
    }

    /// Loads a dataset from a newline-delimited JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid NDJSON or is empty.
    pub fn from_json_str(data: &str) -> Result<Self> {
        use std::io::Cursor;

        use arrow_json::ReaderBuilder;

        let cursor_for_infer = Cursor::new(data.as_bytes());
        let (inferred, _) = arrow_json::reader::infer_json_schema(cursor_for_infer, Some(1000))
            .map_err(Error::Arrow)?;

        let schema = Arc::new(inferred);
        let cursor = Cursor::new(data.as_bytes());

        let reader = ReaderBuilder::new(schema)
            .with_batch_size(8192)
            .build(cursor)
            .map_err(Error::Arrow)?;

        let batches: Vec<RecordBatch> = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::Arrow)?;

        if batches.is_empty() {
            return Err(Error::EmptyDataset);
        }

        Self::new(batches)
    }

    /// Returns the underlying record batches.
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Collects the dataset into a [`ColumnCells`] view.
    ///
    /// Every cell is stringified once; profiling and all dimension
    /// assessors share this single pass over the Arrow arrays.
    pub fn cells(&self) -> ColumnCells {
        self.collect_cells(self.row_count)
    }

    /// Collects at most `max_rows` leading rows into a [`ColumnCells`]
    /// view. Used for bounded-sample fingerprinting of large datasets.
    pub fn sample_cells(&self, max_rows: usize) -> ColumnCells {
        self.collect_cells(max_rows.min(self.row_count))
    }

    fn collect_cells(&self, rows: usize) -> ColumnCells {
        let schema = self.schema();
        let mut columns: Vec<(String, Vec<Option<String>>)> = schema
            .fields()
            .iter()
            .map(|f| (f.name().clone(), Vec::with_capacity(rows)))
            .collect();

        let mut collected = 0usize;
        for batch in &self.batches {
            if collected >= rows {
                break;
            }
            let take = (rows - collected).min(batch.num_rows());
            for (col_idx, (_, values)) in columns.iter_mut().enumerate() {
                let array = batch.column(col_idx);
                for i in 0..take {
                    values.push(cell_to_string(array.as_ref(), i));
                }
            }
            collected += take;
        }

        ColumnCells {
            columns,
            row_count: rows,
        }
    }
}

impl Dataset for ArrowDataset {
    fn len(&self) -> usize {
        self.row_count
    }

    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = RecordBatch> + Send + '_> {
        Box::new(self.batches.iter().cloned())
    }

    fn num_batches(&self) -> usize {
        self.batches.len()
    }

    fn get_batch(&self, index: usize) -> Option<&RecordBatch> {
        self.batches.get(index)
    }
}

/// Options for CSV parsing.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the file has a header row.
    pub has_header: bool,
    /// Field delimiter (defaults to comma).
    pub delimiter: Option<u8>,
    /// Batch size for reading.
    pub batch_size: usize,
    /// Explicit schema (inferred when absent).
    pub schema: Option<arrow::datatypes::Schema>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: None,
            batch_size: 8192,
            schema: None,
        }
    }
}

impl CsvOptions {
    /// Creates default CSV options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the file has a header row.
    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Sets the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets an explicit schema.
    #[must_use]
    pub fn with_schema(mut self, schema: arrow::datatypes::Schema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Ordered, stringified view of a dataset's columns.
///
/// Column order follows the schema. Every column vector has exactly
/// `row_count` entries; `None` marks a null cell.
#[derive(Debug, Clone)]
pub struct ColumnCells {
    columns: Vec<(String, Vec<Option<String>>)>,
    row_count: usize,
}

impl ColumnCells {
    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the ordered column names.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the values of a column by name.
    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Iterates over `(name, values)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<String>])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

/// Stringifies a single cell of an Arrow array.
///
/// Nested list and struct values serialize to bracketed forms so they
/// stay comparable for uniqueness and duplicate checks.
fn cell_to_string(array: &dyn arrow::array::Array, idx: usize) -> Option<String> {
    use arrow::array::{
        Array, BooleanArray, Date32Array, Date64Array, Float32Array, Float64Array, Int16Array,
        Int32Array, Int64Array, ListArray, StringArray, StructArray, TimestampMicrosecondArray,
        TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray, UInt32Array,
        UInt64Array,
    };

    if array.is_null(idx) {
        return None;
    }

    let rendered = if let Some(a) = array.as_any().downcast_ref::<StringArray>() {
        a.value(idx).to_string()
    } else if let Some(a) = array.as_any().downcast_ref::<Int16Array>() {
        a.value(idx).to_string()
    } else if let Some(a) = array.as_any().downcast_ref::<Int32Array>() {
        a.value(idx).to_string()
    } else if let Some(a) = array.as_any().downcast_ref::<Int64Array>() {
        a.value(idx).to_string()
    } else if let Some(a) = array.as_any().downcast_ref::<UInt32Array>() {
        a.value(idx).to_string()
    } else if let Some(a) = array.as_any().downcast_ref::<UInt64Array>() {
        a.value(idx).to_string()
    } else if let Some(a) = array.as_any().downcast_ref::<Float64Array>() {
        a.value(idx).to_string()
    } else if let Some(a) = array.as_any().downcast_ref::<Float32Array>() {
        a.value(idx).to_string()
    } else if let Some(a) = array.as_any().downcast_ref::<BooleanArray>() {
        a.value(idx).to_string()
    } else if let Some(a) = array.as_any().downcast_ref::<Date32Array>() {
        a.value_as_date(idx)
            .map(|d| d.to_string())
            .unwrap_or_else(|| a.value(idx).to_string())
    } else if let Some(a) = array.as_any().downcast_ref::<Date64Array>() {
        a.value_as_date(idx)
            .map(|d| d.to_string())
            .unwrap_or_else(|| a.value(idx).to_string())
    } else if let Some(a) = array.as_any().downcast_ref::<TimestampSecondArray>() {
        a.value_as_datetime(idx)
            .map(|d| d.to_string())
            .unwrap_or_else(|| a.value(idx).to_string())
    } else if let Some(a) = array.as_any().downcast_ref::<TimestampMillisecondArray>() {
        a.value_as_datetime(idx)
            .map(|d| d.to_string())
            .unwrap_or_else(|| a.value(idx).to_string())
    } else if let Some(a) = array.as_any().downcast_ref::<TimestampMicrosecondArray>() {
        a.value_as_datetime(idx)
            .map(|d| d.to_string())
            .unwrap_or_else(|| a.value(idx).to_string())
    } else if let Some(a) = array.as_any().downcast_ref::<TimestampNanosecondArray>() {
        a.value_as_datetime(idx)
            .map(|d| d.to_string())
            .unwrap_or_else(|| a.value(idx).to_string())
    } else if let Some(a) = array.as_any().downcast_ref::<ListArray>() {
        serialize_list_value(a, idx)
    } else if let Some(a) = array.as_any().downcast_ref::<StructArray>() {
        serialize_struct_value(a, idx)
    } else {
        "?".to_string()
    };

    Some(rendered)
}

/// Serialize a list value at index to a comparable string.
fn serialize_list_value(arr: &arrow::array::ListArray, idx: usize) -> String {
    use arrow::array::Array;

    let values = arr.value(idx);
    let parts: Vec<String> = (0..values.len())
        .map(|i| cell_to_string(values.as_ref(), i).unwrap_or_else(|| "null".to_string()))
        .collect();

    format!("[{}]", parts.join(","))
}

/// Serialize a struct value at index to a comparable string.
fn serialize_struct_value(arr: &arrow::array::StructArray, idx: usize) -> String {
    let mut parts = Vec::new();

    for (field_idx, field) in arr.fields().iter().enumerate() {
        let col = arr.column(field_idx);
        let value =
            cell_to_string(col.as_ref(), idx).unwrap_or_else(|| "null".to_string());
        parts.push(format!("{}:{}", field.name(), value));
    }

    format!("{{{}}}", parts.join(","))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{Float64Array, Int32Array, RecordBatch, StringArray},
        datatypes::{DataType, Field, Schema},
    };

    use super::*;

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("score", DataType::Float64, false),
        ]));

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])),
                Arc::new(Float64Array::from(vec![1.5, 2.5, 3.5])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_empty_batches() {
        let result = ArrowDataset::new(vec![]);
        assert!(matches!(result, Err(Error::EmptyDataset)));
    }

    #[test]
    fn test_from_batch() {
        let dataset = ArrowDataset::from_batch(sample_batch()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.num_batches(), 1);
        assert!(!dataset.is_empty());
    }

    #[test]
    fn test_schema_mismatch() {
        let batch1 = sample_batch();
        let schema2 = Arc::new(Schema::new(vec![Field::new("x", DataType::Int32, false)]));
        let batch2 =
            RecordBatch::try_new(schema2, vec![Arc::new(Int32Array::from(vec![1]))]).unwrap();

        let result = ArrowDataset::new(vec![batch1, batch2]);
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    }

    #[test]
    fn test_from_csv_str() {
        let csv = "id,name\n1,alice\n2,bob\n";
        let dataset = ArrowDataset::from_csv_str(csv).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.schema().fields().len(), 2);
    }

    #[test]
    fn test_from_csv_error() {
        let result = ArrowDataset::from_csv("/nonexistent/path/to/file.csv");
        assert!(result.is_err());
    }

    #[test]
    fn test_parquet_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("roundtrip.parquet");

        let original = ArrowDataset::from_batch(sample_batch()).unwrap();
        original.to_parquet(&path).unwrap();

        let loaded = ArrowDataset::from_parquet(&path).unwrap();
        assert_eq!(loaded.len(), original.len());
        assert_eq!(loaded.schema(), original.schema());
    }

    #[test]
    fn test_cells_view() {
        let dataset = ArrowDataset::from_batch(sample_batch()).unwrap();
        let cells = dataset.cells();

        assert_eq!(cells.row_count(), 3);
        assert_eq!(cells.column_count(), 3);
        assert_eq!(
            cells.column_names().collect::<Vec<_>>(),
            vec!["id", "name", "score"]
        );

        let names = cells.column("name").unwrap();
        assert_eq!(names[0].as_deref(), Some("a"));
        assert_eq!(names[1], None);

        let ids = cells.column("id").unwrap();
        assert_eq!(ids[0].as_deref(), Some("1"));

        assert!(cells.column("missing").is_none());
    }

    #[test]
    fn test_cells_preserve_row_count_across_batches() {
        let b1 = sample_batch();
        let b2 = sample_batch();
        let dataset = ArrowDataset::new(vec![b1, b2]).unwrap();

        let cells = dataset.cells();
        assert_eq!(cells.row_count(), 6);
        assert_eq!(cells.column("score").unwrap().len(), 6);
    }
}
