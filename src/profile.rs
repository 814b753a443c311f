//! Statistical profiling of datasets.
//!
//! [`DataProfiler`] walks every column once, runs type inference, and
//! computes type-specific statistics. The resulting [`DatasetProfile`] is
//! an immutable value object: re-profiling builds a new profile rather
//! than patching an old one. Profiles feed standard generation and can be
//! persisted as JSON next to the standards they produced.

use serde::{Deserialize, Serialize};

use crate::{
    dataset::{ArrowDataset, ColumnCells},
    infer::{PatternMatch, SemanticType, TypeInferencer},
};

/// Statistical profile of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProfile {
    /// Column name.
    pub name: String,
    /// Inferred semantic type.
    pub semantic_type: SemanticType,
    /// Whether any null values were observed.
    pub nullable: bool,
    /// Number of null cells.
    pub null_count: usize,
    /// Number of distinct non-null values.
    pub unique_count: usize,
    /// Minimum numeric value (numeric types only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum numeric value (numeric types only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Mean numeric value (numeric types only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    /// Shortest string length (text columns only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Longest string length (text columns only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Detected text pattern with confidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PatternMatch>,
    /// Whether the column held values of several natural types.
    pub mixed: bool,
    /// Per-field quality indicator (0-100).
    pub quality: f64,
}

impl FieldProfile {
    /// Whether the column held a single repeated value.
    pub fn is_constant(&self) -> bool {
        self.unique_count <= 1 && self.null_count == 0
    }
}

/// Statistical profile of an entire dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    /// Number of rows profiled.
    pub row_count: usize,
    /// Number of columns in the schema.
    pub column_count: usize,
    /// Ordered per-column profiles (schema order).
    pub fields: Vec<FieldProfile>,
    /// Aggregate quality score (0-100): unweighted mean of field
    /// indicators.
    pub quality: f64,
}

impl DatasetProfile {
    /// Looks up a field profile by column name.
    pub fn field(&self, name: &str) -> Option<&FieldProfile> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Builds a [`DatasetProfile`] from a dataset.
///
/// # Example
///
/// ```
/// use depurar::{ArrowDataset, DataProfiler};
///
/// let dataset = ArrowDataset::from_csv_str("id,name\n1,alice\n2,bob\n").unwrap();
/// let profile = DataProfiler::new().profile(&dataset);
/// assert_eq!(profile.row_count, 2);
/// assert_eq!(profile.fields.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataProfiler {
    inferencer: TypeInferencer,
}

impl DataProfiler {
    /// Creates a profiler with default inference settings.
    pub fn new() -> Self {
        Self {
            inferencer: TypeInferencer::new(),
        }
    }

    /// Bounds the number of values sampled for type inference.
    #[must_use]
    pub fn sample_limit(mut self, limit: usize) -> Self {
        self.inferencer = self.inferencer.sample_limit(limit);
        self
    }

    /// Profiles a dataset.
    ///
    /// A zero-row dataset produces a profile carrying the column count
    /// from the headers, an empty field list, and an aggregate score of 0.
    pub fn profile(&self, dataset: &ArrowDataset) -> DatasetProfile {
        self.profile_cells(&dataset.cells())
    }

    /// Profiles an already-collected cell view.
    pub fn profile_cells(&self, cells: &ColumnCells) -> DatasetProfile {
        let row_count = cells.row_count();
        let column_count = cells.column_count();

        if row_count == 0 {
            return DatasetProfile {
                row_count: 0,
                column_count,
                fields: Vec::new(),
                quality: 0.0,
            };
        }

        let fields: Vec<FieldProfile> = cells
            .iter()
            .map(|(name, values)| self.profile_field(name, values, row_count))
            .collect();

        let quality = if fields.is_empty() {
            0.0
        } else {
            fields.iter().map(|f| f.quality).sum::<f64>() / fields.len() as f64
        };

        DatasetProfile {
            row_count,
            column_count,
            fields,
            quality,
        }
    }

    fn profile_field(&self, name: &str, values: &[Option<String>], row_count: usize) -> FieldProfile {
        use std::collections::HashSet;

        let null_count = values.iter().filter(|v| v.is_none()).count();
        let non_null: Vec<&str> = values.iter().filter_map(|v| v.as_deref()).collect();
        let unique_count = non_null.iter().copied().collect::<HashSet<_>>().len();

        // All-null column: nothing to infer, quality is zero.
        if non_null.is_empty() {
            return FieldProfile {
                name: name.to_string(),
                semantic_type: SemanticType::Unknown,
                nullable: true,
                null_count,
                unique_count: 0,
                min: None,
                max: None,
                mean: None,
                min_length: None,
                max_length: None,
                pattern: None,
                mixed: false,
                quality: 0.0,
            };
        }

        let inference = self.inferencer.infer(values);
        let mut degraded = false;

        let (min, max, mean) = if inference.semantic_type.is_numeric() {
            let (min, max, mean, overflow) = numeric_summary(&non_null);
            degraded |= overflow;
            (min, max, mean)
        } else {
            (None, None, None)
        };

        let (min_length, max_length) = if inference.semantic_type == SemanticType::Text {
            let lengths = non_null.iter().map(|v| v.chars().count());
            (lengths.clone().min(), lengths.max())
        } else {
            (None, None)
        };

        let null_ratio = null_count as f64 / row_count as f64;
        let quality = field_quality(
            null_ratio,
            inference.confidence,
            unique_count,
            row_count,
            degraded,
        );

        FieldProfile {
            name: name.to_string(),
            semantic_type: inference.semantic_type,
            nullable: null_count > 0,
            null_count,
            unique_count,
            min,
            max,
            mean,
            min_length,
            max_length,
            pattern: inference.pattern,
            mixed: inference.mixed,
            quality,
        }
    }
}

/// Min/max/mean over the parseable numeric values of a column.
///
/// Non-numeric entries are excluded rather than aborting the field. A
/// non-finite sum (overflow) drops the mean and flags the field as
/// degraded instead of failing the profile.
fn numeric_summary(values: &[&str]) -> (Option<f64>, Option<f64>, Option<f64>, bool) {
    let numeric: Vec<f64> = values
        .iter()
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect();

    if numeric.is_empty() {
        return (None, None, None, false);
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for v in &numeric {
        min = min.min(*v);
        max = max.max(*v);
        sum += v;
    }

    let mean = sum / numeric.len() as f64;
    if mean.is_finite() {
        (Some(min), Some(max), Some(mean), false)
    } else {
        (Some(min), Some(max), None, true)
    }
}

/// Deduction-style field quality indicator.
fn field_quality(
    null_ratio: f64,
    confidence: f64,
    unique_count: usize,
    row_count: usize,
    degraded: bool,
) -> f64 {
    let mut score = 100.0;
    score -= null_ratio * 40.0;
    score -= (1.0 - confidence) * 30.0;
    if unique_count <= 1 && row_count > 1 {
        score -= 10.0;
    }
    if degraded {
        score -= 15.0;
    }
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{Float64Array, Int32Array, RecordBatch, StringArray},
        datatypes::{DataType, Field, Schema},
    };

    use super::*;
    use crate::infer::TextPattern;

    fn mixed_dataset() -> ArrowDataset {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("email", DataType::Utf8, true),
            Field::new("amount", DataType::Float64, false),
            Field::new("empty", DataType::Utf8, true),
        ]));

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![1, 2, 3, 4])),
                Arc::new(StringArray::from(vec![
                    Some("a@example.com"),
                    Some("b@example.com"),
                    None,
                    Some("c@example.com"),
                ])),
                Arc::new(Float64Array::from(vec![10.5, 20.0, 30.25, 40.0])),
                Arc::new(StringArray::from(vec![
                    None::<&str>,
                    None,
                    None,
                    None,
                ])),
            ],
        )
        .unwrap();

        ArrowDataset::from_batch(batch).unwrap()
    }

    fn zero_row_dataset() -> ArrowDataset {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(Vec::<i32>::new())),
                Arc::new(StringArray::from(Vec::<Option<&str>>::new())),
            ],
        )
        .unwrap();
        ArrowDataset::from_batch(batch).unwrap()
    }

    #[test]
    fn test_profile_basic() {
        let profile = DataProfiler::new().profile(&mixed_dataset());

        assert_eq!(profile.row_count, 4);
        assert_eq!(profile.column_count, 4);
        assert_eq!(profile.fields.len(), 4);

        let id = profile.field("id").unwrap();
        assert_eq!(id.semantic_type, SemanticType::Integer);
        assert!(!id.nullable);
        assert_eq!(id.unique_count, 4);
        assert_eq!(id.min, Some(1.0));
        assert_eq!(id.max, Some(4.0));
        assert_eq!(id.mean, Some(2.5));
    }

    #[test]
    fn test_profile_email_pattern() {
        let profile = DataProfiler::new().profile(&mixed_dataset());
        let email = profile.field("email").unwrap();

        assert_eq!(email.semantic_type, SemanticType::Text);
        assert!(email.nullable);
        assert_eq!(email.null_count, 1);
        let pattern = email.pattern.unwrap();
        assert_eq!(pattern.pattern, TextPattern::Email);
        assert_eq!(email.min_length, Some(13));
        assert_eq!(email.max_length, Some(13));
    }

    #[test]
    fn test_profile_all_null_column() {
        let profile = DataProfiler::new().profile(&mixed_dataset());
        let empty = profile.field("empty").unwrap();

        assert_eq!(empty.semantic_type, SemanticType::Unknown);
        assert_eq!(empty.null_count, 4);
        assert_eq!(empty.unique_count, 0);
        assert!((empty.quality - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_profile_zero_rows() {
        let profile = DataProfiler::new().profile(&zero_row_dataset());

        assert_eq!(profile.row_count, 0);
        assert_eq!(profile.column_count, 2);
        assert!(profile.fields.is_empty());
        assert!((profile.quality - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_profile_idempotent() {
        let dataset = mixed_dataset();
        let profiler = DataProfiler::new();
        let first = profiler.profile(&dataset);
        let second = profiler.profile(&dataset);
        assert_eq!(first, second);
    }

    #[test]
    fn test_profile_invariants() {
        let profile = DataProfiler::new().profile(&mixed_dataset());
        for field in &profile.fields {
            assert!(field.null_count <= profile.row_count);
            if let (Some(min), Some(max)) = (field.min, field.max) {
                assert!(min <= max);
            }
            assert!((0.0..=100.0).contains(&field.quality));
        }
        assert!((0.0..=100.0).contains(&profile.quality));
    }

    #[test]
    fn test_numeric_summary_excludes_garbage() {
        let (min, max, mean, degraded) = numeric_summary(&["1", "x", "3"]);
        assert_eq!(min, Some(1.0));
        assert_eq!(max, Some(3.0));
        assert_eq!(mean, Some(2.0));
        assert!(!degraded);
    }

    #[test]
    fn test_numeric_summary_overflow_degrades() {
        let big = format!("{:e}", f64::MAX);
        let (_, _, mean, degraded) = numeric_summary(&[&big, &big, &big]);
        assert_eq!(mean, None);
        assert!(degraded);
    }

    #[test]
    fn test_profile_serializes() {
        let profile = DataProfiler::new().profile(&mixed_dataset());
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"row_count\":4"));
        let back: DatasetProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
