//! Error types for depurar.

use std::path::PathBuf;

use crate::assess::AssessmentResult;

/// Result type alias for depurar operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in depurar operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path where the error occurred, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Arrow error during data processing.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error during file operations.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Column not found in schema.
    #[error("Column '{name}' not found in schema")]
    ColumnNotFound {
        /// The name of the missing column.
        name: String,
    },

    /// Empty dataset error.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Schema mismatch between batches.
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        /// Description of the schema mismatch.
        message: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
    },

    /// Data error.
    #[error("Data error: {message}")]
    Data {
        /// Description of the data error.
        message: String,
    },

    /// Standard generation failed (e.g., dimension weights violate the
    /// overall ceiling).
    #[error("Standard generation failed: {message}")]
    StandardGeneration {
        /// Description of the generation failure.
        message: String,
    },

    /// No standard registered under the requested name.
    #[error("Standard '{name}' not found")]
    StandardNotFound {
        /// The requested standard name.
        name: String,
    },

    /// A field requirement could not be evaluated.
    ///
    /// Scoped to a single dimension assessor: the engine converts this
    /// into a zero sub-score for that dimension rather than aborting the
    /// assessment.
    #[error("Malformed requirement for field '{field}': {message}")]
    MalformedRequirement {
        /// The field whose requirement is malformed.
        field: String,
        /// Description of the problem.
        message: String,
    },

    /// The quality gate blocked a protected operation.
    ///
    /// Carries the full assessment so callers can inspect which checks
    /// failed.
    #[error(
        "Quality gate blocked: score {score:.2} below required {required:.2}",
        score = .assessment.overall_score,
        required = .required
    )]
    GateBlocked {
        /// The score threshold that was not met.
        required: f64,
        /// The assessment that triggered the block.
        assessment: Box<AssessmentResult>,
    },
}

impl Error {
    /// Create an I/O error with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Create a column not found error.
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a data error.
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Create a standard generation error.
    pub fn standard_generation(message: impl Into<String>) -> Self {
        Self::StandardGeneration {
            message: message.into(),
        }
    }

    /// Create a standard not found error.
    pub fn standard_not_found(name: impl Into<String>) -> Self {
        Self::StandardNotFound { name: name.into() }
    }

    /// Create a malformed requirement error.
    pub fn malformed_requirement(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRequirement {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io(io_err, "/path/to/data.csv");
        assert!(err.to_string().contains("/path/to/data.csv"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_column_not_found() {
        let err = Error::column_not_found("customer_id");
        assert!(err.to_string().contains("customer_id"));
    }

    #[test]
    fn test_empty_dataset() {
        let err = Error::EmptyDataset;
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_schema_mismatch() {
        let err = Error::schema_mismatch("expected Int64, got Utf8");
        assert!(err.to_string().contains("expected Int64, got Utf8"));
    }

    #[test]
    fn test_standard_generation() {
        let err = Error::standard_generation("dimension weights sum to 90, expected 100");
        assert!(err.to_string().contains("weights sum to 90"));
    }

    #[test]
    fn test_standard_not_found() {
        let err = Error::standard_not_found("orders-v2");
        assert!(err.to_string().contains("orders-v2"));
    }

    #[test]
    fn test_malformed_requirement() {
        let err = Error::malformed_requirement("age", "min_value 100 exceeds max_value 10");
        let msg = err.to_string();
        assert!(msg.contains("age"));
        assert!(msg.contains("min_value 100"));
    }

    #[test]
    fn test_invalid_config() {
        let err = Error::invalid_config("capacity must be positive");
        assert!(err.to_string().contains("capacity must be positive"));
    }
}
