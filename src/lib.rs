//! depurar - Data Quality Assessment and Gating in Pure Rust
//!
//! Assesses tabular datasets against declarative quality standards,
//! scores them across five independent dimensions, and gates business
//! logic on the result.
//!
//! # Design Principles
//!
//! 1. **Declarative standards** - requirements live in a versioned value
//!    object, not in code
//! 2. **Pure Rust** - no Python, no FFI
//! 3. **Arrow-native** - datasets are Arrow `RecordBatch` collections
//!    (Arrow 53, Parquet 53)
//! 4. **Deterministic scoring** - identical inputs always produce
//!    identical scores
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use depurar::{ArrowDataset, MemoryStandardStore, ProtectionGuard};
//!
//! // Load a dataset
//! let dataset = ArrowDataset::from_csv("data/orders.csv").unwrap();
//!
//! // Guard an operation on it; a standard is generated from the data's
//! // own profile on first use.
//! let store = Arc::new(MemoryStandardStore::new());
//! let guard = ProtectionGuard::new("orders", store).auto_generate(true);
//!
//! let outcome = guard
//!     .invoke(&dataset, |d| Ok(d.batches().len()))
//!     .unwrap();
//! println!("decision: {:?}", outcome.decision);
//! ```
//!
//! # Dimensions
//!
//! | Dimension    | Scores                                          |
//! |--------------|-------------------------------------------------|
//! | Validity     | type and pattern conformance                    |
//! | Completeness | required fields present and non-null            |
//! | Consistency  | uniqueness and cross-field relations            |
//! | Freshness    | timestamp-bearing fields within staleness bound |
//! | Plausibility | numeric values inside declared ranges           |
//!
//! Each dimension contributes up to its weight (20 points by default);
//! the five weights always sum to 100.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_lossless,
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::float_cmp,
        clippy::too_many_lines
    )
)]
// Allow some pedantic lints for cleaner code
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::map_unwrap_or)]

pub mod assess;
pub mod cache;
pub mod dataset;
pub mod error;
pub mod generate;
pub mod guard;
pub mod infer;
pub mod profile;
pub mod standard;

// Re-exports for convenience
pub use assess::{
    default_assessors, AssessmentEngine, AssessmentResult, CompletenessAssessor,
    ConsistencyAssessor, DimensionAssessor, DimensionOutcome, DimensionScores, FailedCheck,
    FieldAnalysis, FreshnessAssessor, PlausibilityAssessor, ValidityAssessor,
};
pub use cache::{Fingerprint, FingerprintCache};
pub use dataset::{ArrowDataset, ColumnCells, CsvOptions, Dataset};
pub use error::{Error, Result};
pub use generate::StandardGenerator;
pub use guard::{FailurePolicy, GuardDecision, GuardedOutcome, ProtectionGuard};
pub use infer::{PatternMatch, SemanticType, TextPattern, TypeInference, TypeInferencer};
pub use profile::{DataProfiler, DatasetProfile, FieldProfile};
pub use standard::{
    Dimension, DimensionWeights, FieldRequirement, MemoryStandardStore, Requirements, Standard,
    StandardMeta, StandardStore, DIMENSION_CEILING, OVERALL_CEILING,
};
