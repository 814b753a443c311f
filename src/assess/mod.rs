//! Multi-dimension quality assessment.
//!
//! [`AssessmentEngine`] runs five independent [`DimensionAssessor`]s
//! (validity, completeness, consistency, freshness, plausibility) against
//! a dataset and a [`Standard`], then aggregates their sub-scores into an
//! [`AssessmentResult`]. Assessors share no mutable state, so their order
//! never affects the result. A failing assessor degrades its own
//! dimension to zero; it never aborts the other four.

mod dimensions;


pub use dimensions::{
    CompletenessAssessor, ConsistencyAssessor, FreshnessAssessor, PlausibilityAssessor,
    ValidityAssessor,
};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    dataset::{ArrowDataset, ColumnCells},
    error::Result,
    infer::{SemanticType, TypeInferencer},
    standard::{Dimension, Standard},
};

/// A single failed check, attributed to a field and a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedCheck {
    /// The field the check concerns ("*" for dataset-wide checks).
    pub field: String,
    /// The dimension that raised the check.
    pub dimension: Dimension,
    /// Human-readable description of the failure.
    pub reason: String,
}

impl FailedCheck {
    /// Creates a failed check.
    pub fn new(
        field: impl Into<String>,
        dimension: Dimension,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            dimension,
            reason: reason.into(),
        }
    }
}

/// Outcome of a single dimension assessment.
#[derive(Debug, Clone)]
pub struct DimensionOutcome {
    /// Sub-score in `[0, dimension weight]`.
    pub score: f64,
    /// Checks that failed while scoring.
    pub failed: Vec<FailedCheck>,
}

impl DimensionOutcome {
    /// An outcome with a score and no failed checks.
    pub fn clean(score: f64) -> Self {
        Self {
            score,
            failed: Vec::new(),
        }
    }
}

/// Scores one slice of a standard.
///
/// Implementations must be deterministic and side-effect free; the
/// engine may run them in any order.
pub trait DimensionAssessor: Send + Sync {
    /// The dimension this assessor scores.
    fn dimension(&self) -> Dimension;

    /// Scores the dataset against the standard.
    ///
    /// `as_of` is the reference instant for staleness arithmetic.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedRequirement`] when a requirement
    /// cannot be evaluated; the engine converts this into a zero
    /// sub-score for the dimension.
    fn assess(
        &self,
        cells: &ColumnCells,
        standard: &Standard,
        as_of: DateTime<Utc>,
    ) -> Result<DimensionOutcome>;
}

/// The five per-dimension sub-scores, each in `[0, its weight]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DimensionScores {
    /// Validity sub-score.
    pub validity: f64,
    /// Completeness sub-score.
    pub completeness: f64,
    /// Consistency sub-score.
    pub consistency: f64,
    /// Freshness sub-score.
    pub freshness: f64,
    /// Plausibility sub-score.
    pub plausibility: f64,
}

impl DimensionScores {
    /// Returns the sub-score of one dimension.
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Validity => self.validity,
            Dimension::Completeness => self.completeness,
            Dimension::Consistency => self.consistency,
            Dimension::Freshness => self.freshness,
            Dimension::Plausibility => self.plausibility,
        }
    }

    fn set(&mut self, dimension: Dimension, score: f64) {
        match dimension {
            Dimension::Validity => self.validity = score,
            Dimension::Completeness => self.completeness = score,
            Dimension::Consistency => self.consistency = score,
            Dimension::Freshness => self.freshness = score,
            Dimension::Plausibility => self.plausibility = score,
        }
    }

    /// Sum of the five sub-scores.
    pub fn total(&self) -> f64 {
        self.validity + self.completeness + self.consistency + self.freshness + self.plausibility
    }
}

/// Observed-versus-required summary for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAnalysis {
    /// Type observed in the data, if determinable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_type: Option<SemanticType>,
    /// Type the standard requires, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_type: Option<SemanticType>,
    /// Null cells observed.
    pub null_count: usize,
    /// Observed numeric minimum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_min: Option<f64>,
    /// Observed numeric maximum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_max: Option<f64>,
    /// Required numeric minimum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_min: Option<f64>,
    /// Required numeric maximum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_max: Option<f64>,
    /// Number of failed checks naming this field.
    pub violations: usize,
}

/// Result of assessing one dataset against one standard.
///
/// Produced fresh per assessment call and immutable once returned. The
/// shape is stable and named-field for external audit-log writers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// Overall score (0-100): the sum of the dimension sub-scores.
    pub overall_score: f64,
    /// Whether the overall score reached the standard's minimum.
    pub passed: bool,
    /// Per-dimension sub-scores.
    pub dimensions: DimensionScores,
    /// All failed checks, across dimensions.
    pub failed_checks: Vec<FailedCheck>,
    /// Observed-versus-required summary per field named by the standard
    /// or present in the dataset.
    pub field_analysis: BTreeMap<String, FieldAnalysis>,
    /// Rows assessed.
    pub row_count: usize,
    /// Name of the standard assessed against.
    pub standard_name: String,
    /// Version of the standard assessed against.
    pub standard_version: String,
    /// Reference instant of the assessment.
    pub assessed_at: DateTime<Utc>,
}

/// Orchestrates the five dimension assessors.
///
/// # Example
///
/// ```
/// use depurar::{ArrowDataset, AssessmentEngine, Standard};
///
/// let dataset = ArrowDataset::from_csv_str("id\n1\n2\n3\n").unwrap();
/// let standard = Standard::new("ids", "1.0", 60.0);
/// let result = AssessmentEngine::new().assess(&dataset, &standard).unwrap();
/// assert!(result.passed);
/// ```
pub struct AssessmentEngine {
    assessors: Vec<Box<dyn DimensionAssessor>>,
    as_of: Option<DateTime<Utc>>,
}

impl Default for AssessmentEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AssessmentEngine {
    /// Creates an engine with the five default assessors.
    pub fn new() -> Self {
        Self::with_assessors(default_assessors())
    }

    /// Creates an engine with an explicit assessor list.
    ///
    /// Dimensions without an assessor score zero; the injected list
    /// replaces any implicit registry.
    pub fn with_assessors(assessors: Vec<Box<dyn DimensionAssessor>>) -> Self {
        Self {
            assessors,
            as_of: None,
        }
    }

    /// Pins the reference instant used for freshness arithmetic.
    ///
    /// Defaults to the wall clock at each `assess` call; pin it to make
    /// repeated assessments bit-identical.
    #[must_use]
    pub fn as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Assesses a dataset against a standard.
    ///
    /// # Errors
    ///
    /// Returns an error only when the dataset itself cannot be read;
    /// per-dimension failures degrade that dimension's score instead.
    pub fn assess(&self, dataset: &ArrowDataset, standard: &Standard) -> Result<AssessmentResult> {
        self.assess_cells(&dataset.cells(), standard)
    }

    /// Assesses an already-collected cell view against a standard.
    ///
    /// # Errors
    ///
    /// See [`AssessmentEngine::assess`].
    pub fn assess_cells(&self, cells: &ColumnCells, standard: &Standard) -> Result<AssessmentResult> {
        let as_of = self.as_of.unwrap_or_else(Utc::now);

        let mut scores = DimensionScores::default();
        let mut failed_checks = Vec::new();

        for assessor in &self.assessors {
            let dimension = assessor.dimension();
            let weight = standard.weights().weight(dimension);

            match assessor.assess(cells, standard, as_of) {
                Ok(outcome) => {
                    scores.set(dimension, outcome.score.clamp(0.0, weight));
                    failed_checks.extend(outcome.failed);
                }
                Err(e) => {
                    tracing::warn!(
                        dimension = dimension.name(),
                        error = %e,
                        "dimension assessment degraded to zero"
                    );
                    scores.set(dimension, 0.0);
                    let field = match &e {
                        crate::Error::MalformedRequirement { field, .. } => field.clone(),
                        _ => "*".to_string(),
                    };
                    failed_checks.push(FailedCheck::new(field, dimension, e.to_string()));
                }
            }
        }

        let overall_score = scores.total();
        let field_analysis = build_field_analysis(cells, standard, &failed_checks);

        Ok(AssessmentResult {
            overall_score,
            passed: overall_score >= standard.overall_minimum(),
            dimensions: scores,
            failed_checks,
            field_analysis,
            row_count: cells.row_count(),
            standard_name: standard.name().to_string(),
            standard_version: standard.version().to_string(),
            assessed_at: as_of,
        })
    }
}

/// The five default assessors in canonical dimension order.
pub fn default_assessors() -> Vec<Box<dyn DimensionAssessor>> {
    vec![
        Box::new(ValidityAssessor),
        Box::new(CompletenessAssessor),
        Box::new(ConsistencyAssessor),
        Box::new(FreshnessAssessor),
        Box::new(PlausibilityAssessor),
    ]
}

/// Builds the observed-versus-required field summary.
fn build_field_analysis(
    cells: &ColumnCells,
    standard: &Standard,
    failed_checks: &[FailedCheck],
) -> BTreeMap<String, FieldAnalysis> {
    let inferencer = TypeInferencer::new();
    let mut analysis = BTreeMap::new();

    let mut names: Vec<&str> = cells.column_names().collect();
    for name in standard.field_requirements().keys() {
        if !names.iter().any(|n| *n == name.as_str()) {
            names.push(name.as_str());
        }
    }

    for name in names {
        let requirement = standard.field_requirements().get(name);
        let column = cells.column(name);

        let (observed_type, null_count, observed_min, observed_max) = match column {
            Some(values) => {
                let inference = inferencer.infer(values);
                let observed_type = Some(inference.semantic_type);
                let null_count = values.iter().filter(|v| v.is_none()).count();
                let numeric: Vec<f64> = values
                    .iter()
                    .filter_map(|v| v.as_deref())
                    .filter_map(|v| v.trim().parse::<f64>().ok())
                    .filter(|v| v.is_finite())
                    .collect();
                let min = numeric.iter().copied().fold(None, |acc: Option<f64>, v| {
                    Some(acc.map_or(v, |a| a.min(v)))
                });
                let max = numeric.iter().copied().fold(None, |acc: Option<f64>, v| {
                    Some(acc.map_or(v, |a| a.max(v)))
                });
                (observed_type, null_count, min, max)
            }
            None => (None, 0, None, None),
        };

        let violations = failed_checks.iter().filter(|c| c.field == name).count();

        analysis.insert(
            name.to_string(),
            FieldAnalysis {
                observed_type,
                required_type: requirement.and_then(|r| r.semantic_type),
                null_count,
                observed_min,
                observed_max,
                required_min: requirement.and_then(|r| r.min_value),
                required_max: requirement.and_then(|r| r.max_value),
                violations,
            },
        );
    }

    analysis
}
