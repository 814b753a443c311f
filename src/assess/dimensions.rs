//! The five built-in dimension assessors.
//!
//! Each assessor scores one slice of the standard and knows nothing
//! about the other four. Scores are proportional to the conforming
//! fraction of checked cells, scaled to the dimension's weight. A check
//! with nothing to evaluate is vacuously satisfied and yields full
//! credit; the one deliberate exception is completeness on a zero-row
//! dataset, which scores zero because no data is present to satisfy
//! required fields.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{DimensionAssessor, DimensionOutcome, FailedCheck};
use crate::{
    dataset::ColumnCells,
    error::{Error, Result},
    infer::{parse_datetime, TextPattern},
    standard::{Dimension, Standard},
};

/// Resolved form of a pattern requirement.
enum PatternMatcher {
    Builtin(TextPattern),
    Custom(Regex),
}

impl PatternMatcher {
    /// Resolves a pattern requirement: a built-in name or a custom regex.
    fn resolve(field: &str, pattern: &str) -> Result<Self> {
        if let Some(builtin) = TextPattern::by_name(pattern) {
            return Ok(Self::Builtin(builtin));
        }
        Regex::new(pattern).map(Self::Custom).map_err(|e| {
            Error::malformed_requirement(field, format!("invalid pattern '{}': {}", pattern, e))
        })
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Self::Builtin(pattern) => pattern.matches(value),
            Self::Custom(regex) => regex.is_match(value),
        }
    }
}

/// Scales a conforming fraction to the dimension weight.
///
/// Zero checked cells means nothing could be violated: full credit.
fn proportional(weight: f64, violations: usize, checked: usize) -> f64 {
    if checked == 0 {
        return weight;
    }
    weight * (1.0 - violations as f64 / checked as f64)
}

/// Scores type and pattern conformance.
pub struct ValidityAssessor;

impl DimensionAssessor for ValidityAssessor {
    fn dimension(&self) -> Dimension {
        Dimension::Validity
    }

    fn assess(
        &self,
        cells: &ColumnCells,
        standard: &Standard,
        _as_of: DateTime<Utc>,
    ) -> Result<DimensionOutcome> {
        let weight = standard.weights().weight(self.dimension());
        let mut checked = 0usize;
        let mut violations = 0usize;
        let mut failed = Vec::new();

        for (field, req) in standard.field_requirements() {
            if req.semantic_type.is_none() && req.pattern.is_none() {
                continue;
            }

            let matcher = match &req.pattern {
                Some(pattern) => Some(PatternMatcher::resolve(field, pattern)?),
                None => None,
            };

            let Some(values) = cells.column(field) else {
                // A constrained column that is absent fails for every row.
                checked += cells.row_count();
                violations += cells.row_count();
                failed.push(FailedCheck::new(
                    field,
                    self.dimension(),
                    "column not present in dataset",
                ));
                continue;
            };

            let mut field_violations = 0usize;
            let mut field_checked = 0usize;

            for value in values.iter().filter_map(|v| v.as_deref()) {
                field_checked += 1;
                let type_ok = req
                    .semantic_type
                    .map_or(true, |t| t.accepts(value));
                let pattern_ok = matcher
                    .as_ref()
                    .map_or(true, |m| m.matches(value.trim()));
                if !type_ok || !pattern_ok {
                    field_violations += 1;
                }
            }

            checked += field_checked;
            violations += field_violations;

            if field_violations > 0 {
                failed.push(FailedCheck::new(
                    field,
                    self.dimension(),
                    format!(
                        "{} of {} values fail type or pattern conformance",
                        field_violations, field_checked
                    ),
                ));
            }
        }

        Ok(DimensionOutcome {
            score: proportional(weight, violations, checked),
            failed,
        })
    }
}

/// Scores required-field presence.
pub struct CompletenessAssessor;

impl DimensionAssessor for CompletenessAssessor {
    fn dimension(&self) -> Dimension {
        Dimension::Completeness
    }

    fn assess(
        &self,
        cells: &ColumnCells,
        standard: &Standard,
        _as_of: DateTime<Utc>,
    ) -> Result<DimensionOutcome> {
        let weight = standard.weights().weight(self.dimension());
        let row_count = cells.row_count();

        // No data present to satisfy required fields. This asymmetry
        // with the other dimensions is deliberate and relied on by
        // downstream reporting.
        if row_count == 0 {
            return Ok(DimensionOutcome::clean(0.0));
        }

        let mut checked = 0usize;
        let mut missing = 0usize;
        let mut failed = Vec::new();

        for (field, req) in standard.field_requirements() {
            if req.nullable {
                continue;
            }

            checked += row_count;
            let field_missing = match cells.column(field) {
                Some(values) => values.iter().filter(|v| v.is_none()).count(),
                None => row_count,
            };
            missing += field_missing;

            if field_missing > 0 {
                failed.push(FailedCheck::new(
                    field,
                    self.dimension(),
                    format!("{} of {} required values missing", field_missing, row_count),
                ));
            }
        }

        Ok(DimensionOutcome {
            score: proportional(weight, missing, checked),
            failed,
        })
    }
}

/// Scores uniqueness and cross-field relations.
pub struct ConsistencyAssessor;

impl DimensionAssessor for ConsistencyAssessor {
    fn dimension(&self) -> Dimension {
        Dimension::Consistency
    }

    fn assess(
        &self,
        cells: &ColumnCells,
        standard: &Standard,
        _as_of: DateTime<Utc>,
    ) -> Result<DimensionOutcome> {
        let weight = standard.weights().weight(self.dimension());
        let mut checked = 0usize;
        let mut violations = 0usize;
        let mut failed = Vec::new();

        for (field, req) in standard.field_requirements() {
            if req.unique {
                if let Some(values) = cells.column(field) {
                    let non_null: Vec<&str> = values.iter().filter_map(|v| v.as_deref()).collect();
                    let distinct: HashSet<&str> = non_null.iter().copied().collect();
                    let duplicates = non_null.len() - distinct.len();

                    checked += non_null.len();
                    violations += duplicates;

                    if duplicates > 0 {
                        failed.push(FailedCheck::new(
                            field,
                            self.dimension(),
                            format!("{} duplicate values in unique field", duplicates),
                        ));
                    }
                }
            }

            if let Some(target) = &req.must_exist_in {
                let Some(target_values) = cells.column(target) else {
                    return Err(Error::malformed_requirement(
                        field,
                        format!("references unknown column '{}'", target),
                    ));
                };
                let Some(values) = cells.column(field) else {
                    continue;
                };

                let domain: HashSet<&str> =
                    target_values.iter().filter_map(|v| v.as_deref()).collect();
                let mut orphans = 0usize;
                let mut field_checked = 0usize;

                for value in values.iter().filter_map(|v| v.as_deref()) {
                    field_checked += 1;
                    if !domain.contains(value) {
                        orphans += 1;
                    }
                }

                checked += field_checked;
                violations += orphans;

                if orphans > 0 {
                    failed.push(FailedCheck::new(
                        field,
                        self.dimension(),
                        format!("{} values not found in '{}'", orphans, target),
                    ));
                }
            }
        }

        Ok(DimensionOutcome {
            score: proportional(weight, violations, checked),
            failed,
        })
    }
}

/// Scores recency of timestamp-bearing fields.
pub struct FreshnessAssessor;

impl DimensionAssessor for FreshnessAssessor {
    fn dimension(&self) -> Dimension {
        Dimension::Freshness
    }

    fn assess(
        &self,
        cells: &ColumnCells,
        standard: &Standard,
        as_of: DateTime<Utc>,
    ) -> Result<DimensionOutcome> {
        let weight = standard.weights().weight(self.dimension());
        let mut checked = 0usize;
        let mut stale = 0usize;
        let mut failed = Vec::new();

        for (field, req) in standard.field_requirements() {
            let Some(max_hours) = req.max_staleness_hours else {
                continue;
            };
            if !max_hours.is_finite() || max_hours < 0.0 {
                return Err(Error::malformed_requirement(
                    field,
                    format!("max_staleness_hours must be non-negative, got {}", max_hours),
                ));
            }

            let Some(values) = cells.column(field) else {
                continue;
            };

            let max_seconds = max_hours * 3600.0;
            let mut field_stale = 0usize;
            let mut field_checked = 0usize;

            for value in values.iter().filter_map(|v| v.as_deref()) {
                field_checked += 1;
                match parse_datetime(value.trim()) {
                    Some(timestamp) => {
                        let age = (as_of - timestamp).num_seconds() as f64;
                        if age > max_seconds {
                            field_stale += 1;
                        }
                    }
                    // Unreadable timestamps cannot demonstrate recency.
                    None => field_stale += 1,
                }
            }

            checked += field_checked;
            stale += field_stale;

            if field_stale > 0 {
                failed.push(FailedCheck::new(
                    field,
                    self.dimension(),
                    format!(
                        "{} of {} values older than {} hours or unreadable",
                        field_stale, field_checked, max_hours
                    ),
                ));
            }
        }

        // No timestamp-bearing declarations: freshness is vacuously
        // satisfied (proportional() yields full weight for checked == 0).
        Ok(DimensionOutcome {
            score: proportional(weight, stale, checked),
            failed,
        })
    }
}

/// Scores numeric plausibility against declared ranges.
pub struct PlausibilityAssessor;

impl DimensionAssessor for PlausibilityAssessor {
    fn dimension(&self) -> Dimension {
        Dimension::Plausibility
    }

    fn assess(
        &self,
        cells: &ColumnCells,
        standard: &Standard,
        _as_of: DateTime<Utc>,
    ) -> Result<DimensionOutcome> {
        let weight = standard.weights().weight(self.dimension());
        let mut checked = 0usize;
        let mut outliers = 0usize;
        let mut failed = Vec::new();

        for (field, req) in standard.field_requirements() {
            if req.min_value.is_none() && req.max_value.is_none() {
                continue;
            }
            if let (Some(min), Some(max)) = (req.min_value, req.max_value) {
                if min > max {
                    return Err(Error::malformed_requirement(
                        field,
                        format!("min_value {} exceeds max_value {}", min, max),
                    ));
                }
            }

            let Some(values) = cells.column(field) else {
                continue;
            };

            let mut field_outliers = 0usize;
            let mut field_checked = 0usize;

            // Non-numeric cells are validity's concern, not an outlier.
            for value in values.iter().filter_map(|v| v.as_deref()) {
                let Ok(number) = value.trim().parse::<f64>() else {
                    continue;
                };
                if !number.is_finite() {
                    continue;
                }
                field_checked += 1;
                let below = req.min_value.map_or(false, |min| number < min);
                let above = req.max_value.map_or(false, |max| number > max);
                if below || above {
                    field_outliers += 1;
                }
            }

            checked += field_checked;
            outliers += field_outliers;

            if field_outliers > 0 {
                failed.push(FailedCheck::new(
                    field,
                    self.dimension(),
                    format!(
                        "{} of {} values outside plausible range [{}, {}]",
                        field_outliers,
                        field_checked,
                        req.min_value.map_or("-inf".to_string(), |v| v.to_string()),
                        req.max_value.map_or("+inf".to_string(), |v| v.to_string()),
                    ),
                ));
            }
        }

        Ok(DimensionOutcome {
            score: proportional(weight, outliers, checked),
            failed,
        })
    }
}
