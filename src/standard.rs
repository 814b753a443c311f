//! Quality standards: declarative requirements a dataset must meet.
//!
//! A [`Standard`] is an immutable value object mirroring the on-disk
//! document layout: a `meta` section (name, version) and a `requirements`
//! section (overall minimum, per-field constraints, per-dimension
//! weights). File discovery and parsing belong to an external loader; the
//! core consumes the parsed value through the [`StandardStore`] port.

use std::{
    collections::{BTreeMap, HashMap},
    sync::RwLock,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    infer::SemanticType,
};

/// Maximum contribution of a single dimension to the overall score.
pub const DIMENSION_CEILING: f64 = 20.0;

/// Maximum overall score: the five dimension ceilings combined.
pub const OVERALL_CEILING: f64 = 100.0;

/// The five quality dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// Type and pattern conformance.
    Validity,
    /// Required fields are present and non-null.
    Completeness,
    /// Uniqueness and cross-field relations hold.
    Consistency,
    /// Timestamp-bearing fields are recent enough.
    Freshness,
    /// Numeric values fall in their plausible ranges.
    Plausibility,
}

impl Dimension {
    /// All dimensions in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Validity,
        Self::Completeness,
        Self::Consistency,
        Self::Freshness,
        Self::Plausibility,
    ];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validity => "validity",
            Self::Completeness => "completeness",
            Self::Consistency => "consistency",
            Self::Freshness => "freshness",
            Self::Plausibility => "plausibility",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-dimension score ceilings ("weights").
///
/// Weights are fixed constants rather than learned values so scores stay
/// comparable across standards. They must sum to [`OVERALL_CEILING`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    /// Ceiling for the validity dimension.
    pub validity: f64,
    /// Ceiling for the completeness dimension.
    pub completeness: f64,
    /// Ceiling for the consistency dimension.
    pub consistency: f64,
    /// Ceiling for the freshness dimension.
    pub freshness: f64,
    /// Ceiling for the plausibility dimension.
    pub plausibility: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            validity: DIMENSION_CEILING,
            completeness: DIMENSION_CEILING,
            consistency: DIMENSION_CEILING,
            freshness: DIMENSION_CEILING,
            plausibility: DIMENSION_CEILING,
        }
    }
}

impl DimensionWeights {
    /// Returns the ceiling for one dimension.
    pub fn weight(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Validity => self.validity,
            Dimension::Completeness => self.completeness,
            Dimension::Consistency => self.consistency,
            Dimension::Freshness => self.freshness,
            Dimension::Plausibility => self.plausibility,
        }
    }

    /// Sum of all five ceilings.
    pub fn total(&self) -> f64 {
        self.validity + self.completeness + self.consistency + self.freshness + self.plausibility
    }

    /// Validates the ceiling invariant.
    ///
    /// # Errors
    ///
    /// Returns an error if any weight is negative or the weights do not
    /// sum to [`OVERALL_CEILING`] within floating tolerance.
    pub fn validate(&self) -> Result<()> {
        for dimension in Dimension::ALL {
            let w = self.weight(dimension);
            if !w.is_finite() || w < 0.0 {
                return Err(Error::invalid_config(format!(
                    "weight for {} must be a non-negative finite number, got {}",
                    dimension, w
                )));
            }
        }
        let total = self.total();
        if (total - OVERALL_CEILING).abs() > 1e-6 {
            return Err(Error::invalid_config(format!(
                "dimension weights sum to {}, expected {}",
                total, OVERALL_CEILING
            )));
        }
        Ok(())
    }
}

/// Declarative constraints on a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRequirement {
    /// Required semantic type, if any.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<SemanticType>,
    /// Whether null values are acceptable (default: true).
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Lower bound of the plausible numeric range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Upper bound of the plausible numeric range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    /// Required text shape: a built-in pattern name ("email",
    /// "identifier") or a custom regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Whether non-null values must be unique.
    #[serde(default)]
    pub unique: bool,
    /// Name of a field whose values must contain every value of this
    /// field (foreign-key-like subset relation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_exist_in: Option<String>,
    /// Maximum staleness in hours; declaring this marks the field
    /// timestamp-bearing for freshness scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_staleness_hours: Option<f64>,
}

fn default_nullable() -> bool {
    true
}

impl Default for FieldRequirement {
    fn default() -> Self {
        Self {
            semantic_type: None,
            nullable: true,
            min_value: None,
            max_value: None,
            pattern: None,
            unique: false,
            must_exist_in: None,
            max_staleness_hours: None,
        }
    }
}

impl FieldRequirement {
    /// Creates an empty (fully permissive) requirement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a semantic type.
    #[must_use]
    pub fn semantic_type(mut self, semantic_type: SemanticType) -> Self {
        self.semantic_type = Some(semantic_type);
        self
    }

    /// Sets whether nulls are acceptable.
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the plausible numeric range.
    #[must_use]
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Requires a text pattern by name or custom regex.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Requires non-null values to be unique.
    #[must_use]
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Requires every value to also appear in another field.
    #[must_use]
    pub fn must_exist_in(mut self, field: impl Into<String>) -> Self {
        self.must_exist_in = Some(field.into());
        self
    }

    /// Declares the field timestamp-bearing with a staleness bound.
    #[must_use]
    pub fn max_staleness_hours(mut self, hours: f64) -> Self {
        self.max_staleness_hours = Some(hours);
        self
    }
}

/// Identity section of a standard document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardMeta {
    /// Standard name.
    pub name: String,
    /// Standard version.
    pub version: String,
}

/// Requirements section of a standard document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    /// Minimum overall score a dataset must reach to pass.
    pub overall_minimum: f64,
    /// Per-field constraints, keyed by field name.
    #[serde(default)]
    pub field_requirements: BTreeMap<String, FieldRequirement>,
    /// Per-dimension score ceilings.
    #[serde(default)]
    pub dimension_requirements: DimensionWeights,
}

/// A complete quality standard.
///
/// Treated as immutable once loaded; regeneration produces a new
/// standard, never an in-place edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standard {
    /// Identity (name, version).
    pub meta: StandardMeta,
    /// Requirements.
    pub requirements: Requirements,
}

impl Standard {
    /// Creates a standard with no field requirements and default weights.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        overall_minimum: f64,
    ) -> Self {
        Self {
            meta: StandardMeta {
                name: name.into(),
                version: version.into(),
            },
            requirements: Requirements {
                overall_minimum,
                field_requirements: BTreeMap::new(),
                dimension_requirements: DimensionWeights::default(),
            },
        }
    }

    /// Adds a field requirement.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, requirement: FieldRequirement) -> Self {
        self.requirements
            .field_requirements
            .insert(name.into(), requirement);
        self
    }

    /// Overrides the dimension weights.
    #[must_use]
    pub fn with_weights(mut self, weights: DimensionWeights) -> Self {
        self.requirements.dimension_requirements = weights;
        self
    }

    /// Standard name.
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Standard version.
    pub fn version(&self) -> &str {
        &self.meta.version
    }

    /// Minimum overall score a dataset must reach to pass.
    pub fn overall_minimum(&self) -> f64 {
        self.requirements.overall_minimum
    }

    /// Per-field constraints.
    pub fn field_requirements(&self) -> &BTreeMap<String, FieldRequirement> {
        &self.requirements.field_requirements
    }

    /// Per-dimension score ceilings.
    pub fn weights(&self) -> &DimensionWeights {
        &self.requirements.dimension_requirements
    }

    /// Validates internal invariants: the weight ceiling, the overall
    /// minimum range, and per-field range sanity.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        self.requirements.dimension_requirements.validate()?;

        if !(0.0..=OVERALL_CEILING).contains(&self.requirements.overall_minimum) {
            return Err(Error::invalid_config(format!(
                "overall_minimum {} outside [0, {}]",
                self.requirements.overall_minimum, OVERALL_CEILING
            )));
        }

        for (field, req) in &self.requirements.field_requirements {
            if let (Some(min), Some(max)) = (req.min_value, req.max_value) {
                if min > max {
                    return Err(Error::malformed_requirement(
                        field.clone(),
                        format!("min_value {} exceeds max_value {}", min, max),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Port for the external standard loader/persister.
///
/// The core never touches the filesystem; collaborators implement this
/// trait over whatever storage they own. [`MemoryStandardStore`] serves
/// tests and auto-generation persistence within a process.
pub trait StandardStore: Send + Sync {
    /// Loads a standard by name, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn load(&self, name: &str) -> Result<Option<Standard>>;

    /// Persists a standard under its own name.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn save(&self, standard: &Standard) -> Result<()>;
}

/// An in-memory standard store.
///
/// Thread-safe; all data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStandardStore {
    standards: RwLock<HashMap<String, Standard>>,
}

impl MemoryStandardStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored standards.
    pub fn len(&self) -> usize {
        self.standards.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Returns true if no standards are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StandardStore for MemoryStandardStore {
    fn load(&self, name: &str) -> Result<Option<Standard>> {
        let standards = self
            .standards
            .read()
            .map_err(|_| Error::data("standard store lock poisoned"))?;
        Ok(standards.get(name).cloned())
    }

    fn save(&self, standard: &Standard) -> Result<()> {
        let mut standards = self
            .standards
            .write()
            .map_err(|_| Error::data("standard store lock poisoned"))?;
        standards.insert(standard.name().to_string(), standard.clone());
        Ok(())
    }
}
