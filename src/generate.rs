//! Standard generation from dataset profiles.
//!
//! [`StandardGenerator`] converts a [`DatasetProfile`] into a
//! [`Standard`] with safety margins so that natural variance in future
//! data does not immediately fail the generated requirements. The
//! profiled dataset always passes its own generated standard.

use crate::{
    error::{Error, Result},
    infer::{SemanticType, TextPattern},
    profile::DatasetProfile,
    standard::{DimensionWeights, FieldRequirement, Standard},
};

/// Generates a [`Standard`] from a [`DatasetProfile`].
///
/// The margin and threshold defaults are policy constants; all are
/// configurable through the builder.
///
/// # Example
///
/// ```
/// use depurar::{ArrowDataset, DataProfiler, StandardGenerator};
///
/// let dataset = ArrowDataset::from_csv_str("id,amount\n1,10.5\n2,20.0\n").unwrap();
/// let profile = DataProfiler::new().profile(&dataset);
/// let standard = StandardGenerator::new().generate(&profile, "orders").unwrap();
/// assert_eq!(standard.name(), "orders");
/// ```
#[derive(Debug, Clone)]
pub struct StandardGenerator {
    range_margin: f64,
    minimum_fraction: f64,
    minimum_floor: f64,
    pattern_confidence_threshold: f64,
    weights: DimensionWeights,
}

impl Default for StandardGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardGenerator {
    /// Creates a generator with the default policy constants.
    pub fn new() -> Self {
        Self {
            range_margin: 0.10,
            minimum_fraction: 0.75,
            minimum_floor: 50.0,
            pattern_confidence_threshold: 0.8,
            weights: DimensionWeights::default(),
        }
    }

    /// Sets the numeric range margin as a fraction of the observed range.
    #[must_use]
    pub fn range_margin(mut self, margin: f64) -> Self {
        self.range_margin = margin.max(0.0);
        self
    }

    /// Sets the fraction of the profile's aggregate quality used as the
    /// overall minimum.
    #[must_use]
    pub fn minimum_fraction(mut self, fraction: f64) -> Self {
        self.minimum_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Sets the floor below which the overall minimum never drops.
    #[must_use]
    pub fn minimum_floor(mut self, floor: f64) -> Self {
        self.minimum_floor = floor.clamp(0.0, 100.0);
        self
    }

    /// Sets the confidence a detected pattern needs before it becomes a
    /// requirement.
    #[must_use]
    pub fn pattern_confidence_threshold(mut self, threshold: f64) -> Self {
        self.pattern_confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Overrides the dimension weights of generated standards.
    #[must_use]
    pub fn weights(mut self, weights: DimensionWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Generates a standard from a profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StandardGeneration`] when the configured weights
    /// violate the per-dimension ceiling invariant.
    pub fn generate(&self, profile: &DatasetProfile, name: impl Into<String>) -> Result<Standard> {
        if let Err(e) = self.weights.validate() {
            return Err(Error::standard_generation(e.to_string()));
        }

        let overall_minimum = (self.minimum_fraction * profile.quality)
            .max(self.minimum_floor)
            .min(crate::standard::OVERALL_CEILING);

        let mut standard =
            Standard::new(name, "1.0", overall_minimum).with_weights(self.weights);

        for field in &profile.fields {
            let mut req = FieldRequirement::new().nullable(field.null_count > 0);

            if field.semantic_type != SemanticType::Unknown {
                req = req.semantic_type(field.semantic_type);
            }

            if field.semantic_type.is_numeric() {
                if let (Some(min), Some(max)) = (field.min, field.max) {
                    let margin = self.range_margin * (max - min);
                    req = req.range(min - margin, max + margin);
                }
            }

            if let Some(detected) = field.pattern {
                if detected.confidence > self.pattern_confidence_threshold
                    && detected.pattern != TextPattern::FreeText
                {
                    req = req.pattern(detected.pattern.name());
                }
            }

            let non_null = profile.row_count - field.null_count;
            if profile.row_count > 1 && non_null > 0 && field.unique_count == non_null {
                req = req.unique(true);
            }

            standard = standard.with_field(&field.name, req);
        }

        if let Err(e) = standard.validate() {
            return Err(Error::standard_generation(e.to_string()));
        }

        Ok(standard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dataset::ArrowDataset, profile::DataProfiler};

    fn profile_csv(csv: &str) -> DatasetProfile {
        let dataset = ArrowDataset::from_csv_str(csv).unwrap();
        DataProfiler::new().profile(&dataset)
    }

    #[test]
    fn test_generate_types_and_nullability() {
        let profile = profile_csv("id,name,amount\n1,alice,10.0\n2,bob,20.0\n3,carol,\n");
        let standard = StandardGenerator::new().generate(&profile, "people").unwrap();

        let id = &standard.field_requirements()["id"];
        assert_eq!(id.semantic_type, Some(SemanticType::Integer));
        assert!(!id.nullable);
        assert!(id.unique);

        let amount = &standard.field_requirements()["amount"];
        assert!(amount.nullable);
    }

    #[test]
    fn test_generate_range_margin() {
        let profile = profile_csv("amount\n10.0\n20.0\n30.0\n");
        let standard = StandardGenerator::new().generate(&profile, "amounts").unwrap();

        let amount = &standard.field_requirements()["amount"];
        // Observed range [10, 30], margin 10% of 20 = 2.
        assert!((amount.min_value.unwrap() - 8.0).abs() < 1e-9);
        assert!((amount.max_value.unwrap() - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_generate_constant_numeric_gets_degenerate_range() {
        let profile = profile_csv("amount\n5.0\n5.0\n5.0\n");
        let standard = StandardGenerator::new().generate(&profile, "flat").unwrap();

        let amount = &standard.field_requirements()["amount"];
        assert_eq!(amount.min_value, Some(5.0));
        assert_eq!(amount.max_value, Some(5.0));
    }

    #[test]
    fn test_generate_pattern_requirement() {
        let profile = profile_csv("email\na@example.com\nb@example.com\nc@example.com\n");
        let standard = StandardGenerator::new().generate(&profile, "emails").unwrap();

        let email = &standard.field_requirements()["email"];
        assert_eq!(email.pattern.as_deref(), Some("email"));
    }

    #[test]
    fn test_generate_no_pattern_below_threshold() {
        // Half emails, half free text: neither matcher clears 0.8.
        let profile =
            profile_csv("note\na@example.com\nhello there world\nb@example.com\nmore free text\n");
        let standard = StandardGenerator::new().generate(&profile, "notes").unwrap();

        let note = &standard.field_requirements()["note"];
        assert_eq!(note.pattern, None);
    }

    #[test]
    fn test_generate_minimum_floor() {
        // A heavily null dataset profiles poorly, so the floor applies.
        let profile = profile_csv("x,y\n1,\n,\n,\n,\n");
        let standard = StandardGenerator::new().generate(&profile, "sparse").unwrap();
        assert!(standard.overall_minimum() >= 50.0);
    }

    #[test]
    fn test_generate_minimum_tracks_quality() {
        let profile = profile_csv("id,amount\n1,10.0\n2,20.0\n3,30.0\n");
        let standard = StandardGenerator::new().generate(&profile, "clean").unwrap();

        let expected = (0.75 * profile.quality).max(50.0);
        assert!((standard.overall_minimum() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_generate_rejects_bad_weights() {
        let profile = profile_csv("id\n1\n2\n");
        let weights = DimensionWeights {
            validity: 50.0,
            ..DimensionWeights::default()
        };
        let result = StandardGenerator::new()
            .weights(weights)
            .generate(&profile, "broken");
        assert!(matches!(result, Err(Error::StandardGeneration { .. })));
    }

    #[test]
    fn test_generate_unknown_column_has_no_type_requirement() {
        use std::sync::Arc;

        use arrow::{
            array::{Int32Array, RecordBatch, StringArray},
            datatypes::{DataType, Field, Schema},
        };

        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("ghost", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec![None::<&str>, None])),
            ],
        )
        .unwrap();
        let dataset = ArrowDataset::from_batch(batch).unwrap();
        let profile = DataProfiler::new().profile(&dataset);
        let standard = StandardGenerator::new().generate(&profile, "ghosts").unwrap();

        let ghost = &standard.field_requirements()["ghost"];
        assert_eq!(ghost.semantic_type, None);
        assert!(ghost.nullable);
    }
}
