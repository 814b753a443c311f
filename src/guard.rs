//! Quality gating for protected operations.
//!
//! [`ProtectionGuard`] wraps an arbitrary operation over a dataset.
//! Invoking the guard resolves a standard (loading it from the
//! configured [`StandardStore`], or generating and persisting one when
//! permitted), obtains an assessment (through the fingerprint cache when
//! one is attached), applies the failure policy, and only then runs the
//! wrapped operation.
//!
//! A single invocation moves `UNASSESSED -> ASSESSING -> {ALLOWED,
//! WARNED, BLOCKED}` and all three outcomes are terminal: a blocked call
//! is a reported failure, never retried.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    assess::{AssessmentEngine, AssessmentResult},
    cache::{Fingerprint, FingerprintCache},
    dataset::ArrowDataset,
    error::{Error, Result},
    generate::StandardGenerator,
    profile::DataProfiler,
    standard::{Standard, StandardStore},
};

/// What to do when a dataset fails the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Block the operation and surface [`Error::GateBlocked`].
    #[default]
    Raise,
    /// Log a warning and proceed.
    Warn,
    /// Proceed unconditionally, still recording the assessment.
    Continue,
}

/// Terminal state of a guarded invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardDecision {
    /// The gate passed (or the policy was `Continue`); the operation ran.
    Allowed,
    /// The gate failed under the `Warn` policy; the operation still ran.
    Warned,
    /// The gate failed under the `Raise` policy; the operation did not
    /// run.
    Blocked,
}

/// Outcome of a guarded invocation.
///
/// `output` is present whenever the operation ran. The assessment is
/// always attached so audit-log writers can record it regardless of the
/// decision.
#[derive(Debug)]
pub struct GuardedOutcome<T> {
    /// Terminal decision for this invocation.
    pub decision: GuardDecision,
    /// The assessment the decision was based on.
    pub assessment: AssessmentResult,
    /// The wrapped operation's output, when it ran.
    pub output: Option<T>,
}

impl<T> GuardedOutcome<T> {
    /// Whether the wrapped operation ran.
    pub fn executed(&self) -> bool {
        self.output.is_some()
    }

    /// Consumes the outcome, returning the operation's output.
    pub fn into_output(self) -> Option<T> {
        self.output
    }
}

/// Wraps operations with at-most-once-per-fingerprint quality gating.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use depurar::{ArrowDataset, MemoryStandardStore, ProtectionGuard};
///
/// let store = Arc::new(MemoryStandardStore::new());
/// let guard = ProtectionGuard::new("orders", store).auto_generate(true);
///
/// let dataset = ArrowDataset::from_csv_str("id,amount\n1,10.0\n2,20.0\n").unwrap();
/// let outcome = guard
///     .invoke(&dataset, |d| Ok(d.batches().len()))
///     .unwrap();
/// assert!(outcome.executed());
/// ```
pub struct ProtectionGuard {
    standard_ref: String,
    store: Arc<dyn StandardStore>,
    cache: Option<Arc<FingerprintCache>>,
    policy: FailurePolicy,
    min_score: Option<f64>,
    auto_generate: bool,
    engine: AssessmentEngine,
    profiler: DataProfiler,
    generator: StandardGenerator,
}

impl ProtectionGuard {
    /// Creates a guard resolving standards under `standard_ref` from the
    /// given store, with the default `Raise` policy and no cache.
    pub fn new(standard_ref: impl Into<String>, store: Arc<dyn StandardStore>) -> Self {
        Self {
            standard_ref: standard_ref.into(),
            store,
            cache: None,
            policy: FailurePolicy::default(),
            min_score: None,
            auto_generate: false,
            engine: AssessmentEngine::new(),
            profiler: DataProfiler::new(),
            generator: StandardGenerator::new(),
        }
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides the standard's own minimum score for gating.
    #[must_use]
    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Permits generating and persisting a standard when none is stored.
    #[must_use]
    pub fn auto_generate(mut self, auto_generate: bool) -> Self {
        self.auto_generate = auto_generate;
        self
    }

    /// Attaches a fingerprint cache for at-most-once assessment.
    #[must_use]
    pub fn cache(mut self, cache: Arc<FingerprintCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the assessment engine.
    #[must_use]
    pub fn engine(mut self, engine: AssessmentEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Replaces the profiler used for auto-generation.
    #[must_use]
    pub fn profiler(mut self, profiler: DataProfiler) -> Self {
        self.profiler = profiler;
        self
    }

    /// Replaces the generator used for auto-generation.
    #[must_use]
    pub fn generator(mut self, generator: StandardGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Assesses the dataset and, if the gate allows, runs `op` on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StandardNotFound`] when no standard is stored
    /// and auto-generation is off, [`Error::GateBlocked`] when the gate
    /// fails under the `Raise` policy, or the operation's own error.
    pub fn invoke<T, F>(&self, dataset: &ArrowDataset, op: F) -> Result<GuardedOutcome<T>>
    where
        F: FnOnce(&ArrowDataset) -> Result<T>,
    {
        let standard = self.resolve_standard(dataset)?;
        let assessment = self.assess(dataset, &standard)?;

        let required = self.min_score.unwrap_or(standard.overall_minimum());
        let gate_passed = assessment.overall_score >= required;

        if gate_passed {
            let output = op(dataset)?;
            return Ok(GuardedOutcome {
                decision: GuardDecision::Allowed,
                assessment,
                output: Some(output),
            });
        }

        match self.policy {
            FailurePolicy::Raise => {
                tracing::error!(
                    standard = %standard.name(),
                    score = assessment.overall_score,
                    required,
                    "quality gate blocked operation"
                );
                Err(Error::GateBlocked {
                    required,
                    assessment: Box::new(assessment),
                })
            }
            FailurePolicy::Warn => {
                tracing::warn!(
                    standard = %standard.name(),
                    score = assessment.overall_score,
                    required,
                    "quality gate failed; proceeding under warn policy"
                );
                let output = op(dataset)?;
                Ok(GuardedOutcome {
                    decision: GuardDecision::Warned,
                    assessment,
                    output: Some(output),
                })
            }
            FailurePolicy::Continue => {
                let output = op(dataset)?;
                Ok(GuardedOutcome {
                    decision: GuardDecision::Allowed,
                    assessment,
                    output: Some(output),
                })
            }
        }
    }

    /// Loads the configured standard, generating and persisting one when
    /// absent and permitted.
    fn resolve_standard(&self, dataset: &ArrowDataset) -> Result<Standard> {
        if let Some(standard) = self.store.load(&self.standard_ref)? {
            return Ok(standard);
        }

        if !self.auto_generate {
            return Err(Error::standard_not_found(self.standard_ref.clone()));
        }

        let profile = self.profiler.profile(dataset);
        let standard = self.generator.generate(&profile, self.standard_ref.clone())?;
        self.store.save(&standard)?;
        tracing::info!(
            standard = %standard.name(),
            overall_minimum = standard.overall_minimum(),
            "generated standard from dataset profile"
        );

        Ok(standard)
    }

    fn assess(&self, dataset: &ArrowDataset, standard: &Standard) -> Result<AssessmentResult> {
        match &self.cache {
            Some(cache) => {
                let fingerprint = Fingerprint::compute(dataset, standard);
                cache.get_or_compute(&fingerprint, || self.engine.assess(dataset, standard))
            }
            None => self.engine.assess(dataset, standard),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::standard::{FieldRequirement, MemoryStandardStore};

    fn dataset(csv: &str) -> ArrowDataset {
        ArrowDataset::from_csv_str(csv).unwrap()
    }

    fn failing_standard() -> Standard {
        // Requires a column the data never has, so completeness and
        // validity collapse and the overall score misses the minimum.
        Standard::new("strict", "1.0", 90.0).with_field(
            "required_col",
            FieldRequirement::new()
                .semantic_type(crate::infer::SemanticType::Integer)
                .nullable(false),
        )
    }

    #[test]
    fn test_allowed_runs_operation() {
        let store = Arc::new(MemoryStandardStore::new());
        store.save(&Standard::new("open", "1.0", 50.0)).unwrap();

        let guard = ProtectionGuard::new("open", store);
        let outcome = guard
            .invoke(&dataset("id\n1\n2\n"), |d| Ok(d.batches().len()))
            .unwrap();

        assert_eq!(outcome.decision, GuardDecision::Allowed);
        assert!(outcome.executed());
        assert_eq!(outcome.output, Some(1));
        assert!(outcome.assessment.passed);
    }

    #[test]
    fn test_raise_blocks_and_attaches_assessment() {
        let store = Arc::new(MemoryStandardStore::new());
        store.save(&failing_standard()).unwrap();

        let ran = AtomicUsize::new(0);
        let guard = ProtectionGuard::new("strict", store);
        let result = guard.invoke(&dataset("id\n1\n2\n"), |_| {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        match result {
            Err(Error::GateBlocked { required, assessment }) => {
                assert_eq!(required, 90.0);
                assert!(!assessment.passed);
                assert!(!assessment.failed_checks.is_empty());
            }
            other => panic!("expected GateBlocked, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_warn_proceeds() {
        let store = Arc::new(MemoryStandardStore::new());
        store.save(&failing_standard()).unwrap();

        let guard = ProtectionGuard::new("strict", store).policy(FailurePolicy::Warn);
        let outcome = guard.invoke(&dataset("id\n1\n2\n"), |_| Ok(42)).unwrap();

        assert_eq!(outcome.decision, GuardDecision::Warned);
        assert_eq!(outcome.output, Some(42));
        assert!(!outcome.assessment.passed);
    }

    #[test]
    fn test_continue_proceeds_and_records() {
        let store = Arc::new(MemoryStandardStore::new());
        store.save(&failing_standard()).unwrap();

        let guard = ProtectionGuard::new("strict", store).policy(FailurePolicy::Continue);
        let outcome = guard.invoke(&dataset("id\n1\n2\n"), |_| Ok(())).unwrap();

        assert_eq!(outcome.decision, GuardDecision::Allowed);
        assert!(outcome.executed());
        assert!(!outcome.assessment.passed);
    }

    #[test]
    fn test_standard_not_found_without_auto_generate() {
        let store = Arc::new(MemoryStandardStore::new());
        let guard = ProtectionGuard::new("missing", store);

        let result = guard.invoke(&dataset("id\n1\n"), |_| Ok(()));
        assert!(matches!(result, Err(Error::StandardNotFound { .. })));
    }

    #[test]
    fn test_auto_generate_persists_standard() {
        let store = Arc::new(MemoryStandardStore::new());
        let guard =
            ProtectionGuard::new("orders", Arc::clone(&store) as Arc<dyn StandardStore>)
                .auto_generate(true);

        let data = dataset("id,amount\n1,10.0\n2,20.0\n3,30.0\n");
        let outcome = guard.invoke(&data, |_| Ok(())).unwrap();

        // The generated standard's own source data passes it.
        assert_eq!(outcome.decision, GuardDecision::Allowed);
        let stored = store.load("orders").unwrap().unwrap();
        assert_eq!(stored.name(), "orders");

        // A second invocation loads the persisted standard.
        let outcome = guard.invoke(&data, |_| Ok(())).unwrap();
        assert_eq!(outcome.decision, GuardDecision::Allowed);
    }

    #[test]
    fn test_min_score_override() {
        let store = Arc::new(MemoryStandardStore::new());
        store.save(&Standard::new("open", "1.0", 50.0)).unwrap();

        // A perfect dataset cannot reach an impossible override.
        let guard = ProtectionGuard::new("open", store).min_score(101.0);
        let result = guard.invoke(&dataset("id\n1\n"), |_| Ok(()));
        assert!(matches!(result, Err(Error::GateBlocked { .. })));
    }

    #[test]
    fn test_cached_assessment_computed_once() {
        let store = Arc::new(MemoryStandardStore::new());
        store.save(&Standard::new("open", "1.0", 50.0)).unwrap();

        let cache = Arc::new(FingerprintCache::new(8));
        let guard = ProtectionGuard::new("open", store).cache(Arc::clone(&cache));

        let data = dataset("id\n1\n2\n");
        guard.invoke(&data, |_| Ok(())).unwrap();
        guard.invoke(&data, |_| Ok(())).unwrap();

        assert_eq!(cache.len(), 1);
    }
}
