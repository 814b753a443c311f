//! Semantic type inference for column values.
//!
//! Determines the semantic type of a field from a bounded sample of its
//! non-null values, trying conversions in a fixed priority order:
//! boolean, integer, float, date, then text. A conversion is accepted
//! only when it loses no information ("1.0" is a float, not an integer).
//! Mixed columns fall back to [`SemanticType::Text`] with the `mixed`
//! flag set so downstream reporting can surface them.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fraction of sampled values a single non-text type must cover to be
/// chosen despite non-conforming values.
const DOMINANT_FRACTION: f64 = 0.9;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .unwrap_or_else(|_| unreachable!("email pattern is valid"))
});

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$")
        .unwrap_or_else(|_| unreachable!("identifier pattern is valid"))
});

/// Semantic type of a field, inferred from its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Whole numbers representable as i64.
    Integer,
    /// Finite floating point numbers.
    Float,
    /// Free-form text (the fallback type).
    Text,
    /// Boolean true/false values.
    Boolean,
    /// Calendar dates or timestamps.
    Date,
    /// Undetermined (e.g., an all-null column).
    Unknown,
}

impl SemanticType {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Unknown => "unknown",
        }
    }

    /// Whether values of this type carry numeric statistics.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Checks whether a single rendered value converts to this type
    /// without information loss.
    ///
    /// Text accepts everything; Unknown accepts nothing.
    pub fn accepts(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Self::Boolean => parse_boolean(value).is_some(),
            Self::Integer => value.parse::<i64>().is_ok(),
            Self::Float => value.parse::<f64>().map(|v| v.is_finite()).unwrap_or(false),
            Self::Date => parse_datetime(value).is_some(),
            Self::Text => true,
            Self::Unknown => false,
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in shape patterns for text columns, in matcher priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPattern {
    /// Email-shaped values.
    Email,
    /// Identifier-shaped values (no whitespace, leading letter).
    Identifier,
    /// Anything else.
    FreeText,
}

impl TextPattern {
    /// Human-readable name, also the name accepted in standard documents.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Identifier => "identifier",
            Self::FreeText => "free_text",
        }
    }

    /// Looks up a built-in pattern by its document name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "email" => Some(Self::Email),
            "identifier" => Some(Self::Identifier),
            "free_text" => Some(Self::FreeText),
            _ => None,
        }
    }

    /// Checks a single value against this pattern.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Email => EMAIL_RE.is_match(value),
            Self::Identifier => IDENTIFIER_RE.is_match(value),
            Self::FreeText => true,
        }
    }
}

impl std::fmt::Display for TextPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Detected pattern with its match confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// The matched pattern.
    pub pattern: TextPattern,
    /// Fraction of sampled values matching (0-1).
    pub confidence: f64,
}

/// Outcome of type inference for a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInference {
    /// Inferred semantic type.
    pub semantic_type: SemanticType,
    /// Fraction of sampled values conforming to the chosen type (0-1).
    pub confidence: f64,
    /// Whether the sample held values of several distinct natural types.
    pub mixed: bool,
    /// Sampled values that did not conform to the chosen type (for the
    /// text fallback: values whose natural type was not text).
    pub non_conforming: usize,
    /// Detected shape pattern; only populated for text columns.
    pub pattern: Option<PatternMatch>,
}

impl TypeInference {
    fn unknown() -> Self {
        Self {
            semantic_type: SemanticType::Unknown,
            confidence: 0.0,
            mixed: false,
            non_conforming: 0,
            pattern: None,
        }
    }
}

/// Infers the semantic type of a column from a bounded value sample.
///
/// # Example
///
/// ```
/// use depurar::infer::{SemanticType, TypeInferencer};
///
/// let inferencer = TypeInferencer::new();
/// let values: Vec<Option<String>> =
///     vec![Some("1".into()), Some("2".into()), Some("3".into())];
/// let inference = inferencer.infer(&values);
/// assert_eq!(inference.semantic_type, SemanticType::Integer);
/// ```
#[derive(Debug, Clone)]
pub struct TypeInferencer {
    sample_limit: usize,
}

impl Default for TypeInferencer {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInferencer {
    /// Creates an inferencer with the default sample bound (1000 values).
    pub fn new() -> Self {
        Self { sample_limit: 1000 }
    }

    /// Sets the maximum number of non-null values sampled per column.
    #[must_use]
    pub fn sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit.max(1);
        self
    }

    /// Infers the semantic type of a column.
    ///
    /// Nulls are skipped; the first `sample_limit` non-null values form
    /// the sample, keeping inference deterministic. An all-null column
    /// yields [`SemanticType::Unknown`] with zero confidence.
    pub fn infer(&self, values: &[Option<String>]) -> TypeInference {
        let sample: Vec<&str> = values
            .iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .take(self.sample_limit)
            .collect();

        if sample.is_empty() {
            return TypeInference::unknown();
        }

        let n = sample.len();
        let candidates = [
            SemanticType::Boolean,
            SemanticType::Integer,
            SemanticType::Float,
            SemanticType::Date,
        ];

        // Conversion failures are tolerated: a type covering the whole
        // sample wins outright, otherwise a dominant type still wins with
        // the non-conforming count reflected in the confidence.
        let counts: Vec<usize> = candidates
            .iter()
            .map(|t| sample.iter().filter(|v| t.accepts(v)).count())
            .collect();

        for (ty, &count) in candidates.iter().zip(&counts) {
            if count == n {
                return TypeInference {
                    semantic_type: *ty,
                    confidence: 1.0,
                    mixed: false,
                    non_conforming: 0,
                    pattern: None,
                };
            }
        }

        let dominant_min = (n as f64 * DOMINANT_FRACTION).ceil() as usize;
        for (ty, &count) in candidates.iter().zip(&counts) {
            if count >= dominant_min {
                return TypeInference {
                    semantic_type: *ty,
                    confidence: count as f64 / n as f64,
                    mixed: false,
                    non_conforming: n - count,
                    pattern: None,
                };
            }
        }

        // Text fallback. The column is mixed when some values had a
        // non-text natural type.
        let typed_count = sample
            .iter()
            .filter(|v| candidates.iter().any(|t| t.accepts(v)))
            .count();
        let mixed = typed_count > 0;
        let plain_count = n - typed_count;
        let confidence = if mixed { plain_count as f64 / n as f64 } else { 1.0 };

        TypeInference {
            semantic_type: SemanticType::Text,
            confidence,
            mixed,
            non_conforming: typed_count,
            pattern: Some(detect_pattern(&sample)),
        }
    }
}

/// Picks the best-matching built-in pattern for a text sample.
///
/// Each matcher scores independently; the highest match fraction wins
/// and ties resolve in matcher declaration order.
fn detect_pattern(sample: &[&str]) -> PatternMatch {
    let n = sample.len() as f64;
    let email = sample.iter().filter(|v| TextPattern::Email.matches(v)).count() as f64 / n;
    let identifier = sample
        .iter()
        .filter(|v| TextPattern::Identifier.matches(v))
        .count() as f64
        / n;
    let free = sample
        .iter()
        .filter(|v| !TextPattern::Email.matches(v) && !TextPattern::Identifier.matches(v))
        .count() as f64
        / n;

    let scored = [
        (TextPattern::Email, email),
        (TextPattern::Identifier, identifier),
        (TextPattern::FreeText, free),
    ];

    let mut best = scored[0];
    for candidate in &scored[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }

    PatternMatch {
        pattern: best.0,
        confidence: best.1,
    }
}

/// Parses a boolean literal (case-insensitive true/false).
fn parse_boolean(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parses a date or timestamp value in any of the accepted formats.
///
/// Accepts RFC 3339, `%Y-%m-%d %H:%M:%S`, `%Y-%m-%d`, and `%Y/%m/%d`.
/// Plain dates resolve to midnight UTC.
pub(crate) fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}
