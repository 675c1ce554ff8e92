//! Domain types for raw submissions and aligned feature vectors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::{EligibilityError, EligibilityResult};

/// A single raw field value as typed by the applicant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Category(String),
}

impl RawValue {
    /// Interpret a textual value: numbers when they parse, labels otherwise.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => RawValue::Number(n),
            _ => RawValue::Category(trimmed.to_string()),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{n}"),
            RawValue::Category(label) => f.write_str(label),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Category(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Category(value)
    }
}

/// Field name → raw value for one submission.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    fields: BTreeMap<String, RawValue>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse `key=value` pairs as given on the command line.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> EligibilityResult<Self> {
        let mut input = Self::new();
        for pair in pairs {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                EligibilityError::invalid(format!("expected key=value, got `{pair}`"))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(EligibilityError::invalid(format!(
                    "empty field name in `{pair}`"
                )));
            }
            input.insert(key, RawValue::parse(value));
        }
        Ok(input)
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawInput {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut input = Self::new();
        for (k, v) in iter {
            input.insert(k, v);
        }
        input
    }
}

/// Ordered numeric values, one per schema column.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Fail with `SchemaMismatch` unless the vector has exactly `expected` values.
    pub fn ensure_len(&self, expected: usize) -> EligibilityResult<()> {
        if self.0.len() == expected {
            Ok(())
        } else {
            Err(EligibilityError::SchemaMismatch {
                expected,
                got: self.0.len(),
            })
        }
    }
}

/// Non-fatal observations made while aligning a submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignWarning {
    /// The label has no indicator column; the whole one-hot group is left at 0.
    UnseenCategory { field: String, value: String },
    /// A schema column nobody supplied was filled with the default.
    MissingColumn { column: String },
    /// A supplied column is not part of the schema and was discarded.
    DroppedColumn { column: String },
}

impl fmt::Display for AlignWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignWarning::UnseenCategory { field, value } => write!(
                f,
                "value `{value}` for `{field}` was not seen during training; its indicator columns are all 0"
            ),
            AlignWarning::MissingColumn { column } => {
                write!(f, "column `{column}` was not supplied and defaults to 0")
            }
            AlignWarning::DroppedColumn { column } => {
                write!(f, "column `{column}` is unknown to the model and was ignored")
            }
        }
    }
}

/// Aligned vector plus whatever the aligner had to paper over.
#[derive(Clone, Debug, PartialEq)]
pub struct Alignment {
    pub vector: FeatureVector,
    pub warnings: Vec<AlignWarning>,
}
