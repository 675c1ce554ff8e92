//! Expected feature schema the trained classifier was fit on.
//!
//! The schema is an explicit descriptor loaded next to the artifact. Column
//! order is significant: it is the order of the feature vector handed to the
//! classifier.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::common::error::{EligibilityError, EligibilityResult};

/// Separator between a categorical field and its value in one-hot column names.
pub const ONE_HOT_SEPARATOR: char = '_';

/// Build the indicator column name for a categorical value, e.g. `historique_credit_Bon`.
pub fn one_hot_column(field: &str, value: &str) -> String {
    format!("{field}{ONE_HOT_SEPARATOR}{value}")
}

/// Ordered feature names plus optional categorical vocabularies.
#[derive(Clone, Debug, Serialize)]
pub struct ExpectedSchema {
    features: Vec<String>,
    categories: BTreeMap<String, Vec<String>>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl ExpectedSchema {
    /// Build a schema, rejecting empty or duplicated feature names.
    pub fn new(
        features: Vec<String>,
        categories: BTreeMap<String, Vec<String>>,
    ) -> EligibilityResult<Self> {
        if features.is_empty() {
            return Err(EligibilityError::invalid("feature schema is empty"));
        }

        let mut positions = HashMap::with_capacity(features.len());
        for (idx, name) in features.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(EligibilityError::invalid(format!(
                    "feature #{idx} has an empty name"
                )));
            }
            if positions.insert(name.clone(), idx).is_some() {
                return Err(EligibilityError::invalid(format!(
                    "feature `{name}` appears more than once"
                )));
            }
        }

        Ok(Self {
            features,
            categories,
            positions,
        })
    }

    /// Schema without categorical vocabularies.
    pub fn from_names<I, S>(names: I) -> EligibilityResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Into::into).collect(), BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.features
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Known vocabulary for a categorical field, if the descriptor carried one.
    pub fn vocabulary(&self, field: &str) -> Option<&[String]> {
        self.categories.get(field).map(Vec::as_slice)
    }

    pub fn categories(&self) -> &BTreeMap<String, Vec<String>> {
        &self.categories
    }

    /// Schema columns that belong to the one-hot group of `field`.
    ///
    /// With a vocabulary the group is exactly `{field}_{value}` for each known
    /// value; without one it falls back to a name-prefix match.
    pub fn one_hot_group(&self, field: &str) -> Vec<&str> {
        match self.vocabulary(field) {
            Some(values) => values
                .iter()
                .map(|v| one_hot_column(field, v))
                .filter_map(|col| self.positions.get_key_value(&col).map(|(k, _)| k.as_str()))
                .collect(),
            None => {
                let prefix = format!("{field}{ONE_HOT_SEPARATOR}");
                self.features
                    .iter()
                    .filter(|name| name.starts_with(&prefix))
                    .map(String::as_str)
                    .collect()
            }
        }
    }
}

impl PartialEq for ExpectedSchema {
    fn eq(&self, other: &Self) -> bool {
        self.features == other.features && self.categories == other.categories
    }
}
