//! Decoder for serialized feature-name lists.
//!
//! Three layouts are accepted: a JSON array of names, a JSON object with
//! `features` (and optional `categories`), or plain text with one name per
//! line (`#` starts a comment).

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::common::error::{EligibilityError, EligibilityResult};

use super::domain::ExpectedSchema;

#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureListFile {
    Names(Vec<String>),
    Descriptor {
        features: Vec<String>,
        #[serde(default)]
        categories: BTreeMap<String, Vec<String>>,
    },
}

/// Decode a feature list from bytes in any of the accepted layouts.
pub fn parse_feature_list(bytes: &[u8]) -> EligibilityResult<ExpectedSchema> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| EligibilityError::invalid("feature list is not valid UTF-8"))?;
    let trimmed = text.trim_start();

    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let parsed: FeatureListFile = serde_json::from_str(trimmed)
            .map_err(|e| EligibilityError::invalid(format!("malformed feature list: {e}")))?;
        return match parsed {
            FeatureListFile::Names(names) => ExpectedSchema::new(names, BTreeMap::new()),
            FeatureListFile::Descriptor {
                features,
                categories,
            } => ExpectedSchema::new(features, categories),
        };
    }

    let names = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect::<Vec<_>>();
    ExpectedSchema::new(names, BTreeMap::new())
}
