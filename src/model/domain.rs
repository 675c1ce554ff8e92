//! Domain types for serialized artifacts and the loaded bundle.
//!
//! The on-disk layout is JSON; see [`ArtifactFile`] and [`StandardScaler`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::align::FeatureVector;
use crate::common::error::{EligibilityError, EligibilityResult};
use crate::inference::domain::{Classifier, ModelKind, TreeNode, Voting};
use crate::schema::ExpectedSchema;

/// Identifier for a model family.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version label wrapper to avoid mixing with model identifiers.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionName(String);

impl VersionName {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VersionName {
    fn default() -> Self {
        Self::new("0.0.0")
    }
}

fn default_threshold() -> f64 {
    0.5
}

/// Serialized classifier as exported by the training pipeline.
#[derive(Clone, Debug, Deserialize)]
pub struct ArtifactFile {
    pub model_id: ModelId,
    #[serde(default)]
    pub model_version: VersionName,
    /// Declared input arity; required for forests, checked for logistic models.
    #[serde(default)]
    pub n_features_in: Option<usize>,
    /// Feature names the model was fit on, in column order.
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    pub estimator: EstimatorSpec,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorSpec {
    Logistic {
        weights: Vec<f64>,
        bias: f64,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    Forest {
        trees: Vec<Vec<TreeNode>>,
        #[serde(default = "default_threshold")]
        threshold: f64,
        #[serde(default)]
        voting: Voting,
    },
}

/// Per-column standardisation applied between alignment and inference.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn validate(&self) -> Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            ));
        }
        for (idx, (m, s)) in self.mean.iter().zip(&self.scale).enumerate() {
            if !m.is_finite() || !s.is_finite() || *s == 0.0 {
                return Err(format!("scaler column {idx} is unusable (mean {m}, scale {s})"));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// `(x - mean) / scale` column by column.
    pub fn transform(&self, features: &FeatureVector) -> EligibilityResult<FeatureVector> {
        features.ensure_len(self.mean.len())?;
        let scaled = features
            .as_slice()
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect();
        Ok(FeatureVector::new(scaled))
    }
}

/// Descriptive metadata for the loaded model.
#[derive(Clone, Debug, Serialize)]
pub struct ModelMetadata {
    pub model_id: ModelId,
    pub model_version: VersionName,
    pub kind: ModelKind,
    pub n_features: usize,
    pub fingerprint: String,
    pub scaled: bool,
}

/// Everything the predictor needs, loaded once and shared read-only.
#[derive(Clone, Debug)]
pub struct ArtifactBundle {
    pub metadata: ModelMetadata,
    pub schema: Arc<ExpectedSchema>,
    pub scaler: Option<Arc<StandardScaler>>,
    pub classifier: Arc<dyn Classifier>,
}

/// Raw bytes of one artifact file together with where it came from.
#[derive(Clone, Debug)]
pub struct ArtifactSource {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl ArtifactSource {
    pub fn new(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    pub fn load_error(&self, reason: impl Into<String>) -> EligibilityError {
        EligibilityError::artifact(&self.path, reason)
    }
}

/// The model file plus the optional scaler and feature list.
#[derive(Clone, Debug)]
pub struct ArtifactSources {
    pub model: ArtifactSource,
    pub scaler: Option<ArtifactSource>,
    pub features: Option<ArtifactSource>,
}

/// Repository contract for artifact bundles.
pub trait ArtifactRepo {
    fn read_sources(&self) -> EligibilityResult<ArtifactSources>;
}
