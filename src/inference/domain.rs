//! Inference adapter contract and the classifier families we can load.
//!
//! The predictor only relies on the arity/order contract: a classifier
//! declares how many features it takes and rejects anything else.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::align::{AlignWarning, FeatureVector};
use crate::common::error::{EligibilityError, EligibilityResult};

/// Label emitted by classifiers for the positive ("GOOD") class.
pub const POSITIVE_LABEL: u8 = 1;

/// Supported model families.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    TabularLogistic,
    TabularForest,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::TabularLogistic => "logistic",
            ModelKind::TabularForest => "forest",
        }
    }
}

/// Anything that can score an aligned feature vector.
pub trait Classifier: Send + Sync + fmt::Debug {
    fn kind(&self) -> ModelKind;

    /// Number of features the classifier was fit on.
    fn n_features(&self) -> usize;

    /// Binary label, [`POSITIVE_LABEL`] for the positive class.
    fn predict(&self, features: &FeatureVector) -> EligibilityResult<u8>;

    /// Probability of the positive class, when the model can produce one.
    fn predict_proba(&self, _features: &FeatureVector) -> EligibilityResult<Option<f64>> {
        Ok(None)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let ez = z.exp();
        ez / (1.0 + ez)
    }
}

fn ensure_probability(p: f64) -> EligibilityResult<f64> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(EligibilityError::inference(format!(
            "classifier produced an invalid probability ({p})"
        )))
    }
}

fn ensure_threshold(threshold: f64) -> Result<(), String> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(format!("threshold must be within [0, 1], got {threshold}"))
    }
}

/// Binary logistic regression: `p = σ(w·x + b)`.
#[derive(Clone, Debug)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    bias: f64,
    threshold: f64,
}

impl LogisticRegression {
    pub fn new(weights: Vec<f64>, bias: f64, threshold: f64) -> Result<Self, String> {
        if weights.is_empty() {
            return Err("logistic model has no weights".to_string());
        }
        if let Some((idx, w)) = weights.iter().enumerate().find(|(_, w)| !w.is_finite()) {
            return Err(format!("weight #{idx} is not finite ({w})"));
        }
        if !bias.is_finite() {
            return Err(format!("bias is not finite ({bias})"));
        }
        ensure_threshold(threshold)?;
        Ok(Self {
            weights,
            bias,
            threshold,
        })
    }

    fn probability(&self, features: &FeatureVector) -> EligibilityResult<f64> {
        features.ensure_len(self.weights.len())?;
        let z: f64 = self
            .weights
            .iter()
            .zip(features.as_slice())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        if !z.is_finite() {
            return Err(EligibilityError::inference("decision function is not finite"));
        }
        ensure_probability(sigmoid(z))
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> ModelKind {
        ModelKind::TabularLogistic
    }

    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, features: &FeatureVector) -> EligibilityResult<u8> {
        let p = self.probability(features)?;
        Ok(u8::from(p >= self.threshold))
    }

    fn predict_proba(&self, features: &FeatureVector) -> EligibilityResult<Option<f64>> {
        self.probability(features).map(Some)
    }
}

/// Node of a binary decision tree. Split nodes send `x[feature] < threshold` left.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Fraction of positive training samples that reached this leaf.
        proba: f64,
    },
}

/// How the forest combines its trees.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Voting {
    /// Average leaf probabilities; exposes a probability.
    #[default]
    Soft,
    /// Majority of per-tree labels; label only.
    Hard,
}

/// Single tree stored as a flat node array rooted at index 0.
#[derive(Clone, Debug)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Validate structure: in-bounds children and features, forward-only links, leaf probabilities in range.
    pub fn new(nodes: Vec<TreeNode>, n_features: usize) -> Result<Self, String> {
        if nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    // Children must come later in the array, which also rules out cycles.
                    for child in [left, right] {
                        if child <= idx || child >= nodes.len() {
                            return Err(format!("node {idx} points to invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { proba } => {
                    if !(proba.is_finite() && (0.0..=1.0).contains(&proba)) {
                        return Err(format!("leaf {idx} has probability {proba} outside [0, 1]"));
                    }
                }
            }
        }
        Ok(Self { nodes })
    }

    fn leaf_proba(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { proba } => return proba,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = x[feature];
                    idx = if value.is_nan() || value < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Ensemble of decision trees.
#[derive(Clone, Debug)]
pub struct DecisionForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    threshold: f64,
    voting: Voting,
}

impl DecisionForest {
    pub fn new(
        trees: Vec<DecisionTree>,
        n_features: usize,
        threshold: f64,
        voting: Voting,
    ) -> Result<Self, String> {
        if trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if n_features == 0 {
            return Err("forest declares zero input features".to_string());
        }
        ensure_threshold(threshold)?;
        Ok(Self {
            trees,
            n_features,
            threshold,
            voting,
        })
    }

    fn mean_proba(&self, x: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.leaf_proba(x)).sum();
        total / self.trees.len() as f64
    }
}

impl Classifier for DecisionForest {
    fn kind(&self) -> ModelKind {
        ModelKind::TabularForest
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &FeatureVector) -> EligibilityResult<u8> {
        features.ensure_len(self.n_features)?;
        let x = features.as_slice();
        let positive = match self.voting {
            Voting::Soft => ensure_probability(self.mean_proba(x))? >= self.threshold,
            Voting::Hard => {
                let votes = self
                    .trees
                    .iter()
                    .filter(|t| t.leaf_proba(x) >= self.threshold)
                    .count();
                votes * 2 > self.trees.len()
            }
        };
        Ok(u8::from(positive))
    }

    fn predict_proba(&self, features: &FeatureVector) -> EligibilityResult<Option<f64>> {
        features.ensure_len(self.n_features)?;
        match self.voting {
            Voting::Soft => ensure_probability(self.mean_proba(features.as_slice())).map(Some),
            Voting::Hard => Ok(None),
        }
    }
}

/// Eligibility verdict shown to the user.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Verdict {
    #[serde(rename = "GOOD")]
    Good,
    #[serde(rename = "BAD")]
    Bad,
}

impl Verdict {
    pub fn from_label(label: u8) -> Self {
        if label == POSITIVE_LABEL {
            Verdict::Good
        } else {
            Verdict::Bad
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Good => "GOOD",
            Verdict::Bad => "BAD",
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Good)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one prediction.
#[derive(Clone, Debug, Serialize)]
pub struct PredictionResult {
    pub verdict: Verdict,
    pub label: u8,
    /// Positive-class probability in [0, 1], when available.
    pub probability: Option<f64>,
    pub warnings: Vec<AlignWarning>,
    pub latency_ms: u64,
}

impl PredictionResult {
    /// Probability as a percentage rounded to one decimal, e.g. `87.5`.
    pub fn probability_percent(&self) -> Option<f64> {
        self.probability.map(|p| (p * 1000.0).round() / 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(values: &[f64]) -> FeatureVector {
        FeatureVector::new(values.to_vec())
    }

    #[test]
    fn sigmoid_properties() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
        assert!(sigmoid(1000.0).is_finite());
        assert!(sigmoid(-1000.0).is_finite());
    }

    #[test]
    fn logistic_scores_and_thresholds() {
        let model = LogisticRegression::new(vec![1.0, -1.0], 0.0, 0.5).unwrap();
        assert_eq!(model.n_features(), 2);
        let p = model.predict_proba(&fv(&[2.0, 0.0])).unwrap().unwrap();
        assert!((p - sigmoid(2.0)).abs() < 1e-12);
        assert_eq!(model.predict(&fv(&[2.0, 0.0])).unwrap(), 1);
        assert_eq!(model.predict(&fv(&[0.0, 2.0])).unwrap(), 0);
    }

    #[test]
    fn overflowing_score_is_an_inference_error() {
        let model = LogisticRegression::new(vec![1e308, 1e308], 0.0, 0.5).unwrap();
        let x = fv(&[1e308, 1e308]);
        let err = model.predict(&x).unwrap_err();
        assert!(matches!(err, EligibilityError::Inference(_)));
        assert_eq!(err.http_status(), 500);
        assert!(!err.is_fatal());
        assert!(matches!(
            model.predict_proba(&x),
            Err(EligibilityError::Inference(_))
        ));
    }

    #[test]
    fn logistic_rejects_wrong_arity() {
        let model = LogisticRegression::new(vec![0.1; 9], 0.0, 0.5).unwrap();
        let err = model.predict(&fv(&[1.0, 2.0, 3.0, 4.0])).unwrap_err();
        assert!(matches!(
            err,
            EligibilityError::SchemaMismatch {
                expected: 9,
                got: 4
            }
        ));
    }

    #[test]
    fn logistic_validation() {
        assert!(LogisticRegression::new(vec![], 0.0, 0.5).is_err());
        assert!(LogisticRegression::new(vec![f64::NAN], 0.0, 0.5).is_err());
        assert!(LogisticRegression::new(vec![1.0], f64::INFINITY, 0.5).is_err());
        assert!(LogisticRegression::new(vec![1.0], 0.0, 1.5).is_err());
    }

    fn stump(threshold: f64, low: f64, high: f64) -> DecisionTree {
        DecisionTree::new(
            vec![
                TreeNode::Split {
                    feature: 0,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { proba: low },
                TreeNode::Leaf { proba: high },
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn soft_forest_averages_leaves() {
        let forest = DecisionForest::new(
            vec![stump(10.0, 0.2, 0.8), stump(20.0, 0.0, 1.0)],
            2,
            0.5,
            Voting::Soft,
        )
        .unwrap();
        let p = forest.predict_proba(&fv(&[15.0, 0.0])).unwrap().unwrap();
        assert!((p - 0.4).abs() < 1e-12);
        assert_eq!(forest.predict(&fv(&[15.0, 0.0])).unwrap(), 0);
        assert_eq!(forest.predict(&fv(&[25.0, 0.0])).unwrap(), 1);
    }

    #[test]
    fn hard_forest_has_no_probability() {
        let forest = DecisionForest::new(
            vec![
                stump(10.0, 0.0, 1.0),
                stump(20.0, 0.0, 1.0),
                stump(30.0, 0.0, 1.0),
            ],
            2,
            0.5,
            Voting::Hard,
        )
        .unwrap();
        assert_eq!(forest.predict_proba(&fv(&[25.0, 0.0])).unwrap(), None);
        assert_eq!(forest.predict(&fv(&[25.0, 0.0])).unwrap(), 1);
        assert_eq!(forest.predict(&fv(&[15.0, 0.0])).unwrap(), 0);
    }

    #[test]
    fn nan_goes_left() {
        let tree = stump(10.0, 0.1, 0.9);
        assert_eq!(tree.leaf_proba(&[f64::NAN, 0.0]), 0.1);
    }

    #[test]
    fn tree_validation_rejects_bad_links() {
        let cyclic = vec![
            TreeNode::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 1,
            },
            TreeNode::Leaf { proba: 0.5 },
        ];
        assert!(DecisionTree::new(cyclic, 1).is_err());

        let out_of_range_feature = vec![
            TreeNode::Split {
                feature: 3,
                threshold: 1.0,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { proba: 0.5 },
            TreeNode::Leaf { proba: 0.5 },
        ];
        assert!(DecisionTree::new(out_of_range_feature, 2).is_err());
        assert!(DecisionTree::new(vec![TreeNode::Leaf { proba: 1.2 }], 1).is_err());
    }

    #[test]
    fn verdict_mapping() {
        assert_eq!(Verdict::from_label(1), Verdict::Good);
        assert_eq!(Verdict::from_label(0), Verdict::Bad);
        assert_eq!(Verdict::Good.to_string(), "GOOD");
        assert_eq!(
            serde_json::to_string(&Verdict::Bad).unwrap(),
            "\"BAD\""
        );
    }

    #[test]
    fn probability_percent_rounds_to_one_decimal() {
        let result = PredictionResult {
            verdict: Verdict::Good,
            label: 1,
            probability: Some(0.87654),
            warnings: Vec::new(),
            latency_ms: 0,
        };
        assert_eq!(result.probability_percent(), Some(87.7));
    }
}
