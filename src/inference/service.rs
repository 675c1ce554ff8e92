//! Inference orchestration: align → arity check → scale → classify.

use std::sync::Arc;
use std::time::Instant;

use crate::align::{FeatureAligner, RawInput};
use crate::common::error::{EligibilityError, EligibilityResult};
use crate::model::{ArtifactBundle, ModelMetadata, StandardScaler};
use crate::schema::ExpectedSchema;

use super::domain::{Classifier, PredictionResult, Verdict};

/// Stateless predictor over an immutable artifact bundle.
#[derive(Clone, Debug)]
pub struct Predictor {
    aligner: FeatureAligner,
    scaler: Option<Arc<StandardScaler>>,
    classifier: Arc<dyn Classifier>,
    metadata: ModelMetadata,
}

impl Predictor {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self {
            aligner: FeatureAligner::new(bundle.schema),
            scaler: bundle.scaler,
            classifier: bundle.classifier,
            metadata: bundle.metadata,
        }
    }

    pub fn schema(&self) -> &ExpectedSchema {
        self.aligner.schema()
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Run one prediction for a raw submission.
    pub fn predict(&self, input: &RawInput) -> EligibilityResult<PredictionResult> {
        let start = Instant::now();
        let alignment = self.aligner.align(input)?;

        // Hard stop: never pad or truncate to fit the model.
        alignment.vector.ensure_len(self.classifier.n_features())?;

        let features = match &self.scaler {
            Some(scaler) => scaler.transform(&alignment.vector)?,
            None => alignment.vector,
        };

        let label = self.classifier.predict(&features)?;
        let probability = self.classifier.predict_proba(&features)?;
        if let Some(p) = probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(EligibilityError::inference(format!(
                    "probability {p} is outside [0, 1]"
                )));
            }
        }

        let verdict = Verdict::from_label(label);
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            model_id = %self.metadata.model_id,
            verdict = verdict.as_str(),
            probability = probability.unwrap_or(f64::NAN),
            warnings = alignment.warnings.len(),
            latency_ms,
            "prediction served"
        );

        Ok(PredictionResult {
            verdict,
            label,
            probability,
            warnings: alignment.warnings,
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignWarning;
    use crate::model::domain::{ArtifactSource, ArtifactSources};
    use crate::model::service::assemble;

    fn predictor(model: &str, scaler: Option<&str>) -> Predictor {
        let sources = ArtifactSources {
            model: ArtifactSource::new("model.json", model.as_bytes()),
            scaler: scaler.map(|s| ArtifactSource::new("scaler.json", s.as_bytes())),
            features: None,
        };
        Predictor::new(assemble(&sources).unwrap())
    }

    const LOAN_MODEL: &str = r#"{
        "model_id": "log_reg",
        "feature_names": ["age", "revenu", "montant_loan", "historique_credit_Bon", "historique_credit_Mauvais"],
        "estimator": {"kind": "logistic", "weights": [0.0, 0.0, 0.0, 4.0, -4.0], "bias": 0.0}
    }"#;

    fn applicant(history: &str) -> RawInput {
        RawInput::new()
            .with("age", 30.0)
            .with("revenu", 3000.0)
            .with("historique_credit", history)
            .with("montant_loan", 5000.0)
    }

    #[test]
    fn good_history_is_eligible() {
        let p = predictor(LOAN_MODEL, None);
        let result = p.predict(&applicant("Bon")).unwrap();
        assert_eq!(result.verdict, Verdict::Good);
        assert_eq!(result.label, 1);
        assert!(result.probability.unwrap() > 0.98);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn bad_history_is_not_eligible() {
        let p = predictor(LOAN_MODEL, None);
        let result = p.predict(&applicant("Mauvais")).unwrap();
        assert_eq!(result.verdict, Verdict::Bad);
        assert!(result.probability.unwrap() < 0.02);
    }

    #[test]
    fn unseen_label_is_surfaced_as_warning() {
        let p = predictor(LOAN_MODEL, None);
        let result = p.predict(&applicant("Excellent")).unwrap();
        assert_eq!(result.probability, Some(0.5));
        assert!(matches!(
            result.warnings.as_slice(),
            [AlignWarning::UnseenCategory { .. }]
        ));
    }

    #[test]
    fn short_schema_is_a_schema_mismatch() {
        let model = r#"{
            "model_id": "m",
            "feature_names": ["age", "revenu", "montant_loan", "historique_credit_Bon"],
            "estimator": {"kind": "logistic", "weights": [1, 1, 1, 1, 1, 1, 1, 1, 1], "bias": 0.0}
        }"#;
        let p = predictor(model, None);
        let err = p.predict(&applicant("Bon")).unwrap_err();
        assert!(matches!(
            err,
            EligibilityError::SchemaMismatch {
                expected: 9,
                got: 4
            }
        ));
    }

    #[test]
    fn scaler_is_applied_before_classification() {
        let model = r#"{
            "model_id": "scaled",
            "feature_names": ["age"],
            "estimator": {"kind": "logistic", "weights": [1.0], "bias": 0.0}
        }"#;
        let p = predictor(model, Some(r#"{"mean": [40.0], "scale": [10.0]}"#));
        let result = p.predict(&RawInput::new().with("age", 40.0)).unwrap();
        assert_eq!(result.probability, Some(0.5));
        assert!(p.metadata().scaled);
    }
}
