//! Assemble an [`ArtifactBundle`] from raw artifact bytes.
//!
//! Any failure here is an `ArtifactLoad` error and halts the session.
//!
//! TODO: Infer forest arity from the largest split index when `n_features_in` is absent.

use std::sync::Arc;

use crate::common::error::EligibilityResult;
use crate::common::ids;
use crate::inference::domain::{Classifier, DecisionForest, DecisionTree, LogisticRegression};
use crate::schema::codec::parse_feature_list;
use crate::schema::ExpectedSchema;

use super::domain::{
    ArtifactBundle, ArtifactFile, ArtifactRepo, ArtifactSource, ArtifactSources, EstimatorSpec,
    ModelMetadata, StandardScaler,
};

/// Read every artifact through `repo` and build the bundle.
pub fn load_bundle(repo: &dyn ArtifactRepo) -> EligibilityResult<ArtifactBundle> {
    let sources = repo.read_sources()?;
    assemble(&sources)
}

/// Decode and cross-check model, scaler and feature list.
pub fn assemble(sources: &ArtifactSources) -> EligibilityResult<ArtifactBundle> {
    let model = &sources.model;
    let file: ArtifactFile = serde_json::from_slice(&model.bytes)
        .map_err(|e| model.load_error(format!("malformed model file: {e}")))?;

    let classifier = build_classifier(&file.estimator, file.n_features_in)
        .map_err(|reason| model.load_error(reason))?;

    let schema = resolve_schema(&file, sources)?;

    let scaler = match &sources.scaler {
        Some(source) => Some(Arc::new(decode_scaler(source, schema.len())?)),
        None => None,
    };

    if schema.len() != classifier.n_features() {
        tracing::warn!(
            schema_len = schema.len(),
            model_features = classifier.n_features(),
            "feature schema and classifier arity disagree; predictions will be rejected"
        );
    }

    let fingerprint = ids::fingerprint(
        std::iter::once(model.bytes.as_slice())
            .chain(sources.scaler.iter().map(|s| s.bytes.as_slice()))
            .chain(sources.features.iter().map(|s| s.bytes.as_slice())),
    );

    let metadata = ModelMetadata {
        model_id: file.model_id.clone(),
        model_version: file.model_version.clone(),
        kind: classifier.kind(),
        n_features: classifier.n_features(),
        fingerprint,
        scaled: scaler.is_some(),
    };

    tracing::info!(
        model_id = %metadata.model_id,
        version = metadata.model_version.as_str(),
        kind = metadata.kind.as_str(),
        features = schema.len(),
        fingerprint = %metadata.fingerprint,
        "artifact bundle loaded"
    );

    Ok(ArtifactBundle {
        metadata,
        schema: Arc::new(schema),
        scaler,
        classifier,
    })
}

fn build_classifier(
    spec: &EstimatorSpec,
    n_features_in: Option<usize>,
) -> Result<Arc<dyn Classifier>, String> {
    match spec {
        EstimatorSpec::Logistic {
            weights,
            bias,
            threshold,
        } => {
            if let Some(declared) = n_features_in {
                if declared != weights.len() {
                    return Err(format!(
                        "n_features_in is {declared} but the model has {} weights",
                        weights.len()
                    ));
                }
            }
            let model = LogisticRegression::new(weights.clone(), *bias, *threshold)?;
            Ok(Arc::new(model))
        }
        EstimatorSpec::Forest {
            trees,
            threshold,
            voting,
        } => {
            let n_features =
                n_features_in.ok_or_else(|| "forest models must declare n_features_in".to_string())?;
            let trees = trees
                .iter()
                .enumerate()
                .map(|(idx, nodes)| {
                    DecisionTree::new(nodes.clone(), n_features)
                        .map_err(|reason| format!("tree {idx}: {reason}"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let model = DecisionForest::new(trees, n_features, *threshold, *voting)?;
            Ok(Arc::new(model))
        }
    }
}

/// Feature list file wins over names embedded in the artifact.
fn resolve_schema(
    file: &ArtifactFile,
    sources: &ArtifactSources,
) -> EligibilityResult<ExpectedSchema> {
    if let Some(source) = &sources.features {
        let schema = parse_feature_list(&source.bytes)
            .map_err(|e| source.load_error(e.to_string()))?;
        if schema.categories().is_empty() && !file.categories.is_empty() {
            return ExpectedSchema::new(schema.names().to_vec(), file.categories.clone())
                .map_err(|e| source.load_error(e.to_string()));
        }
        return Ok(schema);
    }

    match &file.feature_names {
        Some(names) => ExpectedSchema::new(names.clone(), file.categories.clone())
            .map_err(|e| sources.model.load_error(e.to_string())),
        None => Err(sources.model.load_error(
            "no feature schema: the artifact has no feature_names and no feature list was given",
        )),
    }
}

fn decode_scaler(source: &ArtifactSource, expected: usize) -> EligibilityResult<StandardScaler> {
    let scaler: StandardScaler = serde_json::from_slice(&source.bytes)
        .map_err(|e| source.load_error(format!("malformed scaler file: {e}")))?;
    scaler.validate().map_err(|reason| source.load_error(reason))?;
    if scaler.len() != expected {
        return Err(source.load_error(format!(
            "scaler covers {} columns, schema has {expected}",
            scaler.len()
        )));
    }
    Ok(scaler)
}
