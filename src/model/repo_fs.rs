//! Filesystem repository for artifact files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::common::config::AppCfg;
use crate::common::error::{EligibilityError, EligibilityResult};

use super::domain::{ArtifactRepo, ArtifactSource, ArtifactSources};

/// Reads the model, scaler and feature list from local paths.
#[derive(Clone, Debug)]
pub struct FsArtifactRepo {
    model: PathBuf,
    scaler: Option<PathBuf>,
    features: Option<PathBuf>,
}

impl FsArtifactRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self {
            model: cfg.artifact_path.clone(),
            scaler: cfg.scaler_path.clone(),
            features: cfg.features_path.clone(),
        }
    }

    pub fn with_paths(
        model: impl Into<PathBuf>,
        scaler: Option<PathBuf>,
        features: Option<PathBuf>,
    ) -> Self {
        Self {
            model: model.into(),
            scaler,
            features,
        }
    }
}

fn read_source(path: &Path) -> EligibilityResult<ArtifactSource> {
    let bytes = fs::read(path).map_err(|e| EligibilityError::artifact(path, e.to_string()))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read artifact file");
    Ok(ArtifactSource::new(path, bytes))
}

impl ArtifactRepo for FsArtifactRepo {
    fn read_sources(&self) -> EligibilityResult<ArtifactSources> {
        Ok(ArtifactSources {
            model: read_source(&self.model)?,
            scaler: self.scaler.as_deref().map(read_source).transpose()?,
            features: self.features.as_deref().map(read_source).transpose()?,
        })
    }
}
