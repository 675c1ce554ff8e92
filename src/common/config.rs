//! Runtime configuration loaded from command-line flags with environment fallbacks.
//!
//! The snapshot is built once at startup and never mutated afterwards.

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::common::error::{EligibilityError, EligibilityResult};

/// Default bind address for the form server.
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

/// Output format for log lines.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Locations of the artifact files, shared by every subcommand.
#[derive(Args, Clone, Debug)]
pub struct ArtifactArgs {
    /// Serialized classifier (JSON).
    #[arg(long = "artifact", env = "LOAN_ELIGIBILITY_ARTIFACT")]
    pub artifact: Option<PathBuf>,

    /// Optional serialized standard scaler (JSON with `mean` and `scale`).
    #[arg(long = "scaler", env = "LOAN_ELIGIBILITY_SCALER")]
    pub scaler: Option<PathBuf>,

    /// Optional feature-name list; overrides the names embedded in the artifact.
    #[arg(long = "features", env = "LOAN_ELIGIBILITY_FEATURES")]
    pub features: Option<PathBuf>,
}

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug)]
pub struct AppCfg {
    pub artifact_path: PathBuf,
    pub scaler_path: Option<PathBuf>,
    pub features_path: Option<PathBuf>,
    pub bind: String,
    pub log_format: LogFormat,
}

impl AppCfg {
    /// Build a validated snapshot from parsed flags.
    pub fn from_args(
        artifacts: ArtifactArgs,
        bind: Option<String>,
        log_format: LogFormat,
    ) -> EligibilityResult<Self> {
        let artifact_path = artifacts.artifact.ok_or_else(|| {
            EligibilityError::invalid(
                "no artifact configured: pass --artifact or set LOAN_ELIGIBILITY_ARTIFACT",
            )
        })?;

        let bind = bind.unwrap_or_else(|| DEFAULT_BIND.to_string());
        if bind.trim().is_empty() {
            return Err(EligibilityError::invalid("bind address must not be empty"));
        }

        Ok(Self {
            artifact_path,
            scaler_path: artifacts.scaler,
            features_path: artifacts.features,
            bind,
            log_format,
        })
    }
}
