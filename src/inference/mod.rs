//! Inference domain: classifier adapters and the request-level predictor.

pub mod domain;
pub mod service;

pub use domain::{Classifier, ModelKind, PredictionResult, Verdict};
pub use service::Predictor;
