//! Feature alignment between human-readable submissions and the model's input layout.

pub mod domain;
pub mod service;

pub use domain::{AlignWarning, Alignment, FeatureVector, RawInput, RawValue};
pub use service::{align, FeatureAligner, DEFAULT_FILL};
