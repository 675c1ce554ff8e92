//! Loan eligibility: align form input to a trained classifier's feature layout and score it.
//!
//! Flow: [`api::form`] collects raw values → [`align`] builds the feature
//! vector → [`inference`] runs the classifier loaded by [`model`].
pub mod align;
pub mod api;
pub mod common;
pub mod inference;
pub mod model;
pub mod schema;

pub use align::{align, AlignWarning, FeatureAligner, FeatureVector, RawInput, RawValue};
pub use common::{EligibilityError, EligibilityResult, ErrorCode};
pub use inference::{Classifier, PredictionResult, Predictor, Verdict};
pub use model::{ArtifactBundle, FsArtifactRepo};
pub use schema::ExpectedSchema;
