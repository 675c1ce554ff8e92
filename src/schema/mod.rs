//! Schema domain: the ordered feature layout a trained classifier expects.

pub mod codec;
pub mod domain;

pub use domain::{one_hot_column, ExpectedSchema};
