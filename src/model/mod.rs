//! Model domain: serialized artifacts and the immutable bundle built from them.
//!
//! TODO: Accept a model version pin from config and refuse artifacts that do not match it.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{ArtifactBundle, ArtifactRepo, ModelId, ModelMetadata, StandardScaler, VersionName};
pub use repo_fs::FsArtifactRepo;
pub use service::{assemble, load_bundle};
