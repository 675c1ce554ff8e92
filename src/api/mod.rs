//! User-facing surfaces: the applicant form, its HTML rendering and the HTTP server.

pub mod form;
pub mod render;
pub mod server;

pub use form::{FieldKind, FormField, FormSpec};
pub use server::{route, FormServer, Reply, MAX_BODY_BYTES};
