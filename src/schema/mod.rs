//! Schema manifests and their compiled validators.
//!
//! Tools: see `crate::tools::schema`.

mod cache;
mod compiler;
mod manifest;
mod validator;

pub use cache::SchemaCache;
pub use compiler::{CompiledSchema, TypeSummary, TypeValidator};
pub use manifest::{FieldManifest, ManifestKind, PrimitiveKind, TargetRef, TypeManifest, TypeRef};
pub use validator::{describe_value, normalize_document_id, ValidationError, Validator};

/// A manifest set that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaConfigError {
    /// Two manifests share a name.
    #[error("duplicate type name: {0}")]
    DuplicateType(String),

    /// A field or array member names a type that is not defined.
    #[error("type '{name}' referenced by '{referenced_by}' is not defined")]
    UndefinedType {
        /// The missing type.
        name: String,
        /// `type.field` that referenced it.
        referenced_by: String,
    },

    /// A manifest is structurally unusable.
    #[error("invalid manifest '{name}': {reason}")]
    InvalidManifest {
        /// Offending type.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}
