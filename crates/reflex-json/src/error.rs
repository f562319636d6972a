//! Error types for the JSON mapper

use reflex_engine::ReflectError;

/// Result type for mapping operations
pub type JsonMapResult<T> = Result<T, JsonMapError>;

/// JSON mapping errors
#[derive(Debug, thiserror::Error)]
pub enum JsonMapError {
    /// The reflection engine refused an operation
    #[error(transparent)]
    Reflect(#[from] ReflectError),

    /// Malformed JSON text
    #[error("JSON syntax error: {0}")]
    Syntax(#[from] serde_json::Error),

    /// The JSON value has the wrong shape for the target type
    #[error("Expected {expected}, found JSON {found}")]
    UnexpectedJson {
        /// Target type name
        expected: String,
        /// Kind of the JSON value
        found: &'static str,
    },

    /// The type's JSON shape tag is neither "object" nor "array"
    #[error("Unsupported JSON shape \"{shape}\" on {type_name}")]
    UnsupportedShape {
        /// Owning type name
        type_name: String,
        /// Tag found under the shape metadata key
        shape: String,
    },
}
