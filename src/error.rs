//! Error types for lamina
//!
//! All modules use `LaminaResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lamina operations
pub type LaminaResult<T> = Result<T, LaminaError>;

/// All errors that can occur during export and cache sessions
#[derive(Error, Debug)]
pub enum LaminaError {
    // Input-shape errors
    #[error("parsing {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("reading layers for buildpack '{id}': {source}")]
    BuildpackDir {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid api version '{0}'")]
    InvalidVersion(String),

    // Semantic errors
    #[error("layer '{id}' is cache=true but has no contents")]
    CachedLayerMissingContents { id: String },

    #[error("failed to cache layer '{id}' because it has no contents")]
    UncacheableLayer { id: String },

    #[error("cannot reuse '{id}', previous image has no metadata for layer '{id}'")]
    ReuseWithoutMetadata { id: String },

    #[error("failed to parse metadata for layers '{}'", .ids.join(", "))]
    MalformedLayers { ids: Vec<String> },

    #[error("default process type '{requested}' not present in list [{}]", .available.join(", "))]
    ProcessTypeMissing {
        requested: String,
        available: Vec<String>,
    },

    #[error("tried to set {requested} to default but it doesn't exist")]
    DefaultProcessNotFound { requested: String },

    // Cache errors
    #[error("cache cannot be modified after commit")]
    CacheCommitted,

    #[error("layer with SHA '{diff_id}' not found")]
    CacheLayerNotFound { diff_id: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Wrapping with the name of the failed operation
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<LaminaError>,
    },

    // General errors (image backends without a more specific kind)
    #[error("{0}")]
    Other(String),
}

impl LaminaError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap an error with the name of the operation that failed
    pub fn context(context: impl Into<String>, source: LaminaError) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
