//! Primary error enum for resolution and binding flows.

use camino::Utf8PathBuf;
use thiserror::Error;

use super::aggregate::AggregatedErrors;

/// Errors that can occur while resolving configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Two sources define different scalars at the same path under strict
    /// merging, or one source repeats a key.
    #[error("duplicate key at '{path}'")]
    DuplicateKey {
        /// Dotted path of the conflicting entry.
        path: String,
    },

    /// A mapping, sequence and scalar collided at the same path.
    #[error("can't merge a {incoming} into a {existing} at '{path}'")]
    StructuralConflict {
        /// Dotted path of the conflicting entry.
        path: String,
        /// Kind of the value already accumulated.
        existing: &'static str,
        /// Kind of the value the later source supplied.
        incoming: &'static str,
    },

    /// A `${NAME}` placeholder had no value and no default.
    #[error("variable '{name}' is not defined and has no default")]
    UndefinedVariable {
        /// Name of the missing variable.
        name: String,
    },

    /// A field tagged `required` was still zero after every pass.
    #[error("{type_name}.{field} is required, but blank")]
    MissingRequired {
        /// Name of the struct declaring the field.
        type_name: &'static str,
        /// Field name.
        field: String,
    },

    /// A codec rejected the document bytes, or a document could not be
    /// decoded into the requested type.
    #[error("couldn't decode {origin}: {message}")]
    Decode {
        /// File path or source name that failed.
        origin: String,
        /// Decoder message.
        message: String,
    },

    /// A discovered configuration file could not be read.
    #[error("configuration file error in '{path}': {source}")]
    File {
        /// Path that triggered the failure.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No variant of a configured file exists. Sessions log this and carry on.
    #[error("failed to find configuration {path}: {message}")]
    FileDiscovery {
        /// Logical file name that produced no candidate.
        path: Utf8PathBuf,
        /// Explanation of what was tried.
        message: String,
    },

    /// The bind target does not serialise to a mapping.
    #[error("invalid config target: {message}")]
    InvalidTarget {
        /// Explanation of the rejected target.
        message: String,
    },

    /// Options were changed after configuration had been loaded.
    #[error("cannot set options after configuration has been loaded")]
    AlreadyLoaded,

    /// The background reload thread could not be started.
    #[error("failed to start the reload thread: {source}")]
    ReloadSpawn {
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Several registered keys failed during one reload pass.
    #[error("multiple configuration errors:\n{0}")]
    Aggregate(Box<AggregatedErrors>),
}
