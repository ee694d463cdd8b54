use std::path::PathBuf;

/// Every failure the engine can surface, from schema construction through
/// loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Programmer misuse of the API (bad parent value, alias to an
    /// undeclared parameter, ...).
    #[error("{0}")]
    Argument(String),

    /// A setter or getter referenced a name absent from the resolved schema.
    #[error("unknown parameter '{name}' on schema '{schema}'")]
    UnknownParameter { name: String, schema: String },

    /// A typed getter found a value of the wrong kind.
    #[error("parameter '{name}' is not {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// An explicitly given configuration file path does not exist.
    #[error("configuration file does not exist: {}", .path.display())]
    PathNotFound { path: PathBuf },

    /// `load()` with no path was called on a schema without usual paths.
    #[error("no path given and usual_paths not set for schema '{schema}'")]
    NoUsualPath { schema: String },

    /// None of the schema's usual paths exist.
    #[error("none of the usual paths existed: {}", join_paths(.paths))]
    NoExistingUsualPath { paths: Vec<PathBuf> },

    /// A statement could not be parsed or is structurally invalid. Root
    /// cause for [`ConfigError::Syntax`], rarely surfaced on its own.
    #[error("{message}")]
    Parse { message: String },

    /// Malformed or unresolvable script content, attributed to a source
    /// file and 1-based line.
    #[error("syntax error in {}:{line}: {cause}", .source.display())]
    Syntax {
        source: PathBuf,
        line: usize,
        #[source]
        cause: Box<ConfigError>,
    },

    /// A parameter registered with `deprecated_error` was set.
    #[error("{0}")]
    Deprecated(String),

    /// Aggregate of every message collected by the validation walk.
    #[error("configuration validation failed: {}", .errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Whether this failure stems from the structure of the script itself,
    /// as opposed to an ordinary application error. Only these kinds get
    /// reclassified as [`ConfigError::Syntax`] by the evaluator.
    #[must_use]
    pub fn is_script_structure(&self) -> bool {
        matches!(
            self,
            Self::UnknownParameter { .. } | Self::Parse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
