use std::path::PathBuf;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Fatal errors. Fatal always means "for this input file only": a multi-file
/// run keeps going and the caller decides the exit code.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid layout JSON in {path}: {message}")]
    JsonError { path: String, message: String },

    #[error("layout root must be an object with a \"type\" key")]
    InvalidRoot,
}

/// Non-fatal conditions. The core never aborts on these; it degrades the
/// output and records the warning on the compile context so the enclosing
/// CLI can aggregate them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    StyleNotFound {
        name: String,
    },
    StyleParseError {
        name: String,
        file: String,
        message: String,
    },
    StyleDepthExceeded {
        name: String,
        depth: u32,
    },
    MissingStyleDirectory,
    UnknownComponentType {
        kind: String,
    },
    DuplicateId {
        id: String,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::StyleNotFound { name } => {
                write!(f, "style '{}' not found on the search path", name)
            }
            Warning::StyleParseError {
                name,
                file,
                message,
            } => write!(f, "style '{}' ({}) is not valid JSON: {}", name, file, message),
            Warning::StyleDepthExceeded { name, depth } => write!(
                f,
                "style '{}' exceeds nesting depth {} (possible style cycle)",
                name, depth
            ),
            Warning::MissingStyleDirectory => {
                write!(f, "no style directory exists on the search path")
            }
            Warning::UnknownComponentType { kind } => write!(
                f,
                "unknown component type '{}', common properties only",
                kind
            ),
            Warning::DuplicateId { id } => write!(f, "duplicate node id '{}'", id),
        }
    }
}
