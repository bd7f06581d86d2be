use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tract_onnx::prelude::tract_ndarray::ShapeError;
use tract_onnx::prelude::TractError;

/// Errors raised anywhere between argument intake and report writing.
#[derive(Debug, Error)]
pub enum OcrError {
    /// An input image could not be opened or decoded.
    #[error("cannot load image '{path}': {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A required file does not exist.
    #[error("{what} not found: {path}")]
    NotFound { what: &'static str, path: PathBuf },

    /// The model does not have exactly one input and one output.
    #[error("only single input and single output topologies are supported, model has {inputs} input(s) and {outputs} output(s)")]
    Topology { inputs: usize, outputs: usize },

    /// Error reported by the inference runtime.
    #[error(transparent)]
    Model(#[from] TractError),

    /// The model produced no output tensor.
    #[error("model returned no output")]
    EmptyOutput,

    /// The output tensor cannot be decoded.
    #[error("unsupported output: {0}")]
    Output(String),

    #[error("tensor shape: {0}")]
    Shape(#[from] ShapeError),

    /// A dictionary or config file is not valid JSON for its schema.
    #[error("cannot parse '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An image transform received an input it cannot handle.
    #[error("transform: {0}")]
    Transform(&'static str),

    #[error("configuration: {message}")]
    Config { message: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    pub fn config(message: impl Into<String>) -> Self {
        OcrError::Config {
            message: message.into(),
        }
    }

    pub fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        OcrError::NotFound {
            what,
            path: path.into(),
        }
    }
}

pub type Result<T, E = OcrError> = std::result::Result<T, E>;

/// Reads `path` to a string. A missing file becomes [`OcrError::NotFound`],
/// any other failure stays an I/O error.
pub(crate) fn read_file(what: &'static str, path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => OcrError::not_found(what, path),
        _ => OcrError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn messages_keep_the_cause() {
        let err = OcrError::from(std::io::Error::new(ErrorKind::PermissionDenied, "denied"));
        assert_eq!(err.to_string(), "io: denied");
    }

    #[test]
    fn read_file_separates_missing_from_unreadable() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_file("dictionary", &dir.path().join("absent.json")),
            Err(OcrError::NotFound { what: "dictionary", .. })
        ));
        // a directory exists but cannot be read as a file
        assert!(matches!(read_file("dictionary", dir.path()), Err(OcrError::Io(_))));
    }
}
