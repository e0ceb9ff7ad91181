use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a question source into a usable knowledge base.
///
/// Fatal at startup. During a reload the previous snapshot keeps serving.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Question source not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid question record #{index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

/// Failure reported by the optional external prediction model.
#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("Prediction model is not ready")]
    NotReady,

    #[error("Prediction request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid prediction response: {0}")]
    InvalidResponse(String),
}
