//! Document-level pipeline errors.
//!
//! Anything returned from here is fatal to one document only. Page and
//! engine failures never surface as a `PipelineError`.

use std::path::PathBuf;

use thiserror::Error;

use crate::ocr::OcrError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Rasterization failed: {0}")]
    Rasterization(#[source] OcrError),

    #[error("Rasterization produced no pages")]
    NoPages,

    #[error("Could not prepare workspace {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Name '{name}' is already taken by {existing}")]
    NameConflict { name: String, existing: String },

    #[error("Could not write output {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
