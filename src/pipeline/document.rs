//! A pending source document.

use std::path::{Path, PathBuf};

/// A PDF waiting in (or claimed from) the pending directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Stable name: the file name without its extension.
    pub name: String,
    /// File name including extension.
    pub file_name: String,
    /// Current location of the source file.
    pub path: PathBuf,
}

impl Document {
    /// Build from a path. Returns `None` when the path has no usable file name.
    ///
    /// The name becomes a directory and file name under the scratch and
    /// output directories, so `.`, `..` and anything with a separator are
    /// refused.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let name = path.file_stem()?.to_str()?.to_string();
        if !is_safe_name(&name) {
            return None;
        }
        Some(Self {
            name,
            file_name,
            path: path.to_path_buf(),
        })
    }
}

/// Whether `name` is a single ordinary path component.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

/// Whether `path` names a PDF (extension compared case-insensitively).
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
