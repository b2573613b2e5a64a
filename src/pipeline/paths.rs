//! Naming of per-page artifacts inside a document workspace.
//!
//! Every derived file for a page is a pure function of
//! (workspace, document name, page number). The handwriting variant is
//! always derived from the standard variant's path, never stored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::ocr::{OcrBackendType, RecognizerConfig};

const STANDARD_SUFFIX: &str = "_standard.png";
const HANDWRITING_SUFFIX: &str = "_handwriting.png";

/// Paths of every artifact belonging to one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArtifacts {
    /// 1-based page number.
    pub number: u32,
    /// Rasterized page image.
    pub page_image: PathBuf,
    /// Denoised, contrast-normalised variant.
    pub standard: PathBuf,
    /// Sharpened, binarised, closed variant.
    pub handwriting: PathBuf,
    workspace: PathBuf,
    stem: String,
}

impl PageArtifacts {
    pub fn new(workspace: &Path, document_name: &str, number: u32) -> Self {
        let stem = page_stem(document_name, number);
        let page_image = workspace.join(format!("{}.png", stem));
        let standard = standard_variant_of(&page_image);
        let handwriting = handwriting_variant_of(&standard);
        Self {
            number,
            page_image,
            standard,
            handwriting,
            workspace: workspace.to_path_buf(),
            stem,
        }
    }

    /// Output base handed to an engine for one recognizer pass.
    pub fn engine_output_prefix(
        &self,
        backend: OcrBackendType,
        recognizer: &RecognizerConfig,
    ) -> PathBuf {
        self.workspace.join(format!(
            "{}.{}-{}",
            self.stem,
            backend.as_str(),
            recognizer.mode.slug()
        ))
    }

    /// Whether `file_name` is one of this page's artifacts.
    pub fn owns(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.stem.as_str())
            .is_some_and(|rest| rest.starts_with(['.', '_']))
    }

    /// Delete the page image, both variants and any engine leftovers.
    pub fn remove_files(&self) -> io::Result<usize> {
        let mut removed = 0;
        let entries = match fs::read_dir(&self.workspace) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            let owned = entry.file_name().to_str().is_some_and(|n| self.owns(n));
            if owned && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// `<document>-page-<NNNN>`
pub fn page_stem(document_name: &str, number: u32) -> String {
    format!("{}-page-{:04}", document_name, number)
}

/// Standard variant path for a page image: `<stem>_standard.png`.
pub fn standard_variant_of(page_image: &Path) -> PathBuf {
    let stem = page_image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    page_image.with_file_name(format!("{}{}", stem, STANDARD_SUFFIX))
}

/// Handwriting variant path derived from the standard variant path.
pub fn handwriting_variant_of(standard: &Path) -> PathBuf {
    let name = standard
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(STANDARD_SUFFIX).unwrap_or(&name);
    standard.with_file_name(format!("{}{}", stem, HANDWRITING_SUFFIX))
}
