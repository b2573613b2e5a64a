//! Probing for external tools.

use std::path::Path;

pub const PDFTOPPM_NOT_FOUND: &str =
    "pdftoppm not installed. Install with: apt install poppler-utils";
pub const TESSERACT_NOT_FOUND: &str =
    "Tesseract not installed. Install with: apt install tesseract-ocr";
pub const UNPAPER_NOT_FOUND: &str = "unpaper not installed. Install with: apt install unpaper";

/// Check if a binary is available, either on PATH or as an explicit path.
pub fn check_binary(name: &str) -> bool {
    let path = Path::new(name);
    if path.components().count() > 1 {
        return path.is_file();
    }
    which::which(name).is_ok()
}
