//! PDF rasterization via pdftoppm.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::backend::OcrError;
use super::process::run_tool;
use super::tools::{check_binary, PDFTOPPM_NOT_FOUND};

/// Prefix pdftoppm is told to use for the pages it writes.
const RAW_PAGE_PREFIX: &str = "raw";

/// Converts a document into one image per page.
pub trait Rasterizer: Send + Sync {
    /// Render every page of `pdf_path` into `output_dir`.
    ///
    /// Returns the written images ordered by page number (page 1 first).
    fn rasterize(&self, pdf_path: &Path, output_dir: &Path, dpi: u32)
        -> Result<Vec<PathBuf>, OcrError>;

    /// Check if the rasterizer can run.
    fn is_available(&self) -> bool;

    /// How to install the rasterizer. Does not probe.
    fn availability_hint(&self) -> String;
}

/// Rasterizer backed by Poppler's `pdftoppm`.
pub struct PdftoppmRasterizer {
    binary: String,
    timeout: Duration,
}

impl PdftoppmRasterizer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            binary: "pdftoppm".to_string(),
            timeout,
        }
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(
        &self,
        pdf_path: &Path,
        output_dir: &Path,
        dpi: u32,
    ) -> Result<Vec<PathBuf>, OcrError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-png", "-r", &dpi.to_string()])
            .arg(pdf_path)
            .arg(output_dir.join(RAW_PAGE_PREFIX));

        match run_tool(&mut cmd, "pdftoppm", self.timeout) {
            Ok(output) => {
                output.check("pdftoppm")?;
            }
            Err(OcrError::BackendNotAvailable(_)) => {
                return Err(OcrError::BackendNotAvailable(PDFTOPPM_NOT_FOUND.to_string()));
            }
            Err(e) => return Err(e),
        }

        collect_page_images(output_dir, RAW_PAGE_PREFIX)
    }

    fn is_available(&self) -> bool {
        check_binary(&self.binary)
    }

    fn availability_hint(&self) -> String {
        PDFTOPPM_NOT_FOUND.to_string()
    }
}

/// Parse the page number out of a pdftoppm file name.
///
/// pdftoppm names files like `raw-1.png`, `raw-01.png` or `raw-001.png`;
/// the padding width depends on the total page count.
pub fn parse_page_number(file_name: &str, prefix: &str) -> Option<u32> {
    file_name
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// List the page images pdftoppm wrote, ordered numerically by page.
pub fn collect_page_images(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, OcrError> {
    let mut pages: Vec<(u32, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(page) = name.to_str().and_then(|n| parse_page_number(n, prefix)) {
            pages.push((page, entry.path()));
        }
    }
    pages.sort_by_key(|(page, _)| *page);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}
