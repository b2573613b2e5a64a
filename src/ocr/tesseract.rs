//! Tesseract OCR backend implementation.
//!
//! Uses Tesseract via command-line. Used as the handwriting-specialised
//! engine: it is run several times per page under different segmentation
//! modes against the binarised handwriting variant.

use std::path::Path;
use std::process::Command;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, RecognizerConfig};
use super::process::{run_tool, take_output_file, with_appended_extension};
use super::tools::{check_binary, TESSERACT_NOT_FOUND};

/// Tesseract OCR backend.
pub struct TesseractBackend {
    config: OcrConfig,
    binary: String,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with default configuration.
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self {
            config,
            binary: "tesseract".to_string(),
        }
    }

    /// Build the command line for one recognizer pass.
    fn command(
        &self,
        image_path: &Path,
        output_prefix: &Path,
        recognizer: &RecognizerConfig,
    ) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(image_path)
            .arg(output_prefix)
            .args(["-l", &self.config.language])
            .args(["--psm", recognizer.mode.psm()]);
        if let Some(charset) = recognizer.charset {
            cmd.arg("-c")
                .arg(format!("tessedit_char_whitelist={}", charset));
        }
        cmd
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary(&self.binary)
    }

    fn availability_hint(&self) -> String {
        TESSERACT_NOT_FOUND.to_string()
    }

    fn label(&self, recognizer: &RecognizerConfig) -> String {
        format!("Tesseract handwriting ({})", recognizer.mode.label())
    }

    fn run_ocr(
        &self,
        image_path: &Path,
        output_prefix: &Path,
        recognizer: &RecognizerConfig,
    ) -> Result<String, OcrError> {
        let mut cmd = self.command(image_path, output_prefix, recognizer);
        run_tool(&mut cmd, "tesseract", self.config.timeout)?.check("tesseract")?;
        // tesseract appends .txt to the output base it was given
        take_output_file(&with_appended_extension(output_prefix, "txt"))
    }
}
