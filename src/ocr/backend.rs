//! OCR backend abstraction.
//!
//! Every recognition engine is an external tool invoked on one image at a
//! time. Backends write their output next to a caller-chosen prefix and
//! return the recovered text; the pipeline decides what an error means.

use std::path::Path;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Errors from OCR backends and the rasterizer.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of one recognizer invocation.
#[derive(Debug, Clone)]
pub struct OcrResult {
    /// Extracted text content (may be empty).
    pub text: String,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Available OCR backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrBackendType {
    /// EasyOCR via its wrapper script (printed and handwritten text).
    EasyOcr,
    /// Tesseract OCR via command-line.
    Tesseract,
}

impl OcrBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::EasyOcr => "easyocr",
            OcrBackendType::Tesseract => "tesseract",
        }
    }

    /// Name used in output segment labels.
    pub fn display_name(&self) -> &'static str {
        match self {
            OcrBackendType::EasyOcr => "EasyOCR",
            OcrBackendType::Tesseract => "Tesseract",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easyocr" | "easy" => Some(OcrBackendType::EasyOcr),
            "tesseract" => Some(OcrBackendType::Tesseract),
            _ => None,
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Page segmentation regime requested from a recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Let the engine decide (used by engines without segmentation modes).
    Auto,
    /// Treat the image as a single uniform block of text.
    Block,
    /// Treat the image as a single word.
    Word,
    /// Treat the image as a single character.
    Character,
}

impl RecognitionMode {
    /// Tesseract `--psm` value for this mode.
    pub fn psm(&self) -> &'static str {
        match self {
            RecognitionMode::Auto => "3",
            RecognitionMode::Block => "6",
            RecognitionMode::Word => "8",
            RecognitionMode::Character => "10",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecognitionMode::Auto => "printed + handwriting",
            RecognitionMode::Block => "block mode",
            RecognitionMode::Word => "word mode",
            RecognitionMode::Character => "character mode",
        }
    }

    /// Short token used to name the engine's output file.
    pub fn slug(&self) -> &'static str {
        match self {
            RecognitionMode::Auto => "auto",
            RecognitionMode::Block => "block",
            RecognitionMode::Word => "word",
            RecognitionMode::Character => "char",
        }
    }
}

/// Letters, digits, basic punctuation and whitespace.
pub const RESTRICTED_CHARSET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789.,;:!?'\"()- ";

/// One recognizer configuration: a segmentation mode plus an optional
/// character whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognizerConfig {
    pub mode: RecognitionMode,
    pub charset: Option<&'static str>,
}

impl RecognizerConfig {
    /// Single pass with engine defaults.
    pub const AUTO: RecognizerConfig = RecognizerConfig {
        mode: RecognitionMode::Auto,
        charset: None,
    };

    /// The three handwriting passes, in the order their output is combined.
    pub const HANDWRITING_PASSES: [RecognizerConfig; 3] = [
        RecognizerConfig {
            mode: RecognitionMode::Block,
            charset: Some(RESTRICTED_CHARSET),
        },
        RecognizerConfig {
            mode: RecognitionMode::Word,
            charset: Some(RESTRICTED_CHARSET),
        },
        RecognizerConfig {
            mode: RecognitionMode::Character,
            charset: None,
        },
    ];
}

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend is available (binaries installed, scripts present).
    fn is_available(&self) -> bool;

    /// Describe what's needed to make this backend available.
    ///
    /// Static text; callers pair it with a single `is_available` probe.
    fn availability_hint(&self) -> String;

    /// Core OCR: recognise `image_path`, writing tool output next to `output_prefix`.
    fn run_ocr(
        &self,
        image_path: &Path,
        output_prefix: &Path,
        recognizer: &RecognizerConfig,
    ) -> Result<String, OcrError>;

    /// Human-readable label for results produced under `recognizer`.
    fn label(&self, recognizer: &RecognizerConfig) -> String {
        format!(
            "{} ({})",
            self.backend_type().display_name(),
            recognizer.mode.label()
        )
    }

    /// Run OCR on an image file, returning a timed result.
    fn ocr_image(
        &self,
        image_path: &Path,
        output_prefix: &Path,
        recognizer: &RecognizerConfig,
    ) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let text = self.run_ocr(image_path, output_prefix, recognizer)?;
        Ok(OcrResult {
            text,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Configuration shared by OCR backends.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Language for OCR (e.g., "eng", "spa").
    pub language: String,
    /// Upper bound on a single tool invocation.
    pub timeout: Duration,
    /// Python interpreter used to run the EasyOCR wrapper.
    pub python: String,
    /// Path to the EasyOCR wrapper script.
    pub easyocr_script: std::path::PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            timeout: Duration::from_secs(300),
            python: "python3".to_string(),
            easyocr_script: std::path::PathBuf::from("scripts/easyocr_wrapper.py"),
        }
    }
}
