//! OCR engine and rasterizer adapters.
//!
//! Every engine is an external tool:
//! - pdftoppm (Poppler) renders PDF pages to PNG
//! - EasyOCR (Python wrapper) recognises printed and handwritten text in one pass
//! - Tesseract recognises the binarised handwriting variant under several
//!   segmentation modes
//!
//! Adapters block until their subprocess exits or times out.

mod backend;
mod easyocr;
mod pdf_utils;
pub mod process;
mod registry;
mod tesseract;
pub mod tools;

pub use backend::{
    OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult, RecognitionMode,
    RecognizerConfig, RESTRICTED_CHARSET,
};
pub use easyocr::EasyOcrBackend;
pub use pdf_utils::{collect_page_images, parse_page_number, PdftoppmRasterizer, Rasterizer};
pub use registry::{create_backend, DISABLED};
pub use tesseract::TesseractBackend;
