//! scanflow - batch OCR for scanned PDF documents.
//!
//! Pending PDFs are rasterized page by page, each page is enhanced twice
//! (once for printed text, once for handwriting), recognised by the
//! configured engines, and the labeled results are assembled into one
//! text file per document. Successfully processed sources are archived;
//! anything that fails stays pending for the next run.

pub mod config;
pub mod logging;
pub mod ocr;
pub mod pipeline;
pub mod preprocess;
