//! Construct OCR backends from configured names.
//!
//! Engine selection is a static policy: the configuration names one
//! primary engine and one handwriting engine, and this module turns each
//! name into a backend. There is no content-adaptive selection.

use tracing::{debug, warn};

use super::backend::{OcrBackend, OcrBackendType, OcrConfig};
use super::easyocr::EasyOcrBackend;
use super::tesseract::TesseractBackend;

/// Name that disables an engine slot.
pub const DISABLED: &str = "none";

/// Create a backend by name.
///
/// Returns `None` for `"none"`, an empty name, or an unknown name.
pub fn create_backend(name: &str, config: &OcrConfig) -> Option<Box<dyn OcrBackend>> {
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case(DISABLED) {
        debug!("OCR engine slot disabled");
        return None;
    }

    match OcrBackendType::from_str(name) {
        Some(OcrBackendType::EasyOcr) => Some(Box::new(EasyOcrBackend::with_config(config.clone()))),
        Some(OcrBackendType::Tesseract) => {
            Some(Box::new(TesseractBackend::with_config(config.clone())))
        }
        None => {
            warn!("Unknown OCR engine '{}', treating as absent", name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_backends() {
        let config = OcrConfig::default();
        let easy = create_backend("easyocr", &config).unwrap();
        assert_eq!(easy.backend_type(), OcrBackendType::EasyOcr);
        let tess = create_backend("Tesseract", &config).unwrap();
        assert_eq!(tess.backend_type(), OcrBackendType::Tesseract);
    }

    #[test]
    fn test_disabled_and_unknown() {
        let config = OcrConfig::default();
        assert!(create_backend("none", &config).is_none());
        assert!(create_backend("", &config).is_none());
        assert!(create_backend("unknown_backend", &config).is_none());
    }
}
