//! Page OCR Combiner: run every configured engine pass over a page and
//! collect the non-empty results in a fixed order.
//!
//! Order: primary engine on the standard variant, then the handwriting
//! engine's block, word and character passes on the handwriting variant.
//! Engine failures are logged and skipped; they never abort the page.

use std::path::Path;

use tracing::{debug, warn};

use crate::ocr::{OcrBackend, RecognizerConfig};
use crate::preprocess::PreprocessedPage;

use super::paths::PageArtifacts;
use super::text::PageTextBlock;

pub struct PageCombiner {
    primary: Option<Box<dyn OcrBackend>>,
    handwriting: Option<Box<dyn OcrBackend>>,
}

impl PageCombiner {
    pub fn new(
        primary: Option<Box<dyn OcrBackend>>,
        handwriting: Option<Box<dyn OcrBackend>>,
    ) -> Self {
        Self {
            primary,
            handwriting,
        }
    }

    /// Recognise one page. Never fails; a page nobody could read yields an
    /// empty block.
    pub fn recognize_page(&self, page: &PageArtifacts, variants: &PreprocessedPage) -> PageTextBlock {
        let mut block = PageTextBlock::new();

        if let (Some(engine), Some(image)) = (&self.primary, &variants.standard) {
            run_pass(engine.as_ref(), page, image, &RecognizerConfig::AUTO, &mut block);
        }

        if let (Some(engine), Some(image)) = (&self.handwriting, &variants.handwriting) {
            for recognizer in &RecognizerConfig::HANDWRITING_PASSES {
                run_pass(engine.as_ref(), page, image, recognizer, &mut block);
            }
        }

        block
    }
}

fn run_pass(
    engine: &dyn OcrBackend,
    page: &PageArtifacts,
    image: &Path,
    recognizer: &RecognizerConfig,
    block: &mut PageTextBlock,
) {
    let label = engine.label(recognizer);
    let prefix = page.engine_output_prefix(engine.backend_type(), recognizer);

    match engine.ocr_image(image, &prefix, recognizer) {
        Ok(result) => {
            let kept = block.push_if_nonempty(label.as_str(), &result.text);
            debug!(
                "Page {}: {} returned {} chars in {}ms{}",
                page.number,
                label,
                result.text.trim().len(),
                result.processing_time_ms,
                if kept { "" } else { " (empty, skipped)" }
            );
        }
        Err(e) => {
            warn!("Page {}: {} failed: {}", page.number, label, e);
        }
    }
}
