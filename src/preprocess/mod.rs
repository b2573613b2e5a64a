//! Dual-mode page image preprocessing.
//!
//! Each rasterized page yields two variants, both derived independently
//! from the original page image:
//! - **standard**: grayscale, normalised, lightly contrast-stretched and
//!   (when `unpaper` is installed) cleaned of scan artifacts
//! - **handwriting**: grayscale, normalised, aggressively stretched,
//!   sharpened, binarised and closed to reconnect broken strokes

mod artifacts;
pub mod filters;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use image::{DynamicImage, GrayImage};
use thiserror::Error;
use tracing::{debug, warn};

use crate::pipeline::paths::PageArtifacts;

pub use artifacts::{ArtifactRemover, UnpaperRemover};

/// Errors from image preprocessing.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Artifact removal failed: {0}")]
    ArtifactRemoval(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tuning for the two variants.
#[derive(Debug, Clone, Copy)]
pub struct PreprocessSettings {
    /// Fractions of pixels clipped at the dark/bright ends for the standard variant.
    pub standard_stretch: (f32, f32),
    /// Fractions of pixels clipped at the dark/bright ends for the handwriting variant.
    pub handwriting_stretch: (f32, f32),
    /// Binarisation level for the handwriting variant.
    pub threshold: u8,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            standard_stretch: (0.02, 0.01),
            handwriting_stretch: (0.05, 0.05),
            threshold: 128,
        }
    }
}

/// The variants that were produced for a page.
///
/// A variant is `None` when deriving or writing it failed; recognition
/// skips engines whose input is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessedPage {
    pub standard: Option<PathBuf>,
    pub handwriting: Option<PathBuf>,
}

/// Produces the standard and handwriting variants of page images.
pub struct Preprocessor {
    remover: Option<Box<dyn ArtifactRemover>>,
    settings: PreprocessSettings,
    warned_missing_remover: AtomicBool,
}

impl Preprocessor {
    /// `remover` is `None` when no artifact remover is installed.
    pub fn new(remover: Option<Box<dyn ArtifactRemover>>) -> Self {
        Self::with_settings(remover, PreprocessSettings::default())
    }

    pub fn with_settings(
        remover: Option<Box<dyn ArtifactRemover>>,
        settings: PreprocessSettings,
    ) -> Self {
        Self {
            remover,
            settings,
            warned_missing_remover: AtomicBool::new(false),
        }
    }

    /// Write both variants for `page`. The page image itself is left in place.
    ///
    /// Fails only when the page image cannot be read at all.
    pub fn preprocess(&self, page: &PageArtifacts) -> Result<PreprocessedPage, PreprocessError> {
        let original = image::open(&page.page_image)?;

        let standard = match self.write_standard(&original, &page.standard) {
            Ok(()) => Some(page.standard.clone()),
            Err(e) => {
                warn!("Page {}: standard variant failed: {}", page.number, e);
                None
            }
        };
        let handwriting = match self.handwriting_variant(&original).save(&page.handwriting) {
            Ok(()) => Some(page.handwriting.clone()),
            Err(e) => {
                warn!("Page {}: handwriting variant failed: {}", page.number, e);
                None
            }
        };

        Ok(PreprocessedPage {
            standard,
            handwriting,
        })
    }

    /// Grayscale, normalise and contrast-stretch for printed text.
    pub fn standard_variant(&self, original: &DynamicImage) -> GrayImage {
        let (black, white) = self.settings.standard_stretch;
        let gray = filters::normalize(&filters::grayscale(original));
        filters::contrast_stretch(&gray, black, white)
    }

    /// Binarised, stroke-closed image for handwriting recognition.
    pub fn handwriting_variant(&self, original: &DynamicImage) -> GrayImage {
        let (black, white) = self.settings.handwriting_stretch;
        let gray = filters::normalize(&filters::grayscale(original));
        let stretched = filters::contrast_stretch(&gray, black, white);
        let sharpened = filters::sharpen(&stretched);
        let binary = filters::threshold(&sharpened, self.settings.threshold);
        filters::close_ink(&binary)
    }

    fn write_standard(&self, original: &DynamicImage, out: &Path) -> Result<(), PreprocessError> {
        self.standard_variant(original).save(out)?;

        match &self.remover {
            Some(remover) => {
                if let Err(e) = remover.clean(out) {
                    warn!(
                        "{} failed on {}, keeping normalised image: {}",
                        remover.name(),
                        out.display(),
                        e
                    );
                }
            }
            None => {
                if !self.warned_missing_remover.swap(true, Ordering::Relaxed) {
                    warn!("Artifact removal unavailable; standard variants are normalised only");
                } else {
                    debug!("Skipping artifact removal for {}", out.display());
                }
            }
        }
        Ok(())
    }
}
