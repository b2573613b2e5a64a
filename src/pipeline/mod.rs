//! Document processing pipeline.
//!
//! ```text
//! BatchDriver / Monitor
//!   -> Lifecycle::stage_in
//!   -> DocumentAssembler: rasterize -> per page { Preprocessor -> PageCombiner }
//!   -> Lifecycle::write_output -> Lifecycle::archive
//! ```
//!
//! Everything runs sequentially: one document, one page, one engine pass
//! at a time.

mod assembler;
mod batch;
mod capabilities;
mod combiner;
mod document;
mod error;
mod lifecycle;
mod monitor;
pub mod paths;
mod text;

use tracing::warn;

use crate::config::Settings;
use crate::ocr::{create_backend, OcrBackend, PdftoppmRasterizer};
use crate::preprocess::{ArtifactRemover, Preprocessor, UnpaperRemover};

pub use assembler::{DocumentAssembler, DocumentState, ProcessedDocument};
pub use batch::{BatchDriver, BatchSummary};
pub use capabilities::{Capabilities, ToolStatus};
pub use combiner::PageCombiner;
pub use document::{is_pdf, Document};
pub use error::PipelineError;
pub use lifecycle::{Lifecycle, Workspace};
pub use monitor::{
    shutdown_channel, Monitor, MonitorAction, MonitorReport, ShutdownHandle, ShutdownSignal,
};
pub use paths::PageArtifacts;
pub use text::{DocumentText, LabeledSegment, PageTextBlock};

/// Probe every external tool named by `settings`.
pub fn probe_capabilities(settings: &Settings) -> Capabilities {
    let ocr_config = settings.ocr_config();
    let primary = create_backend(&settings.primary_engine, &ocr_config);
    let handwriting = create_backend(&settings.handwriting_engine, &ocr_config);
    Capabilities::probe(
        &PdftoppmRasterizer::new(settings.engine_timeout()),
        &UnpaperRemover::new(settings.engine_timeout()),
        primary.as_deref(),
        handwriting.as_deref(),
    )
}

/// Wire the production pipeline from settings.
///
/// Tools are probed once here; optional tools that are missing are left
/// out rather than re-checked per page.
pub fn build_assembler(settings: &Settings) -> (DocumentAssembler, Capabilities) {
    let ocr_config = settings.ocr_config();
    let timeout = settings.engine_timeout();

    let rasterizer = PdftoppmRasterizer::new(timeout);
    let remover = UnpaperRemover::new(timeout);
    let primary = create_backend(&settings.primary_engine, &ocr_config);
    let handwriting = create_backend(&settings.handwriting_engine, &ocr_config);

    let capabilities = Capabilities::probe(
        &rasterizer,
        &remover,
        primary.as_deref(),
        handwriting.as_deref(),
    );
    capabilities.log_summary();

    let remover: Option<Box<dyn ArtifactRemover>> = if capabilities.has_artifact_removal() {
        Some(Box::new(remover))
    } else {
        None
    };
    let primary = keep_if(primary, capabilities.has_primary_engine());
    let handwriting = keep_if(handwriting, capabilities.has_handwriting_engine());
    if !capabilities.rasterizer.available {
        warn!("Documents will stay pending until the rasterizer is installed");
    }

    let assembler = DocumentAssembler::new(
        Box::new(rasterizer),
        Preprocessor::new(remover),
        PageCombiner::new(primary, handwriting),
        settings.lifecycle(),
        settings.dpi,
    );
    (assembler, capabilities)
}

fn keep_if(engine: Option<Box<dyn OcrBackend>>, available: bool) -> Option<Box<dyn OcrBackend>> {
    engine.filter(|_| available)
}
