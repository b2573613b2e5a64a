//! Document Assembler: rasterize, preprocess and recognise every page in
//! order, then write the document text and archive the source.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::ocr::Rasterizer;
use crate::preprocess::Preprocessor;

use super::combiner::PageCombiner;
use super::document::Document;
use super::error::PipelineError;
use super::lifecycle::{Lifecycle, Workspace};
use super::paths::PageArtifacts;
use super::text::{DocumentText, PageTextBlock};

/// Where a document is in its run. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Pending,
    Rasterizing,
    Preprocessing { page: u32 },
    Recognizing { page: u32 },
    Assembling,
    Archived,
    Failed,
}

/// Outcome of a successfully processed document.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub name: String,
    pub pages: usize,
    /// Pages for which no engine produced text.
    pub empty_pages: usize,
    pub output_path: PathBuf,
    pub archived_path: PathBuf,
    pub elapsed_ms: u64,
}

pub struct DocumentAssembler {
    rasterizer: Box<dyn Rasterizer>,
    preprocessor: Preprocessor,
    combiner: PageCombiner,
    lifecycle: Lifecycle,
    dpi: u32,
}

impl DocumentAssembler {
    pub fn new(
        rasterizer: Box<dyn Rasterizer>,
        preprocessor: Preprocessor,
        combiner: PageCombiner,
        lifecycle: Lifecycle,
        dpi: u32,
    ) -> Self {
        Self {
            rasterizer,
            preprocessor,
            combiner,
            lifecycle,
            dpi,
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Process one pending document end to end.
    ///
    /// On error the source stays pending and the workspace is removed.
    pub fn process(&self, document: &Document) -> Result<ProcessedDocument, PipelineError> {
        let start = Instant::now();
        transition(document, DocumentState::Pending);

        if let Some(existing) = self.lifecycle.name_conflict(document)? {
            transition(document, DocumentState::Failed);
            return Err(PipelineError::NameConflict {
                name: document.name.clone(),
                existing: existing.file_name,
            });
        }

        let mut workspace = self.lifecycle.stage_in(document)?;
        let result = self.run(document, &workspace);

        if let Err(e) = workspace.cleanup() {
            warn!("{}: could not remove workspace: {}", document.name, e);
        }

        let (pages, empty_pages, output_path) = match result {
            Ok(done) => done,
            Err(e) => {
                transition(document, DocumentState::Failed);
                return Err(e);
            }
        };

        let archived_path = match self.lifecycle.archive(document) {
            Ok(path) => path,
            Err(e) => {
                transition(document, DocumentState::Failed);
                return Err(e);
            }
        };
        transition(document, DocumentState::Archived);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "Processed {} ({} pages, {} empty) in {:.1}s",
            document.file_name,
            pages,
            empty_pages,
            elapsed_ms as f64 / 1000.0
        );

        Ok(ProcessedDocument {
            name: document.name.clone(),
            pages,
            empty_pages,
            output_path,
            archived_path,
            elapsed_ms,
        })
    }

    /// Everything between staging and archival.
    fn run(
        &self,
        document: &Document,
        workspace: &Workspace,
    ) -> Result<(usize, usize, PathBuf), PipelineError> {
        transition(document, DocumentState::Rasterizing);
        let pages = self.rasterize(document, workspace)?;
        info!("{}: {} pages", document.name, pages.len());

        let mut text = DocumentText::new();
        for page in &pages {
            let block = self.process_page(document, page);
            if let Err(e) = page.remove_files() {
                warn!("{}: could not remove page {} files: {}", document.name, page.number, e);
            }
            if text.push_page(page.number, block).is_err() {
                warn!("{}: page {} out of order, dropped", document.name, page.number);
            }
        }

        transition(document, DocumentState::Assembling);
        let output_path = self.lifecycle.write_output(document, &text.render())?;
        Ok((text.page_count(), text.empty_pages(), output_path))
    }

    /// Rasterize into the workspace and rename pages to their canonical names.
    fn rasterize(
        &self,
        document: &Document,
        workspace: &Workspace,
    ) -> Result<Vec<PageArtifacts>, PipelineError> {
        let raw = self
            .rasterizer
            .rasterize(&document.path, workspace.dir(), self.dpi)
            .map_err(PipelineError::Rasterization)?;
        if raw.is_empty() {
            return Err(PipelineError::NoPages);
        }

        let mut pages = Vec::with_capacity(raw.len());
        for (index, raw_path) in raw.iter().enumerate() {
            let page = workspace.page(index as u32 + 1);
            fs::rename(raw_path, &page.page_image)?;
            pages.push(page);
        }
        Ok(pages)
    }

    /// Preprocess and recognise one page. Failures degrade to an empty block.
    fn process_page(&self, document: &Document, page: &PageArtifacts) -> PageTextBlock {
        transition(document, DocumentState::Preprocessing { page: page.number });
        let variants = match self.preprocessor.preprocess(page) {
            Ok(variants) => variants,
            Err(e) => {
                warn!("{}: page {} preprocessing failed: {}", document.name, page.number, e);
                return PageTextBlock::new();
            }
        };

        transition(document, DocumentState::Recognizing { page: page.number });
        let block = self.combiner.recognize_page(page, &variants);
        if block.is_empty() {
            warn!("{}: page {} produced no text", document.name, page.number);
        }
        block
    }
}

fn transition(document: &Document, state: DocumentState) {
    debug!("{}: {:?}", document.name, state);
}
