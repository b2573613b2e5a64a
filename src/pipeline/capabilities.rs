//! One-time probe of the external tools a run depends on.
//!
//! Components never re-probe per image: the result is consulted once when
//! the pipeline is wired, and missing optional tools are simply left out.

use serde::Serialize;
use tracing::{info, warn};

use crate::ocr::{OcrBackend, Rasterizer};
use crate::preprocess::ArtifactRemover;

/// Availability of one external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    /// What the tool is used for.
    pub role: &'static str,
    pub name: String,
    pub available: bool,
    /// Install hint, shown when the tool is missing.
    pub hint: String,
    /// Whether processing can proceed without it.
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub rasterizer: ToolStatus,
    pub artifact_remover: ToolStatus,
    /// `None` when the slot is disabled in configuration.
    pub primary_engine: Option<ToolStatus>,
    pub handwriting_engine: Option<ToolStatus>,
}

impl Capabilities {
    pub fn probe(
        rasterizer: &dyn Rasterizer,
        remover: &dyn ArtifactRemover,
        primary: Option<&dyn OcrBackend>,
        handwriting: Option<&dyn OcrBackend>,
    ) -> Self {
        Self {
            rasterizer: ToolStatus {
                role: "rasterizer",
                name: "pdftoppm".to_string(),
                available: rasterizer.is_available(),
                hint: rasterizer.availability_hint(),
                optional: false,
            },
            artifact_remover: ToolStatus {
                role: "artifact remover",
                name: remover.name().to_string(),
                available: remover.is_available(),
                hint: remover.availability_hint(),
                optional: true,
            },
            primary_engine: primary.map(|b| engine_status("primary engine", b)),
            handwriting_engine: handwriting.map(|b| engine_status("handwriting engine", b)),
        }
    }

    pub fn has_artifact_removal(&self) -> bool {
        self.artifact_remover.available
    }

    pub fn has_primary_engine(&self) -> bool {
        self.primary_engine.as_ref().is_some_and(|s| s.available)
    }

    pub fn has_handwriting_engine(&self) -> bool {
        self.handwriting_engine.as_ref().is_some_and(|s| s.available)
    }

    /// Every probed tool, disabled slots excluded.
    pub fn tools(&self) -> Vec<&ToolStatus> {
        let mut tools = vec![&self.rasterizer, &self.artifact_remover];
        tools.extend(self.primary_engine.as_ref());
        tools.extend(self.handwriting_engine.as_ref());
        tools
    }

    /// Log one line per tool; missing tools are warnings.
    pub fn log_summary(&self) {
        for tool in self.tools() {
            if tool.available {
                info!("{} ({}): available", tool.role, tool.name);
            } else if tool.optional {
                warn!("{} ({}) unavailable, continuing without it: {}", tool.role, tool.name, tool.hint);
            } else {
                warn!("{} ({}) unavailable: {}", tool.role, tool.name, tool.hint);
            }
        }
        if !self.has_primary_engine() && !self.has_handwriting_engine() {
            warn!("No OCR engine available; every page will be empty");
        }
    }
}

fn engine_status(role: &'static str, backend: &dyn OcrBackend) -> ToolStatus {
    ToolStatus {
        role,
        name: backend.backend_type().to_string(),
        available: backend.is_available(),
        hint: backend.availability_hint(),
        optional: true,
    }
}
