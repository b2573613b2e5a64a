//! Moves documents between pending, in-progress, archived and output.
//!
//! The source file is never touched until its text has been written, so a
//! document that fails anywhere before that simply stays pending and is
//! picked up again by the next batch.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::document::{is_pdf, is_safe_name, Document};
use super::error::PipelineError;
use super::paths::PageArtifacts;

/// Suffix of the temporary file the output is written to before renaming.
const PARTIAL_SUFFIX: &str = ".partial";

/// Directory layout a pipeline run works against.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    pending: PathBuf,
    archive: PathBuf,
    output: PathBuf,
    scratch: PathBuf,
}

impl Lifecycle {
    pub fn new(
        pending: impl Into<PathBuf>,
        archive: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        scratch: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pending: pending.into(),
            archive: archive.into(),
            output: output.into(),
            scratch: scratch.into(),
        }
    }

    pub fn pending_dir(&self) -> &Path {
        &self.pending
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch
    }

    /// Snapshot of pending documents, sorted by file name.
    pub fn pending_documents(&self) -> io::Result<Vec<Document>> {
        list_pdfs(&self.pending)
    }

    pub fn archived_documents(&self) -> io::Result<Vec<Document>> {
        list_pdfs(&self.archive)
    }

    /// Number of finished `.txt` outputs.
    pub fn output_count(&self) -> io::Result<usize> {
        let entries = match fs::read_dir(&self.output) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut count = 0;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "txt") {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Another document whose output would land on `document`'s name.
    ///
    /// Archived documents always win; among pending ones the first by file
    /// name does. A conflicting document stays pending until renamed.
    pub fn name_conflict(&self, document: &Document) -> io::Result<Option<Document>> {
        let clashes = |other: &Document| {
            other.name == document.name && other.file_name != document.file_name
        };
        if let Some(other) = list_pdfs(&self.archive)?.into_iter().find(|d| clashes(d)) {
            return Ok(Some(other));
        }
        Ok(list_pdfs(&self.pending)?
            .into_iter()
            .take_while(|d| d.file_name < document.file_name)
            .find(|d| clashes(d)))
    }

    /// Create a fresh workspace for `document`. The source file is not touched.
    pub fn stage_in(&self, document: &Document) -> Result<Workspace, PipelineError> {
        let dir = self.scratch.join(&document.name);
        let workspace_err = |source| PipelineError::Workspace {
            path: dir.clone(),
            source,
        };

        // never let a workspace resolve outside the scratch directory
        if !is_safe_name(&document.name) || dir.parent() != Some(self.scratch.as_path()) {
            return Err(workspace_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unusable document name '{}'", document.name),
            )));
        }

        if dir.exists() {
            debug!("Removing stale workspace {}", dir.display());
            fs::remove_dir_all(&dir).map_err(workspace_err)?;
        }
        fs::create_dir_all(&dir).map_err(workspace_err)?;

        Ok(Workspace {
            dir,
            document_name: document.name.clone(),
            cleaned: false,
        })
    }

    pub fn output_path(&self, document: &Document) -> PathBuf {
        self.output.join(format!("{}.txt", document.name))
    }

    /// Write the document text. Readers never observe a partially written file.
    pub fn write_output(&self, document: &Document, text: &str) -> Result<PathBuf, PipelineError> {
        let path = self.output_path(document);
        let partial = self
            .output
            .join(format!("{}.txt{}", document.name, PARTIAL_SUFFIX));
        let output_err = |source| PipelineError::OutputWrite {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.output).map_err(output_err)?;
        if let Err(e) = fs::write(&partial, text).and_then(|()| fs::rename(&partial, &path)) {
            let _ = fs::remove_file(&partial);
            return Err(output_err(e));
        }
        Ok(path)
    }

    /// Move the source file into the archive directory.
    pub fn archive(&self, document: &Document) -> Result<PathBuf, PipelineError> {
        let target = self.archive.join(&document.file_name);
        let archive_err = |source| PipelineError::Archive {
            path: document.path.clone(),
            source,
        };

        fs::create_dir_all(&self.archive).map_err(archive_err)?;
        if fs::rename(&document.path, &target).is_err() {
            // rename fails across filesystems
            fs::copy(&document.path, &target).map_err(archive_err)?;
            fs::remove_file(&document.path).map_err(archive_err)?;
        }
        Ok(target)
    }

    /// Remove everything left in the scratch directory.
    ///
    /// Catches leftovers from runs that were killed mid-document.
    pub fn sweep_scratch(&self) -> io::Result<usize> {
        let entries = match fs::read_dir(&self.scratch) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let result = if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }
}

/// Scratch directory owned by one document run.
///
/// Removed by [`Workspace::cleanup`] or, failing that, when dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    document_name: String,
    cleaned: bool,
}

impl Workspace {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact paths for page `number` of this workspace's document.
    pub fn page(&self, number: u32) -> PageArtifacts {
        PageArtifacts::new(&self.dir, &self.document_name, number)
    }

    /// Remove the workspace directory. Safe to call more than once.
    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.cleaned {
            return Ok(());
        }
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        self.cleaned = true;
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Could not clean workspace {}: {}", self.dir.display(), e);
        }
    }
}

fn list_pdfs(dir: &Path) -> io::Result<Vec<Document>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut documents = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_pdf(&path) {
            match Document::from_path(&path) {
                Some(document) => documents.push(document),
                None => warn!("Skipping {}: file name cannot be used as a document name", path.display()),
            }
        }
    }
    documents.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(documents)
}
