//! Optional artifact removal (underlines, boxes, smudges, borders).

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::ocr::process::{run_tool, with_appended_extension};
use crate::ocr::tools::{check_binary, UNPAPER_NOT_FOUND};

use super::PreprocessError;

/// Erases scan artifacts from an image file in place.
pub trait ArtifactRemover: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// How to install the tool. Does not probe.
    fn availability_hint(&self) -> String;

    /// Clean `image` in place. On error the file is left as it was.
    fn clean(&self, image: &Path) -> Result<(), PreprocessError>;
}

/// Artifact remover backed by `unpaper`.
pub struct UnpaperRemover {
    binary: String,
    timeout: Duration,
}

impl UnpaperRemover {
    pub fn new(timeout: Duration) -> Self {
        Self {
            binary: "unpaper".to_string(),
            timeout,
        }
    }
}

impl ArtifactRemover for UnpaperRemover {
    fn name(&self) -> &str {
        "unpaper"
    }

    fn is_available(&self) -> bool {
        check_binary(&self.binary)
    }

    fn availability_hint(&self) -> String {
        UNPAPER_NOT_FOUND.to_string()
    }

    fn clean(&self, image: &Path) -> Result<(), PreprocessError> {
        let cleaned = with_appended_extension(image, "unpaper.png");
        let mut cmd = Command::new(&self.binary);
        cmd.args(["--overwrite", "-q"]).arg(image).arg(&cleaned);

        let result = run_tool(&mut cmd, "unpaper", self.timeout)
            .and_then(|output| output.check("unpaper"))
            .map_err(|e| PreprocessError::ArtifactRemoval(e.to_string()));
        if let Err(e) = result {
            let _ = fs::remove_file(&cleaned);
            return Err(e);
        }
        if !cleaned.is_file() {
            return Err(PreprocessError::ArtifactRemoval(
                "unpaper produced no output".to_string(),
            ));
        }
        fs::rename(&cleaned, image)?;
        Ok(())
    }
}
