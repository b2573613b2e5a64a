//! EasyOCR backend implementation.
//!
//! EasyOCR recognises printed and handwritten text in one pass. It runs
//! through a small Python wrapper invoked as
//! `<python> <wrapper> <input_image> <output_file> --langs <codes>`; the
//! wrapper writes a self-describing report to the output file and exits
//! non-zero on error.

use std::path::Path;
use std::process::Command;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, RecognizerConfig};
use super::process::{run_tool, take_output_file, with_appended_extension};
use super::tools::check_binary;

/// EasyOCR backend.
pub struct EasyOcrBackend {
    config: OcrConfig,
}

impl EasyOcrBackend {
    /// Create a new EasyOCR backend with default configuration.
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    /// Create a new EasyOCR backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    fn command(&self, image_path: &Path, output_file: &Path) -> Command {
        let mut cmd = Command::new(&self.config.python);
        cmd.arg(&self.config.easyocr_script)
            .arg(image_path)
            .arg(output_file)
            .arg("--langs")
            .arg(easyocr_languages(&self.config.language));
        cmd
    }
}

/// Tesseract language codes and their EasyOCR equivalents.
const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("eng", "en"),
    ("spa", "es"),
    ("fra", "fr"),
    ("deu", "de"),
    ("ita", "it"),
    ("por", "pt"),
    ("nld", "nl"),
    ("pol", "pl"),
    ("ces", "cs"),
    ("ron", "ro"),
    ("hun", "hu"),
    ("swe", "sv"),
    ("dan", "da"),
    ("nor", "no"),
    ("fin", "fi"),
    ("tur", "tr"),
    ("rus", "ru"),
    ("ukr", "uk"),
    ("ara", "ar"),
    ("hin", "hi"),
    ("vie", "vi"),
    ("tha", "th"),
    ("jpn", "ja"),
    ("kor", "ko"),
    ("chi_sim", "ch_sim"),
    ("chi_tra", "ch_tra"),
];

/// Convert a Tesseract-style language string (`eng+spa`) into EasyOCR's
/// comma-separated list (`en,es`). Unknown codes pass through unchanged.
pub fn easyocr_languages(language: &str) -> String {
    let mut codes: Vec<&str> = Vec::new();
    for part in language.split('+').map(str::trim).filter(|p| !p.is_empty()) {
        let code = LANGUAGE_CODES
            .iter()
            .find(|(tess, _)| *tess == part)
            .map_or(part, |(_, easy)| *easy);
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    if codes.is_empty() {
        "en".to_string()
    } else {
        codes.join(",")
    }
}

impl Default for EasyOcrBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for EasyOcrBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::EasyOcr
    }

    fn is_available(&self) -> bool {
        check_binary(&self.config.python) && self.config.easyocr_script.is_file()
    }

    fn availability_hint(&self) -> String {
        format!(
            "Needs {} with EasyOCR (pip install easyocr) and the wrapper script at {}",
            self.config.python,
            self.config.easyocr_script.display()
        )
    }

    fn run_ocr(
        &self,
        image_path: &Path,
        output_prefix: &Path,
        _recognizer: &RecognizerConfig,
    ) -> Result<String, OcrError> {
        let output_file = with_appended_extension(output_prefix, "txt");
        let mut cmd = self.command(image_path, &output_file);
        let result = run_tool(&mut cmd, "easyocr", self.config.timeout)
            .and_then(|output| output.check("easyocr"));
        if let Err(e) = result {
            // the wrapper leaves an error report behind when it fails
            let _ = std::fs::remove_file(&output_file);
            return Err(e);
        }
        take_output_file(&output_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_command_shape() {
        let backend = EasyOcrBackend::with_config(OcrConfig {
            python: "python3".to_string(),
            easyocr_script: PathBuf::from("scripts/easyocr_wrapper.py"),
            ..OcrConfig::default()
        });
        let cmd = backend.command(Path::new("page_standard.png"), Path::new("out.auto.txt"));
        assert_eq!(cmd.get_program(), "python3");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(
            args,
            [
                "scripts/easyocr_wrapper.py",
                "page_standard.png",
                "out.auto.txt",
                "--langs",
                "en"
            ]
        );
    }

    #[test]
    fn test_configured_language_reaches_wrapper() {
        let backend = EasyOcrBackend::with_config(OcrConfig {
            language: "spa+eng".to_string(),
            ..OcrConfig::default()
        });
        let cmd = backend.command(Path::new("p.png"), Path::new("o.txt"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[args.len() - 2..], ["--langs", "es,en"]);
    }

    #[test]
    fn test_language_mapping() {
        assert_eq!(easyocr_languages("eng"), "en");
        assert_eq!(easyocr_languages("chi_sim+eng+eng"), "ch_sim,en");
        assert_eq!(easyocr_languages("xx"), "xx");
        assert_eq!(easyocr_languages(""), "en");
    }

    #[test]
    fn test_missing_script_is_unavailable() {
        let backend = EasyOcrBackend::with_config(OcrConfig {
            easyocr_script: PathBuf::from("/nonexistent/easyocr_wrapper.py"),
            ..OcrConfig::default()
        });
        assert!(!backend.is_available());
    }

    #[test]
    fn test_label() {
        let backend = EasyOcrBackend::new();
        assert_eq!(
            backend.label(&RecognizerConfig::AUTO),
            "EasyOCR (printed + handwriting)"
        );
    }
}
