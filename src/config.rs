//! Configuration management for scanflow.
//!
//! Values are layered, highest precedence first: command-line flags,
//! `SCANFLOW_*` environment variables, the config file, built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ocr::OcrConfig;
use crate::pipeline::Lifecycle;

/// Basename searched for during config discovery.
const CONFIG_BASENAME: &str = "scanflow";

/// Extensions searched for during config discovery, in order.
const CONFIG_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

/// Prefix of every environment override.
const ENV_PREFIX: &str = "SCANFLOW_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Cannot create directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Engine selection in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Printed + handwriting engine run on the standard variant (`none` disables).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    /// Engine run in three modes on the handwriting variant (`none` disables).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handwriting: Option<String>,
    /// Python interpreter for the EasyOCR wrapper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    /// Path to the EasyOCR wrapper script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easyocr_script: Option<String>,
}

/// Configuration file structure. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory relative paths are resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    /// Rasterization resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
    /// Upper bound on any single external tool invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_timeout_secs: Option<u64>,
    /// OCR language code (e.g. `eng`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub engines: EngineConfig,

    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load from a specific file. Format is chosen by extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::parse(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_err(e.to_string())),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| parse_err(e.to_string())),
            _ => serde_json::from_str(contents).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Find a config file in the working directory, then the user config directory.
    pub fn discover() -> Option<PathBuf> {
        let mut dirs = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            dirs.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            dirs.push(config_dir.join(CONFIG_BASENAME));
        }
        dirs.iter().find_map(|dir| find_config_in(dir))
    }

    /// Directory of the file this config came from.
    pub fn source_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Apply file values onto `settings`, resolving paths against `base_dir`.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref dir) = self.pending_dir {
            settings.pending_dir = resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.archive_dir {
            settings.archive_dir = resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.output_dir {
            settings.output_dir = resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.scratch_dir {
            settings.scratch_dir = resolve_path(dir, base_dir);
        }
        if let Some(ref file) = self.log_file {
            settings.log_file = resolve_path(file, base_dir);
        }
        if let Some(dpi) = self.dpi {
            settings.dpi = dpi;
        }
        if let Some(secs) = self.poll_interval_secs {
            settings.poll_interval_secs = secs;
        }
        if let Some(secs) = self.engine_timeout_secs {
            settings.engine_timeout_secs = secs;
        }
        if let Some(ref language) = self.language {
            settings.language = language.clone();
        }
        if let Some(ref engine) = self.engines.primary {
            settings.primary_engine = engine.clone();
        }
        if let Some(ref engine) = self.engines.handwriting {
            settings.handwriting_engine = engine.clone();
        }
        if let Some(ref python) = self.engines.python {
            settings.python = python.clone();
        }
        if let Some(ref script) = self.engines.easyocr_script {
            settings.easyocr_script = resolve_path(script, base_dir);
        }
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_dir: PathBuf,
    /// Documents waiting to be processed.
    pub pending_dir: PathBuf,
    /// Source documents that were processed successfully.
    pub archive_dir: PathBuf,
    /// One `.txt` per processed document.
    pub output_dir: PathBuf,
    /// Per-document workspaces.
    pub scratch_dir: PathBuf,
    pub log_file: PathBuf,
    pub dpi: u32,
    pub poll_interval_secs: u64,
    pub engine_timeout_secs: u64,
    pub language: String,
    pub primary_engine: String,
    pub handwriting_engine: String,
    pub python: String,
    pub easyocr_script: PathBuf,
    /// Config file the settings were loaded from, if any.
    pub config_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_base_dir(PathBuf::from("."))
    }
}

impl Settings {
    /// Default layout under `base_dir`.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            pending_dir: base_dir.join("input_pdfs"),
            archive_dir: base_dir.join("used_pdfs"),
            output_dir: base_dir.join("output_texts"),
            scratch_dir: base_dir.join("temp"),
            log_file: base_dir.join("ocr_processing.log"),
            easyocr_script: base_dir.join("scripts").join("easyocr_wrapper.py"),
            base_dir,
            dpi: 300,
            poll_interval_secs: 30,
            engine_timeout_secs: 300,
            language: "eng".to_string(),
            primary_engine: "easyocr".to_string(),
            handwriting_engine: "tesseract".to_string(),
            python: "python3".to_string(),
            config_path: None,
        }
    }

    /// Apply `SCANFLOW_*` overrides. `lookup` maps a variable name to its value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, key)).filter(|v| !v.trim().is_empty())
        };
        let base_dir = self.base_dir.clone();
        let path = |key: &str| get(key).map(|v| resolve_path(&v, &base_dir));

        if let Some(dir) = path("PENDING_DIR") {
            self.pending_dir = dir;
        }
        if let Some(dir) = path("ARCHIVE_DIR") {
            self.archive_dir = dir;
        }
        if let Some(dir) = path("OUTPUT_DIR") {
            self.output_dir = dir;
        }
        if let Some(dir) = path("SCRATCH_DIR") {
            self.scratch_dir = dir;
        }
        if let Some(file) = path("LOG_FILE") {
            self.log_file = file;
        }
        if let Some(script) = path("EASYOCR_SCRIPT") {
            self.easyocr_script = script;
        }
        if let Some(dpi) = get("DPI") {
            self.dpi = parse_number("SCANFLOW_DPI", &dpi)?;
        }
        if let Some(secs) = get("POLL_INTERVAL") {
            self.poll_interval_secs = parse_number("SCANFLOW_POLL_INTERVAL", &secs)?;
        }
        if let Some(secs) = get("ENGINE_TIMEOUT") {
            self.engine_timeout_secs = parse_number("SCANFLOW_ENGINE_TIMEOUT", &secs)?;
        }
        if let Some(language) = get("LANGUAGE") {
            self.language = language;
        }
        if let Some(engine) = get("PRIMARY_ENGINE") {
            self.primary_engine = engine;
        }
        if let Some(engine) = get("HANDWRITING_ENGINE") {
            self.handwriting_engine = engine;
        }
        if let Some(python) = get("PYTHON") {
            self.python = python;
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dpi == 0 {
            return Err(ConfigError::Invalid("dpi must be greater than zero".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll interval must be at least one second".to_string(),
            ));
        }
        if self.engine_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "engine timeout must be at least one second".to_string(),
            ));
        }

        let dirs = self.directories();
        for (i, (name, dir)) in dirs.iter().enumerate() {
            for (other_name, other) in &dirs[i + 1..] {
                if dir == other {
                    return Err(ConfigError::Invalid(format!(
                        "{} and {} must be different directories ({})",
                        name,
                        other_name,
                        dir.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Create every working directory and the log file's parent.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        let mut dirs: Vec<&Path> = self.directories().iter().map(|(_, d)| *d).collect();
        if let Some(parent) = self.log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            dirs.push(parent);
        }
        for dir in dirs {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn ocr_config(&self) -> OcrConfig {
        OcrConfig {
            language: self.language.clone(),
            timeout: self.engine_timeout(),
            python: self.python.clone(),
            easyocr_script: self.easyocr_script.clone(),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::new(
            &self.pending_dir,
            &self.archive_dir,
            &self.output_dir,
            &self.scratch_dir,
        )
    }

    fn directories(&self) -> [(&'static str, &Path); 4] {
        [
            ("pending_dir", self.pending_dir.as_path()),
            ("archive_dir", self.archive_dir.as_path()),
            ("output_dir", self.output_dir.as_path()),
            ("scratch_dir", self.scratch_dir.as_path()),
        ]
    }
}

/// Options for loading settings, collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Base directory override (`--base-dir`).
    pub base_dir: Option<PathBuf>,
}

/// Load settings from every layer and validate them.
pub async fn load_settings(options: &LoadOptions) -> Result<Settings, ConfigError> {
    let config = match options.config_path.clone().or_else(Config::discover) {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            Config::load_from_path(&path).await?
        }
        None => Config::default(),
    };

    let settings = resolve_settings(&config, options, |key| std::env::var(key).ok())?;
    settings.validate()?;
    Ok(settings)
}

/// Combine config, environment and command-line layers.
pub fn resolve_settings<F>(
    config: &Config,
    options: &LoadOptions,
    lookup: F,
) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_dir = config.source_dir().unwrap_or_else(|| cwd.clone());

    let base_dir = match (&options.base_dir, &config.base_dir) {
        (Some(dir), _) => resolve_path(&dir.to_string_lossy(), &cwd),
        (None, Some(dir)) => resolve_path(dir, &config_dir),
        (None, None) => cwd,
    };

    let mut settings = Settings::with_base_dir(base_dir.clone());
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env(lookup)?;
    settings.config_path = config.source_path.clone();
    Ok(settings)
}

/// Expand `~` and resolve relative paths against `base_dir`.
pub fn resolve_path(path_str: &str, base_dir: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(path_str);
    let path = Path::new(expanded.as_ref());

    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn find_config_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", CONFIG_BASENAME, ext)))
        .find(|path| path.is_file())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} must be a number, got '{}'", key, value)))
}
