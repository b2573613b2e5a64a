//! End-to-end pipeline scenarios.
//!
//! Runs the real lifecycle, preprocessing and assembly code against a fake
//! rasterizer and scripted engines, so no external tools are needed.
//!
//! A fake "PDF" is a text file describing what rasterizing it yields:
//! `pages=N`, `garbage=N` (undecodable page images), `empty`, or `broken`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use image::{GrayImage, Luma};
use tempfile::TempDir;

use scanflow::ocr::{OcrBackend, OcrBackendType, OcrError, Rasterizer, RecognitionMode, RecognizerConfig};
use scanflow::pipeline::{
    shutdown_channel, BatchDriver, BatchSummary, Document, DocumentAssembler, Lifecycle, Monitor,
    PageCombiner, PipelineError,
};
use scanflow::preprocess::Preprocessor;

const PRIMARY_LABEL: &str = "EasyOCR (printed + handwriting)";

struct FakeRasterizer;

impl Rasterizer for FakeRasterizer {
    fn rasterize(&self, pdf: &Path, output_dir: &Path, _dpi: u32) -> Result<Vec<PathBuf>, OcrError> {
        let recipe = fs::read_to_string(pdf)?;
        let recipe = recipe.trim();
        if recipe == "broken" {
            return Err(OcrError::OcrFailed("pdftoppm exited with status 1".to_string()));
        }
        if recipe == "empty" {
            return Ok(Vec::new());
        }

        let (kind, count) = recipe.split_once('=').expect("fixture recipe");
        let count: u32 = count.parse().expect("page count");
        let mut pages = Vec::new();
        for n in 1..=count {
            let path = output_dir.join(format!("raw-{}.png", n));
            if kind == "garbage" {
                fs::write(&path, b"not an image")?;
            } else {
                page_image().save(&path).expect("write page image");
            }
            pages.push(path);
        }
        Ok(pages)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        String::new()
    }
}

fn page_image() -> GrayImage {
    GrayImage::from_fn(32, 16, |x, y| {
        if y == 8 && (4..28).contains(&x) {
            Luma([20])
        } else {
            Luma([230])
        }
    })
}

type Script = dyn Fn(&Path, &RecognizerConfig) -> Result<String, OcrError> + Send + Sync;

/// Engine whose answer depends on the image file name and recognizer.
struct ScriptedEngine {
    kind: OcrBackendType,
    script: Box<Script>,
}

impl ScriptedEngine {
    fn boxed(
        kind: OcrBackendType,
        script: impl Fn(&str, &RecognizerConfig) -> Result<String, OcrError> + Send + Sync + 'static,
    ) -> Option<Box<dyn OcrBackend>> {
        Some(Box::new(Self {
            kind,
            script: Box::new(move |image: &Path, recognizer: &RecognizerConfig| {
                script(&file_name(image), recognizer)
            }),
        }))
    }

    /// Script that also sees the workspace holding the image.
    fn boxed_with_dir(
        kind: OcrBackendType,
        script: impl Fn(&Path, &str) -> Result<String, OcrError> + Send + Sync + 'static,
    ) -> Option<Box<dyn OcrBackend>> {
        Some(Box::new(Self {
            kind,
            script: Box::new(move |image: &Path, _: &RecognizerConfig| {
                let dir = image.parent().expect("image in a workspace");
                script(dir, &file_name(image))
            }),
        }))
    }
}

impl OcrBackend for ScriptedEngine {
    fn backend_type(&self) -> OcrBackendType {
        self.kind
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        String::new()
    }

    fn run_ocr(
        &self,
        image_path: &Path,
        _output_prefix: &Path,
        recognizer: &RecognizerConfig,
    ) -> Result<String, OcrError> {
        assert!(image_path.exists(), "engine given missing image {:?}", image_path);
        (self.script)(image_path, recognizer)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

fn failing(_: &str, _: &RecognizerConfig) -> Result<String, OcrError> {
    Err(OcrError::Timeout {
        tool: "tesseract".to_string(),
        secs: 300,
    })
}

struct Fixture {
    _temp: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        for dir in ["pending", "archive", "output", "scratch"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        Self { _temp: temp, root }
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::new(
            self.root.join("pending"),
            self.root.join("archive"),
            self.root.join("output"),
            self.root.join("scratch"),
        )
    }

    fn add_pdf(&self, name: &str, recipe: &str) -> PathBuf {
        let path = self.root.join("pending").join(name);
        fs::write(&path, recipe).unwrap();
        path
    }

    fn assembler(
        &self,
        primary: Option<Box<dyn OcrBackend>>,
        handwriting: Option<Box<dyn OcrBackend>>,
    ) -> DocumentAssembler {
        DocumentAssembler::new(
            Box::new(FakeRasterizer),
            Preprocessor::new(None),
            PageCombiner::new(primary, handwriting),
            self.lifecycle(),
            300,
        )
    }

    fn document(&self, name: &str) -> Document {
        Document::from_path(&self.root.join("pending").join(name)).unwrap()
    }

    fn pending(&self) -> Vec<String> {
        names_in(&self.root.join("pending"))
    }

    fn archived(&self) -> Vec<String> {
        names_in(&self.root.join("archive"))
    }

    fn output(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.root.join("output").join(format!("{}.txt", name))).ok()
    }

    fn scratch_entries(&self) -> Vec<String> {
        names_in(&self.root.join("scratch"))
    }
}

fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn hello_on_page_one() -> Option<Box<dyn OcrBackend>> {
    ScriptedEngine::boxed(OcrBackendType::EasyOcr, |name, _| {
        if name.starts_with("report-page-0001") {
            Ok("Hello\n".to_string())
        } else {
            Ok(String::new())
        }
    })
}

#[test]
fn test_two_page_document_with_empty_second_page() {
    let fx = Fixture::new();
    fx.add_pdf("report.pdf", "pages=2");
    let handwriting = ScriptedEngine::boxed(OcrBackendType::Tesseract, failing);
    let driver = BatchDriver::new(fx.assembler(hello_on_page_one(), handwriting));

    let summary = driver.run_batch().unwrap();

    assert_eq!(
        summary,
        BatchSummary {
            seen: 1,
            succeeded: 1,
            failed: 0
        }
    );
    assert_eq!(
        fx.output("report").unwrap(),
        format!(
            "=== PAGE 1 ===\n--- {} ---\nHello\n\n=== PAGE 2 ===\n",
            PRIMARY_LABEL
        )
    );
    assert_eq!(fx.archived(), vec!["report.pdf"]);
    assert!(fx.pending().is_empty());
}

#[test]
fn test_page_headers_cover_every_page_in_order() {
    let fx = Fixture::new();
    fx.add_pdf("long.pdf", "pages=5");
    // only even pages yield anything, and only in word mode
    let handwriting = ScriptedEngine::boxed(OcrBackendType::Tesseract, |name, recognizer| {
        let even = name.contains("-page-0002") || name.contains("-page-0004");
        match recognizer.mode {
            RecognitionMode::Word if even => Ok("scrawl".to_string()),
            RecognitionMode::Block => Err(OcrError::OcrFailed("crashed".to_string())),
            _ => Ok(String::new()),
        }
    });
    let driver = BatchDriver::new(fx.assembler(None, handwriting));
    driver.run_batch().unwrap();

    let text = fx.output("long").unwrap();
    let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("=== PAGE")).collect();
    assert_eq!(
        headers,
        vec![
            "=== PAGE 1 ===",
            "=== PAGE 2 ===",
            "=== PAGE 3 ===",
            "=== PAGE 4 ===",
            "=== PAGE 5 ===",
        ]
    );
    assert_eq!(text.matches("--- Tesseract handwriting (word mode) ---").count(), 2);
    assert!(!text.contains("block mode"));
}

#[test]
fn test_all_segments_in_fixed_order() {
    let fx = Fixture::new();
    fx.add_pdf("mixed.pdf", "pages=1");
    let primary = ScriptedEngine::boxed(OcrBackendType::EasyOcr, |name, _| {
        assert!(name.ends_with("_standard.png"));
        Ok("printed".to_string())
    });
    let handwriting = ScriptedEngine::boxed(OcrBackendType::Tesseract, |name, recognizer| {
        assert!(name.ends_with("_handwriting.png"));
        Ok(recognizer.mode.slug().to_string())
    });
    BatchDriver::new(fx.assembler(primary, handwriting))
        .run_batch()
        .unwrap();

    assert_eq!(
        fx.output("mixed").unwrap(),
        format!(
            "=== PAGE 1 ===\n--- {} ---\nprinted\n\
             --- Tesseract handwriting (block mode) ---\nblock\n\
             --- Tesseract handwriting (word mode) ---\nword\n\
             --- Tesseract handwriting (character mode) ---\nchar\n",
            PRIMARY_LABEL
        )
    );
}

#[test]
fn test_failed_rasterization_isolated_in_batch() {
    let fx = Fixture::new();
    fx.add_pdf("doc1.pdf", "pages=1");
    fx.add_pdf("doc2.pdf", "broken");
    fx.add_pdf("doc3.pdf", "pages=2");
    let primary = ScriptedEngine::boxed(OcrBackendType::EasyOcr, |_, _| Ok("text".to_string()));
    let driver = BatchDriver::new(fx.assembler(primary, None));

    let summary = driver.run_batch().unwrap();

    assert_eq!(
        summary,
        BatchSummary {
            seen: 3,
            succeeded: 2,
            failed: 1
        }
    );
    assert_eq!(fx.archived(), vec!["doc1.pdf", "doc3.pdf"]);
    assert_eq!(fx.pending(), vec!["doc2.pdf"]);
    assert!(fx.output("doc1").is_some());
    assert!(fx.output("doc2").is_none());
    assert!(fx.output("doc3").is_some());
    assert!(fx.scratch_entries().is_empty());
}

#[test]
fn test_failed_document_retried_next_batch() {
    let fx = Fixture::new();
    let source = fx.add_pdf("flaky.pdf", "broken");
    let driver = BatchDriver::new(fx.assembler(None, None));

    let first = driver.run_batch().unwrap();
    assert_eq!(first.failed, 1);
    assert_eq!(fx.pending(), vec!["flaky.pdf"]);

    // the source becomes readable before the next poll
    fs::write(&source, "pages=1").unwrap();
    let second = driver.run_batch().unwrap();
    assert_eq!(second.seen, 1);
    assert_eq!(second.succeeded, 1);
    assert_eq!(fx.archived(), vec!["flaky.pdf"]);
    // no engines: headers only
    assert_eq!(fx.output("flaky").unwrap(), "=== PAGE 1 ===\n");
}

#[test]
fn test_second_batch_does_not_reprocess() {
    let fx = Fixture::new();
    fx.add_pdf("once.pdf", "pages=1");
    let primary = ScriptedEngine::boxed(OcrBackendType::EasyOcr, |_, _| Ok("first".to_string()));
    let driver = BatchDriver::new(fx.assembler(primary, None));

    driver.run_batch().unwrap();
    let output = fx.output("once").unwrap();

    let again = driver.run_batch().unwrap();
    assert_eq!(again, BatchSummary::default());
    assert_eq!(fx.output("once").unwrap(), output);
    assert_eq!(names_in(&fx.root.join("output")), vec!["once.txt"]);
    assert_eq!(fx.archived(), vec!["once.pdf"]);
}

#[test]
fn test_workspace_removed_after_success_and_failure() {
    let fx = Fixture::new();
    fx.add_pdf("good.pdf", "pages=3");
    fx.add_pdf("bad.pdf", "empty");
    let assembler = fx.assembler(hello_on_page_one(), None);

    let processed = assembler.process(&fx.document("good.pdf")).unwrap();
    assert_eq!(processed.pages, 3);
    assert!(fx.scratch_entries().is_empty());

    let err = assembler.process(&fx.document("bad.pdf")).unwrap_err();
    assert!(matches!(err, PipelineError::NoPages));
    assert!(fx.scratch_entries().is_empty());
    assert_eq!(fx.pending(), vec!["bad.pdf"]);
    assert!(fx.output("bad").is_none());
}

#[test]
fn test_undecodable_pages_degrade_to_empty_blocks() {
    let fx = Fixture::new();
    fx.add_pdf("smudged.pdf", "garbage=2");
    let primary = ScriptedEngine::boxed(OcrBackendType::EasyOcr, |_, _| Ok("never".to_string()));
    let assembler = fx.assembler(primary, None);

    let processed = assembler.process(&fx.document("smudged.pdf")).unwrap();
    assert_eq!(processed.empty_pages, 2);
    assert_eq!(
        fx.output("smudged").unwrap(),
        "=== PAGE 1 ===\n\n=== PAGE 2 ===\n"
    );
    assert_eq!(fx.archived(), vec!["smudged.pdf"]);
}

#[test]
fn test_output_write_failure_leaves_document_pending() {
    let fx = Fixture::new();
    fx.add_pdf("doc.pdf", "pages=1");
    // a regular file where the output directory should be
    let blocked = fx.root.join("blocked");
    fs::write(&blocked, b"").unwrap();
    let lifecycle = Lifecycle::new(
        fx.root.join("pending"),
        fx.root.join("archive"),
        blocked.join("out"),
        fx.root.join("scratch"),
    );
    let assembler = DocumentAssembler::new(
        Box::new(FakeRasterizer),
        Preprocessor::new(None),
        PageCombiner::new(None, None),
        lifecycle,
        300,
    );

    let err = assembler.process(&fx.document("doc.pdf")).unwrap_err();
    assert!(matches!(err, PipelineError::OutputWrite { .. }));
    assert_eq!(fx.pending(), vec!["doc.pdf"]);
    assert!(fx.archived().is_empty());
    assert!(fx.scratch_entries().is_empty());
}

#[test]
fn test_panicking_engine_does_not_abort_batch() {
    let fx = Fixture::new();
    fx.add_pdf("a.pdf", "pages=1");
    fx.add_pdf("b.pdf", "pages=1");
    let primary = ScriptedEngine::boxed(OcrBackendType::EasyOcr, |name, _| {
        if name.starts_with("a-") {
            panic!("engine wrapper bug");
        }
        Ok("fine".to_string())
    });
    let driver = BatchDriver::new(fx.assembler(primary, None));

    let summary = driver.run_batch().unwrap();
    assert_eq!(summary.seen, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(fx.pending(), vec!["a.pdf"]);
    assert!(fx.scratch_entries().is_empty());
}

#[test]
fn test_shutdown_stops_between_documents() {
    let fx = Fixture::new();
    fx.add_pdf("a.pdf", "pages=1");
    fx.add_pdf("b.pdf", "pages=1");
    let (handle, signal) = shutdown_channel();
    let driver = BatchDriver::new(fx.assembler(None, None)).with_shutdown(signal);

    handle.trigger();
    let summary = driver.run_batch().unwrap();
    assert_eq!(summary.seen, 0);
    assert_eq!(fx.pending(), vec!["a.pdf", "b.pdf"]);
}

#[test]
fn test_orphaned_scratch_swept_after_batch() {
    let fx = Fixture::new();
    let orphan = fx.root.join("scratch").join("crashed");
    fs::create_dir_all(&orphan).unwrap();
    fs::write(orphan.join("crashed-page-0001_standard.png"), b"png").unwrap();

    BatchDriver::new(fx.assembler(None, None))
        .run_batch()
        .unwrap();
    assert!(fx.scratch_entries().is_empty());
}

#[test]
fn test_non_pdf_files_ignored() {
    let fx = Fixture::new();
    fx.add_pdf("notes.txt", "pages=1");
    fx.add_pdf("scan.PDF", "pages=1");

    let summary = BatchDriver::new(fx.assembler(None, None))
        .run_batch()
        .unwrap();
    assert_eq!(summary.seen, 1);
    assert_eq!(fx.pending(), vec!["notes.txt"]);
    assert!(fx.output("scan").is_some());
}

#[test]
fn test_dot_named_pdfs_leave_layout_intact() {
    let fx = Fixture::new();
    fs::write(fx.root.join("archive").join("archived.pdf"), b"%PDF").unwrap();
    fs::write(fx.root.join("output").join("archived.txt"), b"done").unwrap();
    fx.add_pdf("...pdf", "pages=1");
    fx.add_pdf("..pdf", "pages=1");
    fx.add_pdf("real.pdf", "pages=1");

    let summary = BatchDriver::new(fx.assembler(None, None))
        .run_batch()
        .unwrap();

    assert_eq!(summary.seen, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(fx.archived(), vec!["archived.pdf", "real.pdf"]);
    assert_eq!(fx.output("archived").unwrap(), "done");
    assert_eq!(fx.pending(), vec!["...pdf", "..pdf"]);
    assert!(fx.root.join("scratch").is_dir());
}

#[test]
fn test_same_name_different_case_keeps_first_output() {
    let fx = Fixture::new();
    fx.add_pdf("a.PDF", "pages=1");
    fx.add_pdf("a.pdf", "pages=2");
    let driver = BatchDriver::new(fx.assembler(None, None));

    let summary = driver.run_batch().unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            seen: 2,
            succeeded: 1,
            failed: 1
        }
    );
    assert_eq!(fx.output("a").unwrap(), "=== PAGE 1 ===\n");
    assert_eq!(names_in(&fx.root.join("output")), vec!["a.txt"]);
    assert_eq!(fx.archived(), vec!["a.PDF"]);
    assert_eq!(fx.pending(), vec!["a.pdf"]);

    // still refused once the first one is archived
    let again = driver.run_batch().unwrap();
    assert_eq!(again.failed, 1);
    assert_eq!(fx.output("a").unwrap(), "=== PAGE 1 ===\n");
    let err = fx.assembler(None, None).process(&fx.document("a.pdf")).unwrap_err();
    assert!(matches!(err, PipelineError::NameConflict { .. }));
}

#[test]
fn test_earlier_pages_removed_before_next_page_is_read() {
    let fx = Fixture::new();
    fx.add_pdf("stack.pdf", "pages=4");
    let leftovers: Arc<Mutex<Vec<String>>> = Arc::default();
    let seen = leftovers.clone();
    let page_of = |file: &str| -> Option<u32> {
        file.strip_prefix("stack-page-")
            .and_then(|rest| rest.get(..4))
            .and_then(|digits| digits.parse().ok())
    };
    let primary = ScriptedEngine::boxed_with_dir(OcrBackendType::EasyOcr, move |dir, name| {
        let current = page_of(name).expect("canonical page name");
        for entry in fs::read_dir(dir).unwrap() {
            let file = entry.unwrap().file_name().to_string_lossy().into_owned();
            if page_of(&file).is_some_and(|page| page < current) {
                seen.lock().unwrap().push(format!("{} while reading page {}", file, current));
            }
        }
        Ok(String::new())
    });

    let processed = fx.assembler(primary, None).process(&fx.document("stack.pdf")).unwrap();
    assert_eq!(processed.pages, 4);
    assert!(leftovers.lock().unwrap().is_empty(), "{:?}", leftovers.lock().unwrap());
}

async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_monitor_picks_up_documents_until_stopped() {
    let fx = Fixture::new();
    fx.add_pdf("first.pdf", "pages=1");
    let (handle, signal) = shutdown_channel();
    let driver = Arc::new(BatchDriver::new(fx.assembler(None, None)).with_shutdown(signal.clone()));
    let monitor = tokio::spawn(Monitor::new(driver, Duration::from_millis(20), signal).run());

    wait_until("first.pdf archived", || fx.archived() == vec!["first.pdf"]).await;
    // arrives while the monitor is idle
    fx.add_pdf("second.pdf", "pages=1");
    wait_until("second.pdf archived", || fx.archived().len() == 2).await;

    handle.trigger();
    let report = tokio::time::timeout(Duration::from_secs(5), monitor)
        .await
        .unwrap()
        .unwrap();
    assert!(report.batches >= 2);
    assert_eq!(report.totals.succeeded, 2);
    assert_eq!(report.totals.failed, 0);
    assert!(fx.output("second").is_some());
}

#[tokio::test]
async fn test_monitor_sleeps_after_failures_and_stops_promptly() {
    let fx = Fixture::new();
    fx.add_pdf("stuck.pdf", "broken");
    let (handle, signal) = shutdown_channel();
    let driver = Arc::new(BatchDriver::new(fx.assembler(None, None)).with_shutdown(signal.clone()));
    let monitor = tokio::spawn(Monitor::new(driver, Duration::from_secs(3600), signal).run());

    tokio::time::sleep(Duration::from_millis(200)).await;
    let stopped_at = Instant::now();
    handle.trigger();
    let report = tokio::time::timeout(Duration::from_secs(5), monitor)
        .await
        .unwrap()
        .unwrap();

    assert!(stopped_at.elapsed() < Duration::from_secs(5));
    // one failing batch, then asleep until the trigger
    assert_eq!(report.batches, 1);
    assert_eq!(report.totals.failed, 1);
    assert_eq!(fx.pending(), vec!["stuck.pdf"]);
}
