//! Pipeline tests: cancellation on first failure, single-writer store errors, end-to-end build.

use imgen::build::{describe_sources, register_sources};
use imgen::engine::db_ops::{
    open_store_in_memory, open_store_read_only, source_image_count, variant_count, variants_for,
};
use imgen::pipeline::{CancelToken, GeneratorInput, PipelineConfig, execute_pipeline};
use imgen::transform::{ImageHandle, ImageProcessor, ImageRsProcessor, JobContext};
use imgen::utils::{Breakpoints, parse_manifest};
use imgen::{
    JobFailure, OutputFormat, Opts, PipelineError, SourceImage, TransformError, build_variants,
    check_dir, lookup_variant,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

// --- instrumented processor ---

/// Counts decodes, fails the `fail_on`-th one (1-based, 0 = never) after `delay`.
struct MockProcessor {
    cancel: CancelToken,
    fail_on: usize,
    delay: Duration,
    started: AtomicUsize,
    started_after_cancel: AtomicUsize,
}

impl MockProcessor {
    fn new(cancel: &CancelToken, fail_on: usize, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            cancel: cancel.clone(),
            fail_on,
            delay,
            started: AtomicUsize::new(0),
            started_after_cancel: AtomicUsize::new(0),
        })
    }
}

struct MockHandle {
    seq: usize,
    fail: bool,
    delay: Duration,
    format: Option<OutputFormat>,
}

impl ImageProcessor for MockProcessor {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn best_formats(&self) -> Vec<OutputFormat> {
        vec![OutputFormat::Jpeg]
    }

    fn decode(&self, _bytes: &[u8]) -> Result<Box<dyn ImageHandle>, TransformError> {
        if self.cancel.is_cancelled() {
            self.started_after_cancel.fetch_add(1, Ordering::SeqCst);
        }
        let seq = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockHandle {
            seq,
            fail: seq == self.fail_on,
            delay: self.delay,
            format: None,
        }))
    }
}

impl ImageHandle for MockHandle {
    fn strip_metadata(&mut self) -> Result<(), TransformError> {
        Ok(())
    }

    fn set_format(&mut self, format: OutputFormat) -> Result<(), TransformError> {
        self.format = Some(format);
        Ok(())
    }

    fn resize(&mut self, _ctx: &JobContext, _w: u32, _h: u32) -> Result<(), TransformError> {
        Ok(())
    }

    fn encoded_bytes(&mut self) -> Result<Vec<u8>, TransformError> {
        thread::sleep(self.delay);
        let format = self.format.ok_or(TransformError::FormatNotSet)?;
        if self.fail {
            return Err(TransformError::Encode {
                format,
                message: "boom".to_string(),
            });
        }
        Ok(format!("encoded #{}", self.seq).into_bytes())
    }

    fn dominant_color(&self) -> Result<String, TransformError> {
        Ok("#000000".to_string())
    }

    fn dimensions(&self) -> (u32, u32) {
        (10, 10)
    }
}

/// `count` fake source files in `dir`, plus their store rows.
fn fake_sources(dir: &Path, count: usize) -> (Vec<String>, Vec<SourceImage>) {
    let names: Vec<String> = (0..count).map(|i| format!("img{i:02}.jpg")).collect();
    for n in &names {
        std::fs::write(dir.join(n), b"not really a jpeg").unwrap();
    }
    let rows = names
        .iter()
        .map(|n| SourceImage {
            name: n.clone(),
            capture_date: String::new(),
            location: String::new(),
            dominant_color: "#000000".to_string(),
        })
        .collect();
    (names, rows)
}

fn input(sources: Vec<String>, in_dir: &Path, out_dir: &Path, widths: Vec<u32>) -> GeneratorInput {
    GeneratorInput {
        sources,
        in_dir: in_dir.to_path_buf(),
        out_dir: out_dir.to_path_buf(),
        formats: vec![OutputFormat::Jpeg],
        breakpoints: Breakpoints {
            heights: vec![],
            widths,
        },
    }
}

fn config(workers: usize) -> PipelineConfig {
    PipelineConfig {
        workers,
        resize_timeout: None,
    }
}

// --- cancellation ---

#[test]
fn test_first_failure_cancels_remaining_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let (names, rows) = fake_sources(dir.path(), 10);
    let conn = open_store_in_memory().unwrap();
    register_sources(&conn, &rows).unwrap();

    let workers = 2;
    let cancel = CancelToken::new();
    let mock = MockProcessor::new(&cancel, 1, Duration::from_millis(20));
    let input = input(names, dir.path(), dir.path(), vec![10, 20, 30, 40]);
    let total = input.total_jobs();
    assert_eq!(total, 50);

    let result = execute_pipeline(input, mock.clone(), config(workers), &conn, cancel.clone(), None);

    match result {
        Err(PipelineError::Job(err)) => {
            assert!(
                matches!(
                    err.failure,
                    JobFailure::Transform(TransformError::Encode { .. })
                ),
                "got {err}"
            );
        }
        other => panic!("expected the failing job, got {other:?}"),
    }
    assert!(cancel.is_cancelled());
    let started = mock.started.load(Ordering::SeqCst);
    assert!(started < total, "started {started} of {total}");
    // A worker may be between its cancellation check and decode when the flag flips.
    assert!(mock.started_after_cancel.load(Ordering::SeqCst) <= workers - 1);
}

#[test]
fn test_all_jobs_succeed_and_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let (names, rows) = fake_sources(dir.path(), 3);
    let conn = open_store_in_memory().unwrap();
    register_sources(&conn, &rows).unwrap();

    let cancel = CancelToken::new();
    let mock = MockProcessor::new(&cancel, 0, Duration::ZERO);
    let input = input(names, dir.path(), dir.path(), vec![10, 20]);
    let total = input.total_jobs();

    let stored = AtomicUsize::new(0);
    let on_stored = |n: usize| {
        stored.fetch_add(n, Ordering::SeqCst);
    };
    let written = execute_pipeline(
        input,
        mock.clone(),
        config(4),
        &conn,
        cancel.clone(),
        Some(&on_stored),
    )
    .unwrap();

    assert_eq!(written, total);
    assert_eq!(stored.load(Ordering::SeqCst), total);
    assert_eq!(variant_count(&conn).unwrap(), total);
    assert_eq!(mock.started.load(Ordering::SeqCst), total);
    assert!(!cancel.is_cancelled());
}

#[test]
fn test_precancelled_run_reports_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let (names, rows) = fake_sources(dir.path(), 2);
    let conn = open_store_in_memory().unwrap();
    register_sources(&conn, &rows).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let mock = MockProcessor::new(&cancel, 0, Duration::ZERO);
    let result = execute_pipeline(
        input(names, dir.path(), dir.path(), vec![10]),
        mock.clone(),
        config(2),
        &conn,
        cancel,
        None,
    );
    assert!(matches!(result, Err(PipelineError::Cancelled)), "{result:?}");
    assert_eq!(mock.started.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_before_registration_skips_decoding() {
    let dir = tempfile::tempdir().unwrap();
    let (names, _) = fake_sources(dir.path(), 4);
    let json = names
        .iter()
        .map(|n| format!(r#""{n}": {{"date": "", "location": ""}}"#))
        .collect::<Vec<_>>()
        .join(",");
    let manifest = parse_manifest(&format!("{{{json}}}"), Path::new("m")).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let mock = MockProcessor::new(&cancel, 0, Duration::ZERO);
    let result = describe_sources(dir.path(), &manifest, mock.as_ref(), &cancel);
    assert!(matches!(result, Err(PipelineError::Cancelled)), "{result:?}");
    assert_eq!(mock.started.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unreadable_source_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_store_in_memory().unwrap();
    let cancel = CancelToken::new();
    let mock = MockProcessor::new(&cancel, 0, Duration::ZERO);
    let result = execute_pipeline(
        input(vec!["missing.jpg".to_string()], dir.path(), dir.path(), vec![10]),
        mock.clone(),
        config(2),
        &conn,
        cancel,
        None,
    );
    assert!(
        matches!(result, Err(PipelineError::SourceRead { .. })),
        "{result:?}"
    );
    assert_eq!(mock.started.load(Ordering::SeqCst), 0);
}

#[test]
fn test_store_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    // Files exist but no source rows: the first insert violates the foreign key.
    let (names, _rows) = fake_sources(dir.path(), 4);
    let conn = open_store_in_memory().unwrap();
    let cancel = CancelToken::new();
    let mock = MockProcessor::new(&cancel, 0, Duration::from_millis(5));
    let result = execute_pipeline(
        input(names, dir.path(), dir.path(), vec![10, 20, 30]),
        mock,
        config(2),
        &conn,
        cancel.clone(),
        None,
    );
    match result {
        Err(PipelineError::Job(err)) => assert!(matches!(err.failure, JobFailure::Store(_))),
        other => panic!("expected store failure, got {other:?}"),
    }
    assert!(cancel.is_cancelled());
    assert_eq!(variant_count(&conn).unwrap(), 0);
}

// --- job context ---

#[test]
fn test_job_context_deadline_and_cancel() {
    let (_tx, rx) = crossbeam_channel::bounded::<()>(1);

    let ctx = JobContext::with_timeout(CancelToken::new(), Some(Duration::from_millis(30)));
    assert!(matches!(
        ctx.wait_for(&rx),
        Err(TransformError::DeadlineExceeded(_))
    ));

    let cancel = CancelToken::new();
    let ctx = JobContext::with_timeout(cancel.clone(), None);
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();
    });
    assert!(matches!(ctx.wait_for(&rx), Err(TransformError::Cancelled)));
    canceller.join().unwrap();
}

// --- end to end ---

fn write_fixture(root: &Path, manifest: &str, breakpoints: &str) -> Opts {
    let in_dir = root.join("img-src");
    std::fs::create_dir_all(&in_dir).unwrap();
    image::RgbImage::from_fn(200, 100, |x, y| {
        image::Rgb([(x % 256) as u8, (y * 2 % 256) as u8, 128])
    })
    .save(in_dir.join("a.jpg"))
    .unwrap();
    std::fs::write(in_dir.join("metadata.json"), manifest).unwrap();
    let bp = root.join("breakpoints.json");
    std::fs::write(&bp, breakpoints).unwrap();

    Opts {
        in_dir,
        out_dir: root.join("img-out"),
        breakpoints_path: bp,
        workers: Some(2),
        ..Opts::default()
    }
}

#[test]
fn test_end_to_end_build() {
    let dir = tempfile::tempdir().unwrap();
    let opts = write_fixture(
        dir.path(),
        r#"{"a.jpg": {"date": "2020-01", "location": "X"}}"#,
        r#"{"widths": [100], "heights": []}"#,
    );

    let summary = build_variants(&opts, &CancelToken::new()).unwrap();
    assert_eq!(summary.sources, 1);
    assert_eq!(summary.jobs_planned, 4);
    assert_eq!(summary.variants_written, 4);

    let conn = open_store_read_only(&opts.db_path()).unwrap();
    assert_eq!(source_image_count(&conn).unwrap(), 1);
    let rows = variants_for(&conn, "a.jpg").unwrap();
    assert_eq!(rows.len(), 4);

    let targets: HashSet<(String, Option<u32>, Option<u32>)> = rows
        .iter()
        .map(|v| (v.format.clone(), v.width, v.height))
        .collect();
    let expected: HashSet<(String, Option<u32>, Option<u32>)> = [
        ("jpg".to_string(), None, None),
        ("jpg".to_string(), Some(100), None),
        ("webp".to_string(), None, None),
        ("webp".to_string(), Some(100), None),
    ]
    .into_iter()
    .collect();
    assert_eq!(targets, expected);

    let filenames: HashSet<&String> = rows.iter().map(|v| &v.filename).collect();
    assert_eq!(filenames.len(), 4);
    for v in &rows {
        let path = opts.out_dir.join(&v.filename);
        assert!(path.is_file(), "{} missing", path.display());
        let (w, h) = image::image_dimensions(&path).unwrap();
        match v.width {
            Some(100) => assert_eq!((w, h), (100, 50)),
            _ => assert_eq!((w, h), (200, 100)),
        }
    }

    let m = lookup_variant(&opts.db_path(), Some("a.jpg"), Some(100), None, OutputFormat::Webp)
        .unwrap();
    assert!(m.filename.starts_with("a_w100_webp_"));
    assert_eq!(m.capture_date, "2020-01");
    assert_eq!(m.location, "X");
    assert!(m.dominant_color.starts_with('#') && m.dominant_color.len() == 7);
}

#[test]
fn test_repeated_breakpoints_build_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = write_fixture(
        dir.path(),
        r#"{"a.jpg": {"date": "2020-01", "location": "X"}}"#,
        r#"{"widths": [100, 100], "heights": []}"#,
    );
    opts.formats = vec![OutputFormat::Jpeg];

    let summary = build_variants(&opts, &CancelToken::new()).unwrap();
    assert_eq!(summary.jobs_planned, 2);
    assert_eq!(summary.variants_written, 2);
    let conn = open_store_read_only(&opts.db_path()).unwrap();
    assert_eq!(variant_count(&conn).unwrap(), 2);
}

#[test]
fn test_image_rs_handle_reports_resized_dimensions() {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(200, 100))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .unwrap();

    let processor = ImageRsProcessor::new();
    let mut handle = processor.decode(&bytes).unwrap();
    assert_eq!(handle.dimensions(), (200, 100));

    let ctx = JobContext::with_timeout(CancelToken::new(), None);
    handle.resize(&ctx, 400, 0).unwrap();
    assert_eq!(handle.dimensions(), (200, 100));
    handle.resize(&ctx, 0, 40).unwrap();
    assert_eq!(handle.dimensions(), (80, 40));
}

#[test]
fn test_manifest_main_color_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = write_fixture(
        dir.path(),
        r##"{"a.jpg": {"date": "d", "location": "l", "main_color": "#ABCDEF"}}"##,
        r#"{"widths": [], "heights": [50]}"#,
    );
    opts.formats = vec![OutputFormat::Jpeg];

    let summary = build_variants(&opts, &CancelToken::new()).unwrap();
    assert_eq!(summary.variants_written, 2);

    let m = lookup_variant(&opts.db_path(), None, None, Some(50), OutputFormat::Jpeg).unwrap();
    assert_eq!(m.dominant_color, "#ABCDEF");
    assert!(m.filename.starts_with("a_h50_jpg_"));
}

#[test]
fn test_rebuild_starts_from_a_fresh_store() {
    let dir = tempfile::tempdir().unwrap();
    let opts = write_fixture(
        dir.path(),
        r#"{"a.jpg": {"date": "2020-01", "location": "X"}}"#,
        r#"{"widths": [100], "heights": []}"#,
    );
    build_variants(&opts, &CancelToken::new()).unwrap();
    let summary = build_variants(&opts, &CancelToken::new()).unwrap();
    assert_eq!(summary.variants_written, 4);
    let conn = open_store_read_only(&opts.db_path()).unwrap();
    assert_eq!(variant_count(&conn).unwrap(), 4);
}

#[test]
fn test_missing_manifest_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let opts = Opts {
        in_dir: dir.path().to_path_buf(),
        out_dir: dir.path().join("out"),
        ..Opts::default()
    };
    let err = build_variants(&opts, &CancelToken::new()).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)), "{err:?}");
}

// --- check ---

#[test]
fn test_check_dir_reports_unlisted_and_missing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("metadata.json"),
        r#"{"a.jpg": {"date": "", "location": ""}, "b.jpg": {"date": "", "location": ""}}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub").join("c.png"), b"x").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

    let report = check_dir(dir.path()).unwrap();
    assert_eq!(report.unlisted, vec!["sub/c.png"]);
    assert_eq!(report.missing, vec!["b.jpg"]);
    assert!(!report.is_consistent());
}
