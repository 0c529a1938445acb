// tests/scan_tests.rs
use image::{GrayImage, Luma, RgbaImage};
use kappa_core::{Catalog, ProgressStore};
use kappa_cv::detection::{ScanOutcome, ScanPhase, ScanReport, Scanner};
use kappa_cv::template::{TemplateConfig, TemplateLoader, TemplateMatcher, TemplateStore};
use kappa_cv::{FrameAcquirer, WindowSystem};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

fn noise(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let mut h = x
            .wrapping_mul(0x9E37_79B1)
            .wrapping_add(y.wrapping_mul(0x85EB_CA77))
            .wrapping_add(seed.wrapping_mul(0xC2B2_AE3D));
        h ^= h >> 16;
        h = h.wrapping_mul(0x85EB_CA6B);
        h ^= h >> 13;
        h = h.wrapping_mul(0xC2B2_AE35);
        h ^= h >> 16;
        Luma([(h >> 24) as u8])
    })
}

fn to_rgba(gray: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        image::Rgba([v, v, v, 255])
    })
}

/// A game screen plus one item icon cut out of it.
struct Fixture {
    _dir: tempfile::TempDir,
    images: PathBuf,
    progress: PathBuf,
    screen: RgbaImage,
}

impl Fixture {
    fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let images = dir.path().join("images");
        fs::create_dir(&images)?;

        let screen = noise(160, 90, 42);
        image::imageops::crop_imm(&screen, 70, 30, 20, 20)
            .to_image()
            .save(images.join("a.png"))?;

        Ok(Self {
            progress: dir.path().join("collector_progress.json"),
            images,
            screen: to_rgba(&screen),
            _dir: dir,
        })
    }

    fn scanner<W: WindowSystem>(&self, windows: W) -> Scanner<W> {
        self.scanner_at(windows, &self.progress)
    }

    fn scanner_at<W: WindowSystem>(&self, windows: W, progress: &Path) -> Scanner<W> {
        let progress = ProgressStore::load(progress, &Catalog::new(["A", "B"]));
        let templates = TemplateStore::load(&TemplateLoader::new(&self.images), progress.items());

        Scanner::from_parts(
            FrameAcquirer::new(windows, "Game"),
            templates,
            TemplateMatcher::new(TemplateConfig::default()),
            progress,
        )
    }
}

struct StaticWindows(Option<RgbaImage>);

impl WindowSystem for StaticWindows {
    type Handle = ();

    fn find_window(&self, _: &str) -> Option<()> {
        self.0.as_ref().map(|_| ())
    }

    fn capture_window(&self, _: &()) -> Option<RgbaImage> {
        self.0.clone()
    }
}

/// Blocks inside capture until the test lets it go.
struct GatedWindows {
    frame: RgbaImage,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
    captures: Arc<AtomicUsize>,
}

impl GatedWindows {
    fn new(frame: RgbaImage) -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let windows = Self {
            frame,
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
            captures: Arc::default(),
        };
        (windows, entered_rx, release_tx)
    }
}

impl WindowSystem for GatedWindows {
    type Handle = ();

    fn find_window(&self, _: &str) -> Option<()> {
        Some(())
    }

    fn capture_window(&self, _: &()) -> Option<RgbaImage> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        self.entered.lock().unwrap().send(()).ok();
        self.release.lock().unwrap().recv().ok();
        Some(self.frame.clone())
    }
}

fn completed(outcome: ScanOutcome) -> ScanReport {
    match outcome {
        ScanOutcome::Completed(report) => report,
        other => panic!("expected a completed scan, got {other:?}"),
    }
}

fn read_flags(path: &Path) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn test_detects_item_with_template_only() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let scanner = fixture.scanner(StaticWindows(Some(fixture.screen.clone())));
    assert_eq!(scanner.templates().len(), 1);

    let first = completed(scanner.trigger_scan());
    assert!(first.frame_captured);
    assert!(first.saved);
    assert_eq!(first.results.len(), 1);
    assert!(first.results[0].result.detected);
    assert_eq!(first.changes.len(), 1);
    assert_eq!(first.changes[0].item.as_str(), "A");
    assert!(first.changes[0].detected);
    assert_eq!(
        read_flags(&fixture.progress)?,
        serde_json::json!({ "A": true, "B": false })
    );

    let second = completed(scanner.trigger_scan());
    assert!(second.changes.is_empty());
    assert_eq!(
        read_flags(&fixture.progress)?,
        serde_json::json!({ "A": true, "B": false })
    );
    assert_eq!(scanner.phase(), ScanPhase::Idle);
    Ok(())
}

#[test]
fn test_items_without_template_keep_manual_state() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let scanner = fixture.scanner(StaticWindows(Some(fixture.screen.clone())));

    {
        let state = scanner.state();
        let mut state = state.lock().unwrap();
        state.progress.set_manual(&"B".into(), true)?;
    }

    for _ in 0..3 {
        completed(scanner.trigger_scan());
    }

    let state = scanner.state();
    let state = state.lock().unwrap();
    assert_eq!(state.progress.get("B"), Some(true));
    assert_eq!(state.tracker.last("B"), None);
    Ok(())
}

#[test]
fn test_missing_window_counts_as_not_detected() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let scanner = fixture.scanner(StaticWindows(None));

    {
        let state = scanner.state();
        state.lock().unwrap().progress.merge(&"A".into(), true);
    }

    let report = completed(scanner.trigger_scan());
    assert!(!report.frame_captured);
    assert!(report.saved);
    assert_eq!(report.results[0].result.score, f64::NEG_INFINITY);
    assert_eq!(report.changes.len(), 1);
    assert_eq!(
        read_flags(&fixture.progress)?,
        serde_json::json!({ "A": false, "B": false })
    );
    Ok(())
}

#[test]
fn test_unwritable_progress_keeps_state_and_saves_later() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let missing = fixture.images.with_file_name("missing");
    let progress = missing.join("collector_progress.json");
    let scanner = fixture.scanner_at(StaticWindows(Some(fixture.screen.clone())), &progress);

    let first = completed(scanner.trigger_scan());
    assert!(first.frame_captured);
    assert!(!first.saved);
    assert!(!progress.exists());
    {
        let state = scanner.state();
        let state = state.lock().unwrap();
        assert_eq!(state.progress.get("A"), Some(true));
    }

    fs::create_dir(&missing)?;
    let second = completed(scanner.trigger_scan());
    assert!(second.saved);
    assert!(second.changes.is_empty());
    assert_eq!(
        read_flags(&progress)?,
        serde_json::json!({ "A": true, "B": false })
    );
    Ok(())
}

#[test]
fn test_trigger_during_scan_is_ignored() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let (windows, entered, release) = GatedWindows::new(fixture.screen.clone());
    let captures = Arc::clone(&windows.captures);
    let scanner = Arc::new(fixture.scanner(windows));
    fs::remove_file(&fixture.progress)?;

    let worker = {
        let scanner = Arc::clone(&scanner);
        thread::spawn(move || scanner.trigger_scan())
    };

    entered.recv()?;
    assert!(scanner.is_scanning());
    assert!(matches!(scanner.trigger_scan(), ScanOutcome::Busy));
    assert!(!fixture.progress.exists());

    release.send(())?;
    let report = completed(worker.join().unwrap());
    assert!(report.saved);
    assert!(!scanner.is_scanning());
    assert_eq!(captures.load(Ordering::SeqCst), 1);
    assert_eq!(
        read_flags(&fixture.progress)?,
        serde_json::json!({ "A": true, "B": false })
    );

    // nothing is left to write once the only pass has returned
    fs::write(&fixture.progress, "sentinel")?;
    assert_eq!(scanner.phase(), ScanPhase::Idle);
    assert_eq!(fs::read_to_string(&fixture.progress)?, "sentinel");
    assert!(!fixture.progress.with_extension("json.tmp").exists());
    Ok(())
}

#[test]
fn test_cancelled_scan_does_not_persist() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let scanner = fixture.scanner(StaticWindows(Some(fixture.screen.clone())));
    fs::remove_file(&fixture.progress)?;

    scanner.cancel();
    assert!(matches!(
        scanner.trigger_scan(),
        ScanOutcome::Cancelled { processed: 0 }
    ));
    assert!(!fixture.progress.exists());
    assert_eq!(scanner.phase(), ScanPhase::Idle);
    Ok(())
}

#[test]
fn test_cancel_flag_stops_scan_in_flight() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let (windows, entered, release) = GatedWindows::new(fixture.screen.clone());
    let scanner = Arc::new(fixture.scanner(windows));
    fs::remove_file(&fixture.progress)?;

    let worker = {
        let scanner = Arc::clone(&scanner);
        thread::spawn(move || scanner.trigger_scan())
    };

    entered.recv()?;
    scanner.cancel_flag().store(true, Ordering::Release);
    release.send(())?;

    assert!(matches!(
        worker.join().unwrap(),
        ScanOutcome::Cancelled { processed: 0 }
    ));
    assert!(!fixture.progress.exists());
    assert!(!scanner.is_scanning());

    let state = scanner.state();
    let state = state.lock().unwrap();
    assert_eq!(state.progress.get("A"), Some(false));
    assert_eq!(state.tracker.last("A"), None);
    Ok(())
}
