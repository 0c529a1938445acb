//! Scan orchestration: one capture, every template, one save

use crate::capture::{FrameAcquirer, WindowSystem};
use crate::detection::DetectionConfig;
use crate::template::{MatchResult, Template, TemplateLoader, TemplateMatcher, TemplateStore};
use kappa_core::{DetectionTracker, ItemId, ProgressStore, StatusChange};
use opencv::core::Mat;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Everything a scan mutates. Shared with the UI side, which only reads it
/// or goes through the progress store's own methods.
#[derive(Debug)]
pub struct ChecklistState {
    pub progress: ProgressStore,
    pub tracker: DetectionTracker,
}

impl ChecklistState {
    pub fn new(progress: ProgressStore) -> Self {
        Self {
            progress,
            tracker: DetectionTracker::new(),
        }
    }
}

/// Lock the shared state. A panic elsewhere does not leave the record
/// half-written, so a poisoned lock is still usable.
pub fn lock_state(state: &Mutex<ChecklistState>) -> MutexGuard<'_, ChecklistState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScanPhase {
    Idle = 0,
    Acquiring = 1,
    Matching = 2,
    Persisting = 3,
}

impl ScanPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ScanPhase::Acquiring,
            2 => ScanPhase::Matching,
            3 => ScanPhase::Persisting,
            _ => ScanPhase::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemResult {
    pub item: ItemId,
    pub result: MatchResult,
}

/// What one completed pass saw and changed
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub results: Vec<ItemResult>,
    pub changes: Vec<StatusChange>,
    pub frame_captured: bool,
    pub saved: bool,
    pub elapsed: Duration,
}

impl ScanReport {
    pub fn detected_count(&self) -> usize {
        self.results.iter().filter(|r| r.result.detected).count()
    }
}

#[derive(Debug)]
pub enum ScanOutcome {
    Completed(ScanReport),
    /// Another pass was already running; nothing happened.
    Busy,
    /// Stopped by the cancellation flag before persisting.
    Cancelled { processed: usize },
}

/// Resets the phase word when a pass ends, however it ends.
struct PhaseGuard<'a>(&'a AtomicU8);

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.store(ScanPhase::Idle as u8, Ordering::Release);
    }
}

/// Drives scan passes. At most one pass runs at a time.
pub struct Scanner<W> {
    acquirer: FrameAcquirer<W>,
    templates: TemplateStore,
    matcher: TemplateMatcher,
    state: Arc<Mutex<ChecklistState>>,
    phase: AtomicU8,
    cancelled: Arc<AtomicBool>,
}

impl<W: WindowSystem> Scanner<W> {
    /// Build the template store for every item in `progress` and wire up the
    /// configured window and matcher.
    pub fn new(config: &DetectionConfig, windows: W, progress: ProgressStore) -> Self {
        let loader = TemplateLoader::new(&config.template_dir)
            .with_extensions(config.template_config.extensions.clone());
        let templates = TemplateStore::load(&loader, progress.items());

        Self::from_parts(
            FrameAcquirer::new(windows, config.window_name.clone()),
            templates,
            TemplateMatcher::new(config.template_config.clone()),
            progress,
        )
    }

    pub fn from_parts(
        acquirer: FrameAcquirer<W>,
        templates: TemplateStore,
        matcher: TemplateMatcher,
        progress: ProgressStore,
    ) -> Self {
        Self {
            acquirer,
            templates,
            matcher,
            state: Arc::new(Mutex::new(ChecklistState::new(progress))),
            phase: AtomicU8::new(ScanPhase::Idle as u8),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle to the shared checklist state.
    pub fn state(&self) -> Arc<Mutex<ChecklistState>> {
        Arc::clone(&self.state)
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn phase(&self) -> ScanPhase {
        ScanPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn is_scanning(&self) -> bool {
        self.phase() != ScanPhase::Idle
    }

    /// Ask a running pass to stop at the next item boundary. Sticky: later
    /// passes are cancelled immediately too.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Handle for contexts that cannot hold the scanner, such as a signal handler.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Run one pass unless one is already in flight.
    pub fn trigger_scan(&self) -> ScanOutcome {
        if self
            .phase
            .compare_exchange(
                ScanPhase::Idle as u8,
                ScanPhase::Acquiring as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            debug!("scan already running, trigger ignored");
            return ScanOutcome::Busy;
        }

        let _guard = PhaseGuard(&self.phase);
        self.run_pass()
    }

    fn set_phase(&self, phase: ScanPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn run_pass(&self) -> ScanOutcome {
        let started = Instant::now();
        let items: Vec<ItemId> = lock_state(&self.state).progress.items().cloned().collect();
        info!("Starting scan of {} items", items.len());

        let frame = self.acquirer.acquire().and_then(|image| {
            match self.matcher.prepare_rgba(&image) {
                Ok(mat) => Some(mat),
                Err(e) => {
                    warn!("Captured frame unusable: {e:#}");
                    None
                }
            }
        });
        if frame.is_none() {
            warn!("No frame this pass, every item counts as not detected");
        }

        self.set_phase(ScanPhase::Matching);
        let candidates: Vec<&Template> = items
            .iter()
            .filter_map(|item| self.templates.get(item.as_str()))
            .collect();

        // In parallel mode scoring runs ahead of the merge loop, so each
        // worker checks the flag itself and leaves cancelled items unscored.
        #[cfg(feature = "parallel")]
        let result_for = {
            use rayon::prelude::*;
            let results: Vec<Option<MatchResult>> = candidates
                .par_iter()
                .map(|template| {
                    (!self.is_cancelled()).then(|| self.evaluate(frame.as_ref(), template))
                })
                .collect();
            move |index: usize, _: &Template| results[index]
        };
        #[cfg(not(feature = "parallel"))]
        let result_for = |_: usize, template: &Template| Some(self.evaluate(frame.as_ref(), template));

        let mut report = ScanReport {
            frame_captured: frame.is_some(),
            ..Default::default()
        };

        for (index, &template) in candidates.iter().enumerate() {
            if self.is_cancelled() {
                return cancelled(report.results.len());
            }
            let Some(result) = result_for(index, template) else {
                return cancelled(report.results.len());
            };

            let mut state = lock_state(&self.state);
            if let Some(change) = state.tracker.report(&template.item, result.detected) {
                log_change(&change);
                report.changes.push(change);
            }
            state.progress.merge(&template.item, result.detected);
            drop(state);

            report.results.push(ItemResult {
                item: template.item.clone(),
                result,
            });
        }

        self.set_phase(ScanPhase::Persisting);
        report.saved = match lock_state(&self.state).progress.save() {
            Ok(()) => true,
            Err(e) => {
                error!("Error saving progress: {:#}", anyhow::Error::from(e));
                false
            }
        };

        report.elapsed = started.elapsed();
        info!(
            "Scan complete: {}/{} detected in {}ms",
            report.detected_count(),
            report.results.len(),
            report.elapsed.as_millis()
        );
        ScanOutcome::Completed(report)
    }

    fn evaluate(&self, frame: Option<&Mat>, template: &Template) -> MatchResult {
        match frame {
            Some(frame) => self.matcher.evaluate_prepared(frame, template),
            None => MatchResult::missed(),
        }
    }
}

fn cancelled(processed: usize) -> ScanOutcome {
    warn!("Scan cancelled after {} items", processed);
    ScanOutcome::Cancelled { processed }
}

fn log_change(change: &StatusChange) {
    let time = change.at.format("%H:%M:%S");
    if change.detected {
        info!("{} - {}: {}", time, change.label(), change.item);
    } else {
        warn!("{} - {}: {}", time, change.label(), change.item);
    }
}
