//! Validation Scheduler
//!
//! A single background worker that revalidates a buffer on a fixed
//! interval. Editors stage text and tune knobs from any thread without
//! blocking; only the worker touches the cycle cache.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::validation::{ValidationRequest, Validator};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_millis(400);
pub const DEFAULT_MAX_DIAGNOSTICS: usize = 10;

/// Lifecycle of the worker, as reported by the worker itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Not started yet
    Idle,
    Validating,
    Sleeping,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub interval: Duration,
    /// How long `stop` waits for the worker to acknowledge
    pub termination_grace: Duration,
    pub max_diagnostics: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            termination_grace: DEFAULT_TERMINATION_GRACE,
            max_diagnostics: DEFAULT_MAX_DIAGNOSTICS,
        }
    }
}

/// State shared between the worker and its callers
struct Shared {
    text: watch::Sender<Option<String>>,
    force_revalidate: AtomicBool,
    stop_requested: AtomicBool,
    wake: Notify,
    interval_ms: AtomicU64,
    max_diagnostics: AtomicUsize,
    state: watch::Sender<WorkerState>,
}

impl Shared {
    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    fn stopping(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    fn transition(&self, state: WorkerState) {
        self.state.send_replace(state);
    }
}

pub struct ValidationScheduler {
    shared: Arc<Shared>,
    validator: Option<Validator>,
    worker: Option<JoinHandle<()>>,
    termination_grace: Duration,
}

impl ValidationScheduler {
    pub fn new(validator: Validator, settings: SchedulerSettings) -> Self {
        let shared = Shared {
            text: watch::Sender::new(None),
            force_revalidate: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            wake: Notify::new(),
            interval_ms: AtomicU64::new(duration_ms(settings.interval)),
            max_diagnostics: AtomicUsize::new(settings.max_diagnostics),
            state: watch::Sender::new(WorkerState::Idle),
        };

        Self {
            shared: Arc::new(shared),
            validator: Some(validator),
            worker: None,
            termination_grace: settings.termination_grace,
        }
    }

    /// Spawn the worker loop on the current tokio runtime
    ///
    /// The loop runs until [`stop`](Self::stop). Starting twice is a no-op.
    pub fn start(&mut self) {
        let Some(validator) = self.validator.take() else {
            log::warn!("Validation worker already started");
            return;
        };

        log::debug!("Starting validation worker for {}", validator.resource());
        let shared = self.shared.clone();
        self.worker = Some(tokio::spawn(run_worker(shared, validator)));
    }

    /// Request termination and wait up to the grace period for the worker
    ///
    /// Returns whether the worker acknowledged in time. A worker blocked on
    /// a hung checker may not; it then exits after its current cycle.
    pub async fn stop(&mut self) -> bool {
        self.shared.stop_requested.store(true, Ordering::Release);
        self.shared.wake.notify_one();

        if self.worker.take().is_none() {
            return true;
        }

        let mut state = self.shared.state.subscribe();
        let acknowledged = tokio::time::timeout(
            self.termination_grace,
            state.wait_for(|s| *s == WorkerState::Terminated),
        )
        .await
        .is_ok_and(|res| res.is_ok());

        if !acknowledged {
            log::warn!(
                "Validation worker did not stop within {:?}, continuing shutdown",
                self.termination_grace
            );
        }
        acknowledged
    }

    /// Stage the text for the next cycle
    ///
    /// Never blocks and never affects a cycle already running; that cycle
    /// works on its own snapshot.
    pub fn set_text(&self, text: impl Into<String>) {
        self.shared.text.send_replace(Some(text.into()));
    }

    /// Stage the text, optionally forcing the next cycle to run in full
    pub fn set_text_forced(&self, text: impl Into<String>, force_revalidate: bool) {
        self.set_text(text);
        if force_revalidate {
            self.shared.force_revalidate.store(true, Ordering::Release);
        }
    }

    /// Currently staged text
    pub fn text(&self) -> Option<String> {
        self.shared.text.borrow().clone()
    }

    pub fn set_interval(&self, interval: Duration) {
        self.shared
            .interval_ms
            .store(duration_ms(interval), Ordering::Relaxed);
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval()
    }

    /// Change the cap; a different value forces the next cycle to run in full
    pub fn set_max_diagnostics(&self, max: usize) {
        let previous = self.shared.max_diagnostics.swap(max, Ordering::Relaxed);
        if previous != max {
            self.shared.force_revalidate.store(true, Ordering::Release);
        }
    }

    pub fn max_diagnostics(&self) -> usize {
        self.shared.max_diagnostics.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> WorkerState {
        *self.shared.state.borrow()
    }
}

impl Drop for ValidationScheduler {
    fn drop(&mut self) {
        // Let a detached worker wind down at its next cycle boundary
        self.shared.stop_requested.store(true, Ordering::Release);
        self.shared.wake.notify_one();
    }
}

async fn run_worker(shared: Arc<Shared>, mut validator: Validator) {
    let mut text = shared.text.subscribe();

    while !shared.stopping() {
        if shared.force_revalidate.swap(false, Ordering::AcqRel) {
            validator.invalidate();
        }

        let staged = text.borrow_and_update().clone();
        if let Some(staged) = staged {
            shared.transition(WorkerState::Validating);

            let request = ValidationRequest::new(staged);
            let max = shared.max_diagnostics.load(Ordering::Relaxed);
            match validator
                .run_cycle(&request, max, &shared.stop_requested)
                .await
            {
                Ok(outcome) => {
                    log::debug!("Cycle for {}: {:?}", validator.resource(), outcome)
                }
                Err(e) => log::warn!("Validation of {} failed: {}", validator.resource(), e),
            }
        }

        if shared.stopping() {
            break;
        }

        shared.transition(WorkerState::Sleeping);
        tokio::select! {
            _ = tokio::time::sleep(shared.interval()) => {}
            _ = shared.wake.notified() => {}
        }
    }

    shared.transition(WorkerState::Terminated);
    log::debug!("Validation worker for {} terminated", validator.resource());
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
