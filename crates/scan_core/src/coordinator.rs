//! Scan coordination
//!
//! Owns the end-to-end flow from trigger to ranked candidates and the
//! UI-facing phase transitions:
//!
//! `Idle -> Capturing -> Extracting -> Matching -> Presenting`
//! `Idle -> Capturing -> Extracting -> Failed -> (reset) -> Idle`
//!
//! One scan at a time per coordinator: triggering while a scan is in
//! flight is a no-op. The guard is a phase check under a short-lived
//! mutex, never held across an await, so in-flight work is safely
//! abandonable by dropping the driving task.

use crate::capture::{AutoCaptureConfig, CameraDevice, CaptureOptions, PermissionStatus};
use crate::error::ScanError;
use crate::extract::TextExtractor;
use crate::matcher::CandidateMatcher;
use crate::preprocess::{self, PreprocessConfig};
use crate::types::CardRecord;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// UI-facing pipeline phase
#[derive(Debug, Clone, PartialEq)]
pub enum ScanPhase {
    Idle,
    Capturing,
    Extracting,
    Matching,
    /// Terminal: ranked candidates, possibly empty. Whether an empty
    /// list shows "no matches, search manually" is the UI's call.
    Presenting(Vec<CardRecord>),
    /// Terminal: the attempt failed; retry is user-initiated
    Failed(ScanError),
}

impl ScanPhase {
    /// True while a scan is in flight and re-triggers are ignored
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Capturing | Self::Extracting | Self::Matching)
    }
}

/// What a trigger call did
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// Scan ran to a terminal phase (Presenting or Failed)
    Completed(ScanPhase),
    /// A scan was already in flight; nothing happened
    Ignored,
}

pub struct ScanCoordinator {
    camera: Arc<dyn CameraDevice>,
    capture_options: CaptureOptions,
    preprocess_config: PreprocessConfig,
    extractor: TextExtractor,
    matcher: CandidateMatcher,
    phase: Mutex<ScanPhase>,
}

impl ScanCoordinator {
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        extractor: TextExtractor,
        matcher: CandidateMatcher,
    ) -> Self {
        Self {
            camera,
            capture_options: CaptureOptions::default(),
            preprocess_config: PreprocessConfig::default(),
            extractor,
            matcher,
            phase: Mutex::new(ScanPhase::Idle),
        }
    }

    pub fn with_preprocess_config(mut self, config: PreprocessConfig) -> Self {
        self.preprocess_config = config;
        self
    }

    /// Current phase (cloned snapshot)
    pub fn phase(&self) -> ScanPhase {
        self.phase.lock().expect("phase lock poisoned").clone()
    }

    /// User-triggered return to Idle from a terminal phase.
    pub fn reset(&self) {
        let mut phase = self.phase.lock().expect("phase lock poisoned");
        if !phase.is_busy() {
            *phase = ScanPhase::Idle;
        }
    }

    /// Run one scan to completion.
    ///
    /// Re-triggering while busy is ignored; triggering from a terminal
    /// phase starts a fresh scan.
    pub async fn trigger(&self) -> TriggerOutcome {
        {
            let mut phase = self.phase.lock().expect("phase lock poisoned");
            if phase.is_busy() {
                tracing::debug!("scan already in flight, trigger ignored");
                return TriggerOutcome::Ignored;
            }
            *phase = ScanPhase::Capturing;
        }

        let terminal = match self.run_scan().await {
            Ok(candidates) => ScanPhase::Presenting(candidates),
            Err(err) => {
                tracing::warn!(error = %err, "scan attempt failed");
                ScanPhase::Failed(err)
            }
        };
        self.set_phase(terminal.clone());
        TriggerOutcome::Completed(terminal)
    }

    async fn run_scan(&self) -> Result<Vec<CardRecord>, ScanError> {
        if self.camera.request_permission().await == PermissionStatus::Denied {
            return Err(ScanError::PermissionDenied);
        }
        let photo = self.camera.capture_photo(&self.capture_options).await?;

        self.set_phase(ScanPhase::Extracting);
        let encoded = preprocess::encode_for_transmission(&photo.path, &self.preprocess_config)?;
        let scan = self.extractor.extract(&encoded, &photo.path).await?;
        tracing::info!(
            name = scan.name.as_deref().unwrap_or("-"),
            hp = scan.hp.as_deref().unwrap_or("-"),
            number = scan.number.as_deref().unwrap_or("-"),
            "extraction complete"
        );

        self.set_phase(ScanPhase::Matching);
        match self.matcher.match_candidates(&scan).await {
            Ok(candidates) => Ok(candidates),
            Err(err) => {
                // The user sees "no matches", never a raw lookup error
                tracing::warn!(error = %err, "lookup unreachable, presenting empty result");
                Ok(Vec::new())
            }
        }
    }

    fn set_phase(&self, phase: ScanPhase) {
        *self.phase.lock().expect("phase lock poisoned") = phase;
    }
}

/// Running auto-capture loop; dropping or stopping it discards any
/// pending tick without touching an in-flight scan.
pub struct AutoCaptureHandle {
    task: JoinHandle<()>,
}

impl AutoCaptureHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for AutoCaptureHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Periodic capture: each tick stands in for "card alignment
/// detected". The busy check runs both before and after the settle
/// delay so the timer never overlaps a scan already in flight.
pub fn spawn_auto_capture(
    coordinator: Arc<ScanCoordinator>,
    config: AutoCaptureConfig,
) -> AutoCaptureHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if coordinator.phase().is_busy() {
                continue;
            }
            tokio::time::sleep(config.settle_delay).await;
            if coordinator.phase().is_busy() {
                continue;
            }
            coordinator.trigger().await;
        }
    });
    AutoCaptureHandle { task }
}
