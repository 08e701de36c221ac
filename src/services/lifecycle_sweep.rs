// src/services/lifecycle_sweep.rs
//
// Lifecycle Sweep - Background automatic transitions
//
// CRITICAL RULES:
// - Runs in background task on a fixed interval
// - Each record's transition is its own atomic unit (guarded update)
// - Idempotent: re-running at the same instant changes nothing
// - Failures are logged and retried next cycle, never escalated
// - "now" is an explicit parameter to run_once; only the background
//   wrapper reads the real clock

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::domain::estrus::EstrusStatus;
use crate::domain::species::SpeciesProfiles;
use crate::error::AppResult;
use crate::events::{BreedingOutcomeResolved, EstrusClosed, EventBus, SweepCompleted};
use crate::repositories::{BreedingRepository, EstrusRepository};

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
        }
    }
}

/// What one sweep pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Detections transitioned to missed
    pub estrus_missed: u32,
    /// Breedings auto-resolved to success = false
    pub breedings_resolved: u32,
    /// Records skipped for missing species profiles
    pub skipped: u32,
}

/// The sweep logic itself, separate from its scheduling.
pub struct LifecycleSweep {
    estrus_repo: Arc<dyn EstrusRepository>,
    breeding_repo: Arc<dyn BreedingRepository>,
    profiles: Arc<SpeciesProfiles>,
    event_bus: Arc<EventBus>,
}

impl LifecycleSweep {
    pub fn new(
        estrus_repo: Arc<dyn EstrusRepository>,
        breeding_repo: Arc<dyn BreedingRepository>,
        profiles: Arc<SpeciesProfiles>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            estrus_repo,
            breeding_repo,
            profiles,
            event_bus,
        }
    }

    /// One full pass as of `now`:
    /// - open detections whose window deadline (grace included) has
    ///   passed become missed
    /// - pending breedings whose return-to-heat window has elapsed
    ///   unconfirmed resolve to success = false
    pub fn run_once(&self, now: DateTime<Utc>) -> AppResult<SweepOutcome> {
        let mut outcome = SweepOutcome::default();

        self.sweep_estrus(now, &mut outcome)?;
        self.sweep_breedings(now, &mut outcome)?;

        self.event_bus.emit(SweepCompleted::new(
            outcome.estrus_missed,
            outcome.breedings_resolved,
            outcome.skipped,
        ));

        Ok(outcome)
    }

    fn sweep_estrus(&self, now: DateTime<Utc>, outcome: &mut SweepOutcome) -> AppResult<()> {
        for status in [EstrusStatus::Detected, EstrusStatus::Confirmed] {
            for detection in self.estrus_repo.list_by_status(status)? {
                let profile = match self.profiles.get(&detection.species) {
                    Ok(profile) => profile,
                    Err(e) => {
                        log::warn!("sweep: skipping detection {}: {}", detection.id, e);
                        outcome.skipped += 1;
                        continue;
                    }
                };

                let deadline = detection.optimal_breeding_end + profile.breeding_grace();
                if now <= deadline {
                    continue;
                }

                let mut missed = detection;
                if missed.mark_missed().is_err() {
                    continue;
                }

                // A losing guard means a foreground write got there
                // first; that is a success for the sweep, not a failure
                if self.estrus_repo.update_guarded(&missed, status)? {
                    outcome.estrus_missed += 1;
                    self.event_bus.emit(EstrusClosed::new(
                        missed.id,
                        missed.animal_id,
                        missed.status.to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn sweep_breedings(&self, now: DateTime<Utc>, outcome: &mut SweepOutcome) -> AppResult<()> {
        for record in self.breeding_repo.list_pending()? {
            let profile = match self.profiles.get(&record.species) {
                Ok(profile) => profile,
                Err(e) => {
                    log::warn!("sweep: skipping breeding {}: {}", record.id, e);
                    outcome.skipped += 1;
                    continue;
                }
            };

            let deadline = record.breeding_date + profile.return_window();
            if now <= deadline {
                continue;
            }

            if self
                .breeding_repo
                .resolve_outcome_guarded(record.id, false, None)?
            {
                outcome.breedings_resolved += 1;
                self.event_bus.emit(BreedingOutcomeResolved::new(
                    record.id,
                    record.female_id,
                    false,
                ));
            }
        }
        Ok(())
    }
}

/// Background scheduling wrapper around LifecycleSweep.
pub struct LifecycleSweeper {
    sweep: Arc<LifecycleSweep>,
    config: SweepConfig,
    task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LifecycleSweeper {
    pub fn new(sweep: Arc<LifecycleSweep>, config: SweepConfig) -> Self {
        Self {
            sweep,
            config,
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the periodic sweep. A running sweeper is restarted.
    pub fn start(&self) {
        self.stop();

        let sweep = Arc::clone(&self.sweep);
        let interval = self.config.interval;

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                match sweep.run_once(Utc::now()) {
                    Ok(outcome) => {
                        if outcome != SweepOutcome::default() {
                            log::info!(
                                "sweep: {} estrus missed, {} breedings resolved, {} skipped",
                                outcome.estrus_missed,
                                outcome.breedings_resolved,
                                outcome.skipped
                            );
                        }
                    }
                    Err(e) => {
                        // Retryable by construction: the next cycle sees
                        // whatever this one could not
                        log::warn!("sweep failed, retrying next cycle: {}", e);
                    }
                }
            }
        });

        let mut handle = self.task_handle.lock().unwrap();
        *handle = Some(task);
    }

    /// Cancel the periodic sweep. Safe between records: every record's
    /// transition is its own atomic write.
    pub fn stop(&self) {
        let mut handle = self.task_handle.lock().unwrap();
        if let Some(task) = handle.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.lock().unwrap().is_some()
    }
}

impl Drop for LifecycleSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
