// src/services/mod.rs
//
// Services Module - Orchestration Layer
//
// Services enforce referential checks and state-machine rules at write
// time, before anything reaches the repositories. Every mutating call
// either returns the post-transition entity or a named error with no
// state change.

pub mod birth_service;
pub mod breeding_service;
pub mod estrus_service;
pub mod lifecycle_sweep;
pub mod pregnancy_service;
pub mod reporting_service;

#[cfg(test)]
mod lifecycle_tests;

// Re-export all services and their types
pub use estrus_service::{EstrusService, RecordEstrusRequest};

pub use breeding_service::{BreedingService, RecordBreedingRequest};

pub use pregnancy_service::{
    ConfirmPregnancyRequest, PregnancyService, PregnancySource, RecordPregnancyRequest,
};

pub use birth_service::{BirthService, RecordBirthRequest};

pub use reporting_service::{DueSoonEntry, ReportingService, ReproductionSummary};

pub use lifecycle_sweep::{LifecycleSweep, LifecycleSweeper, SweepConfig, SweepOutcome};

/// Engine-wide tunables that are not species-specific.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum detection confidence for confirmation without an explicit
    /// override.
    pub confirmation_confidence_threshold: f64,
    /// Active pregnancies within this many days of their expected birth
    /// date count as due soon.
    pub due_soon_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confirmation_confidence_threshold: 0.7,
            due_soon_days: 14,
        }
    }
}
