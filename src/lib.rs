// src/lib.rs
// Herdbook - Reproductive lifecycle tracking engine
//
// Architecture:
// - Domain-centric: entities, invariants and derived-date arithmetic live
//   in domains; services enforce the cross-entity rules
// - Event-driven: every mutating operation emits a domain event the
//   surrounding application subscribes to
// - Explicit: no implicit behavior, no ambient clock in domain logic
// - One-way data flow: detection -> breeding -> pregnancy -> birth, with
//   the reporter re-deriving summary views from consistent snapshots

pub mod application;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;

// ============================================================================
// PUBLIC API - Domain Entities
// ============================================================================

pub use domain::{
    breeding_window,
    days_remaining,
    due_severity,
    expected_birth_date,
    is_due_soon,
    validate_birth,
    validate_breeding_record,
    validate_estrus_detection,
    validate_estrus_linkage,
    validate_pregnancy,
    // Birth
    Birth,
    BirthType,
    // Breeding
    BreedingMethod,
    BreedingRecord,
    // Temporal
    BreedingWindow,
    ConfirmationMethod,
    DueSeverity,
    // Estrus
    EstrusDetection,
    EstrusStatus,
    // Pregnancy
    Pregnancy,
    PregnancyStatus,
    // Species configuration
    SpeciesProfile,
    SpeciesProfiles,
    UnknownSpecies,
};

// ============================================================================
// PUBLIC API - Error Types
// ============================================================================

pub use domain::{DomainError, DomainResult};
pub use error::{AppError, AppResult};

// ============================================================================
// PUBLIC API - Events
// ============================================================================

pub use events::{
    BirthRecorded, BreedingOutcomeResolved, BreedingRecorded, DomainEvent, EstrusClosed,
    EstrusConfirmed, EstrusDetected, EventBus, PregnancyClosed, PregnancyConfirmed,
    PregnancyRecorded, SweepCompleted,
};

// ============================================================================
// PUBLIC API - Services & Facade
// ============================================================================

pub use application::ReproductionEngine;
pub use services::{
    ConfirmPregnancyRequest, DueSoonEntry, EngineConfig, PregnancySource, RecordBirthRequest,
    RecordBreedingRequest, RecordEstrusRequest, RecordPregnancyRequest, ReproductionSummary,
    SweepConfig, SweepOutcome,
};
