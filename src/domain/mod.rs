// src/domain/mod.rs
//
// Domain Root - The Single Source of Truth for Domain API
//
// This file declares all domain modules and re-exports their public API.
// All other modules import from `crate::domain::*`

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod birth;
pub mod breeding;
pub mod estrus;
pub mod pregnancy;
pub mod species;
pub mod temporal;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Estrus Domain
pub use estrus::{validate_estrus_detection, EstrusDetection, EstrusStatus};

// Breeding Domain
pub use breeding::{
    validate_breeding_record, validate_estrus_linkage, BreedingMethod, BreedingRecord,
};

// Pregnancy Domain
pub use pregnancy::{validate_pregnancy, ConfirmationMethod, Pregnancy, PregnancyStatus};

// Birth Domain
pub use birth::{validate_birth, Birth, BirthType};

// Species configuration
pub use species::{SpeciesProfile, SpeciesProfiles, UnknownSpecies};

// Temporal Calculator (Derived Dates)
pub use temporal::{
    breeding_window, days_remaining, due_severity, expected_birth_date, is_due_soon,
    BreedingWindow, DueSeverity,
};

// ============================================================================
// DOMAIN ERROR TYPES
// ============================================================================

use thiserror::Error;

/// Domain-level errors
/// These represent violations of business rules and invariants
#[derive(Debug, Error)]
pub enum DomainError {
    /// A write violates a data-model invariant. `field` names the
    /// offending attribute so the caller can correct the input.
    #[error("Validation failed on `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The requested state change is not permitted from the current state.
    #[error("Invalid {entity} transition: {from} -> {requested}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        requested: String,
    },

    #[error("Entity not found: {0}")]
    NotFound(String),
}

impl DomainError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        DomainError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;
