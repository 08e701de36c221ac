// src/events/types.rs
//
// All domain events in the system.
// Each event represents an immutable fact that has already occurred.
//
// CRITICAL RULES:
// - Events are facts, not commands
// - Events are immutable
// - Events carry only the data needed to react
// - No business logic in event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trait that all domain events must implement
pub trait DomainEvent: std::fmt::Debug + Clone {
    /// Unique identifier for this event instance
    fn event_id(&self) -> Uuid;

    /// When this event occurred
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Human-readable event type name
    fn event_type(&self) -> &'static str;
}

macro_rules! domain_event {
    ($name:ident) => {
        impl DomainEvent for $name {
            fn event_id(&self) -> Uuid {
                self.event_id
            }
            fn occurred_at(&self) -> DateTime<Utc> {
                self.occurred_at
            }
            fn event_type(&self) -> &'static str {
                stringify!($name)
            }
        }
    };
}

// ============================================================================
// ESTRUS EVENTS
// ============================================================================

/// Emitted when an upstream detection event creates a new EstrusDetection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstrusDetected {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub detection_id: Uuid,
    pub animal_id: Uuid,
    pub confidence: f64,
    pub optimal_breeding_start: DateTime<Utc>,
    pub optimal_breeding_end: DateTime<Utc>,
}

impl EstrusDetected {
    pub fn new(
        detection_id: Uuid,
        animal_id: Uuid,
        confidence: f64,
        optimal_breeding_start: DateTime<Utc>,
        optimal_breeding_end: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            detection_id,
            animal_id,
            confidence,
            optimal_breeding_start,
            optimal_breeding_end,
        }
    }
}

domain_event!(EstrusDetected);

/// Emitted when a detection is confirmed (manually or by AI)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstrusConfirmed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub detection_id: Uuid,
    pub animal_id: Uuid,
}

impl EstrusConfirmed {
    pub fn new(detection_id: Uuid, animal_id: Uuid) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            detection_id,
            animal_id,
        }
    }
}

domain_event!(EstrusConfirmed);

/// Emitted when a detection reaches a terminal state
/// (bred, missed or false_positive)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstrusClosed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub detection_id: Uuid,
    pub animal_id: Uuid,
    pub status: String,
}

impl EstrusClosed {
    pub fn new(detection_id: Uuid, animal_id: Uuid, status: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            detection_id,
            animal_id,
            status,
        }
    }
}

domain_event!(EstrusClosed);

// ============================================================================
// BREEDING EVENTS
// ============================================================================

/// Emitted when a breeding event is logged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedingRecorded {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub breeding_id: Uuid,
    pub female_id: Uuid,
    pub estrus_detection_id: Option<Uuid>,
}

impl BreedingRecorded {
    pub fn new(breeding_id: Uuid, female_id: Uuid, estrus_detection_id: Option<Uuid>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            breeding_id,
            female_id,
            estrus_detection_id,
        }
    }
}

domain_event!(BreedingRecorded);

/// Emitted when a breeding outcome resolves, either by pregnancy
/// confirmation or by the return-to-heat window elapsing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedingOutcomeResolved {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub breeding_id: Uuid,
    pub female_id: Uuid,
    pub success: bool,
}

impl BreedingOutcomeResolved {
    pub fn new(breeding_id: Uuid, female_id: Uuid, success: bool) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            breeding_id,
            female_id,
            success,
        }
    }
}

domain_event!(BreedingOutcomeResolved);

// ============================================================================
// PREGNANCY EVENTS
// ============================================================================

/// Emitted when a pregnancy record is created without confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PregnancyRecorded {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub pregnancy_id: Uuid,
    pub animal_id: Uuid,
    pub expected_birth_date: DateTime<Utc>,
}

impl PregnancyRecorded {
    pub fn new(pregnancy_id: Uuid, animal_id: Uuid, expected_birth_date: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            pregnancy_id,
            animal_id,
            expected_birth_date,
        }
    }
}

domain_event!(PregnancyRecorded);

/// Emitted when a pregnancy is confirmed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PregnancyConfirmed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub pregnancy_id: Uuid,
    pub animal_id: Uuid,
    pub expected_birth_date: DateTime<Utc>,
}

impl PregnancyConfirmed {
    pub fn new(pregnancy_id: Uuid, animal_id: Uuid, expected_birth_date: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            pregnancy_id,
            animal_id,
            expected_birth_date,
        }
    }
}

domain_event!(PregnancyConfirmed);

/// Emitted when a pregnancy reaches a terminal state
/// (birthed, miscarried or cancelled)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PregnancyClosed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub pregnancy_id: Uuid,
    pub animal_id: Uuid,
    pub status: String,
}

impl PregnancyClosed {
    pub fn new(pregnancy_id: Uuid, animal_id: Uuid, status: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            pregnancy_id,
            animal_id,
            status,
        }
    }
}

domain_event!(PregnancyClosed);

// ============================================================================
// BIRTH EVENTS
// ============================================================================

/// Emitted when a birth is recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirthRecorded {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub birth_id: Uuid,
    pub mother_id: Uuid,
    pub pregnancy_id: Option<Uuid>,
    pub offspring_count: u32,
}

impl BirthRecorded {
    pub fn new(
        birth_id: Uuid,
        mother_id: Uuid,
        pregnancy_id: Option<Uuid>,
        offspring_count: u32,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            birth_id,
            mother_id,
            pregnancy_id,
            offspring_count,
        }
    }
}

domain_event!(BirthRecorded);

// ============================================================================
// SWEEP EVENTS
// ============================================================================

/// Emitted after each background sweep pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepCompleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub estrus_missed: u32,
    pub breedings_resolved: u32,
    pub skipped: u32,
}

impl SweepCompleted {
    pub fn new(estrus_missed: u32, breedings_resolved: u32, skipped: u32) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            estrus_missed,
            breedings_resolved,
            skipped,
        }
    }
}

domain_event!(SweepCompleted);
