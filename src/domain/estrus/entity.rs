use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::temporal::BreedingWindow;
use crate::domain::{DomainError, DomainResult};

/// One detected heat event for a female animal.
///
/// Created by the upstream detection pipeline (AI or manual observation).
/// Everything after creation is governed by the forward-only transitions
/// below; a detection is never reopened once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstrusDetection {
    /// Internal immutable identifier
    pub id: Uuid,

    /// Reference to the animal; the animal registry is external
    pub animal_id: Uuid,

    /// Species snapshot taken at detection time, so scheduling never
    /// needs to consult external state
    pub species: String,

    pub detection_time: DateTime<Utc>,

    /// Observed behavior name -> intensity score. Open-ended schema,
    /// stored as JSON.
    pub behaviors: serde_json::Value,

    /// Detection confidence in [0.0, 1.0]
    pub confidence: f64,

    /// Derived optimal breeding window (see domain::temporal)
    pub optimal_breeding_start: DateTime<Utc>,
    pub optimal_breeding_end: DateTime<Utc>,

    pub status: EstrusStatus,

    /// Whether the alert layer has delivered a notification for this
    /// detection. Orthogonal to status.
    pub notified: bool,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state of a detection. Transitions move only forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstrusStatus {
    Detected,
    Confirmed,
    Bred,
    Missed,
    FalsePositive,
}

impl EstrusStatus {
    /// `detected` and `confirmed` are the only non-terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EstrusStatus::Bred | EstrusStatus::Missed | EstrusStatus::FalsePositive
        )
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "detected" => Some(EstrusStatus::Detected),
            "confirmed" => Some(EstrusStatus::Confirmed),
            "bred" => Some(EstrusStatus::Bred),
            "missed" => Some(EstrusStatus::Missed),
            "false_positive" => Some(EstrusStatus::FalsePositive),
            _ => None,
        }
    }
}

impl EstrusDetection {
    /// Create a new detection from an upstream detection event.
    /// The breeding window is computed by the caller via domain::temporal.
    pub fn new(
        animal_id: Uuid,
        species: String,
        detection_time: DateTime<Utc>,
        behaviors: serde_json::Value,
        confidence: f64,
        window: BreedingWindow,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            animal_id,
            species,
            detection_time,
            behaviors,
            confidence,
            optimal_breeding_start: window.start,
            optimal_breeding_end: window.end,
            status: EstrusStatus::Detected,
            notified: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Manual or AI confirmation of the heat.
    pub fn confirm(&mut self) -> DomainResult<()> {
        self.transition(EstrusStatus::Confirmed)
    }

    /// A breeding has been logged against this detection.
    pub fn mark_bred(&mut self) -> DomainResult<()> {
        self.transition(EstrusStatus::Bred)
    }

    /// The breeding window elapsed with no linked breeding.
    pub fn mark_missed(&mut self) -> DomainResult<()> {
        self.transition(EstrusStatus::Missed)
    }

    /// Manual override: the detection was spurious.
    pub fn mark_false_positive(&mut self) -> DomainResult<()> {
        self.transition(EstrusStatus::FalsePositive)
    }

    pub fn mark_notified(&mut self) {
        self.notified = true;
        self.updated_at = Utc::now();
    }

    fn transition(&mut self, to: EstrusStatus) -> DomainResult<()> {
        use EstrusStatus::*;

        let legal = matches!(
            (self.status, to),
            (Detected, Confirmed)
                | (Confirmed, Bred)
                | (Detected, Missed)
                | (Confirmed, Missed)
                | (Detected, FalsePositive)
                | (Confirmed, FalsePositive)
        );

        if !legal {
            return Err(DomainError::InvalidTransition {
                entity: "estrus_detection",
                from: self.status.to_string(),
                requested: to.to_string(),
            });
        }

        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl std::fmt::Display for EstrusStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstrusStatus::Detected => write!(f, "detected"),
            EstrusStatus::Confirmed => write!(f, "confirmed"),
            EstrusStatus::Bred => write!(f, "bred"),
            EstrusStatus::Missed => write!(f, "missed"),
            EstrusStatus::FalsePositive => write!(f, "false_positive"),
        }
    }
}
