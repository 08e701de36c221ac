use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DomainError, DomainResult};

/// A recorded birth event.
///
/// Created once, at the birth; immutable afterwards except corrective note
/// edits and late offspring tagging. A birth may exist without a tracked
/// pregnancy, and outlives the deletion of one (the back-reference is
/// nulled, never cascaded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Birth {
    /// Internal immutable identifier
    pub id: Uuid,

    pub mother_id: Uuid,

    /// Back-reference to the tracked pregnancy, if any
    pub pregnancy_id: Option<Uuid>,

    pub birth_date: DateTime<Utc>,

    pub offspring_count: u32,

    /// Offspring ids, filled in as offspring are tagged; ordered
    pub offspring_ids: Vec<Uuid>,

    pub birth_type: BirthType,

    /// Total litter weight in kilograms, when weighed
    pub birth_weight: Option<f64>,

    pub complications: Option<String>,

    pub vet_assisted: bool,
    pub vet_name: Option<String>,

    /// When the AI pipeline predicted the birth, if it did
    pub ai_predicted_at: Option<DateTime<Utc>>,
    /// When the AI pipeline detected the birth happening
    pub ai_detected_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BirthType {
    Normal,
    Assisted,
    Cesarean,
}

impl BirthType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(BirthType::Normal),
            "assisted" => Some(BirthType::Assisted),
            "cesarean" => Some(BirthType::Cesarean),
            _ => None,
        }
    }
}

impl Birth {
    pub fn new(
        mother_id: Uuid,
        birth_date: DateTime<Utc>,
        offspring_count: u32,
        birth_type: BirthType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            mother_id,
            pregnancy_id: None,
            birth_date,
            offspring_count,
            offspring_ids: Vec::new(),
            birth_type,
            birth_weight: None,
            complications: None,
            vet_assisted: false,
            vet_name: None,
            ai_predicted_at: None,
            ai_detected_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Hours between the AI birth prediction and the detected birth, when
    /// both timestamps are present.
    pub fn prediction_accuracy_hours(&self) -> Option<f64> {
        match (self.ai_predicted_at, self.ai_detected_at) {
            (Some(predicted), Some(detected)) => {
                Some((detected - predicted).num_seconds().abs() as f64 / 3600.0)
            }
            _ => None,
        }
    }

    /// Append offspring ids as animals get tagged after the fact.
    pub fn tag_offspring(&mut self, ids: &[Uuid]) -> DomainResult<()> {
        let total = self.offspring_ids.len() + ids.len();
        if total > self.offspring_count as usize {
            return Err(DomainError::validation(
                "offspring_ids",
                format!(
                    "{} tagged offspring would exceed the recorded count of {}",
                    total, self.offspring_count
                ),
            ));
        }
        self.offspring_ids.extend_from_slice(ids);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Corrective note edit; the only other mutation a birth permits.
    pub fn amend_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
        self.updated_at = Utc::now();
    }
}

impl std::fmt::Display for BirthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BirthType::Normal => write!(f, "normal"),
            BirthType::Assisted => write!(f, "assisted"),
            BirthType::Cesarean => write!(f, "cesarean"),
        }
    }
}
