use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DomainError, DomainResult};

/// One logged breeding event.
///
/// Not a state machine over a status field: the record is created with an
/// unknown outcome (`success = None`) and resolved exactly once, either by
/// a confirmed pregnancy or by the return-to-heat window elapsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedingRecord {
    /// Internal immutable identifier
    pub id: Uuid,

    pub female_id: Uuid,

    /// Species snapshot taken at breeding time
    pub species: String,

    /// Sire, when known (absent for e.g. purchased semen batches)
    pub male_id: Option<Uuid>,

    pub breeding_date: DateTime<Utc>,
    pub breeding_method: BreedingMethod,

    pub technician: Option<String>,
    pub semen_batch: Option<String>,

    /// Back-reference to the detection this breeding answered, if any
    pub estrus_detection_id: Option<Uuid>,

    /// None until the outcome is known; write-once thereafter
    pub success: Option<bool>,

    /// Forward-reference to the confirmed pregnancy; write-once
    pub pregnancy_id: Option<Uuid>,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreedingMethod {
    Natural,
    ArtificialInsemination,
    EmbryoTransfer,
}

impl BreedingMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "natural" => Some(BreedingMethod::Natural),
            "artificial_insemination" => Some(BreedingMethod::ArtificialInsemination),
            "embryo_transfer" => Some(BreedingMethod::EmbryoTransfer),
            _ => None,
        }
    }
}

impl BreedingRecord {
    pub fn new(
        female_id: Uuid,
        species: String,
        breeding_date: DateTime<Utc>,
        breeding_method: BreedingMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            female_id,
            species,
            male_id: None,
            breeding_date,
            breeding_method,
            technician: None,
            semen_batch: None,
            estrus_detection_id: None,
            success: None,
            pregnancy_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Phase-two outcome resolution. `success` is write-once; a confirmed
    /// pregnancy carries its id along.
    pub fn resolve_outcome(
        &mut self,
        success: bool,
        pregnancy_id: Option<Uuid>,
    ) -> DomainResult<()> {
        if self.success.is_some() {
            return Err(DomainError::validation(
                "success",
                "breeding outcome is already resolved and cannot change",
            ));
        }
        if pregnancy_id.is_some() && self.pregnancy_id.is_some() {
            return Err(DomainError::validation(
                "pregnancy_id",
                "breeding already references a confirmed pregnancy",
            ));
        }

        self.success = Some(success);
        if let Some(id) = pregnancy_id {
            self.pregnancy_id = Some(id);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.success.is_none()
    }
}

impl std::fmt::Display for BreedingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreedingMethod::Natural => write!(f, "natural"),
            BreedingMethod::ArtificialInsemination => write!(f, "artificial_insemination"),
            BreedingMethod::EmbryoTransfer => write!(f, "embryo_transfer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> BreedingRecord {
        BreedingRecord::new(
            Uuid::new_v4(),
            "cattle".to_string(),
            Utc.with_ymd_and_hms(2024, 1, 10, 18, 0, 0).unwrap(),
            BreedingMethod::ArtificialInsemination,
        )
    }

    #[test]
    fn test_new_record_is_pending() {
        let rec = record();
        assert!(rec.is_pending());
        assert!(rec.pregnancy_id.is_none());
    }

    #[test]
    fn test_resolve_success_with_pregnancy() {
        let mut rec = record();
        let pregnancy = Uuid::new_v4();
        rec.resolve_outcome(true, Some(pregnancy)).unwrap();

        assert_eq!(rec.success, Some(true));
        assert_eq!(rec.pregnancy_id, Some(pregnancy));
    }

    #[test]
    fn test_outcome_is_write_once() {
        let mut rec = record();
        rec.resolve_outcome(false, None).unwrap();

        let err = rec.resolve_outcome(true, Some(Uuid::new_v4())).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation { field: "success", .. }
        ));
        assert_eq!(rec.success, Some(false));
    }
}
