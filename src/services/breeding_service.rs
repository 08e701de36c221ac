// src/services/breeding_service.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::breeding::{
    validate_breeding_record, validate_estrus_linkage, BreedingMethod, BreedingRecord,
};
use crate::domain::estrus::EstrusStatus;
use crate::domain::species::SpeciesProfiles;
use crate::domain::temporal::BreedingWindow;
use crate::domain::DomainError;
use crate::error::{AppError, AppResult};
use crate::events::{BreedingRecorded, EstrusClosed, EventBus};
use crate::repositories::{BreedingRepository, EstrusRepository};

#[derive(Debug, Clone)]
pub struct RecordBreedingRequest {
    pub female_id: Uuid,
    pub species: String,
    pub male_id: Option<Uuid>,
    pub breeding_date: DateTime<Utc>,
    pub breeding_method: BreedingMethod,
    pub technician: Option<String>,
    pub semen_batch: Option<String>,
    /// Link to the detection this breeding answers, if tracked
    pub estrus_detection_id: Option<Uuid>,
    pub notes: Option<String>,
}

pub struct BreedingService {
    breeding_repo: Arc<dyn BreedingRepository>,
    estrus_repo: Arc<dyn EstrusRepository>,
    profiles: Arc<SpeciesProfiles>,
    event_bus: Arc<EventBus>,
}

impl BreedingService {
    pub fn new(
        breeding_repo: Arc<dyn BreedingRepository>,
        estrus_repo: Arc<dyn EstrusRepository>,
        profiles: Arc<SpeciesProfiles>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            breeding_repo,
            estrus_repo,
            profiles,
            event_bus,
        }
    }

    /// Log a breeding event. With an estrus link, the referenced
    /// detection must be this female's, confirmed, and the breeding date
    /// must fall inside the optimal window (grace included); the
    /// detection's `bred` transition rides the same transaction as the
    /// insert.
    pub fn record_breeding(&self, request: RecordBreedingRequest) -> AppResult<BreedingRecord> {
        let profile = self.profiles.get(&request.species)?;

        let mut record = BreedingRecord::new(
            request.female_id,
            request.species.clone(),
            request.breeding_date,
            request.breeding_method,
        );
        record.male_id = request.male_id;
        record.technician = request.technician;
        record.semen_batch = request.semen_batch;
        record.notes = request.notes;

        let estrus_transition = match request.estrus_detection_id {
            Some(detection_id) => {
                let detection = self.estrus_repo.get_by_id(detection_id)?.ok_or_else(|| {
                    AppError::Domain(DomainError::validation(
                        "estrus_detection_id",
                        format!("detection {} does not exist", detection_id),
                    ))
                })?;

                record.estrus_detection_id = Some(detection_id);
                validate_estrus_linkage(&record, &detection).map_err(AppError::Domain)?;

                let window = BreedingWindow {
                    start: detection.optimal_breeding_start,
                    end: detection.optimal_breeding_end,
                };
                let deadline = window.deadline(profile);
                if request.breeding_date < window.start || request.breeding_date > deadline {
                    return Err(AppError::Domain(DomainError::validation(
                        "breeding_date",
                        format!(
                            "breeding at {} falls outside the optimal window {} to {} (grace included)",
                            request.breeding_date, window.start, deadline
                        ),
                    )));
                }

                if detection.status == EstrusStatus::Confirmed {
                    let mut updated = detection;
                    updated.mark_bred().map_err(AppError::Domain)?;
                    Some(updated)
                } else {
                    // Already bred: a repeat service within the same heat
                    None
                }
            }
            None => None,
        };

        validate_breeding_record(&record).map_err(AppError::Domain)?;

        let transition = estrus_transition
            .as_ref()
            .map(|d| (d, EstrusStatus::Confirmed));

        if !self.breeding_repo.insert(&record, transition)? {
            // The detection transitioned while we validated; nothing was
            // written. Name the state that won.
            let from = match record.estrus_detection_id {
                Some(detection_id) => self
                    .estrus_repo
                    .get_by_id(detection_id)?
                    .map(|d| d.status.to_string())
                    .unwrap_or_else(|| "deleted".to_string()),
                None => "unknown".to_string(),
            };
            return Err(AppError::Domain(DomainError::InvalidTransition {
                entity: "estrus_detection",
                from,
                requested: "bred".to_string(),
            }));
        }

        if let Some(detection) = &estrus_transition {
            self.event_bus.emit(EstrusClosed::new(
                detection.id,
                detection.animal_id,
                detection.status.to_string(),
            ));
        }

        self.event_bus.emit(BreedingRecorded::new(
            record.id,
            record.female_id,
            record.estrus_detection_id,
        ));

        Ok(record)
    }

    pub fn get(&self, breeding_id: Uuid) -> AppResult<Option<BreedingRecord>> {
        self.breeding_repo.get_by_id(breeding_id)
    }

    pub fn list_by_female(&self, female_id: Uuid) -> AppResult<Vec<BreedingRecord>> {
        self.breeding_repo.list_by_female(female_id)
    }

    /// Breedings still awaiting an outcome.
    pub fn list_pending(&self) -> AppResult<Vec<BreedingRecord>> {
        self.breeding_repo.list_pending()
    }
}
