// src/services/birth_service.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::birth::{validate_birth, Birth, BirthType};
use crate::domain::pregnancy::PregnancyStatus;
use crate::domain::DomainError;
use crate::error::{AppError, AppResult};
use crate::events::{BirthRecorded, BreedingOutcomeResolved, EventBus, PregnancyClosed};
use crate::repositories::{BirthRepository, BreedingRepository, PregnancyClose, PregnancyRepository};

#[derive(Debug, Clone)]
pub struct RecordBirthRequest {
    pub mother_id: Uuid,
    pub birth_date: DateTime<Utc>,
    pub offspring_count: u32,
    /// Offspring already tagged at recording time; more may follow
    pub offspring_ids: Vec<Uuid>,
    pub birth_type: BirthType,
    /// The tracked pregnancy this birth closes, if any
    pub pregnancy_id: Option<Uuid>,
    pub birth_weight: Option<f64>,
    pub complications: Option<String>,
    pub vet_assisted: bool,
    pub vet_name: Option<String>,
    pub ai_predicted_at: Option<DateTime<Utc>>,
    pub ai_detected_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

pub struct BirthService {
    birth_repo: Arc<dyn BirthRepository>,
    pregnancy_repo: Arc<dyn PregnancyRepository>,
    breeding_repo: Arc<dyn BreedingRepository>,
    event_bus: Arc<EventBus>,
}

impl BirthService {
    pub fn new(
        birth_repo: Arc<dyn BirthRepository>,
        pregnancy_repo: Arc<dyn PregnancyRepository>,
        breeding_repo: Arc<dyn BreedingRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            birth_repo,
            pregnancy_repo,
            breeding_repo,
            event_bus,
        }
    }

    /// Record a birth. With a pregnancy reference this is the single
    /// atomic event that creates the birth, transitions the pregnancy to
    /// birthed, and finalizes a pending source breeding outcome; either
    /// all three apply or none do.
    pub fn record_birth(&self, request: RecordBirthRequest) -> AppResult<Birth> {
        let mut birth = Birth::new(
            request.mother_id,
            request.birth_date,
            request.offspring_count,
            request.birth_type,
        );
        birth.pregnancy_id = request.pregnancy_id;
        birth.offspring_ids = request.offspring_ids;
        birth.birth_weight = request.birth_weight;
        birth.complications = request.complications;
        birth.vet_assisted = request.vet_assisted;
        birth.vet_name = request.vet_name;
        birth.ai_predicted_at = request.ai_predicted_at;
        birth.ai_detected_at = request.ai_detected_at;
        birth.notes = request.notes;

        validate_birth(&birth).map_err(AppError::Domain)?;

        let close = match request.pregnancy_id {
            Some(pregnancy_id) => {
                let pregnancy = self
                    .pregnancy_repo
                    .get_by_id(pregnancy_id)?
                    .ok_or_else(|| {
                        AppError::Domain(DomainError::validation(
                            "pregnancy_id",
                            format!("pregnancy {} does not exist", pregnancy_id),
                        ))
                    })?;

                if pregnancy.animal_id != birth.mother_id {
                    return Err(AppError::Domain(DomainError::validation(
                        "mother_id",
                        format!(
                            "pregnancy {} belongs to animal {}, not {}",
                            pregnancy_id, pregnancy.animal_id, birth.mother_id
                        ),
                    )));
                }
                if pregnancy.status != PregnancyStatus::Active {
                    return Err(AppError::Domain(DomainError::InvalidTransition {
                        entity: "pregnancy",
                        from: pregnancy.status.to_string(),
                        requested: "birthed".to_string(),
                    }));
                }

                Some(PregnancyClose {
                    pregnancy_id,
                    birth_date: request.birth_date,
                })
            }
            None => None,
        };

        // Resolved inside the transaction; read here only for the event
        let source_breeding = match request.pregnancy_id {
            Some(pregnancy_id) => self
                .breeding_repo
                .get_by_pregnancy(pregnancy_id)?
                .filter(|b| b.is_pending()),
            None => None,
        };

        if !self.birth_repo.insert_atomic(&birth, close.as_ref())? {
            // The pregnancy transitioned while we validated; the whole
            // write was rolled back. Name the state that won.
            return Err(match &close {
                Some(close) => {
                    match self.pregnancy_repo.get_by_id(close.pregnancy_id)? {
                        Some(p) if p.status == PregnancyStatus::Active => {
                            // The guard refused a pregnancy that still
                            // reads active: the triple could not complete
                            // as a unit for no explicable reason
                            AppError::Consistency(format!(
                                "birth write for pregnancy {} rolled back although the pregnancy reads active",
                                close.pregnancy_id
                            ))
                        }
                        Some(p) => AppError::Domain(DomainError::InvalidTransition {
                            entity: "pregnancy",
                            from: p.status.to_string(),
                            requested: "birthed".to_string(),
                        }),
                        None => AppError::Domain(DomainError::InvalidTransition {
                            entity: "pregnancy",
                            from: "deleted".to_string(),
                            requested: "birthed".to_string(),
                        }),
                    }
                }
                None => AppError::Consistency(
                    "birth insert rolled back without a pregnancy guard".to_string(),
                ),
            });
        }

        if let Some(close) = &close {
            self.event_bus.emit(PregnancyClosed::new(
                close.pregnancy_id,
                birth.mother_id,
                PregnancyStatus::Birthed.to_string(),
            ));
        }
        if let Some(breeding) = &source_breeding {
            self.event_bus.emit(BreedingOutcomeResolved::new(
                breeding.id,
                breeding.female_id,
                true,
            ));
        }
        self.event_bus.emit(BirthRecorded::new(
            birth.id,
            birth.mother_id,
            birth.pregnancy_id,
            birth.offspring_count,
        ));

        Ok(birth)
    }

    /// Late offspring tagging as animals get registered.
    pub fn tag_offspring(&self, birth_id: Uuid, offspring_ids: &[Uuid]) -> AppResult<Birth> {
        let mut birth = self
            .birth_repo
            .get_by_id(birth_id)?
            .ok_or(AppError::NotFound)?;

        birth.tag_offspring(offspring_ids).map_err(AppError::Domain)?;
        self.birth_repo.update(&birth)?;

        Ok(birth)
    }

    /// Corrective note edit; the only other mutation a birth permits.
    pub fn amend_notes(&self, birth_id: Uuid, notes: Option<String>) -> AppResult<Birth> {
        let mut birth = self
            .birth_repo
            .get_by_id(birth_id)?
            .ok_or(AppError::NotFound)?;

        birth.amend_notes(notes);
        self.birth_repo.update(&birth)?;

        Ok(birth)
    }

    pub fn get(&self, birth_id: Uuid) -> AppResult<Option<Birth>> {
        self.birth_repo.get_by_id(birth_id)
    }

    pub fn list_by_mother(&self, mother_id: Uuid) -> AppResult<Vec<Birth>> {
        self.birth_repo.list_by_mother(mother_id)
    }
}
