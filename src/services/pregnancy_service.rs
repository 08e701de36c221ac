// src/services/pregnancy_service.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::breeding::BreedingMethod;
use crate::domain::pregnancy::{
    validate_pregnancy, ConfirmationMethod, Pregnancy, PregnancyStatus,
};
use crate::domain::species::SpeciesProfiles;
use crate::domain::{temporal, DomainError};
use crate::error::{AppError, AppResult};
use crate::events::{
    BreedingOutcomeResolved, EventBus, PregnancyClosed, PregnancyConfirmed, PregnancyRecorded,
};
use crate::repositories::{BreedingRepository, PregnancyRepository};

/// Optimistic pregnancy creation at breeding time, before confirmation.
#[derive(Debug, Clone)]
pub struct RecordPregnancyRequest {
    pub animal_id: Uuid,
    pub species: String,
    pub sire_id: Option<Uuid>,
    pub breeding_date: DateTime<Utc>,
    pub breeding_method: BreedingMethod,
    pub notes: Option<String>,
}

/// Where a confirmed pregnancy comes from.
#[derive(Debug, Clone)]
pub enum PregnancySource {
    /// From a logged breeding: the breeding's outcome resolves to success
    /// and its forward-reference is set, atomically with the insert.
    FromBreeding { breeding_id: Uuid },
    /// Standalone: the pregnancy was found without a tracked breeding.
    Standalone {
        animal_id: Uuid,
        species: String,
        sire_id: Option<Uuid>,
        breeding_date: DateTime<Utc>,
        breeding_method: BreedingMethod,
    },
}

#[derive(Debug, Clone)]
pub struct ConfirmPregnancyRequest {
    pub source: PregnancySource,
    pub confirmation_method: ConfirmationMethod,
    pub confirmation_date: DateTime<Utc>,
    pub notes: Option<String>,
}

pub struct PregnancyService {
    pregnancy_repo: Arc<dyn PregnancyRepository>,
    breeding_repo: Arc<dyn BreedingRepository>,
    profiles: Arc<SpeciesProfiles>,
    event_bus: Arc<EventBus>,
}

impl PregnancyService {
    pub fn new(
        pregnancy_repo: Arc<dyn PregnancyRepository>,
        breeding_repo: Arc<dyn BreedingRepository>,
        profiles: Arc<SpeciesProfiles>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            pregnancy_repo,
            breeding_repo,
            profiles,
            event_bus,
        }
    }

    /// Create an active, unconfirmed pregnancy. The expected birth date
    /// is derived from the species gestation length and fixed here.
    pub fn record_pregnancy(&self, request: RecordPregnancyRequest) -> AppResult<Pregnancy> {
        let profile = self.profiles.get(&request.species)?;
        let expected = temporal::expected_birth_date(request.breeding_date, profile);

        let mut pregnancy = Pregnancy::new(
            request.animal_id,
            request.species.clone(),
            request.sire_id,
            request.breeding_date,
            expected,
            request.breeding_method,
        );
        pregnancy.notes = request.notes;

        validate_pregnancy(&pregnancy, profile).map_err(AppError::Domain)?;
        self.pregnancy_repo.insert(&pregnancy)?;

        self.event_bus.emit(PregnancyRecorded::new(
            pregnancy.id,
            pregnancy.animal_id,
            pregnancy.expected_birth_date,
        ));

        Ok(pregnancy)
    }

    /// Create a confirmed pregnancy, either from a pending breeding
    /// (resolving its outcome in the same transaction) or standalone.
    pub fn confirm_pregnancy(&self, request: ConfirmPregnancyRequest) -> AppResult<Pregnancy> {
        match request.source {
            PregnancySource::FromBreeding { breeding_id } => {
                let breeding = self.breeding_repo.get_by_id(breeding_id)?.ok_or_else(|| {
                    AppError::Domain(DomainError::validation(
                        "breeding_id",
                        format!("breeding {} does not exist", breeding_id),
                    ))
                })?;

                if breeding.pregnancy_id.is_some() {
                    return Err(AppError::Domain(DomainError::validation(
                        "pregnancy_id",
                        "breeding already references a confirmed pregnancy",
                    )));
                }
                if breeding.success.is_some() {
                    return Err(AppError::Domain(DomainError::validation(
                        "success",
                        "breeding outcome is already resolved; record the pregnancy standalone instead",
                    )));
                }

                let profile = self.profiles.get(&breeding.species)?;
                let expected = temporal::expected_birth_date(breeding.breeding_date, profile);

                let mut pregnancy = Pregnancy::new(
                    breeding.female_id,
                    breeding.species.clone(),
                    breeding.male_id,
                    breeding.breeding_date,
                    expected,
                    breeding.breeding_method,
                );
                pregnancy
                    .confirm(request.confirmation_method, request.confirmation_date)
                    .map_err(AppError::Domain)?;
                pregnancy.notes = request.notes;

                validate_pregnancy(&pregnancy, profile).map_err(AppError::Domain)?;

                if !self
                    .pregnancy_repo
                    .insert_confirmed_from_breeding(&pregnancy, breeding_id)?
                {
                    return Err(AppError::Domain(DomainError::validation(
                        "success",
                        "breeding outcome was resolved concurrently",
                    )));
                }

                self.event_bus.emit(BreedingOutcomeResolved::new(
                    breeding.id,
                    breeding.female_id,
                    true,
                ));
                self.event_bus.emit(PregnancyConfirmed::new(
                    pregnancy.id,
                    pregnancy.animal_id,
                    pregnancy.expected_birth_date,
                ));

                Ok(pregnancy)
            }
            PregnancySource::Standalone {
                animal_id,
                species,
                sire_id,
                breeding_date,
                breeding_method,
            } => {
                let profile = self.profiles.get(&species)?;
                let expected = temporal::expected_birth_date(breeding_date, profile);

                let mut pregnancy = Pregnancy::new(
                    animal_id,
                    species.clone(),
                    sire_id,
                    breeding_date,
                    expected,
                    breeding_method,
                );
                pregnancy
                    .confirm(request.confirmation_method, request.confirmation_date)
                    .map_err(AppError::Domain)?;
                pregnancy.notes = request.notes;

                validate_pregnancy(&pregnancy, profile).map_err(AppError::Domain)?;
                self.pregnancy_repo.insert(&pregnancy)?;

                self.event_bus.emit(PregnancyConfirmed::new(
                    pregnancy.id,
                    pregnancy.animal_id,
                    pregnancy.expected_birth_date,
                ));

                Ok(pregnancy)
            }
        }
    }

    /// Flip the confirmation flag on an existing pregnancy. Orthogonal to
    /// status; the expected birth date never moves.
    pub fn confirm_existing(
        &self,
        pregnancy_id: Uuid,
        method: ConfirmationMethod,
        date: DateTime<Utc>,
    ) -> AppResult<Pregnancy> {
        let mut pregnancy = self
            .pregnancy_repo
            .get_by_id(pregnancy_id)?
            .ok_or(AppError::NotFound)?;

        let expected = pregnancy.status;
        pregnancy.confirm(method, date).map_err(AppError::Domain)?;

        if !self.pregnancy_repo.update_guarded(&pregnancy, expected)? {
            return Err(self.lost_race(pregnancy_id, "confirmed"));
        }

        self.event_bus.emit(PregnancyConfirmed::new(
            pregnancy.id,
            pregnancy.animal_id,
            pregnancy.expected_birth_date,
        ));

        Ok(pregnancy)
    }

    /// Manual terminal close; the reason lands in notes.
    pub fn mark_miscarried(&self, pregnancy_id: Uuid, reason: &str) -> AppResult<Pregnancy> {
        self.close(pregnancy_id, reason, Pregnancy::mark_miscarried)
    }

    /// Manual terminal close, e.g. a data-entry correction.
    pub fn cancel(&self, pregnancy_id: Uuid, reason: &str) -> AppResult<Pregnancy> {
        self.close(pregnancy_id, reason, Pregnancy::cancel)
    }

    /// Administrative purge. An active pregnancy must be cancelled first;
    /// Birth and BreedingRecord back-references are nulled, not cascaded.
    pub fn delete(&self, pregnancy_id: Uuid) -> AppResult<()> {
        let pregnancy = self
            .pregnancy_repo
            .get_by_id(pregnancy_id)?
            .ok_or(AppError::NotFound)?;

        if pregnancy.status == PregnancyStatus::Active {
            return Err(AppError::Domain(DomainError::validation(
                "status",
                "cannot delete an active pregnancy; cancel it first",
            )));
        }

        self.pregnancy_repo.delete(pregnancy_id)
    }

    pub fn get(&self, pregnancy_id: Uuid) -> AppResult<Option<Pregnancy>> {
        self.pregnancy_repo.get_by_id(pregnancy_id)
    }

    pub fn list_by_animal(&self, animal_id: Uuid) -> AppResult<Vec<Pregnancy>> {
        self.pregnancy_repo.list_by_animal(animal_id)
    }

    fn close(
        &self,
        pregnancy_id: Uuid,
        reason: &str,
        transition: impl Fn(&mut Pregnancy, &str) -> crate::domain::DomainResult<()>,
    ) -> AppResult<Pregnancy> {
        let mut pregnancy = self
            .pregnancy_repo
            .get_by_id(pregnancy_id)?
            .ok_or(AppError::NotFound)?;

        let expected = pregnancy.status;
        transition(&mut pregnancy, reason).map_err(AppError::Domain)?;

        if !self.pregnancy_repo.update_guarded(&pregnancy, expected)? {
            return Err(self.lost_race(pregnancy_id, &pregnancy.status.to_string()));
        }

        self.event_bus.emit(PregnancyClosed::new(
            pregnancy.id,
            pregnancy.animal_id,
            pregnancy.status.to_string(),
        ));

        Ok(pregnancy)
    }

    fn lost_race(&self, pregnancy_id: Uuid, requested: &str) -> AppError {
        let from = self
            .pregnancy_repo
            .get_by_id(pregnancy_id)
            .ok()
            .flatten()
            .map(|p| p.status.to_string())
            .unwrap_or_else(|| "deleted".to_string());

        AppError::Domain(DomainError::InvalidTransition {
            entity: "pregnancy",
            from,
            requested: requested.to_string(),
        })
    }
}
