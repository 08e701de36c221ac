// src/services/estrus_service.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::estrus::{validate_estrus_detection, EstrusDetection, EstrusStatus};
use crate::domain::species::SpeciesProfiles;
use crate::domain::{temporal, DomainError};
use crate::error::{AppError, AppResult};
use crate::events::{EstrusClosed, EstrusConfirmed, EstrusDetected, EventBus};
use crate::repositories::EstrusRepository;
use crate::services::EngineConfig;

#[derive(Debug, Clone)]
pub struct RecordEstrusRequest {
    pub animal_id: Uuid,
    pub species: String,
    pub detection_time: DateTime<Utc>,
    /// Observed behavior name -> intensity score
    pub behaviors: serde_json::Value,
    pub confidence: f64,
    pub notes: Option<String>,
}

pub struct EstrusService {
    estrus_repo: Arc<dyn EstrusRepository>,
    profiles: Arc<SpeciesProfiles>,
    config: EngineConfig,
    event_bus: Arc<EventBus>,
}

impl EstrusService {
    pub fn new(
        estrus_repo: Arc<dyn EstrusRepository>,
        profiles: Arc<SpeciesProfiles>,
        config: EngineConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            estrus_repo,
            profiles,
            config,
            event_bus,
        }
    }

    /// Entry point for upstream detection events. Derives the optimal
    /// breeding window from the species profile at write time.
    pub fn record_detection(&self, request: RecordEstrusRequest) -> AppResult<EstrusDetection> {
        let profile = self.profiles.get(&request.species)?;
        let window = temporal::breeding_window(request.detection_time, profile);

        let mut detection = EstrusDetection::new(
            request.animal_id,
            request.species,
            request.detection_time,
            request.behaviors,
            request.confidence,
            window,
        );
        detection.notes = request.notes;

        validate_estrus_detection(&detection).map_err(AppError::Domain)?;
        self.estrus_repo.insert(&detection)?;

        self.event_bus.emit(EstrusDetected::new(
            detection.id,
            detection.animal_id,
            detection.confidence,
            detection.optimal_breeding_start,
            detection.optimal_breeding_end,
        ));

        Ok(detection)
    }

    /// Manual or AI confirmation. Below the confidence threshold an
    /// explicit override is required.
    pub fn confirm(
        &self,
        detection_id: Uuid,
        override_low_confidence: bool,
    ) -> AppResult<EstrusDetection> {
        let mut detection = self
            .estrus_repo
            .get_by_id(detection_id)?
            .ok_or(AppError::NotFound)?;

        if detection.confidence < self.config.confirmation_confidence_threshold
            && !override_low_confidence
        {
            return Err(AppError::Domain(DomainError::validation(
                "confidence",
                format!(
                    "confidence {:.2} is below the confirmation threshold {:.2}; confirm with an explicit override",
                    detection.confidence, self.config.confirmation_confidence_threshold
                ),
            )));
        }

        let expected = detection.status;
        detection.confirm().map_err(AppError::Domain)?;

        if !self.estrus_repo.update_guarded(&detection, expected)? {
            return Err(self.lost_race(detection_id, "confirmed"));
        }

        self.event_bus
            .emit(EstrusConfirmed::new(detection.id, detection.animal_id));

        Ok(detection)
    }

    /// Manual override: the detection was spurious. Terminal.
    pub fn mark_false_positive(&self, detection_id: Uuid) -> AppResult<EstrusDetection> {
        let mut detection = self
            .estrus_repo
            .get_by_id(detection_id)?
            .ok_or(AppError::NotFound)?;

        let expected = detection.status;
        detection.mark_false_positive().map_err(AppError::Domain)?;

        if !self.estrus_repo.update_guarded(&detection, expected)? {
            return Err(self.lost_race(detection_id, "false_positive"));
        }

        self.event_bus.emit(EstrusClosed::new(
            detection.id,
            detection.animal_id,
            detection.status.to_string(),
        ));

        Ok(detection)
    }

    /// The alert layer acknowledges notification delivery.
    pub fn mark_notified(&self, detection_id: Uuid) -> AppResult<EstrusDetection> {
        if !self.estrus_repo.set_notified(detection_id)? {
            return Err(AppError::NotFound);
        }
        self.estrus_repo
            .get_by_id(detection_id)?
            .ok_or(AppError::NotFound)
    }

    pub fn get(&self, detection_id: Uuid) -> AppResult<Option<EstrusDetection>> {
        self.estrus_repo.get_by_id(detection_id)
    }

    pub fn list_by_animal(&self, animal_id: Uuid) -> AppResult<Vec<EstrusDetection>> {
        self.estrus_repo.list_by_animal(animal_id)
    }

    /// Administrative purge of a detection record.
    pub fn purge(&self, detection_id: Uuid) -> AppResult<()> {
        self.estrus_repo.delete(detection_id)
    }

    /// A guarded update returned no rows: a concurrent transition won.
    /// Re-read so the error names the state that actually holds.
    fn lost_race(&self, detection_id: Uuid, requested: &str) -> AppError {
        let from = self
            .estrus_repo
            .get_by_id(detection_id)
            .ok()
            .flatten()
            .map(|d| d.status.to_string())
            .unwrap_or_else(|| "deleted".to_string());

        AppError::Domain(DomainError::InvalidTransition {
            entity: "estrus_detection",
            from,
            requested: requested.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use mockall::mock;
    use mockall::predicate::*;

    mock! {
        EstrusRepo {}

        impl EstrusRepository for EstrusRepo {
            fn insert(&self, detection: &EstrusDetection) -> AppResult<()>;
            fn get_by_id(&self, id: Uuid) -> AppResult<Option<EstrusDetection>>;
            fn list_by_animal(&self, animal_id: Uuid) -> AppResult<Vec<EstrusDetection>>;
            fn list_by_status(&self, status: EstrusStatus) -> AppResult<Vec<EstrusDetection>>;
            fn update_guarded(
                &self,
                detection: &EstrusDetection,
                expected_status: EstrusStatus,
            ) -> AppResult<bool>;
            fn set_notified(&self, id: Uuid) -> AppResult<bool>;
            fn delete(&self, id: Uuid) -> AppResult<()>;
        }
    }

    fn service(repo: MockEstrusRepo) -> EstrusService {
        EstrusService::new(
            Arc::new(repo),
            Arc::new(SpeciesProfiles::builtin()),
            EngineConfig::default(),
            Arc::new(EventBus::new()),
        )
    }

    fn request(confidence: f64) -> RecordEstrusRequest {
        RecordEstrusRequest {
            animal_id: Uuid::new_v4(),
            species: "cattle".to_string(),
            detection_time: Utc::now(),
            behaviors: serde_json::json!({"mounting": 0.8}),
            confidence,
            notes: None,
        }
    }

    #[test]
    fn test_unknown_species_is_configuration_error() {
        let repo = MockEstrusRepo::new();
        let svc = service(repo);

        let mut req = request(0.9);
        req.species = "llama".to_string();

        let err = svc.record_detection(req).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_invalid_confidence_never_reaches_storage() {
        // No insert expectation set: reaching the repo would panic
        let repo = MockEstrusRepo::new();
        let svc = service(repo);

        let err = svc.record_detection(request(1.5)).unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::Validation {
                field: "confidence",
                ..
            })
        ));
    }

    #[test]
    fn test_storage_unavailable_propagates_as_retryable() {
        let mut repo = MockEstrusRepo::new();
        repo.expect_insert()
            .returning(|_| Err(AppError::StorageUnavailable("busy".to_string())));
        let svc = service(repo);

        let err = svc.record_detection(request(0.9)).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_low_confidence_requires_override() {
        let mut repo = MockEstrusRepo::new();
        let req = request(0.4);
        let profile = SpeciesProfiles::builtin();
        let window =
            temporal::breeding_window(req.detection_time, profile.get("cattle").unwrap());
        let detection = EstrusDetection::new(
            req.animal_id,
            req.species.clone(),
            req.detection_time,
            req.behaviors.clone(),
            req.confidence,
            window,
        );
        let id = detection.id;

        repo.expect_get_by_id()
            .with(eq(id))
            .returning(move |_| Ok(Some(detection.clone())));
        repo.expect_update_guarded().returning(|_, _| Ok(true));

        let svc = service(repo);

        let err = svc.confirm(id, false).unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::Validation {
                field: "confidence",
                ..
            })
        ));

        let confirmed = svc.confirm(id, true).unwrap();
        assert_eq!(confirmed.status, EstrusStatus::Confirmed);
    }
}
