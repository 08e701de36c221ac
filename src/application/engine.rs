// src/application/engine.rs
//
// ReproductionEngine - wiring and external interface
//
// The engine owns the pool, repositories, services, event bus and species
// profiles, and exposes the operations application code consumes. All
// fields are Arc-wrapped for thread-safe sharing.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{create_connection_pool, create_file_pool, initialize_database, ConnectionPool};
use crate::domain::birth::Birth;
use crate::domain::breeding::BreedingRecord;
use crate::domain::estrus::EstrusDetection;
use crate::domain::pregnancy::{ConfirmationMethod, Pregnancy};
use crate::domain::species::SpeciesProfiles;
use crate::error::AppResult;
use crate::events::EventBus;
use crate::repositories::{
    SqliteBirthRepository, SqliteBreedingRepository, SqliteEstrusRepository,
    SqlitePregnancyRepository, SqliteReportingRepository,
};
use crate::services::{
    BirthService, BreedingService, ConfirmPregnancyRequest, DueSoonEntry, EngineConfig,
    EstrusService, LifecycleSweep, LifecycleSweeper, PregnancyService, RecordBirthRequest,
    RecordBreedingRequest, RecordEstrusRequest, RecordPregnancyRequest, ReportingService,
    ReproductionSummary, SweepConfig, SweepOutcome,
};

pub struct ReproductionEngine {
    pub event_bus: Arc<EventBus>,
    pub estrus_service: Arc<EstrusService>,
    pub breeding_service: Arc<BreedingService>,
    pub pregnancy_service: Arc<PregnancyService>,
    pub birth_service: Arc<BirthService>,
    pub reporting_service: Arc<ReportingService>,
    sweep: Arc<LifecycleSweep>,
    sweeper: LifecycleSweeper,
}

impl ReproductionEngine {
    /// Open the engine over the default application database.
    pub fn open_default(profiles: SpeciesProfiles, config: EngineConfig) -> AppResult<Self> {
        let pool = create_connection_pool()?;
        Self::with_pool(Arc::new(pool), profiles, config, SweepConfig::default())
    }

    /// Open the engine over an explicit database file.
    pub fn open(
        db_path: &Path,
        profiles: SpeciesProfiles,
        config: EngineConfig,
    ) -> AppResult<Self> {
        let pool = create_file_pool(db_path)?;
        Self::with_pool(Arc::new(pool), profiles, config, SweepConfig::default())
    }

    /// Wire repositories and services over an existing pool.
    pub fn with_pool(
        pool: Arc<ConnectionPool>,
        profiles: SpeciesProfiles,
        config: EngineConfig,
        sweep_config: SweepConfig,
    ) -> AppResult<Self> {
        {
            let conn = pool.get()?;
            initialize_database(&conn)?;
        }

        let event_bus = Arc::new(EventBus::new());
        let profiles = Arc::new(profiles);

        let estrus_repo = Arc::new(SqliteEstrusRepository::new(pool.clone()));
        let breeding_repo = Arc::new(SqliteBreedingRepository::new(pool.clone()));
        let pregnancy_repo = Arc::new(SqlitePregnancyRepository::new(pool.clone()));
        let birth_repo = Arc::new(SqliteBirthRepository::new(pool.clone()));
        let reporting_repo = Arc::new(SqliteReportingRepository::new(pool.clone()));

        let estrus_service = Arc::new(EstrusService::new(
            estrus_repo.clone(),
            profiles.clone(),
            config.clone(),
            event_bus.clone(),
        ));
        let breeding_service = Arc::new(BreedingService::new(
            breeding_repo.clone(),
            estrus_repo.clone(),
            profiles.clone(),
            event_bus.clone(),
        ));
        let pregnancy_service = Arc::new(PregnancyService::new(
            pregnancy_repo.clone(),
            breeding_repo.clone(),
            profiles.clone(),
            event_bus.clone(),
        ));
        let birth_service = Arc::new(BirthService::new(
            birth_repo,
            pregnancy_repo,
            breeding_repo.clone(),
            event_bus.clone(),
        ));
        let reporting_service = Arc::new(ReportingService::new(reporting_repo, config));

        let sweep = Arc::new(LifecycleSweep::new(
            estrus_repo,
            breeding_repo,
            profiles,
            event_bus.clone(),
        ));
        let sweeper = LifecycleSweeper::new(sweep.clone(), sweep_config);

        Ok(Self {
            event_bus,
            estrus_service,
            breeding_service,
            pregnancy_service,
            birth_service,
            reporting_service,
            sweep,
            sweeper,
        })
    }

    // ------------------------------------------------------------------
    // Estrus
    // ------------------------------------------------------------------

    pub fn record_estrus_detection(
        &self,
        request: RecordEstrusRequest,
    ) -> AppResult<EstrusDetection> {
        self.estrus_service.record_detection(request)
    }

    pub fn confirm_estrus(
        &self,
        detection_id: Uuid,
        override_low_confidence: bool,
    ) -> AppResult<EstrusDetection> {
        self.estrus_service
            .confirm(detection_id, override_low_confidence)
    }

    pub fn mark_false_positive(&self, detection_id: Uuid) -> AppResult<EstrusDetection> {
        self.estrus_service.mark_false_positive(detection_id)
    }

    pub fn mark_estrus_notified(&self, detection_id: Uuid) -> AppResult<EstrusDetection> {
        self.estrus_service.mark_notified(detection_id)
    }

    // ------------------------------------------------------------------
    // Breeding
    // ------------------------------------------------------------------

    pub fn record_breeding(&self, request: RecordBreedingRequest) -> AppResult<BreedingRecord> {
        self.breeding_service.record_breeding(request)
    }

    // ------------------------------------------------------------------
    // Pregnancy
    // ------------------------------------------------------------------

    pub fn record_pregnancy(&self, request: RecordPregnancyRequest) -> AppResult<Pregnancy> {
        self.pregnancy_service.record_pregnancy(request)
    }

    pub fn confirm_pregnancy(&self, request: ConfirmPregnancyRequest) -> AppResult<Pregnancy> {
        self.pregnancy_service.confirm_pregnancy(request)
    }

    pub fn confirm_existing_pregnancy(
        &self,
        pregnancy_id: Uuid,
        method: ConfirmationMethod,
        date: DateTime<Utc>,
    ) -> AppResult<Pregnancy> {
        self.pregnancy_service
            .confirm_existing(pregnancy_id, method, date)
    }

    pub fn mark_miscarried(&self, pregnancy_id: Uuid, reason: &str) -> AppResult<Pregnancy> {
        self.pregnancy_service.mark_miscarried(pregnancy_id, reason)
    }

    pub fn cancel_pregnancy(&self, pregnancy_id: Uuid, reason: &str) -> AppResult<Pregnancy> {
        self.pregnancy_service.cancel(pregnancy_id, reason)
    }

    pub fn delete_pregnancy(&self, pregnancy_id: Uuid) -> AppResult<()> {
        self.pregnancy_service.delete(pregnancy_id)
    }

    // ------------------------------------------------------------------
    // Birth
    // ------------------------------------------------------------------

    pub fn record_birth(&self, request: RecordBirthRequest) -> AppResult<Birth> {
        self.birth_service.record_birth(request)
    }

    pub fn tag_offspring(&self, birth_id: Uuid, offspring_ids: &[Uuid]) -> AppResult<Birth> {
        self.birth_service.tag_offspring(birth_id, offspring_ids)
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    pub fn get_summary(&self, now: DateTime<Utc>) -> AppResult<ReproductionSummary> {
        self.reporting_service.summary(now)
    }

    pub fn list_due_soon(
        &self,
        now: DateTime<Utc>,
        within_days: i64,
    ) -> AppResult<Vec<DueSoonEntry>> {
        self.reporting_service.list_due_soon(now, within_days)
    }

    pub fn list_active_estrus(&self) -> AppResult<Vec<EstrusDetection>> {
        self.reporting_service.list_active_estrus()
    }

    // ------------------------------------------------------------------
    // Sweep
    // ------------------------------------------------------------------

    /// Run one sweep pass now, outside the background schedule.
    pub fn run_sweep(&self, now: DateTime<Utc>) -> AppResult<SweepOutcome> {
        self.sweep.run_once(now)
    }

    pub fn start_sweeper(&self) {
        self.sweeper.start();
    }

    pub fn stop_sweeper(&self) {
        self.sweeper.stop();
    }
}
