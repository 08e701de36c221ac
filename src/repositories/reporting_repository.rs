// src/repositories/reporting_repository.rs
//
// Consistent-read snapshot for the aggregate reporter.
//
// All of the reporter's inputs come out of ONE read transaction so the
// derived counts can never straddle a concurrent write. WAL mode keeps
// this from blocking writers.

use chrono::{DateTime, Utc};
use rusqlite::params;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::estrus::EstrusDetection;
use crate::domain::pregnancy::Pregnancy;
use crate::error::AppResult;

use super::estrus_repository::SqliteEstrusRepository;
use super::pregnancy_repository::SqlitePregnancyRepository;

/// Everything the reporter derives from, read at one instant.
pub struct StoreSnapshot {
    /// Detections in a non-terminal state, most recent first
    pub open_estrus: Vec<EstrusDetection>,
    /// Active pregnancies, soonest expected birth first
    pub active_pregnancies: Vec<Pregnancy>,
    /// Lifetime count, or windowed when a range was given
    pub total_births: u32,
    /// Breedings whose outcome is still unknown
    pub pending_breedings: u32,
}

pub trait ReportingRepository: Send + Sync {
    fn snapshot(
        &self,
        births_window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> AppResult<StoreSnapshot>;

    /// Open detections for one animal, from the same snapshot shape.
    fn open_estrus_for_animal(&self, animal_id: Uuid) -> AppResult<Vec<EstrusDetection>>;
}

pub struct SqliteReportingRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteReportingRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

impl ReportingRepository for SqliteReportingRepository {
    fn snapshot(
        &self,
        births_window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> AppResult<StoreSnapshot> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let open_estrus = {
            let mut stmt = tx.prepare(
                "SELECT id, animal_id, species, detection_time, behaviors, confidence,
                        optimal_breeding_start, optimal_breeding_end, status, notified, notes,
                        created_at, updated_at
                 FROM estrus_detections
                 WHERE status IN ('detected', 'confirmed')
                 ORDER BY detection_time DESC",
            )?;
            let rows = stmt
                .query_map([], SqliteEstrusRepository::row_to_detection)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let active_pregnancies = {
            let mut stmt = tx.prepare(
                "SELECT id, animal_id, species, sire_id, breeding_date, expected_birth_date,
                        actual_birth_date, breeding_method, pregnancy_confirmed, confirmation_date,
                        confirmation_method, status, notes, created_at, updated_at
                 FROM pregnancies
                 WHERE status = 'active'
                 ORDER BY expected_birth_date ASC",
            )?;
            let rows = stmt
                .query_map([], SqlitePregnancyRepository::row_to_pregnancy)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let total_births: i64 = match births_window {
            Some((from, to)) => tx.query_row(
                "SELECT COUNT(*) FROM births WHERE birth_date >= ?1 AND birth_date <= ?2",
                params![from.to_rfc3339(), to.to_rfc3339()],
                |row| row.get(0),
            )?,
            None => tx.query_row("SELECT COUNT(*) FROM births", [], |row| row.get(0))?,
        };

        let pending_breedings: i64 = tx.query_row(
            "SELECT COUNT(*) FROM breeding_records WHERE success IS NULL",
            [],
            |row| row.get(0),
        )?;

        tx.commit()?;

        Ok(StoreSnapshot {
            open_estrus,
            active_pregnancies,
            total_births: total_births as u32,
            pending_breedings: pending_breedings as u32,
        })
    }

    fn open_estrus_for_animal(&self, animal_id: Uuid) -> AppResult<Vec<EstrusDetection>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, animal_id, species, detection_time, behaviors, confidence,
                    optimal_breeding_start, optimal_breeding_end, status, notified, notes,
                    created_at, updated_at
             FROM estrus_detections
             WHERE animal_id = ?1 AND status IN ('detected', 'confirmed')
             ORDER BY detection_time DESC",
        )?;

        let detections = stmt
            .query_map(
                params![animal_id.to_string()],
                SqliteEstrusRepository::row_to_detection,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(detections)
    }
}
