// src/repositories/breeding_repository.rs
//
// BreedingRecord persistence

use chrono::Utc;
use rusqlite::{params, Row};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::breeding::{BreedingMethod, BreedingRecord};
use crate::domain::estrus::{EstrusDetection, EstrusStatus};
use crate::error::{AppError, AppResult};

use super::estrus_repository::{parse_opt_uuid, parse_datetime, parse_uuid};

pub trait BreedingRepository: Send + Sync {
    /// Insert the record. When `estrus_transition` is present, the linked
    /// detection's `bred` transition is applied in the same transaction,
    /// guarded on its expected status; a false return means the guard lost
    /// a concurrent race and nothing was written.
    fn insert(
        &self,
        record: &BreedingRecord,
        estrus_transition: Option<(&EstrusDetection, EstrusStatus)>,
    ) -> AppResult<bool>;

    fn get_by_id(&self, id: Uuid) -> AppResult<Option<BreedingRecord>>;
    fn list_by_female(&self, female_id: Uuid) -> AppResult<Vec<BreedingRecord>>;
    fn list_pending(&self) -> AppResult<Vec<BreedingRecord>>;
    fn get_by_pregnancy(&self, pregnancy_id: Uuid) -> AppResult<Option<BreedingRecord>>;

    /// Write-once outcome resolution, guarded on `success IS NULL`.
    fn resolve_outcome_guarded(
        &self,
        id: Uuid,
        success: bool,
        pregnancy_id: Option<Uuid>,
    ) -> AppResult<bool>;
}

pub struct SqliteBreedingRepository {
    pool: Arc<ConnectionPool>,
}

const SELECT_COLUMNS: &str = "id, female_id, species, male_id, breeding_date, breeding_method,
            technician, semen_batch, estrus_detection_id, success, pregnancy_id, notes,
            created_at, updated_at";

impl SqliteBreedingRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    pub(crate) fn row_to_record(row: &Row) -> Result<BreedingRecord, rusqlite::Error> {
        let method_str: String = row.get("breeding_method")?;
        let breeding_method =
            BreedingMethod::parse(&method_str).ok_or(rusqlite::Error::InvalidQuery)?;

        let success: Option<i64> = row.get("success")?;

        Ok(BreedingRecord {
            id: parse_uuid(row, "id")?,
            female_id: parse_uuid(row, "female_id")?,
            species: row.get("species")?,
            male_id: parse_opt_uuid(row, "male_id")?,
            breeding_date: parse_datetime(row, "breeding_date")?,
            breeding_method,
            technician: row.get("technician")?,
            semen_batch: row.get("semen_batch")?,
            estrus_detection_id: parse_opt_uuid(row, "estrus_detection_id")?,
            success: success.map(|v| v != 0),
            pregnancy_id: parse_opt_uuid(row, "pregnancy_id")?,
            notes: row.get("notes")?,
            created_at: parse_datetime(row, "created_at")?,
            updated_at: parse_datetime(row, "updated_at")?,
        })
    }

    fn insert_row(conn: &rusqlite::Connection, record: &BreedingRecord) -> AppResult<()> {
        conn.execute(
            "INSERT INTO breeding_records (
                id, female_id, species, male_id, breeding_date, breeding_method,
                technician, semen_batch, estrus_detection_id, success, pregnancy_id, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.id.to_string(),
                record.female_id.to_string(),
                record.species,
                record.male_id.map(|id| id.to_string()),
                record.breeding_date.to_rfc3339(),
                record.breeding_method.to_string(),
                record.technician,
                record.semen_batch,
                record.estrus_detection_id.map(|id| id.to_string()),
                record.success.map(|v| v as i64),
                record.pregnancy_id.map(|id| id.to_string()),
                record.notes,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

impl BreedingRepository for SqliteBreedingRepository {
    fn insert(
        &self,
        record: &BreedingRecord,
        estrus_transition: Option<(&EstrusDetection, EstrusStatus)>,
    ) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        Self::insert_row(&tx, record)?;

        if let Some((detection, expected_status)) = estrus_transition {
            let rows = tx.execute(
                "UPDATE estrus_detections
                 SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = ?4",
                params![
                    detection.status.to_string(),
                    detection.updated_at.to_rfc3339(),
                    detection.id.to_string(),
                    expected_status.to_string(),
                ],
            )?;

            if rows == 0 {
                // Lost the race for the detection; drop the breeding too
                tx.rollback()?;
                return Ok(false);
            }
        }

        tx.commit()?;
        Ok(true)
    }

    fn get_by_id(&self, id: Uuid) -> AppResult<Option<BreedingRecord>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM breeding_records WHERE id = ?1"
        ))?;

        match stmt.query_row(params![id.to_string()], Self::row_to_record) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::from(e)),
        }
    }

    fn list_by_female(&self, female_id: Uuid) -> AppResult<Vec<BreedingRecord>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM breeding_records
             WHERE female_id = ?1
             ORDER BY breeding_date DESC"
        ))?;

        let records = stmt
            .query_map(params![female_id.to_string()], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn list_pending(&self) -> AppResult<Vec<BreedingRecord>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM breeding_records
             WHERE success IS NULL
             ORDER BY breeding_date DESC"
        ))?;

        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn get_by_pregnancy(&self, pregnancy_id: Uuid) -> AppResult<Option<BreedingRecord>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM breeding_records WHERE pregnancy_id = ?1"
        ))?;

        match stmt.query_row(params![pregnancy_id.to_string()], Self::row_to_record) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::from(e)),
        }
    }

    fn resolve_outcome_guarded(
        &self,
        id: Uuid,
        success: bool,
        pregnancy_id: Option<Uuid>,
    ) -> AppResult<bool> {
        let conn = self.pool.get()?;

        // pregnancy_id is write-once alongside success
        let rows = match pregnancy_id {
            Some(pid) => conn.execute(
                "UPDATE breeding_records
                 SET success = ?1, pregnancy_id = ?2, updated_at = ?3
                 WHERE id = ?4 AND success IS NULL AND pregnancy_id IS NULL",
                params![
                    success as i64,
                    pid.to_string(),
                    Utc::now().to_rfc3339(),
                    id.to_string(),
                ],
            )?,
            None => conn.execute(
                "UPDATE breeding_records
                 SET success = ?1, updated_at = ?2
                 WHERE id = ?3 AND success IS NULL",
                params![success as i64, Utc::now().to_rfc3339(), id.to_string()],
            )?,
        };

        Ok(rows > 0)
    }
}
