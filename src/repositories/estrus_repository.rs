// src/repositories/estrus_repository.rs
//
// EstrusDetection persistence

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::estrus::{EstrusDetection, EstrusStatus};
use crate::error::{AppError, AppResult};

pub trait EstrusRepository: Send + Sync {
    fn insert(&self, detection: &EstrusDetection) -> AppResult<()>;
    fn get_by_id(&self, id: Uuid) -> AppResult<Option<EstrusDetection>>;
    fn list_by_animal(&self, animal_id: Uuid) -> AppResult<Vec<EstrusDetection>>;
    fn list_by_status(&self, status: EstrusStatus) -> AppResult<Vec<EstrusDetection>>;

    /// Persist the detection's mutable fields, but only while the stored
    /// status still equals `expected_status`. Returns whether the write
    /// won; a false return means a concurrent transition got there first.
    fn update_guarded(
        &self,
        detection: &EstrusDetection,
        expected_status: EstrusStatus,
    ) -> AppResult<bool>;

    /// Notification delivery flag; orthogonal to status, so no guard.
    fn set_notified(&self, id: Uuid) -> AppResult<bool>;

    /// Administrative purge only.
    fn delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct SqliteEstrusRepository {
    pool: Arc<ConnectionPool>,
}

const SELECT_COLUMNS: &str = "id, animal_id, species, detection_time, behaviors, confidence,
            optimal_breeding_start, optimal_breeding_end, status, notified, notes,
            created_at, updated_at";

impl SqliteEstrusRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Map database row to EstrusDetection - returns rusqlite::Error for
    /// query_map compatibility
    pub(crate) fn row_to_detection(row: &Row) -> Result<EstrusDetection, rusqlite::Error> {
        let behaviors_json: String = row.get("behaviors")?;
        let behaviors: serde_json::Value = serde_json::from_str(&behaviors_json)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let status_str: String = row.get("status")?;
        let status =
            EstrusStatus::parse(&status_str).ok_or(rusqlite::Error::InvalidQuery)?;

        Ok(EstrusDetection {
            id: parse_uuid(row, "id")?,
            animal_id: parse_uuid(row, "animal_id")?,
            species: row.get("species")?,
            detection_time: parse_datetime(row, "detection_time")?,
            behaviors,
            confidence: row.get("confidence")?,
            optimal_breeding_start: parse_datetime(row, "optimal_breeding_start")?,
            optimal_breeding_end: parse_datetime(row, "optimal_breeding_end")?,
            status,
            notified: row.get("notified")?,
            notes: row.get("notes")?,
            created_at: parse_datetime(row, "created_at")?,
            updated_at: parse_datetime(row, "updated_at")?,
        })
    }
}

impl EstrusRepository for SqliteEstrusRepository {
    fn insert(&self, detection: &EstrusDetection) -> AppResult<()> {
        let conn = self.pool.get()?;
        let behaviors_json = serde_json::to_string(&detection.behaviors)?;

        conn.execute(
            "INSERT INTO estrus_detections (
                id, animal_id, species, detection_time, behaviors, confidence,
                optimal_breeding_start, optimal_breeding_end, status, notified, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                detection.id.to_string(),
                detection.animal_id.to_string(),
                detection.species,
                detection.detection_time.to_rfc3339(),
                behaviors_json,
                detection.confidence,
                detection.optimal_breeding_start.to_rfc3339(),
                detection.optimal_breeding_end.to_rfc3339(),
                detection.status.to_string(),
                detection.notified,
                detection.notes,
                detection.created_at.to_rfc3339(),
                detection.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn get_by_id(&self, id: Uuid) -> AppResult<Option<EstrusDetection>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM estrus_detections WHERE id = ?1"
        ))?;

        match stmt.query_row(params![id.to_string()], Self::row_to_detection) {
            Ok(detection) => Ok(Some(detection)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::from(e)),
        }
    }

    fn list_by_animal(&self, animal_id: Uuid) -> AppResult<Vec<EstrusDetection>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM estrus_detections
             WHERE animal_id = ?1
             ORDER BY detection_time DESC"
        ))?;

        let detections = stmt
            .query_map(params![animal_id.to_string()], Self::row_to_detection)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(detections)
    }

    fn list_by_status(&self, status: EstrusStatus) -> AppResult<Vec<EstrusDetection>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM estrus_detections
             WHERE status = ?1
             ORDER BY detection_time DESC"
        ))?;

        let detections = stmt
            .query_map(params![status.to_string()], Self::row_to_detection)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(detections)
    }

    fn update_guarded(
        &self,
        detection: &EstrusDetection,
        expected_status: EstrusStatus,
    ) -> AppResult<bool> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE estrus_detections
             SET status = ?1, notified = ?2, notes = ?3, updated_at = ?4
             WHERE id = ?5 AND status = ?6",
            params![
                detection.status.to_string(),
                detection.notified,
                detection.notes,
                detection.updated_at.to_rfc3339(),
                detection.id.to_string(),
                expected_status.to_string(),
            ],
        )?;

        Ok(rows > 0)
    }

    fn set_notified(&self, id: Uuid) -> AppResult<bool> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE estrus_detections SET notified = 1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )?;

        Ok(rows > 0)
    }

    fn delete(&self, id: Uuid) -> AppResult<()> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "DELETE FROM estrus_detections WHERE id = ?1",
            params![id.to_string()],
        )?;

        if rows == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }
}

pub(crate) fn parse_uuid(row: &Row, column: &str) -> Result<Uuid, rusqlite::Error> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

pub(crate) fn parse_opt_uuid(row: &Row, column: &str) -> Result<Option<Uuid>, rusqlite::Error> {
    let text: Option<String> = row.get(column)?;
    text.map(|s| {
        Uuid::parse_str(&s).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
    })
    .transpose()
}

pub(crate) fn parse_datetime(row: &Row, column: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    let text: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

pub(crate) fn parse_opt_datetime(
    row: &Row,
    column: &str,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    let text: Option<String> = row.get(column)?;
    text.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
    })
    .transpose()
}
