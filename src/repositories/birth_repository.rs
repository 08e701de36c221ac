// src/repositories/birth_repository.rs
//
// Birth persistence, including the atomic three-way close

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::birth::{Birth, BirthType};
use crate::error::{AppError, AppResult};

use super::estrus_repository::{parse_datetime, parse_opt_datetime, parse_opt_uuid, parse_uuid};

/// The pregnancy side of an atomic birth insert.
pub struct PregnancyClose {
    pub pregnancy_id: Uuid,
    pub birth_date: DateTime<Utc>,
}

pub trait BirthRepository: Send + Sync {
    /// Insert the birth and, when `close` is present: transition the
    /// referenced pregnancy to birthed with its actual birth date, and
    /// finalize any source breeding outcome still pending — all in one
    /// transaction. All three updates apply or none do. A false return
    /// means the pregnancy guard lost a concurrent race and nothing was
    /// written.
    fn insert_atomic(&self, birth: &Birth, close: Option<&PregnancyClose>) -> AppResult<bool>;

    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Birth>>;
    fn list_by_mother(&self, mother_id: Uuid) -> AppResult<Vec<Birth>>;
    fn list_all(&self) -> AppResult<Vec<Birth>>;
    fn count(&self, window: Option<(DateTime<Utc>, DateTime<Utc>)>) -> AppResult<u32>;

    /// Corrective note edits and late offspring tagging only.
    fn update(&self, birth: &Birth) -> AppResult<()>;
}

pub struct SqliteBirthRepository {
    pool: Arc<ConnectionPool>,
}

const SELECT_COLUMNS: &str = "id, mother_id, pregnancy_id, birth_date, offspring_count,
            offspring_ids, birth_type, birth_weight, complications, vet_assisted, vet_name,
            ai_predicted_at, ai_detected_at, notes, created_at, updated_at";

impl SqliteBirthRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    pub(crate) fn row_to_birth(row: &Row) -> Result<Birth, rusqlite::Error> {
        let type_str: String = row.get("birth_type")?;
        let birth_type = BirthType::parse(&type_str).ok_or(rusqlite::Error::InvalidQuery)?;

        let offspring_json: String = row.get("offspring_ids")?;
        let offspring_ids: Vec<Uuid> = serde_json::from_str(&offspring_json)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let offspring_count: i64 = row.get("offspring_count")?;

        Ok(Birth {
            id: parse_uuid(row, "id")?,
            mother_id: parse_uuid(row, "mother_id")?,
            pregnancy_id: parse_opt_uuid(row, "pregnancy_id")?,
            birth_date: parse_datetime(row, "birth_date")?,
            offspring_count: offspring_count as u32,
            offspring_ids,
            birth_type,
            birth_weight: row.get("birth_weight")?,
            complications: row.get("complications")?,
            vet_assisted: row.get("vet_assisted")?,
            vet_name: row.get("vet_name")?,
            ai_predicted_at: parse_opt_datetime(row, "ai_predicted_at")?,
            ai_detected_at: parse_opt_datetime(row, "ai_detected_at")?,
            notes: row.get("notes")?,
            created_at: parse_datetime(row, "created_at")?,
            updated_at: parse_datetime(row, "updated_at")?,
        })
    }
}

impl BirthRepository for SqliteBirthRepository {
    fn insert_atomic(&self, birth: &Birth, close: Option<&PregnancyClose>) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let offspring_json = serde_json::to_string(&birth.offspring_ids)?;

        tx.execute(
            "INSERT INTO births (
                id, mother_id, pregnancy_id, birth_date, offspring_count,
                offspring_ids, birth_type, birth_weight, complications, vet_assisted, vet_name,
                ai_predicted_at, ai_detected_at, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                birth.id.to_string(),
                birth.mother_id.to_string(),
                birth.pregnancy_id.map(|id| id.to_string()),
                birth.birth_date.to_rfc3339(),
                birth.offspring_count as i64,
                offspring_json,
                birth.birth_type.to_string(),
                birth.birth_weight,
                birth.complications,
                birth.vet_assisted,
                birth.vet_name,
                birth.ai_predicted_at.map(|dt| dt.to_rfc3339()),
                birth.ai_detected_at.map(|dt| dt.to_rfc3339()),
                birth.notes,
                birth.created_at.to_rfc3339(),
                birth.updated_at.to_rfc3339(),
            ],
        )?;

        if let Some(close) = close {
            let now = Utc::now().to_rfc3339();

            let rows = tx.execute(
                "UPDATE pregnancies
                 SET status = 'birthed', actual_birth_date = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = 'active'",
                params![
                    close.birth_date.to_rfc3339(),
                    now,
                    close.pregnancy_id.to_string(),
                ],
            )?;

            if rows == 0 {
                // Pregnancy transitioned concurrently; the birth insert
                // must not survive on its own
                tx.rollback()?;
                return Ok(false);
            }

            // A source breeding with a still-pending outcome is finalized
            // to success. Zero rows is normal (standalone pregnancy).
            tx.execute(
                "UPDATE breeding_records
                 SET success = 1, updated_at = ?1
                 WHERE pregnancy_id = ?2 AND success IS NULL",
                params![now, close.pregnancy_id.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(true)
    }

    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Birth>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM births WHERE id = ?1"
        ))?;

        match stmt.query_row(params![id.to_string()], Self::row_to_birth) {
            Ok(birth) => Ok(Some(birth)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::from(e)),
        }
    }

    fn list_by_mother(&self, mother_id: Uuid) -> AppResult<Vec<Birth>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM births
             WHERE mother_id = ?1
             ORDER BY birth_date DESC"
        ))?;

        let births = stmt
            .query_map(params![mother_id.to_string()], Self::row_to_birth)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(births)
    }

    fn list_all(&self) -> AppResult<Vec<Birth>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM births ORDER BY birth_date DESC"
        ))?;

        let births = stmt
            .query_map([], Self::row_to_birth)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(births)
    }

    fn count(&self, window: Option<(DateTime<Utc>, DateTime<Utc>)>) -> AppResult<u32> {
        let conn = self.pool.get()?;

        let count: i64 = match window {
            Some((from, to)) => conn.query_row(
                "SELECT COUNT(*) FROM births WHERE birth_date >= ?1 AND birth_date <= ?2",
                params![from.to_rfc3339(), to.to_rfc3339()],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM births", [], |row| row.get(0))?,
        };

        Ok(count as u32)
    }

    fn update(&self, birth: &Birth) -> AppResult<()> {
        let conn = self.pool.get()?;

        let offspring_json = serde_json::to_string(&birth.offspring_ids)?;

        let rows = conn.execute(
            "UPDATE births SET offspring_ids = ?1, notes = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                offspring_json,
                birth.notes,
                birth.updated_at.to_rfc3339(),
                birth.id.to_string(),
            ],
        )?;

        if rows == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }
}
