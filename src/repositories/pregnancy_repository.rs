// src/repositories/pregnancy_repository.rs
//
// Pregnancy persistence

use chrono::Utc;
use rusqlite::{params, Row};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::breeding::BreedingMethod;
use crate::domain::pregnancy::{ConfirmationMethod, Pregnancy, PregnancyStatus};
use crate::error::{AppError, AppResult};

use super::estrus_repository::{
    parse_datetime, parse_opt_datetime, parse_opt_uuid, parse_uuid,
};

pub trait PregnancyRepository: Send + Sync {
    fn insert(&self, pregnancy: &Pregnancy) -> AppResult<()>;

    /// Insert a confirmed pregnancy and resolve the source breeding's
    /// outcome to success in the same transaction. A false return means
    /// the breeding outcome was resolved concurrently and nothing was
    /// written.
    fn insert_confirmed_from_breeding(
        &self,
        pregnancy: &Pregnancy,
        breeding_id: Uuid,
    ) -> AppResult<bool>;

    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Pregnancy>>;
    fn list_by_animal(&self, animal_id: Uuid) -> AppResult<Vec<Pregnancy>>;
    fn list_by_status(&self, status: PregnancyStatus) -> AppResult<Vec<Pregnancy>>;

    /// Persist the pregnancy's mutable fields, but only while the stored
    /// status still equals `expected_status`.
    fn update_guarded(
        &self,
        pregnancy: &Pregnancy,
        expected_status: PregnancyStatus,
    ) -> AppResult<bool>;

    /// Administrative purge. Nulls Birth and BreedingRecord
    /// back-references and deletes the row atomically; never cascades.
    fn delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct SqlitePregnancyRepository {
    pool: Arc<ConnectionPool>,
}

const SELECT_COLUMNS: &str = "id, animal_id, species, sire_id, breeding_date, expected_birth_date,
            actual_birth_date, breeding_method, pregnancy_confirmed, confirmation_date,
            confirmation_method, status, notes, created_at, updated_at";

impl SqlitePregnancyRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    pub(crate) fn row_to_pregnancy(row: &Row) -> Result<Pregnancy, rusqlite::Error> {
        let method_str: String = row.get("breeding_method")?;
        let breeding_method =
            BreedingMethod::parse(&method_str).ok_or(rusqlite::Error::InvalidQuery)?;

        let status_str: String = row.get("status")?;
        let status =
            PregnancyStatus::parse(&status_str).ok_or(rusqlite::Error::InvalidQuery)?;

        let confirmation_str: Option<String> = row.get("confirmation_method")?;
        let confirmation_method = confirmation_str
            .map(|s| ConfirmationMethod::parse(&s).ok_or(rusqlite::Error::InvalidQuery))
            .transpose()?;

        Ok(Pregnancy {
            id: parse_uuid(row, "id")?,
            animal_id: parse_uuid(row, "animal_id")?,
            species: row.get("species")?,
            sire_id: parse_opt_uuid(row, "sire_id")?,
            breeding_date: parse_datetime(row, "breeding_date")?,
            expected_birth_date: parse_datetime(row, "expected_birth_date")?,
            actual_birth_date: parse_opt_datetime(row, "actual_birth_date")?,
            breeding_method,
            pregnancy_confirmed: row.get("pregnancy_confirmed")?,
            confirmation_date: parse_opt_datetime(row, "confirmation_date")?,
            confirmation_method,
            status,
            notes: row.get("notes")?,
            created_at: parse_datetime(row, "created_at")?,
            updated_at: parse_datetime(row, "updated_at")?,
        })
    }

    fn insert_row(conn: &rusqlite::Connection, pregnancy: &Pregnancy) -> AppResult<()> {
        conn.execute(
            "INSERT INTO pregnancies (
                id, animal_id, species, sire_id, breeding_date, expected_birth_date,
                actual_birth_date, breeding_method, pregnancy_confirmed, confirmation_date,
                confirmation_method, status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                pregnancy.id.to_string(),
                pregnancy.animal_id.to_string(),
                pregnancy.species,
                pregnancy.sire_id.map(|id| id.to_string()),
                pregnancy.breeding_date.to_rfc3339(),
                pregnancy.expected_birth_date.to_rfc3339(),
                pregnancy.actual_birth_date.map(|dt| dt.to_rfc3339()),
                pregnancy.breeding_method.to_string(),
                pregnancy.pregnancy_confirmed,
                pregnancy.confirmation_date.map(|dt| dt.to_rfc3339()),
                pregnancy.confirmation_method.map(|m| m.to_string()),
                pregnancy.status.to_string(),
                pregnancy.notes,
                pregnancy.created_at.to_rfc3339(),
                pregnancy.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

impl PregnancyRepository for SqlitePregnancyRepository {
    fn insert(&self, pregnancy: &Pregnancy) -> AppResult<()> {
        let conn = self.pool.get()?;
        Self::insert_row(&conn, pregnancy)
    }

    fn insert_confirmed_from_breeding(
        &self,
        pregnancy: &Pregnancy,
        breeding_id: Uuid,
    ) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        Self::insert_row(&tx, pregnancy)?;

        let rows = tx.execute(
            "UPDATE breeding_records
             SET success = 1, pregnancy_id = ?1, updated_at = ?2
             WHERE id = ?3 AND success IS NULL AND pregnancy_id IS NULL",
            params![
                pregnancy.id.to_string(),
                Utc::now().to_rfc3339(),
                breeding_id.to_string(),
            ],
        )?;

        if rows == 0 {
            tx.rollback()?;
            return Ok(false);
        }

        tx.commit()?;
        Ok(true)
    }

    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Pregnancy>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM pregnancies WHERE id = ?1"
        ))?;

        match stmt.query_row(params![id.to_string()], Self::row_to_pregnancy) {
            Ok(pregnancy) => Ok(Some(pregnancy)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::from(e)),
        }
    }

    fn list_by_animal(&self, animal_id: Uuid) -> AppResult<Vec<Pregnancy>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM pregnancies
             WHERE animal_id = ?1
             ORDER BY breeding_date DESC"
        ))?;

        let pregnancies = stmt
            .query_map(params![animal_id.to_string()], Self::row_to_pregnancy)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pregnancies)
    }

    fn list_by_status(&self, status: PregnancyStatus) -> AppResult<Vec<Pregnancy>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM pregnancies
             WHERE status = ?1
             ORDER BY breeding_date DESC"
        ))?;

        let pregnancies = stmt
            .query_map(params![status.to_string()], Self::row_to_pregnancy)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pregnancies)
    }

    fn update_guarded(
        &self,
        pregnancy: &Pregnancy,
        expected_status: PregnancyStatus,
    ) -> AppResult<bool> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE pregnancies
             SET actual_birth_date = ?1, pregnancy_confirmed = ?2, confirmation_date = ?3,
                 confirmation_method = ?4, status = ?5, notes = ?6, updated_at = ?7
             WHERE id = ?8 AND status = ?9",
            params![
                pregnancy.actual_birth_date.map(|dt| dt.to_rfc3339()),
                pregnancy.pregnancy_confirmed,
                pregnancy.confirmation_date.map(|dt| dt.to_rfc3339()),
                pregnancy.confirmation_method.map(|m| m.to_string()),
                pregnancy.status.to_string(),
                pregnancy.notes,
                pregnancy.updated_at.to_rfc3339(),
                pregnancy.id.to_string(),
                expected_status.to_string(),
            ],
        )?;

        Ok(rows > 0)
    }

    fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let now = Utc::now().to_rfc3339();

        // Historical records survive the purge with the reference nulled
        tx.execute(
            "UPDATE births SET pregnancy_id = NULL, updated_at = ?1 WHERE pregnancy_id = ?2",
            params![now, id.to_string()],
        )?;
        tx.execute(
            "UPDATE breeding_records SET pregnancy_id = NULL, updated_at = ?1 WHERE pregnancy_id = ?2",
            params![now, id.to_string()],
        )?;

        let rows = tx.execute("DELETE FROM pregnancies WHERE id = ?1", params![id.to_string()])?;

        if rows == 0 {
            tx.rollback()?;
            return Err(AppError::NotFound);
        }

        tx.commit()?;
        Ok(())
    }
}
