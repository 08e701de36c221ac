// src/services/reporting_service.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::estrus::EstrusDetection;
use crate::domain::pregnancy::Pregnancy;
use crate::domain::temporal::{self, DueSeverity};
use crate::error::AppResult;
use crate::repositories::ReportingRepository;
use crate::services::EngineConfig;

/// The summary counts the dashboard displays. All five values come from
/// one consistent read of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReproductionSummary {
    /// Detections in status detected or confirmed
    pub active_estrus: u32,
    pub active_pregnancies: u32,
    /// Active pregnancies within the due-soon threshold
    pub due_soon: u32,
    pub total_births: u32,
    /// Breedings whose outcome is still unknown
    pub pending_breedings: u32,
}

/// An active pregnancy nearing its expected birth date.
#[derive(Debug, Clone, Serialize)]
pub struct DueSoonEntry {
    pub pregnancy: Pregnancy,
    pub days_remaining: i64,
    /// Display bucketing only; never drives a transition
    pub severity: DueSeverity,
}

pub struct ReportingService {
    reporting_repo: Arc<dyn ReportingRepository>,
    config: EngineConfig,
}

impl ReportingService {
    pub fn new(reporting_repo: Arc<dyn ReportingRepository>, config: EngineConfig) -> Self {
        Self {
            reporting_repo,
            config,
        }
    }

    /// Summary counts as of `now`, lifetime birth count.
    pub fn summary(&self, now: DateTime<Utc>) -> AppResult<ReproductionSummary> {
        self.summary_inner(now, None)
    }

    /// Summary counts with the birth count restricted to a window.
    pub fn summary_windowed(
        &self,
        now: DateTime<Utc>,
        births_window: (DateTime<Utc>, DateTime<Utc>),
    ) -> AppResult<ReproductionSummary> {
        self.summary_inner(now, Some(births_window))
    }

    /// Active pregnancies due within `within_days`, soonest first.
    pub fn list_due_soon(
        &self,
        now: DateTime<Utc>,
        within_days: i64,
    ) -> AppResult<Vec<DueSoonEntry>> {
        let snapshot = self.reporting_repo.snapshot(None)?;

        let entries = snapshot
            .active_pregnancies
            .into_iter()
            .filter_map(|pregnancy| {
                let days = temporal::days_remaining(pregnancy.expected_birth_date, now);
                if days <= within_days {
                    Some(DueSoonEntry {
                        severity: temporal::due_severity(days),
                        days_remaining: days,
                        pregnancy,
                    })
                } else {
                    None
                }
            })
            .collect();

        Ok(entries)
    }

    /// Detections still awaiting confirmation or breeding, most recent
    /// first.
    pub fn list_active_estrus(&self) -> AppResult<Vec<EstrusDetection>> {
        Ok(self.reporting_repo.snapshot(None)?.open_estrus)
    }

    pub fn list_active_estrus_for_animal(
        &self,
        animal_id: Uuid,
    ) -> AppResult<Vec<EstrusDetection>> {
        self.reporting_repo.open_estrus_for_animal(animal_id)
    }

    fn summary_inner(
        &self,
        now: DateTime<Utc>,
        births_window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> AppResult<ReproductionSummary> {
        let snapshot = self.reporting_repo.snapshot(births_window)?;

        let due_soon = snapshot
            .active_pregnancies
            .iter()
            .filter(|p| temporal::is_due_soon(p.expected_birth_date, now, self.config.due_soon_days))
            .count() as u32;

        Ok(ReproductionSummary {
            active_estrus: snapshot.open_estrus.len() as u32,
            active_pregnancies: snapshot.active_pregnancies.len() as u32,
            due_soon,
            total_births: snapshot.total_births,
            pending_breedings: snapshot.pending_breedings,
        })
    }
}
