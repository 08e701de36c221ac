// src/domain/temporal.rs
//
// Temporal Calculator - derived scheduling dates
//
// CRITICAL RULES:
// - Pure functions only
// - Current time is always an explicit parameter, never an ambient clock
// - Same inputs -> same outputs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::species::SpeciesProfile;

/// The window of optimal fertilization probability for one detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BreedingWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Window end extended by the species' grace period. Past this
    /// deadline an unbred detection counts as missed.
    pub fn deadline(&self, profile: &SpeciesProfile) -> DateTime<Utc> {
        self.end + profile.breeding_grace()
    }
}

/// Optimal breeding window for a detection.
///
/// Fertilization probability centers on mid-to-late estrus, so the window
/// spans `detection_time + start_factor x heat` to
/// `detection_time + end_factor x heat`.
pub fn breeding_window(detection_time: DateTime<Utc>, profile: &SpeciesProfile) -> BreedingWindow {
    let heat = profile.heat_duration();
    BreedingWindow {
        start: detection_time + scale(heat, profile.window_start_factor),
        end: detection_time + scale(heat, profile.window_end_factor),
    }
}

/// Expected birth date: breeding date plus the species gestation length.
pub fn expected_birth_date(breeding_date: DateTime<Utc>, profile: &SpeciesProfile) -> DateTime<Utc> {
    breeding_date + profile.gestation()
}

/// Whole days until the expected birth date, truncated. Negative once the
/// expected date has passed.
pub fn days_remaining(expected_birth_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expected_birth_date - now).num_days()
}

pub fn is_due_soon(
    expected_birth_date: DateTime<Utc>,
    now: DateTime<Utc>,
    threshold_days: i64,
) -> bool {
    days_remaining(expected_birth_date, now) <= threshold_days
}

/// Display bucketing for due-soon pregnancies. Never drives a state
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueSeverity {
    Urgent,
    Soon,
    Normal,
}

pub fn due_severity(days_remaining: i64) -> DueSeverity {
    if days_remaining <= 3 {
        DueSeverity::Urgent
    } else if days_remaining <= 7 {
        DueSeverity::Soon
    } else {
        DueSeverity::Normal
    }
}

fn scale(duration: Duration, factor: f64) -> Duration {
    Duration::seconds((duration.num_seconds() as f64 * factor).round() as i64)
}
