use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::breeding::BreedingMethod;
use crate::domain::{DomainError, DomainResult};

/// A tracked pregnancy from breeding to outcome.
///
/// The expected birth date is fixed at creation from the species gestation
/// length; confirmation flips a flag and never moves the dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pregnancy {
    /// Internal immutable identifier
    pub id: Uuid,

    pub animal_id: Uuid,

    /// Species snapshot taken at creation
    pub species: String,

    pub sire_id: Option<Uuid>,

    pub breeding_date: DateTime<Utc>,

    /// breeding_date + gestation_length(species); fixed once set
    pub expected_birth_date: DateTime<Utc>,

    /// Populated exactly when status = birthed
    pub actual_birth_date: Option<DateTime<Utc>>,

    pub breeding_method: BreedingMethod,

    /// Orthogonal to status: may flip true while status stays active
    pub pregnancy_confirmed: bool,
    pub confirmation_date: Option<DateTime<Utc>>,
    pub confirmation_method: Option<ConfirmationMethod>,

    pub status: PregnancyStatus,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PregnancyStatus {
    Active,
    Birthed,
    Miscarried,
    Cancelled,
}

impl PregnancyStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PregnancyStatus::Active)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PregnancyStatus::Active),
            "birthed" => Some(PregnancyStatus::Birthed),
            "miscarried" => Some(PregnancyStatus::Miscarried),
            "cancelled" => Some(PregnancyStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationMethod {
    Manual,
    Ultrasound,
    BloodTest,
    Observation,
}

impl ConfirmationMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(ConfirmationMethod::Manual),
            "ultrasound" => Some(ConfirmationMethod::Ultrasound),
            "blood_test" => Some(ConfirmationMethod::BloodTest),
            "observation" => Some(ConfirmationMethod::Observation),
            _ => None,
        }
    }
}

impl Pregnancy {
    pub fn new(
        animal_id: Uuid,
        species: String,
        sire_id: Option<Uuid>,
        breeding_date: DateTime<Utc>,
        expected_birth_date: DateTime<Utc>,
        breeding_method: BreedingMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            animal_id,
            species,
            sire_id,
            breeding_date,
            expected_birth_date,
            actual_birth_date: None,
            breeding_method,
            pregnancy_confirmed: false,
            confirmation_date: None,
            confirmation_method: None,
            status: PregnancyStatus::Active,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Flip the confirmation flag. Does not transition status and does not
    /// touch the expected birth date.
    pub fn confirm(
        &mut self,
        method: ConfirmationMethod,
        date: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != PregnancyStatus::Active {
            return Err(DomainError::validation(
                "pregnancy_confirmed",
                format!("cannot confirm a {} pregnancy", self.status),
            ));
        }
        if self.pregnancy_confirmed {
            return Err(DomainError::validation(
                "pregnancy_confirmed",
                "pregnancy is already confirmed",
            ));
        }

        self.pregnancy_confirmed = true;
        self.confirmation_method = Some(method);
        self.confirmation_date = Some(date);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Close the pregnancy with a birth. Only Birth creation calls this.
    pub fn mark_birthed(&mut self, birth_date: DateTime<Utc>) -> DomainResult<()> {
        self.transition(PregnancyStatus::Birthed)?;
        self.actual_birth_date = Some(birth_date);
        Ok(())
    }

    /// Manual terminal close; a reason is required and recorded in notes.
    pub fn mark_miscarried(&mut self, reason: &str) -> DomainResult<()> {
        let reason = non_empty_reason("notes", reason)?;
        self.transition(PregnancyStatus::Miscarried)?;
        self.append_note(&format!("miscarried: {}", reason));
        Ok(())
    }

    /// Manual terminal close, e.g. a data-entry correction.
    pub fn cancel(&mut self, reason: &str) -> DomainResult<()> {
        let reason = non_empty_reason("notes", reason)?;
        self.transition(PregnancyStatus::Cancelled)?;
        self.append_note(&format!("cancelled: {}", reason));
        Ok(())
    }

    fn transition(&mut self, to: PregnancyStatus) -> DomainResult<()> {
        if self.status != PregnancyStatus::Active {
            return Err(DomainError::InvalidTransition {
                entity: "pregnancy",
                from: self.status.to_string(),
                requested: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn append_note(&mut self, note: &str) {
        match &mut self.notes {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(note);
            }
            None => self.notes = Some(note.to_string()),
        }
    }
}

fn non_empty_reason<'a>(field: &'static str, reason: &'a str) -> DomainResult<&'a str> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "a reason is required"));
    }
    Ok(trimmed)
}

impl std::fmt::Display for PregnancyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PregnancyStatus::Active => write!(f, "active"),
            PregnancyStatus::Birthed => write!(f, "birthed"),
            PregnancyStatus::Miscarried => write!(f, "miscarried"),
            PregnancyStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::fmt::Display for ConfirmationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmationMethod::Manual => write!(f, "manual"),
            ConfirmationMethod::Ultrasound => write!(f, "ultrasound"),
            ConfirmationMethod::BloodTest => write!(f, "blood_test"),
            ConfirmationMethod::Observation => write!(f, "observation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::breeding::BreedingMethod;
    use chrono::{Duration, TimeZone};

    fn pregnancy() -> Pregnancy {
        let bred = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Pregnancy::new(
            Uuid::new_v4(),
            "cattle".to_string(),
            None,
            bred,
            bred + Duration::days(283),
            BreedingMethod::Natural,
        )
    }

    #[test]
    fn test_confirmation_does_not_transition_status() {
        let mut p = pregnancy();
        p.confirm(ConfirmationMethod::Ultrasound, Utc::now()).unwrap();

        assert!(p.pregnancy_confirmed);
        assert_eq!(p.status, PregnancyStatus::Active);
    }

    #[test]
    fn test_confirmation_preserves_expected_date() {
        let mut p = pregnancy();
        let expected = p.expected_birth_date;
        p.confirm(ConfirmationMethod::BloodTest, Utc::now()).unwrap();
        assert_eq!(p.expected_birth_date, expected);
    }

    #[test]
    fn test_birthed_sets_actual_date() {
        let mut p = pregnancy();
        let birth_date = p.expected_birth_date - Duration::days(2);
        p.mark_birthed(birth_date).unwrap();

        assert_eq!(p.status, PregnancyStatus::Birthed);
        assert_eq!(p.actual_birth_date, Some(birth_date));
    }

    #[test]
    fn test_miscarriage_requires_reason() {
        let mut p = pregnancy();
        assert!(p.mark_miscarried("   ").is_err());
        assert_eq!(p.status, PregnancyStatus::Active);

        p.mark_miscarried("confirmed by vet exam").unwrap();
        assert_eq!(p.status, PregnancyStatus::Miscarried);
        assert!(p.notes.as_deref().unwrap().contains("vet exam"));
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let mut p = pregnancy();
        p.cancel("duplicate entry").unwrap();

        let err = p.mark_birthed(Utc::now()).unwrap_err();
        match err {
            DomainError::InvalidTransition { from, requested, .. } => {
                assert_eq!(from, "cancelled");
                assert_eq!(requested, "birthed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cannot_confirm_closed_pregnancy() {
        let mut p = pregnancy();
        p.mark_miscarried("early loss").unwrap();
        assert!(p.confirm(ConfirmationMethod::Manual, Utc::now()).is_err());
    }
}
