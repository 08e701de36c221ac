use super::entity::{Pregnancy, PregnancyStatus};
use crate::domain::species::SpeciesProfile;
use crate::domain::{DomainError, DomainResult};

/// Validates all Pregnancy invariants against the species profile the
/// pregnancy was created under
pub fn validate_pregnancy(pregnancy: &Pregnancy, profile: &SpeciesProfile) -> DomainResult<()> {
    if pregnancy.species.trim().is_empty() {
        return Err(DomainError::validation("species", "species cannot be empty"));
    }

    // expected_birth_date = breeding_date + gestation_length, exactly
    let expected = pregnancy.breeding_date + profile.gestation();
    if pregnancy.expected_birth_date != expected {
        return Err(DomainError::validation(
            "expected_birth_date",
            format!(
                "expected birth date {} does not equal breeding date plus {} days gestation",
                pregnancy.expected_birth_date, profile.gestation_days
            ),
        ));
    }

    // actual_birth_date is populated exactly when status = birthed
    match (pregnancy.status, pregnancy.actual_birth_date) {
        (PregnancyStatus::Birthed, None) => {
            return Err(DomainError::validation(
                "actual_birth_date",
                "a birthed pregnancy must carry its actual birth date",
            ));
        }
        (status, Some(_)) if status != PregnancyStatus::Birthed => {
            return Err(DomainError::validation(
                "actual_birth_date",
                format!("a {} pregnancy cannot carry an actual birth date", status),
            ));
        }
        _ => {}
    }

    // confirmation fields travel together
    if pregnancy.pregnancy_confirmed
        && (pregnancy.confirmation_date.is_none() || pregnancy.confirmation_method.is_none())
    {
        return Err(DomainError::validation(
            "confirmation_date",
            "a confirmed pregnancy must record when and how it was confirmed",
        ));
    }

    Ok(())
}
