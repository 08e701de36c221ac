use super::entity::Birth;
use crate::domain::{DomainError, DomainResult};

/// Validates Birth invariants that hold for the record alone.
/// Cross-entity rules (pregnancy status, mother identity) are checked at
/// write time by the birth service.
pub fn validate_birth(birth: &Birth) -> DomainResult<()> {
    if birth.offspring_count < 1 {
        return Err(DomainError::validation(
            "offspring_count",
            "a birth records at least one offspring",
        ));
    }

    if birth.offspring_ids.len() > birth.offspring_count as usize {
        return Err(DomainError::validation(
            "offspring_ids",
            format!(
                "{} tagged offspring exceed the recorded count of {}",
                birth.offspring_ids.len(),
                birth.offspring_count
            ),
        ));
    }

    if let Some(weight) = birth.birth_weight {
        if weight <= 0.0 {
            return Err(DomainError::validation(
                "birth_weight",
                format!("birth weight {} must be positive", weight),
            ));
        }
    }

    if birth.vet_name.is_some() && !birth.vet_assisted {
        return Err(DomainError::validation(
            "vet_name",
            "a vet name requires vet_assisted to be set",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::birth::BirthType;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn birth() -> Birth {
        Birth::new(
            Uuid::new_v4(),
            Utc.with_ymd_and_hms(2024, 10, 8, 4, 30, 0).unwrap(),
            1,
            BirthType::Normal,
        )
    }

    #[test]
    fn test_valid_birth() {
        assert!(validate_birth(&birth()).is_ok());
    }

    #[test]
    fn test_zero_offspring_fails() {
        let mut b = birth();
        b.offspring_count = 0;
        let err = validate_birth(&b).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation {
                field: "offspring_count",
                ..
            }
        ));
    }

    #[test]
    fn test_negative_weight_fails() {
        let mut b = birth();
        b.birth_weight = Some(-4.2);
        assert!(validate_birth(&b).is_err());
    }

    #[test]
    fn test_vet_name_requires_vet_assisted() {
        let mut b = birth();
        b.vet_name = Some("Dr. Ruiz".to_string());
        assert!(validate_birth(&b).is_err());

        b.vet_assisted = true;
        assert!(validate_birth(&b).is_ok());
    }
}
