use super::entity::BreedingRecord;
use crate::domain::estrus::{EstrusDetection, EstrusStatus};
use crate::domain::{DomainError, DomainResult};

/// Validates BreedingRecord invariants that hold for the record alone
pub fn validate_breeding_record(record: &BreedingRecord) -> DomainResult<()> {
    if record.species.trim().is_empty() {
        return Err(DomainError::validation("species", "species cannot be empty"));
    }
    if record.pregnancy_id.is_some() && record.success != Some(true) {
        return Err(DomainError::validation(
            "pregnancy_id",
            "a referenced pregnancy implies a successful outcome",
        ));
    }
    Ok(())
}

/// Referential rule for linking a breeding to a detection: same animal,
/// and the detection must be confirmed (or already bred, for repeat
/// services within one heat) at linkage time.
pub fn validate_estrus_linkage(
    record: &BreedingRecord,
    detection: &EstrusDetection,
) -> DomainResult<()> {
    if detection.animal_id != record.female_id {
        return Err(DomainError::validation(
            "estrus_detection_id",
            format!(
                "detection {} belongs to animal {}, not {}",
                detection.id, detection.animal_id, record.female_id
            ),
        ));
    }
    if !matches!(
        detection.status,
        EstrusStatus::Confirmed | EstrusStatus::Bred
    ) {
        return Err(DomainError::validation(
            "estrus_detection_id",
            format!(
                "detection must be confirmed before linkage (status is {})",
                detection.status
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::breeding::BreedingMethod;
    use crate::domain::temporal::BreedingWindow;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn detection_for(animal_id: Uuid) -> EstrusDetection {
        let time = Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap();
        EstrusDetection::new(
            animal_id,
            "cattle".to_string(),
            time,
            serde_json::json!({}),
            0.9,
            BreedingWindow {
                start: time + Duration::hours(9),
                end: time + Duration::hours(27),
            },
        )
    }

    fn record_for(female_id: Uuid) -> BreedingRecord {
        BreedingRecord::new(
            female_id,
            "cattle".to_string(),
            Utc.with_ymd_and_hms(2024, 1, 10, 18, 0, 0).unwrap(),
            BreedingMethod::Natural,
        )
    }

    #[test]
    fn test_linkage_to_confirmed_detection() {
        let animal = Uuid::new_v4();
        let mut det = detection_for(animal);
        det.confirm().unwrap();

        assert!(validate_estrus_linkage(&record_for(animal), &det).is_ok());
    }

    #[test]
    fn test_linkage_rejects_unconfirmed_detection() {
        let animal = Uuid::new_v4();
        let det = detection_for(animal);

        let err = validate_estrus_linkage(&record_for(animal), &det).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation {
                field: "estrus_detection_id",
                ..
            }
        ));
    }

    #[test]
    fn test_linkage_rejects_other_animal() {
        let mut det = detection_for(Uuid::new_v4());
        det.confirm().unwrap();

        let err = validate_estrus_linkage(&record_for(Uuid::new_v4()), &det).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation {
                field: "estrus_detection_id",
                ..
            }
        ));
    }

    #[test]
    fn test_pregnancy_without_success_fails() {
        let mut rec = record_for(Uuid::new_v4());
        rec.pregnancy_id = Some(Uuid::new_v4());
        assert!(validate_breeding_record(&rec).is_err());
    }
}
