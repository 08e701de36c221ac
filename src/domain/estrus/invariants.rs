use super::entity::EstrusDetection;
use crate::domain::{DomainError, DomainResult};

/// Validates all EstrusDetection invariants
/// These are the absolute rules that must hold for a detection to be valid
pub fn validate_estrus_detection(detection: &EstrusDetection) -> DomainResult<()> {
    validate_species(&detection.species)?;
    validate_confidence(detection.confidence)?;
    validate_behaviors(&detection.behaviors)?;
    validate_window(detection)?;
    Ok(())
}

fn validate_species(species: &str) -> DomainResult<()> {
    if species.trim().is_empty() {
        return Err(DomainError::validation("species", "species cannot be empty"));
    }
    Ok(())
}

fn validate_confidence(confidence: f64) -> DomainResult<()> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(DomainError::validation(
            "confidence",
            format!("confidence {} must be within [0.0, 1.0]", confidence),
        ));
    }
    Ok(())
}

/// Behaviors are open-ended but must be a name -> intensity mapping
fn validate_behaviors(behaviors: &serde_json::Value) -> DomainResult<()> {
    if !behaviors.is_object() {
        return Err(DomainError::validation(
            "behaviors",
            "behaviors must be a JSON object mapping behavior name to intensity",
        ));
    }
    Ok(())
}

/// optimal_breeding_end > optimal_breeding_start >= detection_time
fn validate_window(detection: &EstrusDetection) -> DomainResult<()> {
    if detection.optimal_breeding_start < detection.detection_time {
        return Err(DomainError::validation(
            "optimal_breeding_start",
            format!(
                "breeding window start {} precedes detection time {}",
                detection.optimal_breeding_start, detection.detection_time
            ),
        ));
    }
    if detection.optimal_breeding_end <= detection.optimal_breeding_start {
        return Err(DomainError::validation(
            "optimal_breeding_end",
            format!(
                "breeding window end {} must be after start {}",
                detection.optimal_breeding_end, detection.optimal_breeding_start
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::temporal::BreedingWindow;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn valid_detection() -> EstrusDetection {
        let time = Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap();
        EstrusDetection::new(
            Uuid::new_v4(),
            "cattle".to_string(),
            time,
            serde_json::json!({"mounting": 0.9, "restlessness": 0.6}),
            0.85,
            BreedingWindow {
                start: time + Duration::hours(9),
                end: time + Duration::hours(27),
            },
        )
    }

    #[test]
    fn test_valid_detection() {
        assert!(validate_estrus_detection(&valid_detection()).is_ok());
    }

    #[test]
    fn test_confidence_out_of_range_fails() {
        let mut det = valid_detection();
        det.confidence = 1.2;
        let err = validate_estrus_detection(&det).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation {
                field: "confidence",
                ..
            }
        ));
    }

    #[test]
    fn test_inverted_window_fails() {
        let mut det = valid_detection();
        std::mem::swap(
            &mut det.optimal_breeding_start,
            &mut det.optimal_breeding_end,
        );
        assert!(validate_estrus_detection(&det).is_err());
    }

    #[test]
    fn test_window_before_detection_fails() {
        let mut det = valid_detection();
        det.optimal_breeding_start = det.detection_time - Duration::hours(1);
        let err = validate_estrus_detection(&det).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation {
                field: "optimal_breeding_start",
                ..
            }
        ));
    }

    #[test]
    fn test_non_object_behaviors_fail() {
        let mut det = valid_detection();
        det.behaviors = serde_json::json!(["mounting"]);
        assert!(validate_estrus_detection(&det).is_err());
    }
}
