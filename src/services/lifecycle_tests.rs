// src/services/lifecycle_tests.rs
//
// Cross-entity lifecycle scenarios over a real (temporary) database.
//
// INVARIANTS TESTED:
// - The detection -> breeding -> pregnancy -> birth chain holds its
//   referential rules at every step
// - Birth creation is atomic across the birth/pregnancy/breeding triple
// - Guarded updates let exactly one of two concurrent transitions win
// - The sweep transitions records only past their deadlines, idempotently

#[cfg(test)]
mod cross_entity_tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::{Arc, Barrier};
    use uuid::Uuid;

    use crate::db::{create_file_pool, initialize_database};
    use crate::domain::breeding::BreedingMethod;
    use crate::domain::estrus::EstrusStatus;
    use crate::domain::pregnancy::{ConfirmationMethod, PregnancyStatus};
    use crate::domain::species::SpeciesProfiles;
    use crate::domain::{BirthType, DomainError};
    use crate::error::AppError;
    use crate::events::EventBus;
    use crate::repositories::{
        BirthRepository, BreedingRepository, EstrusRepository, PregnancyRepository,
        SqliteBirthRepository, SqliteBreedingRepository, SqliteEstrusRepository,
        SqlitePregnancyRepository,
    };
    use crate::services::{
        BirthService, BreedingService, ConfirmPregnancyRequest, EngineConfig, EstrusService,
        LifecycleSweep, PregnancyService, PregnancySource, RecordBirthRequest,
        RecordBreedingRequest, RecordEstrusRequest,
    };

    struct Fixture {
        _dir: tempfile::TempDir,
        estrus: Arc<EstrusService>,
        breeding: Arc<BreedingService>,
        pregnancy: Arc<PregnancyService>,
        birth: Arc<BirthService>,
        sweep: LifecycleSweep,
        estrus_repo: Arc<dyn EstrusRepository>,
        breeding_repo: Arc<dyn BreedingRepository>,
        pregnancy_repo: Arc<dyn PregnancyRepository>,
        birth_repo: Arc<dyn BirthRepository>,
        event_bus: Arc<EventBus>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let pool = Arc::new(create_file_pool(&dir.path().join("herd.db")).unwrap());
        {
            let conn = pool.get().unwrap();
            initialize_database(&conn).unwrap();
        }

        let event_bus = Arc::new(EventBus::new());
        let profiles = Arc::new(SpeciesProfiles::builtin());
        let config = EngineConfig::default();

        let estrus_repo: Arc<dyn EstrusRepository> =
            Arc::new(SqliteEstrusRepository::new(pool.clone()));
        let breeding_repo: Arc<dyn BreedingRepository> =
            Arc::new(SqliteBreedingRepository::new(pool.clone()));
        let pregnancy_repo: Arc<dyn PregnancyRepository> =
            Arc::new(SqlitePregnancyRepository::new(pool.clone()));
        let birth_repo: Arc<dyn BirthRepository> =
            Arc::new(SqliteBirthRepository::new(pool.clone()));

        let estrus = Arc::new(EstrusService::new(
            estrus_repo.clone(),
            profiles.clone(),
            config,
            event_bus.clone(),
        ));
        let breeding = Arc::new(BreedingService::new(
            breeding_repo.clone(),
            estrus_repo.clone(),
            profiles.clone(),
            event_bus.clone(),
        ));
        let pregnancy = Arc::new(PregnancyService::new(
            pregnancy_repo.clone(),
            breeding_repo.clone(),
            profiles.clone(),
            event_bus.clone(),
        ));
        let birth = Arc::new(BirthService::new(
            birth_repo.clone(),
            pregnancy_repo.clone(),
            breeding_repo.clone(),
            event_bus.clone(),
        ));
        let sweep = LifecycleSweep::new(
            estrus_repo.clone(),
            breeding_repo.clone(),
            profiles,
            event_bus.clone(),
        );

        Fixture {
            _dir: dir,
            estrus,
            breeding,
            pregnancy,
            birth,
            sweep,
            estrus_repo,
            breeding_repo,
            pregnancy_repo,
            birth_repo,
            event_bus,
        }
    }

    fn detection_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap()
    }

    fn detect_request(animal_id: Uuid, confidence: f64) -> RecordEstrusRequest {
        RecordEstrusRequest {
            animal_id,
            species: "cattle".to_string(),
            detection_time: detection_time(),
            behaviors: serde_json::json!({"mounting": 0.9, "restlessness": 0.7}),
            confidence,
            notes: None,
        }
    }

    fn breed_request(female_id: Uuid, detection_id: Option<Uuid>) -> RecordBreedingRequest {
        RecordBreedingRequest {
            female_id,
            species: "cattle".to_string(),
            male_id: None,
            // 18h after detection: inside the 15:00 -> 03:00 window
            breeding_date: detection_time() + Duration::hours(18),
            breeding_method: BreedingMethod::ArtificialInsemination,
            technician: Some("J. Okafor".to_string()),
            semen_batch: None,
            estrus_detection_id: detection_id,
            notes: None,
        }
    }

    #[test]
    fn test_full_lifecycle_chain() {
        let fx = fixture();
        let cow = Uuid::new_v4();

        // Detection derives the breeding window from the species profile
        let detection = fx.estrus.record_detection(detect_request(cow, 0.85)).unwrap();
        assert_eq!(detection.status, EstrusStatus::Detected);
        assert_eq!(
            detection.optimal_breeding_start,
            Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap()
        );
        assert_eq!(
            detection.optimal_breeding_end,
            Utc.with_ymd_and_hms(2024, 1, 11, 3, 0, 0).unwrap()
        );

        fx.estrus.confirm(detection.id, false).unwrap();

        // A linked breeding transitions the detection to bred
        let record = fx
            .breeding
            .record_breeding(breed_request(cow, Some(detection.id)))
            .unwrap();
        assert!(record.is_pending());
        assert_eq!(
            fx.estrus_repo.get_by_id(detection.id).unwrap().unwrap().status,
            EstrusStatus::Bred
        );

        // Confirmation spawns the pregnancy and resolves the breeding
        let confirmed = fx
            .pregnancy
            .confirm_pregnancy(ConfirmPregnancyRequest {
                source: PregnancySource::FromBreeding {
                    breeding_id: record.id,
                },
                confirmation_method: ConfirmationMethod::Ultrasound,
                confirmation_date: record.breeding_date + Duration::days(18),
                notes: None,
            })
            .unwrap();

        assert!(confirmed.pregnancy_confirmed);
        assert_eq!(confirmed.status, PregnancyStatus::Active);
        assert_eq!(
            confirmed.expected_birth_date,
            record.breeding_date + Duration::days(283)
        );

        let resolved = fx.breeding_repo.get_by_id(record.id).unwrap().unwrap();
        assert_eq!(resolved.success, Some(true));
        assert_eq!(resolved.pregnancy_id, Some(confirmed.id));

        // Birth closes the pregnancy with the actual date
        let birth_date = confirmed.expected_birth_date - Duration::days(2);
        let birth = fx
            .birth
            .record_birth(RecordBirthRequest {
                mother_id: cow,
                birth_date,
                offspring_count: 1,
                offspring_ids: vec![],
                birth_type: BirthType::Normal,
                pregnancy_id: Some(confirmed.id),
                birth_weight: Some(38.5),
                complications: None,
                vet_assisted: false,
                vet_name: None,
                ai_predicted_at: None,
                ai_detected_at: None,
                notes: None,
            })
            .unwrap();

        let closed = fx.pregnancy_repo.get_by_id(confirmed.id).unwrap().unwrap();
        assert_eq!(closed.status, PregnancyStatus::Birthed);
        assert_eq!(closed.actual_birth_date, Some(birth_date));
        assert_eq!(
            fx.birth_repo.get_by_id(birth.id).unwrap().unwrap().pregnancy_id,
            Some(confirmed.id)
        );
    }

    #[test]
    fn test_linkage_requires_confirmed_detection() {
        let fx = fixture();
        let cow = Uuid::new_v4();

        let detection = fx.estrus.record_detection(detect_request(cow, 0.9)).unwrap();

        let err = fx
            .breeding
            .record_breeding(breed_request(cow, Some(detection.id)))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::Validation {
                field: "estrus_detection_id",
                ..
            })
        ));

        // The failed write left no breeding behind
        assert!(fx.breeding_repo.list_by_female(cow).unwrap().is_empty());
    }

    #[test]
    fn test_linkage_rejects_breeding_outside_window() {
        let fx = fixture();
        let cow = Uuid::new_v4();

        let detection = fx.estrus.record_detection(detect_request(cow, 0.9)).unwrap();
        fx.estrus.confirm(detection.id, false).unwrap();

        // Before the window opens
        let mut early = breed_request(cow, Some(detection.id));
        early.breeding_date = detection.detection_time + Duration::hours(2);
        let err = fx.breeding.record_breeding(early).unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::Validation {
                field: "breeding_date",
                ..
            })
        ));

        // Past the window deadline (end + 72h grace)
        let mut late = breed_request(cow, Some(detection.id));
        late.breeding_date = detection.optimal_breeding_end + Duration::hours(73);
        assert!(fx.breeding.record_breeding(late).is_err());

        // Unlinked breedings carry no window rule
        let unlinked = breed_request(cow, None);
        assert!(fx.breeding.record_breeding(unlinked).is_ok());
    }

    #[test]
    fn test_repeat_service_within_one_heat() {
        let fx = fixture();
        let cow = Uuid::new_v4();

        let detection = fx.estrus.record_detection(detect_request(cow, 0.9)).unwrap();
        fx.estrus.confirm(detection.id, false).unwrap();

        fx.breeding
            .record_breeding(breed_request(cow, Some(detection.id)))
            .unwrap();

        // Second service against the now-bred detection is legal
        let mut second = breed_request(cow, Some(detection.id));
        second.breeding_date = detection_time() + Duration::hours(20);
        fx.breeding.record_breeding(second).unwrap();

        assert_eq!(
            fx.estrus_repo.get_by_id(detection.id).unwrap().unwrap().status,
            EstrusStatus::Bred
        );
        assert_eq!(fx.breeding_repo.list_by_female(cow).unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_confirms_exactly_one_wins() {
        let fx = fixture();
        let cow = Uuid::new_v4();

        let detection = fx.estrus.record_detection(detect_request(cow, 0.9)).unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let estrus = Arc::clone(&fx.estrus);
            let barrier = Arc::clone(&barrier);
            let id = detection.id;
            handles.push(std::thread::spawn(move || {
                barrier.wait();
                estrus.confirm(id, false)
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "exactly one concurrent confirm must win");

        let loss = results.into_iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            loss.unwrap_err(),
            AppError::Domain(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_sweep_marks_missed_only_past_grace() {
        let fx = fixture();
        let cow = Uuid::new_v4();

        let detection = fx.estrus.record_detection(detect_request(cow, 0.9)).unwrap();
        let deadline = detection.optimal_breeding_end + Duration::hours(72);

        // Still inside the grace period: nothing happens
        let outcome = fx.sweep.run_once(deadline - Duration::hours(1)).unwrap();
        assert_eq!(outcome.estrus_missed, 0);
        assert_eq!(
            fx.estrus_repo.get_by_id(detection.id).unwrap().unwrap().status,
            EstrusStatus::Detected
        );

        // Past the deadline: missed
        let outcome = fx.sweep.run_once(deadline + Duration::hours(1)).unwrap();
        assert_eq!(outcome.estrus_missed, 1);
        assert_eq!(
            fx.estrus_repo.get_by_id(detection.id).unwrap().unwrap().status,
            EstrusStatus::Missed
        );

        // Idempotent: a re-run at the same instant changes nothing
        let outcome = fx.sweep.run_once(deadline + Duration::hours(1)).unwrap();
        assert_eq!(outcome.estrus_missed, 0);
    }

    #[test]
    fn test_sweep_spares_bred_detections() {
        let fx = fixture();
        let cow = Uuid::new_v4();

        let detection = fx.estrus.record_detection(detect_request(cow, 0.9)).unwrap();
        fx.estrus.confirm(detection.id, false).unwrap();
        fx.breeding
            .record_breeding(breed_request(cow, Some(detection.id)))
            .unwrap();

        let outcome = fx
            .sweep
            .run_once(detection.optimal_breeding_end + Duration::days(30))
            .unwrap();
        assert_eq!(outcome.estrus_missed, 0);
        assert_eq!(
            fx.estrus_repo.get_by_id(detection.id).unwrap().unwrap().status,
            EstrusStatus::Bred
        );
    }

    #[test]
    fn test_sweep_resolves_breeding_after_return_window() {
        let fx = fixture();
        let cow = Uuid::new_v4();

        let record = fx.breeding.record_breeding(breed_request(cow, None)).unwrap();
        let window_end = record.breeding_date + Duration::days(21);

        // Inside the return-to-heat window: still pending
        let outcome = fx.sweep.run_once(window_end - Duration::days(1)).unwrap();
        assert_eq!(outcome.breedings_resolved, 0);

        // Window elapsed unconfirmed: success = false
        let outcome = fx.sweep.run_once(window_end + Duration::days(1)).unwrap();
        assert_eq!(outcome.breedings_resolved, 1);
        assert_eq!(
            fx.breeding_repo.get_by_id(record.id).unwrap().unwrap().success,
            Some(false)
        );

        // The resolved outcome never changes
        let err = fx
            .pregnancy
            .confirm_pregnancy(ConfirmPregnancyRequest {
                source: PregnancySource::FromBreeding {
                    breeding_id: record.id,
                },
                confirmation_method: ConfirmationMethod::BloodTest,
                confirmation_date: window_end + Duration::days(2),
                notes: None,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::Validation { field: "success", .. })
        ));
        assert_eq!(
            fx.breeding_repo.get_by_id(record.id).unwrap().unwrap().success,
            Some(false)
        );
    }

    #[test]
    fn test_birth_rejects_mother_mismatch() {
        let fx = fixture();
        let cow = Uuid::new_v4();

        let pregnancy = fx
            .pregnancy
            .confirm_pregnancy(ConfirmPregnancyRequest {
                source: PregnancySource::Standalone {
                    animal_id: cow,
                    species: "cattle".to_string(),
                    sire_id: None,
                    breeding_date: detection_time(),
                    breeding_method: BreedingMethod::Natural,
                },
                confirmation_method: ConfirmationMethod::Observation,
                confirmation_date: detection_time() + Duration::days(25),
                notes: None,
            })
            .unwrap();

        let err = fx
            .birth
            .record_birth(RecordBirthRequest {
                mother_id: Uuid::new_v4(),
                birth_date: pregnancy.expected_birth_date,
                offspring_count: 1,
                offspring_ids: vec![],
                birth_type: BirthType::Normal,
                pregnancy_id: Some(pregnancy.id),
                birth_weight: None,
                complications: None,
                vet_assisted: false,
                vet_name: None,
                ai_predicted_at: None,
                ai_detected_at: None,
                notes: None,
            })
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Domain(DomainError::Validation {
                field: "mother_id",
                ..
            })
        ));

        // Atomicity: the rejected birth left nothing behind
        assert!(fx.birth_repo.list_all().unwrap().is_empty());
        assert_eq!(
            fx.pregnancy_repo.get_by_id(pregnancy.id).unwrap().unwrap().status,
            PregnancyStatus::Active
        );
    }

    #[test]
    fn test_birth_rejects_closed_pregnancy() {
        let fx = fixture();
        let cow = Uuid::new_v4();

        let pregnancy = fx
            .pregnancy
            .confirm_pregnancy(ConfirmPregnancyRequest {
                source: PregnancySource::Standalone {
                    animal_id: cow,
                    species: "cattle".to_string(),
                    sire_id: None,
                    breeding_date: detection_time(),
                    breeding_method: BreedingMethod::Natural,
                },
                confirmation_method: ConfirmationMethod::Manual,
                confirmation_date: detection_time() + Duration::days(30),
                notes: None,
            })
            .unwrap();

        fx.pregnancy.cancel(pregnancy.id, "data entry error").unwrap();

        let err = fx
            .birth
            .record_birth(RecordBirthRequest {
                mother_id: cow,
                birth_date: pregnancy.expected_birth_date,
                offspring_count: 1,
                offspring_ids: vec![],
                birth_type: BirthType::Normal,
                pregnancy_id: Some(pregnancy.id),
                birth_weight: None,
                complications: None,
                vet_assisted: false,
                vet_name: None,
                ai_predicted_at: None,
                ai_detected_at: None,
                notes: None,
            })
            .unwrap_err();

        match err {
            AppError::Domain(DomainError::InvalidTransition { from, requested, .. }) => {
                assert_eq!(from, "cancelled");
                assert_eq!(requested, "birthed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(fx.birth_repo.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_birth_without_tracked_pregnancy() {
        let fx = fixture();
        let ewe = Uuid::new_v4();

        let birth = fx
            .birth
            .record_birth(RecordBirthRequest {
                mother_id: ewe,
                birth_date: detection_time(),
                offspring_count: 2,
                offspring_ids: vec![Uuid::new_v4()],
                birth_type: BirthType::Assisted,
                pregnancy_id: None,
                birth_weight: Some(9.1),
                complications: None,
                vet_assisted: true,
                vet_name: Some("Dr. Ruiz".to_string()),
                ai_predicted_at: None,
                ai_detected_at: None,
                notes: None,
            })
            .unwrap();

        assert!(birth.pregnancy_id.is_none());

        // Late tagging up to the recorded count
        let tagged = fx.birth.tag_offspring(birth.id, &[Uuid::new_v4()]).unwrap();
        assert_eq!(tagged.offspring_ids.len(), 2);
        assert!(fx.birth.tag_offspring(birth.id, &[Uuid::new_v4()]).is_err());
    }

    #[test]
    fn test_delete_pregnancy_nulls_birth_reference() {
        let fx = fixture();
        let cow = Uuid::new_v4();

        let record = fx.breeding.record_breeding(breed_request(cow, None)).unwrap();
        let pregnancy = fx
            .pregnancy
            .confirm_pregnancy(ConfirmPregnancyRequest {
                source: PregnancySource::FromBreeding {
                    breeding_id: record.id,
                },
                confirmation_method: ConfirmationMethod::Ultrasound,
                confirmation_date: record.breeding_date + Duration::days(15),
                notes: None,
            })
            .unwrap();

        // Deletion is rejected while active
        let err = fx.pregnancy.delete(pregnancy.id).unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::Validation { field: "status", .. })
        ));

        let birth = fx
            .birth
            .record_birth(RecordBirthRequest {
                mother_id: cow,
                birth_date: pregnancy.expected_birth_date,
                offspring_count: 1,
                offspring_ids: vec![],
                birth_type: BirthType::Normal,
                pregnancy_id: Some(pregnancy.id),
                birth_weight: None,
                complications: None,
                vet_assisted: false,
                vet_name: None,
                ai_predicted_at: None,
                ai_detected_at: None,
                notes: None,
            })
            .unwrap();

        // Purge of the closed pregnancy preserves history with the
        // reference nulled
        fx.pregnancy.delete(pregnancy.id).unwrap();

        let kept = fx.birth_repo.get_by_id(birth.id).unwrap().unwrap();
        assert!(kept.pregnancy_id.is_none());

        let kept = fx.breeding_repo.get_by_id(record.id).unwrap().unwrap();
        assert!(kept.pregnancy_id.is_none());
        assert_eq!(kept.success, Some(true));
    }

    #[test]
    fn test_chain_emits_each_event_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let fx = fixture();
        let cow = Uuid::new_v4();

        let detected = Arc::new(AtomicUsize::new(0));
        let bred = Arc::new(AtomicUsize::new(0));
        let confirmed = Arc::new(AtomicUsize::new(0));
        let birthed = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&detected);
        fx.event_bus
            .subscribe::<crate::events::EstrusDetected, _>(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let counter = Arc::clone(&bred);
        fx.event_bus
            .subscribe::<crate::events::BreedingRecorded, _>(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let counter = Arc::clone(&confirmed);
        fx.event_bus
            .subscribe::<crate::events::PregnancyConfirmed, _>(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let counter = Arc::clone(&birthed);
        fx.event_bus
            .subscribe::<crate::events::BirthRecorded, _>(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let detection = fx.estrus.record_detection(detect_request(cow, 0.9)).unwrap();
        fx.estrus.confirm(detection.id, false).unwrap();
        let record = fx
            .breeding
            .record_breeding(breed_request(cow, Some(detection.id)))
            .unwrap();
        let pregnancy = fx
            .pregnancy
            .confirm_pregnancy(ConfirmPregnancyRequest {
                source: PregnancySource::FromBreeding {
                    breeding_id: record.id,
                },
                confirmation_method: ConfirmationMethod::Ultrasound,
                confirmation_date: record.breeding_date + Duration::days(12),
                notes: None,
            })
            .unwrap();
        fx.birth
            .record_birth(RecordBirthRequest {
                mother_id: cow,
                birth_date: pregnancy.expected_birth_date,
                offspring_count: 1,
                offspring_ids: vec![],
                birth_type: BirthType::Normal,
                pregnancy_id: Some(pregnancy.id),
                birth_weight: None,
                complications: None,
                vet_assisted: false,
                vet_name: None,
                ai_predicted_at: None,
                ai_detected_at: None,
                notes: None,
            })
            .unwrap();

        assert_eq!(detected.load(Ordering::SeqCst), 1);
        assert_eq!(bred.load(Ordering::SeqCst), 1);
        assert_eq!(confirmed.load(Ordering::SeqCst), 1);
        assert_eq!(birthed.load(Ordering::SeqCst), 1);
    }
}
