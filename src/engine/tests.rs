use super::*;
use crate::events::EngineEvent;
use crate::log_store::{CsvLogStore, LogCategory, LogStore, LogTimeZone, MemoryLogStore};
use crate::plate::plate;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

async fn memory_engine() -> (Arc<MemoryLogStore>, ReconciliationEngine<MemoryLogStore>) {
    let store = Arc::new(MemoryLogStore::new());
    let engine = ReconciliationEngine::new(Arc::clone(&store), EngineSettings::default());
    engine.initialize().await.unwrap();
    (store, engine)
}

#[tokio::test]
async fn test_new_plate_is_entered_once() {
    let (store, mut engine) = memory_engine().await;
    let p = plate("MH12AB1234");

    let report = engine.process_cycle(Mode::Entry, &[p.clone()], at(0)).await.unwrap();

    assert_eq!(
        report.events,
        vec![EngineEvent::EntryAccepted {
            plate: p.clone(),
            timestamp: at(0)
        }]
    );
    assert_eq!(store.plates(LogCategory::Entry), vec![p]);
    assert_eq!(report.occupancy.occupied, 1);
    assert_eq!(report.occupancy.vacant, 29);
}

#[tokio::test]
async fn test_already_entered_plate_is_never_appended_again() {
    let (store, mut engine) = memory_engine().await;
    let p = plate("MH12AB1234");
    store.append(LogCategory::Entry, &p, at(-3600)).await.unwrap();

    for i in 0..10 {
        let report = engine
            .process_cycle(Mode::Entry, &[p.clone(), p.clone()], at(i * 5))
            .await
            .unwrap();
        assert!(report.events.is_empty());
    }

    assert_eq!(store.len(LogCategory::Entry), 1);
}

#[tokio::test]
async fn test_debounce_window_then_durable_membership() {
    let (store, mut engine) = memory_engine().await;
    let p = plate("KA01MJ2022");

    engine.process_cycle(Mode::Entry, &[p.clone()], at(0)).await.unwrap();
    engine.process_cycle(Mode::Entry, &[p.clone()], at(2)).await.unwrap();
    let late = engine.process_cycle(Mode::Entry, &[p.clone()], at(4)).await.unwrap();

    assert!(late.events.is_empty());
    assert_eq!(store.len(LogCategory::Entry), 1);
}

#[tokio::test]
async fn test_duplicate_candidates_in_one_cycle_are_debounced() {
    let (store, mut engine) = memory_engine().await;
    let p = plate("KA01MJ2022");

    let report = engine
        .process_cycle(Mode::Entry, &[p.clone(), p.clone(), p.clone()], at(0))
        .await
        .unwrap();

    assert_eq!(report.events.len(), 1);
    assert_eq!(store.len(LogCategory::Entry), 1);
}

#[tokio::test]
async fn test_debounce_suppresses_when_log_was_reset_externally() {
    let (_store, mut engine) = memory_engine().await;
    let p = plate("KA01MJ2022");
    engine.process_cycle(Mode::Entry, &[p.clone()], at(0)).await.unwrap();

    // Membership says new, debounce still remembers the last acceptance
    let entries = std::collections::HashSet::new();
    let exits = std::collections::HashSet::new();
    assert_eq!(
        engine.decide(Mode::Entry, &p, &entries, &exits, at(1)),
        Decision::Ignore(IgnoreReason::Debounced)
    );
    assert_eq!(
        engine.decide(Mode::Entry, &p, &entries, &exits, at(5)),
        Decision::AcceptEntry
    );
}

#[tokio::test]
async fn test_exit_without_entry_is_fishy_every_time() {
    let (store, mut engine) = memory_engine().await;
    let p = plate("TN09BX0001");

    for i in 0..3 {
        let report = engine.process_cycle(Mode::Exit, &[p.clone()], at(i)).await.unwrap();
        assert_eq!(
            report.events,
            vec![EngineEvent::UnmatchedExit {
                plate: p.clone(),
                timestamp: at(i)
            }]
        );
    }

    assert_eq!(store.len(LogCategory::Fishy), 3);
    assert_eq!(store.len(LogCategory::Exit), 0);
}

#[tokio::test]
async fn test_fishy_debounce_when_enabled() {
    let store = Arc::new(MemoryLogStore::new());
    let settings = EngineSettings {
        fishy_debounce: true,
        ..EngineSettings::default()
    };
    let mut engine = ReconciliationEngine::new(Arc::clone(&store), settings);
    let p = plate("TN09BX0001");

    engine.process_cycle(Mode::Exit, &[p.clone(), p.clone()], at(0)).await.unwrap();
    engine.process_cycle(Mode::Exit, &[p.clone()], at(2)).await.unwrap();
    engine.process_cycle(Mode::Exit, &[p.clone()], at(6)).await.unwrap();

    assert_eq!(store.len(LogCategory::Fishy), 2);
}

#[tokio::test]
async fn test_exit_matching() {
    let (store, mut engine) = memory_engine().await;
    let p = plate("DL04C5678");

    engine.process_cycle(Mode::Entry, &[p.clone()], at(0)).await.unwrap();

    let first = engine.process_cycle(Mode::Exit, &[p.clone()], at(1)).await.unwrap();
    assert_eq!(
        first.events,
        vec![EngineEvent::ExitAccepted {
            plate: p.clone(),
            timestamp: at(1)
        }]
    );
    assert_eq!(first.occupancy.occupied, 0);

    let again = engine.process_cycle(Mode::Exit, &[p.clone()], at(100)).await.unwrap();
    assert!(again.events.is_empty());

    assert_eq!(store.len(LogCategory::Exit), 1);
    assert_eq!(store.len(LogCategory::Fishy), 0);
}

#[tokio::test]
async fn test_mode_switch_between_cycles() {
    let (store, mut engine) = memory_engine().await;
    let a = plate("MH12AB1234");
    let b = plate("KA01MJ2022");

    engine.process_cycle(Mode::Entry, &[a.clone(), b.clone()], at(0)).await.unwrap();
    let report = engine
        .process_cycle(Mode::Exit, &[a.clone(), plate("GJ05XY9999")], at(1))
        .await
        .unwrap();

    assert_eq!(report.events.len(), 2);
    assert_eq!(report.entry_count, 2);
    assert_eq!(report.exit_count, 1);
    assert_eq!(report.occupancy.occupied, 1);
    assert_eq!(store.plates(LogCategory::Fishy), vec![plate("GJ05XY9999")]);
}

#[tokio::test]
async fn test_load_failure_takes_no_action() {
    let (store, mut engine) = memory_engine().await;
    store.set_available(false);

    let result = engine
        .process_cycle(Mode::Entry, &[plate("MH12AB1234")], at(0))
        .await;
    assert!(result.is_err());
    assert!(engine.debounce().is_empty());

    store.set_available(true);
    let report = engine
        .process_cycle(Mode::Entry, &[plate("MH12AB1234")], at(1))
        .await
        .unwrap();
    assert_eq!(report.events.len(), 1);
}

#[tokio::test]
async fn test_failed_entry_append_is_not_debounced() {
    let (store, mut engine) = memory_engine().await;
    let p = plate("MH12AB1234");
    store.set_read_only(true);

    let report = engine.process_cycle(Mode::Entry, &[p.clone()], at(0)).await.unwrap();
    match report.storage_fault() {
        Some(EngineEvent::StorageFault { plate, category, .. }) => {
            assert_eq!(plate, &p);
            assert_eq!(*category, LogCategory::Entry);
        }
        other => panic!("Expected storage fault, got {:?}", other),
    }
    assert!(engine.debounce().is_empty());

    // Well inside the debounce window
    store.set_read_only(false);
    let retry = engine.process_cycle(Mode::Entry, &[p.clone()], at(1)).await.unwrap();
    assert_eq!(
        retry.events,
        vec![EngineEvent::EntryAccepted {
            plate: p.clone(),
            timestamp: at(1)
        }]
    );
    assert_eq!(store.plates(LogCategory::Entry), vec![p]);
}

#[tokio::test]
async fn test_failed_exit_append_is_not_debounced() {
    let (store, mut engine) = memory_engine().await;
    let p = plate("KA01MJ2022");
    store.append(LogCategory::Entry, &p, at(-60)).await.unwrap();
    store.set_read_only(true);

    let report = engine.process_cycle(Mode::Exit, &[p.clone()], at(0)).await.unwrap();
    assert!(report.storage_fault().is_some());

    store.set_read_only(false);
    let retry = engine.process_cycle(Mode::Exit, &[p.clone()], at(2)).await.unwrap();
    assert!(matches!(retry.events.as_slice(), [EngineEvent::ExitAccepted { .. }]));
    assert_eq!(store.len(LogCategory::Exit), 1);
    assert_eq!(store.len(LogCategory::Fishy), 0);
}

#[tokio::test]
async fn test_entry_after_unterminated_hand_edit_is_recorded_once() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(CsvLogStore::new(
        temp_dir.path(),
        LogTimeZone::Named(chrono_tz::UTC),
    ));
    std::fs::write(
        store.path(LogCategory::Entry),
        "Plate Number,Time\nMH12AB1234,2024-01-01 10:00:00",
    )
    .unwrap();
    let mut engine = ReconciliationEngine::new(Arc::clone(&store), EngineSettings::default());
    engine.initialize().await.unwrap();

    let p = plate("KA01MJ2022");
    let first = engine.process_cycle(Mode::Entry, &[p.clone()], at(0)).await.unwrap();
    assert_eq!(first.events.len(), 1);

    // Past the debounce window, so only durable membership can suppress it
    let second = engine.process_cycle(Mode::Entry, &[p.clone()], at(5)).await.unwrap();
    assert!(second.events.is_empty());

    let records = store.load_records(LogCategory::Entry).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].recorded_at, "2024-01-01 10:00:00");
    assert_eq!(second.entry_count, 2);
}

#[tokio::test]
async fn test_unreadable_log_refuses_cycle() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(CsvLogStore::new(
        temp_dir.path(),
        LogTimeZone::Named(chrono_tz::UTC),
    ));
    let mut engine = ReconciliationEngine::new(Arc::clone(&store), EngineSettings::default());
    engine.initialize().await.unwrap();

    // A directory where the entry log should be cannot be read or appended to
    let entry_path = store.path(LogCategory::Entry);
    std::fs::remove_file(&entry_path).unwrap();
    std::fs::create_dir(&entry_path).unwrap();

    let p = plate("MH12AB1234");
    let result = engine.process_cycle(Mode::Entry, &[p.clone(), plate("KA01MJ2022")], at(0)).await;

    assert!(result.is_err());
    assert!(engine.debounce().is_empty());
}

#[tokio::test]
async fn test_partial_cycle_on_append_failure() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(CsvLogStore::new(
        temp_dir.path(),
        LogTimeZone::Named(chrono_tz::UTC),
    ));
    let mut engine = ReconciliationEngine::new(Arc::clone(&store), EngineSettings::default());
    engine.initialize().await.unwrap();

    let entered = plate("MH12AB1234");
    engine.process_cycle(Mode::Entry, &[entered.clone()], at(0)).await.unwrap();

    // Fishy log becomes unwritable, exit and entry logs stay healthy
    let fishy_path = store.path(LogCategory::Fishy);
    std::fs::remove_file(&fishy_path).unwrap();
    std::fs::create_dir(&fishy_path).unwrap();

    let stranger = plate("GJ05XY9999");
    let report = engine
        .process_cycle(
            Mode::Exit,
            &[entered.clone(), stranger.clone(), plate("KA01MJ2022")],
            at(10),
        )
        .await
        .unwrap();

    assert_eq!(report.events.len(), 2);
    assert!(matches!(report.events[0], EngineEvent::ExitAccepted { .. }));
    match report.storage_fault() {
        Some(EngineEvent::StorageFault { plate, category, .. }) => {
            assert_eq!(plate, &stranger);
            assert_eq!(*category, LogCategory::Fishy);
        }
        other => panic!("Expected storage fault, got {:?}", other),
    }
    assert_eq!(store.load_records(LogCategory::Exit).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_membership_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let zone = LogTimeZone::Named(chrono_tz::UTC);
    let plates = [plate("MH12AB1234"), plate("KA01MJ2022"), plate("DL04C5678")];

    {
        let store = Arc::new(CsvLogStore::new(temp_dir.path(), zone));
        let mut engine = ReconciliationEngine::new(store, EngineSettings::default());
        engine.initialize().await.unwrap();
        engine.process_cycle(Mode::Entry, &plates, at(0)).await.unwrap();
    }

    // Fresh process: empty debounce state, same logs
    let store = Arc::new(CsvLogStore::new(temp_dir.path(), zone));
    let mut engine = ReconciliationEngine::new(Arc::clone(&store), EngineSettings::default());
    engine.initialize().await.unwrap();

    let report = engine.process_cycle(Mode::Entry, &plates, at(60)).await.unwrap();
    assert!(report.events.is_empty());

    let membership = store.load_membership(LogCategory::Entry).await.unwrap();
    assert_eq!(membership.len(), 3);
    assert_eq!(engine.occupancy().await.unwrap().occupied, 3);
}
