use super::Mode;
use crate::config::ParkingConfig;
use crate::debounce::{DebounceTracker, Direction};
use crate::error::StorageError;
use crate::events::EngineEvent;
use crate::log_store::{LogCategory, LogStore};
use crate::occupancy::Occupancy;
use crate::plate::PlateNumber;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Tunables of the reconciliation rules
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub debounce_window: Duration,
    pub total_slots: usize,
    /// Apply the debounce window to unmatched exits as well
    pub fishy_debounce: bool,
}

impl EngineSettings {
    pub fn from_config(config: &ParkingConfig) -> Self {
        Self {
            debounce_window: Duration::seconds(i64::from(config.debounce_seconds)),
            total_slots: config.total_slots,
            fishy_debounce: config.fishy_debounce,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            debounce_window: Duration::seconds(3),
            total_slots: 30,
            fishy_debounce: false,
        }
    }
}

/// Why a detection produced no log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    AlreadyEntered,
    AlreadyExited,
    Debounced,
}

/// What to do with a single detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Ignore(IgnoreReason),
    AcceptEntry,
    AcceptExit,
    FlagUnmatchedExit,
}

impl Decision {
    /// Log the detection must be written to, if any
    pub fn category(&self) -> Option<LogCategory> {
        match self {
            Decision::Ignore(_) => None,
            Decision::AcceptEntry => Some(LogCategory::Entry),
            Decision::AcceptExit => Some(LogCategory::Exit),
            Decision::FlagUnmatchedExit => Some(LogCategory::Fishy),
        }
    }

    /// Debounce window an accepted detection is marked in, if any
    fn debounce_direction(&self, fishy_debounce: bool) -> Option<Direction> {
        match self {
            Decision::Ignore(_) => None,
            Decision::AcceptEntry => Some(Direction::Entry),
            Decision::AcceptExit => Some(Direction::Exit),
            Decision::FlagUnmatchedExit => fishy_debounce.then_some(Direction::Fishy),
        }
    }
}

/// Everything a single cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub mode: Mode,
    pub events: Vec<EngineEvent>,
    pub occupancy: Occupancy,
    pub entry_count: usize,
    pub exit_count: usize,
}

impl CycleReport {
    pub fn storage_fault(&self) -> Option<&EngineEvent> {
        self.events.iter().find(|event| event.is_fault())
    }
}

/// Reconciles plate detections against the durable entry and exit logs
pub struct ReconciliationEngine<S: LogStore + ?Sized> {
    store: Arc<S>,
    debounce: DebounceTracker,
    settings: EngineSettings,
}

impl<S: LogStore + ?Sized> ReconciliationEngine<S> {
    pub fn new(store: Arc<S>, settings: EngineSettings) -> Self {
        Self {
            store,
            debounce: DebounceTracker::new(),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn debounce(&self) -> &DebounceTracker {
        &self.debounce
    }

    /// Make sure every plate log exists
    pub async fn initialize(&self) -> Result<(), StorageError> {
        self.store.ensure_all().await
    }

    /// Decide what a single detection means, without side effects
    pub fn decide(
        &self,
        mode: Mode,
        plate: &PlateNumber,
        entries: &HashSet<PlateNumber>,
        exits: &HashSet<PlateNumber>,
        now: DateTime<Utc>,
    ) -> Decision {
        let window = self.settings.debounce_window;

        match mode {
            Mode::Entry => {
                if entries.contains(plate) {
                    Decision::Ignore(IgnoreReason::AlreadyEntered)
                } else if self.debounce.should_suppress(Direction::Entry, plate, now, window) {
                    Decision::Ignore(IgnoreReason::Debounced)
                } else {
                    Decision::AcceptEntry
                }
            }
            Mode::Exit => {
                if !entries.contains(plate) {
                    if self.settings.fishy_debounce
                        && self.debounce.should_suppress(Direction::Fishy, plate, now, window)
                    {
                        Decision::Ignore(IgnoreReason::Debounced)
                    } else {
                        Decision::FlagUnmatchedExit
                    }
                } else if exits.contains(plate) {
                    Decision::Ignore(IgnoreReason::AlreadyExited)
                } else if self.debounce.should_suppress(Direction::Exit, plate, now, window) {
                    Decision::Ignore(IgnoreReason::Debounced)
                } else {
                    Decision::AcceptExit
                }
            }
        }
    }

    /// Run one reconciliation cycle over the plates found in a frame.
    ///
    /// Membership is reloaded from the store on every call. If the logs
    /// cannot be read nothing is decided and the error is returned. If an
    /// append fails, that plate is left unaccepted, a
    /// [`EngineEvent::StorageFault`] closes the report and the remaining
    /// candidates of the cycle are skipped.
    pub async fn process_cycle(
        &mut self,
        mode: Mode,
        candidates: &[PlateNumber],
        now: DateTime<Utc>,
    ) -> Result<CycleReport, StorageError> {
        let mut entries = self.store.load_membership(LogCategory::Entry).await?;
        let mut exits = self.store.load_membership(LogCategory::Exit).await?;
        let mut events = Vec::new();

        for plate in candidates {
            let decision = self.decide(mode, plate, &entries, &exits, now);
            let Some(category) = decision.category() else {
                debug!("Ignoring {} in {} mode: {:?}", plate, mode, decision);
                continue;
            };

            if let Err(e) = self.store.append(category, plate, now).await {
                error!("Failed to record {} in {} log: {}", plate, category, e);
                events.push(EngineEvent::StorageFault {
                    plate: plate.clone(),
                    category,
                    details: e.to_string(),
                    timestamp: now,
                });
                break;
            }

            if let Some(direction) = decision.debounce_direction(self.settings.fishy_debounce) {
                self.debounce.mark_accepted(direction, plate, now);
            }

            let event = match decision {
                Decision::AcceptEntry => {
                    entries.insert(plate.clone());
                    EngineEvent::EntryAccepted {
                        plate: plate.clone(),
                        timestamp: now,
                    }
                }
                Decision::AcceptExit => {
                    exits.insert(plate.clone());
                    EngineEvent::ExitAccepted {
                        plate: plate.clone(),
                        timestamp: now,
                    }
                }
                Decision::FlagUnmatchedExit => EngineEvent::UnmatchedExit {
                    plate: plate.clone(),
                    timestamp: now,
                },
                Decision::Ignore(_) => continue,
            };

            match &event {
                EngineEvent::UnmatchedExit { .. } => warn!("{}", event.description()),
                _ => info!("{}", event.description()),
            }
            events.push(event);
        }

        Ok(CycleReport {
            mode,
            events,
            occupancy: Occupancy::compute(entries.len(), exits.len(), self.settings.total_slots),
            entry_count: entries.len(),
            exit_count: exits.len(),
        })
    }

    /// Occupancy from a fresh read of the entry and exit logs
    pub async fn occupancy(&self) -> Result<Occupancy, StorageError> {
        let entries = self.store.load_membership(LogCategory::Entry).await?;
        let exits = self.store.load_membership(LogCategory::Exit).await?;
        Ok(Occupancy::compute(
            entries.len(),
            exits.len(),
            self.settings.total_slots,
        ))
    }
}
