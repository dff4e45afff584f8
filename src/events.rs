use crate::log_store::LogCategory;
use crate::plate::PlateNumber;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcomes of a reconciliation cycle that the operator should hear or see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A new vehicle was logged entering
    EntryAccepted {
        plate: PlateNumber,
        timestamp: DateTime<Utc>,
    },
    /// A known vehicle was logged leaving
    ExitAccepted {
        plate: PlateNumber,
        timestamp: DateTime<Utc>,
    },
    /// A vehicle tried to leave without ever having entered
    UnmatchedExit {
        plate: PlateNumber,
        timestamp: DateTime<Utc>,
    },
    /// A detection could not be written to its log and was dropped
    StorageFault {
        plate: PlateNumber,
        category: LogCategory,
        details: String,
        timestamp: DateTime<Utc>,
    },
}

/// Alert classes, each mapped to its own tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    Entry,
    Exit,
    Fishy,
    StorageFault,
}

impl EngineEvent {
    pub fn plate(&self) -> &PlateNumber {
        match self {
            EngineEvent::EntryAccepted { plate, .. }
            | EngineEvent::ExitAccepted { plate, .. }
            | EngineEvent::UnmatchedExit { plate, .. }
            | EngineEvent::StorageFault { plate, .. } => plate,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            EngineEvent::EntryAccepted { timestamp, .. }
            | EngineEvent::ExitAccepted { timestamp, .. }
            | EngineEvent::UnmatchedExit { timestamp, .. }
            | EngineEvent::StorageFault { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            EngineEvent::EntryAccepted { plate, .. } => format!("[ENTRY] {}", plate),
            EngineEvent::ExitAccepted { plate, .. } => format!("[EXIT] {}", plate),
            EngineEvent::UnmatchedExit { plate, .. } => {
                format!("PLATE NOT FOUND AT ENTRY: {}", plate)
            }
            EngineEvent::StorageFault {
                plate,
                category,
                details,
                ..
            } => format!("Could not record {} in {} log: {}", plate, category, details),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::EntryAccepted { .. } => "entry_accepted",
            EngineEvent::ExitAccepted { .. } => "exit_accepted",
            EngineEvent::UnmatchedExit { .. } => "unmatched_exit",
            EngineEvent::StorageFault { .. } => "storage_fault",
        }
    }

    pub fn alert_kind(&self) -> AlertKind {
        match self {
            EngineEvent::EntryAccepted { .. } => AlertKind::Entry,
            EngineEvent::ExitAccepted { .. } => AlertKind::Exit,
            EngineEvent::UnmatchedExit { .. } => AlertKind::Fishy,
            EngineEvent::StorageFault { .. } => AlertKind::StorageFault,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, EngineEvent::StorageFault { .. })
    }
}
