//! Read-only views over the plate logs, used by the `platelog` tool.

use super::{LogCategory, LogStore, PlateRecord, LOG_HEADER};
use crate::error::StorageError;
use crate::occupancy::Occupancy;
use crate::plate::{PlateFormat, PlateNumber};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::Path;

/// Counts and membership derived from all three logs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSummary {
    pub entry_records: usize,
    pub exit_records: usize,
    pub fishy_records: usize,
    pub occupancy: Occupancy,
    /// Entered and not yet exited, in order of entry
    pub present: Vec<PlateNumber>,
}

impl LogSummary {
    pub async fn collect<S: LogStore + ?Sized>(
        store: &S,
        total_slots: usize,
    ) -> Result<Self, StorageError> {
        let entries = store.load_records(LogCategory::Entry).await?;
        let exits = store.load_records(LogCategory::Exit).await?;
        let fishy = store.load_records(LogCategory::Fishy).await?;

        let entered: HashSet<&PlateNumber> = entries.iter().map(|r| &r.plate).collect();
        let exited: HashSet<&PlateNumber> = exits.iter().map(|r| &r.plate).collect();

        let mut seen = HashSet::new();
        let present = entries
            .iter()
            .map(|r| &r.plate)
            .filter(|plate| !exited.contains(plate) && seen.insert(*plate))
            .cloned()
            .collect();

        Ok(Self {
            entry_records: entries.len(),
            exit_records: exits.len(),
            fishy_records: fishy.len(),
            occupancy: Occupancy::compute(entered.len(), exited.len(), total_slots),
            present,
        })
    }
}

/// A row that does not look like something the engine wrote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MalformedRow {
    /// 1-based line number in the file, counting the header
    pub line: u64,
    pub reason: String,
}

/// Problems found in one log file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogAudit {
    pub category: LogCategory,
    pub missing: bool,
    pub header_ok: bool,
    pub rows: usize,
    pub malformed: Vec<MalformedRow>,
    /// Plates recorded more than once, with their count
    pub duplicates: BTreeMap<String, usize>,
}

impl LogAudit {
    pub fn is_clean(&self) -> bool {
        !self.missing && self.header_ok && self.malformed.is_empty() && self.duplicates.is_empty()
    }

    /// Check one log file. Entry and exit logs should hold each plate at most
    /// once; the fishy log may repeat plates freely.
    pub fn run(
        category: LogCategory,
        path: &Path,
        format: &PlateFormat,
    ) -> Result<Self, StorageError> {
        let mut audit = Self {
            category,
            missing: false,
            header_ok: true,
            rows: 0,
            malformed: Vec::new(),
            duplicates: BTreeMap::new(),
        };

        let contents = match std::fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                audit.missing = true;
                return Ok(audit);
            }
            Err(e) => return Err(StorageError::unavailable(category, e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(contents.as_slice());

        audit.header_ok = match reader.headers() {
            Ok(header) => header.iter().eq(LOG_HEADER.iter().copied()),
            Err(_) => false,
        };

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for (index, row) in reader.records().enumerate() {
            let line = index as u64 + 2;
            audit.rows += 1;

            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    audit.malformed.push(MalformedRow {
                        line,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if row.len() != LOG_HEADER.len() {
                audit.malformed.push(MalformedRow {
                    line,
                    reason: format!("expected {} fields, found {}", LOG_HEADER.len(), row.len()),
                });
            }

            let plate = row.get(0).map(str::trim).unwrap_or_default();
            if format.validate(plate).is_none() {
                audit.malformed.push(MalformedRow {
                    line,
                    reason: format!("'{}' is not a valid plate", plate),
                });
            }

            let record = PlateRecord {
                plate: PlateNumber::from_log_field(plate),
                recorded_at: row.get(1).map(str::trim).unwrap_or_default().to_string(),
            };
            if record.timestamp().is_none() {
                audit.malformed.push(MalformedRow {
                    line,
                    reason: format!("'{}' is not a timestamp", record.recorded_at),
                });
            }

            if !plate.is_empty() {
                *counts.entry(plate.to_string()).or_default() += 1;
            }
        }

        if category != LogCategory::Fishy {
            audit.duplicates = counts.into_iter().filter(|(_, count)| *count > 1).collect();
        }

        Ok(audit)
    }
}
