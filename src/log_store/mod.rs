//! Durable, append-only plate logs.
//!
//! Each [`LogCategory`] is an ordered sequence of `(plate, time)` records.
//! Records are only ever appended; membership is always answered by scanning
//! the full log so that restarts and manual edits are honoured.

mod file;
mod memory;
mod report;
mod timestamp;

pub use file::{CsvLogStore, LOG_HEADER};
pub use memory::MemoryLogStore;
pub use report::{LogAudit, LogSummary, MalformedRow};
pub use timestamp::{parse_timestamp, LogTimeZone, TIMESTAMP_FORMAT};

use crate::error::StorageError;
use crate::plate::PlateNumber;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The three durable logs kept for the lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogCategory {
    Entry,
    Exit,
    /// Exit detections with no matching entry
    Fishy,
}

impl LogCategory {
    pub const ALL: [LogCategory; 3] = [LogCategory::Entry, LogCategory::Exit, LogCategory::Fishy];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Entry => "entry",
            LogCategory::Exit => "exit",
            LogCategory::Fishy => "fishy",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a plate log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateRecord {
    pub plate: PlateNumber,
    /// The `Time` column exactly as stored
    pub recorded_at: String,
}

impl PlateRecord {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.recorded_at)
    }
}

/// Storage backend for the plate logs
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Create the log for `category` if it does not exist. Never truncates.
    async fn ensure_category(&self, category: LogCategory) -> Result<(), StorageError>;

    /// Read every record of `category` in the order it was written
    async fn load_records(&self, category: LogCategory) -> Result<Vec<PlateRecord>, StorageError>;

    /// Durably append one record. Returns only after the record is on stable storage.
    async fn append(
        &self,
        category: LogCategory,
        plate: &PlateNumber,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Distinct plates present in `category`, from a full scan of the log
    async fn load_membership(
        &self,
        category: LogCategory,
    ) -> Result<HashSet<PlateNumber>, StorageError> {
        let records = self.load_records(category).await?;
        Ok(records.into_iter().map(|record| record.plate).collect())
    }

    async fn ensure_all(&self) -> Result<(), StorageError> {
        for category in LogCategory::ALL {
            self.ensure_category(category).await?;
        }
        Ok(())
    }
}
