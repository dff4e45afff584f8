use super::{LogCategory, LogStore, LogTimeZone, PlateRecord};
use crate::config::LogConfig;
use crate::error::{PlatecamError, Result, StorageError};
use crate::plate::PlateNumber;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Header row of every plate log
pub const LOG_HEADER: [&str; 2] = ["Plate Number", "Time"];

/// Plate logs stored as one CSV file per category
#[derive(Debug, Clone)]
pub struct CsvLogStore {
    directory: PathBuf,
    file_names: HashMap<LogCategory, String>,
    zone: LogTimeZone,
}

impl CsvLogStore {
    /// Create a store in `directory` using the default file names
    pub fn new<P: Into<PathBuf>>(directory: P, zone: LogTimeZone) -> Self {
        let file_names = LogCategory::ALL
            .iter()
            .map(|category| (*category, default_file_name(*category).to_string()))
            .collect();

        Self {
            directory: directory.into(),
            file_names,
            zone,
        }
    }

    pub fn from_config(config: &LogConfig) -> Result<Self> {
        let zone = LogTimeZone::resolve(&config.timezone).map_err(PlatecamError::system)?;

        Ok(Self::new(&config.directory, zone)
            .with_file_name(LogCategory::Entry, &config.entry_file)
            .with_file_name(LogCategory::Exit, &config.exit_file)
            .with_file_name(LogCategory::Fishy, &config.fishy_file))
    }

    pub fn with_file_name(mut self, category: LogCategory, name: &str) -> Self {
        self.file_names.insert(category, name.to_string());
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn zone(&self) -> LogTimeZone {
        self.zone
    }

    /// Location of the CSV file backing `category`
    pub fn path(&self, category: LogCategory) -> PathBuf {
        let name = self
            .file_names
            .get(&category)
            .map(String::as_str)
            .unwrap_or_else(|| default_file_name(category));
        self.directory.join(name)
    }

    fn encode_row(category: LogCategory, fields: [&str; 2]) -> std::result::Result<Vec<u8>, StorageError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(fields)
            .map_err(|e| StorageError::unavailable(category, e))?;
        writer
            .into_inner()
            .map_err(|e| StorageError::unavailable(category, e.error()))
    }
}

/// Whether `file` is empty or its last byte is a line feed
async fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(true);
    }

    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

fn default_file_name(category: LogCategory) -> &'static str {
    match category {
        LogCategory::Entry => "detected_plates.csv",
        LogCategory::Exit => "exited_plates.csv",
        LogCategory::Fishy => "fishy_plates.csv",
    }
}

#[async_trait]
impl LogStore for CsvLogStore {
    async fn ensure_category(&self, category: LogCategory) -> std::result::Result<(), StorageError> {
        fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| StorageError::unavailable(category, e))?;

        let path = self.path(category);

        // create_new refuses to touch an existing file, so existing history is never truncated
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => {
                info!("Created {} log: {}", category, path.display());
                file
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let len = fs::metadata(&path)
                    .await
                    .map_err(|e| StorageError::unavailable(category, e))?
                    .len();
                if len > 0 {
                    return Ok(());
                }

                // Left empty by a crash before the header landed, or truncated by hand
                warn!("{} log at {} is empty, restoring header", category, path.display());
                OpenOptions::new()
                    .append(true)
                    .open(&path)
                    .await
                    .map_err(|e| StorageError::unavailable(category, e))?
            }
            Err(e) => return Err(StorageError::unavailable(category, e)),
        };

        let header = Self::encode_row(category, LOG_HEADER)?;
        file.write_all(&header)
            .await
            .map_err(|e| StorageError::unavailable(category, e))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::unavailable(category, e))?;

        Ok(())
    }

    async fn load_records(
        &self,
        category: LogCategory,
    ) -> std::result::Result<Vec<PlateRecord>, StorageError> {
        let path = self.path(category);

        let contents = match fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("{} log missing at {}, treating as empty", category, path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(StorageError::unavailable(category, e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(contents.as_slice());

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!("Skipping unreadable row {} in {}: {}", index + 2, path.display(), e);
                    continue;
                }
            };

            let plate = row.get(0).map(str::trim).unwrap_or_default();
            if plate.is_empty() {
                continue;
            }

            records.push(PlateRecord {
                plate: PlateNumber::from_log_field(plate),
                recorded_at: row.get(1).map(str::trim).unwrap_or_default().to_string(),
            });
        }

        debug!("Loaded {} record(s) from {} log", records.len(), category);
        Ok(records)
    }

    async fn append(
        &self,
        category: LogCategory,
        plate: &PlateNumber,
        timestamp: DateTime<Utc>,
    ) -> std::result::Result<(), StorageError> {
        // Recreate the header if the file vanished underneath us
        self.ensure_category(category).await?;

        let stamp = self.zone.format(timestamp);
        let row = Self::encode_row(category, [plate.as_str(), stamp.as_str()])?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(self.path(category))
            .await
            .map_err(|e| StorageError::unavailable(category, e))?;

        // A hand-edited log may end without a newline; terminate it so the row
        // is not glued onto the last record
        let mut payload = Vec::with_capacity(row.len() + 1);
        if !ends_with_newline(&mut file)
            .await
            .map_err(|e| StorageError::unavailable(category, e))?
        {
            payload.push(b'\n');
        }
        payload.extend_from_slice(&row);

        file.write_all(&payload)
            .await
            .map_err(|e| StorageError::unavailable(category, e))?;
        file.sync_data()
            .await
            .map_err(|e| StorageError::unavailable(category, e))?;

        debug!("Appended {} to {} log at {}", plate, category, stamp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::plate;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn utc_store(dir: &Path) -> CsvLogStore {
        CsvLogStore::new(dir, LogTimeZone::Named(chrono_tz::UTC))
    }

    #[tokio::test]
    async fn test_ensure_creates_header_only_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = utc_store(temp_dir.path());

        store.ensure_all().await.unwrap();

        for category in LogCategory::ALL {
            let contents = std::fs::read_to_string(store.path(category)).unwrap();
            assert_eq!(contents.trim_end(), "Plate Number,Time");
        }
        assert!(temp_dir.path().join("detected_plates.csv").exists());
        assert!(temp_dir.path().join("exited_plates.csv").exists());
        assert!(temp_dir.path().join("fishy_plates.csv").exists());
    }

    #[tokio::test]
    async fn test_ensure_never_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let store = utc_store(temp_dir.path());
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

        store.ensure_category(LogCategory::Entry).await.unwrap();
        store.append(LogCategory::Entry, &plate("MH12AB1234"), now).await.unwrap();
        store.ensure_category(LogCategory::Entry).await.unwrap();
        store.ensure_all().await.unwrap();

        let records = store.load_records(LogCategory::Entry).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].plate, plate("MH12AB1234"));
        assert_eq!(records[0].recorded_at, "2024-05-06 07:08:09");
    }

    #[tokio::test]
    async fn test_append_only_ordering_and_membership() {
        let temp_dir = TempDir::new().unwrap();
        let store = utc_store(temp_dir.path());
        store.ensure_all().await.unwrap();

        let plates = ["KA01MJ2022", "TN09BX0001", "DL04C5678"];
        for (i, p) in plates.iter().enumerate() {
            let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, i as u32).unwrap();
            store.append(LogCategory::Exit, &plate(p), at).await.unwrap();
        }

        let records = store.load_records(LogCategory::Exit).await.unwrap();
        let order: Vec<&str> = records.iter().map(|r| r.plate.as_str()).collect();
        assert_eq!(order, plates.to_vec());

        let membership = store.load_membership(LogCategory::Exit).await.unwrap();
        assert_eq!(membership.len(), 3);
        assert!(plates.iter().all(|p| membership.contains(&plate(p))));
        assert!(store.load_membership(LogCategory::Entry).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_hand_edited_logs() {
        let temp_dir = TempDir::new().unwrap();
        let store = utc_store(temp_dir.path());
        std::fs::write(
            store.path(LogCategory::Entry),
            "Plate Number,Time\r\nMH12AB1234,2024-01-01 10:00:00\r\n\r\n ,2024-01-01 10:00:01\r\nKA01MJ2022\r\nMH12AB1234,2024-01-02 10:00:00\r\n",
        )
        .unwrap();

        let records = store.load_records(LogCategory::Entry).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].recorded_at, "");
        assert!(records[1].timestamp().is_none());
        assert!(records[0].timestamp().is_some());

        let membership = store.load_membership(LogCategory::Entry).await.unwrap();
        assert_eq!(membership.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty_and_append_restores_header() {
        let temp_dir = TempDir::new().unwrap();
        let store = utc_store(temp_dir.path());

        assert!(store.load_records(LogCategory::Fishy).await.unwrap().is_empty());

        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        store.append(LogCategory::Fishy, &plate("MH12AB1234"), now).await.unwrap();

        let contents = std::fs::read_to_string(store.path(LogCategory::Fishy)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["Plate Number,Time", "MH12AB1234,2024-05-06 07:08:09"]);
    }

    #[tokio::test]
    async fn test_append_after_unterminated_last_line() {
        let temp_dir = TempDir::new().unwrap();
        let store = utc_store(temp_dir.path());
        std::fs::write(
            store.path(LogCategory::Entry),
            "Plate Number,Time\nMH12AB1234,2024-01-01 10:00:00",
        )
        .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        store.append(LogCategory::Entry, &plate("KA01MJ2022"), now).await.unwrap();

        let records = store.load_records(LogCategory::Entry).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].plate, plate("MH12AB1234"));
        assert_eq!(records[0].recorded_at, "2024-01-01 10:00:00");
        assert_eq!(records[1].plate, plate("KA01MJ2022"));
        assert_eq!(records[1].recorded_at, "2024-05-06 07:08:09");

        let contents = std::fs::read_to_string(store.path(LogCategory::Entry)).unwrap();
        assert_eq!(
            contents,
            "Plate Number,Time\nMH12AB1234,2024-01-01 10:00:00\nKA01MJ2022,2024-05-06 07:08:09\n"
        );
    }

    #[tokio::test]
    async fn test_ensure_restores_header_of_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = utc_store(temp_dir.path());
        std::fs::write(store.path(LogCategory::Entry), "").unwrap();

        store.ensure_all().await.unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        store.append(LogCategory::Entry, &plate("KA01MJ2022"), now).await.unwrap();

        let contents = std::fs::read_to_string(store.path(LogCategory::Entry)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["Plate Number,Time", "KA01MJ2022,2024-05-06 07:08:09"]);

        let membership = store.load_membership(LogCategory::Entry).await.unwrap();
        assert!(membership.contains(&plate("KA01MJ2022")));
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the log directory should be
        let blocker = temp_dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"").unwrap();
        let store = utc_store(&blocker);

        let err = store
            .append(LogCategory::Entry, &plate("MH12AB1234"), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.category(), LogCategory::Entry);
    }

    #[tokio::test]
    async fn test_custom_file_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = utc_store(temp_dir.path()).with_file_name(LogCategory::Fishy, "alerts.csv");
        store.ensure_category(LogCategory::Fishy).await.unwrap();
        assert!(temp_dir.path().join("alerts.csv").exists());
    }
}
