use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info};

use crate::entities::ListingRecord;
use crate::error::{AppError, AppResult};

/// Column order of the tabular store.
pub const STORE_COLUMNS: [&str; 15] = [
    "Scraping Date",
    "Scraping Time",
    "ID",
    "Posted at",
    "Deleted at",
    "Reposted at",
    "Job Title",
    "Workplace Type",
    "Location",
    "Department",
    "Job Type",
    "Apply Link",
    "Description",
    "Requirements",
    "Benefits",
];

/// Loads and saves the whole listing history. One process owns a store at a time.
pub trait PersistentStore {
    /// A store that does not exist yet loads as empty.
    fn load(&self) -> AppResult<Vec<ListingRecord>>;

    /// Replace the persisted contents with `records`, in order.
    fn save(&self, records: &[ListingRecord]) -> AppResult<()>;
}

#[derive(Clone, Debug)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PersistentStore for CsvStore {
    fn load(&self) -> AppResult<Vec<ListingRecord>> {
        if !self.path.exists() {
            info!("No store at {}; starting from an empty history", self.path.display());
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;

        let headers = reader.headers()?.clone();
        for required in ["Scraping Date", "Scraping Time", "ID", "Job Title"] {
            if !headers.iter().any(|h| h == required) {
                return Err(AppError::StoreError(format!(
                    "{} is missing the '{}' column",
                    self.path.display(),
                    required
                )));
            }
        }

        let mut records = Vec::new();
        for (row, result) in reader.deserialize::<ListingRecord>().enumerate() {
            let record = result.map_err(|e| {
                AppError::StoreError(format!("{} row {}: {}", self.path.display(), row + 1, e))
            })?;
            records.push(record);
        }

        debug!("Loaded {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn save(&self, records: &[ListingRecord]) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Write beside the target and swap, so a crash never leaves half a file.
        let staging = self.staging_path();
        {
            let mut writer = WriterBuilder::new().has_headers(false).from_path(&staging)?;
            writer.write_record(STORE_COLUMNS)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        fs::rename(&staging, &self.path)?;

        debug!("Saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}
