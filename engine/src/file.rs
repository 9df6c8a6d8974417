use async_trait::async_trait;
use rs_core::{Sink, Source};
use error::SyncError;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;
use value::{Record, SeenIds};

/// Source/Sink backed by a JSON array file (§4.6, §6). The sink rewrites
/// the whole array on every write; the source tracks previously-emitted
/// ids in memory so `fetch_new_records` never re-emits within the
/// process lifetime.
pub struct FileSource {
    path: PathBuf,
    seen: Mutex<SeenIds>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into(), seen: Mutex::new(SeenIds::new()) }
    }

    fn read_all(&self) -> Result<Vec<Record>, SyncError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<Value> = serde_json::from_str(&raw)?;
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(SyncError::from))
            .collect()
    }
}

#[async_trait]
impl Source for FileSource {
    fn identify(&self) -> &str {
        "file_source"
    }

    async fn fetch_records(&self) -> Result<Vec<Record>, SyncError> {
        self.read_all()
    }

    async fn fetch_new_records(&self) -> Result<Vec<Record>, SyncError> {
        let all = self.read_all()?;
        let mut seen = self.seen.lock();
        Ok(all.into_iter().filter(|r| seen.insert(&r.record_id)).collect())
    }
}

pub struct FileSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into(), write_lock: Mutex::new(()) }
    }

    fn read_all(&self) -> Result<Vec<Record>, SyncError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<Value> = serde_json::from_str(&raw)?;
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(SyncError::from))
            .collect()
    }
}

#[async_trait]
impl Sink for FileSink {
    fn identify(&self) -> &str {
        "file_sink"
    }

    /// Rewrites the whole array, deduplicating on `record_id` unless
    /// `allow_duplicates` is set (§6, invariant 5).
    async fn write_record(&self, record: &Record, allow_duplicates: bool) -> Result<(), SyncError> {
        let _guard = self.write_lock.lock();
        let mut records = self.read_all()?;

        if !allow_duplicates {
            if let Some(existing) = records.iter_mut().find(|r| r.record_id == record.record_id) {
                *existing = record.clone();
                debug!(record_id = %record.record_id, "overwrote existing record in file sink");
                let values: Vec<Value> = records.into_iter().map(|r| serde_json::to_value(r)).collect::<Result<_, _>>()?;
                let body = serde_json::to_vec_pretty(&values)?;
                std::fs::write(&self.path, body)?;
                return Ok(());
            }
        }

        records.push(record.clone());
        let values: Vec<Value> = records.into_iter().map(|r| serde_json::to_value(r)).collect::<Result<_, _>>()?;
        let body = serde_json::to_vec_pretty(&values)?;
        std::fs::write(&self.path, body)?;
        Ok(())
    }
}
