use async_trait::async_trait;
use rs_core::{Sink, Source};
use error::SyncError;
use parking_lot::Mutex;
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::sync::Arc;
use value::{Operation, Record, SeenIds};

/// Embedded relational source/sink over a single table (§4.6, §6). All
/// `rusqlite` calls are synchronous; each call is moved onto a blocking
/// thread via `spawn_blocking` so a poller task never stalls the runtime
/// on disk I/O.
pub struct SqliteSource {
    conn: Arc<Mutex<Connection>>,
    table: String,
    seen: Arc<Mutex<SeenIds>>,
}

impl SqliteSource {
    pub fn open(path: &str, table: impl Into<String>) -> Result<Self, SyncError> {
        let conn = Connection::open(path)?;
        Ok(SqliteSource { conn: Arc::new(Mutex::new(conn)), table: table.into(), seen: Arc::new(Mutex::new(SeenIds::new())) })
    }

    fn read_rows(conn: &Connection, table: &str) -> Result<Vec<Record>, SyncError> {
        let mut stmt = conn.prepare(&format!("SELECT record_id, data FROM {table}"))?;
        let rows = stmt.query_map([], |row| {
            let record_id: String = row.get(0)?;
            let data: String = row.get(1)?;
            Ok((record_id, data))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (record_id, data) = row?;
            let data: Map<String, Value> = serde_json::from_str(&data)?;
            records.push(Record::new(record_id, Operation::Create, data, table));
        }
        Ok(records)
    }
}

#[async_trait]
impl Source for SqliteSource {
    fn identify(&self) -> &str {
        "sqlite_source"
    }

    async fn fetch_records(&self) -> Result<Vec<Record>, SyncError> {
        let conn = self.conn.clone();
        let table = self.table.clone();
        tokio::task::spawn_blocking(move || Self::read_rows(&conn.lock(), &table))
            .await
            .map_err(|err| SyncError::TransientIo(format!("sqlite task join error: {err}")))?
    }

    async fn fetch_new_records(&self) -> Result<Vec<Record>, SyncError> {
        let all = self.fetch_records().await?;
        let mut seen = self.seen.lock();
        Ok(all.into_iter().filter(|r| seen.insert(&r.record_id)).collect())
    }
}

pub struct SqliteSink {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl SqliteSink {
    pub fn open(path: &str, table: impl Into<String>) -> Result<Self, SyncError> {
        let conn = Connection::open(path)?;
        let table = table.into();
        conn.execute(
            &format!("CREATE TABLE IF NOT EXISTS {table} (record_id TEXT PRIMARY KEY, data TEXT NOT NULL)"),
            [],
        )?;
        Ok(SqliteSink { conn: Arc::new(Mutex::new(conn)), table })
    }
}

#[async_trait]
impl Sink for SqliteSink {
    fn identify(&self) -> &str {
        "sqlite_sink"
    }

    async fn write_record(&self, record: &Record, allow_duplicates: bool) -> Result<(), SyncError> {
        let conn = self.conn.clone();
        let table = self.table.clone();
        let record_id = record.record_id.clone();
        let data = serde_json::to_string(&record.data)?;

        tokio::task::spawn_blocking(move || -> Result<(), SyncError> {
            let conn = conn.lock();
            if allow_duplicates {
                conn.execute(
                    &format!("INSERT INTO {table} (record_id, data) VALUES (?1, ?2)"),
                    rusqlite::params![record_id, data],
                )?;
            } else {
                conn.execute(
                    &format!(
                        "INSERT INTO {table} (record_id, data) VALUES (?1, ?2) \
                         ON CONFLICT(record_id) DO UPDATE SET data = excluded.data"
                    ),
                    rusqlite::params![record_id, data],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(|err| SyncError::TransientIo(format!("sqlite task join error: {err}")))?
    }
}
