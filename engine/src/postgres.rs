use async_trait::async_trait;
use rs_core::Source;
use error::SyncError;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};
use value::{Operation, Record, SeenIds};

/// Remote relational source over `tokio-postgres` (§4.6, §6). Connects
/// eagerly at construction and keeps the connection task alive for the
/// adapter's lifetime, mirroring the reference engine's persistent
/// connector pattern.
pub struct PostgresSource {
    client: Client,
    table: String,
    seen: Mutex<SeenIds>,
}

impl PostgresSource {
    pub async fn connect(conninfo: &str, table: impl Into<String>) -> Result<Self, SyncError> {
        let (client, connection) = tokio_postgres::connect(conninfo, NoTls).await?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(%err, "postgres connection task terminated");
            }
        });
        Ok(PostgresSource { client, table: table.into(), seen: Mutex::new(SeenIds::new()) })
    }

    async fn read_rows(&self) -> Result<Vec<Record>, SyncError> {
        let query = format!("SELECT record_id, data FROM {}", self.table);
        let rows = self.client.query(&query, &[]).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record_id: String = row.get(0);
            let data: String = row.get(1);
            let data: Map<String, Value> = serde_json::from_str(&data)?;
            records.push(Record::new(record_id, Operation::Create, data, self.table.clone()));
        }
        Ok(records)
    }
}

#[async_trait]
impl Source for PostgresSource {
    fn identify(&self) -> &str {
        "postgres_source"
    }

    async fn fetch_records(&self) -> Result<Vec<Record>, SyncError> {
        self.read_rows().await
    }

    async fn fetch_new_records(&self) -> Result<Vec<Record>, SyncError> {
        let all = self.read_rows().await?;
        let mut seen = self.seen.lock().await;
        Ok(all.into_iter().filter(|r| seen.insert(&r.record_id)).collect())
    }
}
