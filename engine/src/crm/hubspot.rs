use crate::crm::mock_remote::MockRemote;
use async_trait::async_trait;
use rs_core::CrmAdapter;
use error::SyncError;
use serde_json::Map;
use std::time::Duration;
use threading::CircuitBreaker;
use value::Record;

/// Mock HubSpot adapter (§4.5): required config key `api_key`. `push`
/// simulates a contacts-API upsert. HubSpot here has no `pull`/
/// `fetch_recent_changes` -- exercises `SyncError::Unsupported` via the
/// trait's default implementation.
pub struct HubspotCrm {
    #[allow(dead_code)]
    api_key: String,
    remote: MockRemote,
    circuit_breaker: CircuitBreaker,
}

impl HubspotCrm {
    pub fn new(config: &Map<String, serde_json::Value>) -> Result<Self, SyncError> {
        let api_key = config
            .get("api_key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SyncError::config("hubspot: missing 'api_key'"))?
            .to_string();

        Ok(HubspotCrm { api_key, remote: MockRemote::new(), circuit_breaker: CircuitBreaker::new(5, Duration::from_secs(30)) })
    }
}

#[async_trait]
impl CrmAdapter for HubspotCrm {
    fn identify(&self) -> &str {
        "hubspot"
    }

    fn config_schema(&self) -> Vec<(&'static str, &'static str)> {
        vec![("api_key", "HubSpot private app token")]
    }

    fn transform(&self, record: &Record) -> Record {
        record.clone()
    }

    async fn push(&self, record: &Record) -> Result<(), SyncError> {
        self.remote.upsert(self.transform(record));
        Ok(())
    }

    fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use value::Operation;

    fn config() -> Map<String, serde_json::Value> {
        let mut config = Map::new();
        config.insert("api_key".into(), json!("secret"));
        config
    }

    #[tokio::test]
    async fn push_succeeds_and_pull_is_unsupported() {
        let adapter = HubspotCrm::new(&config()).unwrap();
        let record = Record::new("r1", Operation::Create, Map::new(), "hubspot");
        adapter.push(&record).await.unwrap();
        assert_eq!(adapter.remote.len(), 1);

        let err = adapter.pull().await.unwrap_err();
        assert!(matches!(err, SyncError::Unsupported(_)));
    }
}
