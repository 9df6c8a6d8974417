use crate::crm::mock_remote::MockRemote;
use async_trait::async_trait;
use rs_core::CrmAdapter;
use error::SyncError;
use serde_json::Map;
use std::time::Duration;
use threading::CircuitBreaker;
use value::Record;

/// Mock Salesforce adapter (§4.5): required config keys `api_token`,
/// `instance_url`. `push` simulates a REST upsert against the mock
/// remote; `fetch_recent_changes` simulates an incremental query
/// filtered by a `SystemModstamp`-like watermark.
pub struct SalesforceCrm {
    #[allow(dead_code)]
    api_token: String,
    #[allow(dead_code)]
    instance_url: String,
    remote: MockRemote,
    circuit_breaker: CircuitBreaker,
}

impl SalesforceCrm {
    pub fn new(config: &Map<String, serde_json::Value>) -> Result<Self, SyncError> {
        let api_token = config
            .get("api_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SyncError::config("salesforce: missing 'api_token'"))?
            .to_string();
        let instance_url = config
            .get("instance_url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SyncError::config("salesforce: missing 'instance_url'"))?
            .to_string();

        Ok(SalesforceCrm {
            api_token,
            instance_url,
            remote: MockRemote::new(),
            circuit_breaker: CircuitBreaker::new(5, Duration::from_secs(30)),
        })
    }
}

#[async_trait]
impl CrmAdapter for SalesforceCrm {
    fn identify(&self) -> &str {
        "salesforce"
    }

    fn config_schema(&self) -> Vec<(&'static str, &'static str)> {
        vec![("api_token", "OAuth bearer token"), ("instance_url", "Salesforce instance base URL")]
    }

    fn transform(&self, record: &Record) -> Record {
        record.clone()
    }

    async fn push(&self, record: &Record) -> Result<(), SyncError> {
        self.remote.upsert(self.transform(record));
        Ok(())
    }

    async fn fetch_recent_changes(&self, since_ms: i64) -> Result<Vec<Record>, SyncError> {
        Ok(self.remote.since(since_ms))
    }

    fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }
}
