use crate::adapter::CrmAdapter;
use error::SyncError;
use parking_lot::RwLock;
use serde_json::Map;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub type AdapterFactory = Arc<dyn Fn(&Map<String, serde_json::Value>) -> Result<Box<dyn CrmAdapter>, SyncError> + Send + Sync>;

/// Name -> adapter-factory lookup (§4.5, §9 "Dynamic destination
/// registry"). Factories register themselves at process init; the
/// registry is immutable after startup (§5).
#[derive(Default)]
pub struct CrmRegistry {
    factories: RwLock<HashMap<String, (AdapterFactory, Vec<(&'static str, &'static str)>)>>,
}

impl CrmRegistry {
    pub fn new() -> Self {
        CrmRegistry { factories: RwLock::new(HashMap::new()) }
    }

    pub fn register(
        &self,
        name: &str,
        schema: Vec<(&'static str, &'static str)>,
        factory: AdapterFactory,
    ) {
        let key = name.to_lowercase();
        info!(name = %key, "registering CRM adapter factory");
        self.factories.write().insert(key, (factory, schema));
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }

    pub fn schema(&self, name: &str) -> Option<Vec<(&'static str, &'static str)>> {
        self.factories.read().get(&name.to_lowercase()).map(|(_, schema)| schema.clone())
    }

    /// Looks up the factory for `name`, validates every schema key is
    /// present in `config`, and constructs the adapter.
    pub fn build(&self, name: &str, config: &Map<String, serde_json::Value>) -> Result<Box<dyn CrmAdapter>, SyncError> {
        let key = name.to_lowercase();
        let guard = self.factories.read();
        let (factory, schema) = guard
            .get(&key)
            .ok_or_else(|| SyncError::config(format!("unknown CRM destination '{name}'")))?;

        for (required_key, _) in schema {
            if !config.contains_key(*required_key) {
                return Err(SyncError::config(format!(
                    "destination '{name}' is missing required config key '{required_key}'"
                )));
            }
        }
        factory(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::CrmAdapter;
    use async_trait::async_trait;
    use serde_json::json;
    use threading::CircuitBreaker;
    use value::Record;
    use std::time::Duration;

    struct Dummy(CircuitBreaker);

    #[async_trait]
    impl CrmAdapter for Dummy {
        fn identify(&self) -> &str {
            "dummy"
        }
        fn config_schema(&self) -> Vec<(&'static str, &'static str)> {
            vec![("api_key", "token")]
        }
        fn transform(&self, record: &Record) -> Record {
            record.clone()
        }
        async fn push(&self, _record: &Record) -> Result<(), SyncError> {
            Ok(())
        }
        fn circuit_breaker(&self) -> &CircuitBreaker {
            &self.0
        }
    }

    #[test]
    fn unknown_destination_is_config_error() {
        let registry = CrmRegistry::new();
        let err = match registry.build("ghost", &Map::new()) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn missing_required_key_is_config_error() {
        let registry = CrmRegistry::new();
        registry.register(
            "dummy",
            vec![("api_key", "token")],
            Arc::new(|_cfg| Ok(Box::new(Dummy(CircuitBreaker::new(3, Duration::from_secs(30)))) as Box<dyn CrmAdapter>)),
        );
        let err = match registry.build("dummy", &Map::new()) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn builds_when_schema_satisfied() {
        let registry = CrmRegistry::new();
        registry.register(
            "dummy",
            vec![("api_key", "token")],
            Arc::new(|_cfg| Ok(Box::new(Dummy(CircuitBreaker::new(3, Duration::from_secs(30)))) as Box<dyn CrmAdapter>)),
        );
        let mut config = Map::new();
        config.insert("api_key".into(), json!("secret"));
        assert!(registry.build("Dummy", &config).is_ok());
    }
}
