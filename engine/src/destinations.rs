use rs_core::{CrmAdapter, CrmRegistry};
use error::SyncError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Per-destination overridable knobs, settable via `PUT
/// /destinations/:name/config` (§6). `crm` switches which registered
/// adapter a destination name resolves to; the remaining fields tune
/// the flush/queue pipeline around it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DestinationOverride {
    pub crm: Option<String>,
    pub batch_size: Option<usize>,
    pub flush_interval_secs: Option<u64>,
    pub rate_limit_per_minute: Option<usize>,
}

struct Entry {
    crm_type: String,
    raw_config: Map<String, Value>,
    adapter: Arc<dyn CrmAdapter>,
    overrides: DestinationOverride,
}

/// Owns every CRM destination's built adapter instance, so a circuit
/// breaker's state survives across flushes instead of resetting on every
/// `try_flush` (§4.5, §4.10). `CrmRegistry` is consulted only when a
/// destination is first registered or its `crm` override changes.
pub struct DestinationStore {
    registry: Arc<CrmRegistry>,
    entries: RwLock<HashMap<String, Entry>>,
    persist_path: PathBuf,
}

impl DestinationStore {
    pub fn new(registry: Arc<CrmRegistry>, persist_path: impl Into<PathBuf>) -> Self {
        DestinationStore { registry, entries: RwLock::new(HashMap::new()), persist_path: persist_path.into() }
    }

    pub fn register(&self, name: &str, crm_type: &str, raw_config: Map<String, Value>) -> Result<(), SyncError> {
        let adapter: Arc<dyn CrmAdapter> = self.registry.build(crm_type, &raw_config)?.into();
        self.entries.write().insert(
            name.to_string(),
            Entry { crm_type: crm_type.to_string(), raw_config, adapter, overrides: DestinationOverride::default() },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CrmAdapter>> {
        self.entries.read().get(name).map(|e| e.adapter.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn schema(&self, name: &str) -> Option<Vec<(&'static str, &'static str)>> {
        let crm_type = self.entries.read().get(name).map(|e| e.crm_type.clone())?;
        self.registry.schema(&crm_type)
    }

    pub fn batch_size(&self, name: &str, default: usize) -> usize {
        self.entries.read().get(name).and_then(|e| e.overrides.batch_size).unwrap_or(default)
    }

    /// Applies `update` to `name`. A new `crm` is rebuilt from the
    /// destination's already-stored raw config; this only succeeds if
    /// that config satisfies the new adapter's schema.
    pub fn update_config(&self, name: &str, update: DestinationOverride) -> Result<(), SyncError> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(name).ok_or_else(|| SyncError::config(format!("unknown destination '{name}'")))?;

        if let Some(crm_type) = &update.crm {
            let adapter: Arc<dyn CrmAdapter> = self.registry.build(crm_type, &entry.raw_config)?.into();
            entry.adapter = adapter;
            entry.crm_type = crm_type.clone();
        }
        if update.batch_size.is_some() {
            entry.overrides.batch_size = update.batch_size;
        }
        if update.flush_interval_secs.is_some() {
            entry.overrides.flush_interval_secs = update.flush_interval_secs;
        }
        if update.rate_limit_per_minute.is_some() {
            entry.overrides.rate_limit_per_minute = update.rate_limit_per_minute;
        }
        entry.overrides.crm = Some(entry.crm_type.clone());

        let snapshot: HashMap<String, DestinationOverride> =
            entries.iter().map(|(name, entry)| (name.clone(), entry.overrides.clone())).collect();
        drop(entries);

        let value = serde_json::to_value(&snapshot)?;
        util::write_json_atomically(&self.persist_path, &value)?;
        info!(destination = name, "destination config updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::register_builtin_adapters;
    use serde_json::json;

    fn store() -> (DestinationStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(CrmRegistry::new());
        register_builtin_adapters(&registry);
        (DestinationStore::new(registry, dir.path().join("destinations.json")), dir)
    }

    fn hubspot_config() -> Map<String, Value> {
        let mut config = Map::new();
        config.insert("api_key".into(), json!("secret"));
        config
    }

    #[test]
    fn registered_adapter_is_retrievable_by_name() {
        let (store, _dir) = store();
        store.register("crm_dest", "hubspot", hubspot_config()).unwrap();
        assert!(store.get("crm_dest").is_some());
        assert_eq!(store.names(), vec!["crm_dest".to_string()]);
    }

    #[test]
    fn batch_size_override_persists_and_is_read_back() {
        let (store, _dir) = store();
        store.register("crm_dest", "hubspot", hubspot_config()).unwrap();
        store
            .update_config("crm_dest", DestinationOverride { batch_size: Some(10), ..Default::default() })
            .unwrap();
        assert_eq!(store.batch_size("crm_dest", 50), 10);
    }

    #[test]
    fn unknown_destination_update_is_config_error() {
        let (store, _dir) = store();
        assert!(store.update_config("ghost", DestinationOverride::default()).is_err());
    }
}
