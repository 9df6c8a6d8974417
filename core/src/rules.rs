use error::SyncError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use value::Record;

/// Per-destination admission rules, per §3: all `required_fields` must be
/// present and truthy; a record is rejected if any `disallow_if` field
/// equals the listed value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct DestinationRules {
    #[serde(default)]
    required_fields: Vec<String>,
    #[serde(default)]
    disallow_if: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct RulesDocument {
    #[serde(default)]
    filters: Map<String, Value>,
    #[serde(default)]
    mappings: Map<String, Value>,
    /// Everything else is a per-destination subdocument, keyed by
    /// destination name.
    #[serde(flatten)]
    destinations: Map<String, Value>,
}

/// Holds the current rules document under a mutex and persists updates to
/// stable storage (§4.4). Hot-reloadable via `update_rules`.
pub struct RulesEngine {
    doc: Mutex<RulesDocument>,
    path: PathBuf,
}

impl RulesEngine {
    /// Loads the rules document from `path` if it exists, otherwise starts
    /// with an empty (permissive) document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref().to_path_buf();
        let doc = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            RulesDocument::default()
        };
        Ok(RulesEngine { doc: Mutex::new(doc), path })
    }

    pub fn empty(path: impl AsRef<Path>) -> Self {
        RulesEngine { doc: Mutex::new(RulesDocument::default()), path: path.as_ref().to_path_buf() }
    }

    /// §4.4: missing per-destination rules admits unconditionally.
    pub fn should_sync(&self, dest: &str, record: &Record) -> bool {
        let doc = self.doc.lock();
        let Some(raw) = doc.destinations.get(dest) else {
            return true;
        };
        let rules: DestinationRules = match serde_json::from_value(raw.clone()) {
            Ok(rules) => rules,
            Err(err) => {
                debug!(dest, %err, "malformed destination rules, admitting by default");
                return true;
            }
        };

        for field in &rules.required_fields {
            if !record.field_is_truthy(field) {
                return false;
            }
        }
        for (field, expected) in &rules.disallow_if {
            if record.field_equals(field, expected) {
                return false;
            }
        }
        true
    }

    /// §4.4: missing top-level `filters` matches unconditionally.
    pub fn matches(&self, record: &Record) -> bool {
        let doc = self.doc.lock();
        if doc.filters.is_empty() {
            return true;
        }
        doc.filters.iter().all(|(field, expected)| record.field_equals(field, expected))
    }

    /// Builds a new record containing only mapped fields; fields absent
    /// from the input are omitted silently. Returns the transformed record
    /// plus a flag signalling an empty result, which the caller surfaces
    /// as a warning rather than treating as an error.
    pub fn transform(&self, record: &Record) -> (Record, bool) {
        let doc = self.doc.lock();
        let mut transformed = record.clone();

        let mut data = Map::new();
        for (source_field, target_field) in &doc.mappings {
            let Some(target_field) = target_field.as_str() else { continue };
            if let Some(value) = record.data.get(source_field) {
                data.insert(target_field.to_string(), value.clone());
            }
        }
        let is_empty = data.is_empty();
        transformed.data = data;
        (transformed, is_empty)
    }

    /// Validates that `doc` is a JSON object, atomically swaps the
    /// in-memory document, and persists it before returning.
    pub fn update_rules(&self, doc: Value) -> Result<(), SyncError> {
        let Value::Object(_) = &doc else {
            return Err(SyncError::config("rules document must be a JSON object"));
        };
        let parsed: RulesDocument = serde_json::from_value(doc.clone())?;

        util::write_json_atomically(&self.path, &doc)?;
        *self.doc.lock() = parsed;
        info!(path = %self.path.display(), "rules document updated");
        Ok(())
    }

    pub fn current(&self) -> Value {
        serde_json::to_value(&*self.doc.lock()).unwrap_or(Value::Object(Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use value::Operation;

    fn record(data: Value) -> Record {
        Record::new("r1", Operation::Create, data.as_object().unwrap().clone(), "salesforce")
    }

    fn engine_with(doc: Value) -> RulesEngine {
        let dir = tempfile::tempdir().unwrap();
        let engine = RulesEngine::empty(dir.path().join("rules.json"));
        engine.update_rules(doc).unwrap();
        engine
    }

    // Scenario S1
    #[test]
    fn admission_by_required_fields_and_disallow_if() {
        let engine = engine_with(json!({
            "salesforce": {"required_fields": ["email"], "disallow_if": {"do_not_sync": true}}
        }));

        assert!(engine.should_sync("salesforce", &record(json!({"email": "a@b"}))));
        assert!(!engine.should_sync("salesforce", &record(json!({"email": ""}))));
        assert!(!engine.should_sync(
            "salesforce",
            &record(json!({"email": "a@b", "do_not_sync": true}))
        ));
    }

    #[test]
    fn missing_destination_rules_admits() {
        let engine = engine_with(json!({}));
        assert!(engine.should_sync("unconfigured", &record(json!({}))));
    }

    // Scenario S6
    #[test]
    fn hot_update_changes_match_and_transform_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let engine = RulesEngine::empty(&path);

        engine
            .update_rules(json!({"filters": {"status": "active"}, "mappings": {"name": "FirstName"}}))
            .unwrap();

        assert!(!engine.matches(&record(json!({"status": "inactive"}))));
        let (transformed, empty) = engine.transform(&record(json!({"name": "Jo", "status": "active"})));
        assert!(!empty);
        assert_eq!(transformed.data.get("FirstName").unwrap(), "Jo");
        assert!(transformed.data.get("status").is_none());

        let persisted: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(persisted["filters"]["status"], "active");
    }

    // Invariant 6: verdict independent of key insertion order.
    #[test]
    fn should_sync_is_order_independent() {
        let forward = engine_with(json!({
            "sf": {"required_fields": ["a"], "disallow_if": {"b": 1}}
        }));
        let backward = engine_with(json!({
            "sf": {"disallow_if": {"b": 1}, "required_fields": ["a"]}
        }));
        let r = record(json!({"a": "x", "b": 1}));
        assert_eq!(forward.should_sync("sf", &r), backward.should_sync("sf", &r));
    }

    // Invariant 7: transform is idempotent when mapped targets are absent
    // from the source field set.
    #[test]
    fn transform_is_idempotent() {
        let engine = engine_with(json!({"mappings": {"name": "FirstName"}}));
        let r = record(json!({"name": "Jo"}));
        let (once, _) = engine.transform(&r);
        let (twice, _) = engine.transform(&once);
        assert_eq!(once.data, twice.data);
    }

    #[test]
    fn update_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let engine = RulesEngine::empty(dir.path().join("rules.json"));
        assert!(engine.update_rules(json!([1, 2, 3])).is_err());
    }
}
