use error::SyncError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// A single named node in the sync topology (§4.2): a source, a sink, or
/// a CRM destination. `type_` selects which factory builds it; the
/// remaining fields are adapter-specific and validated against that
/// adapter's `config_schema` at build time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopologyEntry {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Name -> topology entry, loaded once at startup from JSON (§4.2).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Topology(HashMap<String, TopologyEntry>);

impl Topology {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| SyncError::config(format!("reading topology {}: {err}", path.display())))?;
        let topology: Topology = serde_json::from_str(&raw)?;
        Ok(topology)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &TopologyEntry)> {
        self.0.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TopologyEntry> {
        self.0.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_entries_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");
        std::fs::write(
            &path,
            r#"{
                "leads_file": {"type": "file_source", "path": "/data/leads.jsonl"},
                "salesforce": {"type": "salesforce", "api_key": "secret"}
            }"#,
        )
        .unwrap();

        let topology = Topology::load(&path).unwrap();
        assert_eq!(topology.get("leads_file").unwrap().type_, "file_source");
        assert_eq!(topology.get("salesforce").unwrap().fields.get("api_key").unwrap(), "secret");
        assert!(topology.get("missing").is_none());
        assert_eq!(topology.names().len(), 2);
    }
}
