use error::SyncError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Process-wide configuration, loaded from a single TOML file (§4.1).
/// Each top-level TOML table becomes a named section; sections are handed
/// to adapter/source/sink factories as plain JSON so the core crate never
/// needs to know the shape of any particular destination's config.
pub struct Config {
    sections: HashMap<String, Map<String, Value>>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| SyncError::config(format!("reading config {}: {err}", path.display())))?;
        let table: toml::value::Table = toml::from_str(&raw)
            .map_err(|err| SyncError::config(format!("parsing config {}: {err}", path.display())))?;

        let mut sections = HashMap::new();
        for (name, value) in table {
            let json = serde_json::to_value(value)?;
            let Value::Object(section) = json else {
                debug!(section = %name, "skipping non-table top-level config entry");
                continue;
            };
            sections.insert(name, section);
        }
        Ok(Config { sections })
    }

    pub fn empty() -> Self {
        Config { sections: HashMap::new() }
    }

    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.sections.get(name)
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }
}
