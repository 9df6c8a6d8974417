use crate::Operation;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::collections::HashSet;

/// The unit of sync. `record_id` is opaque and only required to be unique
/// within its originating source; `destination` names the target adapter
/// (a CRM name, or a configured sink). `arrived_at` is stamped on ingress
/// and is never supplied by a caller.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub record_id: String,
    pub operation: Operation,
    pub data: Map<String, serde_json::Value>,
    pub destination: String,
    #[serde(default)]
    pub arrived_at: i64,
}

impl Record {
    pub fn new(
        record_id: impl Into<String>,
        operation: Operation,
        data: Map<String, serde_json::Value>,
        destination: impl Into<String>,
    ) -> Self {
        Record {
            record_id: record_id.into(),
            operation,
            data,
            destination: destination.into(),
            arrived_at: Utc::now().timestamp_millis(),
        }
    }

    /// A field is "present and truthy" when it exists and is not `null`,
    /// `false`, an empty string, or an empty array/object.
    pub fn field_is_truthy(&self, field: &str) -> bool {
        match self.data.get(field) {
            None => false,
            Some(v) => match v {
                serde_json::Value::Null => false,
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::String(s) => !s.is_empty(),
                serde_json::Value::Array(a) => !a.is_empty(),
                serde_json::Value::Object(o) => !o.is_empty(),
                _ => true,
            },
        }
    }

    pub fn field_equals(&self, field: &str, expected: &serde_json::Value) -> bool {
        self.data.get(field).map(|v| v == expected).unwrap_or(false)
    }
}

/// Tracks `record_id`s a poller has already emitted, so file and embedded
/// SQL sources never re-emit within the process lifetime (invariant 4).
#[derive(Default, Debug)]
pub struct SeenIds(HashSet<String>);

impl SeenIds {
    pub fn new() -> Self {
        SeenIds(HashSet::new())
    }

    /// Returns `true` if this id had not been seen before (and marks it seen).
    pub fn insert(&mut self, id: &str) -> bool {
        if self.0.contains(id) {
            false
        } else {
            self.0.insert(id.to_string());
            true
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_checks_match_spec_definition() {
        let mut data = Map::new();
        data.insert("email".into(), serde_json::json!(""));
        data.insert("active".into(), serde_json::json!(true));
        let record = Record::new("r1", Operation::Create, data, "salesforce");

        assert!(!record.field_is_truthy("email"));
        assert!(record.field_is_truthy("active"));
        assert!(!record.field_is_truthy("missing"));
    }

    #[test]
    fn seen_ids_only_admits_first_observation() {
        let mut seen = SeenIds::new();
        assert!(seen.insert("a"));
        assert!(!seen.insert("a"));
        assert!(seen.insert("b"));
    }
}
