/// Whole-snapshot application state
///
/// One serialized unit per account: tasks, history, badges, patterns, and
/// settings, with the modification timestamp embedded. The server stores and
/// returns it verbatim; only the client ever looks at the interior, so the
/// item types stay loose.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Value>,
    #[serde(default)]
    pub history: Vec<Value>,
    #[serde(default)]
    pub badges: Vec<Value>,
    #[serde(default)]
    pub patterns: Map<String, Value>,
    #[serde(default)]
    pub settings: Value,
    /// Modification timestamp, ms since epoch
    #[serde(default)]
    pub modified: i64,
}

impl Snapshot {
    /// A fresh snapshot for an account that has never synced
    pub fn empty() -> Self {
        Self {
            tasks: Vec::new(),
            history: Vec::new(),
            badges: Vec::new(),
            patterns: Map::new(),
            settings: Value::Null,
            modified: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_fills_missing_sections() {
        let snapshot: Snapshot = serde_json::from_value(json!({ "modified": 42 })).unwrap();
        assert!(snapshot.tasks.is_empty());
        assert_eq!(snapshot.modified, 42);
    }

    #[test]
    fn test_round_trips_opaque_items() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "tasks": [{ "id": 1, "text": "deep work", "kind": "focus" }],
            "settings": { "targetRatio": 80, "firstName": "Ada" },
            "modified": 1000
        }))
        .unwrap();
        let back = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(back["tasks"][0]["text"], "deep work");
        assert_eq!(back["settings"]["targetRatio"], 80);
    }
}
