//! Local mirror of the remote JSON tree under the collection.
//!
//! The event stream describes changes as `put` (replace the value at a path)
//! and `patch` (merge children into the value at a path). Applying them here
//! and re-reading the whole mirror yields the full-set snapshot the views
//! expect.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};
use crate::record::{Record, RecordBody};

/// Payload of a `put` or `patch` event.
#[derive(Debug, Deserialize)]
pub struct StreamPayload {
    /// Slash-separated path relative to the streamed location.
    pub path: String,
    /// New value (`put`) or children to merge (`patch`).
    pub data: Value,
}

impl StreamPayload {
    /// Parse an event's `data:` field.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a valid payload.
    pub fn parse(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| Error::payload(format!("bad stream payload: {e}")))
    }
}

/// The mirrored collection.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordTree {
    root: Value,
}

impl RecordTree {
    /// Create an empty mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value at `path`. A `null` value deletes it.
    pub fn put(&mut self, path: &str, data: Value) {
        let segments = split_path(path);
        set_at(&mut self.root, &segments, data);
    }

    /// Merge each child of `data` into the value at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not an object.
    pub fn patch(&mut self, path: &str, data: Value) -> Result<()> {
        let Value::Object(children) = data else {
            return Err(Error::payload("patch data must be an object"));
        };
        let base = split_path(path);
        for (key, value) in children {
            let mut segments = base.clone();
            segments.extend(split_path(&key));
            set_at(&mut self.root, &segments, value);
        }
        Ok(())
    }

    /// Decode the mirror into records, ordered by id.
    ///
    /// Children that are not question/answer objects are skipped.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        let Value::Object(children) = &self.root else {
            return Vec::new();
        };
        let mut records: Vec<Record> = children
            .iter()
            .filter_map(|(id, value)| {
                match serde_json::from_value::<RecordBody>(value.clone()) {
                    Ok(body) => Some(body.into_record(id.clone())),
                    Err(e) => {
                        warn!(%id, error = %e, "Skipping malformed record");
                        None
                    }
                }
            })
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn set_at(node: &mut Value, segments: &[String], data: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = data;
        return;
    };

    if data.is_null() {
        if let Value::Object(map) = node {
            if rest.is_empty() {
                map.remove(first);
            } else if let Some(child) = map.get_mut(first) {
                set_at(child, rest, data);
                if is_empty(child) {
                    map.remove(first);
                }
            }
        }
        return;
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(first.clone()).or_insert(Value::Null);
        set_at(child, rest, data);
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initial_put_at_root() {
        let mut tree = RecordTree::new();
        tree.put(
            "/",
            json!({
                "-b": {"question": "Q2", "answer": "A2"},
                "-a": {"question": "Q1", "answer": "A1"}
            }),
        );

        assert_eq!(
            tree.records(),
            vec![Record::new("-a", "Q1", "A1"), Record::new("-b", "Q2", "A2")]
        );
    }

    #[test]
    fn test_empty_database() {
        let mut tree = RecordTree::new();
        tree.put("/", Value::Null);
        assert!(tree.records().is_empty());
    }

    #[test]
    fn test_put_child_creates_and_replaces() {
        let mut tree = RecordTree::new();
        tree.put("/", Value::Null);
        tree.put("/-x", json!({"question": "Q", "answer": "A"}));
        tree.put("/-x", json!({"question": "Q'", "answer": "A'"}));

        assert_eq!(tree.records(), vec![Record::new("-x", "Q'", "A'")]);
    }

    #[test]
    fn test_put_null_deletes_child() {
        let mut tree = RecordTree::new();
        tree.put(
            "/",
            json!({"-a": {"question": "Q1", "answer": "A1"}, "-b": {"question": "Q2", "answer": "A2"}}),
        );
        tree.put("/-a", Value::Null);

        assert_eq!(tree.records(), vec![Record::new("-b", "Q2", "A2")]);
    }

    #[test]
    fn test_put_leaf_field() {
        let mut tree = RecordTree::new();
        tree.put("/", json!({"-a": {"question": "Q1", "answer": "A1"}}));
        tree.put("/-a/answer", json!("new"));

        assert_eq!(tree.records(), vec![Record::new("-a", "Q1", "new")]);
    }

    #[test]
    fn test_patch_merges_children() {
        let mut tree = RecordTree::new();
        tree.put("/", json!({"-a": {"question": "Q1", "answer": "A1"}}));
        tree.patch(
            "/",
            json!({"-b": {"question": "Q2", "answer": "A2"}, "-a": null}),
        )
        .unwrap();

        assert_eq!(tree.records(), vec![Record::new("-b", "Q2", "A2")]);
    }

    #[test]
    fn test_patch_requires_object() {
        let mut tree = RecordTree::new();
        assert!(tree.patch("/", json!(3)).is_err());
    }

    #[test]
    fn test_malformed_children_are_skipped() {
        let mut tree = RecordTree::new();
        tree.put(
            "/",
            json!({"-a": {"question": "Q1"}, "-b": "loose", "-c": {"question": "Q3", "answer": "A3"}}),
        );
        assert_eq!(tree.records(), vec![Record::new("-c", "Q3", "A3")]);
    }

    #[test]
    fn test_deleting_last_field_removes_record() {
        let mut tree = RecordTree::new();
        tree.put("/", json!({"-a": {"question": "Q1"}}));
        tree.put("/-a/question", Value::Null);
        assert_eq!(tree, {
            let mut expected = RecordTree::new();
            expected.put("/", json!({}));
            expected
        });
    }

    #[test]
    fn test_parse_payload() {
        let payload = StreamPayload::parse(r#"{"path":"/-a","data":null}"#).unwrap();
        assert_eq!(payload.path, "/-a");
        assert!(payload.data.is_null());

        assert!(StreamPayload::parse("nope").is_err());
    }
}
