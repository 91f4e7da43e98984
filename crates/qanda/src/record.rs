//! Core record types for qanda.
//!
//! A [`Record`] is a question/answer pair keyed by a store-assigned id. A
//! [`RecordSet`] is the full client-side copy of the collection as delivered by
//! the last subscription update.

use serde::{Deserialize, Serialize};

/// A question/answer pair identified by a store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier, sortable by insertion.
    pub id: String,
    /// The question text.
    pub question: String,
    /// The answer text.
    pub answer: String,
}

impl Record {
    /// Create a record from its parts.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Check whether this record's question starts with `prefix`, ignoring case.
    #[must_use]
    pub fn question_starts_with(&self, prefix: &str) -> bool {
        self.question
            .to_lowercase()
            .starts_with(&prefix.to_lowercase())
    }
}

/// The value stored under a record id.
///
/// This is the body of a write: the id lives in the key, not in the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBody {
    /// The question text.
    pub question: String,
    /// The answer text.
    pub answer: String,
}

impl RecordBody {
    /// Attach an id to produce a full record.
    #[must_use]
    pub fn into_record(self, id: impl Into<String>) -> Record {
        Record {
            id: id.into(),
            question: self.question,
            answer: self.answer,
        }
    }
}

/// The full set of records from one subscription update.
///
/// Always non-empty: an update carrying zero records is represented as
/// `None` by [`RecordSet::from_records`], which the views render as "no data".
/// Records keep the order in which the store delivered them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Build a record set, collapsing an empty update to `None`.
    #[must_use]
    pub fn from_records(records: Vec<Record>) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self { records })
        }
    }

    /// Number of records in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Check whether a record with this id is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Check whether any record has exactly this question text.
    ///
    /// The comparison is case-sensitive and whole-string.
    #[must_use]
    pub fn has_question(&self, question: &str) -> bool {
        self.records.iter().any(|r| r.question == question)
    }

    /// Iterate over the records in delivery order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Records whose question starts with `filter`, ignoring case.
    ///
    /// An empty filter returns every record.
    #[must_use]
    pub fn filtered(&self, filter: &str) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|r| r.question_starts_with(filter))
            .collect()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordSet {
        RecordSet::from_records(vec![
            Record::new("01", "What is Rust?", "A language"),
            Record::new("02", "what is cargo?", "A build tool"),
            Record::new("03", "Why borrow?", "Safety"),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_update_collapses_to_none() {
        assert!(RecordSet::from_records(Vec::new()).is_none());
    }

    #[test]
    fn test_non_empty_update() {
        let set = sample();
        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_get_and_contains() {
        let set = sample();
        assert_eq!(set.get("02").unwrap().answer, "A build tool");
        assert!(set.contains("03"));
        assert!(!set.contains("04"));
    }

    #[test]
    fn test_has_question_is_exact_and_case_sensitive() {
        let set = sample();
        assert!(set.has_question("What is Rust?"));
        assert!(!set.has_question("what is rust?"));
        assert!(!set.has_question("What is"));
    }

    #[test]
    fn test_filter_is_case_insensitive_prefix() {
        let set = sample();
        let ids: Vec<&str> = set.filtered("WHAT").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["01", "02"]);

        // Substring matches do not count
        assert!(set.filtered("rust").is_empty());
    }

    #[test]
    fn test_empty_filter_shows_all() {
        let set = sample();
        assert_eq!(set.filtered("").len(), set.len());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let set = sample();
        assert_eq!(set.filtered("wh"), set.filtered("wh"));
    }

    #[test]
    fn test_filter_keeps_delivery_order() {
        let set = sample();
        let ids: Vec<&str> = set.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["01", "02", "03"]);
    }

    #[test]
    fn test_body_into_record() {
        let body = RecordBody {
            question: "Q".to_string(),
            answer: "A".to_string(),
        };
        assert_eq!(body.into_record("x"), Record::new("x", "Q", "A"));
    }

    #[test]
    fn test_record_serialization_shape() {
        let json = serde_json::to_value(Record::new("id1", "Q", "A")).unwrap();
        assert_eq!(json["id"], "id1");
        assert_eq!(json["question"], "Q");
        assert_eq!(json["answer"], "A");
    }
}
