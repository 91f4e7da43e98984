//! `SQLite` schema definitions for qanda.
//!
//! This module contains the SQL statements for creating and querying the
//! record table.

/// SQL statement to create the records table.
///
/// Ids are ULIDs, so ordering by id is ordering by insertion.
pub const CREATE_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY NOT NULL,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_RECORDS_TABLE, CREATE_METADATA_TABLE];

/// Full-value replace at an id, creating the row if needed.
///
/// `created_at` is kept from the first write.
pub const UPSERT_RECORD: &str = r"
INSERT INTO records (id, question, answer, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?4)
ON CONFLICT(id) DO UPDATE SET
    question = excluded.question,
    answer = excluded.answer,
    updated_at = excluded.updated_at
";

/// Delete the row at an id.
pub const DELETE_RECORD: &str = "DELETE FROM records WHERE id = ?1";

/// Select the whole collection in insertion order.
pub const SELECT_ALL_RECORDS: &str = "SELECT id, question, answer FROM records ORDER BY id ASC";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_create_records_table_contains_required_columns() {
        assert!(CREATE_RECORDS_TABLE.contains("id TEXT PRIMARY KEY"));
        assert!(CREATE_RECORDS_TABLE.contains("question TEXT NOT NULL"));
        assert!(CREATE_RECORDS_TABLE.contains("answer TEXT NOT NULL"));
    }

    #[test]
    fn test_select_orders_by_id() {
        assert!(SELECT_ALL_RECORDS.contains("ORDER BY id"));
    }
}
