//! User-facing notifications.

use serde::Serialize;

use crate::error::Error;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// An operation completed.
    Success,
    /// An operation was rejected or failed.
    Error,
    /// Something changed that the user did not ask for.
    Info,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A short toast shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Severity.
    pub status: Status,
    /// One-line headline.
    pub title: String,
    /// Longer explanation.
    pub description: String,
}

impl Notification {
    fn new(status: Status, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            description: description.into(),
        }
    }

    /// A new record was created.
    #[must_use]
    pub fn added() -> Self {
        Self::new(
            Status::Success,
            "Question added.",
            "Your question has been added.",
        )
    }

    /// A record was replaced.
    #[must_use]
    pub fn updated() -> Self {
        Self::new(
            Status::Success,
            "Question updated.",
            "Your question has been updated.",
        )
    }

    /// A record was removed.
    #[must_use]
    pub fn deleted() -> Self {
        Self::new(
            Status::Success,
            "Question deleted.",
            "Your question has been deleted.",
        )
    }

    /// A create was refused because the question text is taken.
    #[must_use]
    pub fn duplicate() -> Self {
        Self::new(
            Status::Error,
            "Question already exists.",
            "Please enter a new question.",
        )
    }

    /// The record behind an open dialog was deleted elsewhere.
    #[must_use]
    pub fn vanished() -> Self {
        Self::new(
            Status::Info,
            "Question no longer exists.",
            "It was removed by someone else.",
        )
    }

    /// A submission or store call failed.
    #[must_use]
    pub fn failed(title: &str, error: &Error) -> Self {
        Self::new(Status::Error, title, error.to_string())
    }

    /// The live connection dropped.
    #[must_use]
    pub fn disconnected(reason: &str) -> Self {
        Self::new(Status::Error, "Connection lost.", reason)
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} {}", self.status, self.title, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_messages() {
        assert_eq!(Notification::added().title, "Question added.");
        assert_eq!(
            Notification::updated().description,
            "Your question has been updated."
        );
        assert_eq!(Notification::deleted().status, Status::Success);
    }

    #[test]
    fn test_duplicate_is_an_error() {
        let note = Notification::duplicate();
        assert_eq!(note.status, Status::Error);
        assert_eq!(note.title, "Question already exists.");
        assert_eq!(note.description, "Please enter a new question.");
    }

    #[test]
    fn test_failed_carries_error_text() {
        let note = Notification::failed("Could not save.", &Error::transport("offline"));
        assert_eq!(note.status, Status::Error);
        assert!(note.description.contains("offline"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Notification::deleted().to_string(),
            "[success] Question deleted. Your question has been deleted."
        );
    }
}
