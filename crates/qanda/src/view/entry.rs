//! The entry form: two inputs and a submit that creates a record.

use tracing::{debug, warn};

use super::{Completion, Notification, Origin, Request, StoreOp, Tickets};
use crate::error::{Field, ValidationError};
use crate::record::RecordSet;

/// State of the entry form.
#[derive(Debug, Default)]
pub struct EntryView {
    pending_question: String,
    pending_answer: String,
    in_flight: Option<u64>,
    tickets: Tickets,
}

impl EntryView {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current question input.
    #[must_use]
    pub fn question(&self) -> &str {
        &self.pending_question
    }

    /// Current answer input.
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.pending_answer
    }

    /// Replace the question input.
    pub fn set_question(&mut self, text: impl Into<String>) {
        self.pending_question = text.into();
    }

    /// Replace the answer input.
    pub fn set_answer(&mut self, text: impl Into<String>) {
        self.pending_answer = text.into();
    }

    /// Whether a create is waiting for the store.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether submit is enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.check_ready().is_ok()
    }

    fn check_ready(&self) -> Result<(), ValidationError> {
        if self.in_flight.is_some() {
            return Err(ValidationError::Busy);
        }
        if self.pending_question.is_empty() {
            return Err(ValidationError::EmptyField(Field::Question));
        }
        if self.pending_answer.is_empty() {
            return Err(ValidationError::EmptyField(Field::Answer));
        }
        Ok(())
    }

    /// Validate the form and produce the create request.
    ///
    /// The duplicate check compares the question text exactly against the
    /// last known collection.
    ///
    /// # Errors
    ///
    /// Returns the reason the submit was refused; no request is produced.
    pub fn submit(&mut self, records: Option<&RecordSet>) -> Result<Request, ValidationError> {
        self.check_ready()?;

        if records.is_some_and(|set| set.has_question(&self.pending_question)) {
            debug!(question = %self.pending_question, "Refusing duplicate question");
            return Err(ValidationError::DuplicateQuestion);
        }

        let ticket = self.tickets.issue();
        self.in_flight = Some(ticket);
        Ok(Request {
            origin: Origin::Entry,
            ticket,
            op: StoreOp::Write {
                id: None,
                question: self.pending_question.clone(),
                answer: self.pending_answer.clone(),
            },
        })
    }

    /// Apply the store's answer to a create.
    ///
    /// On success the inputs are cleared; on failure they are kept so the
    /// user can retry.
    pub fn complete(&mut self, completion: Completion) -> Option<Notification> {
        if completion.origin != Origin::Entry || self.in_flight != Some(completion.ticket) {
            warn!(ticket = completion.ticket, "Dropping stale entry completion");
            return None;
        }
        self.in_flight = None;

        match completion.result {
            Ok(()) => {
                self.pending_question.clear();
                self.pending_answer.clear();
                Some(Notification::added())
            }
            Err(e) => {
                warn!(error = %e, "Create failed");
                Some(Notification::failed("Question not added.", &e))
            }
        }
    }
}
