//! The searchable table with its edit and delete dialogs.

use tracing::{debug, info, warn};

use super::{Completion, Notification, Origin, Request, StoreOp, Tickets};
use crate::error::{Field, ValidationError};
use crate::record::{Record, RecordSet};

/// The edit dialog for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDialog {
    /// The record as it was when the dialog opened.
    pub target: Record,
    /// Edited question text.
    pub draft_question: String,
    /// Edited answer text.
    pub draft_answer: String,
    in_flight: Option<u64>,
}

impl EditDialog {
    /// Whether a save is waiting for the store.
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }
}

/// The delete confirmation for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDialog {
    /// The record to delete.
    pub target: Record,
    in_flight: Option<u64>,
}

impl DeleteDialog {
    /// Whether the delete is waiting for the store.
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.in_flight.is_some()
    }
}

/// The single dialog slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Dialog {
    /// No dialog.
    #[default]
    Idle,
    /// Editing a record.
    Editing(EditDialog),
    /// Asking to confirm a delete.
    ConfirmingDelete(DeleteDialog),
}

impl Dialog {
    fn target_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Editing(edit) => Some(&edit.target.id),
            Self::ConfirmingDelete(delete) => Some(&delete.target.id),
        }
    }

    fn in_flight(&self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::Editing(edit) => edit.in_flight,
            Self::ConfirmingDelete(delete) => delete.in_flight,
        }
    }
}

/// State of the table.
#[derive(Debug, Default)]
pub struct ListView {
    filter_text: String,
    dialog: Dialog,
    tickets: Tickets,
}

impl ListView {
    /// Create a view with an empty filter and no dialog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The search box contents.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter_text
    }

    /// Replace the search box contents.
    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.filter_text = text.into();
    }

    /// Rows to display: records whose question starts with the filter,
    /// ignoring case, in store order.
    #[must_use]
    pub fn rows<'a>(&self, records: Option<&'a RecordSet>) -> Vec<&'a Record> {
        records.map_or_else(Vec::new, |set| set.filtered(&self.filter_text))
    }

    /// The open dialog, if any.
    #[must_use]
    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    /// Open the edit dialog for `record`, replacing any open dialog.
    pub fn open_edit(&mut self, record: &Record) {
        self.replace_dialog(Dialog::Editing(EditDialog {
            target: record.clone(),
            draft_question: record.question.clone(),
            draft_answer: record.answer.clone(),
            in_flight: None,
        }));
    }

    /// Open the delete confirmation for `record`, replacing any open dialog.
    pub fn open_delete(&mut self, record: &Record) {
        self.replace_dialog(Dialog::ConfirmingDelete(DeleteDialog {
            target: record.clone(),
            in_flight: None,
        }));
    }

    /// Close whatever dialog is open without writing anything.
    pub fn close(&mut self) {
        self.replace_dialog(Dialog::Idle);
    }

    fn replace_dialog(&mut self, next: Dialog) {
        if let Some(ticket) = self.dialog.in_flight() {
            debug!(ticket, "Dialog replaced while its request is pending");
        }
        self.dialog = next;
    }

    /// Replace the edit dialog's question draft.
    ///
    /// # Errors
    ///
    /// Returns an error if no edit dialog is open.
    pub fn set_draft_question(&mut self, text: impl Into<String>) -> Result<(), ValidationError> {
        self.editing_mut()?.draft_question = text.into();
        Ok(())
    }

    /// Replace the edit dialog's answer draft.
    ///
    /// # Errors
    ///
    /// Returns an error if no edit dialog is open.
    pub fn set_draft_answer(&mut self, text: impl Into<String>) -> Result<(), ValidationError> {
        self.editing_mut()?.draft_answer = text.into();
        Ok(())
    }

    fn editing_mut(&mut self) -> Result<&mut EditDialog, ValidationError> {
        match &mut self.dialog {
            Dialog::Editing(edit) => Ok(edit),
            _ => Err(ValidationError::NoDialog("edit")),
        }
    }

    /// Whether save is enabled in the edit dialog.
    #[must_use]
    pub fn can_save(&self) -> bool {
        match &self.dialog {
            Dialog::Editing(edit) => check_drafts(edit).is_ok(),
            _ => false,
        }
    }

    /// Produce the replace request for the edit dialog.
    ///
    /// # Errors
    ///
    /// Returns an error if no edit dialog is open, a save is pending, or a
    /// draft is empty.
    pub fn save(&mut self) -> Result<Request, ValidationError> {
        let ticket = self.tickets.issue();
        let edit = self.editing_mut()?;
        check_drafts(edit)?;

        edit.in_flight = Some(ticket);
        Ok(Request {
            origin: Origin::Edit,
            ticket,
            op: StoreOp::Write {
                id: Some(edit.target.id.clone()),
                question: edit.draft_question.clone(),
                answer: edit.draft_answer.clone(),
            },
        })
    }

    /// Produce the remove request for the delete dialog.
    ///
    /// # Errors
    ///
    /// Returns an error if no delete dialog is open or the delete is pending.
    pub fn confirm(&mut self) -> Result<Request, ValidationError> {
        let ticket = self.tickets.issue();
        let Dialog::ConfirmingDelete(delete) = &mut self.dialog else {
            return Err(ValidationError::NoDialog("delete"));
        };
        if delete.in_flight.is_some() {
            return Err(ValidationError::Busy);
        }

        delete.in_flight = Some(ticket);
        Ok(Request {
            origin: Origin::Delete,
            ticket,
            op: StoreOp::Remove {
                id: delete.target.id.clone(),
            },
        })
    }

    /// Apply the store's answer to a save or delete.
    ///
    /// Feedback is only given if the dialog that issued the request is still
    /// open and waiting for it.
    pub fn complete(&mut self, completion: Completion) -> Option<Notification> {
        if self.dialog.in_flight() != Some(completion.ticket) {
            warn!(
                origin = ?completion.origin,
                ticket = completion.ticket,
                "Dropping completion for a closed dialog"
            );
            return None;
        }

        let Completion { origin, result, .. } = completion;
        let (note, finished) = match (&mut self.dialog, origin) {
            (Dialog::Editing(edit), Origin::Edit) => match result {
                Ok(()) => (Notification::updated(), true),
                Err(e) => {
                    edit.in_flight = None;
                    warn!(id = %edit.target.id, error = %e, "Update failed");
                    (Notification::failed("Question not updated.", &e), false)
                }
            },
            (Dialog::ConfirmingDelete(delete), Origin::Delete) => match result {
                Ok(()) => (Notification::deleted(), true),
                Err(e) => {
                    delete.in_flight = None;
                    warn!(id = %delete.target.id, error = %e, "Delete failed");
                    (Notification::failed("Question not deleted.", &e), false)
                }
            },
            _ => {
                warn!(?origin, "Completion does not match the open dialog");
                return None;
            }
        };

        if finished {
            self.dialog = Dialog::Idle;
        }
        Some(note)
    }

    /// Check the open dialog against a fresh collection.
    ///
    /// A dialog whose record is gone is closed, unless it is waiting on its own
    /// request. Drafts are never touched.
    pub fn reconcile(&mut self, records: Option<&RecordSet>) -> Option<Notification> {
        let id = self.dialog.target_id()?;
        if records.is_some_and(|set| set.contains(id)) || self.dialog.in_flight().is_some() {
            return None;
        }

        info!(%id, "Closing dialog for a record removed elsewhere");
        self.dialog = Dialog::Idle;
        Some(Notification::vanished())
    }
}

fn check_drafts(edit: &EditDialog) -> Result<(), ValidationError> {
    if edit.in_flight.is_some() {
        return Err(ValidationError::Busy);
    }
    if edit.draft_question.is_empty() {
        return Err(ValidationError::EmptyField(Field::Question));
    }
    if edit.draft_answer.is_empty() {
        return Err(ValidationError::EmptyField(Field::Answer));
    }
    Ok(())
}
