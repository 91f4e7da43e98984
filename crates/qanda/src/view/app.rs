//! The page controller: one cached collection, both views, and the
//! notification outbox.

use tracing::{debug, info, warn};

use super::{Completion, EntryView, ListView, Notification, Origin, Request};
use crate::error::{Error, ValidationError};
use crate::record::{Record, RecordSet};
use crate::store::Change;

/// Routes snapshots to the views and completions to whichever view issued
/// them.
#[derive(Debug, Default)]
pub struct App {
    records: Option<RecordSet>,
    loaded: bool,
    entry: EntryView,
    list: ListView,
    outbox: Vec<Notification>,
}

impl App {
    /// Create a page that has not received a snapshot yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached collection; `None` when the store holds no records.
    #[must_use]
    pub fn records(&self) -> Option<&RecordSet> {
        self.records.as_ref()
    }

    /// Whether at least one snapshot has arrived.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The entry form.
    #[must_use]
    pub fn entry(&self) -> &EntryView {
        &self.entry
    }

    /// The entry form, for input.
    pub fn entry_mut(&mut self) -> &mut EntryView {
        &mut self.entry
    }

    /// The table.
    #[must_use]
    pub fn list(&self) -> &ListView {
        &self.list
    }

    /// The table, for input.
    pub fn list_mut(&mut self) -> &mut ListView {
        &mut self.list
    }

    /// The table rows under the current filter.
    #[must_use]
    pub fn rows(&self) -> Vec<&Record> {
        self.list.rows(self.records.as_ref())
    }

    /// Apply one item from the subscription.
    pub fn apply_change(&mut self, change: Change) {
        match change {
            Change::Snapshot(records) => {
                debug!(count = records.len(), "Snapshot received");
                self.records = RecordSet::from_records(records);
                self.loaded = true;
                if let Some(note) = self.list.reconcile(self.records.as_ref()) {
                    self.outbox.push(note);
                }
            }
            Change::Interrupted { reason } => {
                warn!(%reason, "Live updates interrupted");
                self.outbox.push(Notification::disconnected(&reason));
            }
        }
    }

    /// Submit the entry form.
    ///
    /// Returns the request to run, or `None` after queueing a notification
    /// explaining why nothing was sent.
    pub fn submit_entry(&mut self) -> Option<Request> {
        let result = self.entry.submit(self.records.as_ref());
        self.accept(result, "Question not added.")
    }

    /// Save the open edit dialog.
    pub fn save_edit(&mut self) -> Option<Request> {
        let result = self.list.save();
        self.accept(result, "Question not updated.")
    }

    /// Confirm the open delete dialog.
    pub fn confirm_delete(&mut self) -> Option<Request> {
        let result = self.list.confirm();
        self.accept(result, "Question not deleted.")
    }

    fn accept(
        &mut self,
        result: Result<Request, ValidationError>,
        title: &str,
    ) -> Option<Request> {
        match result {
            Ok(request) => Some(request),
            Err(ValidationError::DuplicateQuestion) => {
                self.outbox.push(Notification::duplicate());
                None
            }
            Err(e) => {
                self.outbox.push(Notification::failed(title, &Error::from(e)));
                None
            }
        }
    }

    /// Open the edit dialog for the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if no such record is known.
    pub fn open_edit(&mut self, id: &str) -> Result<(), Error> {
        let record = self.find(id)?.clone();
        self.list.open_edit(&record);
        Ok(())
    }

    /// Open the delete dialog for the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if no such record is known.
    pub fn open_delete(&mut self, id: &str) -> Result<(), Error> {
        let record = self.find(id)?.clone();
        self.list.open_delete(&record);
        Ok(())
    }

    fn find(&self, id: &str) -> Result<&Record, Error> {
        self.records
            .as_ref()
            .and_then(|set| set.get(id))
            .ok_or_else(|| Error::not_found(id))
    }

    /// Hand a store answer to the view that asked.
    pub fn complete(&mut self, completion: Completion) {
        info!(
            origin = ?completion.origin,
            ticket = completion.ticket,
            ok = completion.result.is_ok(),
            "Request completed"
        );
        let note = match completion.origin {
            Origin::Entry => self.entry.complete(completion),
            Origin::Edit | Origin::Delete => self.list.complete(completion),
        };
        if let Some(note) = note {
            self.outbox.push(note);
        }
    }

    /// Drain queued notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }
}
