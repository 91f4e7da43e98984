//! Headless views over the record collection.
//!
//! Views are synchronous state machines. Their handlers never call the store
//! themselves: a submit produces a [`Request`], the caller runs it against a
//! [`StoreClient`] and hands the resulting [`Completion`] back. Each request
//! carries a ticket so a completion that arrives after its dialog was closed
//! or replaced can be recognised and its feedback dropped.
//!
//! The resulting records are never applied locally. They show up through the
//! subscription like everyone else's changes.

mod app;
mod entry;
mod list;
mod notify;

pub use app::App;
pub use entry::EntryView;
pub use list::{DeleteDialog, Dialog, EditDialog, ListView};
pub use notify::{Notification, Status};

use tracing::debug;

use crate::error::Result;
use crate::store::StoreClient;

/// The flow that issued a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The entry form's submit.
    Entry,
    /// The edit dialog's save.
    Edit,
    /// The delete dialog's confirm.
    Delete,
}

/// A store call to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Create (`id == None`) or fully replace a record.
    Write {
        /// Target id, or `None` for a store-assigned one.
        id: Option<String>,
        /// Question text.
        question: String,
        /// Answer text.
        answer: String,
    },
    /// Delete a record.
    Remove {
        /// Target id.
        id: String,
    },
}

/// A store call issued by a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Which flow issued it.
    pub origin: Origin,
    /// Identifies this request within its flow.
    pub ticket: u64,
    /// What to do.
    pub op: StoreOp,
}

/// The store's answer to a [`Request`].
#[derive(Debug)]
pub struct Completion {
    /// Copied from the request.
    pub origin: Origin,
    /// Copied from the request.
    pub ticket: u64,
    /// Acknowledgement or failure.
    pub result: Result<()>,
}

impl Request {
    /// Run the request and wrap the outcome for the issuing view.
    pub async fn execute(self, store: &dyn StoreClient) -> Completion {
        debug!(origin = ?self.origin, ticket = self.ticket, op = ?self.op, "Executing request");
        let result = match &self.op {
            StoreOp::Write {
                id,
                question,
                answer,
            } => store
                .write(id.as_deref(), question, answer)
                .await
                .map(|_| ()),
            StoreOp::Remove { id } => store.remove(id).await,
        };
        Completion {
            origin: self.origin,
            ticket: self.ticket,
            result,
        }
    }
}

/// Monotonic ticket source, one per view.
#[derive(Debug, Default)]
struct Tickets {
    last: u64,
}

impl Tickets {
    fn issue(&mut self) -> u64 {
        self.last += 1;
        self.last
    }
}
