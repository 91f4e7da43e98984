//! `qanda` - A live question/answer list over a realtime store
//!
//! This library provides the record model, the store clients that keep every
//! client's view of the collection in sync, and the headless views and shell
//! that drive create, edit, delete and search on top of them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod shell;
pub mod store;
pub mod view;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{Record, RecordSet};
pub use store::{open_store, Change, StoreClient, Subscription};
pub use view::{App, Notification};
