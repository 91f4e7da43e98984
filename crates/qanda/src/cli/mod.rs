//! Command-line interface for qanda.
//!
//! This module provides the CLI structure and command handlers for the
//! `qanda` binary.

mod commands;
pub mod handlers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::logging::Verbosity;

pub use commands::{
    AddCommand, BackendArg, ConfigCommand, DeleteCommand, EditCommand, ListCommand,
};

/// qanda - Keep a shared list of questions and answers
///
/// Add, search, edit and delete question/answer pairs held in a realtime
/// store. Every change made by any client shows up live.
#[derive(Debug, Parser)]
#[command(name = "qanda")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Store to use, overriding the configuration
    #[arg(long, global = true, value_enum, value_name = "BACKEND")]
    pub store: Option<BackendArg>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the interactive page
    Run,

    /// Print the questions
    List(ListCommand),

    /// Add a question
    Add(AddCommand),

    /// Replace a question and its answer
    Edit(EditCommand),

    /// Delete a question
    Delete(DeleteCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }

    /// Apply command-line overrides to a loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(store) = self.store {
            config.store.backend = store.into();
        }
    }
}
