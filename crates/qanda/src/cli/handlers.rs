//! Handlers for the one-shot commands.
//!
//! Each command loads the current collection through a subscription, drives
//! the same views as the interactive page, runs at most one request and prints
//! the resulting notifications.

use std::io::Write;

use tracing::debug;

use super::{AddCommand, ConfigCommand, DeleteCommand, EditCommand, ListCommand};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::shell::render;
use crate::store::{Change, StoreClient};
use crate::view::{App, Request, Status};

/// Print the records, optionally filtered by question prefix.
///
/// # Errors
///
/// Returns an error if the store cannot be read or output fails.
pub async fn list<W: Write>(store: &dyn StoreClient, cmd: &ListCommand, out: &mut W) -> Result<()> {
    let mut app = load(store).await?;
    if let Some(prefix) = &cmd.search {
        app.list_mut().set_filter(prefix.as_str());
    }
    let rows = app.rows();

    if cmd.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
    } else if app.records().is_none() {
        writeln!(out, "No data")?;
    } else {
        write!(out, "{}", render::table(&rows))?;
    }
    Ok(())
}

/// Create a record through the entry form.
///
/// # Errors
///
/// Returns an error if the question is refused or the store fails.
pub async fn add<W: Write>(store: &dyn StoreClient, cmd: &AddCommand, out: &mut W) -> Result<()> {
    let mut app = load(store).await?;
    app.entry_mut().set_question(cmd.question.as_str());
    app.entry_mut().set_answer(cmd.answer.as_str());

    let request = app.submit_entry();
    perform(store, &mut app, request, out).await
}

/// Replace a record through the edit dialog.
///
/// # Errors
///
/// Returns an error if the id is unknown, a field is empty, or the store
/// fails.
pub async fn edit<W: Write>(store: &dyn StoreClient, cmd: &EditCommand, out: &mut W) -> Result<()> {
    let mut app = load(store).await?;
    app.open_edit(&cmd.id)?;
    app.list_mut().set_draft_question(cmd.question.as_str())?;
    app.list_mut().set_draft_answer(cmd.answer.as_str())?;

    let request = app.save_edit();
    perform(store, &mut app, request, out).await
}

/// Delete a record through the delete dialog.
///
/// Without `--yes` only describes what would be deleted.
///
/// # Errors
///
/// Returns an error if the id is unknown or the store fails.
pub async fn delete<W: Write>(
    store: &dyn StoreClient,
    cmd: &DeleteCommand,
    out: &mut W,
) -> Result<()> {
    let mut app = load(store).await?;
    app.open_delete(&cmd.id)?;

    if !cmd.yes {
        if let Some(record) = app.records().and_then(|set| set.get(&cmd.id)) {
            writeln!(out, "This will delete: {}", record.question)?;
        }
        writeln!(out, "Use --yes to confirm.")?;
        return Ok(());
    }

    let request = app.confirm_delete();
    perform(store, &mut app, request, out).await
}

/// Show or check the configuration.
///
/// # Errors
///
/// Returns an error if output fails or, for `validate`, the file is invalid.
pub fn config<W: Write>(config: &Config, cmd: ConfigCommand, out: &mut W) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&config.redacted())?)?;
            } else {
                writeln!(out, "Current Configuration")?;
                writeln!(out, "=====================")?;
                writeln!(out)?;
                writeln!(out, "[Store]")?;
                writeln!(out, "  Backend:            {}", config.store.backend)?;
                writeln!(out)?;
                writeln!(out, "[SQLite]")?;
                writeln!(
                    out,
                    "  Database path:      {}",
                    config.database_path().display()
                )?;
                writeln!(out, "  Poll interval (ms): {}", config.sqlite.poll_interval_ms)?;
                writeln!(out)?;
                writeln!(out, "[Firebase]")?;
                writeln!(out, "  Database URL:       {}", config.firebase.database_url)?;
                writeln!(out, "  Collection:         /{}", config.firebase.collection)?;
                writeln!(
                    out,
                    "  Auth token:         {}",
                    if config.firebase.auth_token.is_some() {
                        "set"
                    } else {
                        "not set"
                    }
                )?;
                writeln!(
                    out,
                    "  Reconnect (ms):     {}",
                    config.firebase.reconnect_delay_ms
                )?;
            }
        }
        ConfigCommand::Path => {
            writeln!(out, "{}", Config::default_config_path().display())?;
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            writeln!(out, "Validating configuration: {}", path.display())?;
            Config::load_from(Some(path))?.validate()?;
            writeln!(out, "Configuration is valid.")?;
        }
    }
    Ok(())
}

/// Subscribe and wait for the first snapshot.
async fn load(store: &dyn StoreClient) -> Result<App> {
    let mut subscription = store.subscribe().await?;
    let mut app = App::new();

    match subscription.next().await {
        Some(change @ Change::Snapshot(_)) => app.apply_change(change),
        Some(Change::Interrupted { reason }) => return Err(Error::transport(reason)),
        None => return Err(Error::transport("subscription closed before any data")),
    }
    debug!(
        count = app.records().map_or(0, |set| set.len()),
        "Loaded records"
    );
    Ok(app)
}

/// Run the request, if the view produced one, and report the outcome.
async fn perform<W: Write>(
    store: &dyn StoreClient,
    app: &mut App,
    request: Option<Request>,
    out: &mut W,
) -> Result<()> {
    if let Some(request) = request {
        let completion = request.execute(store).await;
        app.complete(completion);
    }

    let notes = app.take_notifications();
    write!(out, "{}", render::notifications(&notes))?;
    match notes.into_iter().find(|n| n.status == Status::Error) {
        Some(failure) => Err(Error::Rejected {
            title: failure.title,
            description: failure.description,
        }),
        None => Ok(()),
    }
}
