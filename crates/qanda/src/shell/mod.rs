//! The interactive page.
//!
//! One event loop multiplexes three sources: the store subscription, the
//! answers to requests issued by the views, and command lines from the user.
//! Every event redraws the page on the output; diagnostics go to the log.

pub mod input;
pub mod render;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use self::input::{Command, Target, HELP};
use crate::error::{Error, Result};
use crate::store::{Change, StoreClient, Subscription};
use crate::view::{App, Completion, Dialog, Request};

/// Wait between attempts to open the store's feed.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(2);

/// What the loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    /// Redraw the page.
    Redraw,
    /// Run a request, then redraw.
    Send(Request),
    /// Print a message, then redraw.
    Say(String),
    /// Leave.
    Quit,
}

/// Run the page on standard input and output until the user quits.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read or written.
pub async fn run(store: Arc<dyn StoreClient>) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_session(store, stdin, &mut stdout).await
}

/// Run the page on the given input and output.
///
/// When the input ends, requests already issued are allowed to finish so
/// their outcome is shown before returning. A store that cannot be reached
/// is reported on the page and asked again until it answers.
///
/// # Errors
///
/// Returns an error if the input or output fails.
pub async fn run_session<R, W>(store: Arc<dyn StoreClient>, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
    let mut lines = input.lines();
    let mut app = App::new();
    let mut reading = true;
    let mut pending = 0usize;

    let mut retry = retry_timer();
    let mut subscription = subscribe(store.as_ref(), &mut app, false).await;

    writeln!(out, "{HELP}\n")?;
    if subscription.is_none() {
        draw(out, &mut app, None)?;
    }
    loop {
        let mut message = None;

        tokio::select! {
            biased;

            change = next_change(&mut subscription), if subscription.is_some() => match change {
                Some(change) => app.apply_change(change),
                None => {
                    warn!("Subscription closed by the store");
                    app.apply_change(Change::Interrupted {
                        reason: "subscription closed by the store".to_string(),
                    });
                    subscription = None;
                    retry.reset();
                }
            },

            _ = retry.tick(), if subscription.is_none() => {
                subscription = subscribe(store.as_ref(), &mut app, true).await;
                if subscription.is_none() {
                    continue;
                }
            }

            Some(done) = done_rx.recv() => {
                pending = pending.saturating_sub(1);
                app.complete(done);
            }

            line = lines.next_line(), if reading => match line? {
                None => {
                    debug!(pending, "Input closed");
                    reading = false;
                }
                Some(line) => match input::parse(&line) {
                    Ok(None) => continue,
                    Ok(Some(command)) => match dispatch(&mut app, command) {
                        Step::Redraw => {}
                        Step::Say(text) => message = Some(text),
                        Step::Send(request) => {
                            pending += 1;
                            spawn_request(&store, request, done_tx.clone());
                        }
                        Step::Quit => break,
                    },
                    Err(e) => message = Some(e.to_string()),
                },
            },
        }

        draw(out, &mut app, message.as_deref())?;
        if !reading && pending == 0 {
            break;
        }
    }

    info!("Session ended");
    Ok(())
}

/// Open the store's feed.
///
/// A failure is shown as an interruption unless one is already on screen.
async fn subscribe(
    store: &dyn StoreClient,
    app: &mut App,
    retrying: bool,
) -> Option<Subscription> {
    match store.subscribe().await {
        Ok(subscription) => {
            info!(backend = store.name(), "Subscribed");
            Some(subscription)
        }
        Err(e) if retrying => {
            debug!(error = %e, "Store still unreachable");
            None
        }
        Err(e) => {
            app.apply_change(Change::Interrupted {
                reason: e.to_string(),
            });
            None
        }
    }
}

async fn next_change(subscription: &mut Option<Subscription>) -> Option<Change> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

fn retry_timer() -> Interval {
    let start = Instant::now() + RESUBSCRIBE_DELAY;
    let mut timer = tokio::time::interval_at(start, RESUBSCRIBE_DELAY);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

fn spawn_request(
    store: &Arc<dyn StoreClient>,
    request: Request,
    done: mpsc::UnboundedSender<Completion>,
) {
    let store = Arc::clone(store);
    tokio::spawn(async move {
        let completion = request.execute(store.as_ref()).await;
        // The loop may already be gone; the store has still applied the change
        let _ = done.send(completion);
    });
}

fn draw<W: Write>(out: &mut W, app: &mut App, message: Option<&str>) -> Result<()> {
    if let Some(message) = message {
        writeln!(out, "! {message}")?;
    }
    let notes = app.take_notifications();
    write!(out, "{}", render::notifications(&notes))?;
    write!(out, "{}\n> ", render::page(app))?;
    out.flush().map_err(Error::from)
}

/// Apply one command to the page.
fn dispatch(app: &mut App, command: Command) -> Step {
    match command {
        Command::Question(text) => app.entry_mut().set_question(text),
        Command::Answer(text) => app.entry_mut().set_answer(text),
        Command::Save => {
            let request = if matches!(app.list().dialog(), Dialog::Editing(_)) {
                app.save_edit()
            } else {
                app.submit_entry()
            };
            if let Some(request) = request {
                return Step::Send(request);
            }
        }
        Command::Search(text) => app.list_mut().set_filter(text),
        Command::Edit(target) => match resolve(app, &target) {
            Ok(id) => {
                if let Err(e) = app.open_edit(&id) {
                    return Step::Say(e.to_string());
                }
            }
            Err(text) => return Step::Say(text),
        },
        Command::Delete(target) => match resolve(app, &target) {
            Ok(id) => {
                if let Err(e) = app.open_delete(&id) {
                    return Step::Say(e.to_string());
                }
            }
            Err(text) => return Step::Say(text),
        },
        Command::DraftQuestion(text) => {
            if let Err(e) = app.list_mut().set_draft_question(text) {
                return Step::Say(e.to_string());
            }
        }
        Command::DraftAnswer(text) => {
            if let Err(e) = app.list_mut().set_draft_answer(text) {
                return Step::Say(e.to_string());
            }
        }
        Command::Confirm => {
            if let Some(request) = app.confirm_delete() {
                return Step::Send(request);
            }
        }
        Command::Close => app.list_mut().close(),
        Command::Help => return Step::Say(HELP.to_string()),
        Command::Quit => return Step::Quit,
    }
    Step::Redraw
}

/// Turn a row number or id into a record id.
fn resolve(app: &App, target: &Target) -> std::result::Result<String, String> {
    match target {
        Target::Id(id) => Ok(id.clone()),
        Target::Row(row) => row
            .checked_sub(1)
            .and_then(|index| app.rows().get(index).map(|r| r.id.clone()))
            .ok_or_else(|| format!("no row {row} in the table")),
    }
}
