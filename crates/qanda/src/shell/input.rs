//! Parsing of shell command lines.

use thiserror::Error;

/// How a command refers to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// 1-based row in the filtered table.
    Row(usize),
    /// Record id.
    Id(String),
}

/// One command typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set the entry form's question.
    Question(String),
    /// Set the entry form's answer.
    Answer(String),
    /// Save the open edit dialog, or submit the entry form when none is open.
    Save,
    /// Set the table filter; empty shows every record.
    Search(String),
    /// Open the edit dialog.
    Edit(Target),
    /// Set the edit dialog's question draft.
    DraftQuestion(String),
    /// Set the edit dialog's answer draft.
    DraftAnswer(String),
    /// Open the delete dialog.
    Delete(Target),
    /// Confirm the delete dialog.
    Confirm,
    /// Close the open dialog.
    Close,
    /// Show the command list.
    Help,
    /// Leave the shell.
    Quit,
}

/// A line that could not be understood.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// The first word is not a command.
    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    /// The command needs an argument.
    #[error("'{0}' needs {1}")]
    MissingArgument(&'static str, &'static str),
}

/// Help text listing every command.
pub const HELP: &str = "\
Commands:
  question <text>        set the new question
  answer <text>          set the new answer
  save                   add the new question, or save the edit dialog
  search [text]          filter rows by question prefix
  edit <row|id>          open the edit dialog
  draft-question <text>  change the question being edited
  draft-answer <text>    change the answer being edited
  delete <row|id>        open the delete dialog
  confirm                confirm the delete
  close                  close the open dialog
  help                   show this list
  quit                   leave";

/// Parse one line. Blank lines yield `Ok(None)`.
///
/// Text arguments are taken verbatim after the first space following the
/// command word, so inner and trailing spaces are kept.
///
/// # Errors
///
/// Returns an error for an unknown command or a missing argument.
pub fn parse(line: &str) -> Result<Option<Command>, InputError> {
    let line = line.trim_start().trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let command = match word {
        "question" | "q" => Command::Question(rest.to_string()),
        "answer" | "a" => Command::Answer(rest.to_string()),
        "save" => Command::Save,
        "search" | "/" => Command::Search(rest.to_string()),
        "edit" | "e" => Command::Edit(target(rest, "edit")?),
        "draft-question" | "dq" => Command::DraftQuestion(rest.to_string()),
        "draft-answer" | "da" => Command::DraftAnswer(rest.to_string()),
        "delete" | "d" => Command::Delete(target(rest, "delete")?),
        "confirm" => Command::Confirm,
        "close" | "cancel" => Command::Close,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn target(arg: &str, command: &'static str) -> Result<Target, InputError> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(InputError::MissingArgument(command, "a row number or id"));
    }
    Ok(match arg.parse::<usize>() {
        Ok(row) if row > 0 => Target::Row(row),
        _ => Target::Id(arg.to_string()),
    })
}
