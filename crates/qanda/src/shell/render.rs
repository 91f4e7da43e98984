//! Text rendering of the page.

use std::fmt::Write;

use crate::record::Record;
use crate::view::{App, Dialog, Notification};

/// Widest a table cell may get before it is cut.
const MAX_CELL_WIDTH: usize = 40;

/// Render the whole page: entry form, search box, table and open dialog.
#[must_use]
pub fn page(app: &App) -> String {
    let mut out = String::new();
    let entry = app.entry();

    // Writing into a String cannot fail
    let _ = writeln!(out, "== Add a question ==");
    let _ = writeln!(out, "  Question: {}", entry.question());
    let _ = writeln!(out, "  Answer:   {}", entry.answer());
    let _ = writeln!(
        out,
        "  [save] {}",
        if entry.is_submitting() {
            "saving..."
        } else if entry.can_submit() {
            "ready"
        } else {
            "disabled"
        }
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "== Questions ==");
    let _ = writeln!(out, "  Search: {}", app.list().filter());
    if !app.is_loaded() {
        let _ = writeln!(out, "  Loading...");
    } else if app.records().is_none() {
        let _ = writeln!(out, "  No data");
    } else {
        out.push_str(&table(&app.rows()));
    }

    match app.list().dialog() {
        Dialog::Idle => {}
        Dialog::Editing(edit) => {
            let _ = writeln!(out);
            let _ = writeln!(out, "== Edit question {} ==", edit.target.id);
            let _ = writeln!(out, "  Question: {}", edit.draft_question);
            let _ = writeln!(out, "  Answer:   {}", edit.draft_answer);
            let _ = writeln!(
                out,
                "  [save] {}  [close]",
                if edit.is_saving() {
                    "saving..."
                } else if app.list().can_save() {
                    "ready"
                } else {
                    "disabled"
                }
            );
        }
        Dialog::ConfirmingDelete(delete) => {
            let _ = writeln!(out);
            let _ = writeln!(out, "== Delete question {} ==", delete.target.id);
            let _ = writeln!(out, "  {}", delete.target.question);
            let _ = writeln!(
                out,
                "  Are you sure? [confirm{}]  [close]",
                if delete.is_deleting() { ": deleting..." } else { "" }
            );
        }
    }
    out
}

/// Render the table rows, numbered from 1.
#[must_use]
pub fn table(rows: &[&Record]) -> String {
    let mut out = String::new();
    if rows.is_empty() {
        let _ = writeln!(out, "  (no matching questions)");
        return out;
    }

    let cells: Vec<[String; 4]> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            [
                (i + 1).to_string(),
                clip(&r.question),
                clip(&r.answer),
                r.id.clone(),
            ]
        })
        .collect();
    let header = ["#", "Question", "Answer", "Id"].map(str::to_string);

    let mut widths = [0usize; 4];
    for row in std::iter::once(&header).chain(&cells) {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    for row in std::iter::once(&header).chain(&cells) {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| pad(cell, width))
            .collect();
        let _ = writeln!(out, "  {}", line.join("  ").trim_end());
    }
    out
}

/// One line per notification.
#[must_use]
pub fn notifications(notes: &[Notification]) -> String {
    notes.iter().map(|n| format!("* {n}\n")).collect()
}

/// Fit text into one table cell: line breaks become `⏎`, long text is cut.
fn clip(text: &str) -> String {
    let flat: String = text
        .chars()
        .filter(|&c| c != '\r')
        .map(|c| if c == '\n' { '⏎' } else { c })
        .collect();
    if flat.chars().count() <= MAX_CELL_WIDTH {
        return flat;
    }
    let mut clipped: String = flat.chars().take(MAX_CELL_WIDTH - 3).collect();
    clipped.push_str("...");
    clipped
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(cell.chars().count());
    format!("{cell}{}", " ".repeat(fill))
}
