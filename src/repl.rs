//! Interactive terminal loop.
//!
//! Reads one question per line, answers it through [`App::ask`], and prints
//! the latest transcript entries plus the documents that were used. A failed
//! question is reported and the loop keeps going; only `/quit` or end of
//! input stops it.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::app::{Answer, App};
use crate::models::Message;

pub const PROMPT: &str = "What would you like to know about the course?";

enum Command<'a> {
    Quit,
    History,
    Skip,
    Ask(&'a str),
}

fn parse_line(line: &str) -> Command<'_> {
    match line.trim() {
        "/quit" | "/exit" => Command::Quit,
        "/history" => Command::History,
        "" => Command::Skip,
        question => Command::Ask(question),
    }
}

/// Render transcript messages as `role: content` blocks.
pub fn render_messages(messages: &[Message]) -> String {
    let mut out = String::new();
    for m in messages {
        out.push_str(&format!("{}: {}\n", m.role, m.content));
    }
    out
}

/// Render the numbered source list, or nothing when no context was used.
pub fn render_sources(answer: &Answer) -> String {
    if !answer.used_context || answer.sources.is_empty() {
        return String::new();
    }
    let mut out = String::from("Related documents:\n");
    for (i, id) in answer.sources.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, id));
    }
    out
}

/// Drive the loop over `input`, writing everything user-facing to `out`.
pub async fn run<R, W>(app: &mut App, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        writeln!(out, "{}", PROMPT)?;
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        match parse_line(&line) {
            Command::Quit => break,
            Command::Skip => continue,
            Command::History => {
                if app.session().is_empty() {
                    writeln!(out, "(no messages yet)")?;
                } else {
                    write!(out, "{}", render_messages(app.session().history()))?;
                }
            }
            Command::Ask(question) => {
                let before = app.session().len();
                let result = app.ask(question).await;
                write!(out, "{}", render_messages(&app.session().history()[before..]))?;
                match result {
                    Ok(answer) => write!(out, "{}", render_sources(&answer))?,
                    Err(e) => tracing::error!(error = %e, "question failed"),
                }
            }
        }
        writeln!(out)?;
    }

    Ok(())
}
