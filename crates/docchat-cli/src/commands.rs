//! Input line parsing.

use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  /upload <path>   upload a .pdf or .txt document
  /new             start a new chat (requires a new upload)
  /clear           clear the conversation, keep the document
  /history         show the conversation so far
  /health          check whether the backend is ready
  /help            show this help
  /quit            exit
Anything else is sent to the agent.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(PathBuf),
    New,
    Clear,
    History,
    Health,
    Help,
    Quit,
    /// A line for the agent.
    Say(String),
    /// A slash command we don't know, or one missing its argument.
    Invalid(String),
}

pub fn parse(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "upload" if arg.is_empty() => Command::Invalid("usage: /upload <path>".to_string()),
        "upload" => Command::Upload(PathBuf::from(arg)),
        "new" => Command::New,
        "clear" => Command::Clear,
        "history" => Command::History,
        "health" => Command::Health,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command /{other} (try /help)")),
    }
}
