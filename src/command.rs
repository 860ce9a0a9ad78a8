//! Line grammar for the dialog list and the chat prompt.
//!
//! Bare commands must match the whole line; argument commands match their
//! prefix including the separating space. Everything else in a chat is sent
//! as text, so a message that collides with a command cannot be sent as-is.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Leave the chat and return to the dialog list.
    Quit,
    /// Leave the chat and terminate.
    Exit,
    ShowHistory,
    SendPhoto(PathBuf),
    SendDocument(PathBuf),
    DownloadMedia(i64),
    DownloadProfilePhoto,
    PlainMessage(String),
    Noop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogCommand {
    Quit,
    Logout,
    Select(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid media ID given: {0:?}")]
    InvalidMediaId(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
}

pub const CHAT_HELP: &[(&str, &str)] = &[
    ("!q", "Quits the current chat."),
    ("!Q", "Quits the current chat and exits."),
    ("!h", "Prints the latest messages (message History) of the chat."),
    ("!up <path>", "Uploads and sends a Photo located at the given path."),
    ("!uf <path>", "Uploads and sends a File document located at the given path."),
    ("!dm <msg-id>", "Downloads the given message Media (if any)."),
    ("!dp", "Downloads the current dialog Profile picture."),
];

pub const DIALOG_HELP: &[(&str, &str)] = &[
    ("!q", "Quits the dialogs window and exits."),
    ("!l", "Logs out, terminating this session."),
];

pub fn parse_chat_line(line: &str) -> Result<ChatCommand, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(ChatCommand::Noop);
    }

    match line {
        "!q" => return Ok(ChatCommand::Quit),
        "!Q" => return Ok(ChatCommand::Exit),
        "!h" => return Ok(ChatCommand::ShowHistory),
        "!dp" => return Ok(ChatCommand::DownloadProfilePhoto),
        _ => {}
    }

    if let Some(path) = line.strip_prefix("!up ") {
        return path_argument("!up", path).map(ChatCommand::SendPhoto);
    }
    if let Some(path) = line.strip_prefix("!uf ") {
        return path_argument("!uf", path).map(ChatCommand::SendDocument);
    }
    if let Some(id) = line.strip_prefix("!dm ") {
        let id = id.trim();
        if id.is_empty() {
            return Err(CommandError::MissingArgument("!dm"));
        }
        return id
            .parse::<i64>()
            .map(ChatCommand::DownloadMedia)
            .map_err(|_| CommandError::InvalidMediaId(id.to_string()));
    }

    Ok(ChatCommand::PlainMessage(line.to_string()))
}

pub fn parse_dialog_line(line: &str) -> DialogCommand {
    match line.trim() {
        "!q" => DialogCommand::Quit,
        "!l" => DialogCommand::Logout,
        other => DialogCommand::Select(other.to_string()),
    }
}

fn path_argument(command: &'static str, raw: &str) -> Result<PathBuf, CommandError> {
    let path = raw.trim();
    if path.is_empty() {
        return Err(CommandError::MissingArgument(command));
    }
    Ok(PathBuf::from(path))
}
