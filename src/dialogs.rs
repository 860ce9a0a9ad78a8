use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::auth::Authorized;
use crate::protocol::{ProtocolClient, ProtocolError};
use crate::types::{Dialog, Entity, Message};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("{0:?} is not a dialog number")]
    NotANumber(String),
    #[error("dialog {index} is out of range (1-{len})")]
    OutOfRange { index: i64, len: usize },
}

/// Lists conversations and fetches their history. Needs an authorized session.
#[derive(Clone)]
pub struct DialogBrowser {
    client: Arc<dyn ProtocolClient>,
}

impl DialogBrowser {
    pub fn new(session: &Authorized) -> Self {
        Self {
            client: Arc::clone(session.client()),
        }
    }

    /// Up to `limit` dialogs, most recent first.
    pub async fn list_top(&self, limit: usize) -> Result<Vec<Dialog>, ProtocolError> {
        let mut dialogs = self.client.get_dialogs(limit).await?;
        dialogs.truncate(limit);
        debug!(count = dialogs.len(), "dialogs listed");
        Ok(dialogs)
    }

    /// Up to `limit` messages, most recent first.
    pub async fn history(&self, peer: &Entity, limit: usize) -> Result<Vec<Message>, ProtocolError> {
        let mut messages = self.client.get_history(peer, limit).await?;
        messages.truncate(limit);
        Ok(messages)
    }
}

/// Resolves 1-based user input against the last listed page.
pub fn select_by_index<'a>(dialogs: &'a [Dialog], input: &str) -> Result<&'a Dialog, SelectionError> {
    let raw = input.trim();
    let index: i64 = raw
        .parse()
        .map_err(|_| SelectionError::NotANumber(raw.to_string()))?;

    let out_of_range = || SelectionError::OutOfRange {
        index,
        len: dialogs.len(),
    };
    if index < 1 {
        return Err(out_of_range());
    }
    let position = usize::try_from(index - 1).map_err(|_| out_of_range())?;
    dialogs.get(position).ok_or_else(out_of_range)
}
