use std::collections::HashMap;

use thiserror::Error;

use crate::types::{MediaItem, Message};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaIndexError {
    #[error("no media with id {0} has been shown; use !h first")]
    UnknownId(i64),
}

/// Media attached to messages the user has seen through history, by message id.
#[derive(Debug, Default)]
pub struct FoundMediaIndex {
    items: HashMap<i64, MediaItem>,
}

impl FoundMediaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes every media message in a displayed history page.
    pub fn record_history(&mut self, messages: &[Message]) -> usize {
        let mut added = 0;
        for message in messages {
            if let Some(media) = message.media() {
                self.items.insert(message.id, media.clone());
                added += 1;
            }
        }
        added
    }

    pub fn get(&self, message_id: i64) -> Result<&MediaItem, MediaIndexError> {
        self.items.get(&message_id).ok_or(MediaIndexError::UnknownId(message_id))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
