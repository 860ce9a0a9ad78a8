use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Group,
    Channel,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Group => "group",
            EntityKind::Channel => "channel",
        }
    }
}

/// A remote file the protocol layer knows how to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: i64,
    pub url: Option<String>,
    pub size: Option<u64>,
}

/// A peer snapshot: user, group or channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: i64,
    pub kind: EntityKind,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub username: Option<String>,
    pub photo: Option<RemoteFile>,
}

impl Entity {
    /// An entity known only by id, used when the server omitted its details.
    pub fn bare(id: i64, kind: EntityKind) -> Self {
        Self {
            id,
            kind,
            first_name: None,
            last_name: None,
            title: None,
            username: None,
            photo: None,
        }
    }

    pub fn user(id: i64, first_name: impl Into<String>) -> Self {
        Self {
            id,
            kind: EntityKind::User,
            first_name: Some(first_name.into()),
            last_name: None,
            title: None,
            username: None,
            photo: None,
        }
    }

    pub fn group(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            kind: EntityKind::Group,
            first_name: None,
            last_name: None,
            title: Some(title.into()),
            username: None,
            photo: None,
        }
    }

    pub fn display_name(&self) -> String {
        if let Some(title) = self.title.as_deref().filter(|value| !value.trim().is_empty()) {
            return title.to_string();
        }

        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        let name = match (first.is_empty(), last.is_empty()) {
            (false, false) => format!("{first} {last}"),
            (false, true) => first.to_string(),
            (true, false) => last.to_string(),
            (true, true) => String::new(),
        };
        if !name.is_empty() {
            return name;
        }

        if let Some(username) = self.username.as_deref().filter(|value| !value.trim().is_empty()) {
            return format!("@{username}");
        }

        format!("{} {}", self.kind.as_str(), self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogSummary {
    pub unread_count: u32,
    pub top_message_id: Option<i64>,
    pub last_message_preview: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub summary: DialogSummary,
    pub entity: Entity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaItem {
    Photo {
        file: RemoteFile,
        caption: Option<String>,
    },
    Document {
        file: RemoteFile,
        file_name: Option<String>,
        mime_type: Option<String>,
        caption: Option<String>,
    },
    Video {
        file: RemoteFile,
        duration: Option<u32>,
        caption: Option<String>,
    },
}

impl MediaItem {
    pub fn kind_name(&self) -> &'static str {
        match self {
            MediaItem::Photo { .. } => "Photo",
            MediaItem::Document { .. } => "Document",
            MediaItem::Video { .. } => "Video",
        }
    }

    pub fn caption(&self) -> Option<&str> {
        match self {
            MediaItem::Photo { caption, .. }
            | MediaItem::Document { caption, .. }
            | MediaItem::Video { caption, .. } => caption.as_deref(),
        }
    }

    pub fn file(&self) -> &RemoteFile {
        match self {
            MediaItem::Photo { file, .. } | MediaItem::Document { file, .. } | MediaItem::Video { file, .. } => file,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    Media(MediaItem),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub sender: Option<Entity>,
    pub body: MessageBody,
}

impl Message {
    pub fn media(&self) -> Option<&MediaItem> {
        match &self.body {
            MessageBody::Media(media) => Some(media),
            MessageBody::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Server-pushed notification of new activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    DirectMessage {
        user_id: i64,
        text: String,
        direction: Direction,
    },
    GroupMessage {
        chat_id: i64,
        from_id: i64,
        text: String,
        direction: Direction,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_title_then_full_name() {
        let group = Entity::group(7, "Rustaceans");
        assert_eq!(group.display_name(), "Rustaceans");

        let mut user = Entity::user(1, "Ada");
        user.last_name = Some("Lovelace".to_string());
        assert_eq!(user.display_name(), "Ada Lovelace");
    }

    #[test]
    fn display_name_falls_back_to_username_and_id() {
        let mut user = Entity::user(42, "  ");
        user.username = Some("ada".to_string());
        assert_eq!(user.display_name(), "@ada");

        user.username = None;
        assert_eq!(user.display_name(), "user 42");
    }

    #[test]
    fn media_accessors_cover_every_variant() {
        let file = RemoteFile {
            id: 3,
            url: None,
            size: Some(10),
        };
        let video = MediaItem::Video {
            file: file.clone(),
            duration: Some(4),
            caption: Some("clip".to_string()),
        };
        assert_eq!(video.kind_name(), "Video");
        assert_eq!(video.caption(), Some("clip"));
        assert_eq!(video.file(), &file);
    }
}
