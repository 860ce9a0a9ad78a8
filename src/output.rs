use chrono::TimeZone;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::types::{Dialog, Direction, Message, MessageBody, UpdateEvent};

/// Three-line boxed title spanning `columns`.
pub fn title_banner(title: &str, columns: usize) -> String {
    let inner = columns.saturating_sub(2).max(display_width(title));
    let title = center(title, inner);
    let rule = "─".repeat(inner);
    format!("┌{rule}┐\n│{title}│\n└{rule}┘")
}

pub fn help_lines(commands: &[(&str, &str)]) -> Vec<String> {
    commands
        .iter()
        .map(|(command, description)| format!("  {command}: {description}"))
        .collect()
}

/// `3. Ada Lovelace (2 unread)`, truncated to the terminal width.
pub fn dialog_line(position: usize, dialog: &Dialog, columns: usize) -> String {
    let mut line = format!("{position}. {}", dialog.entity.display_name());
    if dialog.summary.unread_count > 0 {
        line.push_str(&format!(" ({} unread)", dialog.summary.unread_count));
    }
    truncate_display(&line, columns.max(8))
}

/// `[hh:mm] (ID=<id>) <sender>: <content>` in the given zone.
pub fn history_line<Tz: TimeZone>(message: &Message, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let time = message.date.with_timezone(zone).format("%H:%M");
    let sender = message
        .sender
        .as_ref()
        .map(|sender| sender.display_name())
        .unwrap_or_else(|| "???".to_string());
    let content = match &message.body {
        MessageBody::Text(text) => text.clone(),
        MessageBody::Media(media) => {
            let kind = media.kind_name();
            match media.caption().filter(|caption| !caption.trim().is_empty()) {
                Some(caption) => format!("<{kind}> {caption}"),
                None => format!("<{kind}>"),
            }
        }
    };
    format!("[{time}] (ID={}) {sender}: {content}", message.id)
}

pub fn progress_line(label: &str, done: u64, total: u64) -> String {
    let percent = if total == 0 {
        100.0
    } else {
        (done.min(total) as f64) * 100.0 / (total as f64)
    };
    format!(
        "{label} {} out of {} ({percent:.2}%)",
        format_bytes(done),
        format_bytes(total)
    )
}

pub fn render_update(event: &UpdateEvent) -> String {
    match event {
        UpdateEvent::DirectMessage {
            user_id,
            text,
            direction: Direction::Outgoing,
        } => format!("You sent {text} to user #{user_id}"),
        UpdateEvent::DirectMessage {
            user_id,
            text,
            direction: Direction::Incoming,
        } => format!("[User #{user_id} sent {text}]"),
        UpdateEvent::GroupMessage {
            chat_id,
            text,
            direction: Direction::Outgoing,
            ..
        } => format!("You sent {text} to chat #{chat_id}"),
        UpdateEvent::GroupMessage {
            chat_id,
            from_id,
            text,
            direction: Direction::Incoming,
        } => format!("[Chat #{chat_id}, user #{from_id} sent {text}]"),
    }
}

pub fn format_bytes(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes < 1024.0 {
        return format!("{}B", bytes as u64);
    }
    let kb = bytes / 1024.0;
    if kb < 1024.0 {
        return format!("{:.1}KB", kb);
    }
    let mb = kb / 1024.0;
    if mb < 1024.0 {
        return format!("{:.1}MB", mb);
    }
    let gb = mb / 1024.0;
    format!("{:.1}GB", gb)
}

fn display_width(value: &str) -> usize {
    UnicodeWidthStr::width(value)
}

fn center(value: &str, width: usize) -> String {
    let current = display_width(value);
    if current >= width {
        return value.to_string();
    }
    let left = (width - current) / 2;
    let right = width - current - left;
    format!("{}{value}{}", " ".repeat(left), " ".repeat(right))
}

fn truncate_display(value: &str, max_width: usize) -> String {
    if display_width(value) <= max_width {
        return value.to_string();
    }
    let ellipsis = "...";
    let mut width = 0usize;
    let mut output = String::new();
    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + ellipsis.len() > max_width {
            break;
        }
        output.push(ch);
        width += ch_width;
    }
    output.push_str(ellipsis);
    output
}
