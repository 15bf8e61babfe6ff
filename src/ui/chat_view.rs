use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::api::models::{Contact, Message, UserId};
use crate::chat::{ChatSession, Presence};
use crate::utils::clock_time;

pub fn header(contact: &Contact, presence: Presence) -> String {
    format!("── {} · {} ──", contact.name, presence)
}

fn is_own(m: &Message, contact: &Contact, me: Option<UserId>) -> bool {
    m.sender != contact.id && me.is_none_or(|id| id == m.sender)
}

fn sender_label<'a>(m: &'a Message, contact: &'a Contact, me: Option<UserId>) -> &'a str {
    if m.sender == contact.id {
        &contact.name
    } else if is_own(m, contact, me) {
        "You"
    } else {
        m.sender_name.as_deref().unwrap_or("Unknown")
    }
}

const READ_MARK: &str = "✓✓";

/// One transcript line. Own messages the contact has read carry a read mark.
pub fn message_line(m: &Message, contact: &Contact, me: Option<UserId>) -> String {
    let mut line = format!("{}  {}: {}", clock_time(m.timestamp), sender_label(m, contact, me), m.content);
    if m.is_read && is_own(m, contact, me) {
        line.push(' ');
        line.push_str(READ_MARK);
    }
    line
}

/// Renders the active conversation, or a hint when nothing is open.
pub fn render(session: &ChatSession, now: DateTime<Utc>) -> String {
    let Some(contact) = session.active_contact() else {
        return "Select a conversation with /open <n>.\n".to_string();
    };
    let presence = session.presence(now).unwrap_or(Presence::Offline);
    let mut out = header(contact, presence);
    out.push('\n');
    if session.messages().is_empty() {
        out.push_str("No messages yet. Say hello.\n");
    }
    for m in session.messages() {
        let _ = writeln!(out, "{}", message_line(m, contact, session.me()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn contact() -> Contact {
        Contact { id: 3, name: "Dr. Alex Rivera".into(), avatar_url: None, preview: None, unread: 0 }
    }

    fn msg(sender: UserId, sender_name: Option<&str>) -> Message {
        Message {
            id: 1,
            sender,
            sender_name: sender_name.map(str::to_string),
            receiver: None,
            receiver_name: None,
            content: "Have you tried the grounding exercise?".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 10, 16, 10, 33, 0).unwrap(),
            is_read: false,
        }
    }

    #[test]
    fn header_shows_presence() {
        assert_eq!(header(&contact(), Presence::ActiveNow), "── Dr. Alex Rivera · Active now ──");
    }

    #[test]
    fn labels_contact_and_self() {
        let c = contact();
        assert!(message_line(&msg(3, None), &c, Some(5)).ends_with("Dr. Alex Rivera: Have you tried the grounding exercise?"));
        assert!(message_line(&msg(5, None), &c, Some(5)).contains("  You: "));
        assert!(message_line(&msg(5, None), &c, None).contains("  You: "));
        assert!(message_line(&msg(8, Some("Reception")), &c, Some(5)).contains("  Reception: "));
    }

    #[test]
    fn read_mark_only_on_own_read_messages() {
        let c = contact();
        let read = |sender| Message { is_read: true, ..msg(sender, None) };
        assert!(message_line(&read(5), &c, Some(5)).ends_with("grounding exercise? ✓✓"));
        assert!(!message_line(&msg(5, None), &c, Some(5)).contains("✓✓"));
        assert!(!message_line(&read(3), &c, Some(5)).contains("✓✓"));
    }
}
