use crate::api::models::{Message, UserId};

/// Results delivered from background pollers to the session that owns the
/// conversation. Every variant carries the contact it was fetched for.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Messages { contact_id: UserId, messages: Vec<Message> },
    FetchFailed { contact_id: UserId, reason: String },
    AuthExpired { contact_id: UserId },
}

impl ChatEvent {
    pub fn contact_id(&self) -> UserId {
        match self {
            ChatEvent::Messages { contact_id, .. }
            | ChatEvent::FetchFailed { contact_id, .. }
            | ChatEvent::AuthExpired { contact_id } => *contact_id,
        }
    }
}
