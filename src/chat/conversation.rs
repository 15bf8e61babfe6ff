use crate::api::models::{Message, MessageId, UserId};

/// Messages exchanged with one contact, oldest first, in the order the
/// server returned them.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    contact_id: UserId,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(contact_id: UserId) -> Self {
        Self { contact_id, messages: Vec::new() }
    }

    pub fn contact_id(&self) -> UserId {
        self.contact_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Replaces the whole list with server state.
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Appends a message returned by a send. Returns false if a poll already
    /// delivered a message with the same id.
    pub fn push_sent(&mut self, message: Message) -> bool {
        if self.contains(message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    pub fn last_from(&self, sender: UserId) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.sender == sender)
    }
}
