use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::api::models::UserId;
use crate::chat::conversation::Conversation;

const ACTIVE_NOW_MINUTES: i64 = 5;
const RECENTLY_ACTIVE_MINUTES: i64 = 60;

/// Online indicator derived from how recently the contact last wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    ActiveNow,
    ActiveMinutesAgo(i64),
    Offline,
}

impl Presence {
    pub fn infer(conversation: &Conversation, contact_id: UserId, now: DateTime<Utc>) -> Presence {
        let Some(last) = conversation.last_from(contact_id) else {
            return Presence::Offline;
        };
        let age = now.signed_duration_since(last.timestamp);
        if age < Duration::minutes(ACTIVE_NOW_MINUTES) {
            Presence::ActiveNow
        } else if age < Duration::minutes(RECENTLY_ACTIVE_MINUTES) {
            Presence::ActiveMinutesAgo(age.num_minutes())
        } else {
            Presence::Offline
        }
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presence::ActiveNow => write!(f, "Active now"),
            Presence::ActiveMinutesAgo(m) => write!(f, "Active {}m ago", m),
            Presence::Offline => write!(f, "Offline"),
        }
    }
}
