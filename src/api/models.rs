use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type UserId = u64;
pub type MessageId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    /// Directory of people this role may message, relative to `/api/`.
    pub fn contacts_path(self) -> &'static str {
        match self {
            Role::Patient => "patient/doctors",
            Role::Doctor | Role::Admin => "doctor/patients",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() { self.username.clone() } else { full.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub preview: Option<String>,
    pub unread: u32,
}

impl Contact {
    /// Builds a contact from one directory entry. Accepts flat contact
    /// summaries as well as profile objects with a nested `user`.
    pub fn from_value(item: &Value) -> Option<Contact> {
        let user = item.get("user").filter(|u| u.is_object());
        let id = user
            .and_then(|u| u.get("id"))
            .or_else(|| item.get("user_id"))
            .or_else(|| item.get("id"))
            .and_then(as_id)?;

        let name = item
            .get("name")
            .or_else(|| item.get("display_name"))
            .or_else(|| item.get("displayName"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| user.and_then(user_full_name))
            .or_else(|| user_full_name(item))
            .unwrap_or_else(|| format!("User {id}"));

        let avatar_url = item
            .get("avatar")
            .or_else(|| item.get("avatar_url"))
            .or_else(|| item.get("img"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let preview = item
            .get("preview")
            .or_else(|| item.get("last_message"))
            .or_else(|| item.get("lastMsg"))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Object(_) => v.get("content").and_then(|c| c.as_str()).map(str::to_string),
                _ => None,
            });

        let unread = item
            .get("unread")
            .or_else(|| item.get("unread_count"))
            .and_then(|v| v.as_u64())
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(0);

        Some(Contact { id, name, avatar_url, preview, unread })
    }

    /// Case-insensitive name match; a blank term matches everyone.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim();
        term.is_empty() || self.name.to_lowercase().contains(&term.to_lowercase())
    }
}

fn as_id(v: &Value) -> Option<UserId> {
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn user_full_name(user: &Value) -> Option<String> {
    let first = user.get("first_name").and_then(|v| v.as_str()).unwrap_or("");
    let last = user.get("last_name").and_then(|v| v.as_str()).unwrap_or("");
    let full = format!("{first} {last}");
    let full = full.trim();
    if !full.is_empty() {
        return Some(full.to_string());
    }
    user.get("username").and_then(|v| v.as_str()).map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: UserId,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub receiver: Option<UserId>,
    #[serde(default)]
    pub receiver_name: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Debug, Serialize)]
pub struct NewMessage<'a> {
    pub content: &'a str,
}
