use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::client::ChatBackend;
use crate::api::error::ApiError;
use crate::api::events::ChatEvent;
use crate::api::models::{Contact, Message, UserId};
use crate::chat::conversation::Conversation;
use crate::chat::poller::ConversationPoller;
use crate::chat::presence::Presence;
use crate::storage::ContactCache;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("no conversation selected")]
    NoActiveContact,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// What the directory pane should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryState<'a> {
    Loading,
    Empty,
    Loaded(&'a [Contact]),
}

/// Outcome of feeding a poll event into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Updated,
    Stale,
    Failed(String),
    AuthExpired,
}

/// Client-side state of the messaging view: the contact directory, the
/// active conversation with its poller, and the input draft.
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    events: UnboundedSender<ChatEvent>,
    poll_interval: Duration,
    cache: Option<ContactCache>,
    me: Option<UserId>,
    contacts: Option<Vec<Contact>>,
    conversation: Option<Conversation>,
    poller: Option<ConversationPoller>,
    draft: String,
    search: String,
    auth_expired: bool,
}

impl ChatSession {
    /// Creates a session and the receiving end its pollers report to.
    pub fn new(backend: Arc<dyn ChatBackend>, poll_interval: Duration) -> (Self, UnboundedReceiver<ChatEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            backend,
            events,
            poll_interval,
            cache: None,
            me: None,
            contacts: None,
            conversation: None,
            poller: None,
            draft: String::new(),
            search: String::new(),
            auth_expired: false,
        };
        (session, rx)
    }

    pub fn with_cache(mut self, cache: ContactCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_user(mut self, me: UserId) -> Self {
        self.me = Some(me);
        self
    }

    pub fn me(&self) -> Option<UserId> {
        self.me
    }

    pub fn directory(&self) -> DirectoryState<'_> {
        match &self.contacts {
            None => DirectoryState::Loading,
            Some(list) if list.is_empty() => DirectoryState::Empty,
            Some(list) => DirectoryState::Loaded(list),
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        self.contacts.as_deref().unwrap_or(&[])
    }

    /// Narrows the directory listing by name; a blank term clears it.
    pub fn set_search(&mut self, term: &str) {
        self.search = term.trim().to_string();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn active_contact(&self) -> Option<&Contact> {
        let id = self.active_id()?;
        self.contacts().iter().find(|c| c.id == id)
    }

    pub fn active_id(&self) -> Option<UserId> {
        self.conversation.as_ref().map(Conversation::contact_id)
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.as_ref().map(Conversation::messages).unwrap_or(&[])
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(ConversationPoller::is_running)
    }

    pub fn auth_expired(&self) -> bool {
        self.auth_expired
    }

    /// Fetches the directory and selects the first contact if nothing is
    /// active yet.
    pub async fn load_contacts(&mut self) -> Result<&[Contact], ApiError> {
        self.fetch_directory().await?;
        if self.active_id().is_none() {
            if let Some(id) = self.contacts().first().map(|c| c.id) {
                self.select(id);
            }
        }
        Ok(self.contacts())
    }

    /// Fetches the directory. The active conversation is kept unless its
    /// contact is no longer listed. On failure the cached directory, if
    /// any, is shown instead.
    pub async fn fetch_directory(&mut self) -> Result<&[Contact], ApiError> {
        let fetched = self.backend.contacts().await;
        match fetched {
            Ok(list) => {
                info!("loaded {} contacts", list.len());
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.store_contacts(&list) {
                        warn!("failed to cache contacts: {}", e);
                    }
                }
                if let Some(active) = self.active_id() {
                    if !list.iter().any(|c| c.id == active) {
                        info!("contact {} left the directory, closing conversation", active);
                        self.close();
                    }
                }
                self.contacts = Some(list);
                Ok(self.contacts())
            }
            Err(e) => {
                error!("failed to load contacts: {}", e);
                if e.is_auth() {
                    self.auth_expired = true;
                }
                if self.contacts.is_none() {
                    if let Some(cache) = &self.cache {
                        match cache.contacts(None) {
                            Ok(cached) if !cached.is_empty() => {
                                info!("showing {} cached contacts", cached.len());
                                self.contacts = Some(cached);
                            }
                            Ok(_) => {}
                            Err(ce) => warn!("contact cache unavailable: {}", ce),
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// Makes `contact_id` the active conversation and starts polling it.
    /// Returns false if the contact is not in the directory.
    pub fn select(&mut self, contact_id: UserId) -> bool {
        if !self.contacts().iter().any(|c| c.id == contact_id) {
            warn!("contact {} is not in the directory", contact_id);
            return false;
        }
        if self.active_id() == Some(contact_id) && self.is_polling() {
            return true;
        }
        self.close();
        debug!("opening conversation with {}", contact_id);
        self.conversation = Some(Conversation::new(contact_id));
        self.poller = Some(ConversationPoller::spawn(
            Arc::clone(&self.backend),
            contact_id,
            self.poll_interval,
            self.events.clone(),
        ));
        true
    }

    /// Stops polling and returns to the idle state.
    pub fn close(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        self.conversation = None;
    }

    /// Applies a poll result. Results for any contact other than the active
    /// one are discarded.
    pub fn apply(&mut self, event: ChatEvent) -> Applied {
        if self.active_id() != Some(event.contact_id()) {
            debug!("discarding stale event for contact {}", event.contact_id());
            return Applied::Stale;
        }
        match event {
            ChatEvent::Messages { messages, .. } => {
                if let Some(conv) = self.conversation.as_mut() {
                    conv.replace(messages);
                }
                Applied::Updated
            }
            ChatEvent::FetchFailed { reason, .. } => Applied::Failed(reason),
            ChatEvent::AuthExpired { .. } => {
                self.auth_expired = true;
                if let Some(poller) = self.poller.take() {
                    poller.stop();
                }
                Applied::AuthExpired
            }
        }
    }

    /// Fetches the active conversation right away.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let Some(contact_id) = self.active_id() else {
            return Ok(());
        };
        let messages = match self.backend.messages(contact_id).await {
            Ok(messages) => messages,
            Err(e) => {
                if e.is_auth() {
                    self.auth_expired = true;
                }
                return Err(e);
            }
        };
        self.apply(ChatEvent::Messages { contact_id, messages });
        Ok(())
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Sends the current draft to the active contact. Blank drafts are a
    /// no-op. The draft is cleared before the request and restored verbatim
    /// if it fails.
    pub async fn send_draft(&mut self) -> Result<Option<&Message>, SendError> {
        if self.draft.trim().is_empty() {
            return Ok(None);
        }
        let contact_id = self.active_id().ok_or(SendError::NoActiveContact)?;
        let text = std::mem::take(&mut self.draft);
        let sent = self.backend.send_message(contact_id, text.trim()).await;
        match sent {
            Ok(message) => {
                let id = message.id;
                let conv = self.conversation.as_mut().ok_or(SendError::NoActiveContact)?;
                if !conv.push_sent(message) {
                    debug!("message {} already delivered by poll", id);
                }
                Ok(conv.messages().iter().find(|m| m.id == id))
            }
            Err(e) => {
                error!("send to {} failed: {}", contact_id, e);
                if e.is_auth() {
                    self.auth_expired = true;
                }
                self.draft = text;
                Err(e.into())
            }
        }
    }

    pub fn presence(&self, now: DateTime<Utc>) -> Option<Presence> {
        let conv = self.conversation.as_ref()?;
        Some(Presence::infer(conv, conv.contact_id(), now))
    }
}
