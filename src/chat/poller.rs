use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::api::client::ChatBackend;
use crate::api::events::ChatEvent;
use crate::api::models::UserId;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Background task that keeps one conversation fresh. The task is aborted
/// when the poller is stopped or dropped, which also drops any request
/// still in flight.
pub struct ConversationPoller {
    contact_id: UserId,
    handle: JoinHandle<()>,
}

impl ConversationPoller {
    /// Fetches immediately, then again `interval` after each fetch completes.
    pub fn spawn(
        backend: Arc<dyn ChatBackend>,
        contact_id: UserId,
        interval: Duration,
        events: UnboundedSender<ChatEvent>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                let event = match backend.messages(contact_id).await {
                    Ok(messages) => ChatEvent::Messages { contact_id, messages },
                    Err(e) if e.is_auth() => {
                        let _ = events.send(ChatEvent::AuthExpired { contact_id });
                        break;
                    }
                    Err(e) => {
                        warn!("poll for contact {} failed: {}", contact_id, e);
                        ChatEvent::FetchFailed { contact_id, reason: e.to_string() }
                    }
                };
                if events.send(event).is_err() {
                    debug!("session gone, stopping poll for contact {}", contact_id);
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        });
        Self { contact_id, handle }
    }

    pub fn contact_id(&self) -> UserId {
        self.contact_id
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        debug!("stopping poll for contact {}", self.contact_id);
        self.handle.abort();
    }
}

impl Drop for ConversationPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
