pub mod conversation;
pub mod poller;
pub mod presence;
pub mod session;

pub use conversation::Conversation;
pub use poller::{ConversationPoller, DEFAULT_POLL_INTERVAL};
pub use presence::Presence;
pub use session::{Applied, ChatSession, DirectoryState, SendError};
