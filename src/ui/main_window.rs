use chrono::Utc;
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::events::ChatEvent;
use crate::api::models::{MessageId, UserId};
use crate::chat::{Applied, ChatSession, DirectoryState};
use crate::error::Result;
use crate::ui::{chat_view, sidebar};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Open(usize),
    Contacts,
    Refresh,
    /// Filters the directory by name; an empty term clears the filter.
    Search(String),
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Send(line.to_string());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "quit" | "q" | "exit" => Command::Quit,
            "contacts" | "c" => Command::Contacts,
            "refresh" | "r" => Command::Refresh,
            "search" | "s" => Command::Search(arg.to_string()),
            "open" | "o" => match arg.parse::<usize>() {
                Ok(n) if n > 0 => Command::Open(n),
                _ => Command::Unknown(trimmed.to_string()),
            },
            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    AuthExpired,
}

/// Fingerprint of what is on screen, so poll ticks that change nothing
/// do not reprint the conversation.
#[derive(Default)]
struct Screen {
    shown: Option<(UserId, Vec<MessageId>)>,
}

impl Screen {
    fn redraw(&mut self, session: &ChatSession, force: bool) {
        let current = session
            .active_id()
            .map(|id| (id, session.messages().iter().map(|m| m.id).collect::<Vec<_>>()));
        if !force && current == self.shown {
            return;
        }
        print!("{}", chat_view::render(session, Utc::now()));
        self.shown = current;
    }
}

/// Runs the interactive messaging loop until the user quits, stdin closes
/// or the session expires.
pub async fn run(mut session: ChatSession, mut events: UnboundedReceiver<ChatEvent>, open: Option<UserId>) -> Result<Exit> {
    if let Err(e) = session.load_contacts().await {
        eprintln!("Could not load contacts: {}", e);
    }
    if let Some(id) = open {
        if !session.select(id) {
            eprintln!("Contact {} is not in your directory.", id);
        }
    }
    print!("{}", sidebar::render(session.directory(), session.active_id(), session.search()));

    let mut screen = Screen::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if session.auth_expired() {
            eprintln!("Session expired. Run `clinic-chat login` again.");
            return Ok(Exit::AuthExpired);
        }
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    return Ok(Exit::Quit);
                };
                match Command::parse(&line) {
                    Command::Quit => return Ok(Exit::Quit),
                    Command::Contacts => {
                        if let Err(e) = session.load_contacts().await {
                            eprintln!("Could not load contacts: {}", e);
                        }
                        print!("{}", sidebar::render(session.directory(), session.active_id(), session.search()));
                    }
                    Command::Search(term) => {
                        session.set_search(&term);
                        print!("{}", sidebar::render(session.directory(), session.active_id(), session.search()));
                    }
                    Command::Open(n) => {
                        let id = match session.directory() {
                            DirectoryState::Loaded(list) => list.get(n - 1).map(|c| c.id),
                            _ => None,
                        };
                        match id {
                            Some(id) if session.select(id) => screen.redraw(&session, true),
                            _ => eprintln!("No contact number {}.", n),
                        }
                    }
                    Command::Refresh => match session.refresh().await {
                        Ok(()) => screen.redraw(&session, true),
                        Err(e) => eprintln!("Refresh failed: {}", e),
                    },
                    Command::Send(text) => {
                        session.set_draft(text);
                        match session.send_draft().await {
                            Ok(Some(_)) => screen.redraw(&session, false),
                            Ok(None) => {}
                            Err(e) => {
                                eprintln!("Message not sent: {}", e);
                                eprintln!("Draft kept: {}", session.draft());
                            }
                        }
                    }
                    Command::Unknown(cmd) => {
                        eprintln!("Unknown command {}. Try /contacts, /search <name>, /open <n>, /refresh or /quit.", cmd);
                    }
                }
            }
            Some(event) = events.recv() => match session.apply(event) {
                Applied::Updated => screen.redraw(&session, false),
                Applied::Failed(reason) => warn!("conversation refresh failed: {}", reason),
                Applied::Stale | Applied::AuthExpired => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse(" /open 2 "), Command::Open(2));
        assert_eq!(Command::parse("/contacts"), Command::Contacts);
        assert_eq!(Command::parse("/r"), Command::Refresh);
        assert!(matches!(Command::parse("/open 0"), Command::Unknown(_)));
        assert!(matches!(Command::parse("/open"), Command::Unknown(_)));
        assert!(matches!(Command::parse("/opera 2"), Command::Unknown(_)));
    }

    #[test]
    fn search_keeps_whole_term() {
        assert_eq!(Command::parse("/search Maya Chen"), Command::Search("Maya Chen".into()));
        assert_eq!(Command::parse("/s  lee "), Command::Search("lee".into()));
        assert_eq!(Command::parse("/search"), Command::Search(String::new()));
    }

    #[test]
    fn plain_lines_are_drafts_verbatim() {
        assert_eq!(Command::parse("  see you at 3 "), Command::Send("  see you at 3 ".into()));
    }
}
