use std::fmt::Write;

use crate::api::models::UserId;
use crate::chat::DirectoryState;
use crate::utils::ellipsize;

const PREVIEW_WIDTH: usize = 40;

/// Renders the contact directory as numbered rows; the number is what
/// `/open` takes. Rows whose name does not match `search` are hidden but
/// keep their numbers.
pub fn render(directory: DirectoryState<'_>, active: Option<UserId>, search: &str) -> String {
    let list = match directory {
        DirectoryState::Loading => return "Loading contacts…\n".to_string(),
        DirectoryState::Empty => return "No contacts yet.\n".to_string(),
        DirectoryState::Loaded(list) => list,
    };
    let mut out = String::from("Conversations\n");
    let mut shown = 0;
    for (idx, c) in list.iter().enumerate().filter(|(_, c)| c.matches_search(search)) {
        shown += 1;
        let marker = if Some(c.id) == active { '>' } else { ' ' };
        let _ = write!(out, "{} {:>2}. {}", marker, idx + 1, c.name);
        if c.unread > 0 {
            let _ = write!(out, " ({})", c.unread);
        }
        out.push('\n');
        if let Some(preview) = c.preview.as_deref().filter(|p| !p.is_empty()) {
            let _ = writeln!(out, "       {}", ellipsize(preview, PREVIEW_WIDTH));
        }
    }
    if shown == 0 {
        let _ = writeln!(out, "No contacts match \"{}\".", search.trim());
    }
    out
}
