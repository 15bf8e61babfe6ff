use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::warn;
use tokio::sync::mpsc::UnboundedReceiver;

use clinic_chat::api::events::ChatEvent;
use clinic_chat::app::AppState;
use clinic_chat::chat::ChatSession;
use clinic_chat::storage::ContactCache;
use clinic_chat::ui::main_window::{self, Exit};
use clinic_chat::ui::{login, sidebar};
use clinic_chat::{Error, Result};

#[derive(Parser)]
#[command(name = "clinic-chat", version, about = "Message your clinic care team from the terminal")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, env = "CLINIC_CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Do not read or write the local contact cache
    #[arg(long)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session
    Login {
        #[arg(long, env = "CLINIC_CHAT_SERVER")]
        server: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "CLINIC_CHAT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// List the people you can message
    Contacts,
    /// Open the interactive messaging view
    Chat {
        /// Contact id to open instead of the first one
        #[arg(long)]
        contact: Option<u64>,
    },
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    cli.config
        .clone()
        .or_else(AppState::default_path)
        .ok_or(Error::Config(clinic_chat::app::ConfigError::NoConfigDir))
}

fn open_cache(cli: &Cli) -> Option<ContactCache> {
    if cli.no_cache {
        return None;
    }
    match ContactCache::open_default() {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!("contact cache disabled: {}", e);
            None
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = config_path(&cli)?;
    let mut state = AppState::load_from(&path)?;

    match &cli.command {
        Command::Login { server, username, password } => {
            let user = login::login(&mut state, server, username, password).await?;
            state.save_to(&path)?;
            println!("Logged in as {}.", user.display_name());
        }
        Command::Logout => {
            login::logout(&mut state);
            state.save_to(&path)?;
            println!("Logged out.");
        }
        Command::Contacts => {
            if !state.is_logged_in() {
                return Err(Error::NotLoggedIn);
            }
            let (mut session, _events) = new_session(&cli, &state)?;
            let loaded = session.fetch_directory().await.map(|_| ());
            print!("{}", sidebar::render(session.directory(), None, ""));
            if let Err(e) = loaded {
                if e.is_auth() {
                    state.clear_login();
                    state.save_to(&path)?;
                }
                return Err(e.into());
            }
        }
        Command::Chat { contact } => {
            if !state.is_logged_in() {
                return Err(Error::NotLoggedIn);
            }
            let (mut session, events) = new_session(&cli, &state)?;
            if let Some(user) = &state.user {
                session = session.with_user(user.id);
            }
            if main_window::run(session, events, *contact).await? == Exit::AuthExpired {
                state.clear_login();
                state.save_to(&path)?;
            }
        }
    }
    Ok(())
}

fn new_session(cli: &Cli, state: &AppState) -> Result<(ChatSession, UnboundedReceiver<ChatEvent>)> {
    let (mut session, events) = ChatSession::new(Arc::new(state.client()?), state.poll_interval());
    if let Some(cache) = open_cache(cli) {
        session = session.with_cache(cache);
    }
    Ok((session, events))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
