use thiserror::Error;

use crate::api::error::ApiError;
use crate::app::ConfigError;
use crate::chat::SendError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not logged in; run `clinic-chat login` first")]
    NotLoggedIn,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Send(#[from] SendError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("terminal io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
