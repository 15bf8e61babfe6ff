use log::info;

use crate::api::error::ApiError;
use crate::api::models::CurrentUser;
use crate::app::AppState;
use crate::utils::normalize_url;

/// Logs in against `server`, resolves the current user and records both in
/// `state`. The caller persists the state.
pub async fn login(state: &mut AppState, server: &str, username: &str, password: &str) -> Result<CurrentUser, ApiError> {
    let url = normalize_url(server);
    if url.is_empty() {
        return Err(ApiError::InvalidUrl(url::ParseError::EmptyHost));
    }
    let mut candidate = AppState { base_url: url, ..state.clone() };
    candidate.clear_login();
    let client = candidate.client()?;
    let token = client.login(username, password).await?;
    let user = client.current_user().await?;
    info!("logged in as {} ({:?})", user.username, user.role);

    candidate.token = Some(token);
    candidate.user = Some(user.clone());
    *state = candidate;
    Ok(user)
}

pub fn logout(state: &mut AppState) {
    state.clear_login();
}
