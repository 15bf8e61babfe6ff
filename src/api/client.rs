use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use url::Url;

use crate::api::error::ApiError;
use crate::api::models::{Contact, CurrentUser, Message, NewMessage, Role, UserId};
use crate::auth::AuthSession;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The operations the chat session needs from the backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn contacts(&self) -> Result<Vec<Contact>, ApiError>;
    async fn messages(&self, contact_id: UserId) -> Result<Vec<Message>, ApiError>;
    async fn send_message(&self, contact_id: UserId, content: &str) -> Result<Message, ApiError>;
}

pub struct ApiClient {
    http: HttpClient,
    base_api: Url,
    auth: AuthSession,
    contacts_path: String,
}

impl ApiClient {
    pub fn new(base_url: &str, auth: AuthSession) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, auth, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, auth: AuthSession, timeout: Duration) -> Result<Self, ApiError> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_api: Self::base_api(base_url)?,
            auth,
            contacts_path: Role::Patient.contacts_path().to_string(),
        })
    }

    /// Overrides the directory endpoint, relative to `/api/`.
    pub fn with_contacts_path(mut self, path: impl Into<String>) -> Self {
        self.contacts_path = path.into();
        self
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    fn base_api(base_url: &str) -> Result<Url, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let api = if trimmed.ends_with("/api") { trimmed.to_string() } else { format!("{}/api", trimmed) };
        Ok(Url::parse(&format!("{}/", api))?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_api.join(&format!("{}/", path.trim_matches('/')))?)
    }

    fn with_auth(&self, req: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match self.auth.token() {
            Some(t) => Ok(req.bearer_auth(t)),
            None => Err(ApiError::Unauthorized),
        }
    }

    /// Maps non-success responses onto error kinds. Authentication failures
    /// expire the shared session.
    async fn check(&self, resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                self.auth.expire();
                Err(ApiError::Unauthorized)
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(resp.url().path().to_string())),
            StatusCode::BAD_REQUEST => {
                let body = resp.json::<Value>().await.unwrap_or(Value::Null);
                Err(ApiError::Validation(field_errors(&body)))
            }
            other => Err(ApiError::Status(other)),
        }
    }

    /// Exchanges credentials for an access token and stores it in the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let body = serde_json::json!({ "username": username, "password": password });
        let mut last_err: Option<ApiError> = None;
        for path in ["token", "auth/login", "login"] {
            let endpoint = self.endpoint(path)?;
            debug!("login attempt at {}", endpoint);
            let resp = self.http.post(endpoint).json(&body).send().await?;
            if resp.status() == StatusCode::NOT_FOUND {
                last_err = Some(ApiError::NotFound(resp.url().path().to_string()));
                continue;
            }
            if resp.status() == StatusCode::UNAUTHORIZED {
                return Err(ApiError::Unauthorized);
            }
            let json: Value = self.check(resp).await?.json().await?;
            let token = ["access", "token", "accessToken"]
                .iter()
                .find_map(|k| json.get(*k).and_then(|v| v.as_str()))
                .ok_or_else(|| ApiError::Decode("token not found in response".into()))?;
            self.auth.set_token(token);
            return Ok(token.to_string());
        }
        Err(last_err.unwrap_or_else(|| ApiError::Decode("no login endpoint".into())))
    }

    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        let req = self.with_auth(self.http.get(self.endpoint("users/me")?))?;
        let resp = self.check(req.send().await?).await?;
        Ok(resp.json().await?)
    }

    pub async fn contacts_at(&self, path: &str) -> Result<Vec<Contact>, ApiError> {
        let req = self.with_auth(self.http.get(self.endpoint(path)?))?;
        let json: Value = self.check(req.send().await?).await?.json().await?;
        let items = json
            .as_array()
            .or_else(|| json.get("results").and_then(|v| v.as_array()))
            .or_else(|| json.get("data").and_then(|v| v.as_array()))
            .ok_or_else(|| ApiError::Decode("contact list is not an array".into()))?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match Contact::from_value(item) {
                Some(c) => out.push(c),
                None => warn!("skipping directory entry without id: {}", item),
            }
        }
        Ok(out)
    }

    fn thread_endpoint(&self, contact_id: UserId) -> Result<Url, ApiError> {
        self.endpoint(&format!("messages/{}", contact_id))
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn contacts(&self) -> Result<Vec<Contact>, ApiError> {
        self.contacts_at(&self.contacts_path).await
    }

    async fn messages(&self, contact_id: UserId) -> Result<Vec<Message>, ApiError> {
        let req = self.with_auth(self.http.get(self.thread_endpoint(contact_id)?))?;
        let resp = self.check(req.send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn send_message(&self, contact_id: UserId, content: &str) -> Result<Message, ApiError> {
        let req = self
            .with_auth(self.http.post(self.thread_endpoint(contact_id)?))?
            .json(&NewMessage { content });
        let resp = self.check(req.send().await?).await?;
        Ok(resp.json().await?)
    }
}

fn field_errors(body: &Value) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    if let Some(obj) = body.as_object() {
        for (field, v) in obj {
            let msgs = match v {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items.iter().filter_map(|i| i.as_str().map(str::to_string)).collect(),
                other => vec![other.to_string()],
            };
            out.insert(field.clone(), msgs);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_api_appends_api_once() {
        assert_eq!(ApiClient::base_api("https://clinic.test").unwrap().as_str(), "https://clinic.test/api/");
        assert_eq!(ApiClient::base_api("https://clinic.test/api/").unwrap().as_str(), "https://clinic.test/api/");
    }

    #[test]
    fn thread_endpoint_has_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000", AuthSession::default()).unwrap();
        assert_eq!(client.thread_endpoint(12).unwrap().as_str(), "http://localhost:8000/api/messages/12/");
    }

    #[test]
    fn field_errors_accept_strings_and_lists() {
        let errs = field_errors(&json!({"content": ["blank"], "error": "User not found."}));
        assert_eq!(errs["content"], vec!["blank".to_string()]);
        assert_eq!(errs["error"], vec!["User not found.".to_string()]);
    }

    #[tokio::test]
    async fn requests_without_token_fail_fast() {
        let client = ApiClient::new("http://localhost:1", AuthSession::default()).unwrap();
        assert!(client.messages(1).await.unwrap_err().is_auth());
    }
}
