use std::time::Duration;

use clinic_chat::api::models::Role;
use clinic_chat::api::{ApiClient, ApiError, ChatBackend};
use clinic_chat::app::AppState;
use clinic_chat::auth::AuthSession;
use clinic_chat::chat::{Applied, ChatSession};
use clinic_chat::ui::login;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), AuthSession::new(Some("tok".into()))).unwrap()
}

fn thread_json() -> serde_json::Value {
    json!([
        {"id": 1, "sender": 3, "sender_name": "Alex Rivera", "receiver": 5, "receiver_name": "Joe Park",
         "content": "How have things been?", "timestamp": "2026-10-16T10:30:00Z", "is_read": true},
        {"id": 2, "sender": 5, "sender_name": "Joe Park", "receiver": 3, "receiver_name": "Alex Rivera",
         "content": "Still anxious in the evenings.", "timestamp": "2026-10-16T10:32:00.481516Z", "is_read": false}
    ])
}

#[tokio::test]
async fn login_stores_token_and_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .and(body_json(json!({"username": "jpark", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "abc", "refresh": "def"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5, "username": "jpark", "email": "j@clinic.test",
            "first_name": "Joe", "last_name": "Park", "role": "patient",
            "is_staff": false, "is_superuser": false
        })))
        .mount(&server)
        .await;

    let mut state = AppState::default();
    let user = login::login(&mut state, &server.uri(), "jpark", "secret").await.unwrap();
    assert_eq!(user.id, 5);
    assert_eq!(user.role, Role::Patient);
    assert_eq!(user.display_name(), "Joe Park");
    assert_eq!(state.token.as_deref(), Some("abc"));
    assert_eq!(state.contacts_path().as_deref(), Some("patient/doctors"));
    assert!(state.is_logged_in());
}

#[tokio::test]
async fn login_falls_back_to_alternate_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "xyz"})))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), AuthSession::default()).unwrap();
    assert_eq!(client.login("a", "b").await.unwrap(), "xyz");
    assert_eq!(client.auth().token().as_deref(), Some("xyz"));
}

#[tokio::test]
async fn rejected_credentials_leave_state_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "No active account"})))
        .mount(&server)
        .await;

    let mut state = AppState { base_url: "https://old.test".into(), token: Some("old".into()), ..AppState::default() };
    let err = login::login(&mut state, &server.uri(), "a", "wrong").await.unwrap_err();
    assert!(err.is_auth());
    assert_eq!(state.token.as_deref(), Some("old"));
    assert_eq!(state.base_url, "https://old.test");
}

#[tokio::test]
async fn messages_are_fetched_with_bearer_in_server_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/messages/3/"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thread_json()))
        .mount(&server)
        .await;

    let messages = client(&server).messages(3).await.unwrap();
    let ids: Vec<_> = messages.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(messages[1].sender_name.as_deref(), Some("Joe Park"));
}

#[tokio::test]
async fn send_posts_content_and_returns_created_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/messages/3/"))
        .and(body_json(json!({"content": "See you tomorrow"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 41, "sender": 5, "receiver": 3, "content": "See you tomorrow",
            "timestamp": "2026-10-16T11:00:00Z", "is_read": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let m = client(&server).send_message(3, "See you tomorrow").await.unwrap();
    assert_eq!(m.id, 41);
    assert_eq!(m.receiver, Some(3));
}

#[tokio::test]
async fn unauthorized_response_expires_shared_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/messages/3/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client(&server);
    let auth = client.auth().clone();
    let err = client.messages(3).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(!auth.is_authenticated());
    // Later requests fail without reaching the server.
    assert!(client.messages(3).await.unwrap_err().is_auth());
}

#[tokio::test]
async fn bad_request_surfaces_field_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/messages/3/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"content": ["This field may not be blank."]})))
        .mount(&server)
        .await;

    match client(&server).send_message(3, "x").await.unwrap_err() {
        ApiError::Validation(fields) => {
            assert_eq!(fields["content"], vec!["This field may not be blank.".to_string()]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_receiver_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/messages/99/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "User not found."})))
        .mount(&server)
        .await;

    let err = client(&server).send_message(99, "hello").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn server_errors_are_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/messages/3/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).messages(3).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn directory_accepts_profile_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/doctor/patients/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": 1, "user": {"id": 21, "username": "jlee", "first_name": "Jamie", "last_name": "Lee"},
                 "date_of_birth": "1994-02-01"},
                {"id": 2, "user": {"id": 22, "username": "mbrown", "first_name": "", "last_name": ""}},
                {"medical_history": "no id here"}
            ]
        })))
        .mount(&server)
        .await;

    let client = client(&server).with_contacts_path(Role::Doctor.contacts_path());
    let contacts = client.contacts().await.unwrap();
    let names: Vec<_> = contacts.iter().map(|c| (c.id, c.name.as_str())).collect();
    assert_eq!(names, vec![(21, "Jamie Lee"), (22, "mbrown")]);
}

#[tokio::test]
async fn session_polls_real_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patient/doctors/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "name": "Dr. Alex Rivera", "preview": "Okay, I see.", "unread": 0},
            {"id": 4, "name": "Dr. Maya Chen", "preview": "Sent an attachment", "unread": 2}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/messages/3/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thread_json()))
        .mount(&server)
        .await;

    let (session, mut events) = ChatSession::new(Arc::new(client(&server)), Duration::from_millis(50));
    let mut session = session.with_user(5);
    session.load_contacts().await.unwrap();
    assert_eq!(session.active_contact().map(|c| c.name.as_str()), Some("Dr. Alex Rivera"));

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap();
    assert_eq!(session.apply(event), Applied::Updated);
    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.messages()[0].content, "How have things been?");
}
