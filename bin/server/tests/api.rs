//! HTTP tests driving the router with in-memory stores.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use courier_conversation::{Contact, ConversationRelay, MemoryRelayStore, SenderType};
use courier_core::{ConversationId, UserId};
use courier_crypto::{EncryptionCodec, EncryptionKey};
use courier_platform_access::{MemoryUserStore, sign_init_data};
use courier_server::{
    app,
    auth::AppState,
    config::{EncryptionConfig, ServerConfig, SessionConfig, TelegramConfig},
    error::StartupError,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const BOT_TOKEN: &str = "123456:TEST-BOT-TOKEN";
const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
const ADMIN_ID: &str = "900";
const STUDENT_ID: &str = "1001";
const CONTACT_ID: &str = "555";

fn config(key: &str) -> ServerConfig {
    ServerConfig {
        database_url: "postgres://unused".to_string(),
        bind_addr: "127.0.0.1:0".parse().expect("addr"),
        trusted_proxies: String::new(),
        telegram: TelegramConfig {
            bot_token: BOT_TOKEN.to_string(),
            init_data_max_age_seconds: 300,
            admin_ids: ADMIN_ID.to_string(),
        },
        session: SessionConfig {
            secret: "api-test-secret-api-test-secret-api".to_string(),
            ttl_seconds: 3600,
        },
        encryption: EncryptionConfig {
            key: key.to_string(),
        },
    }
}

struct Harness {
    app: Router,
    relay_store: Arc<MemoryRelayStore>,
    relay: ConversationRelay,
}

fn harness() -> Harness {
    let users = Arc::new(MemoryUserStore::new());
    let relay_store = Arc::new(MemoryRelayStore::new());
    let state = AppState::from_config(&config(KEY_HEX), users, relay_store.clone())
        .expect("state builds");

    let key = EncryptionKey::from_hex(KEY_HEX).expect("key");
    let relay = ConversationRelay::new(relay_store.clone(), EncryptionCodec::new(&key).sealer());

    Harness {
        app: app::router(Arc::new(state)),
        relay_store,
        relay,
    }
}

fn launch_data(telegram_id: &str, bot_token: &str) -> String {
    let auth_date = Utc::now().timestamp().to_string();
    let user = format!(r#"{{"id":{telegram_id},"first_name":"Test"}}"#);
    sign_init_data(
        &[("auth_date", auth_date.as_str()), ("user", user.as_str())],
        bot_token.as_bytes(),
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).expect("request")
}

async fn login(app: &Router, telegram_id: &str) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/auth/telegram-webapp",
            &json!({ "initData": launch_data(telegram_id, BOT_TOKEN) }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    format!(
        "Bearer {}",
        body["accessToken"].as_str().expect("access token")
    )
}

/// Registers the student with the relay and stores one encrypted message.
async fn seed_conversation(h: &Harness) -> ConversationId {
    h.relay_store
        .register_user(STUDENT_ID, UserId::new())
        .expect("register");
    let contact = Contact::new(CONTACT_ID);
    let contact_id = contact.id;
    h.relay_store.insert_contact(contact).expect("contact");

    let conversation = h
        .relay
        .get_or_create_conversation(STUDENT_ID, contact_id)
        .await
        .expect("conversation");
    h.relay
        .store_message(
            conversation.id,
            SenderType::Student,
            STUDENT_ID,
            "Hello",
            Some("77".to_string()),
        )
        .await
        .expect("message");
    conversation.id
}

#[tokio::test]
async fn health_is_public() {
    let h = harness();
    let (status, body) = send(&h.app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn login_issues_bearer_token() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        post_json(
            "/auth/telegram-webapp",
            &json!({ "initData": launch_data(STUDENT_ID, BOT_TOKEN) }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["isNewUser"], true);
    assert_eq!(body["user"]["externalId"], STUDENT_ID);
    assert_eq!(body["user"]["role"], "STUDENT");
    assert!(body["accessToken"].as_str().is_some_and(|t| t.split('.').count() == 3));
}

#[tokio::test]
async fn second_login_is_not_new() {
    let h = harness();
    login(&h.app, STUDENT_ID).await;
    let (_, body) = send(
        &h.app,
        post_json(
            "/auth/telegram-webapp",
            &json!({ "initData": launch_data(STUDENT_ID, BOT_TOKEN) }),
        ),
    )
    .await;
    assert_eq!(body["isNewUser"], false);
}

#[tokio::test]
async fn allow_listed_user_logs_in_as_admin() {
    let h = harness();
    let (_, body) = send(
        &h.app,
        post_json(
            "/auth/telegram-webapp",
            &json!({ "initData": launch_data(ADMIN_ID, BOT_TOKEN) }),
        ),
    )
    .await;
    assert_eq!(body["user"]["role"], "ADMIN");
}

#[tokio::test]
async fn forged_launch_data_is_unauthenticated() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        post_json(
            "/auth/telegram-webapp",
            &json!({ "initData": launch_data(STUDENT_ID, "999:OTHER-BOT") }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "unauthenticated" }));
}

#[tokio::test]
async fn missing_or_malformed_body_is_rejected() {
    let h = harness();

    let (status, _) = send(&h.app, post_json("/auth/telegram-webapp", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &h.app,
        post_json("/auth/telegram-webapp", &json!({ "initData": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::post("/auth/telegram-webapp")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, body) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "invalid request" }));
}

#[tokio::test]
async fn me_returns_stored_profile() {
    let h = harness();
    let token = login(&h.app, STUDENT_ID).await;

    let (status, body) = send(&h.app, get("/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["externalId"], STUDENT_ID);
    assert!(body["expiresAt"].is_string());
}

#[tokio::test]
async fn bad_authorization_headers_get_generic_401() {
    let h = harness();
    let headers = [
        None,
        Some("Basic dXNlcjpwYXNz"),
        Some("Bearer"),
        Some("Bearer not-a-token"),
        Some("Bearer aaa.bbb.ccc"),
    ];

    for header in headers {
        let (status, body) = send(&h.app, get("/auth/me", header)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "header {header:?}");
        assert_eq!(body, json!({ "error": "unauthenticated" }));
    }
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let h = harness();
    let student = login(&h.app, STUDENT_ID).await;
    let uri = format!("/admin/contacts/{CONTACT_ID}/conversations");

    let (status, _) = send(&h.app, get(&uri, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&h.app, get(&uri, Some(&student))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "forbidden" }));
}

#[tokio::test]
async fn admin_sees_metadata_without_content() {
    let h = harness();
    let conversation_id = seed_conversation(&h).await;
    let admin = login(&h.app, ADMIN_ID).await;

    let (status, body) = send(
        &h.app,
        get(
            &format!("/admin/contacts/{CONTACT_ID}/conversations"),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let conversations = body["conversations"].as_array().expect("array");
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["id"], conversation_id.to_string());
    assert!(conversations[0]["lastMessageAt"].is_string());

    let (status, body) = send(
        &h.app,
        get(
            &format!("/admin/conversations/{conversation_id}/messages"),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().expect("array");
    assert_eq!(messages.len(), 1);

    let message = messages[0].as_object().expect("object");
    assert_eq!(message["encrypted"], true);
    assert_eq!(message["senderType"], "STUDENT");
    assert_eq!(message["externalMessageRef"], "77");
    for field in ["ciphertext", "iv", "authTag", "content", "plaintext", "text"] {
        assert!(!message.contains_key(field), "leaked field {field}");
    }

    let stored = h
        .relay
        .list_messages(conversation_id)
        .await
        .expect("messages");
    let payload = stored[0].content().expect("encrypted content");
    let rendered = body.to_string();
    assert!(!rendered.contains("Hello"));
    assert!(!rendered.contains(&payload.ciphertext));
    assert!(!rendered.contains(&payload.auth_tag));
}

#[tokio::test]
async fn admin_lookups_map_to_client_errors() {
    let h = harness();
    let admin = login(&h.app, ADMIN_ID).await;

    let (status, _) = send(
        &h.app,
        get("/admin/conversations/not-a-uuid/messages", Some(&admin)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &h.app,
        get(
            &format!("/admin/conversations/{}/messages", ConversationId::new()),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "not found" }));

    let (status, _) = send(
        &h.app,
        get("/admin/contacts/unknown/conversations", Some(&admin)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn startup_requires_encryption_key() {
    let result = AppState::from_config(
        &config(""),
        Arc::new(MemoryUserStore::new()),
        Arc::new(MemoryRelayStore::new()),
    );
    assert!(matches!(result, Err(StartupError::EncryptionKey(_))));
}

#[test]
fn startup_rejects_malformed_trusted_proxy() {
    let mut config = config(KEY_HEX);
    config.trusted_proxies = "10.0.0.1, nonsense".to_string();
    let result = AppState::from_config(
        &config,
        Arc::new(MemoryUserStore::new()),
        Arc::new(MemoryRelayStore::new()),
    );
    assert!(matches!(result, Err(StartupError::Config { .. })));
}

#[test]
fn startup_rejects_short_session_secret() {
    let mut config = config(KEY_HEX);
    config.session.secret = "short".to_string();
    let result = AppState::from_config(
        &config,
        Arc::new(MemoryUserStore::new()),
        Arc::new(MemoryRelayStore::new()),
    );
    assert!(matches!(result, Err(StartupError::SessionSecret(_))));
}
