// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract tests for the HTTP backend against a wiremock server.

use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use charla_backend::HttpBackend;
use charla_config::BackendConfig;
use charla_core::error::CharlaError;
use charla_core::traits::backend::ChatBackend;
use charla_core::types::{ConversationId, ConversationMode, MessageId};

fn config_for(server: &MockServer) -> BackendConfig {
    BackendConfig {
        recent_contacts_url: Some(format!("{}/leads/recent", server.uri())),
        next_contacts_url: Some(format!("{}/leads/next", server.uri())),
        conversation_url: Some(format!("{}/conversation", server.uri())),
        recent_messages_url: Some(format!("{}/messages/recent", server.uri())),
        conversation_mode_url: Some(format!("{}/conversation/mode", server.uri())),
        agent_message_url: Some(format!("{}/messages/agent", server.uri())),
        access_token: Some("tok-123".to_string()),
        request_timeout_secs: 5,
    }
}

fn conv(id: &str) -> ConversationId {
    ConversationId(id.to_string())
}

#[tokio::test]
async fn recent_contacts_parses_the_page_and_sends_the_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads/recent"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "conversations": [
                {
                    "id": "5215550001",
                    "state": { "nombre": "Ana" },
                    "conversation_mode": "agent",
                    "updated_at": "2024-06-01T10:00:00Z"
                }
            ],
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(config_for(&server)).unwrap();
    let page = backend.fetch_recent_contacts().await.unwrap();

    assert!(page.has_more);
    assert_eq!(page.conversations.len(), 1);
    assert_eq!(page.conversations[0].id, "5215550001");
    assert_eq!(page.conversations[0].state.nombre.as_deref(), Some("Ana"));
}

#[tokio::test]
async fn unauthorized_maps_to_the_expired_token_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/recent"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(config_for(&server)).unwrap();
    let err = backend
        .fetch_recent_messages(&conv("5215550001"), None)
        .await
        .unwrap_err();

    assert!(err.is_expired_token());
    assert_eq!(err.to_string(), "Token expirado");
}

#[tokio::test]
async fn server_errors_are_transient_backend_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversation"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let backend = HttpBackend::new(config_for(&server)).unwrap();
    let err = backend.fetch_conversation(&conv("5215550001")).await.unwrap_err();

    match err {
        CharlaError::Backend { message, .. } => {
            assert!(message.contains("503"));
            assert!(message.contains("upstream down"));
        }
        other => panic!("expected a backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn delta_fetch_sends_the_cursor_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/recent"))
        .and(body_json(serde_json::json!({
            "wa_id": "5215550001",
            "last_message_id": "wamid.007"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messages": [
                { "id": "wamid.008", "text": "sigo aquí", "sender": "lead",
                  "timestamp": "2024-06-01T10:05:00Z" }
            ],
            "conversation_mode": "bot"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(config_for(&server)).unwrap();
    let snapshot = backend
        .fetch_recent_messages(&conv("5215550001"), Some(&MessageId("wamid.007".into())))
        .await
        .unwrap();

    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].id, "wamid.008");
    assert_eq!(snapshot.conversation_mode.as_deref(), Some("bot"));
}

#[tokio::test]
async fn mode_change_posts_the_target_and_accepts_an_opaque_ack() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversation/mode"))
        .and(body_json(serde_json::json!({
            "wa_id": "5215550001",
            "mode": "agent"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true, "anything": "goes"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(config_for(&server)).unwrap();
    backend
        .set_conversation_mode(&conv("5215550001"), ConversationMode::Agent)
        .await
        .unwrap();
}

#[tokio::test]
async fn agent_message_posts_the_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/agent"))
        .and(body_json(serde_json::json!({
            "wa_id": "5215550001",
            "message": "con gusto"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(config_for(&server)).unwrap();
    backend
        .send_agent_message(&conv("5215550001"), "con gusto")
        .await
        .unwrap();
}

#[tokio::test]
async fn unset_endpoint_fails_without_a_request() {
    let backend = HttpBackend::new(BackendConfig::default()).unwrap();
    let err = backend.fetch_recent_contacts().await.unwrap_err();
    assert!(matches!(err, CharlaError::Config(_)));
}
