// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reqwest-based `ChatBackend` implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use charla_config::BackendConfig;
use charla_core::error::CharlaError;
use charla_core::traits::backend::ChatBackend;
use charla_core::types::{
    ContactPage, ConversationId, ConversationMode, ConversationSnapshot, MessageId,
};

/// HTTP client for the console's REST backend.
///
/// The bearer credential rides on every request as a default header.
/// Each endpoint URL comes from `[backend]` config; calling an operation
/// whose URL is unset is a configuration error, not a network one.
pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, CharlaError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| CharlaError::Config("backend.access_token is not a valid header value".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| CharlaError::Backend {
                message: "failed to build HTTP client".into(),
                source: Some(Box::new(e)),
            })?;

        Ok(Self { client, config })
    }

    fn endpoint<'a>(&self, url: &'a Option<String>, key: &str) -> Result<&'a str, CharlaError> {
        url.as_deref()
            .ok_or_else(|| CharlaError::Config(format!("backend.{key} is not configured")))
    }

    async fn send_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<Response, CharlaError> {
        debug!(url, "backend request");
        self.client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CharlaError::Backend {
                message: format!("request to {url} failed"),
                source: Some(Box::new(e)),
            })
    }

    /// Map the response status, then decode the body.
    ///
    /// 401 is the structural expired-credential signal; any other
    /// non-2xx status is a transient backend error carrying the body
    /// for diagnostics.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CharlaError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(CharlaError::ExpiredToken);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CharlaError::Backend {
                message: format!("HTTP {status}: {}", truncate(&body, 200)),
                source: None,
            });
        }
        response.json::<T>().await.map_err(|e| CharlaError::Backend {
            message: "malformed response body".into(),
            source: Some(Box::new(e)),
        })
    }

    /// Like `decode`, for endpoints whose ack body is opaque.
    async fn check_ack(response: Response) -> Result<(), CharlaError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(CharlaError::ExpiredToken);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CharlaError::Backend {
                message: format!("HTTP {status}: {}", truncate(&body, 200)),
                source: None,
            });
        }
        Ok(())
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn fetch_recent_contacts(&self) -> Result<ContactPage, CharlaError> {
        let url = self.endpoint(&self.config.recent_contacts_url, "recent_contacts_url")?;
        debug!(url, "backend request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CharlaError::Backend {
                message: format!("request to {url} failed"),
                source: Some(Box::new(e)),
            })?;
        Self::decode(response).await
    }

    async fn fetch_next_contacts(
        &self,
        known: &[ConversationId],
    ) -> Result<ContactPage, CharlaError> {
        let url = self.endpoint(&self.config.next_contacts_url, "next_contacts_url")?;
        let ids: Vec<&str> = known.iter().map(|id| id.0.as_str()).collect();
        let response = self.send_json(url, json!({ "conversation_ids": ids })).await?;
        Self::decode(response).await
    }

    async fn fetch_conversation(
        &self,
        conversation: &ConversationId,
    ) -> Result<ConversationSnapshot, CharlaError> {
        let url = self.endpoint(&self.config.conversation_url, "conversation_url")?;
        let response = self.send_json(url, json!({ "wa_id": conversation.0 })).await?;
        Self::decode(response).await
    }

    async fn fetch_recent_messages(
        &self,
        conversation: &ConversationId,
        last_message: Option<&MessageId>,
    ) -> Result<ConversationSnapshot, CharlaError> {
        let url = self.endpoint(&self.config.recent_messages_url, "recent_messages_url")?;
        let body = match last_message {
            Some(last) => json!({ "wa_id": conversation.0, "last_message_id": last.0 }),
            None => json!({ "wa_id": conversation.0 }),
        };
        let response = self.send_json(url, body).await?;
        Self::decode(response).await
    }

    async fn set_conversation_mode(
        &self,
        conversation: &ConversationId,
        mode: ConversationMode,
    ) -> Result<(), CharlaError> {
        let url = self.endpoint(&self.config.conversation_mode_url, "conversation_mode_url")?;
        let response = self
            .send_json(url, json!({ "wa_id": conversation.0, "mode": mode.to_string() }))
            .await?;
        Self::check_ack(response).await
    }

    async fn send_agent_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), CharlaError> {
        let url = self.endpoint(&self.config.agent_message_url, "agent_message_url")?;
        let response = self
            .send_json(url, json!({ "wa_id": conversation.0, "message": text }))
            .await?;
        Self::check_ack(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_endpoint_is_a_config_error() {
        let backend = HttpBackend::new(BackendConfig::default()).unwrap();
        let err = backend
            .endpoint(&backend.config.conversation_url, "conversation_url")
            .unwrap_err();
        assert!(matches!(err, CharlaError::Config(_)));
        assert!(err.to_string().contains("conversation_url"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("señal de error", 6), "señal ");
        assert_eq!(truncate("corto", 200), "corto");
    }
}
