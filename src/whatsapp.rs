//! Outbound text messages through the WhatsApp Cloud (Graph) API.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while delivering a message.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Graph API answered with anything other than 200.
    #[error("Unexpected WhatsApp response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the Graph API.
        status: StatusCode,
        /// Response body, usually a Graph error object.
        body: String,
    },
}

/// Sends plain-text replies to a chat user.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Deliver `body` to `recipient_id`. Returns `false` on any failure; there is no retry.
    async fn send_message(&self, recipient_id: &str, body: &str) -> bool;
}

#[derive(Serialize)]
struct TextMessage<'a> {
    messaging_product: &'static str,
    to: &'a str,
    text: TextBody<'a>,
}

#[derive(Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

/// [`MessagingGateway`] backed by the WhatsApp Cloud API.
pub struct WhatsAppClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl WhatsAppClient {
    /// Construct a client from the server configuration.
    pub fn new(config: &Config) -> Result<Self, MessagingError> {
        Self::with_endpoint(
            &config.whatsapp_api_url,
            &config.whatsapp_phone_number_id,
            config.whatsapp_api_token.clone(),
        )
    }

    /// Construct a client for an explicit Graph API base URL and phone-number id.
    pub fn with_endpoint(
        api_url: &str,
        phone_number_id: &str,
        token: String,
    ) -> Result<Self, MessagingError> {
        let http = Client::builder()
            .user_agent("threadbrief/whatsapp")
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let endpoint = format!(
            "{}/{}/messages",
            api_url.trim_end_matches('/'),
            phone_number_id
        );
        tracing::debug!(endpoint = %endpoint, "Initialized WhatsApp HTTP client");
        Ok(Self {
            http,
            endpoint,
            token,
        })
    }

    async fn post_message(&self, recipient_id: &str, body: &str) -> Result<(), MessagingError> {
        let payload = TextMessage {
            messaging_product: "whatsapp",
            to: recipient_id,
            text: TextBody { body },
        };
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(MessagingError::UnexpectedStatus { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for WhatsAppClient {
    async fn send_message(&self, recipient_id: &str, body: &str) -> bool {
        match self.post_message(recipient_id, body).await {
            Ok(()) => {
                tracing::info!(recipient = recipient_id, "Message sent");
                true
            }
            Err(error) => {
                tracing::warn!(recipient = recipient_id, %error, "Failed to send message");
                false
            }
        }
    }
}
