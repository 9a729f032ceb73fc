//! Typed decoding of WhatsApp webhook deliveries.
//!
//! The Graph API nests everything under `entry[].changes[].value`. Only the first entry and the
//! first change are inspected, and a `messages` key wins over `statuses`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A user message extracted from a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// WhatsApp id (phone number) of the sender.
    pub sender_id: String,
    /// Text body of the message.
    pub body: String,
}

/// Outcome of decoding one webhook POST body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A user sent a text message.
    Message(InboundMessage),
    /// A delivery or read receipt.
    Status,
    /// Anything else, including bodies that are not JSON.
    Malformed,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    value: Option<ChangeValue>,
}

#[derive(Debug, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    messages: Option<Vec<RawMessage>>,
    /// `Some` whenever the key is present, even when its value is `null`.
    #[serde(default, deserialize_with = "present")]
    statuses: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    text: Option<RawText>,
}

#[derive(Debug, Deserialize)]
struct RawText {
    #[serde(default)]
    body: Option<String>,
}

impl RawMessage {
    fn into_inbound(self) -> Option<InboundMessage> {
        let sender_id = self.from.filter(|from| !from.trim().is_empty())?;
        let body = self
            .text
            .and_then(|text| text.body)
            .filter(|body| !body.trim().is_empty())?;
        Some(InboundMessage { sender_id, body })
    }
}

impl WebhookEvent {
    /// Decode a raw POST body into an event.
    pub fn decode(body: &[u8]) -> Self {
        let Ok(payload) = serde_json::from_slice::<WebhookPayload>(body) else {
            return Self::Malformed;
        };
        let Some(value) = payload
            .entry
            .into_iter()
            .next()
            .and_then(|entry| entry.changes.into_iter().next())
            .and_then(|change| change.value)
        else {
            return Self::Malformed;
        };

        if let Some(messages) = value.messages {
            return messages
                .into_iter()
                .next()
                .and_then(RawMessage::into_inbound)
                .map_or(Self::Malformed, Self::Message);
        }
        if value.statuses.is_some() {
            return Self::Status;
        }
        Self::Malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> WebhookEvent {
        WebhookEvent::decode(value.to_string().as_bytes())
    }

    #[test]
    fn decodes_text_message() {
        let event = decode(json!({
            "object": "whatsapp_business_account",
            "entry": [{ "id": "1", "changes": [{ "field": "messages", "value": {
                "messaging_product": "whatsapp",
                "contacts": [{ "wa_id": "5511999999999" }],
                "messages": [{
                    "from": "5511999999999",
                    "id": "wamid.X",
                    "type": "text",
                    "text": { "body": "rust vs go" }
                }]
            }}]}]
        }));
        assert_eq!(
            event,
            WebhookEvent::Message(InboundMessage {
                sender_id: "5511999999999".into(),
                body: "rust vs go".into(),
            })
        );
    }

    #[test]
    fn decodes_status_receipt() {
        let event = decode(json!({
            "entry": [{ "changes": [{ "value": {
                "statuses": [{ "id": "wamid.X", "status": "delivered" }]
            }}]}]
        }));
        assert_eq!(event, WebhookEvent::Status);
    }

    #[test]
    fn null_statuses_key_still_counts_as_status() {
        let event = decode(json!({
            "entry": [{ "changes": [{ "value": { "statuses": null } }] }]
        }));
        assert_eq!(event, WebhookEvent::Status);
    }

    #[test]
    fn messages_take_precedence_over_statuses() {
        let event = decode(json!({
            "entry": [{ "changes": [{ "value": {
                "statuses": [{ "status": "read" }],
                "messages": [{ "from": "1", "text": { "body": "hi" } }]
            }}]}]
        }));
        assert!(matches!(event, WebhookEvent::Message(_)));
    }

    #[test]
    fn non_text_message_is_malformed() {
        let event = decode(json!({
            "entry": [{ "changes": [{ "value": {
                "messages": [{ "from": "1", "type": "image", "image": { "id": "m" } }]
            }}]}]
        }));
        assert_eq!(event, WebhookEvent::Malformed);
    }

    #[test]
    fn missing_structure_is_malformed() {
        assert_eq!(decode(json!({})), WebhookEvent::Malformed);
        assert_eq!(decode(json!({ "entry": [] })), WebhookEvent::Malformed);
        assert_eq!(
            decode(json!({ "entry": [{ "changes": [{ "value": {} }] }] })),
            WebhookEvent::Malformed
        );
        assert_eq!(WebhookEvent::decode(b"not json"), WebhookEvent::Malformed);
    }
}
