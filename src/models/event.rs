//! Change events and push gateway wire formats.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Catalog, SectionRef};

/// Topic prefix required by the push gateway.
pub const TOPIC_PREFIX: &str = "/topics/";

/// One decoded change notification.
///
/// The `university` payload holds exactly the changed path down to a
/// single section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(default)]
    pub status: String,

    /// Routing topic of the changed section
    #[serde(rename = "payload", alias = "topic_name")]
    pub topic: String,

    #[serde(default)]
    pub university: Catalog,
}

impl ChangeEvent {
    /// Decode an event from a raw feed payload.
    pub fn decode(raw: &str) -> Result<Self> {
        let event: Self =
            serde_json::from_str(raw).map_err(|e| AppError::decode("change event", e))?;
        if event.topic.trim().is_empty() {
            return Err(AppError::decode("change event", "empty topic"));
        }
        Ok(event)
    }

    /// The first section path carried by the payload.
    pub fn section(&self) -> Option<SectionRef<'_>> {
        let subject = self.university.subjects.first()?;
        let course = subject.courses.first()?;
        let section = course.sections.first()?;
        Some(SectionRef {
            subject,
            course,
            section,
        })
    }
}

/// Outbound message body for the push gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    pub data: PushData,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushData {
    /// Serialized catalog payload
    pub message: String,
}

impl PushMessage {
    /// Build the message for an event, addressed to its topic.
    pub fn for_event(event: &ChangeEvent, dry_run: bool) -> Result<Self> {
        Ok(Self {
            to: format!("{TOPIC_PREFIX}{}", event.topic),
            data: PushData {
                message: serde_json::to_string(&event.university)?,
            },
            dry_run,
        })
    }

    /// Topic without the gateway prefix.
    pub fn topic(&self) -> &str {
        self.to.strip_prefix(TOPIC_PREFIX).unwrap_or(&self.to)
    }
}

/// Gateway-assigned message identifier, numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(i64),
    Text(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Number(n) => write!(f, "{n}"),
            MessageId::Text(s) => f.write_str(s),
        }
    }
}

/// Decoded gateway response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    #[serde(default)]
    pub message_id: Option<MessageId>,

    #[serde(default)]
    pub error: Option<String>,
}

impl GatewayResponse {
    /// Application-level error carried by a well-formed response.
    pub fn application_error(&self) -> Option<&str> {
        self.error.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}
