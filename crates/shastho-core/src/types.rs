use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection status of the live companion session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Patient details collected during onboarding.
///
/// Age stays free text; the classification prompt interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub symptoms: String,
}

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Model,
}

/// An inline base64 image attached to a chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

/// A single turn in a consultation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<InlineImage>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, image: Option<InlineImage>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::User,
            text: text.into(),
            image,
            timestamp: Utc::now(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::Model,
            text: text.into(),
            image: None,
            timestamp: Utc::now(),
        }
    }
}

/// Structured consultation report extracted from a chat transcript.
///
/// All fields are English for export formatting regardless of the chat
/// language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalReport {
    pub diagnosis: String,
    pub summary: String,
    pub advice: Vec<String>,
    pub medications: Vec<String>,
    pub tests: Vec<String>,
}

impl MedicalReport {
    /// Placeholder returned when report generation fails; the export flow
    /// must always have something to render.
    pub fn fallback() -> Self {
        Self {
            diagnosis: "Unknown".to_string(),
            summary: "Report generation failed.".to_string(),
            advice: Vec::new(),
            medications: Vec::new(),
            tests: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_serde() {
        let json = serde_json::to_string(&ConnectionState::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");
        let back: ConnectionState = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(back, ConnectionState::Error);
    }

    #[test]
    fn test_chat_message_constructors() {
        let user = ChatMessage::user("hello", None);
        assert_eq!(user.role, ChatRole::User);
        assert!(user.image.is_none());
        assert!(!user.id.is_empty());

        let model = ChatMessage::model("reply");
        assert_eq!(model.role, ChatRole::Model);
        assert_ne!(user.id, model.id);
    }

    #[test]
    fn test_report_fallback_shape() {
        let report = MedicalReport::fallback();
        assert_eq!(report.diagnosis, "Unknown");
        assert_eq!(report.summary, "Report generation failed.");
        assert!(report.advice.is_empty());
        assert!(report.medications.is_empty());
        assert!(report.tests.is_empty());
    }
}
