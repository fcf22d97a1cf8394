use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::payload::ImagePayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// What a turn entry carries: the submitted report image, the analysis text,
/// or the follow-up recommendations text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    ReportImage,
    Analysis,
    Recommendations,
}

/// Reference to an image blob stored outside the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub file_name: String,
    pub mime_type: String,
    pub byte_len: usize,
}

/// One entry of a chat turn, in display order. The ordered sequence is
/// exposed to the persistence collaborator at end of turn; retention policy
/// lives there, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnEntry {
    pub role: Role,
    pub kind: TurnKind,
    pub created: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

impl TurnEntry {
    /// The user's submitted report image.
    pub fn user_image(payload: &ImagePayload) -> Self {
        TurnEntry {
            role: Role::User,
            kind: TurnKind::ReportImage,
            created: Utc::now().timestamp(),
            text: None,
            image: Some(ImageRef {
                file_name: payload.file_name.clone(),
                mime_type: payload.mime_type.clone(),
                byte_len: payload.byte_len(),
            }),
        }
    }

    pub fn analysis<S: Into<String>>(text: S) -> Self {
        TurnEntry {
            role: Role::Assistant,
            kind: TurnKind::Analysis,
            created: Utc::now().timestamp(),
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn recommendations<S: Into<String>>(text: S) -> Self {
        TurnEntry {
            role: Role::Assistant,
            kind: TurnKind::Recommendations,
            created: Utc::now().timestamp(),
            text: Some(text.into()),
            image: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_entry_serialization_round_trip() {
        let payload = ImagePayload::new(vec![1, 2, 3], "scan.jpg", "image/jpeg");
        let entry = TurnEntry::user_image(&payload);
        let json = serde_json::to_string(&entry).unwrap();
        let back: TurnEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
        assert!(json.contains("\"report_image\""));
        assert!(!json.contains("\"text\""));
    }

    #[test]
    fn test_assistant_entries_carry_text() {
        let entry = TurnEntry::analysis("**Normal**");
        assert_eq!(entry.role, Role::Assistant);
        assert_eq!(entry.kind, TurnKind::Analysis);
        assert_eq!(entry.text.as_deref(), Some("**Normal**"));
        assert!(entry.image.is_none());
    }
}
