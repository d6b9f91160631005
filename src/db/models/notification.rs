//! Notification feed models.

use serde::{Deserialize, Serialize};

/// Notification event types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    #[serde(alias = "booking")]
    BookingCreated,
    #[serde(alias = "completion")]
    Completed,
    #[serde(alias = "cancellation")]
    Cancelled,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BookingCreated => write!(f, "booking-created"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    /// RFC 3339
    pub timestamp: String,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            read: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_notification_is_unread() {
        let n = Notification::new(NotificationKind::Completed, "Service marked as completed");
        assert!(!n.read);
        assert!(!n.id.is_empty());
        assert!(chrono::DateTime::parse_from_rfc3339(&n.timestamp).is_ok());
    }

    #[test]
    fn test_legacy_kind_names() {
        let raw = r#"{"id":"1","type":"cancellation","message":"m","timestamp":"2025-01-01T00:00:00Z","read":true}"#;
        let n: Notification = serde_json::from_str(raw).unwrap();
        assert_eq!(n.kind, NotificationKind::Cancelled);

        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "cancelled");
    }
}
