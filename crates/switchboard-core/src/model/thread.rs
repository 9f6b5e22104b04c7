//! Thread and message data models.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EmailAddress;

/// A thread as returned by the provider's list call: just enough for
/// an id-ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    /// Provider thread id.
    pub id: String,
    /// Short preview text.
    pub snippet: String,
}

/// Thread metadata for the list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMetadata {
    /// Provider thread id.
    pub id: String,
    /// Subject of the first message.
    pub subject: String,
    /// Parsed sender of the most recent message.
    pub from: EmailAddress,
    /// Raw recipient header string.
    pub to: String,
    /// Date of the most recent message.
    pub date: DateTime<Utc>,
    /// Short preview text.
    pub snippet: String,
    /// Union of label tags across the thread.
    pub labels: HashSet<String>,
    /// Number of messages in the thread.
    pub message_count: u32,
}

impl ThreadMetadata {
    /// Whether any message in the thread is still unread.
    #[must_use]
    pub fn is_unread(&self) -> bool {
        self.labels.contains("UNREAD")
    }
}

/// A fully fetched thread with message bodies and attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadDetail {
    /// Provider thread id.
    pub id: String,
    /// Subject taken from the first message.
    pub subject: String,
    /// Union of label tags across all messages.
    pub labels: HashSet<String>,
    /// Messages oldest first, matching provider order.
    pub messages: Vec<MessageView>,
}

/// A single message within a thread detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    /// Provider message id.
    pub id: String,
    /// Parsed sender.
    pub from: EmailAddress,
    /// Raw recipient header string.
    pub to: String,
    /// Message subject.
    pub subject: String,
    /// Message date.
    pub date: DateTime<Utc>,
    /// Short preview text.
    pub snippet: String,
    /// Extracted body text.
    pub body: String,
    /// Format of the extracted body.
    pub body_format: BodyFormat,
    /// Label tags on this message.
    pub labels: HashSet<String>,
    /// Real attachments (not inline images).
    pub attachments: Vec<Attachment>,
}

/// Format tag for an extracted message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    /// Plain text, returned verbatim.
    #[default]
    Plain,
    /// Sanitized HTML.
    Html,
}

impl BodyFormat {
    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "html" => Self::Html,
            _ => Self::Plain,
        }
    }

    /// String representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Html => "html",
        }
    }
}

/// Descriptor for a downloadable attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original filename.
    pub filename: String,
    /// MIME type of the part.
    pub mime_type: String,
    /// Size in bytes as reported by the provider.
    pub size: u64,
    /// Opaque id used to fetch the attachment data.
    pub attachment_id: String,
    /// Id of the message that carries the attachment.
    pub message_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_format_roundtrip() {
        for format in [BodyFormat::Plain, BodyFormat::Html] {
            assert_eq!(BodyFormat::parse(format.as_str()), format);
        }
    }

    #[test]
    fn test_body_format_parse_unknown_is_plain() {
        assert_eq!(BodyFormat::parse("rich"), BodyFormat::Plain);
    }

    #[test]
    fn test_is_unread_follows_label() {
        let mut metadata = ThreadMetadata {
            id: "t1".to_string(),
            subject: "Subject".to_string(),
            from: EmailAddress::parse("a@example.com"),
            to: "me@example.com".to_string(),
            date: Utc::now(),
            snippet: String::new(),
            labels: HashSet::from(["INBOX".to_string(), "UNREAD".to_string()]),
            message_count: 1,
        };
        assert!(metadata.is_unread());
        metadata.labels.remove("UNREAD");
        assert!(!metadata.is_unread());
    }
}
