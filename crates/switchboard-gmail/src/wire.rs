//! Serde types mirroring the Gmail REST wire format.
//!
//! These structs deserialize provider responses verbatim; conversion
//! into the domain model lives in [`crate::client`]. Every field the
//! API may omit is an `Option` so that partial `format=metadata`
//! responses and full `format=full` responses share one set of types.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// One page of `users.threads.list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadList {
    /// Thread stubs on this page. Absent when the mailbox query
    /// matched nothing.
    pub threads: Option<Vec<ThreadStub>>,
    /// Opaque cursor for the next page.
    pub next_page_token: Option<String>,
    /// Provider's estimate of the total result count.
    pub result_size_estimate: Option<u64>,
}

/// Thread reference as returned by a list call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadStub {
    /// Provider thread id.
    pub id: String,
    /// Short preview text.
    pub snippet: Option<String>,
    /// Mailbox history cursor at the time of the listing.
    pub history_id: Option<String>,
}

/// A thread from `users.threads.get`, metadata or full format.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Provider thread id.
    pub id: String,
    /// Messages in delivery order, oldest first.
    pub messages: Option<Vec<Message>>,
}

/// One message inside a thread.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Provider message id.
    pub id: String,
    /// Owning thread id.
    pub thread_id: Option<String>,
    /// Label ids attached to the message (`UNREAD`, `INBOX`, ...).
    pub label_ids: Option<Vec<String>>,
    /// Short preview text.
    pub snippet: Option<String>,
    /// Delivery time as stringified epoch milliseconds.
    pub internal_date: Option<String>,
    /// MIME tree root. Absent in `format=minimal` responses.
    pub payload: Option<MessagePart>,
}

impl Message {
    /// Case-insensitive lookup of a payload header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload.as_ref()?.header(name)
    }

    /// Message timestamp.
    ///
    /// Prefers the RFC 2822 `Date` header, falls back to the
    /// provider's `internalDate` epoch milliseconds, and finally to
    /// the current time when neither parses.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        if let Some(value) = self.header("Date")
            && let Ok(parsed) = DateTime::parse_from_rfc2822(value)
        {
            return parsed.with_timezone(&Utc);
        }
        if let Some(millis) = self.internal_date.as_deref().and_then(|raw| raw.parse::<i64>().ok())
            && let Some(parsed) = Utc.timestamp_millis_opt(millis).single()
        {
            return parsed;
        }
        Utc::now()
    }
}

/// One node of a message's MIME tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// MIME type such as `text/html` or `multipart/alternative`.
    pub mime_type: Option<String>,
    /// Attachment filename. Empty for body parts.
    pub filename: Option<String>,
    /// RFC 822 headers for this part.
    pub headers: Option<Vec<Header>>,
    /// Inline body payload.
    pub body: Option<PartBody>,
    /// Child parts for `multipart/*` nodes.
    pub parts: Option<Vec<MessagePart>>,
}

impl MessagePart {
    /// Case-insensitive lookup of a header on this part.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }
}

/// A single RFC 822 header.
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    /// Header name as sent, original casing.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Body payload of a MIME part.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    /// Payload size in bytes.
    pub size: Option<u64>,
    /// Base64url body data. Absent when the payload is an attachment
    /// fetched separately.
    pub data: Option<String>,
    /// Id for `users.messages.attachments.get`.
    pub attachment_id: Option<String>,
}

/// Response of `users.messages.attachments.get`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentBody {
    /// Payload size in bytes.
    pub size: Option<u64>,
    /// Base64url payload.
    pub data: Option<String>,
}

/// Response of `users.getProfile`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Address of the authenticated mailbox.
    pub email_address: String,
    /// Total message count.
    pub messages_total: Option<u64>,
    /// Total thread count.
    pub threads_total: Option<u64>,
}
