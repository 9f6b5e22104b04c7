//! Gmail REST client.
//!
//! One [`GmailClient`] instance serves every mailbox operation: paged
//! thread listing, batched metadata hydration, full thread detail with
//! decoded bodies and attachments, read-state and trash mutations, and
//! panel count estimates. Calls take the bearer token per invocation
//! so a single client can serve many sessions.

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use switchboard_core::{EmailAddress, MessageView, ThreadDetail, ThreadMetadata, ThreadSummary};

use crate::batch::{
    BatchBody, BatchRequest, MAX_BATCH_REQUESTS, boundary_from_content_type, decode_json_segments,
    decode_status_segments, encode_batch,
};
use crate::error::{Error, Result};
use crate::mime::{ExtractedBody, collect_attachments, extract_body};
use crate::wire;

/// Production REST base.
const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Production batch endpoint.
const BATCH_BASE: &str = "https://www.googleapis.com/batch/gmail/v1";

/// Per-request deadline.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Headers requested in metadata-format thread fetches.
const METADATA_HEADERS: [&str; 4] = ["Subject", "From", "To", "Date"];

/// Cap on response bodies echoed into logs.
const LOGGED_BODY_MAX: usize = 200;

/// One page of a thread listing.
#[derive(Debug, Clone)]
pub struct ThreadPage {
    /// Thread stubs in mailbox order.
    pub threads: Vec<ThreadSummary>,
    /// Cursor for the next page, if one exists.
    pub next_page_token: Option<String>,
    /// Provider estimate of the total match count.
    pub total_estimate: u64,
}

/// Per-id outcome of a fan-out mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// The thread the outcome reports on.
    pub id: String,
    /// Whether the provider accepted the mutation.
    pub ok: bool,
}

/// Estimated totals for one panel query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelCounts {
    /// Threads matching the query.
    pub total: u64,
    /// Matching threads that are unread.
    pub unread: u64,
}

/// HTTP client for the Gmail REST and batch endpoints.
pub struct GmailClient {
    http: Client,
    base_url: String,
    batch_url: String,
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GmailClient {
    /// Creates a client against the production endpoints with a
    /// 10-second request deadline.
    #[must_use]
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: API_BASE.to_string(),
            batch_url: BATCH_BASE.to_string(),
        }
    }

    /// Overrides the REST base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Overrides the batch endpoint URL.
    #[must_use]
    pub fn with_batch_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.batch_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Lists one page of threads.
    ///
    /// The query string is passed through to the provider verbatim, so
    /// any mailbox search syntax works (`in:inbox`, `from:`, labels).
    ///
    /// # Errors
    /// [`Error::Status`] for provider rejections, [`Error::Timeout`]
    /// when the deadline passes.
    pub async fn list_threads(
        &self,
        token: &str,
        page_token: Option<&str>,
        page_size: u32,
        query: Option<&str>,
    ) -> Result<ThreadPage> {
        let url = format!("{}/users/me/threads", self.base_url);
        let page_size = page_size.to_string();
        let mut params: Vec<(&str, &str)> = vec![("maxResults", page_size.as_str())];
        if let Some(cursor) = page_token {
            params.push(("pageToken", cursor));
        }
        if let Some(q) = query {
            params.push(("q", q));
        }

        let list: wire::ThreadList = self.get_json(token, &url, &params).await?;
        Ok(ThreadPage {
            threads: list
                .threads
                .unwrap_or_default()
                .into_iter()
                .map(|stub| ThreadSummary {
                    id: stub.id,
                    snippet: stub.snippet.unwrap_or_default(),
                })
                .collect(),
            next_page_token: list.next_page_token,
            total_estimate: list.result_size_estimate.unwrap_or(0),
        })
    }

    /// Fetches rendering metadata for the given threads, batched in
    /// chunks of [`MAX_BATCH_REQUESTS`].
    ///
    /// Threads whose batch segment failed or decoded badly are simply
    /// absent from the result; the caller keeps whatever it already
    /// has for them.
    ///
    /// # Errors
    /// Fails only when a whole exchange fails; per-thread problems
    /// degrade by omission.
    pub async fn batch_get_metadata(
        &self,
        token: &str,
        ids: &[String],
    ) -> Result<Vec<ThreadMetadata>> {
        let mut all = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BATCH_REQUESTS) {
            let requests: Vec<BatchRequest> =
                chunk.iter().map(|id| BatchRequest::get(metadata_path(id))).collect();
            let encoded = encode_batch(&requests)?;
            let (text, boundary) = self.batch_exchange(token, encoded).await?;
            let values = decode_json_segments(&text, boundary.as_deref());
            all.extend(values.into_iter().filter_map(metadata_from_value));
        }
        Ok(all)
    }

    /// Fetches one thread in full format, with bodies decoded and
    /// sanitized and attachments inventoried.
    ///
    /// # Errors
    /// [`Error::Status`] for provider rejections, including `404` for
    /// an unknown thread id.
    pub async fn get_thread_detail(&self, token: &str, thread_id: &str) -> Result<ThreadDetail> {
        let url = format!("{}/users/me/threads/{thread_id}", self.base_url);
        let thread: wire::Thread = self.get_json(token, &url, &[("format", "full")]).await?;
        Ok(detail_from_thread(thread))
    }

    /// Fetches one attachment's base64url payload.
    ///
    /// Decode with [`crate::mime::decode_attachment_data`] when the
    /// raw bytes are needed.
    ///
    /// # Errors
    /// [`Error::Status`] for provider rejections.
    pub async fn get_attachment(
        &self,
        token: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/users/me/messages/{message_id}/attachments/{attachment_id}",
            self.base_url
        );
        let body: wire::AttachmentBody = self.get_json(token, &url, &[]).await?;
        Ok(body.data.unwrap_or_default())
    }

    /// Clears the unread label from one thread.
    ///
    /// # Errors
    /// [`Error::Status`] for provider rejections.
    pub async fn mark_read(&self, token: &str, thread_id: &str) -> Result<()> {
        let url = format!("{}/users/me/threads/{thread_id}/modify", self.base_url);
        self.post_json(token, &url, &json!({ "removeLabelIds": ["UNREAD"] })).await
    }

    /// Clears the unread label from many threads concurrently.
    ///
    /// Each thread settles independently; a failure on one never stops
    /// the others. The returned outcomes are in input order.
    pub async fn batch_mark_read(&self, token: &str, ids: &[String]) -> Vec<ItemOutcome> {
        let tasks = ids.iter().map(|id| async move {
            let ok = match self.mark_read(token, id).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Marking thread {id} read failed: {e}");
                    false
                }
            };
            ItemOutcome { id: id.clone(), ok }
        });
        join_all(tasks).await
    }

    /// Moves threads to the trash through the batch endpoint, chunked
    /// in groups of [`MAX_BATCH_REQUESTS`].
    ///
    /// Outcomes are positional and cover every input id in input
    /// order, including ids whose response segment went missing.
    ///
    /// # Errors
    /// Fails only when a whole exchange fails; per-thread rejections
    /// come back as `ok: false` outcomes.
    pub async fn batch_trash(&self, token: &str, ids: &[String]) -> Result<Vec<ItemOutcome>> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BATCH_REQUESTS) {
            let requests: Vec<BatchRequest> = chunk
                .iter()
                .map(|id| BatchRequest::post(format!("/gmail/v1/users/me/threads/{id}/trash")))
                .collect();
            let encoded = encode_batch(&requests)?;
            let (text, boundary) = self.batch_exchange(token, encoded).await?;
            let statuses = decode_status_segments(&text, boundary.as_deref(), chunk.len());
            for (id, status) in chunk.iter().zip(statuses) {
                if !status.is_success() {
                    warn!(thread = %id, ?status, "Trash rejected");
                }
                outcomes.push(ItemOutcome { id: id.clone(), ok: status.is_success() });
            }
        }
        Ok(outcomes)
    }

    /// Estimates total and unread counts for a set of panel queries,
    /// all panels concurrently.
    ///
    /// An empty query costs nothing and reports zero counts; every
    /// other query costs two minimal list calls.
    ///
    /// # Errors
    /// Fails when any estimate call fails.
    pub async fn estimate_counts(
        &self,
        token: &str,
        queries: &[String],
    ) -> Result<Vec<PanelCounts>> {
        let tasks = queries.iter().map(|query| self.count_for_query(token, query));
        join_all(tasks).await.into_iter().collect()
    }

    /// Fetches the authenticated mailbox profile.
    ///
    /// # Errors
    /// [`Error::Status`] for provider rejections.
    pub async fn get_profile(&self, token: &str) -> Result<wire::Profile> {
        let url = format!("{}/users/me/profile", self.base_url);
        self.get_json(token, &url, &[]).await
    }

    async fn count_for_query(&self, token: &str, query: &str) -> Result<PanelCounts> {
        if query.trim().is_empty() {
            return Ok(PanelCounts::default());
        }
        let unread_query = format!("{query} is:unread");
        let (total, unread) = futures::join!(
            self.result_estimate(token, query),
            self.result_estimate(token, &unread_query)
        );
        Ok(PanelCounts { total: total?, unread: unread? })
    }

    async fn result_estimate(&self, token: &str, query: &str) -> Result<u64> {
        let url = format!("{}/users/me/threads", self.base_url);
        let list: wire::ThreadList =
            self.get_json(token, &url, &[("q", query), ("maxResults", "1")]).await?;
        Ok(list.result_size_estimate.unwrap_or(0))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!(url, "Gmail GET");
        let mut request = self.http.get(url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await.map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Gmail API call failed: {}", truncate_body(&body));
            return Err(Error::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }

    async fn post_json(&self, token: &str, url: &str, payload: &serde_json::Value) -> Result<()> {
        debug!(url, "Gmail POST");
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Gmail mutation failed: {}", truncate_body(&body));
            return Err(Error::Status(status.as_u16()));
        }
        Ok(())
    }

    /// Posts an encoded batch body and returns the response text plus
    /// the boundary advertised in the response headers.
    async fn batch_exchange(
        &self,
        token: &str,
        encoded: BatchBody,
    ) -> Result<(String, Option<String>)> {
        debug!(url = %self.batch_url, "Gmail batch POST");
        let response = self
            .http
            .post(&self.batch_url)
            .bearer_auth(token)
            .header("content-type", format!("multipart/mixed; boundary={}", encoded.boundary))
            .body(encoded.body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        let boundary = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .and_then(boundary_from_content_type);
        let text = response.text().await.map_err(map_transport)?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "Batch exchange failed: {}", truncate_body(&text));
            return Err(Error::Status(status.as_u16()));
        }
        Ok((text, boundary))
    }
}

fn map_transport(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(REQUEST_TIMEOUT_SECS)
    } else {
        Error::Http(e)
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= LOGGED_BODY_MAX {
        trimmed.to_string()
    } else {
        trimmed.chars().take(LOGGED_BODY_MAX).collect()
    }
}

fn metadata_path(thread_id: &str) -> String {
    let headers: String = METADATA_HEADERS
        .iter()
        .map(|header| format!("&metadataHeaders={header}"))
        .collect();
    format!("/gmail/v1/users/me/threads/{thread_id}?format=metadata{headers}")
}

fn metadata_from_value(value: serde_json::Value) -> Option<ThreadMetadata> {
    match serde_json::from_value::<wire::Thread>(value) {
        Ok(thread) => metadata_from_thread(&thread),
        Err(e) => {
            warn!("Skipping undecodable thread in batch response: {e}");
            None
        }
    }
}

/// Folds a metadata-format thread into list-row metadata. The subject
/// comes from the first message, sender and date from the most recent
/// one, and labels are the union across messages.
fn metadata_from_thread(thread: &wire::Thread) -> Option<ThreadMetadata> {
    let messages = thread.messages.as_deref().unwrap_or_default();
    let first = messages.first()?;
    let last = messages.last()?;

    let labels: HashSet<String> = messages
        .iter()
        .flat_map(|message| message.label_ids.clone().unwrap_or_default())
        .collect();

    Some(ThreadMetadata {
        id: thread.id.clone(),
        subject: first.header("Subject").unwrap_or_default().to_string(),
        from: EmailAddress::parse(last.header("From").unwrap_or_default()),
        to: last.header("To").unwrap_or_default().to_string(),
        date: last.timestamp(),
        snippet: last.snippet.clone().unwrap_or_default(),
        labels,
        message_count: u32::try_from(messages.len()).unwrap_or(u32::MAX),
    })
}

fn detail_from_thread(thread: wire::Thread) -> ThreadDetail {
    let messages: Vec<MessageView> =
        thread.messages.as_deref().unwrap_or_default().iter().map(view_from_message).collect();
    let labels: HashSet<String> =
        messages.iter().flat_map(|message| message.labels.iter().cloned()).collect();
    let subject = messages.first().map(|message| message.subject.clone()).unwrap_or_default();

    ThreadDetail { id: thread.id, subject, labels, messages }
}

fn view_from_message(message: &wire::Message) -> MessageView {
    let (body, attachments) = message.payload.as_ref().map_or_else(
        || (ExtractedBody::default(), Vec::new()),
        |payload| (extract_body(payload), collect_attachments(payload, &message.id)),
    );

    MessageView {
        id: message.id.clone(),
        from: EmailAddress::parse(message.header("From").unwrap_or_default()),
        to: message.header("To").unwrap_or_default().to_string(),
        subject: message.header("Subject").unwrap_or_default().to_string(),
        date: message.timestamp(),
        snippet: message.snippet.clone().unwrap_or_default(),
        body: body.text,
        body_format: body.format,
        labels: message.label_ids.clone().unwrap_or_default().into_iter().collect(),
        attachments,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::too_many_lines)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use switchboard_core::BodyFormat;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const TOKEN: &str = "test-access-token";

    struct ServerHandle {
        url: String,
        hits: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    /// One-connection-per-request HTTP double. Serves the canned
    /// responses in arrival order (repeating the last one), records
    /// every raw request, and counts hits.
    async fn spawn_server(responses: Vec<String>) -> ServerHandle {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let counter = Arc::clone(&hits);
        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((mut stream, _)) = listener.accept().await else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let raw = read_request(&mut stream).await;
                log.lock().unwrap().push(raw);
                let index = served.min(responses.len().saturating_sub(1));
                let response = responses.get(index).cloned().unwrap_or_default();
                served += 1;
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        ServerHandle { url: format!("http://{addr}"), hits, requests }
    }

    /// Reads one full HTTP request, honoring Content-Length so large
    /// batch bodies are consumed before the response goes out.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let Ok(n) = stream.read(&mut chunk).await else { break };
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(headers_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..headers_end]);
                let content_length = headers
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= headers_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn http_json(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn http_multipart(boundary: &str, segments: &[String]) -> String {
        let mut body = String::new();
        for segment in segments {
            body.push_str(segment);
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        format!(
            "HTTP/1.1 200 OK\r\ncontent-type: multipart/mixed; boundary={boundary}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn status_segment(boundary: &str, status: u16) -> String {
        format!(
            "--{boundary}\r\nContent-Type: application/http\r\n\r\nHTTP/1.1 {status} X\r\nContent-Type: application/json\r\n\r\n{{}}\r\n"
        )
    }

    fn json_segment(boundary: &str, payload: &str) -> String {
        format!(
            "--{boundary}\r\nContent-Type: application/http\r\n\r\nHTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{payload}\r\n"
        )
    }

    fn b64(text: &str) -> String {
        URL_SAFE_NO_PAD.encode(text)
    }

    #[tokio::test]
    async fn list_threads_maps_page_fields() {
        let server = spawn_server(vec![http_json(
            "200 OK",
            r#"{"threads": [{"id": "t1", "snippet": "one"}, {"id": "t2", "snippet": "two"}],
                "nextPageToken": "page-2", "resultSizeEstimate": 17}"#,
        )])
        .await;
        let client = GmailClient::new().with_base_url(&server.url);

        let page = client.list_threads(TOKEN, None, 50, Some("in:inbox")).await.unwrap();
        assert_eq!(page.threads.len(), 2);
        assert_eq!(page.threads[0].id, "t1");
        assert_eq!(page.threads[1].snippet, "two");
        assert_eq!(page.next_page_token.as_deref(), Some("page-2"));
        assert_eq!(page.total_estimate, 17);

        let requests = server.requests.lock().unwrap();
        assert!(requests[0].contains("GET /users/me/threads?"));
        assert!(requests[0].contains("maxResults=50"));
        assert!(requests[0].contains(&format!("authorization: Bearer {TOKEN}")));
    }

    #[tokio::test]
    async fn list_threads_of_empty_mailbox() {
        let server = spawn_server(vec![http_json("200 OK", r#"{"resultSizeEstimate": 0}"#)]).await;
        let client = GmailClient::new().with_base_url(&server.url);

        let page = client.list_threads(TOKEN, None, 50, None).await.unwrap();
        assert!(page.threads.is_empty());
        assert!(page.next_page_token.is_none());
        assert_eq!(page.total_estimate, 0);
    }

    #[tokio::test]
    async fn provider_rejection_maps_to_status_error() {
        let server = spawn_server(vec![http_json(
            "401 Unauthorized",
            r#"{"error": {"code": 401, "message": "Invalid Credentials"}}"#,
        )])
        .await;
        let client = GmailClient::new().with_base_url(&server.url);

        let err = client.list_threads(TOKEN, None, 50, None).await.unwrap_err();
        assert!(matches!(err, Error::Status(401)));
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn thread_detail_decodes_bodies_and_attachments() {
        let html = b64("<p>Hi</p><script>alert(1)</script>");
        let plain = b64("Hi in plain");
        let reply = b64("See attached menu");
        let detail_json = json!({
            "id": "t-lunch",
            "messages": [
                {
                    "id": "m1",
                    "labelIds": ["INBOX", "UNREAD"],
                    "snippet": "first snippet",
                    "internalDate": "1700000000000",
                    "payload": {
                        "mimeType": "multipart/alternative",
                        "headers": [
                            {"name": "Subject", "value": "Lunch plans"},
                            {"name": "From", "value": "Ana Lima <ana@example.com>"},
                            {"name": "To", "value": "bob@example.com"},
                            {"name": "Date", "value": "Tue, 14 Nov 2023 22:13:20 +0000"}
                        ],
                        "parts": [
                            {"mimeType": "text/plain", "body": {"data": plain}},
                            {"mimeType": "text/html", "body": {"data": html}}
                        ]
                    }
                },
                {
                    "id": "m2",
                    "labelIds": ["INBOX"],
                    "snippet": "second snippet",
                    "internalDate": "1700090000000",
                    "payload": {
                        "mimeType": "multipart/mixed",
                        "headers": [
                            {"name": "Subject", "value": "Re: Lunch plans"},
                            {"name": "From", "value": "bob@example.com"},
                            {"name": "To", "value": "ana@example.com"},
                            {"name": "Date", "value": "Wed, 15 Nov 2023 10:00:00 +0000"}
                        ],
                        "parts": [
                            {"mimeType": "text/plain", "body": {"data": reply}},
                            {
                                "mimeType": "application/pdf",
                                "filename": "menu.pdf",
                                "body": {"size": 512, "attachmentId": "att-9"}
                            }
                        ]
                    }
                }
            ]
        });
        let server = spawn_server(vec![http_json("200 OK", &detail_json.to_string())]).await;
        let client = GmailClient::new().with_base_url(&server.url);

        let detail = client.get_thread_detail(TOKEN, "t-lunch").await.unwrap();
        assert_eq!(detail.id, "t-lunch");
        assert_eq!(detail.subject, "Lunch plans");
        assert!(detail.labels.contains("UNREAD"));
        assert_eq!(detail.messages.len(), 2);

        let first = &detail.messages[0];
        assert_eq!(first.body_format, BodyFormat::Html);
        assert_eq!(first.body, "<p>Hi</p>");
        assert_eq!(first.from.name.as_deref(), Some("Ana Lima"));
        assert_eq!(first.from.address, "ana@example.com");
        assert!(first.attachments.is_empty());

        let second = &detail.messages[1];
        assert_eq!(second.body_format, BodyFormat::Plain);
        assert_eq!(second.body, "See attached menu");
        assert_eq!(second.attachments.len(), 1);
        assert_eq!(second.attachments[0].filename, "menu.pdf");
        assert_eq!(second.attachments[0].attachment_id, "att-9");
        assert_eq!(second.attachments[0].message_id, "m2");

        let requests = server.requests.lock().unwrap();
        assert!(requests[0].contains("format=full"));
    }

    #[tokio::test]
    async fn batch_metadata_folds_threads_and_skips_bad_segments() {
        let boundary = "batch_fold";
        let thread_one = json!({
            "id": "t1",
            "messages": [
                {
                    "id": "m1",
                    "labelIds": ["INBOX", "UNREAD"],
                    "snippet": "older",
                    "internalDate": "1700000000000",
                    "payload": {"headers": [
                        {"name": "Subject", "value": "Standup notes"},
                        {"name": "From", "value": "Carol <carol@example.com>"},
                        {"name": "To", "value": "team@example.com"}
                    ]}
                },
                {
                    "id": "m2",
                    "labelIds": ["INBOX"],
                    "snippet": "latest",
                    "internalDate": "1700090000000",
                    "payload": {"headers": [
                        {"name": "Subject", "value": "Re: Standup notes"},
                        {"name": "From", "value": "Dave <dave@example.com>"},
                        {"name": "To", "value": "carol@example.com"}
                    ]}
                }
            ]
        });
        let thread_two = json!({
            "id": "t2",
            "messages": [{
                "id": "m3",
                "labelIds": ["INBOX"],
                "snippet": "solo",
                "internalDate": "1700050000000",
                "payload": {"headers": [{"name": "Subject", "value": "Receipt"}]}
            }]
        });
        let response = http_multipart(
            boundary,
            &[
                json_segment(boundary, &thread_one.to_string()),
                json_segment(boundary, "{ not json"),
                json_segment(boundary, &thread_two.to_string()),
            ],
        );
        let server = spawn_server(vec![response]).await;
        let client = GmailClient::new().with_batch_url(&server.url);

        let ids = vec!["t1".to_string(), "t-bad".to_string(), "t2".to_string()];
        let metadata = client.batch_get_metadata(TOKEN, &ids).await.unwrap();
        assert_eq!(metadata.len(), 2);

        let first = &metadata[0];
        assert_eq!(first.id, "t1");
        assert_eq!(first.subject, "Standup notes");
        assert_eq!(first.from.address, "dave@example.com");
        assert_eq!(first.snippet, "latest");
        assert_eq!(first.message_count, 2);
        assert!(first.labels.contains("UNREAD"));
        assert!(first.is_unread());

        assert_eq!(metadata[1].id, "t2");
        assert_eq!(metadata[1].message_count, 1);

        let requests = server.requests.lock().unwrap();
        assert!(requests[0].contains("content-type: multipart/mixed; boundary=batch_"));
        assert!(requests[0].contains("Content-ID: <item0>"));
        assert!(requests[0].contains(
            "GET /gmail/v1/users/me/threads/t1?format=metadata&metadataHeaders=Subject&metadataHeaders=From&metadataHeaders=To&metadataHeaders=Date HTTP/1.1"
        ));
    }

    #[tokio::test]
    async fn batch_trash_chunks_and_keeps_input_order() {
        let ids: Vec<String> = (0..150).map(|i| format!("t{i}")).collect();

        let boundary = "batch_trash";
        let first_chunk: Vec<String> = (0..100)
            .map(|i| status_segment(boundary, if i == 3 { 404 } else { 200 }))
            .collect();
        let second_chunk: Vec<String> = (0..50)
            .map(|i| status_segment(boundary, if i == 7 { 404 } else { 200 }))
            .collect();
        let server = spawn_server(vec![
            http_multipart(boundary, &first_chunk),
            http_multipart(boundary, &second_chunk),
        ])
        .await;
        let client = GmailClient::new().with_batch_url(&server.url);

        let outcomes = client.batch_trash(TOKEN, &ids).await.unwrap();

        assert_eq!(server.hits.load(Ordering::SeqCst), 2);
        assert_eq!(outcomes.len(), 150);
        let returned: Vec<&str> = outcomes.iter().map(|outcome| outcome.id.as_str()).collect();
        let expected: Vec<&str> = ids.iter().map(String::as_str).collect();
        assert_eq!(returned, expected);

        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|outcome| !outcome.ok)
            .map(|outcome| outcome.id.as_str())
            .collect();
        assert_eq!(failed, vec!["t3", "t107"]);

        let requests = server.requests.lock().unwrap();
        assert!(requests[0].contains("POST /gmail/v1/users/me/threads/t0/trash HTTP/1.1"));
        assert!(requests[1].contains("POST /gmail/v1/users/me/threads/t100/trash HTTP/1.1"));
    }

    #[tokio::test]
    async fn batch_trash_of_nothing_is_free() {
        let server = spawn_server(vec![http_json("200 OK", "{}")]).await;
        let client = GmailClient::new().with_batch_url(&server.url);

        let outcomes = client.batch_trash(TOKEN, &[]).await.unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(server.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn batch_mark_read_settles_every_thread() {
        let server = spawn_server(vec![http_json("200 OK", "{}")]).await;
        let client = GmailClient::new().with_base_url(&server.url);

        let ids = vec!["t1".to_string(), "t2".to_string(), "t3".to_string()];
        let outcomes = client.batch_mark_read(TOKEN, &ids).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|outcome| outcome.ok));
        let returned: Vec<&str> = outcomes.iter().map(|outcome| outcome.id.as_str()).collect();
        assert_eq!(returned, vec!["t1", "t2", "t3"]);
        assert_eq!(server.hits.load(Ordering::SeqCst), 3);

        let requests = server.requests.lock().unwrap();
        assert!(requests.iter().all(|request| request.contains("removeLabelIds")));
        assert!(requests.iter().all(|request| request.contains("UNREAD")));
    }

    #[tokio::test]
    async fn batch_mark_read_reports_rejections_without_stopping() {
        let server = spawn_server(vec![http_json("500 Internal Server Error", "{}")]).await;
        let client = GmailClient::new().with_base_url(&server.url);

        let ids = vec!["t1".to_string(), "t2".to_string()];
        let outcomes = client.batch_mark_read(TOKEN, &ids).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|outcome| !outcome.ok));
        assert_eq!(server.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn estimate_counts_skips_empty_queries() {
        let server = spawn_server(vec![http_json("200 OK", r#"{"resultSizeEstimate": 9}"#)]).await;
        let client = GmailClient::new().with_base_url(&server.url);

        let queries = vec![String::new(), "from:ana".to_string()];
        let counts = client.estimate_counts(TOKEN, &queries).await.unwrap();

        assert_eq!(counts[0], PanelCounts::default());
        assert_eq!(counts[1], PanelCounts { total: 9, unread: 9 });
        assert_eq!(server.hits.load(Ordering::SeqCst), 2);

        let requests = server.requests.lock().unwrap();
        assert!(requests.iter().any(|request| request.contains("unread")));
        assert!(requests.iter().all(|request| request.contains("maxResults=1")));
    }

    #[tokio::test]
    async fn estimate_counts_with_no_real_queries_never_dials() {
        let server = spawn_server(vec![http_json("200 OK", "{}")]).await;
        let client = GmailClient::new().with_base_url(&server.url);

        let queries = vec![String::new(), "   ".to_string()];
        let counts = client.estimate_counts(TOKEN, &queries).await.unwrap();

        assert_eq!(counts, vec![PanelCounts::default(); 2]);
        assert_eq!(server.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn profile_and_attachment_fetches() {
        let server = spawn_server(vec![
            http_json("200 OK", r#"{"emailAddress": "me@example.com", "messagesTotal": 12}"#),
        ])
        .await;
        let client = GmailClient::new().with_base_url(&server.url);

        let profile = client.get_profile(TOKEN).await.unwrap();
        assert_eq!(profile.email_address, "me@example.com");
        assert_eq!(profile.messages_total, Some(12));

        let payload = b64("%PDF-1.4 fake");
        let server = spawn_server(vec![http_json(
            "200 OK",
            &format!(r#"{{"size": 13, "data": "{payload}"}}"#),
        )])
        .await;
        let client = GmailClient::new().with_base_url(&server.url);

        let data = client.get_attachment(TOKEN, "m2", "att-9").await.unwrap();
        let bytes = crate::mime::decode_attachment_data(&data).unwrap();
        assert_eq!(bytes, b"%PDF-1.4 fake");
    }

    #[test]
    fn metadata_needs_at_least_one_message() {
        let empty: wire::Thread = serde_json::from_value(json!({"id": "t0"})).unwrap();
        assert!(metadata_from_thread(&empty).is_none());

        let no_messages: wire::Thread =
            serde_json::from_value(json!({"id": "t0", "messages": []})).unwrap();
        assert!(metadata_from_thread(&no_messages).is_none());
    }

    #[test]
    fn message_without_payload_views_as_empty_plain() {
        let message: wire::Message =
            serde_json::from_value(json!({"id": "m1", "internalDate": "1700000000000"})).unwrap();

        let view = view_from_message(&message);
        assert!(view.body.is_empty());
        assert_eq!(view.body_format, BodyFormat::Plain);
        assert!(view.attachments.is_empty());
        assert_eq!(view.date.timestamp_millis(), 1_700_000_000_000);
    }
}
