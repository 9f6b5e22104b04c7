//! Multipart/mixed batch codec for the Gmail batch endpoint.
//!
//! One batch exchange bundles up to [`MAX_BATCH_REQUESTS`] logical
//! HTTP calls into a single `multipart/mixed` POST. Each part wraps a
//! bare request line; the response interleaves one `application/http`
//! segment per part, in request order.
//!
//! Decoding degrades by omission: a malformed, failed, or truncated
//! segment is logged and skipped rather than failing the whole
//! exchange, so one bad thread never blacks out a mailbox page.
//!
//! Correlation with the originating requests is positional. The
//! provider preserves segment order; a transport that reordered
//! segments would misattribute results, which is why the
//! status-oriented decoder always reports exactly one outcome per
//! request sent.

use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::warn;

use crate::error::{Error, Result};

/// Provider cap on sub-requests per batch exchange.
pub const MAX_BATCH_REQUESTS: usize = 100;

/// One logical call inside a batch exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// HTTP method of the inner call.
    pub method: String,
    /// Absolute path of the inner call, e.g. `/gmail/v1/users/me/threads/t1`.
    pub path: String,
}

impl BatchRequest {
    /// A `GET` sub-request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self { method: "GET".to_string(), path: path.into() }
    }

    /// A `POST` sub-request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self { method: "POST".to_string(), path: path.into() }
    }
}

/// An encoded multipart body together with its boundary.
#[derive(Debug, Clone)]
pub struct BatchBody {
    /// The `multipart/mixed` payload.
    pub body: String,
    /// Boundary to advertise in the `Content-Type` header.
    pub boundary: String,
}

/// Outcome of one positionally correlated batch segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchItemStatus {
    /// The inner call answered 2xx.
    Success(u16),
    /// The inner call answered non-2xx, or its segment was missing or
    /// unreadable. Carries the status when one was parsed.
    Failed(Option<u16>),
}

impl BatchItemStatus {
    /// Whether the inner call succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Encodes sub-requests into one `multipart/mixed` body.
///
/// Each part carries a `Content-ID` of `<item{i}>` so responses can be
/// matched back by index. The boundary is freshly randomized per
/// exchange.
///
/// # Errors
/// Returns [`Error::BatchTooLarge`] for more than
/// [`MAX_BATCH_REQUESTS`] sub-requests.
pub fn encode_batch(requests: &[BatchRequest]) -> Result<BatchBody> {
    if requests.len() > MAX_BATCH_REQUESTS {
        return Err(Error::BatchTooLarge(requests.len()));
    }

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    let boundary = format!("batch_{suffix}");

    let mut body = String::new();
    for (index, request) in requests.iter().enumerate() {
        body.push_str(&format!("--{boundary}\r\n"));
        body.push_str("Content-Type: application/http\r\n");
        body.push_str(&format!("Content-ID: <item{index}>\r\n\r\n"));
        body.push_str(&format!("{} {} HTTP/1.1\r\n\r\n", request.method, request.path));
    }
    body.push_str(&format!("--{boundary}--\r\n"));

    Ok(BatchBody { body, boundary })
}

/// Pulls the boundary parameter out of a `Content-Type` header value.
#[must_use]
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        part.trim()
            .strip_prefix("boundary=")
            .map(|value| value.trim_matches('"').to_string())
    })
}

/// Decodes the JSON payloads of a batch response.
///
/// Splits on the boundary (given, or inferred from the first non-empty
/// line of the body), finds each segment's embedded `HTTP/1.1` status
/// line and JSON object, and collects the objects of 2xx segments.
/// Failed or malformed segments are logged and skipped; a response
/// with no usable boundary decodes to an empty vector.
#[must_use]
pub fn decode_json_segments(response: &str, boundary: Option<&str>) -> Vec<serde_json::Value> {
    let Some(boundary) = boundary.map(str::to_string).or_else(|| infer_boundary(response)) else {
        warn!("Batch response carries no usable boundary");
        return Vec::new();
    };

    let separator = format!("--{boundary}");
    let mut values = Vec::new();
    for segment in response.split(&separator) {
        let segment = segment.trim();
        if segment.is_empty() || segment.starts_with("--") {
            continue;
        }
        let normalized = segment.replace("\r\n", "\n");

        let Some(status_start) = normalized.find("HTTP/1.1 ") else {
            warn!("Skipping batch segment without a status line");
            continue;
        };
        let status_region = &normalized[status_start..];
        let line_end = status_region.find('\n').unwrap_or(status_region.len());
        let Some(status) = status_code(&status_region[..line_end]) else {
            warn!("Skipping batch segment with an unreadable status line");
            continue;
        };
        if !(200..300).contains(&status) {
            warn!(status, "Skipping failed batch segment");
            continue;
        }

        let after_status = &status_region[line_end..];
        let Some(json_start) = after_status.find('{') else {
            warn!("Skipping batch segment without a JSON body");
            continue;
        };
        let json_region = &after_status[json_start..];
        let json_body = find_json_object_end(json_region)
            .map_or_else(|| json_region.trim(), |end| &json_region[..end]);

        match serde_json::from_str(json_body) {
            Ok(value) => values.push(value),
            Err(e) => warn!("Skipping undecodable batch segment: {e}"),
        }
    }
    values
}

/// Decodes per-segment statuses from a batch response.
///
/// Always returns exactly `expected` outcomes: the segment at position
/// `i` reports on request `i`, and positions with no readable segment
/// come back as [`BatchItemStatus::Failed`] with no status.
#[must_use]
pub fn decode_status_segments(
    response: &str,
    boundary: Option<&str>,
    expected: usize,
) -> Vec<BatchItemStatus> {
    let mut statuses = vec![BatchItemStatus::Failed(None); expected];

    let Some(boundary) = boundary.map(str::to_string).or_else(|| infer_boundary(response)) else {
        warn!("Batch response carries no usable boundary");
        return statuses;
    };

    let separator = format!("--{boundary}");
    let mut index = 0;
    for segment in response.split(&separator) {
        let segment = segment.trim();
        if segment.is_empty() || segment.starts_with("--") {
            continue;
        }
        if index >= expected {
            warn!(expected, "Batch response has more segments than requests");
            break;
        }
        statuses[index] = segment_status(segment);
        index += 1;
    }
    statuses
}

fn segment_status(segment: &str) -> BatchItemStatus {
    let normalized = segment.replace("\r\n", "\n");
    let Some(status_start) = normalized.find("HTTP/1.1 ") else {
        return BatchItemStatus::Failed(None);
    };
    let status_region = &normalized[status_start..];
    let line_end = status_region.find('\n').unwrap_or(status_region.len());
    match status_code(&status_region[..line_end]) {
        Some(status) if (200..300).contains(&status) => BatchItemStatus::Success(status),
        Some(status) => BatchItemStatus::Failed(Some(status)),
        None => BatchItemStatus::Failed(None),
    }
}

fn status_code(line: &str) -> Option<u16> {
    line.strip_prefix("HTTP/1.1 ")?.split_whitespace().next()?.parse().ok()
}

/// Infers the boundary from the first non-empty `--{boundary}` line.
fn infer_boundary(response: &str) -> Option<String> {
    let first = response.lines().find(|line| !line.trim().is_empty())?;
    let boundary = first.trim().strip_prefix("--")?;
    (!boundary.is_empty()).then(|| boundary.to_string())
}

/// Finds the end (exclusive) of the JSON object starting at byte 0,
/// tracking strings and escapes so embedded braces don't cut the scan
/// short.
fn find_json_object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (position, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(position + 1);
                }
            }
            _ => {}
        }
    }
    None
}
