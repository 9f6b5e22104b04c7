//! MIME-tree traversal: message bodies and attachment inventories.
//!
//! Gmail delivers each message as a recursive part tree. The helpers
//! here pick the best displayable body (HTML preferred, plain text
//! otherwise), strip active content out of HTML before it reaches a
//! viewer, and inventory the parts that are real attachments.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use regex::RegexBuilder;
use switchboard_core::{Attachment, BodyFormat};
use tracing::warn;

use crate::error::Result;
use crate::wire::MessagePart;

/// A decoded message body with its format tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedBody {
    /// Body text. Sanitized markup for HTML, verbatim for plain text.
    pub text: String,
    /// Which kind of part produced the text.
    pub format: BodyFormat,
}

/// Depth-first search for the first part of the target MIME type that
/// actually carries body data.
#[must_use]
pub fn find_part<'a>(part: &'a MessagePart, target_mime: &str) -> Option<&'a MessagePart> {
    let matches_type = part
        .mime_type
        .as_deref()
        .is_some_and(|mime| mime.eq_ignore_ascii_case(target_mime));
    let has_data = part
        .body
        .as_ref()
        .and_then(|body| body.data.as_deref())
        .is_some_and(|data| !data.is_empty());
    if matches_type && has_data {
        return Some(part);
    }

    part.parts
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find_map(|child| find_part(child, target_mime))
}

/// Extracts the display body from a message's part tree.
///
/// HTML wins over plain text when both decode; the HTML path is
/// sanitized with [`sanitize_html`], the plain path is verbatim. A
/// tree with neither yields an empty plain body. Undecodable part data
/// is logged and treated as absent, so a corrupt HTML part still falls
/// back to the plain alternative.
#[must_use]
pub fn extract_body(root: &MessagePart) -> ExtractedBody {
    if let Some(part) = find_part(root, "text/html")
        && let Some(text) = decode_part_data(part)
    {
        return ExtractedBody { text: sanitize_html(&text), format: BodyFormat::Html };
    }
    if let Some(part) = find_part(root, "text/plain")
        && let Some(text) = decode_part_data(part)
    {
        return ExtractedBody { text, format: BodyFormat::Plain };
    }
    ExtractedBody::default()
}

/// Inventories the real attachments in a part tree.
///
/// A part counts only when it carries both a non-empty filename and an
/// attachment id. Inline images referenced by `cid:` have a filename
/// but no id and are left out.
#[must_use]
pub fn collect_attachments(root: &MessagePart, message_id: &str) -> Vec<Attachment> {
    let mut attachments = Vec::new();
    collect_into(root, message_id, &mut attachments);
    attachments
}

fn collect_into(part: &MessagePart, message_id: &str, out: &mut Vec<Attachment>) {
    if let Some(filename) = part.filename.as_deref().filter(|name| !name.is_empty())
        && let Some(body) = part.body.as_ref()
        && let Some(attachment_id) = body.attachment_id.as_deref().filter(|id| !id.is_empty())
    {
        out.push(Attachment {
            filename: filename.to_string(),
            mime_type: part
                .mime_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            size: body.size.unwrap_or(0),
            attachment_id: attachment_id.to_string(),
            message_id: message_id.to_string(),
        });
    }

    for child in part.parts.as_deref().unwrap_or_default() {
        collect_into(child, message_id, out);
    }
}

/// Strips active content out of message HTML.
///
/// Removes `<script>` and `<style>` elements with their contents and
/// drops inline `on*` event-handler attributes. Everything else passes
/// through untouched.
#[must_use]
pub fn sanitize_html(html: &str) -> String {
    let without_scripts = strip_pattern(html, r"<script\b[^>]*>.*?</script>");
    let without_styles = strip_pattern(&without_scripts, r"<style\b[^>]*>.*?</style>");
    strip_pattern(&without_styles, r#"\son\w+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
}

fn strip_pattern(input: &str, pattern: &str) -> String {
    match RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
    {
        Ok(re) => re.replace_all(input, "").into_owned(),
        Err(e) => {
            warn!("Invalid sanitizer pattern: {e}");
            input.to_string()
        }
    }
}

/// Decodes a base64url attachment payload into raw bytes.
///
/// Accepts both padded and unpadded input; the provider is
/// inconsistent about padding attachment data.
///
/// # Errors
/// Returns a decode error when the payload is not base64url.
pub fn decode_attachment_data(data: &str) -> Result<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(data.trim_end_matches('='))?)
}

/// Decodes a part's base64url body data, logging and swallowing
/// failures.
fn decode_part_data(part: &MessagePart) -> Option<String> {
    let data = part.body.as_ref()?.data.as_deref()?;
    if data.is_empty() {
        return None;
    }
    match URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Part body is not valid UTF-8: {e}");
                None
            }
        },
        Err(e) => {
            warn!("Part body is not valid base64url: {e}");
            None
        }
    }
}
