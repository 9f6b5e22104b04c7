//! # switchboard-gmail
//!
//! Gmail provider client for the Switchboard email client.
//!
//! This crate provides:
//! - **[`GmailClient`]** - paged thread listing, batched metadata
//!   hydration, full thread detail, attachments, read-state and trash
//!   mutations, and panel count estimates
//! - **Batch codec** - the `multipart/mixed` request framing and the
//!   degrade-by-omission response decoder behind the batched
//!   operations
//! - **MIME extraction** - body selection (sanitized HTML over plain
//!   text) and attachment inventory over Gmail's recursive part trees
//! - **Wire types** - serde mirrors of the REST shapes, kept separate
//!   from the domain model in `switchboard-core`
//!
//! Every call takes the bearer token per invocation, so one client
//! instance serves any number of signed-in sessions:
//!
//! ```ignore
//! let client = GmailClient::new();
//! let page = client.list_threads(&token, None, 50, Some("in:inbox")).await?;
//! let metadata = client
//!     .batch_get_metadata(&token, &page.threads.iter().map(|t| t.id.clone()).collect::<Vec<_>>())
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod client;
mod error;
pub mod mime;
pub mod wire;

pub use batch::{
    BatchBody, BatchItemStatus, BatchRequest, MAX_BATCH_REQUESTS, boundary_from_content_type,
    decode_json_segments, decode_status_segments, encode_batch,
};
pub use client::{GmailClient, ItemOutcome, PanelCounts, ThreadPage};
pub use error::{Error, Result};
pub use mime::{
    ExtractedBody, collect_attachments, decode_attachment_data, extract_body, find_part,
    sanitize_html,
};
pub use wire::Profile;
