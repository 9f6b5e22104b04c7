//! Domain models for threads, messages, and addresses.

mod address;
mod thread;

pub use address::EmailAddress;
pub use thread::{
    Attachment, BodyFormat, MessageView, ThreadDetail, ThreadMetadata, ThreadSummary,
};
