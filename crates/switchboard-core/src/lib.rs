//! # switchboard-core
//!
//! Domain model and client-side state engine for the Switchboard
//! email client.
//!
//! This crate provides:
//! - Domain models for threads, messages, attachments, and addresses
//! - **Offline Cache** - `SQLite`-backed thread store for offline reads
//! - **Reconciliation** - stale-while-revalidate list merging with
//!   strict ordering and dedup invariants
//! - **Panel Engine** - ordered accept/reject rules deciding which
//!   panel claims a thread, plus lossy provider-query translation for
//!   count estimation
//! - Deployment configuration loaded from the environment

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cache;
mod config;
mod error;
pub mod merge;
pub mod model;
pub mod panel;

pub use cache::{CacheRepository, CacheStats, CachedEntry};
pub use config::Config;
pub use error::{Error, Result};
pub use merge::{MergeMode, ThreadRecord, merge_threads};
pub use model::{
    Attachment, BodyFormat, EmailAddress, MessageView, ThreadDetail, ThreadMetadata, ThreadSummary,
};
pub use panel::{Panel, PanelRule, RuleAction, RuleField, RuleMatcher};
