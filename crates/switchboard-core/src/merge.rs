//! Stale-while-revalidate list reconciliation.
//!
//! The UI holds an ordered thread list (usually seeded from the
//! cache) and periodically receives a freshly fetched page from the
//! provider. [`merge_threads`] folds that page into the held list
//! without ever mutating either input, and signals "nothing changed"
//! by returning the existing slice borrowed, so callers can cheaply
//! skip a re-render.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use crate::model::{ThreadMetadata, ThreadSummary};

/// Anything keyed by a provider thread id.
pub trait ThreadRecord {
    /// The provider thread id.
    fn id(&self) -> &str;
}

impl ThreadRecord for ThreadSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

impl ThreadRecord for ThreadMetadata {
    fn id(&self) -> &str {
        &self.id
    }
}

/// How an incoming page is folded into the existing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// The incoming page is "what's current": known ids are replaced
    /// in place, unknown ids are prepended, and existing entries the
    /// page did not mention are kept untouched. Pagination means a
    /// refresh page never implies deletion.
    Refresh,
    /// The incoming page extends the list: ids already present
    /// anywhere are skipped entirely (existing data wins), new ids
    /// are appended in page order.
    Append,
}

/// Merge an incoming page of threads into an existing ordered list.
///
/// Both modes are pure and preserve the relative order of every
/// retained pre-existing entry. `Cow::Borrowed` is returned when the
/// merge is a no-op: always for an empty `incoming`, and in
/// [`MergeMode::Append`] also when every incoming id was already
/// present.
pub fn merge_threads<'a, T>(existing: &'a [T], incoming: &[T], mode: MergeMode) -> Cow<'a, [T]>
where
    T: ThreadRecord + Clone,
{
    if incoming.is_empty() {
        return Cow::Borrowed(existing);
    }

    match mode {
        MergeMode::Refresh => {
            let positions: HashMap<&str, usize> = existing
                .iter()
                .enumerate()
                .map(|(index, thread)| (thread.id(), index))
                .collect();

            let mut retained = existing.to_vec();
            let mut fresh: Vec<T> = Vec::new();
            for thread in incoming {
                if let Some(&index) = positions.get(thread.id()) {
                    retained[index] = thread.clone();
                } else if let Some(slot) = fresh.iter_mut().find(|t| t.id() == thread.id()) {
                    // The page repeated a new id; the later copy wins.
                    *slot = thread.clone();
                } else {
                    fresh.push(thread.clone());
                }
            }

            fresh.extend(retained);
            Cow::Owned(fresh)
        }
        MergeMode::Append => {
            let known: HashSet<&str> = existing.iter().map(ThreadRecord::id).collect();
            let mut added: Vec<T> = Vec::new();
            for thread in incoming {
                if known.contains(thread.id()) || added.iter().any(|t| t.id() == thread.id()) {
                    continue;
                }
                added.push(thread.clone());
            }

            if added.is_empty() {
                return Cow::Borrowed(existing);
            }

            let mut merged = existing.to_vec();
            merged.extend(added);
            Cow::Owned(merged)
        }
    }
}
