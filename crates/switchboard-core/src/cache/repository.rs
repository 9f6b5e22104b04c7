//! Thread cache storage repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::warn;

use super::model::{CacheStats, CachedEntry};
use crate::Result;
use crate::model::{Attachment, ThreadDetail, ThreadMetadata};

/// Repository for thread cache storage and retrieval.
///
/// Two tables, both keyed by thread id and holding the serialized
/// domain object plus a capture timestamp: `thread_metadata` for the
/// list view and `thread_detail` for opened threads.
pub struct CacheRepository {
    pool: SqlitePool,
}

impl CacheRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema
    /// creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema
    /// creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS thread_metadata (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                cached_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS thread_detail (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                cached_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert a batch of thread metadata as a single transaction.
    ///
    /// All rows share one capture timestamp and either all land or
    /// none do.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database transaction
    /// fails.
    pub async fn put_metadata_batch(&self, threads: &[ThreadMetadata]) -> Result<()> {
        if threads.is_empty() {
            return Ok(());
        }

        let cached_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for thread in threads {
            sqlx::query(
                r"
                INSERT INTO thread_metadata (id, data, cached_at)
                VALUES (?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    data = excluded.data,
                    cached_at = excluded.cached_at
                ",
            )
            .bind(&thread.id)
            .bind(serde_json::to_string(thread)?)
            .bind(&cached_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Get all cached thread metadata.
    ///
    /// Rows whose stored JSON no longer decodes are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_all_metadata(&self) -> Result<Vec<CachedEntry<ThreadMetadata>>> {
        let rows = sqlx::query(r"SELECT id, data, cached_at FROM thread_metadata ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let entries = rows
            .iter()
            .filter_map(|row| {
                let id: String = row.get("id");
                match decode_row::<ThreadMetadata>(row.get("data"), row.get("cached_at")) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Dropping undecodable metadata cache row {id}: {e}");
                        None
                    }
                }
            })
            .collect();

        Ok(entries)
    }

    /// Remove a single thread's metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn remove_metadata(&self, thread_id: &str) -> Result<()> {
        sqlx::query(r"DELETE FROM thread_metadata WHERE id = ?")
            .bind(thread_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Upsert a full thread detail.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn put_detail(&self, detail: &ThreadDetail) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO thread_detail (id, data, cached_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                data = excluded.data,
                cached_at = excluded.cached_at
            ",
        )
        .bind(&detail.id)
        .bind(serde_json::to_string(detail)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a cached thread detail, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_detail(&self, thread_id: &str) -> Result<Option<CachedEntry<ThreadDetail>>> {
        let row = sqlx::query(r"SELECT data, cached_at FROM thread_detail WHERE id = ?")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;

        let entry = row.and_then(|row| {
            match decode_row::<ThreadDetail>(row.get("data"), row.get("cached_at")) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Dropping undecodable detail cache row {thread_id}: {e}");
                    None
                }
            }
        });

        Ok(entry)
    }

    /// Build an index of attachments per thread from cached details.
    ///
    /// Scans every cached detail, flattening each message's
    /// attachments; a thread appears in the result only if its
    /// flattened attachment list is nonempty.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn attachment_index(&self) -> Result<HashMap<String, Vec<Attachment>>> {
        let rows = sqlx::query(r"SELECT id, data, cached_at FROM thread_detail")
            .fetch_all(&self.pool)
            .await?;

        let mut index = HashMap::new();
        for row in &rows {
            let id: String = row.get("id");
            let entry = match decode_row::<ThreadDetail>(row.get("data"), row.get("cached_at")) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping undecodable detail cache row {id}: {e}");
                    continue;
                }
            };

            let attachments: Vec<Attachment> = entry
                .data
                .messages
                .iter()
                .flat_map(|message| message.attachments.iter().cloned())
                .collect();

            if !attachments.is_empty() {
                index.insert(entry.data.id, attachments);
            }
        }

        Ok(index)
    }

    /// Delete everything from both tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn clear_all(&self) -> Result<()> {
        sqlx::query(r"DELETE FROM thread_metadata")
            .execute(&self.pool)
            .await?;

        sqlx::query(r"DELETE FROM thread_detail")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Row counts for both tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[allow(clippy::cast_sign_loss)]
    pub async fn stats(&self) -> Result<CacheStats> {
        let metadata_row = sqlx::query(r"SELECT COUNT(*) as count FROM thread_metadata")
            .fetch_one(&self.pool)
            .await?;
        let detail_row = sqlx::query(r"SELECT COUNT(*) as count FROM thread_detail")
            .fetch_one(&self.pool)
            .await?;

        Ok(CacheStats {
            metadata_count: metadata_row.get::<i64, _>("count").max(0) as u64,
            detail_count: detail_row.get::<i64, _>("count").max(0) as u64,
        })
    }
}

/// Decode one `{data, cached_at}` row into a typed cache entry.
fn decode_row<T: serde::de::DeserializeOwned>(
    data: String,
    cached_at: String,
) -> std::result::Result<CachedEntry<T>, String> {
    let cached_at = DateTime::parse_from_rfc3339(&cached_at)
        .map_err(|e| format!("bad cached_at: {e}"))?
        .with_timezone(&Utc);
    let data: T = serde_json::from_str(&data).map_err(|e| format!("bad data: {e}"))?;
    Ok(CachedEntry { data, cached_at })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{BodyFormat, EmailAddress, MessageView};
    use std::collections::HashSet;

    fn metadata(id: &str, snippet: &str) -> ThreadMetadata {
        ThreadMetadata {
            id: id.to_string(),
            subject: format!("Subject {id}"),
            from: EmailAddress::parse("John Doe <john@example.com>"),
            to: "me@example.com".to_string(),
            date: Utc::now(),
            snippet: snippet.to_string(),
            labels: HashSet::from(["INBOX".to_string()]),
            message_count: 1,
        }
    }

    fn detail(id: &str, attachments: Vec<Attachment>) -> ThreadDetail {
        ThreadDetail {
            id: id.to_string(),
            subject: format!("Subject {id}"),
            labels: HashSet::from(["INBOX".to_string()]),
            messages: vec![MessageView {
                id: format!("{id}-m1"),
                from: EmailAddress::parse("john@example.com"),
                to: "me@example.com".to_string(),
                subject: format!("Subject {id}"),
                date: Utc::now(),
                snippet: "preview".to_string(),
                body: "Hello".to_string(),
                body_format: BodyFormat::Plain,
                labels: HashSet::new(),
                attachments,
            }],
        }
    }

    fn attachment(message_id: &str, filename: &str) -> Attachment {
        Attachment {
            filename: filename.to_string(),
            mime_type: "application/pdf".to_string(),
            size: 1024,
            attachment_id: format!("att-{filename}"),
            message_id: message_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get_metadata_batch() {
        let repo = CacheRepository::in_memory().await.unwrap();

        repo.put_metadata_batch(&[metadata("t1", "one"), metadata("t2", "two")])
            .await
            .unwrap();

        let entries = repo.get_all_metadata().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].data.id, "t1");
        assert_eq!(entries[1].data.snippet, "two");
    }

    #[tokio::test]
    async fn test_put_metadata_batch_upserts() {
        let repo = CacheRepository::in_memory().await.unwrap();

        repo.put_metadata_batch(&[metadata("t1", "old")])
            .await
            .unwrap();
        repo.put_metadata_batch(&[metadata("t1", "new")])
            .await
            .unwrap();

        let entries = repo.get_all_metadata().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data.snippet, "new");
    }

    #[tokio::test]
    async fn test_remove_metadata() {
        let repo = CacheRepository::in_memory().await.unwrap();

        repo.put_metadata_batch(&[metadata("t1", "one"), metadata("t2", "two")])
            .await
            .unwrap();
        repo.remove_metadata("t1").await.unwrap();

        let entries = repo.get_all_metadata().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data.id, "t2");
    }

    #[tokio::test]
    async fn test_put_and_get_detail() {
        let repo = CacheRepository::in_memory().await.unwrap();

        let stored = detail("t1", vec![attachment("t1-m1", "report.pdf")]);
        repo.put_detail(&stored).await.unwrap();

        let entry = repo.get_detail("t1").await.unwrap().unwrap();
        assert_eq!(entry.data, stored);
        assert!(repo.get_detail("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attachment_index_skips_attachment_free_threads() {
        let repo = CacheRepository::in_memory().await.unwrap();

        repo.put_detail(&detail("plain", vec![])).await.unwrap();
        repo.put_detail(&detail(
            "with-files",
            vec![
                attachment("with-files-m1", "a.pdf"),
                attachment("with-files-m1", "b.png"),
            ],
        ))
        .await
        .unwrap();

        let index = repo.attachment_index().await.unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("with-files").unwrap().len(), 2);
        assert!(!index.contains_key("plain"));
    }

    #[tokio::test]
    async fn test_clear_all_and_stats() {
        let repo = CacheRepository::in_memory().await.unwrap();

        repo.put_metadata_batch(&[metadata("t1", "one")])
            .await
            .unwrap();
        repo.put_detail(&detail("t1", vec![])).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.metadata_count, 1);
        assert_eq!(stats.detail_count, 1);

        repo.clear_all().await.unwrap();
        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.metadata_count, 0);
        assert_eq!(stats.detail_count, 0);
    }

    #[tokio::test]
    async fn test_undecodable_row_is_skipped_not_fatal() {
        let repo = CacheRepository::in_memory().await.unwrap();

        repo.put_metadata_batch(&[metadata("good", "fine")])
            .await
            .unwrap();
        sqlx::query(r"INSERT INTO thread_metadata (id, data, cached_at) VALUES (?, ?, ?)")
            .bind("broken")
            .bind("{not json")
            .bind(Utc::now().to_rfc3339())
            .execute(&repo.pool)
            .await
            .unwrap();

        let entries = repo.get_all_metadata().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data.id, "good");
    }
}
