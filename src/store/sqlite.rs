//! SQLite-backed store.
//!
//! One database file under the vidshelf home, WAL journal mode, two tables
//! sharing the id key. The connection is synchronous; every operation runs
//! on the blocking pool so async callers are suspended, never blocked.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use crate::domain::VideoRecord;

use super::{StorageUsage, StoreError, StoreResult, VideoStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS videos (
    id BLOB PRIMARY KEY,
    name TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    mime_type TEXT NOT NULL,
    source_last_modified TEXT NOT NULL,
    duration_seconds REAL,
    thumbnail BLOB,
    added_at TEXT NOT NULL,
    last_watched_at TEXT,
    watch_progress REAL,
    favorite INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS payloads (
    id BLOB PRIMARY KEY,
    data BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_videos_added_at ON videos(added_at);
"#;

const RECORD_COLUMNS: &str = "id, name, size_bytes, mime_type, source_last_modified, \
     duration_seconds, thumbnail, added_at, last_watched_at, watch_progress, favorite";

/// SQLite store for records and payloads
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the database file at the given path.
    ///
    /// Creates parent directories as needed and switches the journal to WAL.
    /// The schema is created by [`VideoStore::initialize`].
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!(
                    "Failed to create store directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(&path).map_err(unavailable)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(unavailable)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(unavailable)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path,
        })
    }

    /// Run a closure against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection mutex poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("storage task failed: {e}")))?
    }

    fn map_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<VideoRecord> {
        Ok(VideoRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            size_bytes: row.get(2)?,
            mime_type: row.get(3)?,
            source_last_modified: row.get(4)?,
            duration_seconds: row.get(5)?,
            thumbnail: row.get(6)?,
            added_at: row.get(7)?,
            last_watched_at: row.get(8)?,
            watch_progress: row.get(9)?,
            favorite: row.get(10)?,
        })
    }
}

fn unavailable(err: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl VideoStore for SqliteStore {
    async fn initialize(&self) -> StoreResult<()> {
        self.with_conn(|conn| conn.execute_batch(SCHEMA).map_err(unavailable))
            .await
    }

    async fn put(&self, record: VideoRecord, payload: Vec<u8>) -> StoreResult<Uuid> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(unavailable)?;

            tx.execute(
                "INSERT INTO videos (id, name, size_bytes, mime_type, source_last_modified, \
                 duration_seconds, thumbnail, added_at, last_watched_at, watch_progress, favorite) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id,
                    record.name,
                    record.size_bytes,
                    record.mime_type,
                    record.source_last_modified,
                    record.duration_seconds,
                    record.thumbnail,
                    record.added_at,
                    record.last_watched_at,
                    record.watch_progress,
                    record.favorite,
                ],
            )
            .map_err(unavailable)?;

            tx.execute(
                "INSERT INTO payloads (id, data) VALUES (?1, ?2)",
                params![record.id, payload],
            )
            .map_err(unavailable)?;

            tx.commit().map_err(unavailable)?;
            Ok(record.id)
        })
        .await
    }

    async fn get_metadata(&self, id: Uuid) -> StoreResult<VideoRecord> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM videos WHERE id = ?1"),
                params![id],
                Self::map_record,
            )
            .optional()
            .map_err(unavailable)?
            .ok_or(StoreError::NotFound(id))
        })
        .await
    }

    async fn get_payload(&self, id: Uuid) -> StoreResult<Vec<u8>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT data FROM payloads WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(unavailable)?
            .ok_or(StoreError::NotFound(id))
        })
        .await
    }

    async fn list_all(&self) -> StoreResult<Vec<VideoRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {RECORD_COLUMNS} FROM videos"))
                .map_err(unavailable)?;

            let rows = stmt
                .query_map([], Self::map_record)
                .map_err(unavailable)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(unavailable)?;

            Ok(rows)
        })
        .await
    }

    async fn update(&self, record: VideoRecord) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE videos SET name = ?2, size_bytes = ?3, mime_type = ?4, \
                     source_last_modified = ?5, duration_seconds = ?6, thumbnail = ?7, \
                     added_at = ?8, last_watched_at = ?9, watch_progress = ?10, favorite = ?11 \
                     WHERE id = ?1",
                    params![
                        record.id,
                        record.name,
                        record.size_bytes,
                        record.mime_type,
                        record.source_last_modified,
                        record.duration_seconds,
                        record.thumbnail,
                        record.added_at,
                        record.last_watched_at,
                        record.watch_progress,
                        record.favorite,
                    ],
                )
                .map_err(unavailable)?;

            if changed == 0 {
                Err(StoreError::NotFound(record.id))
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(unavailable)?;

            // Row counts are deliberately ignored: deleting an id with a
            // missing side must succeed so partial prior failures heal.
            tx.execute("DELETE FROM videos WHERE id = ?1", params![id])
                .map_err(unavailable)?;
            tx.execute("DELETE FROM payloads WHERE id = ?1", params![id])
                .map_err(unavailable)?;

            tx.commit().map_err(unavailable)?;
            Ok(())
        })
        .await
    }

    async fn usage(&self) -> StoreResult<StorageUsage> {
        let path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            // WAL keeps sidecar files next to the database
            let mut used = 0u64;
            for suffix in ["", "-wal", "-shm"] {
                let candidate = PathBuf::from(format!("{}{suffix}", path.display()));
                if let Ok(meta) = std::fs::metadata(&candidate) {
                    used += meta.len();
                }
            }

            let total = path
                .parent()
                .and_then(|dir| fs2::total_space(dir).ok())
                .unwrap_or(0);

            if total == 0 {
                debug!("filesystem capacity unavailable, reporting zero usage");
                Ok(StorageUsage::default())
            } else {
                Ok(StorageUsage { used, total })
            }
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("storage task failed: {e}")))?
    }

    async fn request_persistence(&self) -> bool {
        self.with_conn(|conn| {
            conn.pragma_update(None, "synchronous", "FULL")
                .map_err(unavailable)
        })
        .await
        .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProbeOutcome, SourceFile, VideoRecord};
    use chrono::Utc;
    use tempfile::TempDir;

    async fn open_store() -> (SqliteStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::open(temp.path().join("library.db")).unwrap();
        store.initialize().await.unwrap();
        (store, temp)
    }

    fn sample_record() -> VideoRecord {
        let source = SourceFile::new("clip.mp4", "video/mp4", Utc::now());
        VideoRecord::build(&source, 1000, ProbeOutcome::default())
    }

    #[tokio::test]
    async fn test_initialize_idempotent() {
        let (store, _temp) = open_store().await;
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();
    }

    #[tokio::test]
    async fn test_put_and_read_both_sides() {
        let (store, _temp) = open_store().await;
        let record = sample_record();
        let id = record.id;

        store.put(record, vec![1, 2, 3]).await.unwrap();

        let meta = store.get_metadata(id).await.unwrap();
        assert_eq!(meta.name, "clip.mp4");
        assert_eq!(meta.size_bytes, 1000);
        assert!(!meta.favorite);

        let payload = store.get_payload(id).await.unwrap();
        assert_eq!(payload, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_timestamps_survive_roundtrip() {
        let (store, _temp) = open_store().await;
        let mut record = sample_record();
        record.duration_seconds = Some(12.5);
        record.apply_progress(0.4, Utc::now());
        let id = record.id;
        let added_at = record.added_at;
        let watched_at = record.last_watched_at.unwrap();

        store.put(record, vec![0]).await.unwrap();
        let meta = store.get_metadata(id).await.unwrap();

        assert_eq!(meta.added_at.timestamp_millis(), added_at.timestamp_millis());
        assert_eq!(
            meta.last_watched_at.unwrap().timestamp_millis(),
            watched_at.timestamp_millis()
        );
        assert_eq!(meta.duration_seconds, Some(12.5));
        assert_eq!(meta.watch_progress, Some(0.4));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (store, _temp) = open_store().await;
        let id = Uuid::new_v4();

        assert!(matches!(
            store.get_metadata(id).await,
            Err(StoreError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(
            store.get_payload(id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_requires_existing_row() {
        let (store, _temp) = open_store().await;
        let record = sample_record();

        assert!(matches!(
            store.update(record).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_overwrites_whole_record() {
        let (store, _temp) = open_store().await;
        let record = sample_record();
        let id = record.id;
        store.put(record, vec![0]).await.unwrap();

        let mut changed = store.get_metadata(id).await.unwrap();
        changed.favorite = true;
        changed.apply_progress(0.5, Utc::now());
        store.update(changed).await.unwrap();

        let meta = store.get_metadata(id).await.unwrap();
        assert!(meta.favorite);
        assert_eq!(meta.watch_progress, Some(0.5));
        assert!(meta.last_watched_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_both_sides_and_is_idempotent() {
        let (store, _temp) = open_store().await;
        let record = sample_record();
        let id = record.id;
        store.put(record, vec![9, 9]).await.unwrap();

        store.delete(id).await.unwrap();
        assert!(matches!(
            store.get_metadata(id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.get_payload(id).await,
            Err(StoreError::NotFound(_))
        ));

        // Second delete of the same id is a no-op success
        store.delete(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_is_atomic_when_payload_write_fails() {
        let (store, _temp) = open_store().await;
        let record = sample_record();
        let id = record.id;

        // Seed a conflicting payload row so the second write of the
        // transaction hits a primary-key violation after the metadata
        // insert already succeeded.
        store
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO payloads (id, data) VALUES (?1, ?2)",
                    params![id, vec![7u8]],
                )
                .map_err(unavailable)?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(matches!(
            store.put(record, vec![1, 2, 3]).await,
            Err(StoreError::Unavailable(_))
        ));

        // The metadata insert was rolled back with the failed transaction
        assert!(matches!(
            store.get_metadata(id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.list_all().await.unwrap().is_empty());

        // The seeded payload row is untouched
        assert_eq!(store.get_payload(id).await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_list_all_returns_every_record() {
        let (store, _temp) = open_store().await;

        for _ in 0..3 {
            store.put(sample_record(), vec![0]).await.unwrap();
        }

        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_usage_reports_file_size() {
        let (store, _temp) = open_store().await;
        store.put(sample_record(), vec![0u8; 4096]).await.unwrap();

        let usage = store.usage().await.unwrap();
        // Either real introspection (both nonzero) or the (0, 0) fallback
        if usage.total > 0 {
            assert!(usage.used > 0);
        } else {
            assert_eq!(usage.used, 0);
        }
    }

    #[tokio::test]
    async fn test_request_persistence_is_best_effort() {
        let (store, _temp) = open_store().await;
        assert!(store.request_persistence().await);
    }
}
