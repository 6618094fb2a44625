//! SQLite-based metadata store implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info};

use passage_core::{MetadataStore, NewPassage, Passage, PassageError, Result, Stats};

use crate::schema::SCHEMA;

/// SQLite-based store implementation.
///
/// Uses a blocking Mutex for thread-safe access; the underlying
/// transactional guarantees serialize id assignment, so identifiers never
/// collide even under concurrent ingestion.
pub struct SqliteStore {
    /// Connection wrapped in blocking Mutex.
    conn: Arc<Mutex<Connection>>,
}

// Manually implement Send + Sync since Connection is protected by Mutex
unsafe impl Send for SqliteStore {}
unsafe impl Sync for SqliteStore {}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| PassageError::database(format!("Failed to open database: {}", e)))?;

        Self::init(conn, path)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            PassageError::database(format!("Failed to open in-memory database: {}", e))
        })?;

        Self::init(conn, Path::new(":memory:"))
    }

    /// Initialize the store with a connection.
    fn init(conn: Connection, path: &Path) -> Result<Self> {
        Self::configure_connection(&conn)?;

        // Idempotent schema creation, run on every open
        conn.execute_batch(SCHEMA)
            .map_err(|e| PassageError::database(format!("Failed to initialize schema: {}", e)))?;

        info!("Database opened at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Configure SQLite connection for optimal performance.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 30000;
            PRAGMA temp_store = MEMORY;
            "#,
        )
        .map_err(|e| PassageError::database(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PassageError::database(e.to_string()))?;
        f(&conn)
    }

    fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn row_to_passage(row: &rusqlite::Row<'_>) -> rusqlite::Result<Passage> {
        Ok(Passage {
            id: row.get(0)?,
            doc_id: row.get(1)?,
            content: row.get(2)?,
            chunk_index: row.get(3)?,
            source_filename: row.get(4)?,
            created_at: row.get(5)?,
            session_id: row.get(6)?,
        })
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn insert_passage(&self, passage: NewPassage) -> Result<i64> {
        let created_at = Self::now_millis();

        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO chunks (doc_id, content, chunk_index, source_filename, created_at, session_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    passage.doc_id,
                    passage.content,
                    passage.chunk_index,
                    passage.source_filename,
                    created_at,
                    passage.session_id,
                ],
            )
            .map_err(|e| PassageError::database(format!("Failed to insert passage: {}", e)))?;

            let id = conn.last_insert_rowid();
            debug!("Inserted passage {} for doc {}", id, passage.doc_id);
            Ok(id)
        })
    }

    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, Passage>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                r#"
                SELECT id, doc_id, content, chunk_index, source_filename, created_at, session_id
                FROM chunks WHERE id IN ({})
                "#,
                placeholders
            );

            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| PassageError::database(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params_from_iter(ids.iter()), |row| {
                    Self::row_to_passage(row)
                })
                .map_err(|e| PassageError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| PassageError::database(e.to_string()))?;

            // Missing ids are silently omitted, not an error
            Ok(rows.into_iter().map(|p| (p.id, p)).collect())
        })
    }

    async fn fetch_all(&self) -> Result<Vec<(i64, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, content FROM chunks ORDER BY id")
                .map_err(|e| PassageError::database(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(|e| PassageError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| PassageError::database(e.to_string()))?;

            Ok(rows)
        })
    }

    async fn stats(&self) -> Result<Stats> {
        self.with_conn(|conn| {
            let passages: u64 = conn
                .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                .map_err(|e| PassageError::database(e.to_string()))?;

            let documents: u64 = conn
                .query_row("SELECT COUNT(DISTINCT doc_id) FROM chunks", [], |row| {
                    row.get(0)
                })
                .map_err(|e| PassageError::database(e.to_string()))?;

            // Page count and page size estimate on-disk storage
            let page_count: u64 = conn
                .query_row("PRAGMA page_count", [], |row| row.get(0))
                .unwrap_or(0);
            let page_size: u64 = conn
                .query_row("PRAGMA page_size", [], |row| row.get(0))
                .unwrap_or(4096);

            Ok(Stats {
                documents,
                passages,
                storage_bytes: page_count * page_size,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_passage(doc: &str, content: &str, idx: u32, session: Option<&str>) -> NewPassage {
        NewPassage {
            doc_id: doc.to_string(),
            content: content.to_string(),
            chunk_index: idx,
            source_filename: doc.to_string(),
            session_id: session.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_strictly_increasing_ids() {
        let store = SqliteStore::open_memory().unwrap();

        let mut last = 0;
        for i in 0..5 {
            let id = store
                .insert_passage(new_passage("doc.txt", "some text", i, Some("s1")))
                .await
                .unwrap();
            assert!(id > last);
            last = id;
        }
    }

    #[tokio::test]
    async fn test_fetch_by_ids_omits_missing() {
        let store = SqliteStore::open_memory().unwrap();

        let id = store
            .insert_passage(new_passage("doc.txt", "hello", 0, None))
            .await
            .unwrap();

        let rows = store.fetch_by_ids(&[id, id + 100]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[&id].content, "hello");
    }

    #[tokio::test]
    async fn test_fetch_by_ids_empty_input() {
        let store = SqliteStore::open_memory().unwrap();
        let rows = store.fetch_by_ids(&[]).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_ascending_order() {
        let store = SqliteStore::open_memory().unwrap();

        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            store
                .insert_passage(new_passage("doc.txt", text, i as u32, None))
                .await
                .unwrap();
        }

        let rows = store.fetch_all().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(rows[0].1, "a");
        assert_eq!(rows[2].1, "c");
    }

    #[tokio::test]
    async fn test_session_id_round_trip() {
        let store = SqliteStore::open_memory().unwrap();

        let with = store
            .insert_passage(new_passage("doc.txt", "scoped", 0, Some("s1")))
            .await
            .unwrap();
        let without = store
            .insert_passage(new_passage("doc.txt", "unscoped", 1, None))
            .await
            .unwrap();

        let rows = store.fetch_by_ids(&[with, without]).await.unwrap();
        assert_eq!(rows[&with].session_id.as_deref(), Some("s1"));
        assert_eq!(rows[&without].session_id, None);
    }

    #[tokio::test]
    async fn test_schema_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunks.db");

        let store = SqliteStore::open(&path).unwrap();
        let id = store
            .insert_passage(new_passage("doc.txt", "persisted", 0, None))
            .await
            .unwrap();
        drop(store);

        // Re-opening re-runs the schema batch and must not clobber rows
        let store = SqliteStore::open(&path).unwrap();
        let rows = store.fetch_by_ids(&[id]).await.unwrap();
        assert_eq!(rows[&id].content, "persisted");
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let store = SqliteStore::open_memory().unwrap();

        store
            .insert_passage(new_passage("a.txt", "one", 0, None))
            .await
            .unwrap();
        store
            .insert_passage(new_passage("a.txt", "two", 1, None))
            .await
            .unwrap();
        store
            .insert_passage(new_passage("b.txt", "three", 0, None))
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.passages, 3);
        assert_eq!(stats.documents, 2);
    }
}
