//! SQLite-backed file store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::store::{FileStore, StoreError};
use super::types::{FileStatus, MetadataValue, TrackedFile};

/// SQLite-backed tracked file store.
pub struct SqliteFileStore {
    conn: Mutex<Connection>,
}

impl SqliteFileStore {
    /// Opens the store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tracked_files (
                content_hash TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                original_path TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                status TEXT NOT NULL,
                suggested_category TEXT,
                confidence REAL,
                confirmed_category TEXT,
                target_path TEXT,
                moved_to_path TEXT,
                last_error TEXT,
                last_error_at TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                classified_at TEXT,
                moved_at TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tracked_files_status ON tracked_files(status);
            CREATE INDEX IF NOT EXISTS idx_tracked_files_active ON tracked_files(active);
            CREATE INDEX IF NOT EXISTS idx_tracked_files_updated_at ON tracked_files(updated_at);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<TrackedFile> {
        let metadata_json: String = row.get(14)?;
        let metadata: std::collections::BTreeMap<String, MetadataValue> =
            serde_json::from_str(&metadata_json).unwrap_or_default();

        let status_str: String = row.get(4)?;
        let status: FileStatus =
            serde_json::from_str(&format!("\"{status_str}\"")).unwrap_or(FileStatus::New);

        Ok(TrackedFile {
            content_hash: row.get(0)?,
            file_name: row.get(1)?,
            original_path: std::path::PathBuf::from(row.get::<_, String>(2)?),
            size_bytes: row.get::<_, i64>(3)? as u64,
            status,
            suggested_category: row.get(5)?,
            confidence: row.get(6)?,
            confirmed_category: row.get(7)?,
            target_path: row.get::<_, Option<String>>(8)?.map(Into::into),
            moved_to_path: row.get::<_, Option<String>>(9)?.map(Into::into),
            last_error: row.get(10)?,
            last_error_at: parse_timestamp_opt(row.get(11)?),
            retry_count: row.get(12)?,
            active: row.get::<_, i64>(13)? != 0,
            metadata,
            created_at: parse_timestamp(row.get(15)?),
            classified_at: parse_timestamp_opt(row.get(16)?),
            moved_at: parse_timestamp_opt(row.get(17)?),
            updated_at: parse_timestamp(row.get(18)?),
        })
    }

    const SELECT_COLUMNS: &'static str = "content_hash, file_name, original_path, size_bytes, \
         status, suggested_category, confidence, confirmed_category, target_path, moved_to_path, \
         last_error, last_error_at, retry_count, active, metadata, created_at, classified_at, \
         moved_at, updated_at";

    fn write_row(conn: &Connection, sql: &str, file: &TrackedFile) -> Result<usize, StoreError> {
        let metadata_json = serde_json::to_string(&file.metadata)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute(
            sql,
            params![
                file.content_hash,
                file.file_name,
                file.original_path.to_string_lossy(),
                file.size_bytes as i64,
                file.status.as_str(),
                file.suggested_category,
                file.confidence,
                file.confirmed_category,
                file.target_path.as_ref().map(|p| p.to_string_lossy().to_string()),
                file.moved_to_path.as_ref().map(|p| p.to_string_lossy().to_string()),
                file.last_error,
                file.last_error_at.map(|t| t.to_rfc3339()),
                file.retry_count,
                file.active as i64,
                metadata_json,
                file.created_at.to_rfc3339(),
                file.classified_at.map(|t| t.to_rfc3339()),
                file.moved_at.map(|t| t.to_rfc3339()),
                file.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))
    }
}

fn parse_timestamp(value: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_timestamp_opt(value: Option<String>) -> Option<DateTime<Utc>> {
    value.map(parse_timestamp)
}

impl FileStore for SqliteFileStore {
    fn insert(&self, file: &TrackedFile) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM tracked_files WHERE content_hash = ?1",
                params![file.content_hash],
                |_| Ok(true),
            )
            .map(|_| true)
            .unwrap_or(false);
        if exists {
            return Err(StoreError::DuplicateHash(file.content_hash.clone()));
        }

        Self::write_row(
            &conn,
            "INSERT INTO tracked_files (content_hash, file_name, original_path, size_bytes, \
             status, suggested_category, confidence, confirmed_category, target_path, \
             moved_to_path, last_error, last_error_at, retry_count, active, metadata, \
             created_at, classified_at, moved_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            file,
        )?;
        Ok(())
    }

    fn save(&self, file: &TrackedFile) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let changed = Self::write_row(
            &conn,
            "UPDATE tracked_files SET file_name = ?2, original_path = ?3, size_bytes = ?4, \
             status = ?5, suggested_category = ?6, confidence = ?7, confirmed_category = ?8, \
             target_path = ?9, moved_to_path = ?10, last_error = ?11, last_error_at = ?12, \
             retry_count = ?13, active = ?14, metadata = ?15, created_at = ?16, \
             classified_at = ?17, moved_at = ?18, updated_at = ?19 \
             WHERE content_hash = ?1",
            file,
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(file.content_hash.clone()));
        }
        Ok(())
    }

    fn find_by_hash(&self, hash: &str) -> Result<Option<TrackedFile>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM tracked_files WHERE content_hash = ?1",
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut rows = stmt
            .query_map(params![hash], Self::row_to_file)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match rows.next() {
            Some(row) => Ok(Some(row.map_err(|e| StoreError::Database(e.to_string()))?)),
            None => Ok(None),
        }
    }

    fn find_by_hashes(&self, hashes: &[String]) -> Result<Vec<TrackedFile>, StoreError> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();

        let placeholders = (1..=hashes.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM tracked_files WHERE content_hash IN ({placeholders})",
            Self::SELECT_COLUMNS
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(rusqlite::params_from_iter(hashes.iter()), Self::row_to_file)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn find_by_status(&self, status: FileStatus) -> Result<Vec<TrackedFile>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM tracked_files WHERE status = ?1 AND active = 1 ORDER BY created_at",
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![status.as_str()], Self::row_to_file)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn all_active(&self) -> Result<Vec<TrackedFile>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM tracked_files WHERE active = 1 ORDER BY created_at",
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_file)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
