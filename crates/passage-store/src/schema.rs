//! Database schema definitions.

/// Main schema SQL for initializing the database.
///
/// Idempotent: safe to execute on every process start. AUTOINCREMENT keeps
/// assigned ids strictly increasing and never reused, which the indices
/// rely on for stable tie-breaking.
pub const SCHEMA: &str = r#"
-- Passages table
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    doc_id TEXT NOT NULL,
    content TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    source_filename TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    session_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_chunks_doc_id ON chunks(doc_id);
CREATE INDEX IF NOT EXISTS idx_chunks_session_id ON chunks(session_id);
"#;

/// Schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;
