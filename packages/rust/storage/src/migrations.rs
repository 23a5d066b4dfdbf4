//! SQL migration definitions for the Draftmill database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: authors, jobs, documents",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Authors available for document attribution
CREATE TABLE IF NOT EXISTS authors (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    role       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_authors_role ON authors(role);

-- Produced rich-text documents
CREATE TABLE IF NOT EXISTS documents (
    id           TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    slug         TEXT NOT NULL UNIQUE,
    content_json TEXT NOT NULL,
    excerpt      TEXT NOT NULL,
    author_id    TEXT NOT NULL REFERENCES authors(id),
    created_at   TEXT NOT NULL
);

-- Generation jobs and their lifecycle state
CREATE TABLE IF NOT EXISTS jobs (
    id            TEXT PRIMARY KEY,
    subject_title TEXT NOT NULL,
    index_id      TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'idle',
    progress      TEXT,
    error         TEXT,
    document_id   TEXT REFERENCES documents(id),
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
