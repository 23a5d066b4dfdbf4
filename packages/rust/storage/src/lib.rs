//! libSQL storage layer for generation jobs, documents, and authors.
//!
//! The [`Storage`] struct is an explicitly constructed, explicitly owned
//! handle — callers open it once and pass it into the orchestrator. Job
//! records are mutated by independent single-statement writes at each
//! progress point; the only guarded transition is [`Storage::claim_job`],
//! which moves a job from `idle` to `generating` with a conditional update
//! so that a job already claimed or finished cannot be re-entered.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use draftmill_shared::{
    AuthorRecord, DocumentId, DocumentRecord, DraftmillError, JobId, JobRecord, JobStatus,
    NewDocument, Result,
};
use libsql::{Connection, Database, params};
use uuid::Uuid;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DraftmillError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        DraftmillError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Job operations
    // -----------------------------------------------------------------------

    /// Create a new idle generation job. Returns the full record.
    pub async fn insert_job(&self, subject_title: &str, index_id: &str) -> Result<JobRecord> {
        let job = JobRecord {
            id: JobId::new(),
            subject_title: subject_title.to_string(),
            index_id: index_id.to_string(),
            status: JobStatus::Idle,
            progress: None,
            error: None,
            document_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        self.conn
            .execute(
                "INSERT INTO jobs (id, subject_title, index_id, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    job.id.to_string(),
                    job.subject_title.as_str(),
                    job.index_id.as_str(),
                    job.status.as_str(),
                    job.created_at.to_rfc3339(),
                    job.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;
        Ok(job)
    }

    /// Get a job by ID.
    pub async fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, subject_title, index_id, status, progress, error, document_id,
                        created_at, updated_at
                 FROM jobs WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_job(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DraftmillError::Storage(e.to_string())),
        }
    }

    /// List all jobs, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, subject_title, index_id, status, progress, error, document_id,
                        created_at, updated_at
                 FROM jobs ORDER BY created_at DESC",
                params![],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_job(&row)?);
        }
        Ok(results)
    }

    /// Claim an idle job for generation, clearing any previous error.
    ///
    /// Conditional update: returns `false` when the job was not in `idle`
    /// (already claimed by another run, or already terminal). This is what
    /// keeps the status sequence monotonic under duplicate triggers.
    pub async fn claim_job(&self, id: &JobId) -> Result<bool> {
        let affected = self
            .conn
            .execute(
                "UPDATE jobs SET status = 'generating', error = NULL, updated_at = ?1
                 WHERE id = ?2 AND status = 'idle'",
                params![Utc::now().to_rfc3339(), id.to_string()],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Write the job's human-readable progress message.
    pub async fn set_job_progress(&self, id: &JobId, message: &str) -> Result<()> {
        self.conn
            .execute(
                "UPDATE jobs SET progress = ?1, updated_at = ?2 WHERE id = ?3",
                params![message, Utc::now().to_rfc3339(), id.to_string()],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Mark a job completed and attach the produced document reference.
    pub async fn complete_job(&self, id: &JobId, document_id: &DocumentId) -> Result<()> {
        self.conn
            .execute(
                "UPDATE jobs SET status = 'completed', document_id = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = 'generating'",
                params![
                    document_id.to_string(),
                    Utc::now().to_rfc3339(),
                    id.to_string()
                ],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Mark a job failed with an error message.
    pub async fn fail_job(&self, id: &JobId, message: &str) -> Result<()> {
        self.conn
            .execute(
                "UPDATE jobs SET status = 'error', error = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = 'generating'",
                params![message, Utc::now().to_rfc3339(), id.to_string()],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Document operations
    // -----------------------------------------------------------------------

    /// Insert a produced document. Returns the generated identifier.
    pub async fn insert_document(&self, doc: &NewDocument) -> Result<DocumentId> {
        let id = DocumentId::new();
        self.conn
            .execute(
                "INSERT INTO documents (id, title, slug, content_json, excerpt, author_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.to_string(),
                    doc.title.as_str(),
                    doc.slug.as_str(),
                    doc.content_json.as_str(),
                    doc.excerpt.as_str(),
                    doc.author_id.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Get a document by ID.
    pub async fn get_document(&self, id: &DocumentId) -> Result<Option<DocumentRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, slug, content_json, excerpt, author_id, created_at
                 FROM documents WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_document(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DraftmillError::Storage(e.to_string())),
        }
    }

    /// List all documents, newest first.
    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, slug, content_json, excerpt, author_id, created_at
                 FROM documents ORDER BY created_at DESC",
                params![],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_document(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Author operations
    // -----------------------------------------------------------------------

    /// Insert an author. Returns the full record.
    pub async fn insert_author(&self, name: &str, role: &str) -> Result<AuthorRecord> {
        let author = AuthorRecord {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            role: role.to_string(),
        };
        self.conn
            .execute(
                "INSERT INTO authors (id, name, role, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    author.id.as_str(),
                    author.name.as_str(),
                    author.role.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;
        Ok(author)
    }

    /// Look up the default author for a role (the oldest matching record).
    pub async fn default_author(&self, role: &str) -> Result<Option<AuthorRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, role FROM authors WHERE role = ?1
                 ORDER BY created_at ASC LIMIT 1",
                params![role],
            )
            .await
            .map_err(|e| DraftmillError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(AuthorRecord {
                id: row
                    .get::<String>(0)
                    .map_err(|e| DraftmillError::Storage(e.to_string()))?,
                name: row
                    .get::<String>(1)
                    .map_err(|e| DraftmillError::Storage(e.to_string()))?,
                role: row
                    .get::<String>(2)
                    .map_err(|e| DraftmillError::Storage(e.to_string()))?,
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(DraftmillError::Storage(e.to_string())),
        }
    }
}

/// Convert a database row to a [`JobRecord`].
fn row_to_job(row: &libsql::Row) -> Result<JobRecord> {
    Ok(JobRecord {
        id: parse_col::<JobId>(row, 0, "job id")?,
        subject_title: get_text(row, 1)?,
        index_id: get_text(row, 2)?,
        status: row
            .get::<String>(3)
            .map_err(|e| DraftmillError::Storage(e.to_string()))?
            .parse::<JobStatus>()
            .map_err(DraftmillError::Storage)?,
        progress: row.get::<String>(4).ok(),
        error: row.get::<String>(5).ok(),
        document_id: row
            .get::<String>(6)
            .ok()
            .map(|s| {
                s.parse::<DocumentId>()
                    .map_err(|e| DraftmillError::Storage(format!("invalid document id: {e}")))
            })
            .transpose()?,
        created_at: parse_timestamp(row, 7)?,
        updated_at: parse_timestamp(row, 8)?,
    })
}

/// Convert a database row to a [`DocumentRecord`].
fn row_to_document(row: &libsql::Row) -> Result<DocumentRecord> {
    Ok(DocumentRecord {
        id: parse_col::<DocumentId>(row, 0, "document id")?,
        title: get_text(row, 1)?,
        slug: get_text(row, 2)?,
        content_json: get_text(row, 3)?,
        excerpt: get_text(row, 4)?,
        author_id: get_text(row, 5)?,
        created_at: parse_timestamp(row, 6)?,
    })
}

fn get_text(row: &libsql::Row, idx: i32) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| DraftmillError::Storage(e.to_string()))
}

fn parse_col<T>(row: &libsql::Row, idx: i32, what: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_text(row, idx)?
        .parse::<T>()
        .map_err(|e| DraftmillError::Storage(format!("invalid {what}: {e}")))
}

fn parse_timestamp(row: &libsql::Row, idx: i32) -> Result<DateTime<Utc>> {
    let s = get_text(row, idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DraftmillError::Storage(format!("invalid date: {e}")))
}
