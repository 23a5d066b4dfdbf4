//! End-to-end generation pipeline: readiness wait → provider call → block
//! parsing → excerpt → persistence.
//!
//! One linear flow per job. The job record is claimed with a conditional
//! `idle → generating` update, progress is written at each phase, and the
//! run always ends in exactly one terminal status. Failures are recorded on
//! the job best-effort; a secondary failure while recording is captured in
//! [`JobFailure`] rather than silently discarded.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use draftmill_richtext::{extract_excerpt, parse_blocks, split_title};
use draftmill_shared::{
    AppConfig, DocumentId, DraftmillError, JobId, NewDocument, Result,
};
use draftmill_storage::Storage;

use crate::poller::{IndexingObserver, PollOptions, wait_until_ready};
use crate::ports::{CompletionStatus, ContentIndex, GenerationProvider};
use crate::slug::derive_slug;

// ---------------------------------------------------------------------------
// Config & result
// ---------------------------------------------------------------------------

/// Configuration for one generation run.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Readiness-poll parameters.
    pub poll: PollOptions,
    /// Character budget for the derived excerpt.
    pub excerpt_max_chars: usize,
    /// Role used to look up the default author.
    pub author_role: String,
    /// Instructions passed to the generation provider.
    pub instructions: String,
}

impl From<&AppConfig> for GenerationConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            poll: PollOptions {
                max_attempts: config.defaults.poll_attempts,
                interval: Duration::from_millis(config.defaults.poll_interval_ms),
            },
            excerpt_max_chars: config.defaults.excerpt_max_chars,
            author_role: config.defaults.author_role.clone(),
            instructions: config.defaults.instructions.clone(),
        }
    }
}

/// Result of a successful generation run.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Identifier of the persisted document.
    pub document_id: DocumentId,
    /// Document title (extracted or synthesized).
    pub title: String,
    /// URL-safe document slug.
    pub slug: String,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// A failed run: the primary error, plus the outcome of the attempt to
/// record it on the job. The record attempt is best-effort — its failure is
/// captured here and logged, never re-raised over the primary error.
#[derive(Debug)]
pub struct JobFailure {
    pub error: DraftmillError,
    pub record_failure: Option<String>,
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.record_failure {
            Some(secondary) => write!(
                f,
                "{} (additionally, recording the error failed: {secondary})",
                self.error
            ),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for JobFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each readiness poll that is still waiting.
    fn indexing(&self, remaining: u64, attempt: u32);
    /// Called when the pipeline completes.
    fn done(&self, outcome: &GenerationOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn indexing(&self, _remaining: u64, _attempt: u32) {}
    fn done(&self, _outcome: &GenerationOutcome) {}
}

/// Adapts the poller's observer interface onto the job record and the
/// caller's reporter.
struct JobProgress<'a> {
    storage: &'a Storage,
    job_id: &'a JobId,
    reporter: &'a dyn ProgressReporter,
}

impl JobProgress<'_> {
    /// Persist a progress message, best-effort.
    async fn set(&self, message: &str) {
        if let Err(e) = self.storage.set_job_progress(self.job_id, message).await {
            warn!(job_id = %self.job_id, error = %e, "failed to write job progress");
        }
    }
}

#[async_trait]
impl IndexingObserver for JobProgress<'_> {
    async fn indexing_remaining(&self, remaining: u64, attempt: u32) {
        self.reporter.indexing(remaining, attempt);
        self.set(&format!(
            "indexing source material: {remaining} items remaining"
        ))
        .await;
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full generation pipeline for `job_id`.
///
/// 1. Claim the job (`idle → generating`, previous error cleared)
/// 2. Wait for the content index to finish
/// 3. Call the generation provider
/// 4. Extract the title, parse the body, derive the excerpt and slug
/// 5. Persist the document under the default author
/// 6. Mark the job completed
///
/// Every failure is recorded as the job's terminal error status before being
/// returned.
#[instrument(skip_all, fields(job_id = %job_id))]
pub async fn run_generation_job(
    job_id: &JobId,
    config: &GenerationConfig,
    index: &dyn ContentIndex,
    provider: &dyn GenerationProvider,
    storage: &Storage,
    reporter: &dyn ProgressReporter,
) -> std::result::Result<GenerationOutcome, JobFailure> {
    match execute(job_id, config, index, provider, storage, reporter).await {
        Ok(outcome) => {
            reporter.done(&outcome);
            Ok(outcome)
        }
        Err(error) => {
            warn!(job_id = %job_id, error = %error, "generation job failed");
            let record_failure = match storage.fail_job(job_id, &error.to_string()).await {
                Ok(()) => None,
                Err(secondary) => {
                    warn!(
                        job_id = %job_id,
                        error = %secondary,
                        "failed to record job error"
                    );
                    Some(secondary.to_string())
                }
            };
            Err(JobFailure {
                error,
                record_failure,
            })
        }
    }
}

/// The linear pipeline body; any error here becomes the job's terminal state.
async fn execute(
    job_id: &JobId,
    config: &GenerationConfig,
    index: &dyn ContentIndex,
    provider: &dyn GenerationProvider,
    storage: &Storage,
    reporter: &dyn ProgressReporter,
) -> Result<GenerationOutcome> {
    let start = Instant::now();

    let job = storage
        .get_job(job_id)
        .await?
        .ok_or_else(|| DraftmillError::storage(format!("job {job_id} not found")))?;

    if !storage.claim_job(job_id).await? {
        return Err(DraftmillError::generation(format!(
            "job {job_id} is not idle (status: {})",
            job.status
        )));
    }

    let progress = JobProgress {
        storage,
        job_id,
        reporter,
    };

    reporter.phase("Starting generation");
    progress.set("starting").await;

    // --- Phase 1: wait for the content index ---
    reporter.phase("Waiting for content indexing");
    let attempts = wait_until_ready(index, &job.index_id, &config.poll, &progress).await?;
    info!(attempts, index_id = %job.index_id, "content index ready");

    // --- Phase 2: call the generation provider ---
    reporter.phase("Generating content");
    progress.set("generating content").await;

    let output = provider
        .generate(&job.subject_title, &job.index_id, &config.instructions)
        .await?;

    let text = match output.status {
        CompletionStatus::Completed => output
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| DraftmillError::generation("provider returned empty content"))?,
        CompletionStatus::Failed(status) => {
            return Err(DraftmillError::generation(format!(
                "provider run ended with status: {status}"
            )));
        }
    };

    // --- Phase 3: parse into a structured document ---
    reporter.phase("Parsing generated content");
    progress.set("parsing content").await;

    let (title, body) = split_title(&text);
    let title = title.unwrap_or_else(|| format!("Summary: {}", job.subject_title));
    let document = parse_blocks(&body);
    let excerpt = extract_excerpt(&body, config.excerpt_max_chars);
    let slug = derive_slug(&title);

    // --- Phase 4: persist under the default author ---
    reporter.phase("Saving document");
    progress.set("saving document").await;

    let author = storage
        .default_author(&config.author_role)
        .await?
        .ok_or_else(|| DraftmillError::NoAuthor {
            role: config.author_role.clone(),
        })?;

    let content_json = serde_json::to_string(&document)
        .map_err(|e| DraftmillError::storage(format!("failed to serialize document: {e}")))?;

    let document_id = storage
        .insert_document(&NewDocument {
            title: title.clone(),
            slug: slug.clone(),
            content_json,
            excerpt,
            author_id: author.id,
        })
        .await?;

    storage.complete_job(job_id, &document_id).await?;

    let outcome = GenerationOutcome {
        document_id,
        title,
        slug,
        elapsed: start.elapsed(),
    };

    info!(
        document_id = %outcome.document_id,
        title = %outcome.title,
        slug = %outcome.slug,
        elapsed_ms = outcome.elapsed.as_millis(),
        "generation job complete"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{GenerationOutput, IndexCounts};
    use draftmill_shared::JobStatus;
    use uuid::Uuid;

    /// Index that is ready immediately.
    struct ReadyIndex;

    #[async_trait]
    impl ContentIndex for ReadyIndex {
        async fn status(&self, _index_id: &str) -> Result<IndexCounts> {
            Ok(IndexCounts {
                in_progress: 0,
                completed: 4,
            })
        }
    }

    /// Provider returning a fixed response.
    struct FixedProvider {
        output: GenerationOutput,
    }

    impl FixedProvider {
        fn success(text: &str) -> Self {
            Self {
                output: GenerationOutput {
                    status: CompletionStatus::Completed,
                    text: Some(text.to_string()),
                },
            }
        }

        fn failed(status: &str) -> Self {
            Self {
                output: GenerationOutput {
                    status: CompletionStatus::Failed(status.to_string()),
                    text: None,
                },
            }
        }
    }

    #[async_trait]
    impl GenerationProvider for FixedProvider {
        async fn generate(
            &self,
            _subject_title: &str,
            _index_id: &str,
            _instructions: &str,
        ) -> Result<GenerationOutput> {
            Ok(self.output.clone())
        }
    }

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("dm_pipeline_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn test_config() -> GenerationConfig {
        GenerationConfig {
            poll: PollOptions {
                max_attempts: 5,
                interval: Duration::from_millis(1),
            },
            excerpt_max_chars: 500,
            author_role: "author".into(),
            instructions: "write about the subject".into(),
        }
    }

    const SAMPLE_TEXT: &str = "# Observability in Practice\n\n\
        Tracing beats logging for request flows.\n\n\
        ## Getting Started\n\n\
        - instrument the entry points\n\
        - ship the spans somewhere durable\n";

    #[tokio::test]
    async fn successful_run_persists_document_and_completes_job() {
        let storage = test_storage().await;
        storage.insert_author("Mill", "author").await.unwrap();
        let job = storage.insert_job("Observability", "idx-1").await.unwrap();

        let outcome = run_generation_job(
            &job.id,
            &test_config(),
            &ReadyIndex,
            &FixedProvider::success(SAMPLE_TEXT),
            &storage,
            &SilentProgress,
        )
        .await
        .expect("pipeline succeeds");

        assert_eq!(outcome.title, "Observability in Practice");
        assert!(outcome.slug.starts_with("observability-in-practice-"));

        let done = storage.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.document_id.as_ref(), Some(&outcome.document_id));
        assert!(done.error.is_none());

        let doc = storage
            .get_document(&outcome.document_id)
            .await
            .unwrap()
            .expect("document persisted");
        assert_eq!(doc.title, "Observability in Practice");
        assert!(doc.content_json.contains(r#""type":"heading"#));
        assert!(doc.excerpt.starts_with("Tracing beats logging"));
        assert!(doc.excerpt.chars().count() <= 500);
    }

    #[tokio::test]
    async fn missing_h1_synthesizes_summary_title() {
        let storage = test_storage().await;
        storage.insert_author("Mill", "author").await.unwrap();
        let job = storage.insert_job("Async Rust", "idx-1").await.unwrap();

        let outcome = run_generation_job(
            &job.id,
            &test_config(),
            &ReadyIndex,
            &FixedProvider::success("Just a body with no heading."),
            &storage,
            &SilentProgress,
        )
        .await
        .expect("pipeline succeeds");

        assert_eq!(outcome.title, "Summary: Async Rust");
        assert!(outcome.slug.starts_with("summary-async-rust-"));
    }

    #[tokio::test]
    async fn provider_failure_marks_job_error_without_document() {
        let storage = test_storage().await;
        storage.insert_author("Mill", "author").await.unwrap();
        let job = storage.insert_job("Observability", "idx-1").await.unwrap();

        let failure = run_generation_job(
            &job.id,
            &test_config(),
            &ReadyIndex,
            &FixedProvider::failed("cancelled"),
            &storage,
            &SilentProgress,
        )
        .await
        .expect_err("pipeline fails");

        assert!(failure.error.to_string().contains("cancelled"));
        assert!(failure.record_failure.is_none());

        let failed = storage.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Error);
        assert!(failed.error.unwrap().contains("cancelled"));
        assert!(failed.document_id.is_none());
        assert!(storage.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_provider_output_is_a_failure() {
        let storage = test_storage().await;
        storage.insert_author("Mill", "author").await.unwrap();
        let job = storage.insert_job("Observability", "idx-1").await.unwrap();

        let failure = run_generation_job(
            &job.id,
            &test_config(),
            &ReadyIndex,
            &FixedProvider::success("   \n  "),
            &storage,
            &SilentProgress,
        )
        .await
        .expect_err("empty output rejected");

        assert!(failure.error.to_string().contains("empty content"));
    }

    #[tokio::test]
    async fn indexing_timeout_marks_job_error() {
        struct NeverReady;

        #[async_trait]
        impl ContentIndex for NeverReady {
            async fn status(&self, _index_id: &str) -> Result<IndexCounts> {
                Ok(IndexCounts {
                    in_progress: 2,
                    completed: 1,
                })
            }
        }

        let storage = test_storage().await;
        storage.insert_author("Mill", "author").await.unwrap();
        let job = storage.insert_job("Observability", "idx-1").await.unwrap();

        let failure = run_generation_job(
            &job.id,
            &test_config(),
            &NeverReady,
            &FixedProvider::success(SAMPLE_TEXT),
            &storage,
            &SilentProgress,
        )
        .await
        .expect_err("times out");

        assert!(matches!(
            failure.error,
            DraftmillError::IndexingTimeout { attempts: 5 }
        ));

        let failed = storage.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Error);
    }

    #[tokio::test]
    async fn missing_default_author_fails_before_insert() {
        let storage = test_storage().await;
        let job = storage.insert_job("Observability", "idx-1").await.unwrap();

        let failure = run_generation_job(
            &job.id,
            &test_config(),
            &ReadyIndex,
            &FixedProvider::success(SAMPLE_TEXT),
            &storage,
            &SilentProgress,
        )
        .await
        .expect_err("no author available");

        assert!(matches!(failure.error, DraftmillError::NoAuthor { .. }));
        assert!(storage.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_idle_job_is_not_rerun() {
        let storage = test_storage().await;
        storage.insert_author("Mill", "author").await.unwrap();
        let job = storage.insert_job("Observability", "idx-1").await.unwrap();

        run_generation_job(
            &job.id,
            &test_config(),
            &ReadyIndex,
            &FixedProvider::success(SAMPLE_TEXT),
            &storage,
            &SilentProgress,
        )
        .await
        .expect("first run succeeds");

        let failure = run_generation_job(
            &job.id,
            &test_config(),
            &ReadyIndex,
            &FixedProvider::success(SAMPLE_TEXT),
            &storage,
            &SilentProgress,
        )
        .await
        .expect_err("second run rejected");

        assert!(failure.error.to_string().contains("not idle"));

        // The completed job keeps its terminal status and document.
        let done = storage.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.document_id.is_some());
    }

    #[test]
    fn job_failure_display_includes_secondary() {
        let failure = JobFailure {
            error: DraftmillError::generation("provider unavailable"),
            record_failure: Some("db locked".into()),
        };
        let text = failure.to_string();
        assert!(text.contains("provider unavailable"));
        assert!(text.contains("db locked"));
    }
}
