//! Collaborator ports consumed by the generation pipeline.
//!
//! The content index and the generation provider are external services; the
//! orchestrator only sees these traits. HTTP-backed implementations live in
//! `draftmill-provider`, and tests substitute in-process fakes.

use async_trait::async_trait;
use draftmill_shared::Result;

/// Indexing progress counts reported by the content index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCounts {
    /// Items still being indexed.
    pub in_progress: u64,
    /// Items already searchable.
    pub completed: u64,
}

/// How a provider run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionStatus {
    /// The provider produced output normally.
    Completed,
    /// Any non-success terminal state, with the provider's own wording.
    Failed(String),
}

/// Output of one generation provider call.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub status: CompletionStatus,
    /// Generated prose; absent or blank counts as a generation failure.
    pub text: Option<String>,
}

/// External service that ingests source documents and reports indexing
/// completion counts.
#[async_trait]
pub trait ContentIndex: Send + Sync {
    /// Current indexing counts for `index_id`.
    async fn status(&self, index_id: &str) -> Result<IndexCounts>;
}

/// External capability that, given a subject and an index reference, returns
/// generated prose.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(
        &self,
        subject_title: &str,
        index_id: &str,
        instructions: &str,
    ) -> Result<GenerationOutput>;
}
