//! Readiness wait for the external content index.
//!
//! A blocking retry loop with a fixed interval: no backoff, no jitter, no
//! cancellation. Once started it runs until the index reports zero items in
//! progress or the attempt budget is exhausted.

use std::time::Duration;

use async_trait::async_trait;
use draftmill_shared::{DraftmillError, Result};
use tracing::{debug, instrument};

use crate::ports::ContentIndex;

/// Poll loop parameters.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Attempts before giving up with [`DraftmillError::IndexingTimeout`].
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            max_attempts: 120,
            interval: Duration::from_secs(1),
        }
    }
}

/// Receives the remaining in-progress count between attempts.
#[async_trait]
pub trait IndexingObserver: Send + Sync {
    async fn indexing_remaining(&self, remaining: u64, attempt: u32);
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

#[async_trait]
impl IndexingObserver for SilentObserver {
    async fn indexing_remaining(&self, _remaining: u64, _attempt: u32) {}
}

/// Wait until the content index reports zero items in progress.
///
/// Returns the number of attempts made. The observer is notified of the
/// remaining count after every attempt that is still waiting.
#[instrument(skip_all, fields(index_id = %index_id))]
pub async fn wait_until_ready(
    index: &dyn ContentIndex,
    index_id: &str,
    opts: &PollOptions,
    observer: &dyn IndexingObserver,
) -> Result<u32> {
    for attempt in 1..=opts.max_attempts {
        let counts = index.status(index_id).await?;

        if counts.in_progress == 0 {
            debug!(attempt, completed = counts.completed, "content index ready");
            return Ok(attempt);
        }

        observer
            .indexing_remaining(counts.in_progress, attempt)
            .await;
        tokio::time::sleep(opts.interval).await;
    }

    Err(DraftmillError::IndexingTimeout {
        attempts: opts.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::IndexCounts;
    use std::sync::Mutex;

    /// Fake index that replays a fixed sequence of in-progress counts.
    struct ScriptedIndex {
        counts: Mutex<Vec<u64>>,
    }

    impl ScriptedIndex {
        fn new(counts: &[u64]) -> Self {
            let mut seq: Vec<u64> = counts.to_vec();
            seq.reverse();
            Self {
                counts: Mutex::new(seq),
            }
        }
    }

    #[async_trait]
    impl ContentIndex for ScriptedIndex {
        async fn status(&self, _index_id: &str) -> Result<IndexCounts> {
            let mut counts = self.counts.lock().unwrap();
            let in_progress = counts.pop().unwrap_or(0);
            Ok(IndexCounts {
                in_progress,
                completed: 10,
            })
        }
    }

    /// Observer that records every notification.
    struct Recorder {
        seen: Mutex<Vec<(u64, u32)>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl IndexingObserver for Recorder {
        async fn indexing_remaining(&self, remaining: u64, attempt: u32) {
            self.seen.lock().unwrap().push((remaining, attempt));
        }
    }

    fn fast_opts(max_attempts: u32) -> PollOptions {
        PollOptions {
            max_attempts,
            interval: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn succeeds_when_counts_reach_zero() {
        let index = ScriptedIndex::new(&[3, 1, 0]);
        let recorder = Recorder::new();

        let attempts = wait_until_ready(&index, "idx-1", &fast_opts(120), &recorder)
            .await
            .expect("index becomes ready");

        assert_eq!(attempts, 3);
        assert_eq!(*recorder.seen.lock().unwrap(), vec![(3, 1), (1, 2)]);
    }

    #[tokio::test]
    async fn immediate_readiness_notifies_nobody() {
        let index = ScriptedIndex::new(&[0]);
        let recorder = Recorder::new();

        let attempts = wait_until_ready(&index, "idx-1", &fast_opts(120), &recorder)
            .await
            .expect("already ready");

        assert_eq!(attempts, 1);
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exhaustion_yields_timeout() {
        let index = ScriptedIndex::new(&[5, 5, 5, 5, 5]);

        let err = wait_until_ready(&index, "idx-1", &fast_opts(3), &SilentObserver)
            .await
            .expect_err("never ready");

        match err {
            DraftmillError::IndexingTimeout { attempts } => assert_eq!(attempts, 3),
            other => panic!("expected IndexingTimeout, got {other}"),
        }
    }

    #[tokio::test]
    async fn index_errors_propagate() {
        struct BrokenIndex;

        #[async_trait]
        impl ContentIndex for BrokenIndex {
            async fn status(&self, _index_id: &str) -> Result<IndexCounts> {
                Err(DraftmillError::Network("connection refused".into()))
            }
        }

        let err = wait_until_ready(&BrokenIndex, "idx-1", &fast_opts(3), &SilentObserver)
            .await
            .expect_err("index call fails");
        assert!(matches!(err, DraftmillError::Network(_)));
    }
}
