//! Bounded-concurrency ingestion over many influencers.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use influ_core::Influencer;
use influ_db::InsightStore;

use crate::error::{ErrorKind, IngestError, Stage};
use crate::pipeline::{ingest, IngestContext, IngestOutcome, IngestReport};

/// One influencer whose ingestion failed, with enough context to re-run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestFailure {
    pub influencer_id: i64,
    pub stage: Option<Stage>,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&IngestError> for IngestFailure {
    fn from(err: &IngestError) -> Self {
        Self {
            influencer_id: err.influencer_id(),
            stage: err.stage(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Per-influencer results of a batch, each list ordered by influencer id.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: Vec<IngestReport>,
    pub skipped: Vec<i64>,
    pub failures: Vec<IngestFailure>,
}

impl BatchReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failures.len()
    }

    /// True when at least one influencer was attempted and every attempt
    /// failed. Skips are not attempts.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.failures.is_empty() && self.succeeded.is_empty()
    }
}

/// Ingests every distinct influencer, at most `max_concurrent` at a time.
///
/// Identities repeated in `influencers` are ingested once. Per-influencer
/// errors are collected into the report and never abort the batch.
pub async fn run_batch<S>(
    ctx: &IngestContext,
    store: &S,
    influencers: &[Influencer],
    max_concurrent: usize,
) -> BatchReport
where
    S: InsightStore + Sync,
{
    let mut seen = HashSet::new();
    let unique: Vec<&Influencer> = influencers
        .iter()
        .filter(|influencer| seen.insert(influencer.id))
        .collect();

    if unique.len() < influencers.len() {
        tracing::warn!(
            duplicates = influencers.len() - unique.len(),
            "duplicate influencer ids collapsed"
        );
    }

    let results: Vec<(i64, Result<IngestOutcome, IngestError>)> = stream::iter(unique)
        .map(|influencer| async move { (influencer.id, ingest(ctx, store, influencer).await) })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let mut report = BatchReport::default();
    for (influencer_id, result) in results {
        match result {
            Ok(IngestOutcome::Ingested(ingested)) => report.succeeded.push(ingested),
            Ok(IngestOutcome::Skipped) => report.skipped.push(influencer_id),
            Err(err) => report.failures.push(IngestFailure::from(&err)),
        }
    }
    report.succeeded.sort_by_key(|r| r.influencer_id);
    report.skipped.sort_unstable();
    report.failures.sort_by_key(|f| f.influencer_id);

    tracing::info!(
        succeeded = report.succeeded.len(),
        skipped = report.skipped.len(),
        failed = report.failures.len(),
        "batch finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(id: i64) -> IngestFailure {
        IngestFailure {
            influencer_id: id,
            stage: Some(Stage::Profile),
            kind: ErrorKind::Transport,
            message: "boom".to_owned(),
        }
    }

    #[test]
    fn all_failed_requires_an_attempt() {
        assert!(!BatchReport::default().all_failed());

        let only_skips = BatchReport {
            skipped: vec![1, 2],
            ..BatchReport::default()
        };
        assert!(!only_skips.all_failed());

        let failures = BatchReport {
            skipped: vec![1],
            failures: vec![failure(2)],
            ..BatchReport::default()
        };
        assert!(failures.all_failed());
        assert_eq!(failures.total(), 2);
    }

    #[test]
    fn failure_captures_error_context() {
        let err = IngestError::DeadlineExceeded {
            influencer_id: 5,
            secs: 1,
        };
        let failure = IngestFailure::from(&err);
        assert_eq!(failure.influencer_id, 5);
        assert_eq!(failure.kind, ErrorKind::Deadline);
        assert!(failure.stage.is_none());
        assert!(failure.message.contains("deadline"));
    }
}
