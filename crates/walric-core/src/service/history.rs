use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;

use super::SubmissionService;
use crate::{
    CoreResult, HistoryEntry, LOG_TARGET, Repository as _, ResolvedHistoryEntry, Submission,
    Validator,
};

#[derive(Clone)]
pub struct HistoryService {
    repo: Arc<Validator>,
    submissions: SubmissionService,
}

impl HistoryService {
    pub fn new(repo: Arc<Validator>, submissions: SubmissionService) -> Self {
        Self { repo, submissions }
    }

    /// Record `submission` as selected right now
    ///
    /// The submission must already be stored.
    pub async fn save(&self, submission: &Submission) -> CoreResult<HistoryEntry> {
        let entry = self
            .repo
            .history_create(HistoryEntry {
                id: 0,
                date: OffsetDateTime::now_utc(),
                submission_id: submission.id,
            })
            .await?;
        info!(
            target: LOG_TARGET,
            post_id = %submission.post_id,
            entry_id = entry.id,
            "Recorded selection"
        );
        Ok(entry)
    }

    pub async fn current(&self) -> CoreResult<ResolvedHistoryEntry> {
        let entry = self.repo.history_get_current().await?;
        self.resolve(entry).await
    }

    pub async fn all(&self) -> CoreResult<Vec<ResolvedHistoryEntry>> {
        let mut resolved = vec![];
        for entry in self.repo.history_get_all().await? {
            resolved.push(self.resolve(entry).await?);
        }
        Ok(resolved)
    }

    async fn resolve(&self, entry: HistoryEntry) -> CoreResult<ResolvedHistoryEntry> {
        let submission = self
            .submissions
            .resolve(self.repo.submission_get_by_id(entry.submission_id).await?)
            .await?;
        Ok(ResolvedHistoryEntry { entry, submission })
    }
}
