use std::sync::Arc;

use async_trait::async_trait;
use snafu::ensure;
use tracing::debug;

use crate::{
    AlreadyRegisteredSnafu, CoreResult, EmptyFieldSnafu, EmptySearchTextSnafu, Entity,
    HistoryEntry, InvalidIdSnafu, LOG_TARGET, Repository, Resolution, Submission, Subreddit,
    SubredditStats,
};

/// Normalizes and checks every call before handing it to the wrapped storage
///
/// Implements [`Repository`] itself, so it can stand wherever storage is
/// expected.
pub struct Validator {
    inner: Arc<dyn Repository>,
}

impl Validator {
    pub fn new(inner: Arc<dyn Repository>) -> Self {
        Self { inner }
    }
}

fn ensure_id(entity: Entity, id: u64) -> CoreResult<u64> {
    ensure!(0 < id, InvalidIdSnafu { entity, id });
    Ok(id)
}

fn ensure_unset_id(entity: Entity, id: u64) -> CoreResult<()> {
    ensure!(id == 0, InvalidIdSnafu { entity, id });
    Ok(())
}

fn non_empty<'s>(entity: Entity, field: &'static str, value: &'s str) -> CoreResult<&'s str> {
    let value = value.trim();
    ensure!(!value.is_empty(), EmptyFieldSnafu { entity, field });
    Ok(value)
}

#[async_trait]
impl Repository for Validator {
    async fn subreddit_create(&self, mut subreddit: Subreddit) -> CoreResult<Subreddit> {
        subreddit.name = non_empty(Entity::Subreddit, "name", &subreddit.name)?.to_owned();
        ensure_unset_id(Entity::Subreddit, subreddit.id)?;
        if self
            .inner
            .subreddit_is_name_registered(&subreddit.name)
            .await?
        {
            return AlreadyRegisteredSnafu {
                entity: Entity::Subreddit,
                field: "name",
                value: subreddit.name,
            }
            .fail();
        }

        debug!(target: LOG_TARGET, name = %subreddit.name, "Creating subreddit");
        self.inner.subreddit_create(subreddit).await
    }

    async fn subreddit_get_by_id(&self, id: u64) -> CoreResult<Subreddit> {
        self.inner
            .subreddit_get_by_id(ensure_id(Entity::Subreddit, id)?)
            .await
    }

    async fn subreddit_get_by_name(&self, name: &str) -> CoreResult<Subreddit> {
        self.inner
            .subreddit_get_by_name(non_empty(Entity::Subreddit, "name", name)?)
            .await
    }

    async fn subreddit_get_all(&self) -> CoreResult<Vec<Subreddit>> {
        self.inner.subreddit_get_all().await
    }

    async fn subreddit_get_stats(&self) -> CoreResult<Vec<SubredditStats>> {
        self.inner.subreddit_get_stats().await
    }

    async fn subreddit_is_name_registered(&self, name: &str) -> CoreResult<bool> {
        self.inner
            .subreddit_is_name_registered(non_empty(Entity::Subreddit, "name", name)?)
            .await
    }

    async fn submission_create(&self, mut submission: Submission) -> CoreResult<Submission> {
        ensure_id(Entity::Subreddit, submission.subreddit_id)?;
        ensure_unset_id(Entity::Submission, submission.id)?;

        submission.post_id =
            non_empty(Entity::Submission, "post ID", &submission.post_id)?.to_owned();
        if self
            .inner
            .submission_is_post_id_registered(&submission.post_id)
            .await?
        {
            return AlreadyRegisteredSnafu {
                entity: Entity::Submission,
                field: "post ID",
                value: submission.post_id,
            }
            .fail();
        }

        submission.title = non_empty(Entity::Submission, "title", &submission.title)?.to_owned();

        debug!(target: LOG_TARGET, post_id = %submission.post_id, "Creating submission");
        self.inner.submission_create(submission).await
    }

    async fn submission_get_by_id(&self, id: u64) -> CoreResult<Submission> {
        self.inner
            .submission_get_by_id(ensure_id(Entity::Submission, id)?)
            .await
    }

    async fn submission_get_by_post_id(&self, post_id: &str) -> CoreResult<Submission> {
        self.inner
            .submission_get_by_post_id(non_empty(Entity::Submission, "post ID", post_id)?)
            .await
    }

    async fn submission_get_by_min_resolution(
        &self,
        min: Resolution,
    ) -> CoreResult<Vec<Submission>> {
        self.inner
            .submission_get_by_min_resolution(min.validate()?)
            .await
    }

    async fn submission_search(&self, text: &str) -> CoreResult<Vec<Submission>> {
        let text = text.trim();
        ensure!(!text.is_empty(), EmptySearchTextSnafu);
        self.inner.submission_search(text).await
    }

    async fn submission_get_random(&self, min: Resolution) -> CoreResult<Submission> {
        self.inner.submission_get_random(min.validate()?).await
    }

    async fn submission_is_post_id_registered(&self, post_id: &str) -> CoreResult<bool> {
        self.inner
            .submission_is_post_id_registered(non_empty(Entity::Submission, "post ID", post_id)?)
            .await
    }

    async fn history_create(&self, entry: HistoryEntry) -> CoreResult<HistoryEntry> {
        ensure_id(Entity::Submission, entry.submission_id)?;
        self.inner.history_create(entry).await
    }

    async fn history_get_all(&self) -> CoreResult<Vec<HistoryEntry>> {
        self.inner.history_get_all().await
    }

    async fn history_get_current(&self) -> CoreResult<HistoryEntry> {
        self.inner.history_get_current().await
    }
}
