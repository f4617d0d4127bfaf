use std::sync::Arc;

use tracing::debug;

use crate::{CoreResult, LOG_TARGET, Repository as _, Subreddit, SubredditStats, Validator};

#[derive(Clone)]
pub struct SubredditService {
    repo: Arc<Validator>,
}

impl SubredditService {
    pub fn new(repo: Arc<Validator>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, name: &str) -> CoreResult<Subreddit> {
        self.repo.subreddit_create(Subreddit::new(name)).await
    }

    pub async fn by_id(&self, id: u64) -> CoreResult<Subreddit> {
        self.repo.subreddit_get_by_id(id).await
    }

    pub async fn by_name(&self, name: &str) -> CoreResult<Subreddit> {
        self.repo.subreddit_get_by_name(name).await
    }

    /// Existing subreddit by `name`, created first if needed
    pub async fn get_or_create_by_name(&self, name: &str) -> CoreResult<Subreddit> {
        match self.repo.subreddit_get_by_name(name).await {
            Err(err) if err.is_not_found() => {}
            res => return res,
        }

        match self.create(name).await {
            // Someone else created it in the meantime
            Err(err) if err.is_already_registered() => {
                debug!(target: LOG_TARGET, %name, "Subreddit created concurrently");
                self.repo.subreddit_get_by_name(name).await
            }
            res => res,
        }
    }

    pub async fn all(&self) -> CoreResult<Vec<Subreddit>> {
        self.repo.subreddit_get_all().await
    }

    pub async fn stats(&self) -> CoreResult<Vec<SubredditStats>> {
        self.repo.subreddit_get_stats().await
    }
}
