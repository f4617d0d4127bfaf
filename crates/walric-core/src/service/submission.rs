use std::collections::HashMap;
use std::sync::Arc;

use snafu::OptionExt as _;

use crate::{
    CoreResult, Entity, NotFoundSnafu, Repository as _, Resolution, ResolvedSubmission,
    Submission, Validator,
};

#[derive(Clone)]
pub struct SubmissionService {
    repo: Arc<Validator>,
}

impl SubmissionService {
    pub fn new(repo: Arc<Validator>) -> Self {
        Self { repo }
    }

    /// Store a new submission, returning it with its id assigned
    pub async fn create(&self, submission: Submission) -> CoreResult<Submission> {
        self.repo.submission_create(submission).await
    }

    pub async fn by_id(&self, id: u64) -> CoreResult<ResolvedSubmission> {
        self.resolve(self.repo.submission_get_by_id(id).await?)
            .await
    }

    pub async fn by_post_id(&self, post_id: &str) -> CoreResult<ResolvedSubmission> {
        self.resolve(self.repo.submission_get_by_post_id(post_id).await?)
            .await
    }

    pub async fn search(&self, text: &str) -> CoreResult<Vec<ResolvedSubmission>> {
        self.resolve_all(self.repo.submission_search(text).await?)
            .await
    }

    pub async fn by_min_resolution(&self, min: Resolution) -> CoreResult<Vec<ResolvedSubmission>> {
        self.resolve_all(self.repo.submission_get_by_min_resolution(min).await?)
            .await
    }

    /// Random submission of at least `min` resolution, never shown before
    pub async fn random(&self, min: Resolution) -> CoreResult<ResolvedSubmission> {
        self.resolve(self.repo.submission_get_random(min).await?)
            .await
    }

    pub async fn is_post_id_registered(&self, post_id: &str) -> CoreResult<bool> {
        self.repo.submission_is_post_id_registered(post_id).await
    }

    pub(crate) async fn resolve(&self, submission: Submission) -> CoreResult<ResolvedSubmission> {
        let subreddit = self
            .repo
            .subreddit_get_by_id(submission.subreddit_id)
            .await?;
        Ok(ResolvedSubmission {
            submission,
            subreddit,
        })
    }

    async fn resolve_all(
        &self,
        submissions: Vec<Submission>,
    ) -> CoreResult<Vec<ResolvedSubmission>> {
        let subreddits: HashMap<_, _> = self
            .repo
            .subreddit_get_all()
            .await?
            .into_iter()
            .map(|subreddit| (subreddit.id, subreddit))
            .collect();

        submissions
            .into_iter()
            .map(|submission| -> CoreResult<ResolvedSubmission> {
                let subreddit = subreddits
                    .get(&submission.subreddit_id)
                    .cloned()
                    .context(NotFoundSnafu {
                        entity: Entity::Subreddit,
                    })?;
                Ok(ResolvedSubmission {
                    submission,
                    subreddit,
                })
            })
            .collect()
    }
}
