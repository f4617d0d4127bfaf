use async_trait::async_trait;

use crate::{
    CoreResult, HistoryEntry, Resolution, Submission, Subreddit, SubredditStats,
};

/// Storage contract
///
/// Single-record reads fail with [`crate::CoreError::NotFound`] when nothing
/// matches. `*_create` methods return the stored record, with its id
/// assigned. Implementations must report a lost uniqueness race as
/// [`crate::CoreError::AlreadyRegistered`].
#[async_trait]
pub trait Repository: Send + Sync {
    async fn subreddit_create(&self, subreddit: Subreddit) -> CoreResult<Subreddit>;
    async fn subreddit_get_by_id(&self, id: u64) -> CoreResult<Subreddit>;
    async fn subreddit_get_by_name(&self, name: &str) -> CoreResult<Subreddit>;
    /// All subreddits, ordered by name (case-insensitive)
    async fn subreddit_get_all(&self) -> CoreResult<Vec<Subreddit>>;
    /// Submission count of every subreddit, ordered by name (case-insensitive)
    async fn subreddit_get_stats(&self) -> CoreResult<Vec<SubredditStats>>;
    async fn subreddit_is_name_registered(&self, name: &str) -> CoreResult<bool>;

    async fn submission_create(&self, submission: Submission) -> CoreResult<Submission>;
    async fn submission_get_by_id(&self, id: u64) -> CoreResult<Submission>;
    async fn submission_get_by_post_id(&self, post_id: &str) -> CoreResult<Submission>;
    /// Submissions at least `min` in both dimensions, ordered by subreddit
    /// name (case-insensitive), then by post time
    async fn submission_get_by_min_resolution(
        &self,
        min: Resolution,
    ) -> CoreResult<Vec<Submission>>;
    /// Case-insensitive title substring match, ordered by post time
    async fn submission_search(&self, text: &str) -> CoreResult<Vec<Submission>>;
    /// Uniformly random pick among the submissions at least `min` in both
    /// dimensions that were never recorded in the history
    async fn submission_get_random(&self, min: Resolution) -> CoreResult<Submission>;
    async fn submission_is_post_id_registered(&self, post_id: &str) -> CoreResult<bool>;

    async fn history_create(&self, entry: HistoryEntry) -> CoreResult<HistoryEntry>;
    /// Ordered by date, oldest first
    async fn history_get_all(&self) -> CoreResult<Vec<HistoryEntry>>;
    async fn history_get_current(&self) -> CoreResult<HistoryEntry>;
}
