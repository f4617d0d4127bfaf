//! [`Repository`] kept entirely in memory
//!
//! Mostly useful for tests, and anywhere persistence is not wanted.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rand::seq::IndexedRandom as _;
use snafu::{OptionExt as _, ensure};

use crate::{
    AlreadyRegisteredSnafu, CoreResult, Entity, HistoryEntry, NotFoundSnafu, Repository,
    Resolution, Submission, Subreddit, SubredditStats,
};

#[derive(Default)]
struct State {
    subreddits: Vec<Subreddit>,
    submissions: Vec<Submission>,
    history: Vec<HistoryEntry>,
}

#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("Locking failed")
    }
}

fn next_id(last: Option<u64>) -> u64 {
    last.map_or(1, |id| id + 1)
}

fn subreddit_name_of<'s>(subreddits: &'s [Subreddit], id: u64) -> &'s str {
    subreddits
        .iter()
        .find(|subreddit| subreddit.id == id)
        .map(|subreddit| subreddit.name.as_str())
        .unwrap_or_default()
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn subreddit_create(&self, mut subreddit: Subreddit) -> CoreResult<Subreddit> {
        let mut state = self.lock();
        ensure!(
            !state.subreddits.iter().any(|s| s.name == subreddit.name),
            AlreadyRegisteredSnafu {
                entity: Entity::Subreddit,
                field: "name",
                value: subreddit.name.clone(),
            }
        );
        subreddit.id = next_id(state.subreddits.last().map(|s| s.id));
        state.subreddits.push(subreddit.clone());
        Ok(subreddit)
    }

    async fn subreddit_get_by_id(&self, id: u64) -> CoreResult<Subreddit> {
        self.lock()
            .subreddits
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .context(NotFoundSnafu {
                entity: Entity::Subreddit,
            })
    }

    async fn subreddit_get_by_name(&self, name: &str) -> CoreResult<Subreddit> {
        self.lock()
            .subreddits
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .context(NotFoundSnafu {
                entity: Entity::Subreddit,
            })
    }

    async fn subreddit_get_all(&self) -> CoreResult<Vec<Subreddit>> {
        let mut all = self.lock().subreddits.clone();
        all.sort_by_cached_key(|s| s.name.to_lowercase());
        Ok(all)
    }

    async fn subreddit_get_stats(&self) -> CoreResult<Vec<SubredditStats>> {
        let state = self.lock();
        let mut stats: Vec<_> = state
            .subreddits
            .iter()
            .map(|subreddit| SubredditStats {
                name: subreddit.name.clone(),
                submissions: state
                    .submissions
                    .iter()
                    .filter(|s| s.subreddit_id == subreddit.id)
                    .count() as u64,
            })
            .collect();
        stats.sort_by_cached_key(|s| s.name.to_lowercase());
        Ok(stats)
    }

    async fn subreddit_is_name_registered(&self, name: &str) -> CoreResult<bool> {
        Ok(self.lock().subreddits.iter().any(|s| s.name == name))
    }

    async fn submission_create(&self, mut submission: Submission) -> CoreResult<Submission> {
        let mut state = self.lock();
        ensure!(
            state
                .subreddits
                .iter()
                .any(|s| s.id == submission.subreddit_id),
            NotFoundSnafu {
                entity: Entity::Subreddit
            }
        );
        ensure!(
            !state
                .submissions
                .iter()
                .any(|s| s.post_id == submission.post_id),
            AlreadyRegisteredSnafu {
                entity: Entity::Submission,
                field: "post ID",
                value: submission.post_id.clone(),
            }
        );
        submission.id = next_id(state.submissions.last().map(|s| s.id));
        state.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn submission_get_by_id(&self, id: u64) -> CoreResult<Submission> {
        self.lock()
            .submissions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .context(NotFoundSnafu {
                entity: Entity::Submission,
            })
    }

    async fn submission_get_by_post_id(&self, post_id: &str) -> CoreResult<Submission> {
        self.lock()
            .submissions
            .iter()
            .find(|s| s.post_id == post_id)
            .cloned()
            .context(NotFoundSnafu {
                entity: Entity::Submission,
            })
    }

    async fn submission_get_by_min_resolution(
        &self,
        min: Resolution,
    ) -> CoreResult<Vec<Submission>> {
        let state = self.lock();
        let mut found: Vec<_> = state
            .submissions
            .iter()
            .filter(|s| s.fits(min))
            .cloned()
            .collect();
        found.sort_by_cached_key(|s| {
            (
                subreddit_name_of(&state.subreddits, s.subreddit_id).to_lowercase(),
                s.posted_at,
                s.id,
            )
        });
        Ok(found)
    }

    async fn submission_search(&self, text: &str) -> CoreResult<Vec<Submission>> {
        let text = text.to_lowercase();
        let mut found: Vec<_> = self
            .lock()
            .submissions
            .iter()
            .filter(|s| s.title.to_lowercase().contains(&text))
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.posted_at, s.id));
        Ok(found)
    }

    async fn submission_get_random(&self, min: Resolution) -> CoreResult<Submission> {
        let state = self.lock();
        let shown: HashSet<_> = state.history.iter().map(|e| e.submission_id).collect();
        let eligible: Vec<_> = state
            .submissions
            .iter()
            .filter(|s| s.fits(min) && !shown.contains(&s.id))
            .collect();
        eligible
            .choose(&mut rand::rng())
            .map(|s| (*s).clone())
            .context(NotFoundSnafu {
                entity: Entity::Submission,
            })
    }

    async fn submission_is_post_id_registered(&self, post_id: &str) -> CoreResult<bool> {
        Ok(self.lock().submissions.iter().any(|s| s.post_id == post_id))
    }

    async fn history_create(&self, mut entry: HistoryEntry) -> CoreResult<HistoryEntry> {
        let mut state = self.lock();
        ensure!(
            state
                .submissions
                .iter()
                .any(|s| s.id == entry.submission_id),
            NotFoundSnafu {
                entity: Entity::Submission
            }
        );
        entry.id = next_id(state.history.last().map(|e| e.id));
        state.history.push(entry.clone());
        Ok(entry)
    }

    async fn history_get_all(&self) -> CoreResult<Vec<HistoryEntry>> {
        let mut all = self.lock().history.clone();
        all.sort_by_key(|e| (e.date, e.id));
        Ok(all)
    }

    async fn history_get_current(&self) -> CoreResult<HistoryEntry> {
        self.lock()
            .history
            .iter()
            .max_by_key(|e| (e.date, e.id))
            .cloned()
            .context(NotFoundSnafu {
                entity: Entity::HistoryEntry,
            })
    }
}
