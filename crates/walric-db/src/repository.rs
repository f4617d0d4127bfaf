use async_trait::async_trait;
use snafu::OptionExt as _;
use tracing::debug;
use walric_core::{
    AlreadyRegisteredSnafu, CoreResult, Entity, HistoryEntry, NotFoundSnafu, Repository,
    Resolution, Submission, Subreddit, SubredditStats,
};

use crate::{
    Database, InsertOutcome, LOG_TARGET, history, history_by_date, submissions,
    submissions_by_post_id, subreddits, subreddits_by_name,
};

#[async_trait]
impl Repository for Database {
    async fn subreddit_create(&self, mut subreddit: Subreddit) -> CoreResult<Subreddit> {
        let outcome = self
            .write_with(|tx| {
                Database::insert_subreddit_tx(
                    &subreddit.name,
                    &mut tx.open_table(&subreddits::TABLE)?,
                    &mut tx.open_table(&subreddits_by_name::TABLE)?,
                )
            })
            .await?;

        match outcome {
            InsertOutcome::Inserted { id } => {
                debug!(target: LOG_TARGET, id, name = %subreddit.name, "Subreddit inserted");
                subreddit.id = id;
                Ok(subreddit)
            }
            InsertOutcome::AlreadyPresent | InsertOutcome::MissingParent => AlreadyRegisteredSnafu {
                entity: Entity::Subreddit,
                field: "name",
                value: subreddit.name,
            }
            .fail(),
        }
    }

    async fn subreddit_get_by_id(&self, id: u64) -> CoreResult<Subreddit> {
        self.read_with(|tx| Database::get_subreddit_tx(id, &tx.open_table(&subreddits::TABLE)?))
            .await?
            .context(NotFoundSnafu {
                entity: Entity::Subreddit,
            })
    }

    async fn subreddit_get_by_name(&self, name: &str) -> CoreResult<Subreddit> {
        self.read_with(|tx| {
            let Some(id) = Database::get_subreddit_id_by_name_tx(
                name,
                &tx.open_table(&subreddits_by_name::TABLE)?,
            )?
            else {
                return Ok(None);
            };
            Database::get_subreddit_tx(id, &tx.open_table(&subreddits::TABLE)?)
        })
        .await?
        .context(NotFoundSnafu {
            entity: Entity::Subreddit,
        })
    }

    async fn subreddit_get_all(&self) -> CoreResult<Vec<Subreddit>> {
        let mut all: Vec<_> = self
            .read_with(|tx| Database::read_subreddits_tx(&tx.open_table(&subreddits::TABLE)?))
            .await?
            .into_values()
            .collect();
        all.sort_by_cached_key(|s| s.name.to_lowercase());
        Ok(all)
    }

    async fn subreddit_get_stats(&self) -> CoreResult<Vec<SubredditStats>> {
        Ok(self
            .read_with(|tx| {
                Database::read_subreddit_stats_tx(
                    &tx.open_table(&subreddits::TABLE)?,
                    &tx.open_table(&submissions::TABLE)?,
                )
            })
            .await?)
    }

    async fn subreddit_is_name_registered(&self, name: &str) -> CoreResult<bool> {
        Ok(self
            .read_with(|tx| {
                Database::get_subreddit_id_by_name_tx(
                    name,
                    &tx.open_table(&subreddits_by_name::TABLE)?,
                )
            })
            .await?
            .is_some())
    }

    async fn submission_create(&self, mut submission: Submission) -> CoreResult<Submission> {
        let outcome = self
            .write_with(|tx| {
                Database::insert_submission_tx(
                    &submission,
                    &tx.open_table(&subreddits::TABLE)?,
                    &mut tx.open_table(&submissions::TABLE)?,
                    &mut tx.open_table(&submissions_by_post_id::TABLE)?,
                )
            })
            .await?;

        match outcome {
            InsertOutcome::Inserted { id } => {
                debug!(target: LOG_TARGET, id, post_id = %submission.post_id, "Submission inserted");
                submission.id = id;
                Ok(submission)
            }
            InsertOutcome::AlreadyPresent => AlreadyRegisteredSnafu {
                entity: Entity::Submission,
                field: "post ID",
                value: submission.post_id,
            }
            .fail(),
            InsertOutcome::MissingParent => NotFoundSnafu {
                entity: Entity::Subreddit,
            }
            .fail(),
        }
    }

    async fn submission_get_by_id(&self, id: u64) -> CoreResult<Submission> {
        self.read_with(|tx| Database::get_submission_tx(id, &tx.open_table(&submissions::TABLE)?))
            .await?
            .context(NotFoundSnafu {
                entity: Entity::Submission,
            })
    }

    async fn submission_get_by_post_id(&self, post_id: &str) -> CoreResult<Submission> {
        self.read_with(|tx| {
            let Some(id) = Database::get_submission_id_by_post_id_tx(
                post_id,
                &tx.open_table(&submissions_by_post_id::TABLE)?,
            )?
            else {
                return Ok(None);
            };
            Database::get_submission_tx(id, &tx.open_table(&submissions::TABLE)?)
        })
        .await?
        .context(NotFoundSnafu {
            entity: Entity::Submission,
        })
    }

    async fn submission_get_by_min_resolution(
        &self,
        min: Resolution,
    ) -> CoreResult<Vec<Submission>> {
        Ok(self
            .read_with(|tx| {
                Database::read_submissions_by_min_resolution_tx(
                    min,
                    &tx.open_table(&subreddits::TABLE)?,
                    &tx.open_table(&submissions::TABLE)?,
                )
            })
            .await?)
    }

    async fn submission_search(&self, text: &str) -> CoreResult<Vec<Submission>> {
        Ok(self
            .read_with(|tx| {
                Database::search_submissions_tx(text, &tx.open_table(&submissions::TABLE)?)
            })
            .await?)
    }

    async fn submission_get_random(&self, min: Resolution) -> CoreResult<Submission> {
        self.read_with(|tx| {
            Database::get_random_submission_tx(
                min,
                &tx.open_table(&submissions::TABLE)?,
                &tx.open_table(&history::TABLE)?,
            )
        })
        .await?
        .context(NotFoundSnafu {
            entity: Entity::Submission,
        })
    }

    async fn submission_is_post_id_registered(&self, post_id: &str) -> CoreResult<bool> {
        Ok(self
            .read_with(|tx| {
                Database::get_submission_id_by_post_id_tx(
                    post_id,
                    &tx.open_table(&submissions_by_post_id::TABLE)?,
                )
            })
            .await?
            .is_some())
    }

    async fn history_create(&self, entry: HistoryEntry) -> CoreResult<HistoryEntry> {
        let (outcome, stored) = self
            .write_with(|tx| {
                let mut history_table = tx.open_table(&history::TABLE)?;
                let outcome = Database::insert_history_tx(
                    &entry,
                    &tx.open_table(&submissions::TABLE)?,
                    &mut history_table,
                    &mut tx.open_table(&history_by_date::TABLE)?,
                )?;
                // Read back, so the caller sees the stored date precision
                let stored = match outcome {
                    InsertOutcome::Inserted { id } => {
                        Database::get_history_entry_tx(id, &history_table)?
                    }
                    InsertOutcome::AlreadyPresent | InsertOutcome::MissingParent => None,
                };
                Ok((outcome, stored))
            })
            .await?;

        match (outcome, stored) {
            (InsertOutcome::Inserted { .. }, Some(stored)) => Ok(stored),
            (InsertOutcome::MissingParent, _) => NotFoundSnafu {
                entity: Entity::Submission,
            }
            .fail(),
            _ => NotFoundSnafu {
                entity: Entity::HistoryEntry,
            }
            .fail(),
        }
    }

    async fn history_get_all(&self) -> CoreResult<Vec<HistoryEntry>> {
        Ok(self
            .read_with(|tx| {
                Database::read_history_tx(
                    &tx.open_table(&history::TABLE)?,
                    &tx.open_table(&history_by_date::TABLE)?,
                )
            })
            .await?)
    }

    async fn history_get_current(&self) -> CoreResult<HistoryEntry> {
        self.read_with(|tx| {
            Database::get_current_history_entry_tx(
                &tx.open_table(&history::TABLE)?,
                &tx.open_table(&history_by_date::TABLE)?,
            )
        })
        .await?
        .context(NotFoundSnafu {
            entity: Entity::HistoryEntry,
        })
    }
}
