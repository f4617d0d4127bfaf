use std::collections::{HashMap, HashSet};

use rand::seq::IndexedRandom as _;
use redb_bincode::ReadableTable;
use walric_core::{HistoryEntry, Resolution, Submission, Subreddit, SubredditStats};

use crate::{
    Database, DbResult, HistoryRecord, InsertOutcome, SubmissionRecord, SubredditRecord,
    date_to_micros, history, history_by_date, submissions, submissions_by_post_id, subreddits,
    subreddits_by_name,
};

/// Next free sequential id of a table keyed by id
fn next_id<V>(table: &impl ReadableTable<u64, V>) -> DbResult<u64>
where
    V: bincode::Decode<()> + bincode::Encode,
{
    Ok(table.last()?.map_or(1, |(k, _)| k.value() + 1))
}

impl Database {
    pub(crate) fn insert_subreddit_tx(
        name: &str,
        subreddits_table: &mut subreddits::Table,
        subreddits_by_name_table: &mut subreddits_by_name::Table,
    ) -> DbResult<InsertOutcome> {
        let name = name.to_owned();
        if subreddits_by_name_table.get(&name)?.is_some() {
            return Ok(InsertOutcome::AlreadyPresent);
        }

        let id = next_id(&*subreddits_table)?;
        subreddits_table.insert(&id, &SubredditRecord { name: name.clone() })?;
        subreddits_by_name_table.insert(&name, &id)?;

        Ok(InsertOutcome::Inserted { id })
    }

    pub(crate) fn get_subreddit_tx(
        id: u64,
        subreddits_table: &impl subreddits::ReadableTable,
    ) -> DbResult<Option<Subreddit>> {
        Ok(subreddits_table
            .get(&id)?
            .map(|g| g.value().into_subreddit(id)))
    }

    pub(crate) fn get_subreddit_id_by_name_tx(
        name: &str,
        subreddits_by_name_table: &impl subreddits_by_name::ReadableTable,
    ) -> DbResult<Option<u64>> {
        Ok(subreddits_by_name_table
            .get(&name.to_owned())?
            .map(|g| g.value()))
    }

    /// All subreddits by id
    pub(crate) fn read_subreddits_tx(
        subreddits_table: &impl subreddits::ReadableTable,
    ) -> DbResult<HashMap<u64, Subreddit>> {
        let mut ret = HashMap::new();
        for record in subreddits_table.range(..)? {
            let (k, v) = record?;
            let id = k.value();
            ret.insert(id, v.value().into_subreddit(id));
        }
        Ok(ret)
    }

    pub(crate) fn read_subreddit_stats_tx(
        subreddits_table: &impl subreddits::ReadableTable,
        submissions_table: &impl submissions::ReadableTable,
    ) -> DbResult<Vec<SubredditStats>> {
        let mut counts: HashMap<u64, u64> = HashMap::new();
        for record in submissions_table.range(..)? {
            let (_, v) = record?;
            *counts.entry(v.value().subreddit_id).or_default() += 1;
        }

        let mut stats: Vec<_> = Self::read_subreddits_tx(subreddits_table)?
            .into_values()
            .map(|subreddit| SubredditStats {
                submissions: counts.get(&subreddit.id).copied().unwrap_or_default(),
                name: subreddit.name,
            })
            .collect();
        stats.sort_by_cached_key(|s| s.name.to_lowercase());
        Ok(stats)
    }

    pub(crate) fn insert_submission_tx(
        submission: &Submission,
        subreddits_table: &impl subreddits::ReadableTable,
        submissions_table: &mut submissions::Table,
        submissions_by_post_id_table: &mut submissions_by_post_id::Table,
    ) -> DbResult<InsertOutcome> {
        if subreddits_table.get(&submission.subreddit_id)?.is_none() {
            return Ok(InsertOutcome::MissingParent);
        }
        if submissions_by_post_id_table
            .get(&submission.post_id)?
            .is_some()
        {
            return Ok(InsertOutcome::AlreadyPresent);
        }

        let id = next_id(&*submissions_table)?;
        submissions_table.insert(&id, &SubmissionRecord::from_submission(submission)?)?;
        submissions_by_post_id_table.insert(&submission.post_id, &id)?;

        Ok(InsertOutcome::Inserted { id })
    }

    pub(crate) fn get_submission_tx(
        id: u64,
        submissions_table: &impl submissions::ReadableTable,
    ) -> DbResult<Option<Submission>> {
        submissions_table
            .get(&id)?
            .map(|g| g.value().into_submission(id))
            .transpose()
    }

    pub(crate) fn get_submission_id_by_post_id_tx(
        post_id: &str,
        submissions_by_post_id_table: &impl submissions_by_post_id::ReadableTable,
    ) -> DbResult<Option<u64>> {
        Ok(submissions_by_post_id_table
            .get(&post_id.to_owned())?
            .map(|g| g.value()))
    }

    /// All submissions matching `filter`, in id order
    pub(crate) fn filter_submissions_tx(
        submissions_table: &impl submissions::ReadableTable,
        mut filter: impl FnMut(u64, &SubmissionRecord) -> bool,
    ) -> DbResult<Vec<Submission>> {
        let mut ret = vec![];
        for record in submissions_table.range(..)? {
            let (k, v) = record?;
            let (id, record) = (k.value(), v.value());
            if filter(id, &record) {
                ret.push(record.into_submission(id)?);
            }
        }
        Ok(ret)
    }

    pub(crate) fn read_submissions_by_min_resolution_tx(
        min: Resolution,
        subreddits_table: &impl subreddits::ReadableTable,
        submissions_table: &impl submissions::ReadableTable,
    ) -> DbResult<Vec<Submission>> {
        let subreddits = Self::read_subreddits_tx(subreddits_table)?;
        let mut found = Self::filter_submissions_tx(submissions_table, |_, record| {
            min.width_px <= record.image_width_px && min.height_px <= record.image_height_px
        })?;
        found.sort_by_cached_key(|s| {
            (
                subreddits
                    .get(&s.subreddit_id)
                    .map(|subreddit| subreddit.name.to_lowercase())
                    .unwrap_or_default(),
                s.posted_at,
                s.id,
            )
        });
        Ok(found)
    }

    pub(crate) fn search_submissions_tx(
        text: &str,
        submissions_table: &impl submissions::ReadableTable,
    ) -> DbResult<Vec<Submission>> {
        let text = text.to_lowercase();
        let mut found = Self::filter_submissions_tx(submissions_table, |_, record| {
            record.title.to_lowercase().contains(&text)
        })?;
        found.sort_by_key(|s| (s.posted_at, s.id));
        Ok(found)
    }

    pub(crate) fn get_random_submission_tx(
        min: Resolution,
        submissions_table: &impl submissions::ReadableTable,
        history_table: &impl history::ReadableTable,
    ) -> DbResult<Option<Submission>> {
        let mut shown = HashSet::new();
        for record in history_table.range(..)? {
            let (_, v) = record?;
            shown.insert(v.value().submission_id);
        }

        let mut eligible = vec![];
        for record in submissions_table.range(..)? {
            let (k, v) = record?;
            let (id, record) = (k.value(), v.value());
            if min.width_px <= record.image_width_px
                && min.height_px <= record.image_height_px
                && !shown.contains(&id)
            {
                eligible.push(id);
            }
        }

        let Some(&id) = eligible.choose(&mut rand::rng()) else {
            return Ok(None);
        };
        Self::get_submission_tx(id, submissions_table)
    }

    pub(crate) fn insert_history_tx(
        entry: &HistoryEntry,
        submissions_table: &impl submissions::ReadableTable,
        history_table: &mut history::Table,
        history_by_date_table: &mut history_by_date::Table,
    ) -> DbResult<InsertOutcome> {
        if submissions_table.get(&entry.submission_id)?.is_none() {
            return Ok(InsertOutcome::MissingParent);
        }

        let date = date_to_micros(entry.date)?;
        let id = next_id(&*history_table)?;
        history_table.insert(
            &id,
            &HistoryRecord {
                date,
                submission_id: entry.submission_id,
            },
        )?;
        history_by_date_table.insert(&(date, id), &())?;

        Ok(InsertOutcome::Inserted { id })
    }

    pub(crate) fn get_history_entry_tx(
        id: u64,
        history_table: &impl history::ReadableTable,
    ) -> DbResult<Option<HistoryEntry>> {
        history_table
            .get(&id)?
            .map(|g| g.value().into_entry(id))
            .transpose()
    }

    /// Whole history, oldest first
    pub(crate) fn read_history_tx(
        history_table: &impl history::ReadableTable,
        history_by_date_table: &impl history_by_date::ReadableTable,
    ) -> DbResult<Vec<HistoryEntry>> {
        let mut ret = vec![];
        for record in history_by_date_table.range(..)? {
            let (k, _) = record?;
            let (_, id) = k.value();
            if let Some(entry) = Self::get_history_entry_tx(id, history_table)? {
                ret.push(entry);
            }
        }
        Ok(ret)
    }

    pub(crate) fn get_current_history_entry_tx(
        history_table: &impl history::ReadableTable,
        history_by_date_table: &impl history_by_date::ReadableTable,
    ) -> DbResult<Option<HistoryEntry>> {
        let Some((k, _)) = history_by_date_table.last()? else {
            return Ok(None);
        };
        let (_, id) = k.value();
        Self::get_history_entry_tx(id, history_table)
    }
}
