use std::path::PathBuf;

use bincode::{Decode, Encode};
use snafu::{OptionExt as _, ResultExt as _};
use time::OffsetDateTime;
use walric_core::{HistoryEntry, Submission, Subreddit};

use crate::{DbResult, InvalidTimestampSnafu, TimestampOutOfRangeSnafu};

#[macro_export]
macro_rules! def_table {
    ($(#[$outer:meta])*
        $name:ident : $k:ty => $v:ty) => {
        #[allow(unused)]
        $(#[$outer])*
        pub mod $name {
            use super::*;
            pub type Key = $k;
            pub type Value = $v;
            pub type Definition<'a> = redb_bincode::TableDefinition<'a, Key, Value>;
            pub trait ReadableTable: redb_bincode::ReadableTable<Key, Value> {}
            impl<RT> ReadableTable for RT where RT: redb_bincode::ReadableTable<Key, Value> {}
            pub type Table<'a> = redb_bincode::Table<'a, Key, Value>;
            pub const TABLE: Definition = redb_bincode::TableDefinition::new(stringify!($name));
        }
    };
}

def_table! {
    /// Tracks database/schema version
    db_version: () => u64
}

def_table!(subreddits: u64 => SubredditRecord);
def_table! {
    /// Unique index of subreddit names
    subreddits_by_name: String => u64
}

def_table!(submissions: u64 => SubmissionRecord);
def_table! {
    /// Unique index of platform post ids
    submissions_by_post_id: String => u64
}

def_table!(history: u64 => HistoryRecord);
def_table! {
    /// History ordered by (date in unix micros, entry id)
    history_by_date: (u64, u64) => ()
}

#[derive(Debug, Encode, Decode, Clone)]
pub struct SubredditRecord {
    pub name: String,
}

impl SubredditRecord {
    pub fn into_subreddit(self, id: u64) -> Subreddit {
        Subreddit {
            id,
            name: self.name,
        }
    }
}

#[derive(Debug, Encode, Decode, Clone)]
pub struct SubmissionRecord {
    pub subreddit_id: u64,
    pub author: String,
    pub permalink: String,
    pub post_id: String,
    /// Unix microseconds
    pub posted_at: i64,
    pub score: i64,
    pub title: String,
    pub image_domain: String,
    pub image_url: String,
    pub image_nsfw: bool,
    pub image_filename: String,
    pub image_height_px: u32,
    pub image_width_px: u32,
}

impl SubmissionRecord {
    pub fn from_submission(s: &Submission) -> DbResult<Self> {
        Ok(Self {
            subreddit_id: s.subreddit_id,
            author: s.author.clone(),
            permalink: s.permalink.clone(),
            post_id: s.post_id.clone(),
            posted_at: i64::try_from(s.posted_at.unix_timestamp_nanos() / 1000)
                .ok()
                .context(TimestampOutOfRangeSnafu)?,
            score: s.score,
            title: s.title.clone(),
            image_domain: s.image_domain.clone(),
            image_url: s.image_url.clone(),
            image_nsfw: s.image_nsfw,
            image_filename: s.image_filename.to_string_lossy().into_owned(),
            image_height_px: s.image_height_px,
            image_width_px: s.image_width_px,
        })
    }

    pub fn into_submission(self, id: u64) -> DbResult<Submission> {
        Ok(Submission {
            id,
            subreddit_id: self.subreddit_id,
            author: self.author,
            permalink: self.permalink,
            post_id: self.post_id,
            posted_at: OffsetDateTime::from_unix_timestamp_nanos(
                i128::from(self.posted_at) * 1000,
            )
            .context(InvalidTimestampSnafu)?,
            score: self.score,
            title: self.title,
            image_domain: self.image_domain,
            image_url: self.image_url,
            image_nsfw: self.image_nsfw,
            image_filename: PathBuf::from(self.image_filename),
            image_height_px: self.image_height_px,
            image_width_px: self.image_width_px,
        })
    }
}

#[derive(Debug, Encode, Decode, Clone)]
pub struct HistoryRecord {
    /// Unix microseconds
    pub date: u64,
    pub submission_id: u64,
}

impl HistoryRecord {
    pub fn into_entry(self, id: u64) -> DbResult<HistoryEntry> {
        Ok(HistoryEntry {
            id,
            date: micros_to_date(self.date)?,
            submission_id: self.submission_id,
        })
    }
}

pub fn date_to_micros(date: OffsetDateTime) -> DbResult<u64> {
    u64::try_from(date.unix_timestamp_nanos() / 1000)
        .ok()
        .context(TimestampOutOfRangeSnafu)
}

pub fn micros_to_date(micros: u64) -> DbResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1000)
        .context(InvalidTimestampSnafu)
}
