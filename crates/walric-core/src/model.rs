use std::fmt;
use std::path::PathBuf;

use time::OffsetDateTime;

use crate::{CoreResult, InvalidResolutionSnafu};

/// Source channel, a subreddit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subreddit {
    /// `0` until stored
    pub id: u64,
    pub name: String,
}

impl Subreddit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubredditStats {
    pub name: String,
    pub submissions: u64,
}

/// A stored image post, together with the metadata of its local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// `0` until stored
    pub id: u64,
    pub subreddit_id: u64,
    pub author: String,
    pub permalink: String,
    pub post_id: String,
    pub posted_at: OffsetDateTime,
    pub score: i64,
    pub title: String,
    pub image_domain: String,
    pub image_url: String,
    pub image_nsfw: bool,
    pub image_filename: PathBuf,
    pub image_height_px: u32,
    pub image_width_px: u32,
}

impl Submission {
    pub fn permalink_url(&self) -> String {
        format!("https://reddit.com{}", self.permalink)
    }

    pub fn user(&self) -> String {
        format!("u/{}", self.author)
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.image_width_px, self.image_height_px)
    }

    pub fn fits(&self, min: Resolution) -> bool {
        min.width_px <= self.image_width_px && min.height_px <= self.image_height_px
    }
}

/// A [`Submission`] with its owning [`Subreddit`] attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubmission {
    pub submission: Submission,
    pub subreddit: Subreddit,
}

/// Record of a [`Submission`] having been selected at some point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// `0` until stored
    pub id: u64,
    pub date: OffsetDateTime,
    pub submission_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHistoryEntry {
    pub entry: HistoryEntry,
    pub submission: ResolvedSubmission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width_px: u32,
    pub height_px: u32,
}

impl Resolution {
    pub fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
        }
    }

    /// Both dimensions must be at least one pixel
    pub fn validate(self) -> CoreResult<Self> {
        if self.width_px < 1 || self.height_px < 1 {
            return InvalidResolutionSnafu {
                width: self.width_px,
                height: self.height_px,
            }
            .fail();
        }
        Ok(self)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.width_px, self.height_px)
    }
}
