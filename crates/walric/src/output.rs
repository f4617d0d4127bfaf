//! Human readable rendering of command results
//!
//! Everything is laid out as left-aligned columns separated by two spaces.

use std::io::{self, Write};

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use walric_core::{ResolvedHistoryEntry, ResolvedSubmission, SubredditStats};
use walric_gather::GatherReport;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");

const COLUMN_GAP: usize = 2;

pub fn format_date(date: OffsetDateTime) -> String {
    date.to_offset(time::UtcOffset::UTC)
        .format(DATE_FORMAT)
        .expect("Can't fail")
}

#[derive(Debug, Default)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row<I, S>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        let mut widths: Vec<usize> = vec![];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(width) => *width = (*width).max(len),
                    None => widths.push(len),
                }
            }
        }

        for row in &self.rows {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                line.push_str(cell);
                // last column is never padded
                if i + 1 < row.len() {
                    let pad = widths[i] - cell.chars().count() + COLUMN_GAP;
                    line.extend(std::iter::repeat_n(' ', pad));
                }
            }
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

pub fn submission_details(resolved: &ResolvedSubmission) -> Table {
    let s = &resolved.submission;
    let mut table = Table::new();
    table
        .row(["Title:", s.title.as_str()])
        .row(["Author:".to_owned(), s.user()])
        .row(["Subreddit:", resolved.subreddit.name.as_str()])
        .row(["Posted At:".to_owned(), format_date(s.posted_at)])
        .row(["Permalink:".to_owned(), s.permalink_url()])
        .row(["Image URL:", s.image_url.as_str()])
        .row(["Image Size:".to_owned(), s.resolution().to_string()])
        .row(["Filename:".to_owned(), s.image_filename.display().to_string()])
        .row(["NSFW:".to_owned(), s.image_nsfw.to_string()])
        .row(["Walric ID:".to_owned(), s.id.to_string()]);
    table
}

/// One line per submission: subreddit, post id, size and title
pub fn submission_list<'s>(submissions: impl IntoIterator<Item = &'s ResolvedSubmission>) -> Table {
    let mut table = Table::new();
    for resolved in submissions {
        let s = &resolved.submission;
        table.row([
            resolved.subreddit.name.clone(),
            s.post_id.clone(),
            s.resolution().to_string(),
            s.title.clone(),
        ]);
    }
    table
}

pub fn history_list(entries: &[ResolvedHistoryEntry]) -> Table {
    let mut table = Table::new();
    for resolved in entries {
        let s = &resolved.submission;
        table.row([
            format_date(resolved.entry.date),
            s.subreddit.name.clone(),
            s.submission.post_id.clone(),
            s.submission.title.clone(),
        ]);
    }
    table
}

pub fn stats_list(stats: &[SubredditStats]) -> Table {
    let mut table = Table::new();
    for stat in stats {
        table.row([stat.name.clone(), stat.submissions.to_string()]);
    }
    table
}

pub fn gather_summary(report: &GatherReport) -> Table {
    let mut table = Table::new();
    table.row(["SUBREDDIT", "CANDIDATES", "REGISTERED", "SKIPPED", "FAILED"]);
    for channel in &report.channels {
        table.row([
            channel.channel.clone(),
            channel.candidates.to_string(),
            channel.registered.to_string(),
            channel.skipped.to_string(),
            channel.failed().to_string(),
        ]);
    }
    table
}
