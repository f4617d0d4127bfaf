//! Where candidate posts come from

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt as _, Snafu};
use time::OffsetDateTime;
use tracing::{debug, warn};
use url::Url;

use crate::LOG_TARGET;

/// Time window of a "top posts" listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hour,
    Day,
    #[default]
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 6] = [
        TimeWindow::Hour,
        TimeWindow::Day,
        TimeWindow::Week,
        TimeWindow::Month,
        TimeWindow::Year,
        TimeWindow::All,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("Unknown time window: {value}"))]
pub struct UnknownTimeWindowError {
    value: String,
}

impl FromStr for TimeWindow {
    type Err = UnknownTimeWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTimeWindowError {
                value: s.to_owned(),
            })
    }
}

/// A post as listed by the source, before any classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub url: String,
    pub author: String,
    pub permalink: String,
    pub score: i64,
    pub created_at: OffsetDateTime,
    pub nsfw: bool,
    pub channel: String,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PostSourceError {
    #[snafu(display("Invalid listing URL for r/{channel}"))]
    ListingUrl {
        channel: String,
        source: url::ParseError,
    },
    #[snafu(display("Request for r/{channel} failed"))]
    Http {
        channel: String,
        source: reqwest::Error,
    },
    #[snafu(display("Listing r/{channel} returned status {status}"))]
    Status { channel: String, status: u16 },
    #[snafu(display("Invalid listing for r/{channel}"))]
    Listing {
        channel: String,
        source: serde_json::Error,
    },
}

pub type PostSourceResult<T> = std::result::Result<T, PostSourceError>;

#[async_trait]
pub trait PostSource: Send + Sync {
    /// Top `limit` posts of `channel` within `window`
    async fn list_top_posts(
        &self,
        channel: &str,
        window: TimeWindow,
        limit: u32,
    ) -> PostSourceResult<Vec<Post>>;
}

/// Reads the public JSON listings of reddit
pub struct RedditPostSource {
    client: reqwest::Client,
    base_url: Url,
}

impl RedditPostSource {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.reddit.com/";

    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(Self::DEFAULT_BASE_URL).expect("Valid url"),
        })
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    fn listing_url(&self, channel: &str, window: TimeWindow, limit: u32) -> PostSourceResult<Url> {
        let mut url = self
            .base_url
            .join(&format!("r/{channel}/top.json"))
            .context(ListingUrlSnafu { channel })?;
        url.query_pairs_mut()
            .append_pair("t", window.as_str())
            .append_pair("limit", &limit.to_string())
            .append_pair("raw_json", "1");
        Ok(url)
    }
}

#[async_trait]
impl PostSource for RedditPostSource {
    async fn list_top_posts(
        &self,
        channel: &str,
        window: TimeWindow,
        limit: u32,
    ) -> PostSourceResult<Vec<Post>> {
        let url = self.listing_url(channel, window, limit)?;
        debug!(target: LOG_TARGET, %url, "Fetching listing");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context(HttpSnafu { channel })?;
        let status = resp.status();
        if !status.is_success() {
            return StatusSnafu {
                channel,
                status: status.as_u16(),
            }
            .fail();
        }

        let body = resp.bytes().await.context(HttpSnafu { channel })?;
        parse_listing(&body).context(ListingSnafu { channel })
    }
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: RawPost,
}

#[derive(Deserialize)]
struct RawPost {
    id: String,
    title: String,
    #[serde(default)]
    url: String,
    author: String,
    permalink: String,
    score: i64,
    created_utc: f64,
    #[serde(default)]
    over_18: bool,
    subreddit: String,
}

/// Posts of a reddit listing document
///
/// Posts with an unrepresentable creation time are dropped.
pub fn parse_listing(body: &[u8]) -> Result<Vec<Post>, serde_json::Error> {
    let listing: Listing = serde_json::from_slice(body)?;

    Ok(listing
        .data
        .children
        .into_iter()
        .filter_map(|child| {
            let raw = child.data;
            let Ok(created_at) = OffsetDateTime::from_unix_timestamp(raw.created_utc as i64)
            else {
                warn!(target: LOG_TARGET, post_id = %raw.id, created_utc = raw.created_utc, "Invalid post creation time");
                return None;
            };
            Some(Post {
                id: raw.id,
                title: raw.title,
                url: raw.url,
                author: raw.author,
                permalink: raw.permalink,
                score: raw.score,
                created_at,
                nsfw: raw.over_18,
                channel: raw.subreddit,
            })
        })
        .collect())
}
