use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt as _};
use snafu::{ResultExt as _, Snafu, ensure};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;
use walric_core::service::{SubmissionService, SubredditService};
use walric_core::{CoreError, Services, Submission, Subreddit};
use walric_util_error::FmtCompact as _;

use crate::LOG_TARGET;
use crate::classify::{looks_like_image, probe_content_type};
use crate::fetch::{FetchError, ImageFetcher, probe_dimensions};
use crate::source::{Post, PostSource, PostSourceError, TimeWindow};
use crate::transport::MediaTransport;

#[derive(Debug, Snafu)]
pub enum GatherError {
    #[snafu(display("Failed to list top posts of r/{channel}"))]
    PostList {
        channel: String,
        source: PostSourceError,
    },
    #[snafu(display("Failed to create directory {}", path.display()))]
    CreateDir { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to resolve subreddit r/{channel}"))]
    Subreddit { channel: String, source: CoreError },
    #[snafu(display("Storage failed while gathering r/{channel}"))]
    Storage { channel: String, source: CoreError },
    #[snafu(display("Invalid subreddit name: {channel:?}"))]
    InvalidChannel { channel: String },
    #[snafu(display("Gathering cancelled"))]
    Cancelled,
}

pub type GatherResult<T> = std::result::Result<T, GatherError>;

/// Why a single post did not make it into storage
#[derive(Debug, Snafu)]
pub enum PostError {
    #[snafu(display("Failed to fetch image"))]
    Fetch { source: FetchError },
    #[snafu(display("Failed to read image dimensions"))]
    Dimensions { source: FetchError },
    #[snafu(display("Failed to remove {}", path.display()))]
    Remove { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to store submission"))]
    Create { source: CoreError },
}

#[derive(Debug)]
pub struct PostFailure {
    pub post_id: String,
    pub error: PostError,
}

#[derive(Debug, Default)]
pub struct ChannelReport {
    pub channel: String,
    /// Posts listed by the source
    pub candidates: usize,
    pub registered: usize,
    /// Not images, already registered, or in an unsupported format
    pub skipped: usize,
    pub failures: Vec<PostFailure>,
}

impl ChannelReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

#[derive(Debug, Default)]
pub struct GatherReport {
    pub channels: Vec<ChannelReport>,
}

impl GatherReport {
    pub fn registered(&self) -> usize {
        self.channels.iter().map(|c| c.registered).sum()
    }
}

#[derive(Debug, Clone)]
pub struct GatherOptions {
    /// Images go to `<data_dir>/<channel>/`
    pub data_dir: PathBuf,
    pub window: TimeWindow,
    pub limit: u32,
    /// Number of posts processed concurrently within a channel
    pub workers: usize,
}

impl GatherOptions {
    pub const DEFAULT_WORKERS: usize = 4;
}

/// A post that passed classification and is not registered yet
struct Candidate {
    post: Post,
    url: Url,
}

enum PostOutcome {
    Registered,
    Skipped,
    Cancelled,
    Failed(PostError),
}

pub struct Gatherer {
    source: Arc<dyn PostSource>,
    transport: Arc<dyn MediaTransport>,
    fetcher: ImageFetcher,
    subreddits: SubredditService,
    submissions: SubmissionService,
    opts: GatherOptions,
}

impl Gatherer {
    pub fn new(
        source: Arc<dyn PostSource>,
        transport: Arc<dyn MediaTransport>,
        services: &Services,
        opts: GatherOptions,
    ) -> Self {
        Self {
            source,
            fetcher: ImageFetcher::new(transport.clone()),
            transport,
            subreddits: services.subreddits.clone(),
            submissions: services.submissions.clone(),
            opts,
        }
    }

    /// Register new image submissions from the top posts of every channel
    ///
    /// Channels are processed one after another. A channel failing does not
    /// stop the following ones, but the first such error is returned once
    /// all were attempted. Cancellation stops right away.
    pub async fn gather_top_image_submissions(
        &self,
        channels: &[String],
        cancel: &CancellationToken,
    ) -> GatherResult<GatherReport> {
        let mut report = GatherReport::default();
        self.gather_into(channels, cancel, &mut report).await?;
        Ok(report)
    }

    /// Same as [`Self::gather_top_image_submissions`], but channels gathered
    /// before an error remain in `report`
    pub async fn gather_into(
        &self,
        channels: &[String],
        cancel: &CancellationToken,
        report: &mut GatherReport,
    ) -> GatherResult<()> {
        info!(
            target: LOG_TARGET,
            limit = self.opts.limit,
            window = %self.opts.window,
            channels = channels.len(),
            "Gathering image posts"
        );

        let mut first_err = None;

        for channel in channels {
            if cancel.is_cancelled() {
                return CancelledSnafu.fail();
            }

            match self.gather_channel(channel, cancel).await {
                Ok(channel_report) => {
                    info!(
                        target: LOG_TARGET,
                        channel = %channel,
                        candidates = channel_report.candidates,
                        registered = channel_report.registered,
                        skipped = channel_report.skipped,
                        failed = channel_report.failed(),
                        "Channel gathered"
                    );
                    report.channels.push(channel_report);
                }
                Err(err @ GatherError::Cancelled) => return Err(err),
                Err(err) => {
                    error!(
                        target: LOG_TARGET,
                        channel = %channel,
                        err = %err.fmt_compact(),
                        "Gathering channel failed"
                    );
                    first_err.get_or_insert(err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn gather_channel(
        &self,
        channel: &str,
        cancel: &CancellationToken,
    ) -> GatherResult<ChannelReport> {
        // used in a URL and as a directory name
        let channel = channel.trim();
        ensure!(
            !channel.is_empty()
                && channel
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_'),
            InvalidChannelSnafu { channel }
        );

        let posts = tokio::select! {
            res = self.source.list_top_posts(channel, self.opts.window, self.opts.limit) => {
                res.context(PostListSnafu { channel })?
            }
            () = cancel.cancelled() => return CancelledSnafu.fail(),
        };
        debug!(target: LOG_TARGET, %channel, posts = posts.len(), "Found top posts");

        let mut report = ChannelReport {
            channel: channel.to_owned(),
            candidates: posts.len(),
            ..Default::default()
        };

        let candidates = self.filter_candidates(channel, posts, cancel).await?;
        report.skipped = report.candidates - candidates.len();

        if candidates.is_empty() {
            info!(target: LOG_TARGET, %channel, "No new posts containing images");
            return Ok(report);
        }
        info!(
            target: LOG_TARGET,
            %channel,
            candidates = candidates.len(),
            "Found new posts containing images"
        );

        let dir = self.opts.data_dir.join(channel);
        tokio::fs::create_dir_all(&dir)
            .await
            .context(CreateDirSnafu { path: &dir })?;

        let subreddit = self
            .subreddits
            .get_or_create_by_name(channel)
            .await
            .context(SubredditSnafu { channel })?;

        let outcomes: Vec<_> = stream::iter(candidates)
            .map(|candidate| {
                let post_id = candidate.post.id.clone();
                let subreddit = &subreddit;
                let dir = &dir;
                async move {
                    let outcome = self
                        .gather_candidate(subreddit, dir, candidate, cancel)
                        .await;
                    (post_id, outcome)
                }
            })
            .buffer_unordered(self.opts.workers.max(1))
            .collect()
            .await;

        let mut fatal = None;
        for (post_id, outcome) in outcomes {
            match outcome {
                PostOutcome::Registered => report.registered += 1,
                PostOutcome::Skipped | PostOutcome::Cancelled => report.skipped += 1,
                PostOutcome::Failed(PostError::Create {
                    source: source @ CoreError::Storage { .. },
                }) => {
                    fatal.get_or_insert(source);
                }
                PostOutcome::Failed(error) => report.failures.push(PostFailure { post_id, error }),
            }
        }

        if let Some(source) = fatal {
            return Err(GatherError::Storage {
                channel: channel.to_owned(),
                source,
            });
        }
        if cancel.is_cancelled() {
            return CancelledSnafu.fail();
        }
        Ok(report)
    }

    /// Drop posts that are not images or already registered
    ///
    /// Only storage failures are fatal; anything else, an invalid post id
    /// included, just drops the post.
    async fn filter_candidates(
        &self,
        channel: &str,
        posts: Vec<Post>,
        cancel: &CancellationToken,
    ) -> GatherResult<Vec<Candidate>> {
        let mut candidates = vec![];
        let mut seen = HashSet::new();

        for post in posts {
            // two workers must never share a download path
            if !seen.insert(post.id.trim().to_owned()) {
                debug!(target: LOG_TARGET, post_id = %post.id, "Duplicate post in listing");
                continue;
            }

            let url = match Url::parse(&post.url) {
                Ok(url) => url,
                Err(err) => {
                    debug!(
                        target: LOG_TARGET,
                        post_id = %post.id,
                        post_url = %post.url,
                        err = %err.fmt_compact(),
                        "Invalid post URL"
                    );
                    continue;
                }
            };

            if !looks_like_image(&url) {
                debug!(target: LOG_TARGET, post_id = %post.id, %url, "Post does not contain an image");
                continue;
            }

            match self.submissions.is_post_id_registered(&post.id).await {
                Ok(false) => {}
                Ok(true) => {
                    debug!(target: LOG_TARGET, post_id = %post.id, "Submission already saved");
                    continue;
                }
                Err(err @ CoreError::Storage { .. }) => {
                    return Err(err).context(StorageSnafu { channel });
                }
                Err(err) => {
                    debug!(
                        target: LOG_TARGET,
                        post_id = %post.id,
                        err = %err.fmt_compact(),
                        "Invalid post"
                    );
                    continue;
                }
            }

            let supported = tokio::select! {
                res = probe_content_type(self.transport.as_ref(), &url) => res,
                () = cancel.cancelled() => return CancelledSnafu.fail(),
            };
            match supported {
                Ok(true) => {}
                Ok(false) => {
                    debug!(target: LOG_TARGET, post_id = %post.id, %url, "Unsupported remote file type");
                    continue;
                }
                Err(err) => {
                    warn!(
                        target: LOG_TARGET,
                        post_id = %post.id,
                        %url,
                        err = %err.fmt_compact(),
                        "Failed to retrieve remote file metadata"
                    );
                    continue;
                }
            }

            candidates.push(Candidate { post, url });
        }

        Ok(candidates)
    }

    async fn gather_candidate(
        &self,
        subreddit: &Subreddit,
        dir: &Path,
        Candidate { post, url }: Candidate,
        cancel: &CancellationToken,
    ) -> PostOutcome {
        if cancel.is_cancelled() {
            return PostOutcome::Cancelled;
        }

        let path = match self.fetcher.fetch(dir, &post.id, &url, cancel).await {
            Ok(path) => path,
            Err(FetchError::Cancelled) => return PostOutcome::Cancelled,
            Err(source) => {
                warn!(
                    target: LOG_TARGET,
                    post_id = %post.id,
                    %url,
                    err = %source.fmt_compact(),
                    "Failed to download image"
                );
                return PostOutcome::Failed(PostError::Fetch { source });
            }
        };

        let resolution = match probe_dimensions(&path).await {
            Ok(resolution) => resolution,
            Err(FetchError::UnsupportedImageFormat { .. }) => {
                warn!(
                    target: LOG_TARGET,
                    post_id = %post.id,
                    path = %path.display(),
                    "Unknown or unsupported image format"
                );
                return match tokio::fs::remove_file(&path).await {
                    Ok(()) => PostOutcome::Skipped,
                    Err(source) => PostOutcome::Failed(PostError::Remove { path, source }),
                };
            }
            Err(source) => {
                warn!(
                    target: LOG_TARGET,
                    post_id = %post.id,
                    path = %path.display(),
                    err = %source.fmt_compact(),
                    "Failed to get image resolution"
                );
                remove_orphan(&path).await;
                return PostOutcome::Failed(PostError::Dimensions { source });
            }
        };

        let submission = Submission {
            id: 0,
            subreddit_id: subreddit.id,
            author: post.author,
            permalink: post.permalink,
            post_id: post.id,
            posted_at: post.created_at,
            score: post.score,
            title: post.title,
            image_domain: url.host_str().unwrap_or_default().to_owned(),
            image_url: post.url,
            image_nsfw: post.nsfw,
            image_filename: path,
            image_height_px: resolution.height_px,
            image_width_px: resolution.width_px,
        };
        let post_id = submission.post_id.clone();
        let path = submission.image_filename.clone();

        match self.submissions.create(submission).await {
            Ok(stored) => {
                info!(
                    target: LOG_TARGET,
                    channel = %subreddit.name,
                    post_id = %stored.post_id,
                    title = %stored.title,
                    resolution = %stored.resolution(),
                    "Submission saved"
                );
                PostOutcome::Registered
            }
            // Another run got there first, and the file is theirs now
            Err(err) if err.is_already_registered() => {
                debug!(target: LOG_TARGET, %post_id, "Submission registered concurrently");
                PostOutcome::Skipped
            }
            Err(source) => {
                error!(
                    target: LOG_TARGET,
                    %post_id,
                    err = %source.fmt_compact(),
                    "Failed to create submission"
                );
                remove_orphan(&path).await;
                PostOutcome::Failed(PostError::Create { source })
            }
        }
    }
}

async fn remove_orphan(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        warn!(
            target: LOG_TARGET,
            path = %path.display(),
            err = %err.fmt_compact(),
            "Failed to remove image file"
        );
    }
}
