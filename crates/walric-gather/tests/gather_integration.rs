use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use snafu::ResultExt as _;
use tempfile::{TempDir, tempdir};
use time::macros::datetime;
use tokio::io::{AsyncWrite, AsyncWriteExt as _};
use tokio_util::sync::CancellationToken;
use url::Url;
use walric_core::mem::InMemoryRepository;
use walric_core::{
    CoreError, CoreResult, HistoryEntry, Repository, Resolution, Services, Submission, Subreddit,
    SubredditStats,
};
use walric_gather::source::{Post, PostSource, PostSourceResult, StatusSnafu, TimeWindow};
use walric_gather::transport::{self, MediaTransport, TransportResult};
use walric_gather::{GatherError, GatherOptions, GatherReport, Gatherer};

/// A post source serving fixed listings; unknown channels fail
struct MockPostSource {
    listings: HashMap<String, Vec<Post>>,
}

#[async_trait]
impl PostSource for MockPostSource {
    async fn list_top_posts(
        &self,
        channel: &str,
        _window: TimeWindow,
        limit: u32,
    ) -> PostSourceResult<Vec<Post>> {
        match self.listings.get(channel) {
            Some(posts) => Ok(posts.iter().take(limit as usize).cloned().collect()),
            None => StatusSnafu {
                channel,
                status: 503u16,
            }
            .fail(),
        }
    }
}

#[derive(Clone)]
struct RemoteFile {
    content_type: Option<&'static str>,
    body: Vec<u8>,
}

/// In-memory image host
#[derive(Default)]
struct MockTransport {
    files: HashMap<String, RemoteFile>,
    /// Downloads of these URLs write a little, then never finish
    hanging: Vec<String>,
    probes: AtomicUsize,
    downloads: AtomicUsize,
}

impl MockTransport {
    fn with_file(mut self, url: &str, content_type: Option<&'static str>, body: Vec<u8>) -> Self {
        self.files
            .insert(url.to_owned(), RemoteFile { content_type, body });
        self
    }

    fn with_hanging(mut self, url: &str) -> Self {
        self = self.with_file(url, Some("image/png"), png(8, 8));
        self.hanging.push(url.to_owned());
        self
    }
}

#[async_trait]
impl MediaTransport for MockTransport {
    async fn content_type(&self, url: &Url) -> TransportResult<Option<String>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.files.get(url.as_str()) {
            Some(file) => Ok(file.content_type.map(ToOwned::to_owned)),
            None => transport::StatusSnafu {
                url: url.clone(),
                status: 404u16,
            }
            .fail(),
        }
    }

    async fn download(
        &self,
        url: &Url,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> TransportResult<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let Some(file) = self.files.get(url.as_str()) else {
            return transport::StatusSnafu {
                url: url.clone(),
                status: 404u16,
            }
            .fail();
        };

        if self.hanging.iter().any(|u| u == url.as_str()) {
            out.write_all(&file.body[..16])
                .await
                .context(transport::WriteSnafu)?;
            out.flush().await.context(transport::WriteSnafu)?;
            std::future::pending::<()>().await;
        }

        out.write_all(&file.body)
            .await
            .context(transport::WriteSnafu)?;
        Ok(())
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(vec![]);
    RgbImage::new(width, height)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("Encoding can't fail");
    buf.into_inner()
}

fn post(channel: &str, id: &str, url: &str) -> Post {
    Post {
        id: id.to_owned(),
        title: format!("Post {id}"),
        url: url.to_owned(),
        author: "painter".to_owned(),
        permalink: format!("/r/{channel}/comments/{id}/post/"),
        score: 100,
        created_at: datetime!(2024-05-01 10:00 UTC),
        nsfw: false,
        channel: channel.to_owned(),
    }
}

fn spaceart_posts() -> Vec<Post> {
    vec![
        post("spaceart", "small", "https://i.redd.it/small.png"),
        post("spaceart", "large", "https://i.redd.it/large.png"),
        post("spaceart", "anim", "https://i.imgur.com/anim.gifv"),
        post("spaceart", "video", "https://v.redd.it/video123"),
    ]
}

fn spaceart_transport() -> MockTransport {
    MockTransport::default()
        .with_file("https://i.redd.it/small.png", Some("image/png"), png(640, 480))
        .with_file(
            "https://i.redd.it/large.png",
            Some("image/png"),
            png(1920, 1200),
        )
}

struct Harness {
    dir: TempDir,
    services: Services,
    transport: Arc<MockTransport>,
    gatherer: Gatherer,
}

impl Harness {
    fn new(
        listings: impl IntoIterator<Item = (&'static str, Vec<Post>)>,
        transport: MockTransport,
        storage: Arc<dyn Repository>,
    ) -> Self {
        let dir = tempdir().expect("tempdir");
        let services = Services::new(storage);
        let transport = Arc::new(transport);
        let source = Arc::new(MockPostSource {
            listings: listings
                .into_iter()
                .map(|(channel, posts)| (channel.to_owned(), posts))
                .collect(),
        });
        let gatherer = Gatherer::new(
            source,
            transport.clone(),
            &services,
            GatherOptions {
                data_dir: dir.path().to_owned(),
                window: TimeWindow::Week,
                limit: 25,
                workers: GatherOptions::DEFAULT_WORKERS,
            },
        );
        Self {
            dir,
            services,
            transport,
            gatherer,
        }
    }

    fn files_in(&self, channel: &str) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(self.dir.path().join(channel))
            .map(|entries| {
                entries
                    .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

fn channels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_owned()).collect()
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn spaceart_gathered_into_database_and_selected_by_resolution() {
    let db_dir = tempdir().unwrap();
    let db = walric_db::Database::open(db_dir.path().join("walric.redb"))
        .await
        .unwrap();
    let h = Harness::new(
        [("spaceart", spaceart_posts())],
        spaceart_transport(),
        Arc::new(db),
    );

    let report = h
        .gatherer
        .gather_top_image_submissions(&channels(&["spaceart"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.channels.len(), 1);
    let channel = &report.channels[0];
    assert_eq!(channel.candidates, 4);
    assert_eq!(channel.registered, 2);
    assert_eq!(channel.skipped, 2);
    assert_eq!(channel.failed(), 0);
    // the gifv and the video were never probed
    assert_eq!(h.transport.probes.load(Ordering::SeqCst), 2);

    assert_eq!(h.files_in("spaceart"), ["large-large.png", "small-small.png"]);

    let found = h
        .services
        .submissions
        .by_min_resolution(Resolution::new(1920, 1200))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    let large = &found[0].submission;
    assert_eq!(large.post_id, "large");
    assert_eq!(large.image_domain, "i.redd.it");
    assert_eq!(large.resolution(), Resolution::new(1920, 1200));
    assert_eq!(
        large.image_filename,
        h.dir.path().join("spaceart").join("large-large.png")
    );
    assert_eq!(found[0].subreddit.name, "spaceart");

    assert!(
        h.services
            .submissions
            .by_min_resolution(Resolution::new(3000, 2000))
            .await
            .unwrap()
            .is_empty()
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn gathering_twice_registers_nothing_new() {
    let h = Harness::new(
        [("spaceart", spaceart_posts())],
        spaceart_transport(),
        Arc::new(InMemoryRepository::new()),
    );
    let cancel = CancellationToken::new();

    let first = h
        .gatherer
        .gather_top_image_submissions(&channels(&["spaceart"]), &cancel)
        .await
        .unwrap();
    assert_eq!(first.registered(), 2);
    let probes = h.transport.probes.load(Ordering::SeqCst);
    let downloads = h.transport.downloads.load(Ordering::SeqCst);

    let second = h
        .gatherer
        .gather_top_image_submissions(&channels(&["spaceart"]), &cancel)
        .await
        .unwrap();
    assert_eq!(second.registered(), 0);
    assert_eq!(second.channels[0].skipped, 4);

    // registered posts are recognized before any network round-trip
    assert_eq!(h.transport.probes.load(Ordering::SeqCst), probes);
    assert_eq!(h.transport.downloads.load(Ordering::SeqCst), downloads);

    let stats = h.services.subreddits.stats().await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].submissions, 2);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn undecodable_download_is_removed_and_skipped() {
    let transport = spaceart_transport().with_file(
        "https://i.redd.it/fake.jpg",
        Some("image/jpeg"),
        b"<html><body>Rate limited</body></html>".to_vec(),
    );
    let mut posts = spaceart_posts();
    posts.insert(0, post("spaceart", "fake", "https://i.redd.it/fake.jpg"));
    let h = Harness::new(
        [("spaceart", posts)],
        transport,
        Arc::new(InMemoryRepository::new()),
    );

    let report = h
        .gatherer
        .gather_top_image_submissions(&channels(&["spaceart"]), &CancellationToken::new())
        .await
        .unwrap();

    let channel = &report.channels[0];
    assert_eq!(channel.registered, 2);
    assert_eq!(channel.skipped, 3);
    assert_eq!(channel.failed(), 0);
    assert_eq!(h.files_in("spaceart"), ["large-large.png", "small-small.png"]);
    assert!(
        h.services
            .submissions
            .by_post_id("fake")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn per_post_failures_do_not_stop_the_channel() {
    let mut posts = spaceart_posts();
    // probe fails: not hosted at all
    posts.push(post("spaceart", "gone", "https://i.redd.it/gone.png"));
    // probe says html
    posts.push(post("spaceart", "page", "https://example.com/page"));
    // probe fine, download fails
    posts.push(post("spaceart", "flaky", "https://i.redd.it/flaky.png"));
    // no usable URL at all
    posts.push(post("spaceart", "self", ""));

    let transport = FlakyDownloads {
        inner: spaceart_transport()
            .with_file("https://example.com/page", Some("text/html"), vec![])
            .with_file("https://i.redd.it/flaky.png", Some("image/png"), png(10, 10)),
        failing: "https://i.redd.it/flaky.png",
    };

    let dir = tempdir().unwrap();
    let services = Services::new(Arc::new(InMemoryRepository::new()));
    let gatherer = Gatherer::new(
        Arc::new(MockPostSource {
            listings: [("spaceart".to_owned(), posts)].into_iter().collect(),
        }),
        Arc::new(transport),
        &services,
        GatherOptions {
            data_dir: dir.path().to_owned(),
            window: TimeWindow::Day,
            limit: 25,
            workers: 2,
        },
    );

    let report = gatherer
        .gather_top_image_submissions(&channels(&["spaceart"]), &CancellationToken::new())
        .await
        .unwrap();

    let channel = &report.channels[0];
    assert_eq!(channel.candidates, 8);
    assert_eq!(channel.registered, 2);
    assert_eq!(channel.skipped, 5);
    assert_eq!(channel.failed(), 1);
    assert_eq!(channel.failures[0].post_id, "flaky");
    assert!(!dir.path().join("spaceart").join("flaky-flaky.png").exists());
}

/// Delegates to a [`MockTransport`], but downloads of `failing` get a 500
struct FlakyDownloads {
    inner: MockTransport,
    failing: &'static str,
}

#[async_trait]
impl MediaTransport for FlakyDownloads {
    async fn content_type(&self, url: &Url) -> TransportResult<Option<String>> {
        self.inner.content_type(url).await
    }

    async fn download(
        &self,
        url: &Url,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> TransportResult<()> {
        if url.as_str() == self.failing {
            return transport::StatusSnafu {
                url: url.clone(),
                status: 500u16,
            }
            .fail();
        }
        self.inner.download(url, out).await
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn failing_channel_does_not_prevent_the_others() {
    let h = Harness::new(
        [("spaceart", spaceart_posts())],
        spaceart_transport(),
        Arc::new(InMemoryRepository::new()),
    );

    let err = h
        .gatherer
        .gather_top_image_submissions(
            &channels(&["broken", "spaceart"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GatherError::PostList { ref channel, .. } if channel == "broken"));

    let stats = h.services.subreddits.stats().await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].name, "spaceart");
    assert_eq!(stats[0].submissions, 2);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn channel_without_images_is_not_an_error() {
    let h = Harness::new(
        [(
            "videos",
            vec![
                post("videos", "v1", "https://v.redd.it/abc"),
                post("videos", "v2", "https://youtu.be/abc"),
            ],
        )],
        MockTransport::default(),
        Arc::new(InMemoryRepository::new()),
    );

    let report = h
        .gatherer
        .gather_top_image_submissions(&channels(&["videos"]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.registered(), 0);
    assert_eq!(report.channels[0].skipped, 2);
    // no record and no directory for a channel with nothing to keep
    assert!(h.services.subreddits.all().await.unwrap().is_empty());
    assert!(!h.dir.path().join("videos").exists());
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn cancelled_before_start_does_nothing() {
    let h = Harness::new(
        [("spaceart", spaceart_posts())],
        spaceart_transport(),
        Arc::new(InMemoryRepository::new()),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h
        .gatherer
        .gather_top_image_submissions(&channels(&["spaceart"]), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, GatherError::Cancelled));
    assert_eq!(h.transport.probes.load(Ordering::SeqCst), 0);
    assert!(h.files_in("spaceart").is_empty());
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn cancelling_mid_download_leaves_no_partial_files() {
    let transport = MockTransport::default().with_hanging("https://i.redd.it/slow.png");
    let h = Harness::new(
        [(
            "spaceart",
            vec![post("spaceart", "slow", "https://i.redd.it/slow.png")],
        )],
        transport,
        Arc::new(InMemoryRepository::new()),
    );
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        let transport = h.transport.clone();
        tokio::spawn(async move {
            while transport.downloads.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            // let the partial write land on disk
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let err = h
        .gatherer
        .gather_top_image_submissions(&channels(&["spaceart"]), &cancel)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, GatherError::Cancelled));
    assert!(h.files_in("spaceart").is_empty());
    assert!(
        h.services
            .submissions
            .by_post_id("slow")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn blank_post_id_is_skipped_without_failing_the_channel() {
    let mut posts = spaceart_posts();
    posts.insert(0, post("spaceart", "  ", "https://i.redd.it/blank.png"));
    let transport =
        spaceart_transport().with_file("https://i.redd.it/blank.png", Some("image/png"), png(800, 600));
    let h = Harness::new(
        [("spaceart", posts)],
        transport,
        Arc::new(InMemoryRepository::new()),
    );

    let report = h
        .gatherer
        .gather_top_image_submissions(&channels(&["spaceart"]), &CancellationToken::new())
        .await
        .unwrap();

    let channel = &report.channels[0];
    assert_eq!(channel.candidates, 5);
    assert_eq!(channel.registered, 2);
    assert_eq!(channel.skipped, 3);
    assert_eq!(channel.failed(), 0);
    // dropped before any network round-trip
    assert_eq!(h.transport.probes.load(Ordering::SeqCst), 2);
    assert_eq!(h.files_in("spaceart"), ["large-large.png", "small-small.png"]);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn repeated_post_in_listing_is_downloaded_once() {
    let mut posts = spaceart_posts();
    posts.push(post("spaceart", "large", "https://i.redd.it/large.png"));
    let h = Harness::new(
        [("spaceart", posts)],
        spaceart_transport(),
        Arc::new(InMemoryRepository::new()),
    );

    let report = h
        .gatherer
        .gather_top_image_submissions(&channels(&["spaceart"]), &CancellationToken::new())
        .await
        .unwrap();

    let channel = &report.channels[0];
    assert_eq!(channel.candidates, 5);
    assert_eq!(channel.registered, 2);
    assert_eq!(channel.skipped, 3);
    assert_eq!(channel.failed(), 0);
    assert_eq!(h.transport.probes.load(Ordering::SeqCst), 2);
    assert_eq!(h.transport.downloads.load(Ordering::SeqCst), 2);
    assert_eq!(h.files_in("spaceart"), ["large-large.png", "small-small.png"]);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn channel_names_are_trimmed_and_checked() {
    let h = Harness::new(
        [("spaceart", spaceart_posts())],
        spaceart_transport(),
        Arc::new(InMemoryRepository::new()),
    );

    let err = h
        .gatherer
        .gather_top_image_submissions(
            &channels(&[" spaceart\t", "../outside", "   "]),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, GatherError::InvalidChannel { ref channel } if channel == "../outside")
    );

    assert_eq!(h.files_in("spaceart"), ["large-large.png", "small-small.png"]);
    let stats = h.services.subreddits.stats().await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].name, "spaceart");
    assert_eq!(stats[0].submissions, 2);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn report_keeps_channels_gathered_before_a_failure() {
    let h = Harness::new(
        [("spaceart", spaceart_posts())],
        spaceart_transport(),
        Arc::new(InMemoryRepository::new()),
    );

    let mut report = GatherReport::default();
    let err = h
        .gatherer
        .gather_into(
            &channels(&["spaceart", "broken"]),
            &CancellationToken::new(),
            &mut report,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GatherError::PostList { ref channel, .. } if channel == "broken"));
    assert_eq!(report.channels.len(), 1);
    assert_eq!(report.channels[0].channel, "spaceart");
    assert_eq!(report.registered(), 2);
}

/// Delegates to a [`MockTransport`], with slow downloads whose overlap is
/// measured
struct SlowDownloads {
    inner: MockTransport,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl MediaTransport for SlowDownloads {
    async fn content_type(&self, url: &Url) -> TransportResult<Option<String>> {
        self.inner.content_type(url).await
    }

    async fn download(
        &self,
        url: &Url,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> TransportResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let res = self.inner.download(url, out).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        res
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn downloads_never_exceed_the_worker_count() {
    let workers = 4;
    let mut inner = MockTransport::default();
    let mut posts = vec![];
    for i in 0..12 {
        let url = format!("https://i.redd.it/p{i}.png");
        inner = inner.with_file(&url, Some("image/png"), png(32, 32));
        posts.push(post("spaceart", &format!("p{i}"), &url));
    }
    let transport = Arc::new(SlowDownloads {
        inner,
        in_flight: AtomicUsize::new(0),
        max_in_flight: AtomicUsize::new(0),
    });

    let dir = tempdir().unwrap();
    let services = Services::new(Arc::new(InMemoryRepository::new()));
    let gatherer = Gatherer::new(
        Arc::new(MockPostSource {
            listings: [("spaceart".to_owned(), posts)].into_iter().collect(),
        }),
        transport.clone(),
        &services,
        GatherOptions {
            data_dir: dir.path().to_owned(),
            window: TimeWindow::Week,
            limit: 25,
            workers,
        },
    );

    let report = gatherer
        .gather_top_image_submissions(&channels(&["spaceart"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.registered(), 12);
    let max_in_flight = transport.max_in_flight.load(Ordering::SeqCst);
    assert!(max_in_flight <= workers, "{max_in_flight} downloads at once");
    // the pool does run them side by side
    assert!(1 < max_in_flight, "{max_in_flight} downloads at once");
    assert_eq!(transport.in_flight.load(Ordering::SeqCst), 0);
}

/// In-memory storage failing to create the submission of one post
struct FailingCreate {
    inner: InMemoryRepository,
    post_id: &'static str,
}

#[async_trait]
impl Repository for FailingCreate {
    async fn subreddit_create(&self, subreddit: Subreddit) -> CoreResult<Subreddit> {
        self.inner.subreddit_create(subreddit).await
    }
    async fn subreddit_get_by_id(&self, id: u64) -> CoreResult<Subreddit> {
        self.inner.subreddit_get_by_id(id).await
    }
    async fn subreddit_get_by_name(&self, name: &str) -> CoreResult<Subreddit> {
        self.inner.subreddit_get_by_name(name).await
    }
    async fn subreddit_get_all(&self) -> CoreResult<Vec<Subreddit>> {
        self.inner.subreddit_get_all().await
    }
    async fn subreddit_get_stats(&self) -> CoreResult<Vec<SubredditStats>> {
        self.inner.subreddit_get_stats().await
    }
    async fn subreddit_is_name_registered(&self, name: &str) -> CoreResult<bool> {
        self.inner.subreddit_is_name_registered(name).await
    }

    async fn submission_create(&self, submission: Submission) -> CoreResult<Submission> {
        if submission.post_id == self.post_id {
            return Err(CoreError::Storage {
                source: "disk full".into(),
            });
        }
        self.inner.submission_create(submission).await
    }
    async fn submission_get_by_id(&self, id: u64) -> CoreResult<Submission> {
        self.inner.submission_get_by_id(id).await
    }
    async fn submission_get_by_post_id(&self, post_id: &str) -> CoreResult<Submission> {
        self.inner.submission_get_by_post_id(post_id).await
    }
    async fn submission_get_by_min_resolution(
        &self,
        min: Resolution,
    ) -> CoreResult<Vec<Submission>> {
        self.inner.submission_get_by_min_resolution(min).await
    }
    async fn submission_search(&self, text: &str) -> CoreResult<Vec<Submission>> {
        self.inner.submission_search(text).await
    }
    async fn submission_get_random(&self, min: Resolution) -> CoreResult<Submission> {
        self.inner.submission_get_random(min).await
    }
    async fn submission_is_post_id_registered(&self, post_id: &str) -> CoreResult<bool> {
        self.inner.submission_is_post_id_registered(post_id).await
    }

    async fn history_create(&self, entry: HistoryEntry) -> CoreResult<HistoryEntry> {
        self.inner.history_create(entry).await
    }
    async fn history_get_all(&self) -> CoreResult<Vec<HistoryEntry>> {
        self.inner.history_get_all().await
    }
    async fn history_get_current(&self) -> CoreResult<HistoryEntry> {
        self.inner.history_get_current().await
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn storage_failure_in_one_worker_lets_the_others_finish() {
    let h = Harness::new(
        [("spaceart", spaceart_posts())],
        spaceart_transport(),
        Arc::new(FailingCreate {
            inner: InMemoryRepository::new(),
            post_id: "small",
        }),
    );

    let err = h
        .gatherer
        .gather_top_image_submissions(&channels(&["spaceart"]), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatherError::Storage {
            ref channel,
            source: CoreError::Storage { .. },
        } if channel == "spaceart"
    ));

    // the sibling was stored, the failed one left no file behind
    let large = h.services.submissions.by_post_id("large").await.unwrap();
    assert_eq!(large.submission.resolution(), Resolution::new(1920, 1200));
    assert!(
        h.services
            .submissions
            .by_post_id("small")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert_eq!(h.files_in("spaceart"), ["large-large.png"]);
}
