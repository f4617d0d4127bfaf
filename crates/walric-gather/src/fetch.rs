//! Downloading images and reading their dimensions

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::{ResultExt as _, Snafu};
use tokio::io::AsyncWriteExt as _;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;
use walric_core::Resolution;
use walric_util_error::FmtCompact as _;

use crate::LOG_TARGET;
use crate::classify::base_name;
use crate::transport::{MediaTransport, TransportError};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FetchError {
    #[snafu(display("I/O error on {}", path.display()))]
    Io { path: PathBuf, source: io::Error },
    #[snafu(display("Downloading {url} failed with status {status}"))]
    DownloadFailed { url: Url, status: u16 },
    #[snafu(display("Downloading {url} failed"))]
    Transport { url: Url, source: TransportError },
    #[snafu(display("Unknown or unsupported image format: {}", path.display()))]
    UnsupportedImageFormat { path: PathBuf },
    Join { source: JoinError },
    #[snafu(display("Cancelled"))]
    Cancelled,
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Local file name for the image of post `post_id`
///
/// Prefixed with the post id, as unrelated posts often share remote names.
pub fn local_filename(post_id: &str, url: &Url) -> String {
    match base_name(url) {
        "" => format!("{post_id}-image"),
        name => format!("{post_id}-{name}"),
    }
}

#[derive(Clone)]
pub struct ImageFetcher {
    transport: Arc<dyn MediaTransport>,
}

impl ImageFetcher {
    pub fn new(transport: Arc<dyn MediaTransport>) -> Self {
        Self { transport }
    }

    /// Download `url` into `dest_dir`, returning the path of the new file
    ///
    /// Nothing is left behind on failure or cancellation.
    pub async fn fetch(
        &self,
        dest_dir: &Path,
        post_id: &str,
        url: &Url,
        cancel: &CancellationToken,
    ) -> FetchResult<PathBuf> {
        if cancel.is_cancelled() {
            return CancelledSnafu.fail();
        }

        let path = dest_dir.join(local_filename(post_id, url));

        let res = tokio::select! {
            res = self.download_to(url, &path) => res,
            () = cancel.cancelled() => CancelledSnafu.fail(),
        };

        if res.is_err() {
            remove_partial(&path).await;
        }
        res.map(|()| path)
    }

    async fn download_to(&self, url: &Url, path: &Path) -> FetchResult<()> {
        debug!(target: LOG_TARGET, %url, path = %path.display(), "Downloading image");
        let mut file = tokio::fs::File::create(path)
            .await
            .context(IoSnafu { path })?;

        self.transport
            .download(url, &mut file)
            .await
            .map_err(|source| match source {
                TransportError::Status { status, .. } => FetchError::DownloadFailed {
                    url: url.clone(),
                    status,
                },
                source => FetchError::Transport {
                    url: url.clone(),
                    source,
                },
            })?;

        file.flush().await.context(IoSnafu { path })?;
        Ok(())
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(target: LOG_TARGET, path = %path.display(), "Removed partial download");
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            warn!(
                target: LOG_TARGET,
                path = %path.display(),
                err = %err.fmt_compact(),
                "Failed to remove partial download"
            );
        }
    }
}

/// Pixel dimensions of the image at `path`, reading only its header
pub async fn probe_dimensions(path: &Path) -> FetchResult<Resolution> {
    let path = path.to_owned();
    tokio::task::spawn_blocking(move || {
        let reader = image::ImageReader::open(&path)
            .and_then(|reader| reader.with_guessed_format())
            .context(IoSnafu { path: &path })?;

        match reader.into_dimensions() {
            Ok((width, height)) => Ok(Resolution::new(width, height)),
            Err(image::ImageError::IoError(source)) => Err(FetchError::Io { path, source }),
            Err(_) => UnsupportedImageFormatSnafu { path }.fail(),
        }
    })
    .await
    .context(JoinSnafu)?
}
