//! HTTP access to the image hosts

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use snafu::{ResultExt as _, Snafu};
use tokio::io::{AsyncWrite, AsyncWriteExt as _};
use tracing::debug;
use url::Url;

use crate::LOG_TARGET;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransportError {
    #[snafu(display("Request to {url} failed"))]
    Request { url: Url, source: reqwest::Error },
    #[snafu(display("Request to {url} returned status {status}"))]
    Status { url: Url, status: u16 },
    #[snafu(display("Failed to write response body"))]
    Write { source: io::Error },
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Network access needed to classify and download images
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// `Content-Type` that `url` reports for a `HEAD` request, if any
    async fn content_type(&self, url: &Url) -> TransportResult<Option<String>>;

    /// Stream the body of `url` into `out`
    ///
    /// Fails with [`TransportError::Status`] without writing anything if the
    /// response status is not a success.
    async fn download(
        &self,
        url: &Url,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> TransportResult<()>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl MediaTransport for HttpTransport {
    async fn content_type(&self, url: &Url) -> TransportResult<Option<String>> {
        let resp = self
            .client
            .head(url.clone())
            .send()
            .await
            .context(RequestSnafu { url: url.clone() })?;

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        debug!(target: LOG_TARGET, %url, content_type = ?content_type, "Probed remote file");
        Ok(content_type)
    }

    async fn download(
        &self,
        url: &Url,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> TransportResult<()> {
        let mut resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .context(RequestSnafu { url: url.clone() })?;

        let status = resp.status();
        if !status.is_success() {
            return StatusSnafu {
                url: url.clone(),
                status: status.as_u16(),
            }
            .fail();
        }

        while let Some(chunk) = resp
            .chunk()
            .await
            .context(RequestSnafu { url: url.clone() })?
        {
            out.write_all(&chunk).await.context(WriteSnafu)?;
        }
        out.flush().await.context(WriteSnafu)?;

        Ok(())
    }
}
