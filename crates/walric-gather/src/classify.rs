//! Deciding whether a post URL is worth downloading
//!
//! [`looks_like_image`] is free and runs first; [`probe_content_type`] costs
//! a round-trip and only runs for candidates that passed it.

use std::path::Path;

use mime::Mime;
use url::Url;

use crate::transport::{MediaTransport, TransportResult};

/// Hosts that never serve a directly displayable still image
const NON_IMAGE_HOSTS: &[&str] = &[
    // gif
    "gfycat.com",
    "redgifs.com",
    "www.redgifs.com",
    // audio
    "open.spotify.com",
    // video
    "v.redd.it",
    "youtu.be",
    "youtube.com",
    "www.youtube.com",
];

/// Hosts serving image galleries under [`GALLERY_PATH_PREFIX`]
const GALLERY_HOSTS: &[&str] = &["www.reddit.com", "reddit.com"];
const GALLERY_PATH_PREFIX: &str = "/gallery";

const NON_IMAGE_EXTENSIONS: &[&str] = &["gif", "gifv", "mp4"];


/// Last non-empty segment of the URL path, possibly empty
pub fn base_name(url: &Url) -> &str {
    url.path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Whether `url` could plausibly point at an image, without any I/O
///
/// A missing extension is not disqualifying: plenty of image hosts omit it.
pub fn looks_like_image(url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default();

    if NON_IMAGE_HOSTS.contains(&host) {
        return false;
    }

    if GALLERY_HOSTS.contains(&host) && url.path().starts_with(GALLERY_PATH_PREFIX) {
        return false;
    }

    let Some(ext) = Path::new(base_name(url))
        .extension()
        .and_then(|ext| ext.to_str())
    else {
        return true;
    };
    !NON_IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// Compares the MIME essence, ignoring parameters and case
///
/// Anything that does not parse as a MIME type is not supported.
pub fn is_supported_content_type(content_type: &str) -> bool {
    let Ok(content_type) = content_type.trim().parse::<Mime>() else {
        return false;
    };
    [
        mime::APPLICATION_OCTET_STREAM,
        mime::IMAGE_JPEG,
        mime::IMAGE_PNG,
    ]
    .iter()
    .any(|supported| supported.essence_str() == content_type.essence_str())
}

/// Ask the remote end what `url` serves, and whether we can use it
pub async fn probe_content_type(
    transport: &dyn MediaTransport,
    url: &Url,
) -> TransportResult<bool> {
    Ok(transport
        .content_type(url)
        .await?
        .is_some_and(|content_type| is_supported_content_type(&content_type)))
}
