//! Optional document/review body archive
//!
//! When the corresponding download flag is set, document HTML/PDF and
//! review PDF bodies are fetched once and stored under the document
//! directory; the recorded relative filename is never re-downloaded, even
//! when other fields of the owning row change.

use crate::feed::FeedClient;
use althingi_common::config::Settings;
use althingi_common::Result;
use std::path::Path;

/// Download a document body if downloads are enabled. Returns the relative
/// local filename, or an empty string when downloads are off or there is
/// nothing to download.
pub async fn maybe_download_document(
    feed: &FeedClient,
    settings: &Settings,
    remote_path: Option<&str>,
    parliament_num: i64,
    issue_num: i64,
) -> Result<String> {
    if !settings.download_documents {
        return Ok(String::new());
    }

    let Some(remote_path) = remote_path else {
        return Ok(String::new());
    };

    download(feed, settings, remote_path, parliament_num, issue_num).await
}

/// Download a review body if review downloads are enabled.
pub async fn maybe_download_review(
    feed: &FeedClient,
    settings: &Settings,
    remote_path: Option<&str>,
    parliament_num: i64,
    issue_num: i64,
) -> Result<String> {
    if !settings.download_reviews {
        return Ok(String::new());
    }

    let Some(remote_path) = remote_path else {
        return Ok(String::new());
    };

    download(feed, settings, remote_path, parliament_num, issue_num).await
}

async fn download(
    feed: &FeedClient,
    settings: &Settings,
    remote_path: &str,
    parliament_num: i64,
    issue_num: i64,
) -> Result<String> {
    let basename = remote_path.rsplit('/').next().unwrap_or(remote_path);
    let relative = format!("althingi/{}/{}/{}", parliament_num, issue_num, basename);
    let local_path = settings.document_dir.join(&relative);

    tracing::debug!("Downloading file {}", basename);

    let content = feed.fetch_bytes(remote_path).await?;
    write_file(&local_path, &content)?;

    Ok(relative)
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
