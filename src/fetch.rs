// src/fetch.rs

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::PortalCredentials;

const PROGRESS_EVERY: u64 = 10 * 1024 * 1024;

/// Download endpoint for a dataset slug such as `owner/dataset-name`.
pub fn dataset_download_url(api_base: &Url, dataset: &str) -> Result<Url> {
    let path = format!("datasets/download/{}", dataset.trim_matches('/'));
    api_base
        .join(&path)
        .with_context(|| format!("building download URL for {}", dataset))
}

/// Fetch the archive at `url` with basic auth and stream it into `dest`.
/// Returns the path written.
#[instrument(level = "info", skip(client, url, credentials, dest), fields(url = %url))]
pub async fn download_archive(
    client: &Client,
    url: &Url,
    credentials: &PortalCredentials,
    dest: impl AsRef<Path>,
) -> Result<PathBuf> {
    let dest = dest.as_ref().to_path_buf();
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let start = Instant::now();
    let resp = client
        .get(url.clone())
        .basic_auth(&credentials.username, Some(&credentials.key))
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?;

    let file = fs::File::create(&dest)
        .await
        .with_context(|| format!("creating {}", dest.display()))?;
    let written = match write_body(resp, file, &dest).await {
        Ok(written) => written,
        Err(e) => {
            // A partial archive must not be picked up by a later load run.
            if let Err(rm) = fs::remove_file(&dest).await {
                warn!(path = %dest.display(), error = %rm, "could not remove partial download");
            }
            return Err(e);
        }
    };

    info!(
        path = %dest.display(),
        bytes = written,
        elapsed = ?start.elapsed(),
        "archive downloaded"
    );
    Ok(dest)
}

async fn write_body(resp: Response, mut file: fs::File, dest: &Path) -> Result<u64> {
    let mut stream = resp.bytes_stream();
    let mut written = 0u64;
    let mut next_report = PROGRESS_EVERY;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Failed to read chunk from response")?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("writing {}", dest.display()))?;
        written += chunk.len() as u64;
        if written >= next_report {
            debug!("Downloaded {} MB", written / (1024 * 1024));
            next_report += PROGRESS_EVERY;
        }
    }
    file.flush()
        .await
        .with_context(|| format!("flushing {}", dest.display()))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;
    use tempfile::tempdir;

    fn creds() -> PortalCredentials {
        PortalCredentials {
            username: "user".into(),
            key: "secret".into(),
        }
    }

    #[test]
    fn builds_dataset_url() -> Result<()> {
        let base = Url::parse("https://www.kaggle.com/api/v1/")?;
        let url = dataset_download_url(&base, "thedevastator/us-baby-names-by-year-of-birth")?;
        assert_eq!(
            url.as_str(),
            "https://www.kaggle.com/api/v1/datasets/download/thedevastator/us-baby-names-by-year-of-birth"
        );
        Ok(())
    }

    #[tokio::test]
    async fn streams_body_to_nested_path() -> Result<()> {
        let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let mut server = StubServer::start(vec![(200, payload.clone())]).await?;
        let dir = tempdir()?;
        let dest = dir.path().join("temp").join("kaggle-download.zip");

        let written = download_archive(&Client::new(), &server.url("/dl")?, &creds(), &dest).await?;

        assert_eq!(written, dest);
        assert_eq!(std::fs::read(&dest)?, payload);

        let req = server.request().await?;
        assert_eq!(req.method, "GET");
        // "user:secret" in base64
        assert_eq!(req.header("authorization"), Some("Basic dXNlcjpzZWNyZXQ="));
        Ok(())
    }

    #[tokio::test]
    async fn http_error_fails_the_download() -> Result<()> {
        let server = StubServer::reply(403, r#"{"code":403,"message":"Permission denied"}"#).await?;
        let dir = tempdir()?;
        let dest = dir.path().join("out.zip");

        let res = download_archive(&Client::new(), &server.url("/dl")?, &creds(), &dest).await;
        assert!(res.is_err());
        assert!(!dest.exists());
        Ok(())
    }

    #[tokio::test]
    async fn truncated_body_leaves_no_file_behind() -> Result<()> {
        let sent = vec![7u8; 4_096];
        let server = StubServer::truncated(200, &sent, 1_000_000).await?;
        let dir = tempdir()?;
        let dest = dir.path().join("temp").join("kaggle-download.zip");

        let res = download_archive(&Client::new(), &server.url("/dl")?, &creds(), &dest).await;
        assert!(res.is_err());
        assert!(!dest.exists());
        assert!(dest.parent().is_some_and(|p| p.exists()));
        Ok(())
    }
}
