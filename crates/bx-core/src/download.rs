use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use tempfile::NamedTempFile;

use crate::errors::ToolError;

const DOWNLOAD_ATTEMPTS: usize = 3;
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);
const USER_AGENT: &str = concat!("bx/", env!("CARGO_PKG_VERSION"));

/// Fetches helper binaries into the tools directory.
pub trait Downloader {
    /// Download `url` into `dest_dir`, keeping the URL's file name.
    ///
    /// # Errors
    /// [`ToolError::NetworkFailure`] naming `role` when the file cannot be fetched or stored.
    fn download(&self, url: &str, dest_dir: &Path, role: &str) -> Result<PathBuf, ToolError>;
}

#[derive(Debug, Default)]
pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest_dir: &Path, role: &str) -> Result<PathBuf, ToolError> {
        tracing::debug!(%url, dest = %dest_dir.display(), "downloading {role}");
        download_with_retries(url, dest_dir).map_err(|source| ToolError::NetworkFailure {
            role: role.to_string(),
            source,
        })
    }
}

/// Last path segment of `url`, without query or fragment.
pub(crate) fn url_file_name(url: &str) -> Option<&str> {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    trimmed.rsplit('/').next().filter(|name| !name.is_empty())
}

fn download_with_retries(url: &str, dest_dir: &Path) -> Result<PathBuf> {
    let mut last_err = None;
    for _ in 0..DOWNLOAD_ATTEMPTS {
        match download_once(url, dest_dir) {
            Ok(path) => return Ok(path),
            Err(err) => {
                tracing::debug!(%url, error = %err, "download attempt failed");
                last_err = Some(err);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow!("failed to download {url}")))
}

fn download_once(url: &str, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = url_file_name(url).ok_or_else(|| anyhow!("{url} does not name a file"))?;
    let mut response = http_client()?
        .get(url)
        .send()
        .with_context(|| format!("failed to fetch {url}"))?
        .error_for_status()
        .with_context(|| format!("unexpected response for {url}"))?;

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("creating {}", dest_dir.display()))?;
    let mut tmp = NamedTempFile::new_in(dest_dir)?;
    io::copy(&mut response, tmp.as_file_mut())
        .with_context(|| format!("stream error for {file_name}"))?;
    let dest = dest_dir.join(file_name);
    tmp.persist(&dest)
        .map_err(|err| err.error)
        .with_context(|| format!("storing {}", dest.display()))?;
    Ok(dest)
}

fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build http client")
}
