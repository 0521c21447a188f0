//! Comic image download.
//!
//! Certificate verification is turned off for image requests. The image host
//! is only trusted for bytes that are re-uploaded verbatim, but this is still
//! an insecure default and is logged as such.

use std::path::{Path, PathBuf};

use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::http;
use crate::{Error, Result};

/// Basename of an image URL (the part after the last `/`).
pub fn image_file_name(image_url: &str) -> Result<&str> {
    match image_url.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(Error::InvalidArgument(format!(
            "image URL has no file name: {}",
            image_url
        ))),
    }
}

/// Local path the image at `image_url` is stored under inside `dir`.
pub fn local_image_path(dir: &Path, image_url: &str) -> Result<PathBuf> {
    Ok(dir.join(image_file_name(image_url)?))
}

#[derive(Debug, Clone)]
pub struct ImageDownloader {
    http: Client,
}

impl ImageDownloader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: http::insecure_client()?,
        })
    }

    /// Download `image_url` into `path`, replacing any existing file.
    pub async fn save_image(&self, path: &Path, image_url: &str) -> Result<()> {
        debug!(%image_url, "Downloading image");

        let response = self.http.get(image_url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        let mut file = File::create(path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        info!(path = %path.display(), size = bytes.len(), "Image saved");
        Ok(())
    }
}
