//! xkcd JSON API client.
//!
//! Finds the latest comic number, draws a random comic from the archive and
//! reads its image URL and alt text.

use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::XkcdConfig;
use crate::http;
use crate::{Error, Result};

const INFO_SUFFIX: &str = "info.0.json";

/// A comic in the archive, by its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComicReference {
    pub index: u32,
}

/// Image location and caption of one comic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicDetail {
    pub image_url: String,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
struct CurrentComic {
    num: u32,
}

#[derive(Debug, Deserialize)]
struct ComicInfo {
    img: String,
    alt: String,
}

/// Draw a comic uniformly from `[1, max_index]`.
pub fn random_comic<R: Rng + ?Sized>(max_index: u32, rng: &mut R) -> Result<ComicReference> {
    if max_index == 0 {
        return Err(Error::InvalidArgument(
            "max comic index must be at least 1".to_string(),
        ));
    }

    Ok(ComicReference {
        index: rng.gen_range(1..=max_index),
    })
}

#[derive(Debug, Clone)]
pub struct XkcdClient {
    http: Client,
    base_url: String,
}

impl XkcdClient {
    pub fn new(config: &XkcdConfig) -> Result<Self> {
        Ok(Self {
            http: http::client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create client with custom base url (primarily for tests).
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Result<Self> {
        Self::new(&XkcdConfig {
            base_url: base_url.into(),
        })
    }

    /// Detail page URL, always ending in `/`.
    pub fn comic_url(&self, comic: ComicReference) -> String {
        format!("{}/{}/", self.base_url, comic.index)
    }

    /// Number of the most recent comic.
    pub async fn get_current_number(&self) -> Result<u32> {
        let url = format!("{}/{}", self.base_url, INFO_SUFFIX);
        debug!(%url, "Requesting current comic");

        let response = self.http.get(&url).send().await?;
        let current: CurrentComic = http::read_json(response).await?;

        info!(num = current.num, "Latest comic number");
        Ok(current.num)
    }

    /// Pick a random comic up to `max_index` and return its detail page URL.
    pub fn get_random_comic_url<R: Rng + ?Sized>(
        &self,
        max_index: u32,
        rng: &mut R,
    ) -> Result<String> {
        let comic = random_comic(max_index, rng)?;
        Ok(self.comic_url(comic))
    }

    /// Fetch image URL and alt text for the comic at `comic_url`.
    pub async fn get_image_url_with_comment(&self, comic_url: &str) -> Result<ComicDetail> {
        let url = format!("{}{}", comic_url, INFO_SUFFIX);
        debug!(%url, "Requesting comic metadata");

        let response = self.http.get(&url).send().await?;
        let info: ComicInfo = http::read_json(response).await?;

        Ok(ComicDetail {
            image_url: info.img,
            comment: info.alt,
        })
    }
}
