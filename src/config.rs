//! Configuration for the xkcd and VK endpoints
//!
//! Credentials come from the environment (usually a local `.env` file loaded
//! by the binary). Base URLs can be overridden so the clients can be pointed
//! at a local mock server.

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::{Error, Result};

/// Default VK API method root.
pub const VK_API_URL: &str = "https://api.vk.com/method";

/// Default xkcd site root.
pub const XKCD_BASE_URL: &str = "https://xkcd.com";

/// Read a required variable, treating blank values as missing.
fn required_var(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::InvalidArgument(format!("{} not set", name)))
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// VK credentials and API location.
#[derive(Clone)]
pub struct VkConfig {
    /// Application id. Loaded for completeness, not sent anywhere.
    pub client_id: Option<String>,
    pub access_token: String,
    pub api_version: String,
    pub group_id: String,
    pub api_url: String,
}

impl VkConfig {
    pub fn new<S1, S2, S3>(access_token: S1, api_version: S2, group_id: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            client_id: None,
            access_token: access_token.into(),
            api_version: api_version.into(),
            group_id: group_id.into(),
            api_url: VK_API_URL.to_string(),
        }
    }

    /// Load configuration from `VK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: optional_var("VK_CLIENT_ID"),
            access_token: required_var("VK_ACCESS_TOKEN")?,
            api_version: required_var("VK_API_VERSION")?,
            group_id: required_var("VK_GROUP_ID")?,
            api_url: optional_var("VK_API_URL").unwrap_or_else(|| VK_API_URL.to_string()),
        })
    }

    /// Override the API root (primarily for tests).
    pub fn with_api_url<S: Into<String>>(mut self, api_url: S) -> Self {
        self.api_url = api_url.into();
        self
    }
}

// Keep the token out of logs.
impl fmt::Debug for VkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VkConfig")
            .field("client_id", &self.client_id)
            .field("access_token", &"***")
            .field("api_version", &self.api_version)
            .field("group_id", &self.group_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct XkcdConfig {
    pub base_url: String,
}

impl Default for XkcdConfig {
    fn default() -> Self {
        Self {
            base_url: XKCD_BASE_URL.to_string(),
        }
    }
}

impl XkcdConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: optional_var("XKCD_BASE_URL").unwrap_or_else(|| XKCD_BASE_URL.to_string()),
        }
    }
}

/// Everything one publishing run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub vk: VkConfig,
    pub xkcd: XkcdConfig,
    /// Directory the image is downloaded into.
    pub work_dir: PathBuf,
    /// Leave the downloaded image on disk after posting.
    pub keep_image: bool,
}

impl PipelineConfig {
    pub fn new(vk: VkConfig, xkcd: XkcdConfig) -> Self {
        Self {
            vk,
            xkcd,
            work_dir: PathBuf::from("."),
            keep_image: false,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(VkConfig::from_env()?, XkcdConfig::from_env()))
    }

    pub fn with_work_dir<P: Into<PathBuf>>(mut self, work_dir: P) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_keep_image(mut self, keep_image: bool) -> Self {
        self.keep_image = keep_image;
        self
    }
}
