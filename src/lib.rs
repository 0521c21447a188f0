//! xkcd → VK wall publisher library
//!
//! This library provides tools to:
//! - Pick a random comic from the xkcd JSON API
//! - Download the comic image to a local file
//! - Upload the image to a VK group wall and post it with the alt text
//! - Remove the local file once the post is published

pub mod cleanup;
pub mod config;
pub mod download;
pub mod error;
mod http;
pub mod pipeline;
pub mod vk;
pub mod xkcd;

// Re-export common types
pub use config::{PipelineConfig, VkConfig, XkcdConfig};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PublishReport};
pub use vk::{AttachmentId, VkClient};
pub use xkcd::{ComicDetail, ComicReference, XkcdClient};
